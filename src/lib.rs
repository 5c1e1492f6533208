//! Snapshot export and restore for an ISP billing database.
//!
//! The snapshot is a line-oriented text format: a human-readable
//! preamble and manifest, followed by one CSV section per table family.
//! Export reads the whole dataset with surrogate ids joined back out to
//! natural keys; restore rebuilds it in dependency order, resolving
//! natural keys to fresh rowids and isolating faults per row.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod snapshot;
pub mod storage;

pub use config::Config;
pub use db::Database;
pub use error::SnapshotError;
pub use snapshot::SnapshotData;
