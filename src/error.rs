//! Typed errors for snapshot handling.
//!
//! Most APIs return `anyhow::Result`; these variants exist where callers
//! branch on the failure (the CLI distinguishes a rejected snapshot from
//! an I/O problem).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot text contained no recognizable table section.
    /// Restore must not be attempted against such input.
    #[error("no valid data sections found")]
    NoDataSections,

    /// The credential collaborator failed while seeding the replacement
    /// password hash. This aborts the whole restore: every customer row
    /// needs the seeded hash.
    #[error("failed to seed replacement credential: {0}")]
    CredentialSeed(String),

    /// A blob name passed to the storage layer does not exist.
    #[error("blob not found: {0}")]
    BlobNotFound(PathBuf),
}
