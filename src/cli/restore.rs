//! Restore subcommand arguments.

use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::db::restore::RestoreOptions;

#[derive(Args)]
pub struct RestoreArgs {
    /// Snapshot file to restore (plain text or gzip)
    pub file: PathBuf,

    /// Wipe existing operational data before restoring
    #[arg(long)]
    pub clean: bool,

    /// Report unresolved references as row errors instead of skipping
    #[arg(long)]
    pub strict: bool,

    /// Print the report as JSON instead of per-table lines
    #[arg(long)]
    pub json: bool,
}

impl RestoreArgs {
    /// Merge CLI flags with config into restore options. Flags only
    /// add restrictions; `--strict` or the config setting enables
    /// strict references.
    pub fn options(&self, config: &Config) -> RestoreOptions {
        RestoreOptions {
            clean_existing: self.clean,
            strict_references: self.strict || config.strict_references,
            seed_password: config.default_password.clone(),
            country_prefix: config.country_prefix.clone(),
        }
    }
}
