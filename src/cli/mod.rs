//! Command-line interface.

pub mod export;
pub mod restore;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use export::ExportArgs;
pub use restore::RestoreArgs;

#[derive(Parser)]
#[command(
    name = "ispsnap",
    version,
    about = "Snapshot export and restore for the ISP billing database"
)]
pub struct Cli {
    /// Config file path (default: <config dir>/ispsnap/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the config file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log destination: 0/off, 1/stdout, 2/stderr, or a file path
    #[arg(long, global = true, default_value = "2")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export a full snapshot into the blob store
    Export(ExportArgs),

    /// Restore a snapshot file into the database
    Restore(RestoreArgs),

    /// Print a signed download URL for a stored snapshot
    Url(UrlArgs),
}

#[derive(Args)]
pub struct UrlArgs {
    /// Stored snapshot name (as listed in the blob store)
    pub name: String,

    /// URL validity in seconds
    #[arg(long, default_value_t = 3600)]
    pub ttl: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_parse() {
        let cli = Cli::parse_from([
            "ispsnap",
            "--database",
            "/tmp/x.db",
            "--verbose",
            "export",
        ]);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Export(_)));
    }

    #[test]
    fn test_url_defaults() {
        let cli = Cli::parse_from(["ispsnap", "url", "full_backup_2025-01-01_00-00-00.txt"]);
        let Command::Url(args) = cli.command else {
            panic!("expected url command");
        };
        assert_eq!(args.ttl, 3600);
    }
}
