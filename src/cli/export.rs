//! Export subcommand arguments.

use clap::Args;

#[derive(Args)]
pub struct ExportArgs {
    /// Blob name for the snapshot (default: timestamped)
    #[arg(long)]
    pub out: Option<String>,

    /// Gzip-compress the snapshot
    #[arg(long)]
    pub gzip: bool,

    /// Snapshots to keep after rotation, overriding the config file
    #[arg(long)]
    pub keep: Option<usize>,
}

impl ExportArgs {
    /// Blob name to store under. Timestamped names sort chronologically,
    /// which rotation relies on.
    pub fn resolved_name(&self) -> String {
        if let Some(name) = &self.out {
            return name.clone();
        }

        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        if self.gzip {
            format!("full_backup_{}.txt.gz", stamp)
        } else {
            format!("full_backup_{}.txt", stamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_default_name_is_timestamped() {
        let cli = Cli::parse_from(["ispsnap", "export"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        let name = args.resolved_name();
        assert!(name.starts_with("full_backup_"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_gzip_changes_extension() {
        let cli = Cli::parse_from(["ispsnap", "export", "--gzip"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert!(args.resolved_name().ends_with(".txt.gz"));
    }

    #[test]
    fn test_explicit_name_wins() {
        let cli = Cli::parse_from(["ispsnap", "export", "--out", "nightly.txt", "--keep", "5"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.resolved_name(), "nightly.txt");
        assert_eq!(args.keep, Some(5));
    }
}
