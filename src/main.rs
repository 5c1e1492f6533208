//! ispsnap command-line entry point.

use anyhow::Result;
use clap::Parser;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ispsnap::cli::{Cli, Command, ExportArgs, RestoreArgs, UrlArgs};
use ispsnap::config::Config;
use ispsnap::credentials::Argon2Hasher;
use ispsnap::db::Database;
use ispsnap::snapshot::{SnapshotData, writer};
use ispsnap::storage::{BlobStore, LocalBlobStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }

    match cli.command {
        Command::Export(args) => run_export(&config, &args),
        Command::Restore(args) => run_restore(&config, &args),
        Command::Url(args) => run_url(&config, &args),
    }
}

/// Run the export command
fn run_export(config: &Config, args: &ExportArgs) -> Result<()> {
    let db = Database::open(&config.database)?;

    let data = db.export_snapshot()?;
    let text = writer::write(&data)?;

    let bytes = if args.gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?
    } else {
        text.into_bytes()
    };

    let store = LocalBlobStore::new(&config.storage.dir);
    let name = args.resolved_name();
    let location = store.put(&name, &bytes)?;

    let keep = args.keep.unwrap_or(config.storage.keep);
    let deleted = store.prune(keep)?;

    eprintln!("Exported {} records to {}", data.total_rows(), location);
    if !deleted.is_empty() {
        eprintln!("Rotated out {} old snapshot(s)", deleted.len());
    }
    Ok(())
}

/// Run the restore command
fn run_restore(config: &Config, args: &RestoreArgs) -> Result<()> {
    let db = Database::open(&config.database)?;

    let data = SnapshotData::from_file(&args.file)?;
    let options = args.options(config);

    let result = db.restore_snapshot(&data, &options, &Argon2Hasher);

    if args.json {
        match result {
            Ok(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            }
            Err(e) => {
                let payload = json!({ "success": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                std::process::exit(1);
            }
        }
    } else {
        let report = result?;

        println!("Restore complete:");
        println!("  Total restored: {}", report.total_restored);
        println!("  Total errors: {}", report.total_errors);
        if report.total_skipped() > 0 {
            println!("  Total skipped: {}", report.total_skipped());
        }
        println!("  Tables:");
        for (table, outcome) in &report.details {
            println!(
                "    {}: {} restored, {} errors, {} skipped",
                table,
                outcome.success,
                outcome.errors.len(),
                outcome.skipped
            );
        }
        if report.total_errors > 0 {
            println!("  Errors:");
            for (table, outcome) in &report.details {
                for err in &outcome.errors {
                    println!("    [{}] {}", table, err);
                }
            }
        }
        Ok(())
    }
}

/// Run the url command
fn run_url(config: &Config, args: &UrlArgs) -> Result<()> {
    let store = LocalBlobStore::new(&config.storage.dir);
    let url = store.signed_url(&args.name, args.ttl)?;
    println!("{}", url);
    Ok(())
}
