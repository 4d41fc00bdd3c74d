//! Command-line front end for the fieldbook store.
//!
//! # Usage
//! - `fieldbook` prints a summary of the configured store.
//! - `fieldbook backup <file>` writes a JSON backup bundle.
//! - `fieldbook restore <file>` replaces the store with a bundle.
//!
//! The store file comes from `--db` or `FIELDBOOK_DB_PATH`; logging comes
//! from the other `FIELDBOOK_*` variables. Backup and restore refuse to run
//! without a store file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldbook_core::{core_version, CoreConfig, DataStore};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Fieldbook - customer and installation registry
#[derive(Parser, Debug)]
#[command(name = "fieldbook")]
#[command(author, version = core_version(), about, long_about = None)]
struct Cli {
    /// SQLite store file, overrides FIELDBOOK_DB_PATH
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Write every customer, installation and setting to a JSON file
    Backup {
        /// Destination of the backup bundle
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace the store contents with a backup bundle
    Restore {
        /// Backup bundle to read
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    if let Err(err) = config.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CoreConfig, command: Option<Commands>) -> Result<()> {
    match command {
        None => print_summary(&DataStore::open_with_config(config)?),
        Some(Commands::Backup { file }) => {
            let store = open_persistent(config)?;
            let bundle = store.backup_to_file(&file)?;
            info!("event=cli_backup module=cli status=ok");
            println!(
                "wrote {} customers and {} installations to {}",
                bundle.clients.len(),
                bundle.installations.len(),
                file.display()
            );
            Ok(())
        }
        Some(Commands::Restore { file }) => {
            let mut store = open_persistent(config)?;
            let summary = store.restore_from_file(&file)?;
            info!("event=cli_restore module=cli status=ok");
            println!(
                "restored {} customers and {} installations from {}",
                summary.customers,
                summary.installations,
                file.display()
            );
            Ok(())
        }
    }
}

fn open_persistent(config: &CoreConfig) -> Result<DataStore> {
    let path = config.require_db_path()?;
    DataStore::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

fn print_summary(store: &DataStore) -> Result<()> {
    let snapshot = store.load_snapshot()?;
    let counts = snapshot.status_counts();
    let financials = snapshot.financials();
    println!("fieldbook_core version={}", core_version());
    println!(
        "customers active={} installed={} not_installed={} canceled={}",
        counts.active(),
        counts.installed,
        counts.not_installed,
        counts.canceled
    );
    println!(
        "installations valid={} total={:.2}",
        financials.valid_installations.len(),
        financials.grand_total
    );
    println!("branches={}", snapshot.settings.branches.join(", "));
    match snapshot.settings.last_backup_timestamp {
        Some(at) => println!("last_backup={}", at.to_rfc3339()),
        None => println!("last_backup=never"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, Commands};
    use clap::Parser;
    use fieldbook_core::{
        ConfigError, CoreConfig, CustomerInput, DataStore, DueDay, Plan, DB_PATH_VAR,
    };
    use std::path::PathBuf;

    fn seeded_bundle(dir: &std::path::Path) -> PathBuf {
        let source = DataStore::open_in_memory().unwrap();
        source
            .save_customer(
                &CustomerInput {
                    name: "Ana".to_string(),
                    branch: "Iporanga".to_string(),
                    plan: Some(Plan::Start),
                    due_day: Some(DueDay::Day10),
                },
                None,
            )
            .unwrap();
        let path = dir.join("bundle.json");
        source.backup_to_file(&path).unwrap();
        path
    }

    #[test]
    fn parses_summary_backup_and_restore() {
        let cli = Cli::try_parse_from(["fieldbook"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.db, None);

        let cli = Cli::try_parse_from(["fieldbook", "backup", "out.json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Backup {
                file: PathBuf::from("out.json")
            })
        );

        let cli =
            Cli::try_parse_from(["fieldbook", "restore", "in.json", "--db", "store.db"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Restore {
                file: PathBuf::from("in.json")
            })
        );
        assert_eq!(cli.db, Some(PathBuf::from("store.db")));
    }

    #[test]
    fn rejects_unknown_or_incomplete_commands() {
        assert!(Cli::try_parse_from(["fieldbook", "backup"]).is_err());
        assert!(Cli::try_parse_from(["fieldbook", "export", "x"]).is_err());
        assert!(Cli::try_parse_from(["fieldbook", "restore", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn backup_and_restore_without_store_file_fail_with_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = seeded_bundle(dir.path());
        let config = CoreConfig::default();

        let err = run(
            &config,
            Some(Commands::Restore {
                file: bundle.clone(),
            }),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::Missing {
                variable: DB_PATH_VAR
            })
        );

        let target = dir.path().join("out.json");
        let err = run(&config, Some(Commands::Backup { file: target.clone() })).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(!target.exists());
    }

    #[test]
    fn restore_into_store_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = seeded_bundle(dir.path());
        let db_path = dir.path().join("fieldbook.db");
        let config = CoreConfig {
            db_path: Some(db_path.clone()),
            ..CoreConfig::default()
        };

        run(&config, Some(Commands::Restore { file: bundle })).unwrap();

        let reopened = DataStore::open(&db_path).unwrap();
        let snapshot = reopened.load_snapshot().unwrap();
        assert_eq!(snapshot.customers.len(), 1);
        assert_eq!(snapshot.customers[0].name, "Ana");

        let backup = dir.path().join("again.json");
        run(&config, Some(Commands::Backup { file: backup.clone() })).unwrap();
        let raw = std::fs::read_to_string(&backup).unwrap();
        assert!(raw.contains("\"Ana\""));
    }
}
