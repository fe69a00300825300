// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing and command dispatch.

use crate::{commands, config, logging};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "social-stats.db", global = true)]
    database: Utf8PathBuf,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Import daily platform snapshots from a JSON file
    Import {
        /// JSON file containing an array of snapshot records
        input: Utf8PathBuf,
    },

    /// Show weekly cross-platform statistics
    Weekly {
        /// Number of weeks to show (default: from config, or 8)
        #[arg(short = 'n', long)]
        weeks: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse arguments and dispatch to the appropriate command.
pub async fn dispatch() -> Result<()> {
    let args = Args::parse();

    let config =
        config::Config::load_or_default(&args.config).context("failed to load configuration")?;
    logging::init(&config.log.level);

    match args.command {
        Command::Import { input } => {
            commands::run_import(&args.database, &input)?;
        }
        Command::Weekly { weeks, json } => {
            commands::run_weekly(&args.database, &config, weeks, json).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weekly_args() {
        let args = Args::try_parse_from(["social-stats-rollup", "weekly", "-n", "4", "--json"])
            .unwrap();
        assert_eq!(args.database, "social-stats.db");
        match args.command {
            Command::Weekly { weeks, json } => {
                assert_eq!(weeks, Some(4));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_args() {
        let args = Args::try_parse_from([
            "social-stats-rollup",
            "--database",
            "stats.db",
            "import",
            "snapshots.json",
        ])
        .unwrap();
        assert_eq!(args.database, "stats.db");
        assert!(matches!(args.command, Command::Import { input } if input == "snapshots.json"));
    }
}
