// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations.

use crate::aggregate::WeeklyAggregate;
use crate::report::{ReportOptions, WeeklyStats};
use crate::snapshot::{self, SnapshotRecord};
use crate::store::{SnapshotStore, SqliteStore, UnconfiguredStore};
use crate::{config, db};
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::sync::Arc;

/// Run the import command: load a JSON array of snapshot records into the
/// database, one row per platform and day.
pub fn run_import(database: &Utf8Path, input: &Utf8Path) -> Result<()> {
    let content = fs::read_to_string(input.as_std_path())
        .with_context(|| format!("failed to read snapshot file at {}", input))?;
    let records: Vec<SnapshotRecord> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot file at {}", input))?;

    let total = records.len();
    let snapshots = snapshot::validate_records(records);

    println!("Initializing database at {}", database);
    let mut conn = db::init_db(database).context("failed to initialize database")?;

    let tx = conn
        .transaction()
        .context("failed to start import transaction")?;
    for snapshot in &snapshots {
        db::upsert_snapshot(&tx, snapshot)?;
    }
    tx.commit().context("failed to commit import")?;

    println!(
        "Imported {} snapshots ({} skipped)",
        format_number(snapshots.len() as u64),
        format_number((total - snapshots.len()) as u64)
    );
    Ok(())
}

/// Run the weekly command.
pub async fn run_weekly(
    database: &Utf8Path,
    config: &config::Config,
    weeks: Option<usize>,
    json: bool,
) -> Result<()> {
    let weeks = weeks.unwrap_or(config.report.weeks);
    let stats = WeeklyStats::new(open_store(database), ReportOptions::from(&config.report));
    let report = stats.get_weekly_aggregated_stats(weeks).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_weekly_table(&report);
    }
    Ok(())
}

/// Open the snapshot database, or fall back to a store that reports no data.
fn open_store(database: &Utf8Path) -> Arc<dyn SnapshotStore> {
    if !database.as_std_path().exists() {
        tracing::warn!(%database, "database not found, no snapshot store configured");
        return Arc::new(UnconfiguredStore::new(format!(
            "database {} does not exist",
            database
        )));
    }

    match db::init_db(database) {
        Ok(conn) => {
            match db::get_latest_snapshot_date(&conn) {
                Ok(Some(latest)) => tracing::info!(%latest, "latest snapshot"),
                Ok(None) => tracing::info!("database has no snapshots"),
                Err(error) => tracing::debug!(%error, "could not read latest snapshot date"),
            }
            Arc::new(SqliteStore::new(conn))
        }
        Err(error) => {
            tracing::warn!(%database, error = %format!("{error:#}"), "failed to open database");
            Arc::new(UnconfiguredStore::new(error.to_string()))
        }
    }
}

fn print_weekly_table(report: &[WeeklyAggregate]) {
    if report.is_empty() {
        println!("No data.");
        return;
    }

    println!(
        "\n{:<10} {:<12} {:<12} {:>12} {:>8} {:>14} {:>10}",
        "Week", "Start", "End", "Followers", "Posts", "Interactions", "Engagement"
    );
    println!("{}", "=".repeat(84));

    for weekly in report {
        let totals = &weekly.aggregated;
        println!(
            "{:<10} {:<12} {:<12} {:>12} {:>8} {:>14} {:>9.2}%",
            weekly.key().to_string(),
            weekly.week_start.to_string(),
            weekly.week_end.to_string(),
            format_number(totals.total_followers),
            format_number(totals.total_posts),
            format_number(totals.total_interactions),
            totals.avg_engagement
        );
        for (platform, summary) in &weekly.platforms {
            println!(
                "  {:<33} {:>12} {:>8} {:>14} {:>9.2}%",
                platform,
                format_number(summary.followers),
                format_number(summary.total_posts),
                format_number(summary.interactions()),
                summary.avg_engagement
            );
        }
    }
}

/// Format a number with thousands separators.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(4300), "4,300");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[tokio::test]
    async fn test_missing_database_reports_nothing() {
        let store = open_store(Utf8Path::new("no-such-dir/social-stats.db"));
        let stats = WeeklyStats::new(store, ReportOptions::default());
        assert!(stats.get_weekly_aggregated_stats(4).await.is_empty());
    }
}
