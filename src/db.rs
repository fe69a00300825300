// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database operations for platform snapshots.

use crate::snapshot::{RawSnapshot, SnapshotRecord};
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

/// Open the database at `path` and initialize the schema.
pub fn init_db(path: &Utf8Path) -> Result<Connection> {
    let conn = Connection::open(path.as_std_path())
        .with_context(|| format!("failed to open database at {}", path))?;

    // journal_mode and synchronous persist in the file; the rest are
    // per-connection and must be set each time.
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -64000;
        PRAGMA mmap_size = 134217728;
        PRAGMA temp_store = MEMORY;
        "#,
    )
    .context("failed to set database pragmas")?;

    create_schema(&conn)?;
    Ok(conn)
}

/// Create tables and indexes if they don't exist yet.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per platform per day
        CREATE TABLE IF NOT EXISTS social_snapshots (
            platform TEXT NOT NULL,
            date TEXT NOT NULL,              -- ISO8601 date (YYYY-MM-DD)
            followers INTEGER NOT NULL DEFAULT 0,
            posts INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            comments INTEGER NOT NULL DEFAULT 0,
            shares INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            engagement_rate REAL NOT NULL DEFAULT 0,
            top_post_url TEXT,
            PRIMARY KEY (platform, date)
        ) WITHOUT ROWID;

        CREATE INDEX IF NOT EXISTS idx_snapshots_date ON social_snapshots(date);
        "#,
    )
    .context("failed to initialize database schema")?;
    Ok(())
}

/// Insert or replace the snapshot for `(platform, date)`.
pub fn upsert_snapshot(conn: &Connection, snapshot: &RawSnapshot) -> Result<()> {
    conn.execute(
        "INSERT INTO social_snapshots
            (platform, date, followers, posts, likes, comments, shares, views,
             engagement_rate, top_post_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (platform, date) DO UPDATE SET
            followers = excluded.followers,
            posts = excluded.posts,
            likes = excluded.likes,
            comments = excluded.comments,
            shares = excluded.shares,
            views = excluded.views,
            engagement_rate = excluded.engagement_rate,
            top_post_url = excluded.top_post_url",
        params![
            snapshot.platform,
            snapshot.date.to_string(),
            snapshot.followers as i64,
            snapshot.posts as i64,
            snapshot.likes as i64,
            snapshot.comments as i64,
            snapshot.shares as i64,
            snapshot.views as i64,
            snapshot.engagement_rate,
            snapshot.top_post_url,
        ],
    )
    .with_context(|| {
        format!(
            "failed to upsert snapshot for {} on {}",
            snapshot.platform, snapshot.date
        )
    })?;
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT platform, date, followers, posts, likes, comments, shares,
        views, engagement_rate, top_post_url
     FROM social_snapshots";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        platform: row.get(0)?,
        date: row.get(1)?,
        followers: row.get(2)?,
        posts: row.get(3)?,
        likes: row.get(4)?,
        comments: row.get(5)?,
        shares: row.get(6)?,
        views: row.get(7)?,
        engagement_rate: row.get(8)?,
        top_post_url: row.get(9)?,
    })
}

/// All records dated on or after `start`, across platforms, unordered.
pub fn fetch_snapshot_records(
    conn: &Connection,
    start: NaiveDate,
) -> rusqlite::Result<Vec<SnapshotRecord>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE date >= ?1"))?;
    let rows = stmt.query_map([start.to_string()], record_from_row)?;
    rows.collect()
}

/// Records for a single platform dated on or after `start`, unordered.
pub fn fetch_platform_snapshot_records(
    conn: &Connection,
    platform: &str,
    start: NaiveDate,
) -> rusqlite::Result<Vec<SnapshotRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE platform = ?1 AND date >= ?2"
    ))?;
    let rows = stmt.query_map(params![platform, start.to_string()], record_from_row)?;
    rows.collect()
}

/// Get the latest snapshot date, if any.
pub fn get_latest_snapshot_date(conn: &Connection) -> Result<Option<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT MAX(date) FROM social_snapshots")?;
    let result: Option<String> = stmt.query_row([], |row| row.get(0))?;

    match result {
        Some(date_str) => {
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .context("failed to parse date from database")?;
            Ok(Some(date))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    fn snapshot(platform: &str, day: u32, likes: u64) -> RawSnapshot {
        RawSnapshot {
            platform: platform.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            followers: 100,
            posts: 1,
            likes,
            comments: 0,
            shares: 0,
            views: 0,
            engagement_rate: 3.5,
            top_post_url: None,
        }
    }

    #[test]
    fn test_upsert_replaces_same_day() {
        let conn = memory_db();
        upsert_snapshot(&conn, &snapshot("instagram", 3, 10)).unwrap();
        upsert_snapshot(&conn, &snapshot("instagram", 3, 25)).unwrap();

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records = fetch_snapshot_records(&conn, start).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].likes, 25);
        assert_eq!(records[0].engagement_rate, 3.5);
    }

    #[test]
    fn test_fetch_respects_start_date_and_platform() {
        let conn = memory_db();
        upsert_snapshot(&conn, &snapshot("instagram", 1, 1)).unwrap();
        upsert_snapshot(&conn, &snapshot("instagram", 5, 1)).unwrap();
        upsert_snapshot(&conn, &snapshot("tiktok", 5, 1)).unwrap();

        let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(fetch_snapshot_records(&conn, start).unwrap().len(), 2);

        let tiktok = fetch_platform_snapshot_records(&conn, "tiktok", start).unwrap();
        assert_eq!(tiktok.len(), 1);
        assert_eq!(tiktok[0].platform.as_deref(), Some("tiktok"));
    }

    #[test]
    fn test_latest_snapshot_date() {
        let conn = memory_db();
        assert_eq!(get_latest_snapshot_date(&conn).unwrap(), None);

        upsert_snapshot(&conn, &snapshot("instagram", 2, 1)).unwrap();
        upsert_snapshot(&conn, &snapshot("tiktok", 9, 1)).unwrap();
        assert_eq!(
            get_latest_snapshot_date(&conn).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
    }
}
