// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sources of raw snapshots.

use crate::db;
use crate::error::StoreError;
use crate::snapshot::{self, RawSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tokio::task;

/// Supplies raw per-platform daily snapshots.
///
/// Results are in no particular order. Implementations drop malformed rows
/// (logging them) rather than failing the whole fetch.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// All snapshots dated on or after `start`, across platforms.
    async fn fetch_snapshots(&self, start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError>;

    /// Snapshots for one platform dated on or after `start`.
    async fn fetch_platform_snapshots(
        &self,
        platform: &str,
        start: NaiveDate,
    ) -> Result<Vec<RawSnapshot>, StoreError> {
        let mut snapshots = self.fetch_snapshots(start).await?;
        snapshots.retain(|s| s.platform == platform);
        Ok(snapshots)
    }
}

/// Stand-in used when no store is configured. Every fetch fails with
/// [`StoreError::Unavailable`].
#[derive(Debug, Default)]
pub struct UnconfiguredStore {
    reason: String,
}

impl UnconfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SnapshotStore for UnconfiguredStore {
    async fn fetch_snapshots(&self, _start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

/// Snapshot store backed by a SQLite database.
///
/// Queries run on tokio's blocking pool, so a slow query never stalls the
/// runtime and a caller's deadline can still fire while it is in flight.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || -> Result<T, StoreError> {
            let conn = conn.lock().map_err(|_| {
                StoreError::Unavailable("database connection lock poisoned".into())
            })?;
            Ok(f(&conn)?)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("query task failed: {e}")))?
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn fetch_snapshots(&self, start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
        let records = self
            .with_conn(move |conn| db::fetch_snapshot_records(conn, start))
            .await?;
        Ok(snapshot::validate_records(records))
    }

    async fn fetch_platform_snapshots(
        &self,
        platform: &str,
        start: NaiveDate,
    ) -> Result<Vec<RawSnapshot>, StoreError> {
        let platform = platform.to_string();
        let records = self
            .with_conn(move |conn| db::fetch_platform_snapshot_records(conn, &platform, start))
            .await?;
        Ok(snapshot::validate_records(records))
    }
}
