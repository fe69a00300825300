// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the snapshot store and snapshot validation.

use thiserror::Error;

/// Failure to obtain snapshots from the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot store query failed")]
    Query(#[from] rusqlite::Error),

    #[error("snapshot fetch timed out")]
    TimedOut,
}

/// Reason a stored or imported record cannot be used as a snapshot.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedSnapshot {
    #[error("record has no platform")]
    MissingPlatform,

    #[error("record has no date")]
    MissingDate,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("date {0} is outside years 1 through 9999")]
    DateOutOfRange(chrono::NaiveDate),

    #[error("negative {field} count: {value}")]
    NegativeCounter { field: &'static str, value: i64 },

    #[error("engagement rate is not a finite number")]
    InvalidEngagement,
}
