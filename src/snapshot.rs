// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily per-platform snapshots.

use crate::error::MalformedSnapshot;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One platform's metrics for one calendar day.
///
/// `(platform, date)` is unique; the store's upsert guarantees it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    pub platform: String,
    pub date: NaiveDate,
    /// Gauge: sampled, never summed across days.
    pub followers: u64,
    pub posts: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
    /// Percentage; averaged, never summed.
    pub engagement_rate: f64,
    pub top_post_url: Option<String>,
}

/// A snapshot as it arrives from the database or an import file, before
/// validation.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub posts: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub engagement_rate: f64,
    #[serde(default)]
    pub top_post_url: Option<String>,
}

/// Years a snapshot date may fall in. Keeps week labels four digits wide and
/// week bounds well inside chrono's range.
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse a date string (YYYY-MM-DD format).
pub fn parse_date(date_str: &str) -> Result<NaiveDate, MalformedSnapshot> {
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| MalformedSnapshot::InvalidDate(date_str.to_string()))?;
    if !SUPPORTED_YEARS.contains(&date.year()) {
        return Err(MalformedSnapshot::DateOutOfRange(date));
    }
    Ok(date)
}

fn counter(field: &'static str, value: i64) -> Result<u64, MalformedSnapshot> {
    u64::try_from(value).map_err(|_| MalformedSnapshot::NegativeCounter { field, value })
}

impl TryFrom<SnapshotRecord> for RawSnapshot {
    type Error = MalformedSnapshot;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let platform = record
            .platform
            .filter(|p| !p.trim().is_empty())
            .ok_or(MalformedSnapshot::MissingPlatform)?;
        let date = record
            .date
            .filter(|d| !d.trim().is_empty())
            .ok_or(MalformedSnapshot::MissingDate)?;
        let date = parse_date(&date)?;

        if !record.engagement_rate.is_finite() {
            return Err(MalformedSnapshot::InvalidEngagement);
        }

        Ok(RawSnapshot {
            platform,
            date,
            followers: counter("followers", record.followers)?,
            posts: counter("posts", record.posts)?,
            likes: counter("likes", record.likes)?,
            comments: counter("comments", record.comments)?,
            shares: counter("shares", record.shares)?,
            views: counter("views", record.views)?,
            engagement_rate: record.engagement_rate,
            top_post_url: record.top_post_url,
        })
    }
}

/// Validate records, dropping (and logging) any that are malformed.
pub fn validate_records(records: impl IntoIterator<Item = SnapshotRecord>) -> Vec<RawSnapshot> {
    records
        .into_iter()
        .filter_map(|record| {
            let platform = record.platform.clone().unwrap_or_default();
            let date = record.date.clone().unwrap_or_default();
            match RawSnapshot::try_from(record) {
                Ok(snapshot) => Some(snapshot),
                Err(error) => {
                    tracing::warn!(%platform, %date, %error, "skipping malformed snapshot");
                    None
                }
            }
        })
        .collect()
}
