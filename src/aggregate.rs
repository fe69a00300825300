// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly aggregation of platform snapshots.
//!
//! Fields are rolled up according to what they measure:
//!
//! * followers is a gauge, so the latest value in the week wins;
//! * posts, likes, comments, shares and views are daily counters and are summed;
//! * engagement rate is a ratio and is averaged.

use crate::snapshot::RawSnapshot;
use crate::week::{self, WeekKey};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One platform's rollup for one week.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformWeekSummary {
    pub followers: u64,
    pub total_posts: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_views: u64,
    pub avg_engagement: f64,
    pub top_post_url: Option<String>,
}

impl PlatformWeekSummary {
    /// Likes + comments + shares.
    pub fn interactions(&self) -> u64 {
        self.total_likes
            .saturating_add(self.total_comments)
            .saturating_add(self.total_shares)
    }
}

/// Cross-platform totals for one week.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTotals {
    pub total_followers: u64,
    pub total_posts: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_views: u64,
    pub total_interactions: u64,
    pub avg_engagement: f64,
}

/// A complete week record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAggregate {
    pub week_number: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub year: i32,
    pub platforms: BTreeMap<String, PlatformWeekSummary>,
    pub aggregated: AggregatedTotals,
}

impl WeeklyAggregate {
    pub fn key(&self) -> WeekKey {
        WeekKey::new(self.year, self.week_number)
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

/// Roll up one platform's snapshots for one week.
///
/// The platform is implied by the caller's grouping: all snapshots are
/// expected to share one platform and one week. Returns `None` for an empty
/// slice, which callers never produce.
///
/// Counter sums saturate at `u64::MAX`.
pub fn aggregate_platform_week(snapshots: &[RawSnapshot]) -> Option<PlatformWeekSummary> {
    let latest = snapshots.iter().max_by_key(|s| s.date)?;

    let mut summary = PlatformWeekSummary {
        followers: latest.followers,
        top_post_url: latest.top_post_url.clone(),
        avg_engagement: mean(snapshots.iter().map(|s| s.engagement_rate)),
        ..Default::default()
    };

    for snapshot in snapshots {
        summary.total_posts = summary.total_posts.saturating_add(snapshot.posts);
        summary.total_likes = summary.total_likes.saturating_add(snapshot.likes);
        summary.total_comments = summary.total_comments.saturating_add(snapshot.comments);
        summary.total_shares = summary.total_shares.saturating_add(snapshot.shares);
        summary.total_views = summary.total_views.saturating_add(snapshot.views);
    }

    Some(summary)
}

/// Combine per-platform summaries into the week's aggregate.
///
/// The cross-platform engagement is the plain mean of each platform's
/// average, not weighted by post volume. Downstream reports depend on this.
///
/// Returns `None` if the week's bounds fall outside chrono's date range.
pub fn rollup(
    key: WeekKey,
    platforms: BTreeMap<String, PlatformWeekSummary>,
) -> Option<WeeklyAggregate> {
    let week_start = week::week_start(key)?;
    let week_end = week::week_end(key)?;

    let mut aggregated = AggregatedTotals {
        avg_engagement: mean(platforms.values().map(|p| p.avg_engagement)),
        ..Default::default()
    };

    for summary in platforms.values() {
        aggregated.total_followers = aggregated.total_followers.saturating_add(summary.followers);
        aggregated.total_posts = aggregated.total_posts.saturating_add(summary.total_posts);
        aggregated.total_likes = aggregated.total_likes.saturating_add(summary.total_likes);
        aggregated.total_comments = aggregated
            .total_comments
            .saturating_add(summary.total_comments);
        aggregated.total_shares = aggregated.total_shares.saturating_add(summary.total_shares);
        aggregated.total_views = aggregated.total_views.saturating_add(summary.total_views);
    }
    aggregated.total_interactions = aggregated
        .total_likes
        .saturating_add(aggregated.total_comments)
        .saturating_add(aggregated.total_shares);

    Some(WeeklyAggregate {
        week_number: key.week_number,
        week_start,
        week_end,
        year: key.year,
        platforms,
        aggregated,
    })
}
