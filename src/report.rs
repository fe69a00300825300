// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly report assembly.
//!
//! [`assemble`] is a pure function from a snapshot window to an ordered list
//! of weekly aggregates. [`WeeklyStats`] wraps it with the store fetch and
//! turns every fetch failure into an empty report: callers treat reporting as
//! best-effort and must never see a partial week.

use crate::aggregate::{self, PlatformWeekSummary, WeeklyAggregate};
use crate::config::ReportConfig;
use crate::error::StoreError;
use crate::snapshot::RawSnapshot;
use crate::store::SnapshotStore;
use crate::week::{self, WeekKey};
use chrono::{Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Group snapshots into weeks and platforms, roll each week up, and return
/// the most recent `requested_weeks` weeks in ascending order.
pub fn assemble(snapshots: &[RawSnapshot], requested_weeks: usize) -> Vec<WeeklyAggregate> {
    let mut by_week: HashMap<WeekKey, BTreeMap<&str, Vec<RawSnapshot>>> = HashMap::new();
    for snapshot in snapshots {
        by_week
            .entry(week::resolve(snapshot.date))
            .or_default()
            .entry(snapshot.platform.as_str())
            .or_default()
            .push(snapshot.clone());
    }

    let mut weeks: Vec<WeeklyAggregate> = by_week
        .into_iter()
        .filter_map(|(key, platforms)| {
            let summaries: BTreeMap<String, PlatformWeekSummary> = platforms
                .into_iter()
                .filter_map(|(platform, snapshots)| {
                    aggregate::aggregate_platform_week(&snapshots)
                        .map(|summary| (platform.to_string(), summary))
                })
                .collect();
            let weekly = aggregate::rollup(key, summaries);
            if weekly.is_none() {
                warn!(week = %key, "week lies outside the supported date range, skipping");
            }
            weekly
        })
        .collect();

    weeks.sort_by_key(WeeklyAggregate::key);

    let skip = weeks.len().saturating_sub(requested_weeks);
    weeks.split_off(skip)
}

/// First day of the fetch window: `weeks * 7 + 7` days before `today`, the
/// extra week covering the oldest requested week in full. Windows reaching
/// past the earliest representable date start at [`NaiveDate::MIN`].
fn window_start(today: NaiveDate, weeks: usize) -> NaiveDate {
    i64::try_from(weeks)
        .ok()
        .and_then(|w| w.checked_mul(7)?.checked_add(7))
        .and_then(Duration::try_days)
        .and_then(|window| today.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN)
}

/// Options controlling how [`WeeklyStats`] fetches snapshots.
#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub fetch_timeout: std::time::Duration,
    /// When non-empty, fetch each platform concurrently instead of issuing a
    /// single query.
    pub fan_out_platforms: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: std::time::Duration::from_secs(30),
            fan_out_platforms: Vec::new(),
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            fan_out_platforms: if config.fan_out {
                config.platforms.clone()
            } else {
                Vec::new()
            },
        }
    }
}

/// Produces weekly aggregates from a snapshot store.
pub struct WeeklyStats {
    store: Arc<dyn SnapshotStore>,
    options: ReportOptions,
}

impl WeeklyStats {
    pub fn new(store: Arc<dyn SnapshotStore>, options: ReportOptions) -> Self {
        Self { store, options }
    }

    /// Weekly aggregates for the last `weeks` weeks, oldest first.
    pub async fn get_weekly_aggregated_stats(&self, weeks: usize) -> Vec<WeeklyAggregate> {
        let today = Utc::now().date_naive();
        self.get_weekly_aggregated_stats_as_of(today, weeks).await
    }

    /// Like [`get_weekly_aggregated_stats`](Self::get_weekly_aggregated_stats),
    /// with "today" supplied by the caller.
    pub async fn get_weekly_aggregated_stats_as_of(
        &self,
        today: NaiveDate,
        weeks: usize,
    ) -> Vec<WeeklyAggregate> {
        if weeks == 0 {
            return Vec::new();
        }

        let start = window_start(today, weeks);

        let snapshots = match self.fetch_window(start).await {
            Ok(snapshots) => snapshots,
            Err(error) => {
                warn!(%start, %error, "snapshot fetch failed, reporting no data");
                return Vec::new();
            }
        };

        if snapshots.is_empty() {
            info!(%start, "no snapshots in window");
            return Vec::new();
        }

        let report = assemble(&snapshots, weeks);
        debug!(
            snapshots = snapshots.len(),
            weeks = report.len(),
            "assembled weekly report"
        );
        report
    }

    /// Fetch the full window under the deadline, or fail.
    async fn fetch_window(&self, start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
        tokio::time::timeout(self.options.fetch_timeout, self.fetch_all(start))
            .await
            .map_err(|_| StoreError::TimedOut)?
    }

    /// A single query, or one concurrent query per platform. If any
    /// platform fails the whole fetch fails; a partial window is never
    /// returned.
    async fn fetch_all(&self, start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
        if self.options.fan_out_platforms.is_empty() {
            return self.store.fetch_snapshots(start).await;
        }

        let fetches = self
            .options
            .fan_out_platforms
            .iter()
            .map(|platform| self.store.fetch_platform_snapshots(platform, start));
        let per_platform = futures::future::try_join_all(fetches).await?;
        Ok(per_platform.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UnconfiguredStore;
    use async_trait::async_trait;

    fn snapshot(
        platform: &str,
        date: NaiveDate,
        followers: u64,
        likes: u64,
        rate: f64,
    ) -> RawSnapshot {
        RawSnapshot {
            platform: platform.to_string(),
            date,
            followers,
            posts: 1,
            likes,
            comments: 2,
            shares: 3,
            views: 10,
            engagement_rate: rate,
            top_post_url: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three Sunday-anchored weeks in March 2025, two platforms.
    fn sample() -> Vec<RawSnapshot> {
        vec![
            snapshot("instagram", date(2025, 3, 18), 2600, 30, 3.0),
            snapshot("instagram", date(2025, 3, 3), 2400, 50, 6.0),
            snapshot("tiktok", date(2025, 3, 11), 1800, 40, 9.0),
            snapshot("instagram", date(2025, 3, 5), 2500, 100, 4.0),
            snapshot("instagram", date(2025, 3, 12), 2550, 20, 5.0),
            snapshot("tiktok", date(2025, 3, 4), 1700, 70, 9.0),
        ]
    }

    struct FixedStore(Vec<RawSnapshot>);

    #[async_trait]
    impl SnapshotStore for FixedStore {
        async fn fetch_snapshots(&self, start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
            Ok(self.0.iter().filter(|s| s.date >= start).cloned().collect())
        }
    }

    struct SlowStore;

    #[async_trait]
    impl SnapshotStore for SlowStore {
        async fn fetch_snapshots(&self, _start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            Ok(sample())
        }
    }

    /// Succeeds for instagram, fails for everything else.
    struct PartialStore;

    #[async_trait]
    impl SnapshotStore for PartialStore {
        async fn fetch_snapshots(&self, _start: NaiveDate) -> Result<Vec<RawSnapshot>, StoreError> {
            Ok(sample())
        }

        async fn fetch_platform_snapshots(
            &self,
            platform: &str,
            _start: NaiveDate,
        ) -> Result<Vec<RawSnapshot>, StoreError> {
            if platform == "instagram" {
                Ok(sample()
                    .into_iter()
                    .filter(|s| s.platform == platform)
                    .collect())
            } else {
                Err(StoreError::Unavailable(format!("{platform} offline")))
            }
        }
    }

    #[test]
    fn test_assemble_empty_input() {
        assert!(assemble(&[], 8).is_empty());
    }

    #[test]
    fn test_assemble_groups_by_week_and_platform() {
        let report = assemble(&sample(), 8);
        assert_eq!(report.len(), 3);

        let first = &report[0];
        assert_eq!(first.key(), WeekKey::new(2025, 10));
        assert_eq!(first.week_start, date(2025, 3, 2));
        assert_eq!(first.week_end, date(2025, 3, 8));
        assert_eq!(first.platforms.len(), 2);

        let instagram = &first.platforms["instagram"];
        assert_eq!(instagram.total_likes, 150);
        assert_eq!(instagram.avg_engagement, 5.0);
        assert_eq!(instagram.followers, 2500);

        assert_eq!(first.aggregated.total_followers, 2500 + 1700);
        assert_eq!(first.aggregated.avg_engagement, 7.0);
    }

    #[test]
    fn test_assemble_is_ascending_and_keeps_most_recent() {
        let report = assemble(&sample(), 2);
        let keys: Vec<WeekKey> = report.iter().map(WeeklyAggregate::key).collect();
        assert_eq!(keys, vec![WeekKey::new(2025, 11), WeekKey::new(2025, 12)]);
    }

    #[test]
    fn test_assemble_more_weeks_than_data() {
        assert_eq!(assemble(&sample(), 52).len(), 3);
    }

    #[test]
    fn test_assemble_single_platform_week() {
        let report = assemble(&sample(), 8);
        let last = report.last().unwrap();
        assert_eq!(last.platforms.len(), 1);
        assert_eq!(
            last.aggregated.avg_engagement,
            last.platforms["instagram"].avg_engagement
        );
    }

    #[test]
    fn test_assemble_is_order_independent() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(assemble(&forward, 8), assemble(&reversed, 8));
        assert_eq!(assemble(&forward, 8), assemble(&forward, 8));
    }

    #[test]
    fn test_assemble_across_year_boundary() {
        let snapshots = vec![
            snapshot("instagram", date(2025, 1, 2), 10, 1, 1.0),
            snapshot("instagram", date(2024, 12, 20), 8, 1, 1.0),
            snapshot("instagram", date(2024, 12, 31), 9, 1, 1.0),
        ];
        let report = assemble(&snapshots, 8);
        let keys: Vec<WeekKey> = report.iter().map(WeeklyAggregate::key).collect();
        assert_eq!(
            keys,
            vec![
                WeekKey::new(2024, 51),
                WeekKey::new(2024, 53),
                WeekKey::new(2025, 1)
            ]
        );
    }

    #[test]
    fn test_assemble_invariants_hold() {
        for weekly in assemble(&sample(), 8) {
            let followers: u64 = weekly.platforms.values().map(|p| p.followers).sum();
            let interactions: u64 = weekly.platforms.values().map(|p| p.interactions()).sum();
            assert_eq!(weekly.aggregated.total_followers, followers);
            assert_eq!(weekly.aggregated.total_interactions, interactions);
        }

        let input_likes: u64 = sample().iter().map(|s| s.likes).sum();
        let output_likes: u64 = assemble(&sample(), 8)
            .iter()
            .map(|w| w.aggregated.total_likes)
            .sum();
        assert_eq!(input_likes, output_likes);
    }

    #[tokio::test]
    async fn test_stats_from_store() {
        let stats = WeeklyStats::new(Arc::new(FixedStore(sample())), ReportOptions::default());
        let report = stats
            .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 2)
            .await;
        assert_eq!(report.len(), 2);
        assert_eq!(report[1].key(), WeekKey::new(2025, 12));
    }

    #[tokio::test]
    async fn test_stats_window_excludes_old_snapshots() {
        // One requested week reaches back 14 days: 2025-03-06 onwards.
        let stats = WeeklyStats::new(Arc::new(FixedStore(sample())), ReportOptions::default());
        let report = stats
            .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 8)
            .await;
        assert_eq!(report.len(), 3);

        let narrow = stats
            .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 1)
            .await;
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow[0].key(), WeekKey::new(2025, 12));
    }

    #[tokio::test]
    async fn test_stats_zero_weeks() {
        let stats = WeeklyStats::new(Arc::new(FixedStore(sample())), ReportOptions::default());
        assert!(
            stats
                .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 0)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_stats_unconfigured_store_is_empty() {
        let stats = WeeklyStats::new(
            Arc::new(UnconfiguredStore::new("no database")),
            ReportOptions::default(),
        );
        assert!(stats.get_weekly_aggregated_stats(8).await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_empty_window_is_empty() {
        let stats = WeeklyStats::new(Arc::new(FixedStore(Vec::new())), ReportOptions::default());
        assert!(stats.get_weekly_aggregated_stats(8).await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_timeout_is_empty() {
        let options = ReportOptions {
            fetch_timeout: std::time::Duration::from_millis(10),
            ..Default::default()
        };
        let stats = WeeklyStats::new(Arc::new(SlowStore), options);
        assert!(
            stats
                .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 8)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_stats_fan_out_joins_platforms() {
        let options = ReportOptions {
            fan_out_platforms: vec!["instagram".to_string(), "tiktok".to_string()],
            ..Default::default()
        };
        let stats = WeeklyStats::new(Arc::new(FixedStore(sample())), options);
        let report = stats
            .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 8)
            .await;
        assert_eq!(report, assemble(&sample(), 8));
    }

    #[tokio::test]
    async fn test_stats_fan_out_failure_is_not_partial() {
        let options = ReportOptions {
            fan_out_platforms: vec!["instagram".to_string(), "tiktok".to_string()],
            ..Default::default()
        };
        let stats = WeeklyStats::new(Arc::new(PartialStore), options);
        assert!(
            stats
                .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 8)
                .await
                .is_empty()
        );
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(date(2025, 3, 20), 1), date(2025, 3, 6));
        assert_eq!(window_start(date(2025, 3, 20), 8), date(2025, 1, 16));
        assert_eq!(window_start(date(2025, 3, 20), 100_000_000), NaiveDate::MIN);
        assert_eq!(window_start(date(2025, 3, 20), usize::MAX), NaiveDate::MIN);
    }

    #[tokio::test]
    async fn test_stats_huge_week_count_returns_everything() {
        let stats = WeeklyStats::new(Arc::new(FixedStore(sample())), ReportOptions::default());
        let report = stats
            .get_weekly_aggregated_stats_as_of(date(2025, 3, 20), 100_000_000)
            .await;
        assert_eq!(report, assemble(&sample(), 8));

        let unconfigured = WeeklyStats::new(
            Arc::new(UnconfiguredStore::new("no database")),
            ReportOptions::default(),
        );
        assert!(
            unconfigured
                .get_weekly_aggregated_stats(100_000_000)
                .await
                .is_empty()
        );
        assert!(
            unconfigured
                .get_weekly_aggregated_stats(usize::MAX)
                .await
                .is_empty()
        );
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ReportConfig::default();
        assert!(ReportOptions::from(&config).fan_out_platforms.is_empty());

        config.fan_out = true;
        let options = ReportOptions::from(&config);
        assert_eq!(options.fan_out_platforms, vec!["instagram", "tiktok"]);
        assert_eq!(options.fetch_timeout, std::time::Duration::from_secs(30));
    }
}
