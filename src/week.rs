// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Week bucketing for daily snapshots.
//!
//! Weeks are Sunday-anchored and counted from January 1 of the date's own
//! year: week 1 is the Sunday-to-Saturday span containing January 1. This is
//! *not* ISO 8601 (which is Monday-anchored and assigns late-December days to
//! week 1 of the following year). Historical reports were produced with this
//! numbering, so it is kept as is.
//!
//! At a year boundary one calendar week is split between two keys. For
//! example 2023-12-31 (a Sunday) resolves to `2023-W53`, while 2024-01-01
//! resolves to `2024-W01`, whose [`week_start`] is 2023-12-31. As a result
//! `resolve(week_start(resolve(d)))` is not always `resolve(d)`.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

/// A `(year, week_number)` bucket identifier.
///
/// Ordering is by year, then week number, which matches the lexicographic
/// order of the [`Display`](fmt::Display) label for four-digit years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekKey {
    pub year: i32,
    pub week_number: u32,
}

impl WeekKey {
    pub fn new(year: i32, week_number: u32) -> Self {
        Self { year, week_number }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week_number)
    }
}

/// Weekday index of January 1 of `date`'s year, with Sunday = 0.
fn first_weekday_offset(date: NaiveDate) -> u32 {
    (date.weekday().num_days_from_sunday() + 7 - date.ordinal0() % 7) % 7
}

/// Map a date to its week bucket.
pub fn resolve(date: NaiveDate) -> WeekKey {
    let day_of_year = date.ordinal0();
    // ceil((day_of_year + offset + 1) / 7)
    let week_number = (day_of_year + first_weekday_offset(date)) / 7 + 1;
    WeekKey {
        year: date.year(),
        week_number,
    }
}

/// First day of the given week. For week 1 this may fall in the previous
/// calendar year.
///
/// Returns `None` when the week lies outside the range of dates chrono can
/// represent.
pub fn week_start(key: WeekKey) -> Option<NaiveDate> {
    let january_first = NaiveDate::from_yo_opt(key.year, 1)?;
    let days = (i64::from(key.week_number) - 1) * 7
        - i64::from(first_weekday_offset(january_first));
    january_first.checked_add_signed(Duration::days(days))
}

/// Last day of the given week, or `None` outside chrono's date range.
pub fn week_end(key: WeekKey) -> Option<NaiveDate> {
    week_start(key)?.checked_add_signed(Duration::days(6))
}
