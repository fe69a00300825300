// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly rollups of daily social-media platform snapshots.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    social_stats_rollup::dispatch::dispatch().await
}
