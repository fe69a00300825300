// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly rollups of daily social-media platform snapshots.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod week;
