// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! tidydir: sort a folder into category subfolders by extension
//!
//! Every move is logged to SQLite. The log backs a dashboard, a JSON API
//! and a PDF report.

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod organizer;
pub mod report;
pub mod web;

pub use classify::ClassificationTable;
pub use config::AppConfig;
pub use db::RecordStore;
pub use error::{Result, TidyError};
pub use organizer::Organizer;
