// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Read-only views over the move log

pub mod pdf;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ReportConfig;
use crate::db::{CategoryCount, DayCount, RecordStore, StoredRecord};
use crate::Result;

/// Day labels and counts, ready for a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub counts: Vec<i64>,
}

impl From<&[DayCount]> for ChartData {
    fn from(days: &[DayCount]) -> Self {
        Self {
            labels: days.iter().map(|d| d.day.format("%Y-%m-%d").to_string()).collect(),
            counts: days.iter().map(|d| d.count).collect(),
        }
    }
}

/// Everything the dashboard page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total: i64,
    pub categories: Vec<CategoryCount>,
    pub daily: ChartData,
    pub recent: Vec<StoredRecord>,
}

/// Category counts as a JSON-friendly map
pub fn category_summary(store: &RecordStore) -> Result<BTreeMap<String, i64>> {
    Ok(store
        .count_by_category()?
        .into_iter()
        .map(|c| (c.category, c.count))
        .collect())
}

pub fn chart_data(store: &RecordStore) -> Result<ChartData> {
    let days = store.count_by_day()?;
    Ok(ChartData::from(days.as_slice()))
}

pub fn dashboard(store: &RecordStore, recent_limit: usize) -> Result<DashboardSnapshot> {
    Ok(DashboardSnapshot {
        total: store.count()?,
        categories: store.count_by_category()?,
        daily: chart_data(store)?,
        recent: store.list_recent(recent_limit)?,
    })
}

/// Render the PDF report for `dir` and write it into that directory
pub fn write_pdf_report(store: &RecordStore, dir: &Path, config: &ReportConfig) -> Result<PathBuf> {
    let records = store.list_under(dir)?;
    let bytes = pdf::render(&config.title, &records)?;

    let path = dir.join(&config.file_name);
    std::fs::write(&path, bytes)?;
    info!("Wrote report for {} records to {:?}", records.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MoveLog, MoveRecord, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;

    fn append(store: &RecordStore, name: &str, category: &str, dest: &Path, when: &str) {
        store
            .append(&MoveRecord {
                filename: name.to_string(),
                category: category.to_string(),
                destination_path: dest.to_string_lossy().into_owned(),
                timestamp: NaiveDateTime::parse_from_str(when, TIMESTAMP_FORMAT).unwrap(),
            })
            .unwrap();
    }

    #[test]
    fn test_chart_data_labels_by_day() {
        let store = RecordStore::in_memory().unwrap();
        append(&store, "a", "Others", Path::new("/x/Others/a"), "2024-05-01 09:00:00");
        append(&store, "b", "Others", Path::new("/x/Others/b"), "2024-05-01 10:00:00");
        append(&store, "c", "Others", Path::new("/x/Others/c"), "2024-05-03 10:00:00");

        let chart = chart_data(&store).unwrap();
        assert_eq!(chart.labels, vec!["2024-05-01", "2024-05-03"]);
        assert_eq!(chart.counts, vec![2, 1]);
    }

    #[test]
    fn test_dashboard_snapshot() {
        let store = RecordStore::in_memory().unwrap();
        for i in 0..5 {
            append(
                &store,
                &format!("f{}.png", i),
                "Images",
                Path::new("/x/Images"),
                &format!("2024-05-01 09:00:0{}", i),
            );
        }

        let snapshot = dashboard(&store, 3).unwrap();
        assert_eq!(snapshot.total, 5);
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(snapshot.recent[0].record.filename, "f4.png");
        assert_eq!(snapshot.categories[0].count, 5);

        let summary = category_summary(&store).unwrap();
        assert_eq!(summary["Images"], 5);
        assert_eq!(summary["Audio"], 0);
    }

    #[test]
    fn test_pdf_report_written_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::in_memory().unwrap();
        append(
            &store,
            "a.txt",
            "Documents",
            &dir.path().join("Documents/a.txt"),
            "2024-05-01 09:00:00",
        );

        let path = write_pdf_report(&store, dir.path(), &ReportConfig::default()).unwrap();
        assert_eq!(path, dir.path().join("organization_report.pdf"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
