// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Append-only move log backed by SQLite

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::classify::ClassificationTable;
use crate::config::AppConfig;
use crate::{Result, TidyError};

/// Text layout of the `date` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A completed move, as handed to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub filename: String,
    pub category: String,
    pub destination_path: String,
    pub timestamp: NaiveDateTime,
}

impl MoveRecord {
    /// Record a move that finished just now
    pub fn now(filename: &str, category: &str, destination: &Path) -> Self {
        let now = Local::now().naive_local();
        Self {
            filename: filename.to_string(),
            category: category.to_string(),
            destination_path: destination.to_string_lossy().into_owned(),
            timestamp: now.with_nanosecond(0).unwrap_or(now),
        }
    }
}

/// A record read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: MoveRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Where the organizer writes completed moves
pub trait MoveLog: Send + Sync {
    /// Persist one record and return its id
    fn append(&self, record: &MoveRecord) -> Result<i64>;
}

/// SQLite record store (thread-safe wrapper)
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
    known_categories: Arc<Vec<String>>,
}

impl RecordStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open the configured database, reporting the configured categories
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Self::open(&config.database.path)?;
        Ok(store.with_categories(config.classification_table().categories()))
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            known_categories: Arc::new(ClassificationTable::default().categories()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Categories reported even when nothing was moved into them
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.known_categories = Arc::new(categories);
        self
    }

    pub fn known_categories(&self) -> &[String] {
        &self.known_categories
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TidyError::StorageUnavailable("Database lock poisoned".to_string()))
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS organized_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT,
                filetype TEXT,
                new_path TEXT,
                date TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_organized_files_date ON organized_files(date);
        "#)?;
        Ok(())
    }

    /// All records, newest first
    pub fn list_all(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, filename, filetype, new_path, date
               FROM organized_files ORDER BY date DESC, id DESC"#
        )?;
        let records = stmt.query_map([], read_record)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// The newest `limit` records
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, filename, filetype, new_path, date
               FROM organized_files ORDER BY date DESC, id DESC LIMIT ?1"#
        )?;
        let records = stmt
            .query_map(params![limit as i64], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Records whose destination lies inside `dir`, newest first
    pub fn list_under(&self, dir: &Path) -> Result<Vec<StoredRecord>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| Path::new(&r.record.destination_path).starts_with(dir))
            .collect())
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM organized_files", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Moves per category. Known categories come first in declaration
    /// order, zero counts included; other stored labels follow by name.
    pub fn count_by_category(&self) -> Result<Vec<CategoryCount>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT COALESCE(filetype, ''), COUNT(*) FROM organized_files GROUP BY filetype"#
        )?;
        let mut observed: HashMap<String, i64> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut counts: Vec<CategoryCount> = self
            .known_categories
            .iter()
            .map(|name| CategoryCount {
                category: name.clone(),
                count: observed.remove(name).unwrap_or(0),
            })
            .collect();

        let mut unknown: Vec<CategoryCount> = observed
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        unknown.sort_by(|a, b| a.category.cmp(&b.category));
        counts.extend(unknown);
        Ok(counts)
    }

    /// Moves per calendar day, oldest day first
    pub fn count_by_day(&self) -> Result<Vec<DayCount>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT substr(date, 1, 10) AS day, COUNT(*) FROM organized_files
               WHERE date IS NOT NULL GROUP BY day ORDER BY day ASC"#
        )?;
        let days = stmt
            .query_map([], |row| {
                let day: String = row.get(0)?;
                Ok(DayCount {
                    day: NaiveDate::parse_from_str(&day, DAY_FORMAT).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
                    })?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }
}

impl MoveLog for RecordStore {
    fn append(&self, record: &MoveRecord) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO organized_files (filename, filetype, new_path, date) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.filename,
                record.category,
                record.destination_path,
                record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )
        .map_err(|e| TidyError::StorageUnavailable(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let date: String = row.get(4)?;
    let timestamp = NaiveDateTime::parse_from_str(&date, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoredRecord {
        id: row.get(0)?,
        record: MoveRecord {
            filename: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            category: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            destination_path: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            timestamp,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record_at(filename: &str, category: &str, when: &str) -> MoveRecord {
        MoveRecord {
            filename: filename.to_string(),
            category: category.to_string(),
            destination_path: format!("/data/{}/{}", category, filename),
            timestamp: NaiveDateTime::parse_from_str(when, TIMESTAMP_FORMAT).unwrap(),
        }
    }

    #[test]
    fn test_append_then_list_returns_record_first() {
        let store = RecordStore::in_memory().unwrap();
        store.append(&record_at("old.txt", "Documents", "2024-01-01 08:00:00")).unwrap();

        let record = MoveRecord::now("photo.jpg", "Images", &PathBuf::from("/data/Images/photo.jpg"));
        let id = store.append(&record).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].record, record);
    }

    #[test]
    fn test_same_second_ties_newest_id_first() {
        let store = RecordStore::in_memory().unwrap();
        store.append(&record_at("a.txt", "Documents", "2024-03-01 10:00:00")).unwrap();
        store.append(&record_at("b.txt", "Documents", "2024-03-01 10:00:00")).unwrap();

        let names: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.record.filename)
            .collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(store.list_recent(1).unwrap()[0].record.filename, "b.txt");
    }

    #[test]
    fn test_count_by_category_reports_every_known_category() {
        let store = RecordStore::in_memory().unwrap();
        let empty = store.count_by_category().unwrap();
        assert_eq!(empty.len(), 6);
        assert!(empty.iter().all(|c| c.count == 0));

        store.append(&record_at("a.png", "Images", "2024-03-01 10:00:00")).unwrap();
        store.append(&record_at("b.png", "Images", "2024-03-01 10:00:01")).unwrap();
        store.append(&record_at("legacy", "documents", "2024-03-01 10:00:02")).unwrap();

        let counts = store.count_by_category().unwrap();
        assert_eq!(counts[0], CategoryCount { category: "Images".to_string(), count: 2 });
        assert_eq!(counts[5], CategoryCount { category: "Others".to_string(), count: 0 });
        assert_eq!(counts[6], CategoryCount { category: "documents".to_string(), count: 1 });
    }

    #[test]
    fn test_custom_known_categories() {
        let store = RecordStore::in_memory()
            .unwrap()
            .with_categories(vec!["Code".to_string(), "Others".to_string()]);
        let counts = store.count_by_category().unwrap();
        let names: Vec<&str> = counts.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Code", "Others"]);
    }

    #[test]
    fn test_count_by_day_ascending() {
        let store = RecordStore::in_memory().unwrap();
        store.append(&record_at("c", "Others", "2024-03-02 23:59:59")).unwrap();
        store.append(&record_at("a", "Others", "2024-03-01 00:00:00")).unwrap();
        store.append(&record_at("b", "Others", "2024-03-01 18:30:00")).unwrap();

        let days = store.count_by_day().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days[0].count, 2);
        assert_eq!(days[1].count, 1);
    }

    #[test]
    fn test_list_under_directory() {
        let store = RecordStore::in_memory().unwrap();
        let mut inside = record_at("a.txt", "Documents", "2024-03-01 10:00:00");
        inside.destination_path = "/home/me/Downloads/Documents/a.txt".to_string();
        let mut sibling = record_at("b.txt", "Documents", "2024-03-01 10:00:00");
        sibling.destination_path = "/home/me/Downloads2/Documents/b.txt".to_string();
        store.append(&inside).unwrap();
        store.append(&sibling).unwrap();

        let under = store.list_under(Path::new("/home/me/Downloads")).unwrap();
        assert_eq!(under.len(), 1);
        assert_eq!(under[0].record.filename, "a.txt");
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let store = RecordStore::open(&path).unwrap();
            store.append(&record_at("a.zip", "Archives", "2024-03-01 10:00:00")).unwrap();
        }
        let store = RecordStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.list_all().unwrap()[0].record.category, "Archives");
    }

    #[test]
    fn test_failed_insert_is_storage_unavailable() {
        let store = RecordStore::in_memory().unwrap();
        store
            .lock_conn()
            .unwrap()
            .execute("DROP TABLE organized_files", [])
            .unwrap();

        let err = store
            .append(&record_at("a.txt", "Documents", "2024-03-01 10:00:00"))
            .unwrap_err();
        assert!(matches!(err, TidyError::StorageUnavailable(_)));
    }
}
