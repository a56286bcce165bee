// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for tidydir

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::{CategoryRule, ClassificationTable};
use crate::organizer::SourcePolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Organizer behaviour
    #[serde(default)]
    pub organizer: OrganizerConfig,

    /// Extension table, first declared category wins
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// PDF report settings
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrganizerConfig {
    /// Directory that receives uploads, also the fallback source
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// What to do when the requested source directory is missing
    #[serde(default)]
    pub source_policy: SourcePolicy,
    /// Leave dot-files where they are
    #[serde(default)]
    pub skip_hidden: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_file")]
    pub file_name: String,
    #[serde(default = "default_report_title")]
    pub title: String,
}

// Default value functions
fn default_upload_dir() -> String { "uploads".to_string() }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 5000 }
fn default_recent_limit() -> usize { 10 }
fn default_max_upload_bytes() -> usize { 100 * 1024 * 1024 }
fn default_db_path() -> String { "file_records.db".to_string() }
fn default_report_file() -> String { "organization_report.pdf".to_string() }
fn default_report_title() -> String { "File Organizer Report".to_string() }

fn default_categories() -> Vec<CategoryRule> {
    ClassificationTable::default().rules().to_vec()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organizer: OrganizerConfig::default(),
            categories: default_categories(),
            web: WebConfig::default(),
            database: DatabaseConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            source_policy: SourcePolicy::default(),
            skip_hidden: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            recent_limit: default_recent_limit(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_name: default_report_file(),
            title: default_report_title(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TidyError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Category names become folder names, so they must be plain path segments
    pub fn validate(&self) -> crate::Result<()> {
        for rule in &self.categories {
            let name = rule.category.trim();
            if name.is_empty() {
                return Err(crate::TidyError::Config("Category name must not be empty".to_string()));
            }
            if name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(crate::TidyError::Config(format!(
                    "Category name {:?} is not a valid folder name",
                    rule.category
                )));
            }
        }
        if self.organizer.upload_dir.trim().is_empty() {
            return Err(crate::TidyError::Config("Upload directory must not be empty".to_string()));
        }
        Ok(())
    }

    /// Build the classification table described by this config
    pub fn classification_table(&self) -> ClassificationTable {
        ClassificationTable::new(self.categories.clone())
    }

    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.organizer.upload_dir)
    }
}
