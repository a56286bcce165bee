// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Moves the top-level files of a directory into category subfolders
//!
//! Each run lists the directory once, classifies every regular file by
//! extension, moves it into `<dir>/<Category>/` and appends a record to the
//! move log. A file that cannot be moved or logged is reported in the run
//! summary and the run carries on with the next one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::classify::ClassificationTable;
use crate::config::AppConfig;
use crate::db::{MoveLog, MoveRecord};
use crate::{Result, TidyError};

/// How a missing source directory is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourcePolicy {
    /// Report `DirectoryNotFound`
    #[default]
    ExplicitPath,
    /// Organize the configured upload directory instead
    FallbackToDefault,
}

/// Outcome of a run as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    DirectoryNotFound,
    NothingToOrganize,
}

/// Which directory a run ended up organizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Explicit,
    Fallback,
}

/// Why a single file was not moved and logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The file is still where it was
    MoveFailed(String),
    /// The file was moved but the move log did not take the record
    MovedButUnlogged(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MoveFailed(detail) => write!(f, "move-failed: {}", detail),
            FailureReason::MovedButUnlogged(detail) => write!(f, "moved-but-unlogged: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub reason: FailureReason,
}

/// Result of one organizer run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeRunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Directory that was (or would have been) organized
    pub source: PathBuf,
    pub resolution: Resolution,
    pub total_moved: usize,
    /// Every table category, including those with no moves this run
    pub per_category: BTreeMap<String, usize>,
    pub failures: Vec<FileFailure>,
}

impl OrganizeRunSummary {
    fn new(run_id: Uuid, source: &Path, table: &ClassificationTable) -> Self {
        Self {
            run_id,
            status: RunStatus::Ok,
            source: source.to_path_buf(),
            resolution: Resolution::Explicit,
            total_moved: 0,
            per_category: table.categories().into_iter().map(|c| (c, 0)).collect(),
            failures: Vec::new(),
        }
    }

    fn record_move(&mut self, category: &str) {
        *self.per_category.entry(category.to_string()).or_insert(0) += 1;
        self.total_moved += 1;
    }

    /// One-line human description of the run
    pub fn message(&self) -> String {
        let mode = match self.resolution {
            Resolution::Explicit => "local",
            Resolution::Fallback => "fallback",
        };
        match self.status {
            RunStatus::DirectoryNotFound => format!("Directory not found: {}", self.source.display()),
            RunStatus::NothingToOrganize => {
                format!("No files found to organize in {} (Mode: {})", self.source.display(), mode)
            }
            RunStatus::Ok if self.failures.is_empty() => {
                format!("Organized {} files successfully! (Mode: {})", self.total_moved, mode)
            }
            RunStatus::Ok => format!(
                "Organized {} files, {} failed (Mode: {})",
                self.total_moved,
                self.failures.len(),
                mode
            ),
        }
    }
}

/// A move a run would make
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMove {
    pub filename: String,
    pub category: String,
    pub destination: PathBuf,
    /// Something already sits at the destination, so the move would fail
    pub occupied: bool,
}

#[derive(Debug, Clone)]
pub struct OrganizerOptions {
    pub policy: SourcePolicy,
    pub fallback_dir: PathBuf,
    pub skip_hidden: bool,
}

impl Default for OrganizerOptions {
    fn default() -> Self {
        Self {
            policy: SourcePolicy::ExplicitPath,
            fallback_dir: PathBuf::from("uploads"),
            skip_hidden: false,
        }
    }
}

impl OrganizerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: config.organizer.source_policy,
            fallback_dir: config.upload_dir(),
            skip_hidden: config.organizer.skip_hidden,
        }
    }
}

/// Per-directory run locks, keyed by canonical path
#[derive(Clone, Default)]
pub struct DirectoryLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl DirectoryLocks {
    fn lock_for(&self, dir: &Path) -> Result<Arc<Mutex<()>>> {
        let key = dir.canonicalize()?;
        let mut map = self
            .inner
            .lock()
            .map_err(|_| TidyError::LockPoisoned("directory lock registry".to_string()))?;
        Ok(map.entry(key).or_default().clone())
    }
}

/// Classifies and moves files, logging each move
#[derive(Clone)]
pub struct Organizer {
    table: Arc<ClassificationTable>,
    log: Arc<dyn MoveLog>,
    options: OrganizerOptions,
    locks: DirectoryLocks,
}

impl Organizer {
    pub fn new(table: ClassificationTable, log: Arc<dyn MoveLog>, options: OrganizerOptions) -> Self {
        Self {
            table: Arc::new(table),
            log,
            options,
            locks: DirectoryLocks::default(),
        }
    }

    pub fn from_config(config: &AppConfig, log: Arc<dyn MoveLog>) -> Self {
        Self::new(config.classification_table(), log, OrganizerOptions::from_config(config))
    }

    /// Override the source policy (e.g. from a CLI flag)
    pub fn with_policy(mut self, policy: SourcePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    pub fn options(&self) -> &OrganizerOptions {
        &self.options
    }

    /// Organize `requested`, honouring the source policy
    pub fn organize(&self, requested: &Path) -> Result<OrganizeRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("organize", %run_id, dir = %requested.display());
        let _enter = span.enter();

        let mut summary = OrganizeRunSummary::new(run_id, requested, &self.table);

        let Some((source, resolution)) = self.resolve(requested, true)? else {
            warn!("Source directory not found: {:?}", requested);
            summary.status = RunStatus::DirectoryNotFound;
            return Ok(summary);
        };
        if resolution == Resolution::Fallback {
            info!("Falling back to upload directory {:?}", source);
        }
        summary.source = source.clone();
        summary.resolution = resolution;

        let lock = self.locks.lock_for(&source)?;
        let _guard = lock
            .lock()
            .map_err(|_| TidyError::LockPoisoned(format!("run lock for {:?}", source)))?;

        let files = self.list_files(&source)?;
        if files.is_empty() {
            info!("No files found to organize in {:?}", source);
            summary.status = RunStatus::NothingToOrganize;
            return Ok(summary);
        }

        for (path, filename) in files {
            let category = self.table.classify(&filename).to_string();

            let destination = match move_into_category(&source, &path, &category) {
                Ok(dest) => dest,
                Err(e) => {
                    warn!("Failed to move {:?}: {}", path, e);
                    summary.failures.push(FileFailure {
                        filename,
                        reason: FailureReason::MoveFailed(e.to_string()),
                    });
                    continue;
                }
            };

            match self.log.append(&MoveRecord::now(&filename, &category, &destination)) {
                Ok(id) => {
                    info!("Moved {} -> {:?} (record {})", filename, destination, id);
                    summary.record_move(&category);
                }
                Err(e) => {
                    warn!("Moved {} but could not log it: {}", filename, e);
                    summary.failures.push(FileFailure {
                        filename,
                        reason: FailureReason::MovedButUnlogged(e.to_string()),
                    });
                }
            }
        }

        info!(
            "Organized {} files in {:?}, {} failed",
            summary.total_moved,
            source,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// The moves `organize` would make, without touching anything
    pub fn plan(&self, requested: &Path) -> Result<Vec<PlannedMove>> {
        let (source, _) = self
            .resolve(requested, false)?
            .ok_or_else(|| TidyError::DirectoryNotFound(requested.to_path_buf()))?;

        let moves = self
            .list_files(&source)?
            .into_iter()
            .map(|(path, filename)| {
                let category = self.table.classify(&filename).to_string();
                let destination = match path.file_name() {
                    Some(name) => source.join(&category).join(name),
                    None => source.join(&category).join(&filename),
                };
                PlannedMove {
                    occupied: destination.symlink_metadata().is_ok(),
                    filename,
                    category,
                    destination,
                }
            })
            .collect();
        Ok(moves)
    }

    /// Pick the directory to organize. `None` means there is nothing to
    /// organize under the current policy.
    fn resolve(&self, requested: &Path, create_fallback: bool) -> Result<Option<(PathBuf, Resolution)>> {
        if requested.is_dir() {
            return Ok(Some((requested.to_path_buf(), Resolution::Explicit)));
        }

        match self.options.policy {
            SourcePolicy::ExplicitPath => Ok(None),
            SourcePolicy::FallbackToDefault => {
                let fallback = &self.options.fallback_dir;
                if create_fallback {
                    fs::create_dir_all(fallback)?;
                } else if !fallback.is_dir() {
                    return Ok(None);
                }
                Ok(Some((fallback.clone(), Resolution::Fallback)))
            }
        }
    }

    /// Regular files directly inside `dir`, sorted by name
    fn list_files(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();

        let entries = fs::read_dir(dir).map_err(|e| {
            warn!("Cannot list {:?}: {}", dir, e);
            e
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                warn!("Cannot read an entry of {:?}: {}", dir, e);
                e
            })?;
            let path = entry.path();

            // is_file follows symlinks, so links to directories drop out here
            if !path.is_file() {
                debug!("Skipping non-file entry: {:?}", path);
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            if self.options.skip_hidden && filename.starts_with('.') {
                debug!("Skipping hidden file: {:?}", path);
                continue;
            }

            files.push((path, filename));
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }
}

/// Move `file` into `<source>/<category>/`, keeping its name. Never
/// overwrites an existing entry.
fn move_into_category(source: &Path, file: &Path, category: &str) -> io::Result<PathBuf> {
    let category_dir = source.join(category);
    fs::create_dir_all(&category_dir)?;

    let name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let destination = category_dir.join(name);

    if destination.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination {} already exists", destination.display()),
        ));
    }

    fs::rename(file, &destination)?;
    Ok(destination)
}
