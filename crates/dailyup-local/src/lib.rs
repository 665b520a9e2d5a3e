//! Local storage for DailyUp.
//!
//! The whole report collection lives in one JSON array under a fixed key,
//! newest report first:
//!
//! ```text
//! ~/.dailyup/
//!   .work_reports.lock       # Lock file for read-modify-write cycles
//!   work_reports.json        # [ {report}, {report}, ... ]
//! ```
//!
//! Every mutation rewrites the whole file atomically.

use chrono::{SecondsFormat, Utc};
use dailyup_core::{Error, Report, ReportDraft, ReportStore};
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage key used when none is given.
pub const DEFAULT_KEY: &str = "work_reports";

/// Single-file store implementation.
pub struct LocalStore {
    root: PathBuf,
    key: String,
    /// Last id handed out by this handle, so ids stay increasing within a session.
    last_id: Mutex<i64>,
}

impl LocalStore {
    /// Open the store in `root` under the default key.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        Self::open_with_key(root, DEFAULT_KEY)
    }

    /// Open the store in `root`, keeping the collection under `key`.
    pub fn open_with_key<P: AsRef<Path>>(root: P, key: &str) -> Result<Self, Error> {
        let key = key.trim();
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.starts_with('.') {
            return Err(Error::Validation(format!("invalid storage key: {:?}", key)));
        }

        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| Error::Persistence(format!("Failed to create storage dir: {}", e)))?;

        Ok(Self {
            root,
            key: key.to_string(),
            last_id: Mutex::new(0),
        })
    }

    /// Path of the file holding the collection.
    pub fn path(&self) -> PathBuf {
        self.root.join(format!("{}.json", self.key))
    }

    /// Acquire an exclusive lock on the collection.
    fn lock(&self) -> Result<FileLock, Error> {
        let lock_path = self.root.join(format!(".{}.lock", self.key));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| Error::Persistence(format!("Failed to open lock file: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::Persistence(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }

    /// Read the stored collection.
    ///
    /// A missing file is an empty collection. An unreadable or unparseable
    /// file is reported as `Err(Error::Parse)` so callers can decide how soft
    /// to be about it.
    fn read_reports(&self) -> Result<Vec<Report>, Error> {
        let contents = match fs::read_to_string(self.path()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Parse(format!("Failed to read reports: {}", e))),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents)
            .map_err(|e| Error::Parse(format!("Failed to parse reports: {}", e)))
    }

    /// Read the collection ahead of a rewrite.
    ///
    /// If the stored file cannot be parsed it is moved aside, so the write
    /// that follows does not destroy it.
    fn read_for_write(&self) -> Result<Vec<Report>, Error> {
        match self.read_reports() {
            Ok(reports) => Ok(reports),
            Err(e) => {
                let aside = self.root.join(format!(
                    "{}.json.corrupt-{}",
                    self.key,
                    Utc::now().timestamp_millis()
                ));
                tracing::warn!(
                    error = %e,
                    path = %aside.display(),
                    "stored reports unreadable, moving them aside"
                );
                fs::rename(self.path(), &aside).map_err(|e| {
                    Error::Persistence(format!("Failed to move unreadable reports aside: {}", e))
                })?;
                Ok(Vec::new())
            }
        }
    }

    /// Write the collection to disk atomically.
    fn write_reports(&self, reports: &[Report]) -> Result<(), Error> {
        let path = self.path();
        let temp_path = self.root.join(format!("{}.json.tmp", self.key));

        let contents = serde_json::to_string(reports)
            .map_err(|e| Error::Persistence(format!("Failed to serialize reports: {}", e)))?;

        let mut file = File::create(&temp_path)
            .map_err(|e| Error::Persistence(format!("Failed to create temp file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Persistence(format!("Failed to write temp file: {}", e)))?;

        file.sync_all()
            .map_err(|e| Error::Persistence(format!("Failed to sync temp file: {}", e)))?;

        fs::rename(&temp_path, &path)
            .map_err(|e| Error::Persistence(format!("Failed to rename temp file: {}", e)))?;

        tracing::debug!(count = reports.len(), path = %path.display(), "wrote reports");
        Ok(())
    }

    /// Next report id: the current time in milliseconds, bumped past the last
    /// id this handle issued and past any id already stored.
    fn next_id(&self, reports: &[Report]) -> String {
        let taken: HashSet<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        let mut last = self.last_id.lock().unwrap_or_else(|e| e.into_inner());

        let mut candidate = Utc::now().timestamp_millis().max(*last + 1);
        while taken.contains(candidate.to_string().as_str()) {
            candidate += 1;
        }

        *last = candidate;
        candidate.to_string()
    }

    /// Current instant in ISO 8601 format with millisecond precision.
    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// RAII guard for file locking.
struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[async_trait::async_trait(?Send)]
impl ReportStore for LocalStore {
    async fn list(&self) -> Result<Vec<Report>, Error> {
        match self.read_reports() {
            Ok(reports) => Ok(reports),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path().display(),
                    "ignoring unreadable reports"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn create(&self, draft: ReportDraft) -> Result<Report, Error> {
        let _lock = self.lock()?;
        let mut reports = self.read_for_write()?;

        let report = Report::from_draft(self.next_id(&reports), Self::now(), draft);
        reports.insert(0, report.clone());
        self.write_reports(&reports)?;

        Ok(report)
    }

    async fn update(&self, id: &str, draft: ReportDraft) -> Result<Option<Report>, Error> {
        let _lock = self.lock()?;
        let mut reports = self.read_for_write()?;

        let updated = match reports.iter_mut().find(|r| r.id == id) {
            Some(report) => {
                report.apply(draft);
                report.clone()
            }
            None => return Ok(None),
        };
        self.write_reports(&reports)?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool, Error> {
        let _lock = self.lock()?;
        let mut reports = self.read_for_write()?;

        let before = reports.len();
        reports.retain(|r| r.id != id);
        self.write_reports(&reports)?;

        Ok(reports.len() != before)
    }

    async fn merge(&self, incoming: Vec<Report>) -> Result<usize, Error> {
        let _lock = self.lock()?;
        let existing = self.read_for_write()?;

        // The caller reconciled against an earlier read; re-check under the lock.
        let taken: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
        let incoming: Vec<Report> = incoming
            .into_iter()
            .filter(|r| !taken.contains(&r.id))
            .collect();
        let count = incoming.len();

        let merged: Vec<Report> = incoming.into_iter().chain(existing).collect();
        self.write_reports(&merged)?;

        Ok(count)
    }
}
