//! History Store
//!
//! The durable list of past runs. All mutations go through [`HistoryStore::commit`],
//! which sorts by date (newest first) and replaces the persisted collection
//! in one write. The in-memory copy only changes once that write succeeds.
//!
//! A store is the single writer for its storage key: every mutating
//! operation, including an in-flight async import, borrows it mutably.
//! Two processes writing the same data directory is not supported.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{HearingError, Result};
use crate::history::devices::known_devices;
use crate::history::record::{ImportOutcome, SavedResult};
use crate::history::storage::{write_atomic, StorageBackend};
use crate::session::scorer::{Datapoint, MAX_VOLUME};

/// Storage key holding the serialized history
pub const RESULTS_KEY: &str = "hearing-test-results";

/// Prefix of exported backup files
pub const BACKUP_PREFIX: &str = "hearing-test-backup-";

/// Extension of exported backup files
pub const BACKUP_EXTENSION: &str = ".json";

/// Fields a record must carry to be imported
const REQUIRED_FIELDS: [&str; 3] = ["id", "date", "data"];

/// Past test runs, newest first
pub struct HistoryStore<B: StorageBackend> {
    backend: B,
    results: Vec<SavedResult>,
}

impl<B: StorageBackend> HistoryStore<B> {
    /// Open the history kept in `backend`.
    ///
    /// Absent history starts empty. Unreadable or corrupted history is
    /// also treated as empty (and logged); the next write replaces it.
    pub fn open(backend: B) -> Self {
        let results = load_results(&backend);
        debug!("Opened history with {} results", results.len());
        Self { backend, results }
    }

    /// Re-read the persisted collection, discarding the in-memory copy
    pub fn reload(&mut self) {
        self.results = load_results(&self.backend);
    }

    /// All results, newest first
    pub fn list(&self) -> &[SavedResult] {
        &self.results
    }

    /// Number of stored results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether history is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up a result by id
    pub fn get(&self, id: &str) -> Option<&SavedResult> {
        self.results.iter().find(|r| r.id == id)
    }

    /// The most recent result
    pub fn latest(&self) -> Option<&SavedResult> {
        self.results.first()
    }

    /// Device names used in past runs, most recent first
    pub fn known_devices(&self) -> Vec<String> {
        known_devices(&self.results)
    }

    /// Borrow the storage backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Record a completed run.
    ///
    /// # Errors
    /// * `EmptyInput` - `data` has no datapoints
    /// * `InvalidVolume` - `audio_level` above 100
    /// * `StorageWrite` - the history could not be persisted
    pub fn save(
        &mut self,
        data: Vec<Datapoint>,
        audio_level: Option<u8>,
        device: Option<String>,
    ) -> Result<SavedResult> {
        if data.is_empty() {
            return Err(HearingError::EmptyInput);
        }
        if let Some(level) = audio_level.filter(|l| *l > MAX_VOLUME) {
            return Err(HearingError::InvalidVolume {
                value: i64::from(level),
            });
        }

        let device = device
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let record = SavedResult::new(self.mint_id(), data, audio_level, device);

        let mut next = Vec::with_capacity(self.results.len() + 1);
        next.push(record.clone());
        next.extend(self.results.iter().cloned());
        self.commit(next)?;

        info!("Saved result {}", record.id);
        Ok(record)
    }

    /// Remove the result with `id`. Returns whether anything was removed;
    /// an unknown id leaves history and storage untouched.
    pub fn delete_one(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            debug!("Delete of unknown result {} ignored", id);
            return Ok(false);
        }

        let next: Vec<SavedResult> = self.results.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next)?;

        info!("Deleted result {}", id);
        Ok(true)
    }

    /// Remove every result
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())?;
        info!("Cleared history");
        Ok(())
    }

    /// The whole history as a pretty-printed JSON array
    pub fn export(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.results)?)
    }

    /// Write an export to `dir` as `hearing-test-backup-<date>.json`.
    ///
    /// An export made earlier the same day is replaced.
    pub fn export_to_dir(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let path = dir.join(export_filename(date));
        let bytes = self.export()?;

        write_atomic(&path, &bytes).map_err(|e| HearingError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        info!("Exported {} results to {}", self.results.len(), path.display());
        Ok(path)
    }

    /// Merge exported results into history.
    ///
    /// Records missing `id`, `date` or `data`, records that do not parse,
    /// records holding a volume or audio level above 100, and records
    /// whose id is already present are skipped. Records are
    /// matched by id only: two records with different ids and identical
    /// data are both kept.
    ///
    /// # Errors
    /// * `InvalidFormat` - the input is not a JSON array
    /// * `StorageWrite` - the merged history could not be persisted; the
    ///   previous history is left intact
    pub fn import(&mut self, contents: &str) -> Result<ImportOutcome> {
        let parsed: Value =
            serde_json::from_str(contents).map_err(|e| HearingError::InvalidFormat {
                reason: format!("not valid JSON: {}", e),
            })?;
        let Value::Array(candidates) = parsed else {
            return Err(HearingError::InvalidFormat {
                reason: "expected a JSON array of results".to_string(),
            });
        };

        let mut seen: HashSet<String> = self.results.iter().map(|r| r.id.clone()).collect();
        let mut next = self.results.clone();
        let mut outcome = ImportOutcome::default();

        for candidate in candidates {
            match parse_candidate(candidate) {
                Some(record) if seen.insert(record.id.clone()) => {
                    next.push(record);
                    outcome.imported += 1;
                }
                Some(record) => {
                    debug!("Skipping duplicate result {}", record.id);
                    outcome.skipped += 1;
                }
                None => outcome.skipped += 1,
            }
        }

        if outcome.imported > 0 {
            self.commit(next)?;
        }

        info!(
            "Import finished: {} imported, {} skipped",
            outcome.imported, outcome.skipped
        );
        Ok(outcome)
    }

    /// Read `path` and import its contents
    pub fn import_file(&mut self, path: &Path) -> Result<ImportOutcome> {
        let contents = fs::read_to_string(path).map_err(|e| HearingError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.import(&contents)
    }

    /// Read `path` without blocking the runtime, then import its contents.
    ///
    /// The store stays mutably borrowed until the returned future
    /// completes, so no other import can run against it meanwhile.
    #[cfg(feature = "async-bridge")]
    pub async fn import_file_async(&mut self, path: &Path) -> Result<ImportOutcome> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| HearingError::FileReadError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        self.import(&contents)
    }

    /// Sort `next` newest first, persist it, then adopt it.
    fn commit(&mut self, mut next: Vec<SavedResult>) -> Result<()> {
        // stable: same-instant results keep their relative order
        next.sort_by(|a, b| b.date.cmp(&a.date));

        let serialized = serde_json::to_string(&next)?;
        self.backend.write(RESULTS_KEY, &serialized)?;
        self.results = next;
        Ok(())
    }

    /// A fresh id that no stored result uses.
    fn mint_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// `hearing-test-backup-<YYYY-MM-DD>.json`
pub fn export_filename(date: NaiveDate) -> String {
    format!(
        "{}{}{}",
        BACKUP_PREFIX,
        date.format("%Y-%m-%d"),
        BACKUP_EXTENSION
    )
}

fn load_results<B: StorageBackend>(backend: &B) -> Vec<SavedResult> {
    let raw = match backend.read(RESULTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Could not read history, starting empty: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<SavedResult>>(&raw) {
        Ok(mut results) => {
            results.sort_by(|a, b| b.date.cmp(&a.date));
            results
        }
        Err(e) => {
            warn!("History is corrupted, starting empty: {}", e);
            Vec::new()
        }
    }
}

fn parse_candidate(candidate: Value) -> Option<SavedResult> {
    let object = candidate.as_object()?;
    let complete = REQUIRED_FIELDS
        .iter()
        .all(|field| object.get(*field).is_some_and(|v| !v.is_null()));
    if !complete {
        debug!("Skipping result missing one of {:?}", REQUIRED_FIELDS);
        return None;
    }

    match serde_json::from_value::<SavedResult>(candidate) {
        Ok(record) if record.id.is_empty() => None,
        Ok(record) if !volumes_in_range(&record) => {
            debug!("Skipping result {} with a volume above {}", record.id, MAX_VOLUME);
            None
        }
        Ok(record) => Some(record),
        Err(e) => {
            debug!("Skipping malformed result: {}", e);
            None
        }
    }
}

fn volumes_in_range(record: &SavedResult) -> bool {
    let level_ok = record.audio_level.map_or(true, |l| l <= MAX_VOLUME);
    level_ok
        && record
            .data
            .iter()
            .all(|d| d.right <= MAX_VOLUME && d.left <= MAX_VOLUME)
}
