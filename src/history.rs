// Bounded, persisted history of past submissions
use crate::file_manager::{load_json_file, write_json_file, JsonLoad};
use crate::models::{FormOptions, HistoryEntry};
use crate::selection::StagedFile;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

pub const HISTORY_LIMIT: usize = 10;

/// What `load` found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Empty,
    Loaded(usize),
    /// Stored history could not be read and was reset
    Discarded(String),
}

/// Most-recent-first list of past jobs, capped at `HISTORY_LIMIT`
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Create a store and load whatever is persisted at `path`
    pub fn open(path: impl Into<PathBuf>) -> (Self, LoadOutcome) {
        let mut store = Self::new(path);
        let outcome = store.load();
        (store, outcome)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload from disk. Corrupted data never fails startup: it is dropped and
    /// the file rewritten as an empty list.
    pub fn load(&mut self) -> LoadOutcome {
        match load_json_file::<Vec<HistoryEntry>>(&self.path) {
            JsonLoad::Missing => {
                self.entries.clear();
                LoadOutcome::Empty
            }
            JsonLoad::Loaded(mut entries) => {
                if entries.len() > HISTORY_LIMIT {
                    warn!(
                        "History held {} entries, keeping the newest {}",
                        entries.len(),
                        HISTORY_LIMIT
                    );
                    entries.truncate(HISTORY_LIMIT);
                }
                self.entries = entries;
                if self.entries.is_empty() {
                    LoadOutcome::Empty
                } else {
                    LoadOutcome::Loaded(self.entries.len())
                }
            }
            JsonLoad::Corrupt(reason) => {
                warn!("Discarding corrupted history: {}", reason);
                self.entries.clear();
                self.persist();
                LoadOutcome::Discarded(reason)
            }
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Prepend a new entry, evicting the oldest beyond the cap. Persistence
    /// failures are logged, never returned.
    pub fn record(&mut self, file: &StagedFile, job_id: &str, metadata: FormOptions) -> &HistoryEntry {
        let entry = HistoryEntry::new(
            file.name.clone(),
            file.size,
            file.mime_type.clone(),
            job_id.to_string(),
            metadata,
        );
        self.entries.insert(0, entry);

        while self.entries.len() > HISTORY_LIMIT {
            if let Some(evicted) = self.entries.pop() {
                debug!("Evicted history entry {} ({})", evicted.name, evicted.job_id);
            }
        }

        self.persist();
        info!("Recorded job {} for {}", job_id, file.name);
        &self.entries[0]
    }

    /// Remove every entry for `job_id`. Returns how many were removed; removing
    /// an absent job is a no-op.
    pub fn remove(&mut self, job_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.job_id != job_id);
        let removed = before - self.entries.len();

        if removed == 0 {
            warn!("No history entry found for job {}", job_id);
        } else {
            self.persist();
            info!("Removed {} history entr{} for job {}", removed, if removed == 1 { "y" } else { "ies" }, job_id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = write_json_file(&self.path, &self.entries) {
            error!("Failed to save history: {}", e);
        }
    }
}
