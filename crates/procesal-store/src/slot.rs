//! The persisted corpus slot.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use procesal_core::Corpus;
use tracing::{info, warn};

use crate::StoreError;

/// Name of the single slot holding the serialised corpus.
pub const SLOT_NAME: &str = "judicialProcessesData";

/// Cached processes older than this are dropped on load.
pub const RETENTION: TimeDelta = TimeDelta::days(7);

enum Slot {
    Memory(Mutex<Option<String>>),
    File(PathBuf),
}

/// Local store for the whole corpus, serialised as one JSON document.
///
/// Supports both in-memory (ephemeral) and file-backed modes. Use
/// [`in_memory`](Self::in_memory) for tests and [`open`](Self::open) for a
/// cache that survives restarts. There is a single writer, so no locking
/// beyond the in-memory slot's mutex.
pub struct CorpusStore {
    slot: Slot,
}

impl CorpusStore {
    /// An ephemeral store with an empty slot.
    pub fn in_memory() -> Self {
        Self {
            slot: Slot::Memory(Mutex::new(None)),
        }
    }

    /// Open a file-backed store in `dir`, creating the directory if needed.
    ///
    /// The slot lives at `<dir>/judicialProcessesData.json`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            slot: Slot::File(dir.join(format!("{SLOT_NAME}.json"))),
        })
    }

    /// Backing file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.slot {
            Slot::Memory(_) => None,
            Slot::File(path) => Some(path),
        }
    }

    /// Raw slot contents, `None` when nothing has been saved.
    pub fn raw(&self) -> Result<Option<String>, StoreError> {
        match &self.slot {
            Slot::Memory(cell) => Ok(cell.lock().unwrap_or_else(PoisonError::into_inner).clone()),
            Slot::File(path) => match fs::read_to_string(path) {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Load the corpus as of `now`.
    ///
    /// Never fails: an absent slot gives an empty corpus, and an unreadable or
    /// corrupt slot is cleared and gives an empty corpus. Processes whose
    /// `last_updated` is missing or not newer than `now - RETENTION` are
    /// dropped, and busy flags are reset.
    pub fn load(&self, now: DateTime<Utc>) -> Corpus {
        let raw = match self.raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Corpus::new(),
            Err(e) => {
                warn!(error = %e, "cached corpus unreadable, clearing");
                self.clear();
                return Corpus::new();
            }
        };

        let mut corpus: Corpus = match serde_json::from_str(&raw) {
            Ok(corpus) => corpus,
            Err(e) => {
                warn!(error = %e, "cached corpus is corrupt, clearing");
                self.clear();
                return Corpus::new();
            }
        };

        let cutoff = now - RETENTION;
        let stored = corpus.len();
        corpus.retain(|p| p.last_updated.is_some_and(|ts| ts > cutoff));
        for process in corpus.iter_mut() {
            for action in &mut process.actions {
                action.is_summarizing = false;
                action.is_classifying = false;
            }
        }

        info!(
            kept = corpus.len(),
            expired = stored - corpus.len(),
            "loaded cached corpus"
        );
        corpus
    }

    /// Persist the entire corpus, replacing the slot. An empty corpus is
    /// written like any other.
    pub fn save(&self, corpus: &Corpus) -> Result<(), StoreError> {
        let json = serde_json::to_string(corpus)?;
        match &self.slot {
            Slot::Memory(cell) => {
                *cell.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
            }
            Slot::File(path) => {
                // Write beside the target, then rename over it.
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
                tmp.write_all(json.as_bytes())?;
                tmp.flush()?;
                tmp.persist(path)?;
            }
        }
        info!(processes = corpus.len(), "saved corpus");
        Ok(())
    }

    /// Remove the slot's contents.
    pub fn clear(&self) {
        match &self.slot {
            Slot::Memory(cell) => {
                *cell.lock().unwrap_or_else(PoisonError::into_inner) = None;
            }
            Slot::File(path) => match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(error = %e, path = %path.display(), "failed to clear cache file"),
            },
        }
    }

    #[cfg(test)]
    fn put_raw(&self, raw: &str) {
        match &self.slot {
            Slot::Memory(cell) => *cell.lock().unwrap() = Some(raw.to_string()),
            Slot::File(path) => fs::write(path, raw).unwrap(),
        }
    }
}
