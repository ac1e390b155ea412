//! The owned corpus state: one snapshot in memory, mirrored to the store.

use chrono::{DateTime, Utc};
use procesal_core::Corpus;
use tracing::error;

use crate::{CorpusStore, StoreError};

/// Holds the current corpus snapshot and the store it is mirrored to.
///
/// Every change goes through [`commit`](Self::commit), which swaps in the next
/// snapshot and saves it, so the slot always reflects the latest snapshot.
pub struct CorpusState {
    corpus: Corpus,
    store: CorpusStore,
}

impl CorpusState {
    /// Load the corpus from `store` as of `now`.
    pub fn open(store: CorpusStore, now: DateTime<Utc>) -> Self {
        let corpus = store.load(now);
        Self { corpus, store }
    }

    pub fn snapshot(&self) -> &Corpus {
        &self.corpus
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    /// Replace the snapshot with `f(current)` and save it.
    ///
    /// The new snapshot is kept in memory even when the save fails.
    pub fn commit(&mut self, f: impl FnOnce(&Corpus) -> Corpus) -> Result<(), StoreError> {
        self.corpus = f(&self.corpus);
        self.store.save(&self.corpus).inspect_err(|e| {
            error!(error = %e, "failed to save corpus");
        })
    }
}
