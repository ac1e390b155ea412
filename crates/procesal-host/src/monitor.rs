use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use procesal_ai::Enricher;
use procesal_core::{ActionUpdate, Corpus, Process, Urgency, apply_action_update, reconcile};
use procesal_store::{CorpusState, CorpusStore, StoreError};
use procesal_sync::{CaseLookup, FetchError, SearchQuery};
use thiserror::Error;
use tracing::{info, warn};

use crate::inflight::{InFlight, OperationKey, OperationKind};

pub const NO_RESULTS: &str =
    "No se encontraron procesos para los criterios de búsqueda. Verifique el número o intente más tarde.";

const EMPTY_QUERY: &str = "Por favor ingrese un valor para la búsqueda.";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search value is empty")]
    EmptyQuery,
    #[error("case lookup failed: {0}")]
    Fetch(#[from] FetchError),
    /// The results were merged in memory but could not be saved.
    #[error("failed to save corpus: {0}")]
    Persist(#[from] StoreError),
}

impl SearchError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyQuery => EMPTY_QUERY.to_string(),
            Self::Fetch(e) => e.user_message(),
            Self::Persist(e) => format!("No se pudo guardar la caché local: {e}"),
        }
    }
}

/// How an enrichment request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The result, or its fixed fallback, was written to the action.
    Completed,
    /// The same operation on the same action is still outstanding.
    AlreadyInFlight,
    /// No such process or action in the corpus.
    NotFound,
}

/// The running monitor: corpus state plus the services that feed it.
///
/// All corpus changes go through [`CorpusState::commit`] under a mutex that
/// is never held across an `.await`.
pub struct Monitor {
    state: Mutex<CorpusState>,
    lookup: Arc<dyn CaseLookup>,
    enricher: Enricher,
    in_flight: InFlight,
    clock: fn() -> DateTime<Utc>,
}

impl Monitor {
    /// Load the corpus from `store` as of `now`.
    pub fn new(
        lookup: Arc<dyn CaseLookup>,
        enricher: Enricher,
        store: CorpusStore,
        now: DateTime<Utc>,
    ) -> Self {
        let state = CorpusState::open(store, now);
        info!(processes = state.snapshot().len(), "corpus loaded");
        Self {
            state: Mutex::new(state),
            lookup,
            enricher,
            in_flight: InFlight::default(),
            clock: Utc::now,
        }
    }

    /// Use `clock` for `last_updated` stamps instead of the system clock.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn corpus(&self) -> Corpus {
        self.lock_state().snapshot().clone()
    }

    pub fn process(&self, process_id: &str) -> Option<Process> {
        self.lock_state().snapshot().get(process_id).cloned()
    }

    pub fn is_in_flight(&self, process_id: &str, action_id: &str, kind: OperationKind) -> bool {
        self.in_flight
            .contains(&OperationKey::new(process_id, action_id, kind))
    }

    /// Fetch processes for `query` and merge them into the corpus.
    ///
    /// Returns the ids of the fetched processes; an empty list means the
    /// service found nothing. On a fetch failure the corpus is left untouched;
    /// on a save failure the merged corpus stays in memory and
    /// [`SearchError::Persist`] is returned.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError> {
        if query.is_blank() {
            return Err(SearchError::EmptyQuery);
        }

        let fresh = self.lookup.fetch(query).await.inspect_err(|e| {
            warn!(kind = %query.kind, error = %e, "search failed");
        })?;
        let ids: Vec<String> = fresh.iter().map(|p| p.id.clone()).collect();

        let now = self.now();
        self.commit(|corpus| reconcile(corpus, fresh, now))?;
        info!(kind = %query.kind, count = ids.len(), "search merged into corpus");
        Ok(ids)
    }

    /// Summarise one action's description and store the summary.
    pub async fn summarize(&self, process_id: &str, action_id: &str) -> EnrichOutcome {
        self.enrich(process_id, action_id, OperationKind::Summarize, |text| async move {
            let summary = match self.enricher.summarize(&text).await {
                Ok(summary) => summary,
                Err(e) => e.summary_fallback().to_string(),
            };
            ActionUpdate::new().summary(summary)
        })
        .await
    }

    /// Classify one action's urgency and store it with its justification.
    pub async fn classify(&self, process_id: &str, action_id: &str) -> EnrichOutcome {
        self.enrich(process_id, action_id, OperationKind::Classify, |text| async move {
            let classification = match self.enricher.classify(&text).await {
                Ok(classification) => classification,
                Err(e) => e.classification_fallback(),
            };
            ActionUpdate::new().classification(classification.urgency, classification.justification)
        })
        .await
    }

    /// Classify every action of a process that is still pending, concurrently.
    ///
    /// Returns `None` for an unknown process, otherwise each attempted action
    /// id with its outcome.
    pub async fn classify_pending(&self, process_id: &str) -> Option<Vec<(String, EnrichOutcome)>> {
        let pending: Vec<String> = {
            let state = self.lock_state();
            let process = state.snapshot().get(process_id)?;
            process
                .actions
                .iter()
                .filter(|a| a.urgency == Urgency::Pending)
                .map(|a| a.id.clone())
                .collect()
        };
        info!(process_id = %process_id, count = pending.len(), "classifying pending actions");

        let outcomes = join_all(pending.iter().map(|id| self.classify(process_id, id))).await;
        Some(pending.into_iter().zip(outcomes).collect())
    }

    /// Shared lifecycle of an enrichment call: claim, mark busy, run `call` on
    /// the action description, write its update with the busy flag cleared.
    async fn enrich<F, Fut>(
        &self,
        process_id: &str,
        action_id: &str,
        kind: OperationKind,
        call: F,
    ) -> EnrichOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ActionUpdate>,
    {
        let description = {
            let state = self.lock_state();
            match state.snapshot().get(process_id).and_then(|p| p.action(action_id)) {
                Some(action) => action.description.clone(),
                None => return EnrichOutcome::NotFound,
            }
        };

        let key = OperationKey::new(process_id, action_id, kind);
        if !self.in_flight.claim(&key) {
            warn!(process_id = %process_id, action_id = %action_id, operation = %kind, "enrichment already in flight");
            return EnrichOutcome::AlreadyInFlight;
        }
        let mut guard = InFlightGuard {
            monitor: self,
            key,
            completed: false,
        };

        self.commit_action(process_id, action_id, &busy(kind, true));

        let update = with_busy(call(description).await, kind, false);
        self.commit_action(process_id, action_id, &update);
        guard.completed = true;

        info!(process_id = %process_id, action_id = %action_id, operation = %kind, "enrichment written");
        EnrichOutcome::Completed
    }

    /// The new snapshot stays in memory even when saving it fails.
    fn commit(&self, f: impl FnOnce(&Corpus) -> Corpus) -> Result<(), StoreError> {
        self.lock_state().commit(f)
    }

    /// Point write for enrichment. A save failure is logged against the
    /// action; enrichment has no caller to hand it to.
    fn commit_action(&self, process_id: &str, action_id: &str, update: &ActionUpdate) {
        let now = self.now();
        if let Err(e) = self.commit(|corpus| apply_action_update(corpus, process_id, action_id, update, now)) {
            warn!(process_id = %process_id, action_id = %action_id, error = %e, "enrichment write not persisted");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CorpusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

fn busy(kind: OperationKind, flag: bool) -> ActionUpdate {
    with_busy(ActionUpdate::new(), kind, flag)
}

fn with_busy(update: ActionUpdate, kind: OperationKind, flag: bool) -> ActionUpdate {
    match kind {
        OperationKind::Summarize => update.summarizing(flag),
        OperationKind::Classify => update.classifying(flag),
    }
}

/// Releases the registry key when an enrichment call ends, and clears the busy
/// flag if the call was dropped before its result was written.
struct InFlightGuard<'a> {
    monitor: &'a Monitor,
    key: OperationKey,
    completed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let OperationKey {
                process_id,
                action_id,
                kind,
            } = &self.key;
            warn!(process_id = %process_id, action_id = %action_id, operation = %kind, "enrichment abandoned");
            self.monitor
                .commit_action(process_id, action_id, &busy(*kind, false));
        }
        self.monitor.in_flight.release(&self.key);
    }
}
