//! Merging fresh lookup results into the cached corpus.
//!
//! The lookup service is authoritative for facts (court, parties, status, the
//! membership of the action list); the cache is authoritative for enrichment
//! (summary, urgency). [`reconcile`] combines the two for a search result and
//! [`apply_action_update`] is the point write used by enrichment.

use chrono::{DateTime, Utc};

use crate::model::{Action, Corpus, Process, Urgency};

/// Merge a freshly normalised batch into `existing`, returning the next corpus.
///
/// - Processes match by id. Fresh descriptive fields replace the cached ones.
/// - Each fresh action is matched to a cached action by id, falling back to
///   identical description; a match keeps the cached summary, urgency and
///   justification, with both busy flags cleared.
/// - Cached actions the fresh batch no longer lists are dropped.
/// - Cached processes not in the batch are kept as they are.
/// - Every process in the batch gets `last_updated = now`.
pub fn reconcile(existing: &Corpus, fresh: Vec<Process>, now: DateTime<Utc>) -> Corpus {
    let mut next = existing.clone();
    for mut process in fresh {
        if let Some(cached) = existing.get(&process.id) {
            process.actions = merge_actions(&cached.actions, process.actions);
        }
        process.last_updated = Some(now);
        next.insert(process);
    }
    next
}

fn merge_actions(cached: &[Action], fresh: Vec<Action>) -> Vec<Action> {
    fresh
        .into_iter()
        .map(|action| match find_counterpart(cached, &action) {
            Some(previous) => carry_enrichment(action, previous),
            None => action,
        })
        .collect()
}

/// Two-tier lookup: id first, then description. The upstream service does not
/// keep action ids stable across fetches.
fn find_counterpart<'a>(cached: &'a [Action], action: &Action) -> Option<&'a Action> {
    cached
        .iter()
        .find(|c| c.id == action.id)
        .or_else(|| cached.iter().find(|c| c.description == action.description))
}

fn carry_enrichment(mut action: Action, previous: &Action) -> Action {
    action.summary = previous.summary.clone();
    action.urgency = previous.urgency;
    action.urgency_justification = previous.urgency_justification.clone();
    action.is_summarizing = false;
    action.is_classifying = false;
    action
}

/// Partial overlay for a single action. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionUpdate {
    pub summary: Option<String>,
    pub urgency: Option<Urgency>,
    /// `Some(None)` clears the justification.
    pub urgency_justification: Option<Option<String>>,
    pub is_summarizing: Option<bool>,
    pub is_classifying: Option<bool>,
}

impl ActionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set urgency together with its justification.
    pub fn classification(mut self, urgency: Urgency, justification: impl Into<String>) -> Self {
        self.urgency = Some(urgency);
        self.urgency_justification = Some(Some(justification.into()));
        self
    }

    pub fn summarizing(mut self, busy: bool) -> Self {
        self.is_summarizing = Some(busy);
        self
    }

    pub fn classifying(mut self, busy: bool) -> Self {
        self.is_classifying = Some(busy);
        self
    }

    fn apply_to(&self, action: &mut Action) {
        if let Some(summary) = &self.summary {
            action.summary = Some(summary.clone());
        }
        if let Some(urgency) = self.urgency {
            action.urgency = urgency;
        }
        if let Some(justification) = &self.urgency_justification {
            action.urgency_justification = justification.clone();
        }
        if let Some(busy) = self.is_summarizing {
            action.is_summarizing = busy;
        }
        if let Some(busy) = self.is_classifying {
            action.is_classifying = busy;
        }
        // A pending action carries no justification.
        if action.urgency == Urgency::Pending {
            action.urgency_justification = None;
        }
    }
}

/// Overlay `update` onto one action, returning the next corpus.
///
/// Returns an unchanged copy when either id is unknown. Otherwise the owning
/// process gets `last_updated = now`.
pub fn apply_action_update(
    corpus: &Corpus,
    process_id: &str,
    action_id: &str,
    update: &ActionUpdate,
    now: DateTime<Utc>,
) -> Corpus {
    let mut next = corpus.clone();
    let Some(process) = next.get_mut(process_id) else {
        return next;
    };
    let Some(action) = process.actions.iter_mut().find(|a| a.id == action_id) else {
        return next;
    };
    update.apply_to(action);
    process.last_updated = Some(now);
    next
}
