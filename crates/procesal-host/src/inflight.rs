//! Registry of enrichment calls that have not completed yet.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// The two enrichment operations an action supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Summarize,
    Classify,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Summarize => "summarize",
            Self::Classify => "classify",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct OperationKey {
    pub process_id: String,
    pub action_id: String,
    pub kind: OperationKind,
}

impl OperationKey {
    pub fn new(process_id: &str, action_id: &str, kind: OperationKind) -> Self {
        Self {
            process_id: process_id.to_string(),
            action_id: action_id.to_string(),
            kind,
        }
    }
}

/// At most one outstanding call per `(process, action, operation)`.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    keys: Mutex<HashSet<OperationKey>>,
}

impl InFlight {
    /// Claim `key`. Returns `false` if it is already claimed.
    pub fn claim(&self, key: &OperationKey) -> bool {
        self.lock().insert(key.clone())
    }

    pub fn release(&self, key: &OperationKey) {
        self.lock().remove(key);
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.lock().contains(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<OperationKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
