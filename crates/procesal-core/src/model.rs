//! Canonical case records shared by every layer.
//!
//! A [`Process`] is one judicial proceeding identified by its filing number
//! ("número de radicado"); its [`Action`]s are the dated events recorded
//! against it. Enrichment (summary and urgency) lives on the action.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder written wherever the source omits a descriptive field.
pub const NOT_AVAILABLE: &str = "No disponible";

/// Urgency assigned to an action by the classification service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Baja")]
    Low,
    /// Not classified yet.
    #[default]
    #[serde(rename = "Pendiente")]
    Pending,
    /// Classification was attempted and failed.
    #[serde(rename = "Error")]
    Error,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "Alta",
            Self::Medium => "Media",
            Self::Low => "Baja",
            Self::Pending => "Pendiente",
            Self::Error => "Error",
        }
    }

    /// Map a classifier label (`ALTA`, `media`, ...) to one of the three
    /// assignable levels. Anything else is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "ALTA" => Some(Self::High),
            "MEDIA" => Some(Self::Medium),
            "BAJA" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated event within a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    /// Timestamp as supplied by the source. See [`Action::timestamp`].
    pub date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_justification: Option<String>,
    #[serde(default)]
    pub is_summarizing: bool,
    #[serde(default)]
    pub is_classifying: bool,
}

impl Action {
    /// A freshly normalised action: pending, idle, no enrichment.
    pub fn new(id: impl Into<String>, date: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            description: description.into(),
            kind: None,
            summary: None,
            urgency: Urgency::Pending,
            urgency_justification: None,
            is_summarizing: false,
            is_classifying: false,
        }
    }

    /// Parsed [`date`](Self::date), if it is in a recognised format.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }
}

/// A judicial proceeding and its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    /// Same value as `filing_number`.
    pub id: String,
    pub filing_number: String,
    pub court: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rapporteur: Option<String>,
    pub case_type: String,
    pub plaintiff: String,
    pub defendant: String,
    pub filing_date: String,
    pub current_status: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Set on every reconciliation or enrichment write. Persisted as epoch
    /// milliseconds.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Process {
    pub fn action(&self, action_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == action_id)
    }

    /// Actions newest first. Undated actions sort last; ties keep source order.
    pub fn actions_by_date(&self) -> Vec<&Action> {
        let mut sorted: Vec<(Option<DateTime<Utc>>, &Action)> =
            self.actions.iter().map(|a| (a.timestamp(), a)).collect();
        sorted.sort_by(|(a, _), (b, _)| b.cmp(a));
        sorted.into_iter().map(|(_, a)| a).collect()
    }
}

/// Every cached process, keyed by id.
///
/// Treated as an immutable value: operations take `&Corpus` and return the
/// next snapshot. Serialised as a JSON array of processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Process>", into = "Vec<Process>")]
pub struct Corpus {
    processes: BTreeMap<String, Process>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Process> {
        self.processes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.processes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Insert or replace a process, returning the one it displaced.
    pub fn insert(&mut self, process: Process) -> Option<Process> {
        self.processes.insert(process.id.clone(), process)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Process> {
        self.processes.get_mut(id)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&Process) -> bool) {
        self.processes.retain(|_, p| f(p));
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.values_mut()
    }
}

impl From<Vec<Process>> for Corpus {
    fn from(processes: Vec<Process>) -> Self {
        processes.into_iter().collect()
    }
}

impl From<Corpus> for Vec<Process> {
    fn from(corpus: Corpus) -> Self {
        corpus.processes.into_values().collect()
    }
}

impl FromIterator<Process> for Corpus {
    fn from_iter<I: IntoIterator<Item = Process>>(iter: I) -> Self {
        let processes = iter.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { processes }
    }
}

/// Parse a source timestamp.
///
/// Accepts RFC 3339 (`2023-02-10T08:30:00-05:00`), a naive date-time taken as
/// UTC (`2023-02-10T00:00:00`, optional fractional seconds), or a bare date
/// (`2023-02-10`) at midnight UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
