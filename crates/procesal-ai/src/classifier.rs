//! Parsing of urgency classifications returned by the model.
//!
//! The model is asked for `{"clasificacion": "ALTA|MEDIA|BAJA",
//! "justificacion": "..."}`, sometimes wrapped in a fenced code block. Any
//! reply that does not fit degrades to [`Urgency::Low`] with a diagnostic
//! justification; parsing never fails.

use procesal_core::Urgency;
use serde::Deserialize;
use tracing::warn;

pub const MISSING_JUSTIFICATION: &str = "Justificación no proporcionada por la IA.";
pub const UNINTERPRETABLE_REPLY: &str = "Respuesta de la IA no interpretable.";

/// Urgency level with the reason given for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub urgency: Urgency,
    pub justification: String,
}

impl Classification {
    pub fn new(urgency: Urgency, justification: impl Into<String>) -> Self {
        Self {
            urgency,
            justification: justification.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawClassification {
    clasificacion: Option<String>,
    justificacion: Option<String>,
}

/// Remove a surrounding ```` ``` ```` or ```` ```json ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Interpret a classification reply.
pub fn parse_classification(raw: &str) -> Classification {
    let parsed: RawClassification = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "classification reply is not the expected JSON");
            return Classification::new(Urgency::Low, UNINTERPRETABLE_REPLY);
        }
    };

    let justification = parsed
        .justificacion
        .map(|j| j.trim().to_string())
        .filter(|j| !j.is_empty());

    let Some(label) = parsed
        .clasificacion
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
    else {
        warn!("classification reply has no label");
        return Classification::new(Urgency::Low, UNINTERPRETABLE_REPLY);
    };

    match Urgency::from_label(&label) {
        Some(urgency) => Classification::new(
            urgency,
            justification.unwrap_or_else(|| MISSING_JUSTIFICATION.to_string()),
        ),
        None => {
            warn!(label = %label, "unexpected classification label, defaulting to Baja");
            let diagnostic = format!("Clasificación no estándar ({label}) recibida.");
            let justification = match justification {
                Some(j) => format!("{diagnostic} {j}"),
                None => diagnostic,
            };
            Classification::new(Urgency::Low, justification)
        }
    }
}
