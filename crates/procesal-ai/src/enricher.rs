//! Summarisation and urgency classification of action descriptions.

use std::sync::Arc;

use procesal_core::{NOT_AVAILABLE, Urgency};
use thiserror::Error;
use tracing::{info, warn};

use crate::classifier::{Classification, parse_classification};
use crate::llm::{LlmClient, LlmError, LlmRequest};

pub const EMPTY_SUMMARY_TEXT: &str = "No hay texto para resumir.";
pub const EMPTY_CLASSIFICATION_TEXT: &str = "No hay descripción para clasificar.";
pub const MISSING_CREDENTIALS: &str = "Error: API Key no configurada.";
pub const SUMMARY_FAILED: &str = "Error al generar resumen.";
pub const CLASSIFICATION_FAILED: &str = "Error al clasificar la urgencia.";

// ── Prompt templates ──

const SUMMARY_SYSTEM_PROMPT: &str = "\
Eres un asistente que resume actuaciones judiciales colombianas para quien sigue el caso.

Resume la actuación en una o dos frases claras. Menciona la acción principal, las partes \
solo si son relevantes y el resultado o el siguiente paso cuando sea evidente. \
Responde únicamente con el resumen, sin encabezados.";

const CLASSIFICATION_SYSTEM_PROMPT: &str = "\
Clasificas la urgencia de actuaciones judiciales colombianas.

Responde ÚNICAMENTE con un objeto JSON, sin texto adicional:
{
  \"clasificacion\": \"ALTA\" | \"MEDIA\" | \"BAJA\",
  \"justificacion\": \"explicación breve, máximo 30 palabras\"
}

Criterios:
- ALTA: requiere acción inmediata (términos perentorios, audiencias próximas, requerimientos \
con plazo corto, decisiones que cambian el estado del proceso, recursos con plazo).
- MEDIA: requiere atención pronto sin ser una crisis (notificaciones de decisiones, autos que \
impulsan el proceso sin plazo inminente, memoriales relevantes, traslados).
- BAJA: informativo o de trámite (constancias de ejecutoria, archivo, copias, anotaciones internas).

Si la descripción es ambigua o insuficiente, asigna \"BAJA\" y explica la ambigüedad.";

fn build_summary_prompt(text: &str) -> String {
    format!("Texto de la actuación:\n\n\"{text}\"")
}

fn build_classification_prompt(description: &str) -> String {
    format!("Descripción de la actuación:\n\n\"{description}\"")
}

/// Text that carries nothing to enrich: blank, or the not-available marker.
pub fn is_blank(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == NOT_AVAILABLE
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("no API key configured for the enrichment service")]
    MissingCredentials,
    #[error("enrichment service failed: {0}")]
    Llm(#[from] LlmError),
}

impl EnrichmentError {
    /// Summary text written in place of a failed summarisation.
    pub fn summary_fallback(&self) -> &'static str {
        match self {
            Self::MissingCredentials => MISSING_CREDENTIALS,
            Self::Llm(_) => SUMMARY_FAILED,
        }
    }

    /// Classification written in place of a failed classification.
    pub fn classification_fallback(&self) -> Classification {
        let justification = match self {
            Self::MissingCredentials => MISSING_CREDENTIALS,
            Self::Llm(_) => CLASSIFICATION_FAILED,
        };
        Classification::new(Urgency::Error, justification)
    }
}

/// Enrichment client: the summarise/classify contract over an [`LlmClient`].
///
/// Built without a client when no credential is configured; every call then
/// reports [`EnrichmentError::MissingCredentials`] without leaving the process.
#[derive(Clone)]
pub struct Enricher {
    client: Option<Arc<dyn LlmClient>>,
    model: String,
}

impl Enricher {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            model: model.into(),
        }
    }

    /// An enricher with no credential.
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            model: String::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Summarise an action description in one or two sentences.
    ///
    /// Blank text short-circuits to [`EMPTY_SUMMARY_TEXT`] without a call.
    pub async fn summarize(&self, text: &str) -> Result<String, EnrichmentError> {
        let client = self.client.as_ref().ok_or(EnrichmentError::MissingCredentials)?;
        if is_blank(text) {
            return Ok(EMPTY_SUMMARY_TEXT.to_string());
        }

        let reply = client
            .complete(LlmRequest {
                system: SUMMARY_SYSTEM_PROMPT.to_string(),
                user: build_summary_prompt(text),
                model: self.model.clone(),
                temperature: 0.2,
                json_response: false,
            })
            .await
            .inspect_err(|e| warn!(error = %e, "summarisation failed"))?;

        info!(chars = reply.len(), "summary generated");
        Ok(reply.trim().to_string())
    }

    /// Classify the urgency of an action description.
    ///
    /// Blank text short-circuits to `Baja` without a call. Replies that do not
    /// parse degrade to `Baja` (see [`parse_classification`]); only transport
    /// and service failures are errors.
    pub async fn classify(&self, description: &str) -> Result<Classification, EnrichmentError> {
        let client = self.client.as_ref().ok_or(EnrichmentError::MissingCredentials)?;
        if is_blank(description) {
            return Ok(Classification::new(Urgency::Low, EMPTY_CLASSIFICATION_TEXT));
        }

        let reply = client
            .complete(LlmRequest {
                system: CLASSIFICATION_SYSTEM_PROMPT.to_string(),
                user: build_classification_prompt(description),
                model: self.model.clone(),
                temperature: 0.0,
                json_response: true,
            })
            .await
            .inspect_err(|e| warn!(error = %e, "classification failed"))?;

        let classification = parse_classification(&reply);
        info!(urgency = %classification.urgency, "action classified");
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn enricher(mock: &Arc<MockLlmClient>) -> Enricher {
        Enricher::new(mock.clone(), "gemini-test")
    }

    #[tokio::test]
    async fn summarize_returns_trimmed_reply() {
        let mock = Arc::new(MockLlmClient::replying("  Se admitió la demanda.\n"));
        let summary = enricher(&mock).summarize("Auto admite demanda").await.unwrap();
        assert_eq!(summary, "Se admitió la demanda.");

        let request = mock.last_request().unwrap();
        assert!(request.user.contains("Auto admite demanda"));
        assert_eq!(request.model, "gemini-test");
        assert!(!request.json_response);
    }

    #[tokio::test]
    async fn blank_text_is_not_sent() {
        let mock = Arc::new(MockLlmClient::replying("no debería usarse"));
        let e = enricher(&mock);

        assert_eq!(e.summarize("   ").await.unwrap(), EMPTY_SUMMARY_TEXT);
        assert_eq!(e.summarize(NOT_AVAILABLE).await.unwrap(), EMPTY_SUMMARY_TEXT);
        assert_eq!(
            e.classify("").await.unwrap(),
            Classification::new(Urgency::Low, EMPTY_CLASSIFICATION_TEXT)
        );
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let e = Enricher::unconfigured();
        assert!(!e.is_configured());

        let err = e.summarize("Auto admite demanda").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::MissingCredentials));
        assert_eq!(err.summary_fallback(), MISSING_CREDENTIALS);

        let err = e.classify("Auto admite demanda").await.unwrap_err();
        assert_eq!(
            err.classification_fallback(),
            Classification::new(Urgency::Error, MISSING_CREDENTIALS)
        );
    }

    #[tokio::test]
    async fn classify_requests_json_and_parses_reply() {
        let mock = Arc::new(MockLlmClient::replying(
            r#"{"clasificacion":"ALTA","justificacion":"Plazo perentorio"}"#,
        ));
        let c = enricher(&mock).classify("Auto admite demanda").await.unwrap();
        assert_eq!(c, Classification::new(Urgency::High, "Plazo perentorio"));
        assert!(mock.last_request().unwrap().json_response);
    }

    #[tokio::test]
    async fn non_standard_label_is_not_an_error() {
        let mock = Arc::new(MockLlmClient::replying(r#"{"clasificacion":"URGENTE","justificacion":"x"}"#));
        let c = enricher(&mock).classify("Fija fecha de audiencia").await.unwrap();
        assert_eq!(c.urgency, Urgency::Low);
        assert!(c.justification.contains("URGENTE"));
    }

    #[tokio::test]
    async fn service_failures_map_to_fixed_fallbacks() {
        let mock = Arc::new(MockLlmClient::failing("connection refused"));
        let e = enricher(&mock);

        let err = e.summarize("Auto admite demanda").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Llm(LlmError::Http(_))));
        assert_eq!(err.summary_fallback(), SUMMARY_FAILED);

        let err = e.classify("Auto admite demanda").await.unwrap_err();
        assert_eq!(
            err.classification_fallback(),
            Classification::new(Urgency::Error, CLASSIFICATION_FAILED)
        );
        assert_eq!(mock.calls(), 2);
    }
}
