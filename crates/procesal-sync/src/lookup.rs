//! Lookup contract: queries, the `CaseLookup` seam, and turning service
//! responses into processes.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use procesal_core::{Process, normalize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Longest server body kept in an error, in characters.
pub const ERROR_EXCERPT_LEN: usize = 500;

#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("response is not valid JSON: {body}")]
    NotJson { body: String },
}

impl FetchError {
    /// Text to show the person who ran the search.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { status: 404, .. } => format!(
                "El servicio de la Rama Judicial no se encontró en la URL configurada (Error 404). \
                 Verifique `lookup-url` en la configuración. Detalles técnicos: {self}"
            ),
            Self::Server { status, body } => format!("Error en la API: {status}. Detalles: {body}"),
            Self::NotJson { .. } => "La respuesta de la API judicial no es JSON válido.".to_string(),
            #[cfg(feature = "http")]
            Self::Http(e) => format!("No se pudo conectar con la API judicial: {e}"),
        }
    }
}

/// Which identifier a search value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryKind {
    /// Número de radicado, the 23-digit filing number.
    #[default]
    FilingNumber,
    Nit,
    /// Razón social.
    CorporateName,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FilingNumber => "radicado",
            Self::Nit => "nit",
            Self::CorporateName => "razon-social",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "radicado" => Ok(Self::FilingNumber),
            "nit" => Ok(Self::Nit),
            "razon-social" | "razon_social" => Ok(Self::CorporateName),
            other => Err(format!("unknown query kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub kind: QueryKind,
    pub value: String,
}

impl SearchQuery {
    pub fn new(kind: QueryKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn filing_number(value: impl Into<String>) -> Self {
        Self::new(QueryKind::FilingNumber, value)
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Source of fresh process records.
#[async_trait]
pub trait CaseLookup: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Process>, FetchError>;
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_LEN).collect()
}

/// The most useful part of an error body: its `message` field when the body is
/// JSON carrying one, otherwise the body itself.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
            Some(message) => excerpt(message),
            None => excerpt(body),
        },
        _ => excerpt(body),
    }
}

/// Turn a lookup response into processes.
pub fn parse_lookup_response(status: u16, body: &str) -> Result<Vec<Process>, FetchError> {
    if !(200..300).contains(&status) {
        let body = error_detail(body);
        warn!(status, body = %body, "lookup service returned an error");
        return Err(FetchError::Server { status, body });
    }
    let raw: Value = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "lookup response is not JSON");
        FetchError::NotJson {
            body: excerpt(body),
        }
    })?;
    Ok(normalize(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILING: &str = "11001310300120230001200";

    #[test]
    fn query_kinds_parse_from_cli_names() {
        assert_eq!("radicado".parse::<QueryKind>(), Ok(QueryKind::FilingNumber));
        assert_eq!("NIT".parse::<QueryKind>(), Ok(QueryKind::Nit));
        assert_eq!("razon-social".parse::<QueryKind>(), Ok(QueryKind::CorporateName));
        assert!("cedula".parse::<QueryKind>().is_err());
        assert_eq!(QueryKind::CorporateName.to_string(), "razon-social");
    }

    #[test]
    fn success_body_is_normalised() {
        let body = format!(
            r#"{{"procesos":[{{"numero":"{FILING}","despacho":"Juzgado 01 Civil del Circuito",
                "actuaciones":[{{"idRegActuacion":1,"fechaActuacion":"2023-02-01","actuacion":"Auto","anotacion":"Auto admite demanda"}}]}}]}}"#
        );
        let processes = parse_lookup_response(200, &body).unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].filing_number, FILING);
        assert_eq!(processes[0].actions[0].description, "Auto admite demanda");
    }

    #[test]
    fn unrecognised_json_is_an_empty_result() {
        assert!(parse_lookup_response(200, "{}").unwrap().is_empty());
        assert!(parse_lookup_response(200, "null").unwrap().is_empty());
    }

    #[test]
    fn non_json_success_body_is_an_error() {
        let html = format!("<html>{}</html>", "x".repeat(2_000));
        let err = parse_lookup_response(200, &html).unwrap_err();
        match err {
            FetchError::NotJson { body } => {
                assert!(body.starts_with("<html>"));
                assert_eq!(body.chars().count(), ERROR_EXCERPT_LEN);
            }
            other => panic!("expected NotJson, got {other:?}"),
        }
    }

    #[test]
    fn server_error_prefers_json_message() {
        let err = parse_lookup_response(500, r#"{"message":"Servicio no disponible","code":17}"#)
            .unwrap_err();
        assert!(matches!(
            &err,
            FetchError::Server { status: 500, body } if body == "Servicio no disponible"
        ));
        assert!(err.user_message().contains("Servicio no disponible"));
    }

    #[test]
    fn server_error_body_is_truncated() {
        let err = parse_lookup_response(502, &"é".repeat(1_000)).unwrap_err();
        let FetchError::Server { body, .. } = err else {
            panic!("expected Server");
        };
        assert_eq!(body.chars().count(), ERROR_EXCERPT_LEN);
    }

    #[test]
    fn not_found_gets_configuration_hint() {
        let err = parse_lookup_response(404, "Not Found").unwrap_err();
        let message = err.user_message();
        assert!(message.contains("Error 404"));
        assert!(message.contains("lookup-url"));
        assert!(message.contains("Not Found"));
    }
}
