//! Normalisation of case-lookup payloads into canonical [`Process`] records.
//!
//! The lookup service is not consistent about the shape of what it returns.
//! Three shapes are accepted:
//!
//! - a bare array of raw processes: `[{...}, {...}]`
//! - an object wrapping them under `procesos`: `{"procesos": [{...}]}`
//!   (or `{"procesos": {...}}` for a single one)
//! - a single raw process object: `{"numero": "...", ...}`
//!
//! Anything else normalises to an empty sequence. Missing descriptive fields
//! become [`NOT_AVAILABLE`]; nothing here allocates a clock or performs I/O.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::model::{Action, NOT_AVAILABLE, Process};

/// Key under which the service sometimes nests its process list.
const WRAPPER_KEY: &str = "procesos";

/// Filing-number keys that identify an object as a single raw process.
const FILING_NUMBER_KEYS: &[&str] = &["numero", "llaveProceso"];

/// Role labels (upper-case substrings) for the plaintiff side.
pub const PLAINTIFF_ROLES: &[&str] = &["DEMANDANTE", "ACCIONANTE", "PLAINTIFF", "CLAIMANT"];

/// Role labels (upper-case substrings) for the defendant side.
pub const DEFENDANT_ROLES: &[&str] = &["DEMANDADO", "ACCIONADO", "DEFENDANT", "RESPONDENT"];

/// Top-level shape of a lookup payload.
#[derive(Debug)]
enum Payload<'a> {
    Wrapped(Vec<&'a Value>),
    List(Vec<&'a Value>),
    Single(&'a Value),
    Unrecognized,
}

impl<'a> Payload<'a> {
    fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::Array(items) => Payload::List(items.iter().collect()),
            Value::Object(map) => match map.get(WRAPPER_KEY) {
                Some(Value::Array(items)) => Payload::Wrapped(items.iter().collect()),
                Some(inner @ Value::Object(_)) => Payload::Wrapped(vec![inner]),
                _ if FILING_NUMBER_KEYS.iter().any(|k| map.contains_key(*k)) => {
                    Payload::Single(raw)
                }
                _ => Payload::Unrecognized,
            },
            _ => Payload::Unrecognized,
        }
    }

    fn into_items(self) -> Vec<&'a Value> {
        match self {
            Payload::Wrapped(items) | Payload::List(items) => items,
            Payload::Single(item) => vec![item],
            Payload::Unrecognized => Vec::new(),
        }
    }
}

// ── Raw records ──
//
// The service uses two names for several fields, sometimes both in one
// object. Each name gets its own field; the primary one wins when both carry
// a value.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProcess {
    #[serde(deserialize_with = "lenient_text")]
    numero: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    llave_proceso: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    despacho_actual: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    despacho: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    ponente: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    clase_proceso: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    tipo_proceso: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    fecha_radicacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    fecha_proceso: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    estado_actual: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    sujetos_procesales: Vec<RawParty>,
    #[serde(deserialize_with = "lenient_list")]
    actuaciones: Vec<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParty {
    #[serde(deserialize_with = "lenient_text")]
    tipo: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    nombre: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAction {
    #[serde(deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    id_reg_actuacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    fecha_actuacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    tipo_actuacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    actuacion: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    anotacion: Option<String>,
}

/// Accept a string or a number; treat blanks and every other type as absent.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept an array, keeping the elements that decode; anything else is empty.
fn lenient_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| {
                serde_json::from_value(item)
                    .inspect_err(|e| warn!(position, error = %e, "skipping malformed list element"))
                    .ok()
            })
            .collect(),
        _ => Vec::new(),
    })
}

// ── Public API ──

/// Normalise an untrusted lookup payload into canonical processes.
///
/// Never fails: unrecognised shapes yield an empty sequence, and elements that
/// are not objects or carry no filing number are skipped.
pub fn normalize(raw: &Value) -> Vec<Process> {
    Payload::classify(raw)
        .into_items()
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let decoded = match item {
                Value::Object(_) => RawProcess::deserialize(item).ok(),
                _ => None,
            };
            let process = decoded.and_then(map_process);
            if process.is_none() {
                warn!(position, "skipping raw process without a filing number");
            }
            process
        })
        .collect()
}

fn map_process(raw: RawProcess) -> Option<Process> {
    let filing_number = raw.numero.or(raw.llave_proceso)?;
    let plaintiff = find_party(&raw.sujetos_procesales, PLAINTIFF_ROLES);
    let defendant = find_party(&raw.sujetos_procesales, DEFENDANT_ROLES);
    let actions = map_actions(raw.actuaciones, &filing_number);

    Some(Process {
        id: filing_number.clone(),
        filing_number,
        court: or_not_available(raw.despacho_actual.or(raw.despacho)),
        rapporteur: raw.ponente,
        case_type: or_not_available(raw.clase_proceso.or(raw.tipo_proceso)),
        plaintiff,
        defendant,
        filing_date: or_not_available(raw.fecha_radicacion.or(raw.fecha_proceso)),
        current_status: or_not_available(raw.estado_actual),
        actions,
        last_updated: None,
    })
}

fn map_actions(raw: Vec<RawAction>, process_id: &str) -> Vec<Action> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, act)| {
            let date = or_not_available(act.fecha_actuacion);
            let id = match act.id.or(act.id_reg_actuacion) {
                Some(id) if !seen.contains(&id) => id,
                _ => synthesize_action_id(process_id, index, &date),
            };
            seen.insert(id.clone());

            let mut action = Action::new(id, date, or_not_available(act.anotacion));
            action.kind = act.tipo_actuacion.or(act.actuacion);
            action
        })
        .collect()
}

/// Deterministic id for an action the source did not identify:
/// `act-{process}-{index}-{epoch millis}`, with `NaN` for an unparseable date.
pub fn synthesize_action_id(process_id: &str, index: usize, date: &str) -> String {
    let millis = crate::model::parse_timestamp(date)
        .map(|ts| ts.timestamp_millis().to_string())
        .unwrap_or_else(|| "NaN".to_string());
    format!("act-{process_id}-{index}-{millis}")
}

/// First party whose role label contains one of `roles` (case-insensitive).
fn find_party(parties: &[RawParty], roles: &[&str]) -> String {
    parties
        .iter()
        .find(|p| {
            p.tipo.as_deref().is_some_and(|tipo| {
                let tipo = tipo.to_uppercase();
                roles.iter().any(|role| tipo.contains(role))
            })
        })
        .and_then(|p| p.nombre.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn or_not_available(field: Option<String>) -> String {
    field.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Urgency;
    use serde_json::json;

    const RADICADO: &str = "11001310300120230001200";

    fn full_process() -> Value {
        json!({
            "idProceso": 98765,
            "numero": RADICADO,
            "despachoActual": "Juzgado 001 Civil del Circuito de Bogotá",
            "claseProceso": "Verbal",
            "ponente": "Dra. Ana Gómez",
            "fechaRadicacion": "2023-01-15T00:00:00",
            "estadoActual": "En trámite",
            "sujetosProcesales": [
                {"tipo": "Demandante", "nombre": "Constructora Andes S.A.S."},
                {"tipo": "Demandado", "nombre": "Pedro Pérez"}
            ],
            "actuaciones": [
                {"id": "A-1", "fechaActuacion": "2023-02-10T00:00:00", "tipoActuacion": "AUTO", "anotacion": "Auto admite demanda"},
                {"id": 42, "fechaActuacion": "2023-03-01T00:00:00", "tipoActuacion": "MEMORIAL", "anotacion": "Memorial de contestación"}
            ]
        })
    }

    // ── Payload shapes ──

    #[test]
    fn empty_object_yields_nothing() {
        assert!(normalize(&json!({})).is_empty());
    }

    #[test]
    fn non_object_payloads_yield_nothing() {
        assert!(normalize(&Value::Null).is_empty());
        assert!(normalize(&json!("procesos")).is_empty());
        assert!(normalize(&json!(17)).is_empty());
        assert!(normalize(&json!([])).is_empty());
        assert!(normalize(&json!({"procesos": null})).is_empty());
        assert!(normalize(&json!({"mensaje": "sin resultados"})).is_empty());
    }

    #[test]
    fn bare_array_is_accepted() {
        let out = normalize(&json!([full_process(), {"numero": "999"}]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, RADICADO);
        assert_eq!(out[1].id, "999");
    }

    #[test]
    fn wrapped_array_is_accepted() {
        let out = normalize(&json!({"procesos": [full_process()], "paginacion": {"total": 1}}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].filing_number, RADICADO);
    }

    #[test]
    fn wrapped_single_object_is_accepted() {
        let out = normalize(&json!({"procesos": full_process()}));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn single_object_is_accepted() {
        let out = normalize(&full_process());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, RADICADO);
    }

    #[test]
    fn alternate_field_names_are_recognised() {
        let out = normalize(&json!({
            "llaveProceso": RADICADO,
            "despacho": "Juzgado 002",
            "fechaProceso": "2023-01-01",
            "actuaciones": [{"idRegActuacion": 555, "actuacion": "Fijación estado", "anotacion": "x"}]
        }));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].court, "Juzgado 002");
        assert_eq!(out[0].filing_date, "2023-01-01");
        assert_eq!(out[0].actions[0].id, "555");
        assert_eq!(out[0].actions[0].kind.as_deref(), Some("Fijación estado"));
    }

    #[test]
    fn both_names_of_a_field_in_one_object_are_tolerated() {
        let out = normalize(&json!({"procesos": [{
            "llaveProceso": RADICADO,
            "numero": RADICADO,
            "despachoActual": "Juzgado 001 Civil",
            "despacho": "Juzgado 1",
            "claseProceso": "Verbal",
            "tipoProceso": "Declarativo",
            "fechaRadicacion": "2023-01-15",
            "fechaProceso": "2023-01-16",
            "actuaciones": [
                {"id": 1, "idRegActuacion": 1, "fechaActuacion": "2023-02-10", "anotacion": "Auto admite demanda"},
                {"id": 2, "actuacion": "Auto", "tipoActuacion": "AUTO", "anotacion": "Fija fecha de audiencia"}
            ]
        }]}));
        assert_eq!(out.len(), 1);
        let p = &out[0];
        assert_eq!(p.id, RADICADO);
        assert_eq!(p.court, "Juzgado 001 Civil");
        assert_eq!(p.case_type, "Verbal");
        assert_eq!(p.filing_date, "2023-01-15");

        let ids: Vec<&str> = p.actions.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(p.actions[1].kind.as_deref(), Some("AUTO"));
    }

    #[test]
    fn secondary_name_fills_a_blank_primary() {
        let p = &normalize(&json!({
            "numero": "",
            "llaveProceso": RADICADO,
            "despachoActual": null,
            "despacho": "Juzgado 002",
            "actuaciones": [{"id": "  ", "idRegActuacion": 77, "anotacion": "x"}]
        }))[0];
        assert_eq!(p.id, RADICADO);
        assert_eq!(p.court, "Juzgado 002");
        assert_eq!(p.actions[0].id, "77");
    }

    #[test]
    fn elements_without_filing_number_or_not_objects_are_skipped() {
        let out = normalize(&json!([
            {"despachoActual": "sin número"},
            "texto suelto",
            null,
            {"numero": "   "},
            {"numero": RADICADO}
        ]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, RADICADO);
    }

    // ── Field mapping ──

    #[test]
    fn maps_descriptive_fields() {
        let p = &normalize(&full_process())[0];
        assert_eq!(p.id, p.filing_number);
        assert_eq!(p.court, "Juzgado 001 Civil del Circuito de Bogotá");
        assert_eq!(p.case_type, "Verbal");
        assert_eq!(p.rapporteur.as_deref(), Some("Dra. Ana Gómez"));
        assert_eq!(p.filing_date, "2023-01-15T00:00:00");
        assert_eq!(p.current_status, "En trámite");
        assert_eq!(p.plaintiff, "Constructora Andes S.A.S.");
        assert_eq!(p.defendant, "Pedro Pérez");
        assert!(p.last_updated.is_none());
    }

    #[test]
    fn missing_fields_degrade_to_sentinel() {
        let p = &normalize(&json!({"numero": RADICADO}))[0];
        assert_eq!(p.court, NOT_AVAILABLE);
        assert_eq!(p.case_type, NOT_AVAILABLE);
        assert_eq!(p.plaintiff, NOT_AVAILABLE);
        assert_eq!(p.defendant, NOT_AVAILABLE);
        assert_eq!(p.filing_date, NOT_AVAILABLE);
        assert_eq!(p.current_status, NOT_AVAILABLE);
        assert!(p.rapporteur.is_none());
        assert!(p.actions.is_empty());
    }

    #[test]
    fn wrongly_typed_fields_degrade_instead_of_failing() {
        let p = &normalize(&json!({
            "numero": 110013103,
            "despachoActual": {"nombre": "objeto"},
            "estadoActual": ["lista"],
            "sujetosProcesales": "Demandante: Juan",
            "actuaciones": {"no": "es lista"}
        }))[0];
        assert_eq!(p.id, "110013103");
        assert_eq!(p.court, NOT_AVAILABLE);
        assert_eq!(p.current_status, NOT_AVAILABLE);
        assert_eq!(p.plaintiff, NOT_AVAILABLE);
        assert!(p.actions.is_empty());
    }

    // ── Parties ──

    #[test]
    fn party_roles_match_by_case_insensitive_substring() {
        let p = &normalize(&json!({
            "numero": RADICADO,
            "sujetosProcesales": [
                {"tipo": "Apoderado", "nombre": "Abogada"},
                {"tipo": "parte accionante", "nombre": "Junta de Acción Comunal"},
                {"tipo": "ACCIONADO", "nombre": "Alcaldía"}
            ]
        }))[0];
        assert_eq!(p.plaintiff, "Junta de Acción Comunal");
        assert_eq!(p.defendant, "Alcaldía");
    }

    #[test]
    fn first_matching_party_wins() {
        let p = &normalize(&json!({
            "numero": RADICADO,
            "sujetosProcesales": [
                {"tipo": "Demandante", "nombre": "Primera"},
                {"tipo": "Demandante", "nombre": "Segunda"}
            ]
        }))[0];
        assert_eq!(p.plaintiff, "Primera");
        assert_eq!(p.defendant, NOT_AVAILABLE);
    }

    #[test]
    fn english_role_labels_are_recognised() {
        let p = &normalize(&json!({
            "numero": RADICADO,
            "sujetosProcesales": [
                {"tipo": "Claimant", "nombre": "Acme"},
                {"tipo": "Respondent", "nombre": "Globex"}
            ]
        }))[0];
        assert_eq!(p.plaintiff, "Acme");
        assert_eq!(p.defendant, "Globex");
    }

    #[test]
    fn malformed_party_entries_are_ignored() {
        let p = &normalize(&json!({
            "numero": RADICADO,
            "sujetosProcesales": [42, {"nombre": "sin rol"}, {"tipo": "Demandado", "nombre": "Válido"}]
        }))[0];
        assert_eq!(p.defendant, "Válido");
        assert_eq!(p.plaintiff, NOT_AVAILABLE);
    }

    // ── Actions ──

    #[test]
    fn actions_start_pending_and_idle() {
        let p = &normalize(&full_process())[0];
        assert_eq!(p.actions.len(), 2);
        for a in &p.actions {
            assert_eq!(a.urgency, Urgency::Pending);
            assert!(a.summary.is_none());
            assert!(a.urgency_justification.is_none());
            assert!(!a.is_summarizing);
            assert!(!a.is_classifying);
        }
        assert_eq!(p.actions[0].id, "A-1");
        assert_eq!(p.actions[0].description, "Auto admite demanda");
        assert_eq!(p.actions[0].kind.as_deref(), Some("AUTO"));
        assert_eq!(p.actions[1].id, "42");
    }

    #[test]
    fn missing_action_ids_are_synthesised_deterministically() {
        let payload = json!({
            "numero": RADICADO,
            "actuaciones": [
                {"fechaActuacion": "2023-02-10T00:00:00", "anotacion": "Auto admite demanda"},
                {"id": "", "anotacion": "Sin fecha"}
            ]
        });
        let first = normalize(&payload);
        let second = normalize(&payload);
        assert_eq!(
            first[0].actions[0].id,
            format!("act-{RADICADO}-0-1675987200000")
        );
        assert_eq!(first[0].actions[1].id, format!("act-{RADICADO}-1-NaN"));
        assert_eq!(first[0].actions[1].date, NOT_AVAILABLE);
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_native_ids_are_made_unique() {
        let p = &normalize(&json!({
            "numero": RADICADO,
            "actuaciones": [
                {"id": 7, "fechaActuacion": "2023-02-10", "anotacion": "uno"},
                {"id": 7, "fechaActuacion": "2023-02-11", "anotacion": "dos"}
            ]
        }))[0];
        assert_eq!(p.actions[0].id, "7");
        assert_eq!(p.actions[1].id, format!("act-{RADICADO}-1-1676073600000"));
    }

    #[test]
    fn missing_description_degrades_to_sentinel() {
        let p = &normalize(&json!({"numero": RADICADO, "actuaciones": [{"id": 1}]}))[0];
        assert_eq!(p.actions[0].description, NOT_AVAILABLE);
        assert!(p.actions[0].kind.is_none());
    }

    #[test]
    fn end_to_end_payload_has_single_pending_action() {
        let out = normalize(&json!([{
            "numero": RADICADO,
            "actuaciones": [{"fechaActuacion": "2023-02-10", "anotacion": "Auto admite demanda"}]
        }]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].actions.len(), 1);
        assert_eq!(out[0].actions[0].urgency, Urgency::Pending);
    }
}
