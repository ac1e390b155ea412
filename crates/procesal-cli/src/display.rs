//! Vertical card display for cached processes.
//!
//! Renders a process as a grouped, human-readable card: descriptive fields
//! first, then its actions newest first with whatever enrichment they carry.

use chrono::{DateTime, Local, Utc};
use procesal_core::{Action, Corpus, NOT_AVAILABLE, Process, Urgency};
use procesal_host::EnrichOutcome;

const LABEL_WIDTH: usize = 16;
const MAX_DESCRIPTION_CHARS: usize = 400;

// ── Public API ──

/// Print a single process as a vertical card.
pub fn print_process_card(process: &Process) {
    println!("=== {} ===", process.filing_number);
    println!();

    println!("Proceso");
    print_field("Tipo", &process.case_type);
    print_field("Despacho", &process.court);
    if let Some(rapporteur) = &process.rapporteur {
        print_field("Ponente", rapporteur);
    }
    print_field("Demandante", &process.plaintiff);
    print_field("Demandado", &process.defendant);
    print_field("Radicación", &short_date(&process.filing_date));
    print_field("Estado", &process.current_status);
    if let Some(ts) = process.last_updated {
        print_field("Actualizado", &local_time(ts));
    }
    println!();

    let actions = process.actions_by_date();
    println!("Actuaciones ({})", actions.len());
    if actions.is_empty() {
        println!("  (sin actuaciones registradas)");
    }
    for action in actions {
        print_action(action);
    }
}

/// Print one line per cached process, most recently updated first.
pub fn print_process_list(corpus: &Corpus) {
    if corpus.is_empty() {
        println!("No hay procesos en caché.");
        return;
    }

    let mut processes: Vec<&Process> = corpus.iter().collect();
    processes.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

    println!(
        "{:<25} {:<10} {:>5}  {}",
        "Radicado", "Pendientes", "Total", "Despacho"
    );
    for p in processes {
        let pending = p
            .actions
            .iter()
            .filter(|a| a.urgency == Urgency::Pending)
            .count();
        println!(
            "{:<25} {:<10} {:>5}  {}",
            p.filing_number,
            pending,
            p.actions.len(),
            p.court
        );
    }
}

/// Describe how an enrichment request ended.
pub fn outcome_message(outcome: EnrichOutcome, action_id: &str) -> String {
    match outcome {
        EnrichOutcome::Completed => format!("Actuación {action_id} actualizada."),
        EnrichOutcome::AlreadyInFlight => {
            format!("Ya hay una solicitud en curso para la actuación {action_id}.")
        }
        EnrichOutcome::NotFound => format!("No existe la actuación {action_id} en caché."),
    }
}

// ── Card sections ──

fn print_action(action: &Action) {
    let kind = action.kind.as_deref().unwrap_or("Actuación");
    let badge = urgency_badge(action.urgency);
    println!();
    println!("  [{}] {kind}{badge}", short_date(&action.date));
    println!("    {}", truncate(&action.description, MAX_DESCRIPTION_CHARS));

    if let Some(justification) = &action.urgency_justification {
        println!("    Justificación: {justification}");
    }
    if let Some(summary) = &action.summary {
        println!("    Resumen IA:    {summary}");
    }
    if action.is_summarizing || action.is_classifying {
        println!("    (procesando...)");
    }
    println!("    id: {}", action.id);
}

fn print_field(label: &str, value: &str) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}

// ── Helpers ──

/// ` · Alta`, or nothing for an unclassified action.
fn urgency_badge(urgency: Urgency) -> String {
    match urgency {
        Urgency::Pending => String::new(),
        other => format!(" · {other}"),
    }
}

/// `YYYY-MM-DD` for a parseable timestamp, the raw text otherwise.
fn short_date(raw: &str) -> String {
    match procesal_core::model::parse_timestamp(raw) {
        Some(ts) => ts.format("%Y-%m-%d").to_string(),
        None if raw.trim().is_empty() => NOT_AVAILABLE.to_string(),
        None => raw.to_string(),
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}
