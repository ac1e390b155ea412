mod display;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use procesal_ai::{Enricher, GeminiClient, GeminiClientConfig};
use procesal_core::Settings;
use procesal_host::Monitor;
use procesal_store::CorpusStore;
use procesal_sync::{LookupClient, QueryKind, SearchQuery};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "procesal",
    version,
    about = "Consulta procesos judiciales y enriquece sus actuaciones con IA"
)]
struct Cli {
    /// Config file (default: ~/.procesal/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the cached corpus (default: ~/.procesal).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Credential for the Gemini API.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the case-lookup service.
    #[arg(long, global = true)]
    lookup_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up processes and merge them into the cache.
    Search {
        value: String,
        /// What the value identifies: radicado, nit or razon-social.
        #[arg(long, default_value = "radicado")]
        by: QueryKind,
    },
    /// List cached processes.
    List,
    /// Show a cached process with its actions, newest first.
    Show { filing: String },
    /// Summarise one action with the AI service.
    Summarize { filing: String, action_id: String },
    /// Classify the urgency of one action, or of every pending action.
    Classify {
        filing: String,
        action_id: Option<String>,
        #[arg(long, conflicts_with = "action_id")]
        pending: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let monitor = build_monitor(&settings)?;

    match cli.command {
        Command::Search { value, by } => {
            let query = SearchQuery::new(by, value);
            match monitor.search(&query).await {
                Ok(ids) if ids.is_empty() => println!("{}", procesal_host::NO_RESULTS),
                Ok(ids) => {
                    for id in &ids {
                        if let Some(process) = monitor.process(id) {
                            display::print_process_card(&process);
                            println!();
                        }
                    }
                }
                Err(e) => bail!(e.user_message()),
            }
        }
        Command::List => display::print_process_list(&monitor.corpus()),
        Command::Show { filing } => match monitor.process(&filing) {
            Some(process) => display::print_process_card(&process),
            None => bail!("El proceso {filing} no está en caché. Use `procesal search {filing}`."),
        },
        Command::Summarize { filing, action_id } => {
            let outcome = monitor.summarize(&filing, &action_id).await;
            println!("{}", display::outcome_message(outcome, &action_id));
            print_action_result(&monitor, &filing, &action_id);
        }
        Command::Classify {
            filing,
            action_id,
            pending,
        } => match (action_id, pending) {
            (Some(action_id), _) => {
                let outcome = monitor.classify(&filing, &action_id).await;
                println!("{}", display::outcome_message(outcome, &action_id));
                print_action_result(&monitor, &filing, &action_id);
            }
            (None, true) => {
                let Some(outcomes) = monitor.classify_pending(&filing).await else {
                    bail!("El proceso {filing} no está en caché.");
                };
                if outcomes.is_empty() {
                    println!("No hay actuaciones pendientes de clasificar.");
                }
                for (action_id, outcome) in outcomes {
                    println!("{}", display::outcome_message(outcome, &action_id));
                }
                if let Some(process) = monitor.process(&filing) {
                    println!();
                    display::print_process_card(&process);
                }
            }
            (None, false) => bail!("Indique el id de una actuación o use --pending."),
        },
    }

    Ok(())
}

/// File settings, with command-line values taking precedence.
fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Settings::default_path(),
    };
    let mut settings = match &path {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(dir) = &cli.store_dir {
        settings.store_dir = Some(dir.clone());
    }
    if let Some(key) = &cli.api_key {
        settings.api_key = Some(key.clone());
    }
    if let Some(url) = &cli.lookup_url {
        settings.lookup_url = url.clone();
    }
    Ok(settings)
}

fn build_monitor(settings: &Settings) -> anyhow::Result<Monitor> {
    let store_dir = settings
        .store_dir
        .clone()
        .or_else(Settings::default_dir)
        .context("could not determine a cache directory; pass --store-dir")?;
    let store = CorpusStore::open(&store_dir)
        .with_context(|| format!("opening cache in {}", store_dir.display()))?;

    let timeout = Duration::from_secs(settings.timeout_secs);
    let lookup = LookupClient::with_timeout(&settings.lookup_url, timeout)
        .context("building case-lookup client")?;

    let enricher = match settings.api_key() {
        Some(api_key) => {
            let client = GeminiClient::new(GeminiClientConfig {
                api_key: api_key.to_string(),
                model: settings.gemini_model.clone(),
                endpoint: settings.gemini_endpoint.clone(),
                timeout_secs: settings.timeout_secs,
                ..GeminiClientConfig::default()
            })
            .context("building Gemini client")?;
            Enricher::new(Arc::new(client), settings.gemini_model.clone())
        }
        None => {
            warn!("GEMINI_API_KEY not set; summaries and classifications will report an error");
            Enricher::unconfigured()
        }
    };

    info!(store = %store_dir.display(), lookup = %settings.lookup_url, "procesal v{}", env!("CARGO_PKG_VERSION"));
    Ok(Monitor::new(Arc::new(lookup), enricher, store, Utc::now()))
}

fn print_action_result(monitor: &Monitor, filing: &str, action_id: &str) {
    let Some(action) = monitor.process(filing).and_then(|p| p.action(action_id).cloned()) else {
        return;
    };
    println!("  Urgencia:      {}", action.urgency);
    if let Some(justification) = &action.urgency_justification {
        println!("  Justificación: {justification}");
    }
    if let Some(summary) = &action.summary {
        println!("  Resumen IA:    {summary}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn search_defaults_to_filing_number() {
        let cli = Cli::try_parse_from(["procesal", "search", "11001310300120230001200"]).unwrap();
        match cli.command {
            Command::Search { value, by } => {
                assert_eq!(value, "11001310300120230001200");
                assert_eq!(by, QueryKind::FilingNumber);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn search_kind_parses_cli_names() {
        let cli = Cli::try_parse_from(["procesal", "search", "900123456", "--by", "nit"]).unwrap();
        assert!(matches!(cli.command, Command::Search { by: QueryKind::Nit, .. }));
    }

    #[test]
    fn pending_conflicts_with_action_id() {
        assert!(Cli::try_parse_from(["procesal", "classify", "p1", "a1", "--pending"]).is_err());
        let cli = Cli::try_parse_from(["procesal", "classify", "p1", "--pending"]).unwrap();
        assert!(matches!(cli.command, Command::Classify { pending: true, action_id: None, .. }));
    }

    #[test]
    fn flags_override_file_settings() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = tmp.path().join("config.toml");
        std::fs::write(&config, "lookup-url = \"http://archivo\"\napi-key = \"del-archivo\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "procesal",
            "--config",
            config.to_str().unwrap(),
            "--lookup-url",
            "http://flag",
            "--store-dir",
            tmp.path().to_str().unwrap(),
            "list",
        ])
        .unwrap();
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.lookup_url, "http://flag");
        assert_eq!(settings.store_dir.as_deref(), Some(tmp.path()));
        // GEMINI_API_KEY may be set in the environment running the tests.
        if cli.api_key.is_none() {
            assert_eq!(settings.api_key(), Some("del-archivo"));
        }
    }
}
