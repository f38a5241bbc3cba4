use anyhow::Context;
use api_shared::{RoleNavigationDto, TranslateRes};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use emr_core::{
    ApiClient, Clock, CoreConfig, EncounterDraft, EncounterForm, EnvValues, FixedClock,
    HttpBundleSubmitter, Role, SearchDebouncer, SystemClock,
};
use fhir::Bundle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use terminology::{ConceptEntry, ConceptTables};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emr")]
#[command(about = "NAMASTE to ICD-11 terminology and encounter bundle CLI")]
struct Cli {
    /// YAML tables to use instead of EMR_TERMINOLOGY_PATH or the embedded set
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search source concepts by display name, code or description
    Search { query: String },
    /// Type-ahead search: read queries from stdin, one per line, debounced
    Suggest,
    /// Show the ICD-11 targets and mapping edges of a NAMASTE code
    Translate { code: String },
    /// Load a table file and report its integrity
    CheckTables {
        /// Table file (defaults to the embedded set)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Validate an encounter form (JSON) and print the composed bundle
    Compose {
        form: PathBuf,
        /// Bundle timestamp (RFC 3339); defaults to now
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Validate an encounter form and submit its bundle to EMR_API_BASE_URL
    Submit {
        form: PathBuf,
        /// Bearer token for the upstream API
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the navigation table of every role
    Roles,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("emr_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::from_env_values(EnvValues::from_process_env())?;
    let table_path = cli.tables.as_deref().or(cfg.terminology_path());

    match cli.command {
        Some(Commands::Search { query }) => {
            let tables = ConceptTables::load_or_embedded(table_path)?;
            print_hits(&tables, &query, tables.search(&query));
        }
        Some(Commands::Suggest) => {
            let tables = Arc::new(ConceptTables::load_or_embedded(table_path)?);
            let debouncer = Arc::new(SearchDebouncer::from_config(tables.clone(), &cfg));
            let stdin = BufReader::new(tokio::io::stdin());
            for (query, results) in suggest_lines(&debouncer, stdin).await? {
                print_hits(&tables, &query, results.iter());
            }
        }
        Some(Commands::Translate { code }) => {
            let tables = ConceptTables::load_or_embedded(table_path)?;
            let res = TranslateRes::build(&tables, &code);
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        Some(Commands::CheckTables { path }) => {
            let path = path.as_deref().or(table_path);
            let tables = ConceptTables::load_or_embedded(path)?;
            let unmapped: Vec<&str> = tables
                .concepts()
                .iter()
                .filter(|c| tables.resolve_targets(c.code.as_str()).is_empty())
                .map(|c| c.code.as_str())
                .collect();
            println!(
                "OK: {} concepts, {} targets, {} mappings ({})",
                tables.concepts().len(),
                tables.targets().len(),
                tables.mappings().len(),
                path.map_or_else(|| "embedded".to_string(), |p| p.display().to_string())
            );
            if !unmapped.is_empty() {
                println!("Concepts without ICD-11 targets: {}", unmapped.join(", "));
            }
        }
        Some(Commands::Compose { form, timestamp }) => {
            let tables = Arc::new(ConceptTables::load_or_embedded(table_path)?);
            let clock: Box<dyn Clock> = match timestamp {
                Some(ts) => Box::new(FixedClock(ts)),
                None => Box::new(SystemClock),
            };
            let bundle = compose_form(tables, &read_form(&form)?, clock.as_ref())?;
            println!("{}", bundle.render()?);
        }
        Some(Commands::Submit { form, token }) => {
            let tables = Arc::new(ConceptTables::load_or_embedded(table_path)?);
            let mut client = ApiClient::new(&cfg)?;
            if let Some(token) = token {
                client = client.with_token(token);
            }
            let submitter = HttpBundleSubmitter::new(client);

            let today = SystemClock.now().date_naive();
            let ready = EncounterDraft::from_form(tables, read_form(&form)?, today)?
                .finalise()
                .map_err(|rejected| rejected.error)?;
            match ready.submit(&submitter, &SystemClock).await {
                Ok(submitted) => println!(
                    "Submitted {} entries, bundle id: {}",
                    submitted.bundle.entry.len(),
                    submitted.receipt.bundle_id.as_deref().unwrap_or("(none)")
                ),
                Err(rejected) => anyhow::bail!("Submission failed: {}", rejected.error),
            }
        }
        Some(Commands::Roles) => {
            let table: Vec<RoleNavigationDto> = Role::ALL.into_iter().map(Into::into).collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        None => {
            println!("Use 'emr --help' for commands");
        }
    }

    Ok(())
}

fn print_hits<'a>(
    tables: &ConceptTables,
    query: &str,
    hits: impl IntoIterator<Item = &'a ConceptEntry>,
) {
    let mut any = false;
    for entry in hits {
        any = true;
        let targets = tables
            .resolve_targets(entry.code.as_str())
            .iter()
            .map(|t| format!("{} [{}]", t.code, t.module.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{}  {} ({})  -> {}",
            entry.code, entry.display, entry.system, targets
        );
    }
    if !any {
        println!("No concepts match {query:?}.");
    }
}

/// Feed each input line to the debouncer as one keystroke of a type-ahead box.
///
/// Returns the queries that were not superseded, with their results, in input order.
async fn suggest_lines<R>(
    debouncer: &Arc<SearchDebouncer>,
    input: R,
) -> anyhow::Result<Vec<(String, Vec<ConceptEntry>)>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut pending = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let handle = debouncer.spawn_search(line.clone());
        pending.push((line, handle));
    }

    let mut settled = Vec::new();
    for (query, handle) in pending {
        if let Some(results) = handle.await? {
            settled.push((query, results));
        }
    }
    Ok(settled)
}

fn read_form(path: &Path) -> anyhow::Result<EncounterForm> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read form {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid form {}", path.display()))
}

/// Validate `form` and compose its bundle. The encounter date defaults to the clock's date.
fn compose_form(
    tables: Arc<ConceptTables>,
    form: &EncounterForm,
    clock: &dyn Clock,
) -> anyhow::Result<Bundle> {
    let today: NaiveDate = clock.now().date_naive();
    let ready = EncounterDraft::from_form(tables, form.clone(), today)?
        .finalise()
        .map_err(|rejected| rejected.error)?;
    Ok(ready.compose(clock)?)
}
