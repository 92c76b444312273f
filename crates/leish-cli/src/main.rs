//! Leishmaniapp - diagnosis core CLI
//!
//! ## Commands
//!
//! - `reconcile`: drain a JSON-lines stream of analysis results into the store
//! - `case`: show samples, completion, tallies and model verdict of a case
//! - `specialist`: set or clear a specialist count on a stored image
//! - `diseases`: list registered diseases and their element names

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use leish_core::{
    JsonLinesSource, ReconcileReport, ReconcileWorker, Reconciler, WorkOutcome,
};
use leish_domain::{Diagnosis, DiseaseRegistry, SampleKey, Tallies};
use leish_state::{SamplesRepository, StoreConfig, SurrealSamplesRepository};
use serde::Serialize;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, Level};
use uuid::Uuid;

/// `EX_TEMPFAIL`: the run should be retried later.
const EXIT_RETRY: u8 = 75;

#[derive(Parser)]
#[command(name = "leishmaniapp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Leishmaniapp diagnosis core", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Local store directory (overrides LEISH_DB_* remote settings)
    #[arg(long, global = true, env = "LEISH_DB_PATH")]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply analysis results to the store
    Reconcile {
        /// JSON-lines envelope file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Summarise a diagnosis case from the stored images
    Case {
        /// Diagnosis id
        #[arg(short, long)]
        diagnosis: Uuid,

        /// Disease id (e.g. leishmaniasis.giemsa)
        #[arg(long)]
        disease: String,
    },

    /// Set or clear the specialist count of one element on a stored image
    Specialist {
        #[arg(short, long)]
        diagnosis: Uuid,

        #[arg(short, long)]
        sample: u32,

        /// Element id (e.g. leishmaniasis.giemsa:parasite)
        #[arg(short, long)]
        element: String,

        /// New count; omit to clear
        #[arg(short, long)]
        amount: Option<u32>,
    },

    /// List registered diseases
    Diseases,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    leish_core::init_tracing(cli.json, level);

    let config = match cli.db_path {
        Some(path) => StoreConfig::local(path),
        None => StoreConfig::from_env(),
    };

    match cli.command {
        Commands::Reconcile { input } => {
            let repo = Arc::new(open_store(&config).await?);
            let reader = open_input(&input).await?;
            let (outcome, report) = cmd_reconcile(repo, reader, shutdown_signal()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(match outcome {
                WorkOutcome::Success => ExitCode::SUCCESS,
                WorkOutcome::Retry => ExitCode::from(EXIT_RETRY),
            })
        }
        Commands::Case { diagnosis, disease } => {
            let repo = open_store(&config).await?;
            let summary = cmd_case(&repo, diagnosis, &disease).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Specialist {
            diagnosis,
            sample,
            element,
            amount,
        } => {
            let repo = open_store(&config).await?;
            cmd_specialist(&repo, SampleKey::new(diagnosis, sample), &element, amount).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diseases => {
            cmd_diseases(DiseaseRegistry::global())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn open_store(config: &StoreConfig) -> Result<SurrealSamplesRepository> {
    SurrealSamplesRepository::connect(config)
        .await
        .with_context(|| format!("Failed to open samples store at {}", config.url()))
}

type Input = Box<dyn AsyncBufRead + Send + Unpin>;

async fn open_input(input: &str) -> Result<Input> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open envelope file {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Drain `reader` into `repo`.
async fn cmd_reconcile<R, F>(
    repo: Arc<R>,
    reader: Input,
    shutdown: F,
) -> (WorkOutcome, ReconcileReport)
where
    R: SamplesRepository + 'static,
    F: std::future::Future<Output = ()>,
{
    let worker = ReconcileWorker::new(
        Arc::new(JsonLinesSource::new(reader)),
        Reconciler::new(repo),
    );
    let (outcome, report) = worker.run_until(shutdown).await;
    info!(?outcome, processed = report.processed, "reconcile finished");
    (outcome, report)
}

#[derive(Debug, Serialize)]
struct CaseSummary {
    diagnosis: Uuid,
    disease: String,
    samples: usize,
    completed: bool,
    model_result: bool,
    tallies: Tallies,
}

/// Rebuild the case from the stored images and judge it.
async fn cmd_case<R>(repo: &R, diagnosis: Uuid, disease: &str) -> Result<CaseSummary>
where
    R: SamplesRepository + ?Sized,
{
    let mut case = Diagnosis::for_disease(disease)?;
    case.id = diagnosis;

    let images = repo
        .list_for_diagnosis(diagnosis)
        .await
        .with_context(|| format!("Failed to load images of {diagnosis}"))?;
    let case = images
        .into_iter()
        .fold(case, Diagnosis::append_image)
        .with_verdict();

    Ok(CaseSummary {
        diagnosis: case.id,
        disease: case.disease.id().to_string(),
        samples: case.samples(),
        completed: case.completed(),
        model_result: case.model_result,
        tallies: case.tallies(),
    })
}

/// Specialist review of one image.
async fn cmd_specialist<R>(
    repo: &R,
    key: SampleKey,
    element: &str,
    amount: Option<u32>,
) -> Result<()>
where
    R: SamplesRepository + ?Sized,
{
    let name = DiseaseRegistry::global()
        .element_name(element)
        .ok_or_else(|| anyhow!("Unknown element {element}"))?;
    let mut image = repo
        .find(&key)
        .await?
        .ok_or_else(|| anyhow!("No image stored for {key}"))?;

    image.set_specialist_amount(&name, amount);
    repo.upsert(&image).await?;

    match amount {
        Some(n) => println!("{key}: {name} = {n}"),
        None => println!("{key}: {name} cleared"),
    }
    Ok(())
}

fn cmd_diseases(registry: &DiseaseRegistry) -> Result<()> {
    if registry.is_empty() {
        println!("No diseases registered.");
        return Ok(());
    }

    for disease in registry.diseases() {
        println!("{} ({})", disease.id(), disease.display_name());
        for name in disease.elements() {
            println!("  {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leish_domain::{AnalysisStage, ElementKind, MockDots};

    fn reader(lines: &str) -> Input {
        Box::new(BufReader::new(std::io::Cursor::new(lines.as_bytes().to_vec())))
    }

    fn envelopes(id: Uuid) -> String {
        format!(
            "{{\"status\":\"ok\",\"diagnosis\":\"{id}\",\"sample\":0,\"elements\":[{{\"name\":\"mock.dots:dot\",\"coordinates\":[[1,1],[2,2]]}}]}}\n\
             {{\"status\":\"ok\",\"diagnosis\":\"{id}\",\"sample\":1,\"elements\":[{{\"name\":\"mock.dots:dot\",\"coordinates\":[[3,3]]}}]}}\n"
        )
    }

    #[tokio::test]
    async fn reconcile_then_summarise_case() {
        let repo = Arc::new(SurrealSamplesRepository::in_memory().await.unwrap());
        let id = Uuid::new_v4();

        let (outcome, report) =
            cmd_reconcile(repo.clone(), reader(&envelopes(id)), std::future::pending()).await;
        assert_eq!(outcome, WorkOutcome::Success);
        assert_eq!(report.analyzed, 2);

        let summary = cmd_case(repo.as_ref(), id, MockDots::ID).await.unwrap();
        assert_eq!(summary.samples, 2);
        assert!(summary.completed);
        assert!(summary.model_result);

        let dot = DiseaseRegistry::global().element_name("mock.dots:dot").unwrap();
        assert_eq!(summary.tallies.get(&dot, ElementKind::Model), Some(3));
    }

    #[tokio::test]
    async fn interrupted_reconcile_asks_for_retry() {
        let repo = Arc::new(SurrealSamplesRepository::in_memory().await.unwrap());
        let (outcome, report) =
            cmd_reconcile(repo, reader(&envelopes(Uuid::new_v4())), std::future::ready(())).await;
        assert_eq!(outcome, WorkOutcome::Retry);
        assert!(report.cancelled);
    }

    #[tokio::test]
    async fn case_with_unknown_disease_fails() {
        let repo = SurrealSamplesRepository::in_memory().await.unwrap();
        assert!(cmd_case(&repo, Uuid::new_v4(), "no.such").await.is_err());
    }

    #[tokio::test]
    async fn empty_case_is_complete_and_negative() {
        let repo = SurrealSamplesRepository::in_memory().await.unwrap();
        let summary = cmd_case(&repo, Uuid::new_v4(), MockDots::ID).await.unwrap();
        assert_eq!(summary.samples, 0);
        assert!(summary.completed);
        assert!(!summary.model_result);
        assert!(summary.tallies.is_empty());
    }

    #[tokio::test]
    async fn specialist_count_is_stored() {
        let repo = Arc::new(SurrealSamplesRepository::in_memory().await.unwrap());
        let id = Uuid::new_v4();
        cmd_reconcile(repo.clone(), reader(&envelopes(id)), std::future::pending()).await;

        let key = SampleKey::new(id, 0);
        cmd_specialist(repo.as_ref(), key, "mock.dots:dot", Some(6))
            .await
            .unwrap();

        let image = repo.find(&key).await.unwrap().unwrap();
        assert_eq!(image.stage, AnalysisStage::Analyzed);
        assert_eq!(image.specialist_elements().count(), 1);

        cmd_specialist(repo.as_ref(), key, "mock.dots:dot", None)
            .await
            .unwrap();
        let image = repo.find(&key).await.unwrap().unwrap();
        assert_eq!(image.specialist_elements().count(), 0);
    }

    #[tokio::test]
    async fn specialist_on_missing_image_fails() {
        let repo = SurrealSamplesRepository::in_memory().await.unwrap();
        let key = SampleKey::new(Uuid::new_v4(), 0);
        assert!(cmd_specialist(&repo, key, "mock.dots:dot", Some(1))
            .await
            .is_err());
    }

    #[test]
    fn diseases_lists_builtins() {
        assert!(cmd_diseases(DiseaseRegistry::global()).is_ok());
    }

    #[test]
    fn cli_parses_reconcile_defaults() {
        let cli = Cli::try_parse_from(["leishmaniapp", "reconcile"]).unwrap();
        assert!(matches!(cli.command, Commands::Reconcile { ref input } if input == "-"));
    }
}
