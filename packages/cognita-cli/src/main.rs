//! Cognita command-line front-end
//!
//! Thin wrapper that assembles pipelines from flags and environment:
//! - `typefind` prints the detected type and identity of each file
//! - `describe` prints the narration of each file
//! - `spo` extracts triples and prints them as Turtle or JSON lines

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cognita::transforms::{ExtractTriples, MboxSplit, Narrate, TypeFind};
use cognita::{
    CognitaConfig, CollectSink, Field, FileSource, IdentityDeriver, ImageNarrator,
    MailboxNarrator, MessageNarrator, OllamaAI, Pipeline, RunReport, Sink, SummarySink,
    TextNarrator, TripleExtractor, TurtleSink, TypeDetector, AI,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cognita")]
#[command(about = "Type, narrate and graph file content")]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every subcommand. Flags override `COGNITA_*` variables.
#[derive(Args)]
struct ServiceArgs {
    /// Namespace of minted identifiers
    #[arg(long, global = true, env = "COGNITA_NAMESPACE", default_value = "cognita")]
    namespace: String,

    /// Base URL of the Ollama service
    #[arg(long, global = true, env = "COGNITA_ENDPOINT", default_value = "http://localhost:11434")]
    endpoint: String,

    #[arg(long, global = true, env = "COGNITA_CLASSIFIER_MODEL")]
    classifier_model: Option<String>,

    #[arg(long, global = true, env = "COGNITA_NARRATOR_MODEL")]
    narrator_model: Option<String>,

    #[arg(long, global = true, env = "COGNITA_VISION_MODEL")]
    vision_model: Option<String>,

    #[arg(long, global = true, env = "COGNITA_EXTRACTOR_MODEL")]
    extractor_model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "COGNITA_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the type of each file
    Typefind {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Signature table only; never call the classifier
        #[arg(long)]
        no_ai: bool,
    },

    /// Narrate each file
    Describe {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract subject-predicate-object triples
    Spo {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Ontology file whose terms the extractor should use as predicates
        #[arg(long)]
        tbox: Option<PathBuf>,

        /// Source units processed concurrently
        #[arg(long, env = "COGNITA_WORKERS", default_value_t = 1)]
        workers: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Turtle)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Turtle,
    Json,
}

impl ServiceArgs {
    fn config(&self) -> Result<CognitaConfig> {
        let mut config = CognitaConfig::new()
            .with_namespace(&self.namespace)
            .with_endpoint(&self.endpoint)
            .with_timeout_secs(self.timeout_secs);
        if let Some(model) = &self.classifier_model {
            config = config.with_classifier_model(model);
        }
        if let Some(model) = &self.narrator_model {
            config = config.with_narrator_model(model);
        }
        if let Some(model) = &self.vision_model {
            config = config.with_vision_model(model);
        }
        if let Some(model) = &self.extractor_model {
            config = config.with_extractor_model(model);
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cognita=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.service.config()?;
    let ai: Arc<dyn AI> = Arc::new(OllamaAI::from_config(&config));

    match cli.command {
        Commands::Typefind { paths, no_ai } => typefind(config, ai, paths, no_ai).await,
        Commands::Describe { paths } => describe(config, ai, paths).await,
        Commands::Spo {
            paths,
            tbox,
            workers,
            format,
        } => spo(config, ai, paths, tbox, workers, format).await,
    }
}

async fn typefind(
    config: CognitaConfig,
    ai: Arc<dyn AI>,
    paths: Vec<PathBuf>,
    no_ai: bool,
) -> Result<()> {
    let config = config.with_ai_fallback(!no_ai);
    let detector = TypeDetector::from_config(&config, (!no_ai).then_some(ai));

    let sink = CollectSink::new();
    let collected = sink.handle();
    let pipeline = Pipeline::builder()
        .source(FileSource::new(paths, config.prebuffer_bytes))
        .transform(TypeFind::new(detector, IdentityDeriver::new(config.namespace.clone())))
        .sink(sink)
        .build()?;
    drive(pipeline, 1).await?;

    for unit in collected.units() {
        let summary = serde_json::json!({
            "unit": unit.display_name(),
            "identity": unit.identity().map(|identity| identity.iri()),
            "caps": unit.caps().summary_json(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

async fn describe(config: CognitaConfig, ai: Arc<dyn AI>, paths: Vec<PathBuf>) -> Result<()> {
    let deriver = IdentityDeriver::new(config.namespace.clone());

    let sink = CollectSink::new();
    let collected = sink.handle();
    let pipeline = Pipeline::builder()
        .source(FileSource::new(paths, config.prebuffer_bytes))
        .transform(TypeFind::new(
            TypeDetector::from_config(&config, Some(ai.clone())),
            deriver,
        ))
        .transform(narrators(ai))
        .sink(sink)
        .build()?;
    drive(pipeline, 1).await?;

    for unit in collected.units() {
        println!("== {} ({}) ==", unit.display_name(), unit.caps().label());
        match unit.caps().text(Field::Narration) {
            Some(narration) => println!("{}\n", narration),
            None => println!("(no narrator for this type)\n"),
        }
    }
    Ok(())
}

async fn spo(
    config: CognitaConfig,
    ai: Arc<dyn AI>,
    paths: Vec<PathBuf>,
    tbox: Option<PathBuf>,
    workers: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut extractor = TripleExtractor::from_config(&config, Some(ai.clone()));
    if let Some(path) = &tbox {
        let ontology = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read TBox {}", path.display()))?;
        extractor = extractor.with_tbox(ontology);
    }

    let report = match format {
        OutputFormat::Turtle => {
            let sink = TurtleSink::new(config.namespace.clone(), std::io::stdout());
            let pipeline = spo_pipeline(&config, ai, extractor, paths, sink)?;
            drive(pipeline, workers).await?
        }
        OutputFormat::Json => {
            let sink = SummarySink::new(std::io::stdout());
            let pipeline = spo_pipeline(&config, ai, extractor, paths, sink)?;
            drive(pipeline, workers).await?
        }
    };

    info!(
        delivered = report.delivered,
        failures = report.failures.len(),
        "triples written"
    );
    Ok(())
}

fn spo_pipeline(
    config: &CognitaConfig,
    ai: Arc<dyn AI>,
    extractor: TripleExtractor,
    paths: Vec<PathBuf>,
    sink: impl Sink + 'static,
) -> Result<Pipeline> {
    let deriver = IdentityDeriver::new(config.namespace.clone());
    let pipeline = Pipeline::builder()
        .source(FileSource::new(paths, config.prebuffer_bytes))
        .transform(TypeFind::new(
            TypeDetector::from_config(config, Some(ai.clone())),
            deriver.clone(),
        ))
        .transform(MboxSplit::new(deriver))
        .transform(narrators(ai))
        .transform(ExtractTriples::new(extractor))
        .sink(sink)
        .build()?;
    Ok(pipeline)
}

/// Deterministic narrators first so mail never reaches the text model.
fn narrators(ai: Arc<dyn AI>) -> Narrate {
    Narrate::new()
        .with(MailboxNarrator::new())
        .with(MessageNarrator::new())
        .with(ImageNarrator::new(ai.clone()))
        .with(TextNarrator::new(ai))
}

/// Run a pipeline, cancelling between units on Ctrl-C.
async fn drive(pipeline: Pipeline, workers: usize) -> Result<RunReport> {
    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current unit");
            on_interrupt.cancel();
        }
    });

    let report = if workers > 1 {
        pipeline.run_concurrent_until_cancelled(workers, token).await
    } else {
        pipeline.run_until_cancelled(token).await
    }
    .context("pipeline run failed")?;

    for failure in &report.failures {
        warn!(
            sequence = failure.sequence,
            unit = %failure.unit,
            stage = %failure.stage,
            error = %failure.error,
            "unit failed"
        );
    }
    if report.cancelled {
        warn!(units_read = report.units_read, "run cancelled");
    }
    Ok(report)
}
