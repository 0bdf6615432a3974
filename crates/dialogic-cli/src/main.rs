//! Dialogic CLI
//!
//! Command-line interface for building anchor indexes and classifying queries.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use dialogic_core::{
    evaluate, load_dataset, ArtifactStore, Classification, Classifier, ClassifierConfig,
    Embedder, EvaluationReport, IndexBuilder, MatchRoute,
};

/// Dialogic - topic classification over sentence embeddings
#[derive(Parser)]
#[command(name = "dialogic")]
#[command(author = "Dialogic Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classify conversational queries into topics and subtopics")]
#[command(long_about = "Dialogic embeds labeled anchor texts into an exact nearest-neighbor index and \
classifies queries against it.\n\nA query takes the nearest anchor's label when the squared L2 distance \
is within the primary threshold, else the most cosine-similar anchor's label when the similarity reaches \
the secondary threshold, else the topic \"General\".")]
struct Cli {
    /// Artifact directory (defaults to DIALOGIC_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a JSONL dataset and write the index artifacts
    Build {
        /// JSONL file with one {"text", "topic", "subtopic"} record per line
        dataset: PathBuf,
    },

    /// Classify a query, or start an interactive session when none is given
    Classify {
        /// Query text (omit for interactive mode; type 'exit' to quit)
        query: Option<String>,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Show the decision route, distance and similarity
        #[arg(long)]
        explain: bool,
    },

    /// Score the classifier against a held-out labeled dataset
    Evaluate {
        /// JSONL file with one {"text", "topic", "subtopic"} record per line
        dataset: PathBuf,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the index manifest and the topic distribution
    Inspect,
}

/// Threshold overrides; flags win over environment variables
#[derive(Args, Debug, Default, Clone)]
struct ThresholdArgs {
    /// Maximum squared L2 distance accepted by the nearest-anchor tier
    #[arg(long)]
    primary_threshold: Option<f32>,

    /// Minimum cosine similarity accepted by the fallback tier
    #[arg(long)]
    secondary_threshold: Option<f32>,
}

impl ThresholdArgs {
    fn resolve(&self) -> Result<ClassifierConfig> {
        let mut config = ClassifierConfig::from_env();
        if let Some(primary) = self.primary_threshold {
            config.primary_threshold = primary;
        }
        if let Some(secondary) = self.secondary_threshold {
            config.secondary_threshold = secondary;
        }
        config.validate().context("Invalid threshold configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let store = open_store(cli.data_dir)?;

    match cli.command {
        Commands::Build { dataset } => run_build(&dataset, &store),
        Commands::Classify {
            query,
            thresholds,
            explain,
        } => run_classify(&store, query, &thresholds, explain),
        Commands::Evaluate {
            dataset,
            thresholds,
            json,
        } => run_evaluate(&dataset, &store, &thresholds, json),
        Commands::Inspect => run_inspect(&store),
    }
}

fn open_store(data_dir: Option<PathBuf>) -> Result<ArtifactStore> {
    match data_dir {
        Some(dir) => Ok(ArtifactStore::new(dir)),
        None => ArtifactStore::at_default_location().context("Failed to resolve artifact directory"),
    }
}

#[cfg(feature = "embeddings")]
fn load_embedder() -> Result<Arc<dyn Embedder>> {
    let service = dialogic_core::EmbeddingService::new()
        .context("Failed to initialize the embedding model")?;
    Ok(Arc::new(service))
}

#[cfg(not(feature = "embeddings"))]
fn load_embedder() -> Result<Arc<dyn Embedder>> {
    anyhow::bail!("dialogic was built without the `embeddings` feature; no embedding model is available")
}

fn open_classifier(store: &ArtifactStore, thresholds: &ThresholdArgs) -> Result<Classifier> {
    let config = thresholds.resolve()?;
    let embedder = load_embedder()?;
    Classifier::open(embedder, store, config)
        .with_context(|| format!("Failed to load index from {}", store.dir().display()))
}

// ============================================================================
// BUILD
// ============================================================================

fn run_build(dataset: &Path, store: &ArtifactStore) -> Result<()> {
    let embedder = load_embedder()?;
    build_index(embedder.as_ref(), dataset, store)
}

fn build_index(embedder: &dyn Embedder, dataset: &Path, store: &ArtifactStore) -> Result<()> {
    println!("{}", "=== Building Anchor Index ===".cyan().bold());
    println!("{}: {}", "Dataset".white().bold(), dataset.display());
    println!("{}: {}", "Model".white().bold(), embedder.model_name());

    let set = IndexBuilder::new(embedder)
        .build_from_dataset(dataset, store)
        .with_context(|| format!("Failed to build index from {}", dataset.display()))?;

    println!();
    println!("{}: {}", "Anchors".white().bold(), set.len());
    println!("{}: {}", "Dimensions".white().bold(), set.dimensions());
    println!("{}: {}", "Topics".white().bold(), set.topic_distribution().len());
    println!("{}: {}", "Saved to".white().bold(), store.dir().display());
    println!();
    println!("{}", "Index build complete.".green().bold());
    Ok(())
}

// ============================================================================
// CLASSIFY
// ============================================================================

fn run_classify(
    store: &ArtifactStore,
    query: Option<String>,
    thresholds: &ThresholdArgs,
    explain: bool,
) -> Result<()> {
    let classifier = open_classifier(store, thresholds)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match query {
        Some(query) => {
            let classification = classifier.classify_detailed(&query)?;
            print_classification(&mut out, &classifier, &classification, explain)?;
        }
        None => {
            let stdin = io::stdin();
            interactive_loop(&classifier, stdin.lock(), &mut out, explain)?;
        }
    }
    Ok(())
}

/// Classify lines from `input` until `exit` or end of input
///
/// Per-query errors are printed and the loop keeps going.
fn interactive_loop<R: BufRead, W: Write>(
    classifier: &Classifier,
    mut input: R,
    out: &mut W,
    explain: bool,
) -> io::Result<usize> {
    let mut classified = 0;
    let mut line = String::new();

    loop {
        write!(out, "Enter your query (or type 'exit'): ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        match classifier.classify_detailed(query) {
            Ok(classification) => {
                print_classification(out, classifier, &classification, explain)?;
                classified += 1;
            }
            Err(e) => writeln!(out, "{}: {}", "Error".red().bold(), e)?,
        }
    }

    Ok(classified)
}

fn print_classification<W: Write>(
    out: &mut W,
    classifier: &Classifier,
    classification: &Classification,
    explain: bool,
) -> io::Result<()> {
    let label = &classification.label;
    writeln!(out, "{}: {}", "Predicted Topic".white().bold(), label.topic.green())?;
    writeln!(
        out,
        "{}: {}",
        "Predicted Subtopic".white().bold(),
        label.subtopic.as_deref().unwrap_or("None")
    )?;

    if explain {
        let route = match classification.route {
            MatchRoute::Nearest => classification.route.to_string().green(),
            MatchRoute::CosineFallback => classification.route.to_string().yellow(),
            MatchRoute::Unlabeled => classification.route.to_string().red(),
        };
        writeln!(out, "{}: {}", "Route".white(), route)?;
        writeln!(
            out,
            "{}: {:.4} (threshold {:.2})",
            "Distance".white(),
            classification.distance,
            classifier.config().primary_threshold
        )?;
        if let Some(similarity) = classification.similarity {
            writeln!(
                out,
                "{}: {:.4} (threshold {:.2})",
                "Similarity".white(),
                similarity,
                classifier.config().secondary_threshold
            )?;
        }
        if let Some(text) = classification
            .anchor
            .and_then(|position| classifier.anchors().text(position))
        {
            writeln!(out, "{}: {}", "Anchor".white(), text.dimmed())?;
        }
    }

    writeln!(out, "{}", "-".repeat(40))
}

// ============================================================================
// EVALUATE
// ============================================================================

fn run_evaluate(
    dataset: &Path,
    store: &ArtifactStore,
    thresholds: &ThresholdArgs,
    json: bool,
) -> Result<()> {
    let records = load_dataset(dataset)
        .with_context(|| format!("Failed to read test dataset {}", dataset.display()))?;
    let classifier = open_classifier(store, thresholds)?;
    let report = evaluate(&classifier, &records);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!("{}", "=== Evaluation Results ===".cyan().bold());
    println!();
    println!("{}: {}", "Records".white().bold(), report.total);
    if report.failed > 0 {
        println!("{}: {}", "Failed".red().bold(), report.failed);
    }
    println!("{}: {:.4}", "Topic Accuracy".white().bold(), report.topic_accuracy);
    println!("{}: {:.4}", "Topic Precision".white().bold(), report.topic_precision);
    println!("{}: {:.4}", "Topic Recall".white().bold(), report.topic_recall);
    println!("{}: {:.4}", "Topic F1".white().bold(), report.topic_f1);
    println!("{}: {:.4}", "Subtopic Accuracy".white().bold(), report.subtopic_accuracy);

    println!();
    println!("{}", "=== Decision Routes ===".yellow().bold());
    println!("  {:<16} {}", "nearest".green(), report.routes.nearest);
    println!("  {:<16} {}", "cosine_fallback".yellow(), report.routes.cosine_fallback);
    println!("  {:<16} {}", "unlabeled".red(), report.routes.unlabeled);

    if !report.per_topic.is_empty() {
        println!();
        println!("{}", "=== Per Topic ===".magenta().bold());
        println!(
            "  {:<24} {:>9} {:>9} {:>9} {:>8}",
            "topic", "precision", "recall", "f1", "support"
        );
        for score in &report.per_topic {
            println!(
                "  {:<24} {:>9.4} {:>9.4} {:>9.4} {:>8}",
                score.topic, score.precision, score.recall, score.f1, score.support
            );
        }
    }
}

// ============================================================================
// INSPECT
// ============================================================================

fn run_inspect(store: &ArtifactStore) -> Result<()> {
    let set = store
        .load()
        .with_context(|| format!("Failed to load index from {}", store.dir().display()))?;
    let manifest = set.manifest();

    println!("{}", "=== Dialogic Index ===".cyan().bold());
    println!();
    println!("{}: {}", "Directory".white().bold(), store.dir().display());
    println!("{}: {}", "Model".white().bold(), manifest.model_name);
    println!("{}: {}", "Dimensions".white().bold(), manifest.dimensions);
    println!("{}: {}", "Anchors".white().bold(), manifest.anchor_count);
    println!(
        "{}: {}",
        "Built".white().bold(),
        manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}: {}", "Format Version".white().bold(), manifest.format_version);

    let stats = set.index().stats();
    println!(
        "{}: {} vectors, {}",
        "Index".white().bold(),
        stats.total_vectors,
        format_bytes(stats.memory_bytes)
    );

    println!();
    println!("{}", "=== Topic Distribution ===".yellow().bold());
    let total = set.len().max(1);
    for (topic, count) in set.topic_distribution() {
        let pct = count as f64 / total as f64 * 100.0;
        let bar = "#".repeat(((pct / 5.0).round() as usize).max(1));
        println!("  {:<24} {:>6} {:>5.1}% {}", topic, count, pct, bar.blue());
    }
    Ok(())
}

fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < KIB * KIB {
        format!("{:.1} KiB", bytes / KIB)
    } else {
        format!("{:.1} MiB", bytes / (KIB * KIB))
    }
}
