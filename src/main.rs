use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use topicsense::application::matrix_builder::Metric;
use topicsense::application::pipeline::TopicSentimentPipeline;
use topicsense::application::daily_summary::summarize_by_day;
use topicsense::application::ranking::RankingReporter;
use topicsense::application::ticker_summary::summarize_by_ticker;
use topicsense::config::Config;
use topicsense::domain::sentiment::SentimentNormalizer;
use topicsense::infrastructure::csv_source::{CsvPostSource, label_records};
use topicsense::infrastructure::export::CsvExporter;
use topicsense::infrastructure::greedy_clusterer::GreedyThresholdClusterer;
use topicsense::infrastructure::keyword_classifier::KeywordSentimentClassifier;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file overlaying the environment configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Topic-level sentiment tables and cross-ticker matrices
    Topics {
        /// Labeled posts CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "topic_outputs")]
        output: PathBuf,

        /// Succeed even when no ticker produced a topic
        #[arg(long)]
        allow_empty: bool,
    },
    /// Positive/negative share and score per ticker
    Summary {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "summary_outputs")]
        output: PathBuf,

        /// Rows to log from each end of the ranking
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Append a keyword-based sentiment_binary column
    Classify {
        #[arg(short, long)]
        input: PathBuf,

        /// Labeled CSV to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Topics {
            input,
            output,
            allow_empty,
        } => run_topics(&config, &input, &output, allow_empty),
        Commands::Summary {
            input,
            output,
            limit,
        } => run_summary(&config, &input, &output, limit.unwrap_or(config.pipeline.rank_limit)),
        Commands::Classify { input, output } => run_classify(&config, &input, &output),
    }
}

fn run_topics(config: &Config, input: &Path, output: &Path, allow_empty: bool) -> Result<()> {
    let documents = CsvPostSource::new(input, config.ingest.to_column_spec()).load()?;

    let pipeline = TopicSentimentPipeline::with_labels(
        Arc::new(config.to_embedder()),
        Arc::new(GreedyThresholdClusterer::new(config.cluster.to_cluster_params())),
        config.to_pipeline_settings(),
        config.to_label_generator(),
    );
    let outcome = pipeline.run(&documents)?;

    // Skip notices were already logged as they were produced
    if outcome.is_empty() {
        if allow_empty {
            warn!("No ticker produced a topic, writing empty outputs");
        } else {
            bail!(
                "No ticker produced a topic ({} skipped); pass --allow-empty to write empty outputs",
                outcome.skipped.len()
            );
        }
    }

    let exporter = CsvExporter::new(output)?;
    exporter.export_all(&outcome, config.pipeline.rank_limit)?;

    let matrix = outcome.matrix(Metric::MeanSentiment);
    let (rows, columns) = matrix.dimensions();
    info!(
        "Done - tickers={}, topics={}, matrix={}x{}",
        outcome.analyzed_entities.len(),
        outcome.stats.len(),
        rows,
        columns
    );
    Ok(())
}

fn run_summary(config: &Config, input: &Path, output: &Path, limit: usize) -> Result<()> {
    let documents = CsvPostSource::new(input, config.ingest.to_column_spec()).load()?;
    let corpus = SentimentNormalizer::normalize_documents(&documents)?;
    if corpus.dropped_missing > 0 {
        info!("Dropped {} posts without sentiment", corpus.dropped_missing);
    }

    let summary = summarize_by_ticker(&corpus.documents);
    let ranked = RankingReporter::extract(&summary, limit, |row| row.sentiment_score);
    for row in &ranked.top {
        info!(
            "TOP    {} - n={}, pos={}%, score={}",
            row.ticker, row.total, row.positive_pct, row.sentiment_score
        );
    }
    for row in &ranked.bottom {
        info!(
            "BOTTOM {} - n={}, neg={}%, score={}",
            row.ticker, row.total, row.negative_pct, row.sentiment_score
        );
    }

    let exporter = CsvExporter::new(output)?;
    let path = exporter.write_ticker_summary(&summary)?;
    info!("Wrote {} tickers to {}", summary.len(), path.display());

    let days = summarize_by_day(&corpus.documents);
    if !days.is_empty() {
        let path = exporter.write_daily_summary(&days)?;
        info!("Wrote {} days to {}", days.len(), path.display());
    }
    Ok(())
}

fn run_classify(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let reader = File::open(input)
        .with_context(|| format!("Failed to open input CSV {}", input.display()))?;
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let classifier = KeywordSentimentClassifier::new();
    let labeled = label_records(reader, writer, &config.ingest.text_column, &classifier)?;
    info!("Labeled {} posts into {}", labeled, output.display());
    Ok(())
}
