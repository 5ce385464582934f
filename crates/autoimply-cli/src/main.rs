//! autoimply - tag implication inference CLI
//!
//! Reads a series config and a catalog snapshot, infers the implications each
//! series is missing and either logs the resulting batches (dry run) or files
//! them as change requests.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use autoimply_core::telemetry::level_for;
use autoimply_core::{select_series, RunOptions, Runner, Series, SeriesReport};
use autoimply_state::{ApiConfig, HttpSubmissionSink, RecordingSink, Snapshot, SubmissionSink};

#[derive(Parser, Debug)]
#[command(name = "autoimply")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Infer missing tag implications and batch them for review", long_about = None)]
struct Cli {
    /// Series config file (YAML)
    #[arg(long, env = "AUTOIMPLY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Catalog snapshot: tags, wiki pages and request history (JSON)
    #[arg(long, env = "AUTOIMPLY_SNAPSHOT")]
    snapshot: PathBuf,

    /// Only process the series with this name or alias
    #[arg(short, long)]
    series: Option<String>,

    /// Target number of implication lines per batch
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=100))]
    max_lines_per_batch: u64,

    /// Submit batches for every series, whatever its config says
    #[arg(short, long, conflicts_with = "dry_run")]
    post: bool,

    /// Never submit, whatever the series config says
    #[arg(long)]
    dry_run: bool,

    /// Write the per-series outcome as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Base URL of the catalog API
    #[arg(long, env = "AUTOIMPLY_API_URL", default_value = "https://danbooru.donmai.us")]
    api_url: String,

    #[arg(long, env = "AUTOIMPLY_API_LOGIN")]
    api_login: Option<String>,

    #[arg(long, env = "AUTOIMPLY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl Cli {
    fn autopost_override(&self) -> Option<bool> {
        if self.post {
            Some(true)
        } else if self.dry_run {
            Some(false)
        } else {
            None
        }
    }

    fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new(&self.api_url);
        match (&self.api_login, &self.api_key) {
            (Some(login), Some(key)) => config.with_credentials(login, key),
            _ => config,
        }
    }
}

/// The HTTP sink is only built when something may actually be posted, so a
/// dry run needs no credentials.
fn build_sink(cli: &Cli, series: &[Series]) -> Result<Arc<dyn SubmissionSink>> {
    let may_post = cli
        .autopost_override()
        .unwrap_or_else(|| series.iter().any(|s| s.autopost));
    if !may_post {
        return Ok(Arc::new(RecordingSink::new()));
    }
    let sink = HttpSubmissionSink::new(cli.api_config())
        .context("Failed to configure the submission client")?;
    Ok(Arc::new(sink))
}

async fn run(cli: &Cli) -> Result<Vec<SeriesReport>> {
    let all = Series::load_config(&cli.config)
        .with_context(|| format!("Failed to load series config {}", cli.config.display()))?;
    let series = select_series(all, cli.series.as_deref())?;
    info!(count = series.len(), "series selected");

    let snapshot = Snapshot::load(&cli.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", cli.snapshot.display()))?;
    let (tags, history) = snapshot.into_sources();
    let sink = build_sink(cli, &series)?;

    let runner = Runner::new(Arc::new(tags), Arc::new(history), sink);
    let options = RunOptions {
        max_lines_per_batch: cli.max_lines_per_batch as usize,
        autopost: cli.autopost_override(),
    };
    let reports = runner
        .run_all(&series, &options)
        .await
        .context("Implication run failed")?;
    Ok(reports)
}

fn print_summary(reports: &[SeriesReport], api: &ApiConfig) {
    for report in reports {
        let verb = if report.autopost {
            "submitted"
        } else {
            "would be submitted"
        };
        println!(
            "{}: {} group(s), {} batch(es) {}",
            report.series,
            report.groups,
            report.batches.len(),
            verb
        );
        if report.failed_submissions > 0 {
            println!("  {} submission(s) failed", report.failed_submissions);
        }
        if !report.children_without_wiki.is_empty() {
            println!(
                "  {} tag(s) skipped for lack of a wiki page",
                report.children_without_wiki.len()
            );
        }
        if report.quota_exhausted {
            println!("  topic quota exhausted, remaining batches deferred");
        }
        println!("  topic: {}", api.topic_url(report.topic_id));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    autoimply_core::init_tracing(cli.json, level_for(cli.verbose));

    let reports = run(&cli).await?;
    print_summary(&reports, &cli.api_config());

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    Ok(())
}
