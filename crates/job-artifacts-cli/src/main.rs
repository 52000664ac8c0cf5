//! Job-Artifacts CLI
//!
//! Prints one tab-separated summary line per CI run:
//!
//! ```text
//! <run id>  <started>  <duration>  <result>
//! ```
//!
//! With `--tests`, the run's JUnit report is fetched as well and its case
//! counts are appended on a second line.

use anyhow::{Context, Result};
use clap::Parser;
use job_artifacts::{cancellation, ArtifactStoreConfig, CancelSignal, Job, JobFetcher};
use tracing::{debug, warn, Level};

#[derive(Parser)]
#[command(name = "job-artifacts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Summarize CI job runs from a log artifact gateway", long_about = None)]
struct Cli {
    /// Job name, as it appears in the gateway path
    job: String,

    /// One or more run ids of that job
    #[arg(required = true)]
    run_ids: Vec<String>,

    /// Also fetch and summarize each run's JUnit report
    #[arg(long)]
    tests: bool,

    /// Test report path relative to the run directory
    #[arg(long, env = "JOB_ARTIFACTS_TEST_REPORT_PATH")]
    report_path: Option<String>,

    /// Gateway base URL
    #[arg(long, env = "JOB_ARTIFACTS_BASE_URL")]
    base_url: Option<String>,

    /// Request started.json and finished.json concurrently
    #[arg(long)]
    concurrent: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    job_artifacts::init_tracing(cli.json, level);

    let mut config = ArtifactStoreConfig::from_env().with_concurrent_metadata(cli.concurrent);
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(path) = &cli.report_path {
        config.test_report_path = path.clone();
    }
    debug!(base_url = %config.base_url, "using gateway");

    let fetcher = JobFetcher::http(config).context("Failed to build HTTP client")?;

    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight requests");
            handle.cancel();
        }
    });

    for run_id in &cli.run_ids {
        let job = fetcher
            .fetch_job(&cli.job, run_id)
            .await
            .with_context(|| format!("Failed to fetch run {run_id} of {}", cli.job))?;
        println!("{job}");

        if cli.tests {
            print_test_counts(&job, &signal).await?;
        }
    }

    Ok(())
}

async fn print_test_counts(job: &Job, signal: &CancelSignal) -> Result<()> {
    let suite = job
        .fetch_test_suite(signal)
        .await
        .with_context(|| format!("Failed to fetch test report for run {}", job.id))?;
    println!(
        "tests={} failures={} skipped={}",
        suite.total(),
        suite.failures(),
        suite.skipped()
    );
    for case in suite.failed_cases() {
        debug!(case = %case.name, message = ?case.failure_message(), "failed case");
    }
    Ok(())
}
