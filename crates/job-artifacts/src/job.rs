//! Job records and the fetchers that populate them.
//!
//! A [`JobFetcher`] owns the transport and gateway config. It turns a job
//! name and run id into a [`Job`] by reading `started.json` and
//! `finished.json`; the job keeps the same transport so its test report
//! can be pulled later on demand.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::cancel::CancelSignal;
use crate::config::{ArtifactStoreConfig, FINISHED_DOCUMENT, STARTED_DOCUMENT};
use crate::error::{FetchError, JobFetchError, MetadataStage, Result};
use crate::metadata::RunMetadata;
use crate::report::TestSuite;
use crate::transport::{HttpTransport, Transport};

/// One run of a CI job.
///
/// Timestamps stay `None` until the matching metadata document has been
/// fetched; `result` stays empty until `finished.json` has been read.
#[derive(Clone)]
pub struct Job {
    pub name: String,
    pub id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: String,

    transport: Arc<dyn Transport>,
    config: Arc<ArtifactStoreConfig>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl Job {
    /// A job with identity only and no metadata.
    pub fn new(
        name: &str,
        id: &str,
        transport: Arc<dyn Transport>,
        config: Arc<ArtifactStoreConfig>,
    ) -> Self {
        Job {
            name: name.to_string(),
            id: id.to_string(),
            started_at: None,
            finished_at: None,
            result: String::new(),
            transport,
            config,
        }
    }

    /// URL of a file inside this run's directory.
    pub fn artifact_url(&self, path: &str) -> String {
        self.config.artifact_url(&self.name, &self.id, path)
    }

    /// Wall-clock run time, once both timestamps are known.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// Fetch and decode the configured JUnit report for this run.
    ///
    /// Needs only `name` and `id`, so it works on a job whose metadata
    /// was never fetched. Every call issues a fresh request.
    pub async fn fetch_test_suite(&self, cancel: &CancelSignal) -> Result<TestSuite> {
        let path = self.config.test_report_path.clone();
        self.fetch_test_suite_at(&path, cancel).await
    }

    /// Like [`fetch_test_suite`](Self::fetch_test_suite) with an explicit
    /// report path relative to the run directory.
    #[instrument(skip(self, cancel), fields(job = %self.name, run = %self.id))]
    pub async fn fetch_test_suite_at(&self, path: &str, cancel: &CancelSignal) -> Result<TestSuite> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let url = self.artifact_url(path);
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%url, "test report fetch cancelled");
                return Err(FetchError::Cancelled);
            }
            body = self.transport.get(&url) => body?,
        };

        let suite = TestSuite::from_slice(&body)?;
        debug!(
            suite = %suite.name,
            cases = suite.total(),
            failures = suite.failures(),
            "decoded test report"
        );
        Ok(suite)
    }

    /// Single tab-separated summary line: id, start, duration, result.
    ///
    /// Missing timestamps render as `-`.
    pub fn describe(&self) -> String {
        let started = self
            .started_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let duration = self
            .duration()
            .map(format_elapsed)
            .unwrap_or_else(|| "-".to_string());
        [self.id.as_str(), &started, &duration, &self.result].join("\t")
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Format a duration the way CI dashboards print elapsed time:
/// `5m0s`, `1h2m3s`, `42s`, `-3s`. Sub-second precision is dropped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

/// Builds [`Job`]s from the artifact gateway.
#[derive(Clone)]
pub struct JobFetcher {
    transport: Arc<dyn Transport>,
    config: Arc<ArtifactStoreConfig>,
}

impl JobFetcher {
    pub fn new(transport: Arc<dyn Transport>, config: ArtifactStoreConfig) -> Self {
        JobFetcher {
            transport,
            config: Arc::new(config),
        }
    }

    /// Fetcher backed by a real HTTP client built from `config`.
    pub fn http(config: ArtifactStoreConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &ArtifactStoreConfig {
        &self.config
    }

    /// A job with identity only; no request is issued.
    pub fn job(&self, name: &str, run_id: &str) -> Job {
        Job::new(name, run_id, self.transport.clone(), self.config.clone())
    }

    /// Fetch start and finish metadata for one run.
    ///
    /// Sequential unless `concurrent_metadata` is set: `finished.json` is
    /// not requested when `started.json` fails. Either way the first
    /// failure aborts the fetch and the error carries the partial job.
    #[instrument(skip(self), fields(concurrent = self.config.concurrent_metadata))]
    pub async fn fetch_job(
        &self,
        name: &str,
        run_id: &str,
    ) -> std::result::Result<Job, JobFetchError> {
        let job = self.job(name, run_id);
        let job = if self.config.concurrent_metadata {
            self.fetch_concurrent(job).await?
        } else {
            self.fetch_sequential(job).await?
        };
        info!(
            result = %job.result,
            started_at = ?job.started_at,
            finished_at = ?job.finished_at,
            "fetched job metadata"
        );
        Ok(job)
    }

    async fn fetch_sequential(&self, mut job: Job) -> std::result::Result<Job, JobFetchError> {
        match self.fetch_metadata(&job, STARTED_DOCUMENT).await {
            Ok(started) => job.started_at = Some(started.timestamp),
            Err(source) => return Err(partial(job, MetadataStage::Started, source)),
        }

        match self.fetch_metadata(&job, FINISHED_DOCUMENT).await {
            Ok(finished) => apply_finished(&mut job, finished),
            Err(source) => return Err(partial(job, MetadataStage::Finished, source)),
        }

        Ok(job)
    }

    async fn fetch_concurrent(&self, mut job: Job) -> std::result::Result<Job, JobFetchError> {
        let (started, finished) = futures::join!(
            self.fetch_metadata(&job, STARTED_DOCUMENT),
            self.fetch_metadata(&job, FINISHED_DOCUMENT),
        );

        let started = match started {
            Ok(started) => started,
            Err(source) => return Err(partial(job, MetadataStage::Started, source)),
        };
        job.started_at = Some(started.timestamp);

        match finished {
            Ok(finished) => apply_finished(&mut job, finished),
            Err(source) => return Err(partial(job, MetadataStage::Finished, source)),
        }

        Ok(job)
    }

    async fn fetch_metadata(&self, job: &Job, document: &str) -> Result<RunMetadata> {
        let url = job.artifact_url(document);
        debug!(%url, "fetching metadata");
        let body = self.transport.get(&url).await?;
        RunMetadata::from_slice(&body)
    }
}

fn apply_finished(job: &mut Job, finished: RunMetadata) {
    job.finished_at = Some(finished.timestamp);
    job.result = finished.result.unwrap_or_default();
}

fn partial(job: Job, stage: MetadataStage, source: FetchError) -> JobFetchError {
    JobFetchError {
        stage,
        job: Box::new(job),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryTransport;

    fn job_at(start: i64, finish: Option<i64>) -> Job {
        let mut job = Job::new(
            "release-openshift-origin-installer-e2e-openstack-serial-4.3",
            "1234",
            Arc::new(MemoryTransport::new()),
            Arc::new(ArtifactStoreConfig::default()),
        );
        job.started_at = DateTime::from_timestamp(start, 0);
        job.finished_at = finish.and_then(|f| DateTime::from_timestamp(f, 0));
        job.result = "success".to_string();
        job
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::seconds(0)), "0s");
        assert_eq!(format_elapsed(Duration::seconds(42)), "42s");
        assert_eq!(format_elapsed(Duration::minutes(5)), "5m0s");
        assert_eq!(format_elapsed(Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_elapsed(Duration::hours(2)), "2h0m0s");
        assert_eq!(format_elapsed(Duration::seconds(-3)), "-3s");
        assert_eq!(format_elapsed(Duration::milliseconds(1500)), "1s");
    }

    #[test]
    fn test_describe_summary_line() {
        let t0 = 1573213428;
        let job = job_at(t0, Some(t0 + 300));

        assert_eq!(
            job.describe(),
            "1234\t2019-11-08 11:43:48 UTC\t5m0s\tsuccess"
        );
        assert_eq!(job.to_string(), job.describe());
        assert!(!job.describe().contains('\n'));
    }

    #[test]
    fn test_describe_without_finish() {
        let mut job = job_at(1573213428, None);
        job.result.clear();
        assert!(job.duration().is_none());
        assert_eq!(job.describe(), "1234\t2019-11-08 11:43:48 UTC\t-\t");
    }

    #[test]
    fn test_artifact_url_uses_identity() {
        let job = job_at(0, None);
        assert!(job
            .artifact_url("started.json")
            .ends_with("/release-openshift-origin-installer-e2e-openstack-serial-4.3/1234/started.json"));
    }

    #[test]
    fn test_debug_omits_transport() {
        let rendered = format!("{:?}", job_at(0, Some(1)));
        assert!(rendered.contains("1234"));
        assert!(!rendered.contains("MemoryTransport"));
    }
}
