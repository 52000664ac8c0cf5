//! End-to-end fetch behaviour against an in-memory gateway.
//!
//! Covers metadata assembly, early abort, partial jobs, cancellation and
//! test report decoding through the `Job` API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use job_artifacts::fakes::MemoryTransport;
use job_artifacts::{
    cancellation, ArtifactStoreConfig, CancelSignal, ErrorKind, FetchError, Failure, JobFetcher,
    MetadataStage, TestCase, TestSuite, Transport,
};

const BASE: &str = "http://gateway.test/logs";
const JOB: &str = "release-openshift-origin-installer-e2e-openstack-serial-4.3";
const RUN: &str = "1234";
const T0: i64 = 1573213428;

fn url(path: &str) -> String {
    format!("{BASE}/{JOB}/{RUN}/{path}")
}

fn config() -> ArtifactStoreConfig {
    ArtifactStoreConfig::new(BASE)
}

fn started_body() -> String {
    serde_json::json!({ "timestamp": T0, "node": "ci-op-abc" }).to_string()
}

fn finished_body() -> String {
    serde_json::json!({ "timestamp": T0 + 300, "passed": true, "result": "SUCCESS" }).to_string()
}

fn healthy_gateway() -> MemoryTransport {
    MemoryTransport::new()
        .with_body(url("started.json"), started_body())
        .with_body(url("finished.json"), finished_body())
}

// ===========================================================================
// Metadata fetch
// ===========================================================================

#[tokio::test]
async fn fetch_job_populates_all_fields() {
    let transport = Arc::new(healthy_gateway());
    let fetcher = JobFetcher::new(transport.clone(), config());

    let job = fetcher.fetch_job(JOB, RUN).await.unwrap();

    assert_eq!(job.name, JOB);
    assert_eq!(job.id, RUN);
    assert_eq!(job.started_at, DateTime::from_timestamp(T0, 0));
    assert_eq!(job.finished_at, DateTime::from_timestamp(T0 + 300, 0));
    assert_eq!(job.result, "SUCCESS");
    assert_eq!(
        transport.requested(),
        vec![url("started.json"), url("finished.json")]
    );
}

#[tokio::test]
async fn fetch_job_summary_line() {
    let fetcher = JobFetcher::new(Arc::new(healthy_gateway()), config());
    let job = fetcher.fetch_job(JOB, RUN).await.unwrap();

    assert_eq!(
        job.describe(),
        "1234\t2019-11-08 11:43:48 UTC\t5m0s\tSUCCESS"
    );
}

#[tokio::test]
async fn started_failure_skips_finished_request() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_unreachable(url("started.json"), "connection refused")
            .with_body(url("finished.json"), finished_body()),
    );
    let fetcher = JobFetcher::new(transport.clone(), config());

    let err = fetcher.fetch_job(JOB, RUN).await.unwrap_err();

    assert_eq!(err.stage, MetadataStage::Started);
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.job.started_at.is_none());
    assert_eq!(transport.calls_to(&url("started.json")), 1);
    assert_eq!(transport.calls_to(&url("finished.json")), 0);
}

#[tokio::test]
async fn malformed_started_body_skips_finished_request() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_body(url("started.json"), "<html>gateway error</html>")
            .with_body(url("finished.json"), finished_body()),
    );
    let fetcher = JobFetcher::new(transport.clone(), config());

    let err = fetcher.fetch_job(JOB, RUN).await.unwrap_err();

    assert!(matches!(err.source, FetchError::Decode(_)));
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test]
async fn finished_failure_returns_partial_job() {
    // A run still in progress has no finished.json yet.
    let transport = Arc::new(
        MemoryTransport::new().with_body(url("started.json"), started_body()),
    );
    let fetcher = JobFetcher::new(transport, config());

    let err = fetcher.fetch_job(JOB, RUN).await.unwrap_err();

    assert_eq!(err.stage, MetadataStage::Finished);
    assert!(matches!(err.source, FetchError::Status { status: 404, .. }));
    let job = err.into_partial();
    assert_eq!(job.started_at, DateTime::from_timestamp(T0, 0));
    assert!(job.finished_at.is_none());
    assert!(job.result.is_empty());
}

#[tokio::test]
async fn error_message_names_stage_and_run() {
    let fetcher = JobFetcher::new(Arc::new(MemoryTransport::new()), config());
    let err = fetcher.fetch_job(JOB, RUN).await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("started.json"));
    assert!(msg.contains(&format!("{JOB}/{RUN}")));
}

#[tokio::test]
async fn concurrent_fetch_matches_sequential() {
    let transport = Arc::new(healthy_gateway());
    let fetcher = JobFetcher::new(transport.clone(), config().with_concurrent_metadata(true));

    let job = fetcher.fetch_job(JOB, RUN).await.unwrap();

    assert_eq!(job.started_at, DateTime::from_timestamp(T0, 0));
    assert_eq!(job.finished_at, DateTime::from_timestamp(T0 + 300, 0));
    assert_eq!(job.result, "SUCCESS");
    assert_eq!(transport.total_calls(), 2);
}

#[tokio::test]
async fn concurrent_fetch_still_aborts_on_failure() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_body(url("started.json"), started_body())
            .with_status(url("finished.json"), 500),
    );
    let fetcher = JobFetcher::new(transport, config().with_concurrent_metadata(true));

    let err = fetcher.fetch_job(JOB, RUN).await.unwrap_err();

    assert_eq!(err.stage, MetadataStage::Finished);
    assert!(err.source.is_retryable());
    assert!(err.job.started_at.is_some());
    assert!(err.job.finished_at.is_none());
}

// ===========================================================================
// Test report fetch
// ===========================================================================

fn generated_suite(cases: usize, failing: usize) -> TestSuite {
    let test_cases = (0..cases)
        .map(|i| TestCase {
            name: format!("[sig-generated] case {i}"),
            classname: "Kubernetes e2e suite".to_string(),
            failure: (i < failing).then(|| Failure {
                kind: Some("Failure".to_string()),
                text: Some(format!("case {i} timed out")),
                ..Failure::default()
            }),
            ..TestCase::default()
        })
        .collect();
    TestSuite {
        name: "Kubernetes e2e suite".to_string(),
        tests: cases as u32,
        failures: failing as u32,
        test_cases,
        ..TestSuite::default()
    }
}

#[tokio::test]
async fn fetch_test_suite_reports_cases_and_failures() {
    let xml = generated_suite(12, 5).to_xml().unwrap();
    let transport = Arc::new(
        healthy_gateway().with_body(url(job_artifacts::DEFAULT_TEST_REPORT_PATH), xml),
    );
    let fetcher = JobFetcher::new(transport, config());
    let job = fetcher.fetch_job(JOB, RUN).await.unwrap();

    let suite = job.fetch_test_suite(&CancelSignal::never()).await.unwrap();

    assert_eq!(suite.total(), 12);
    assert_eq!(suite.failures(), 5);
    assert_eq!(suite.passed(), 7);
}

#[tokio::test]
async fn fetch_test_suite_does_not_need_metadata() {
    let xml = generated_suite(3, 0).to_xml().unwrap();
    let transport = Arc::new(
        MemoryTransport::new().with_body(url("artifacts/junit/junit_unit.xml"), xml),
    );
    let fetcher = JobFetcher::new(
        transport.clone(),
        config().with_test_report_path("artifacts/junit/junit_unit.xml"),
    );

    let job = fetcher.job(JOB, RUN);
    let suite = job.fetch_test_suite(&CancelSignal::never()).await.unwrap();

    assert_eq!(suite.total(), 3);
    assert_eq!(suite.failures(), 0);
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test]
async fn fetch_test_suite_refetches_every_call() {
    let xml = generated_suite(1, 0).to_xml().unwrap();
    let report = url("artifacts/junit.xml");
    let transport = Arc::new(MemoryTransport::new().with_body(report.clone(), xml));
    let job = JobFetcher::new(transport.clone(), config()).job(JOB, RUN);

    let never = CancelSignal::never();
    job.fetch_test_suite_at("artifacts/junit.xml", &never).await.unwrap();
    job.fetch_test_suite_at("artifacts/junit.xml", &never).await.unwrap();

    assert_eq!(transport.calls_to(&report), 2);
}

#[tokio::test]
async fn fetch_test_suite_malformed_report_is_decode_error() {
    let transport = Arc::new(
        MemoryTransport::new().with_body(url(job_artifacts::DEFAULT_TEST_REPORT_PATH), "{}"),
    );
    let job = JobFetcher::new(transport, config()).job(JOB, RUN);

    let err = job.fetch_test_suite(&CancelSignal::never()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn already_cancelled_signal_fails_without_request() {
    let transport = Arc::new(healthy_gateway());
    let job = JobFetcher::new(transport.clone(), config()).job(JOB, RUN);
    let (handle, signal) = cancellation();
    handle.cancel();

    let err = job.fetch_test_suite(&signal).await.unwrap_err();

    assert!(matches!(err, FetchError::Cancelled));
    assert_eq!(transport.total_calls(), 0);
}

/// Transport whose requests never complete.
struct HangingTransport;

#[async_trait]
impl Transport for HangingTransport {
    async fn get(&self, _url: &str) -> job_artifacts::Result<Vec<u8>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancel_aborts_in_flight_request() {
    let job = JobFetcher::new(Arc::new(HangingTransport), config()).job(JOB, RUN);
    let (handle, signal) = cancellation();

    let fetch = tokio::spawn(async move { job.fetch_test_suite(&signal).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(2), fetch)
        .await
        .expect("cancelled fetch did not return promptly")
        .unwrap();
    assert!(matches!(outcome, Err(FetchError::Cancelled)));
}
