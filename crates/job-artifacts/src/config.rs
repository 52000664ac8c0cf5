//! Artifact gateway configuration
//!
//! Describes where job artifacts live and how they are fetched. Every
//! job run is laid out under `{base_url}/{job}/{run}/`.

use serde::{Deserialize, Serialize};

/// Log gateway used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://gcsweb-ci.svc.ci.openshift.org/gcs/origin-ci-test/logs";

/// JUnit report fetched by [`Job::fetch_test_suite`](crate::Job::fetch_test_suite)
/// when no explicit path is given.
pub const DEFAULT_TEST_REPORT_PATH: &str =
    "artifacts/e2e-openstack-serial/junit/junit_e2e_20191108-114348.xml";

pub const STARTED_DOCUMENT: &str = "started.json";
pub const FINISHED_DOCUMENT: &str = "finished.json";

/// Artifact gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStoreConfig {
    /// Gateway URL that job directories hang off
    pub base_url: String,
    /// Test report location, relative to the run directory
    pub test_report_path: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout; `None` keeps the transport default
    pub timeout_secs: Option<u64>,
    /// Fetch started.json and finished.json concurrently
    pub concurrent_metadata: bool,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        ArtifactStoreConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            test_report_path: DEFAULT_TEST_REPORT_PATH.to_string(),
            user_agent: format!("job-artifacts/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: None,
            concurrent_metadata: false,
        }
    }
}

impl ArtifactStoreConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Reads `JOB_ARTIFACTS_BASE_URL`, `JOB_ARTIFACTS_TEST_REPORT_PATH` and
    /// `JOB_ARTIFACTS_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("JOB_ARTIFACTS_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("JOB_ARTIFACTS_TEST_REPORT_PATH") {
            config.test_report_path = path;
        }
        config.timeout_secs = std::env::var("JOB_ARTIFACTS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok());
        config
    }

    /// Create config for a specific gateway
    pub fn new(base_url: &str) -> Self {
        ArtifactStoreConfig {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_test_report_path(mut self, path: &str) -> Self {
        self.test_report_path = path.to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_concurrent_metadata(mut self, enabled: bool) -> Self {
        self.concurrent_metadata = enabled;
        self
    }

    /// URL of a file inside a run directory.
    pub fn artifact_url(&self, job: &str, run_id: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            job,
            run_id,
            path.trim_start_matches('/')
        )
    }
}
