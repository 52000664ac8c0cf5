//! Job-Artifacts: CI job metadata and JUnit reports from a log gateway
//!
//! Every CI run publishes its artifacts under
//! `{base}/{job}/{run}/`. This crate reads the two metadata documents
//! (`started.json`, `finished.json`) into a [`Job`], and pulls the run's
//! JUnit report into a [`TestSuite`] on demand.
//!
//! ## Key Components
//!
//! - `JobFetcher`: builds jobs from the gateway
//! - `Job`: one run, with a tab-separated summary via `describe()`
//! - `Transport`: GET seam, real (`HttpTransport`) or fake (`fakes::MemoryTransport`)
//! - `CancelSignal`: aborts an in-flight test report fetch

mod cancel;
mod config;
mod error;
pub mod fakes;
mod job;
pub mod metadata;
mod report;
pub mod telemetry;
mod transport;

pub use cancel::{cancellation, CancelHandle, CancelSignal};
pub use config::{
    ArtifactStoreConfig, DEFAULT_BASE_URL, DEFAULT_TEST_REPORT_PATH, FINISHED_DOCUMENT,
    STARTED_DOCUMENT,
};
pub use error::{ErrorKind, FetchError, JobFetchError, MetadataStage, Result};
pub use job::{format_elapsed, Job, JobFetcher};
pub use metadata::RunMetadata;
pub use report::{CaseOutcome, Failure, Properties, Property, Skipped, TestCase, TestSuite};
pub use telemetry::init_tracing;
pub use transport::{HttpTransport, Transport};
