//! Error types for job-artifacts

use thiserror::Error;

use crate::job::Job;

/// Errors that can occur while fetching a single artifact
#[derive(Error, Debug)]
pub enum FetchError {
    /// The artifact URL could not be composed into a valid request
    #[error("Invalid artifact URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network, DNS, TLS or body read failure
    #[error("Transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The gateway answered with a non-2xx status
    #[error("Gateway returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Metadata document is not the expected JSON shape
    #[error("Metadata decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Test report is not a valid JUnit document
    #[error("Test report decode failed: {0}")]
    DecodeReport(#[from] quick_xml::DeError),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequestBuild,
    Transport,
    Decode,
}

impl FetchError {
    /// Classify this error.
    ///
    /// Non-2xx responses and cancellation are transport-class: they happen
    /// before any body is decoded.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => ErrorKind::RequestBuild,
            FetchError::Transport { .. } | FetchError::Status { .. } | FetchError::Cancelled => {
                ErrorKind::Transport
            }
            FetchError::Decode(_) | FetchError::DecodeReport(_) => ErrorKind::Decode,
        }
    }

    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Which metadata document a job fetch failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStage {
    Started,
    Finished,
}

impl std::fmt::Display for MetadataStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataStage::Started => write!(f, "started.json"),
            MetadataStage::Finished => write!(f, "finished.json"),
        }
    }
}

/// A job fetch that stopped early.
///
/// `job` holds whatever fields were populated before the failing step.
#[derive(Error, Debug)]
#[error("Fetching {stage} for {}/{} failed: {source}", .job.name, .job.id)]
pub struct JobFetchError {
    pub stage: MetadataStage,
    pub job: Box<Job>,
    #[source]
    pub source: FetchError,
}

impl JobFetchError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Discard the error and keep the partially populated job.
    pub fn into_partial(self) -> Job {
        *self.job
    }
}

/// Result type for single-artifact operations
pub type Result<T> = std::result::Result<T, FetchError>;
