//! In-memory fakes for the transport seam (testing only)
//!
//! `MemoryTransport` serves canned bodies keyed by URL and counts every
//! request it sees, so tests can assert which artifacts were fetched.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::transport::Transport;

#[derive(Debug, Clone)]
enum Canned {
    Body(Vec<u8>),
    Status(u16),
    Unreachable(String),
}

/// In-memory transport backed by a `HashMap<url, response>`.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    responses: Mutex<HashMap<String, Canned>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with a 200 for `url`.
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url.into(), Canned::Body(body.into()));
        self
    }

    /// Answer `url` with a bare status code.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.insert(url.into(), Canned::Status(status));
        self
    }

    /// Fail `url` as if the connection could not be made.
    pub fn with_unreachable(self, url: impl Into<String>, reason: &str) -> Self {
        self.insert(url.into(), Canned::Unreachable(reason.to_string()));
        self
    }

    fn insert(&self, url: String, canned: Canned) {
        self.responses.lock().unwrap().insert(url, canned);
    }

    /// Number of requests issued for `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Total number of requests issued.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requested URLs in order.
    pub fn requested(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        let canned = self.responses.lock().unwrap().get(url).cloned();
        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Canned::Unreachable(reason)) => Err(FetchError::Transport {
                url: url.to_string(),
                reason,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
