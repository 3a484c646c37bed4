//! Blocking HTTP transport shared by the Weaviate, OpenAI and dataset clients.
//!
//! Every call goes through [`HttpTransport::execute`], which applies the
//! agent-wide timeout and retries transient failures with exponential backoff.
//! Error statuses keep their response body so callers can tell apart
//! failures that share a status code.


use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};
use ureq::Body;
use ureq::http::Response;

use crate::{RagError, Result};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[inline]
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    #[inline]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    retry: RetryPolicy,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    #[inline]
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            retry,
            headers: Vec::new(),
        }
    }

    /// Add a header sent with every request, e.g. an authorization token.
    #[inline]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    #[inline]
    pub fn get(&self, url: &str) -> Result<String> {
        self.execute(url, || {
            let mut request = self.agent.get(url);
            for (name, value) in &self.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            request.call()
        })
    }

    #[inline]
    pub fn delete(&self, url: &str) -> Result<String> {
        self.execute(url, || {
            let mut request = self.agent.delete(url);
            for (name, value) in &self.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            request.call()
        })
    }

    #[inline]
    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String> {
        let payload = serde_json::to_string(body)
            .map_err(|e| RagError::Other(anyhow::anyhow!("Failed to serialize request: {}", e)))?;

        self.execute(url, || {
            let mut request = self
                .agent
                .post(url)
                .header("Content-Type", "application/json");
            for (name, value) in &self.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            request.send(payload.as_str())
        })
    }

    fn execute<F>(&self, url: &str, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<Response<Body>, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry.attempts {
            debug!("HTTP request attempt {}/{} to {}", attempt, self.retry.attempts, url);

            let outcome = request_fn().and_then(|mut resp| {
                let status = resp.status().as_u16();
                resp.body_mut().read_to_string().map(|body| (status, body))
            });

            match outcome {
                Ok((status, body)) if status < 400 => return Ok(body),
                other => {
                    let mapped = match other {
                        Ok((status, body)) => RagError::HttpStatus {
                            status,
                            url: url.to_string(),
                            body,
                        },
                        Err(err) => map_transport_error(err, url),
                    };
                    if !mapped.is_retryable() {
                        warn!("Non-retryable error from {}: {}", url, mapped);
                        return Err(mapped);
                    }

                    warn!(
                        "Transient error from {}: {}, attempt {}/{}",
                        url, mapped, attempt, self.retry.attempts
                    );
                    last_error = Some(mapped);

                    if attempt < self.retry.attempts {
                        let delay = self.retry.delay_after(attempt);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", url);
        Err(last_error
            .unwrap_or_else(|| RagError::ConnectionUnavailable(format!("{url}: no attempt made"))))
    }
}

/// Classify a ureq failure into the crate's error taxonomy.
pub(crate) fn map_transport_error(err: ureq::Error, url: &str) -> RagError {
    match err {
        ureq::Error::StatusCode(status) => RagError::HttpStatus {
            status,
            url: url.to_string(),
            body: String::new(),
        },
        ureq::Error::Timeout(_) => RagError::Timeout(url.to_string()),
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            RagError::ConnectionUnavailable(url.to_string())
        }
        ureq::Error::Io(e) => RagError::ConnectionUnavailable(format!("{url}: {e}")),
        other => RagError::Other(anyhow::anyhow!("Request to {} failed: {}", url, other)),
    }
}
