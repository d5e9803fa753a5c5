//! SPARQL endpoint access and the shared retrying query client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use graphward_core::config::{EndpointSettings, RetrySettings};

use crate::results::QueryResults;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint {url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Malformed query results: {0}")]
    Decode(String),

    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("Gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// The last underlying failure for retry exhaustion, `self` otherwise.
    pub fn root(&self) -> &StoreError {
        match self {
            Self::RetryExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

// ── Endpoint ─────────────────────────────────────────────────────

/// A single SPARQL 1.1 protocol endpoint. One call, no retries.
#[async_trait]
pub trait SparqlEndpoint: Send + Sync {
    /// Run a SELECT or ASK query.
    async fn query(&self, sparql: &str) -> Result<QueryResults, StoreError>;

    /// Run an update request.
    async fn update(&self, sparql: &str) -> Result<(), StoreError>;
}

/// SPARQL protocol over HTTP.
#[derive(Clone)]
pub struct HttpEndpoint {
    http: reqwest::Client,
    query_url: String,
    update_url: String,
}

impl HttpEndpoint {
    pub fn new(settings: &EndpointSettings) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            query_url: settings.query_url.clone(),
            update_url: settings.update_url().to_string(),
        })
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

#[async_trait]
impl SparqlEndpoint for HttpEndpoint {
    async fn query(&self, sparql: &str) -> Result<QueryResults, StoreError> {
        let response = self
            .http
            .post(&self.query_url)
            .header(CONTENT_TYPE, "application/sparql-query")
            .header(ACCEPT, "application/sparql-results+json")
            .body(sparql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                url: self.query_url.clone(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        QueryResults::parse(&body)
    }

    async fn update(&self, sparql: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .post(&self.update_url)
            .header(CONTENT_TYPE, "application/sparql-update")
            .body(sparql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                url: self.update_url.clone(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

// ── Retry ────────────────────────────────────────────────────────

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero still performs one attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Scale each delay by a uniform factor in [0.75, 1.0].
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    /// No retries: exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay after the given failed attempt (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if self.jitter {
            delay.mul_f64(rand::rng().random_range(0.75..=1.0))
        } else {
            delay
        }
    }
}

/// Shared query client: every call is retried under the configured policy.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct RetryingQueryClient {
    endpoint: Arc<dyn SparqlEndpoint>,
    policy: RetryPolicy,
}

impl RetryingQueryClient {
    pub fn new(endpoint: Arc<dyn SparqlEndpoint>, policy: RetryPolicy) -> Self {
        Self { endpoint, policy }
    }

    /// Connect to an HTTP endpoint with the given settings.
    pub fn http(settings: &EndpointSettings, policy: RetryPolicy) -> Result<Self, StoreError> {
        let endpoint = HttpEndpoint::new(settings)?;
        tracing::info!(url = %endpoint.query_url(), "SPARQL endpoint configured");
        Ok(Self::new(Arc::new(endpoint), policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run a read query.
    pub async fn query(&self, sparql: &str) -> Result<QueryResults, StoreError> {
        self.with_retry("query", || self.endpoint.query(sparql)).await
    }

    /// Run an update request.
    pub async fn update(&self, sparql: &str) -> Result<(), StoreError> {
        self.with_retry("update", || self.endpoint.update(sparql)).await
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    tracing::error!(operation, attempts, error = %e, "Remote call failed, giving up");
                    return Err(StoreError::RetryExhausted {
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
