use std::time::Duration;

use quickcal_domain::QuickCalError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

/// HTTP client with built-in retry and timeout support.
///
/// Server errors (5xx), timeouts and connection failures are retried with
/// exponential backoff; client errors are returned to the caller as-is.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, QuickCalError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, QuickCalError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                QuickCalError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder
                .build()
                .map_err(|err| QuickCalError::Network(format!("invalid HTTP request: {err}")))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(QuickCalError::Network(format!("HTTP request failed: {err}")));
                }
            }
        }

        Err(QuickCalError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            max_attempts: 2,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, QuickCalError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| QuickCalError::Network(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}
