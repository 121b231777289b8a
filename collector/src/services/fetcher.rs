use crate::error::{Result, StatsError, TransportError};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Raw outcome of a single GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> TransportResult<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &Url, timeout: Duration) -> TransportResult<HttpResponse> {
        (**self).get(url, timeout).await
    }
}

pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        ReqwestTransport {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> TransportResult<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct RetryingFetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryingFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        RetryingFetcher { transport, policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` and decode the body as JSON, retrying with exponential backoff.
    ///
    /// A `2xx` body is returned as-is, even when it carries an API `error`
    /// object; interpreting the payload is up to the caller. A `4xx` that
    /// carries an API error (bad key, exhausted quota) is `StatsError::Api`
    /// straight away: asking again cannot change the answer.
    pub async fn fetch(&self, url: &Url) -> Result<Value> {
        let endpoint = endpoint_label(url);
        let attempts = self.policy.max_retries.max(1);
        let mut delay = self.policy.initial_delay;
        let mut last_error = TransportError::Network("no attempt made".to_string());

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(json) => {
                    if attempt > 1 {
                        info!("Fetched {endpoint} on attempt {attempt}/{attempts}");
                    }
                    return Ok(json);
                }
                Err(Failure::Rejected { status, message }) => {
                    warn!("{endpoint} rejected the request with {status}: {message}");
                    return Err(StatsError::Api { message });
                }
                Err(Failure::Retry(e)) => {
                    warn!("Attempt {attempt}/{attempts} for {endpoint} failed: {e}");
                    last_error = e;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(StatsError::Fetch {
            endpoint,
            attempts,
            source: last_error,
        })
    }

    async fn attempt(&self, url: &Url) -> std::result::Result<Value, Failure> {
        let response = self
            .transport
            .get(url, self.policy.timeout)
            .await
            .map_err(Failure::Retry)?;

        if !(200..300).contains(&response.status) {
            let api_message = api_error_message(&response.body);
            return Err(match api_message {
                Some(message) if is_rejection(response.status) => Failure::Rejected {
                    status: response.status,
                    message,
                },
                message => Failure::Retry(TransportError::Status {
                    status: response.status,
                    message: message
                        .unwrap_or_else(|| response.body.chars().take(200).collect()),
                }),
            });
        }

        serde_json::from_str(&response.body)
            .map_err(|e| Failure::Retry(TransportError::Decode(e.to_string())))
    }
}

enum Failure {
    Retry(TransportError),
    Rejected { status: u16, message: String },
}

/// Client errors other than request timeout and rate limiting.
fn is_rejection(status: u16) -> bool {
    (400..500).contains(&status) && status != 408 && status != 429
}

/// Host and path only; the query holds the API key.
fn endpoint_label(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

/// `error.message` of a YouTube error body.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(String::from))
}
