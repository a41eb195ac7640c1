//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::LookupConfig;
use crate::sources::SourceError;

/// Shared HTTP client with a client-side rate limit
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl HttpClient {
    /// Create a client from lookup settings (User-Agent, timeouts, request rate)
    pub fn from_config(config: &LookupConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::InvalidRequest(format!("HTTP client setup: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            limiter: rate_limiter(config.requests_per_second).map(Arc::new),
        })
    }

    /// Send a GET request once the rate limiter allows it.
    ///
    /// Transport failures map to [`SourceError::Timeout`] or
    /// [`SourceError::Network`]; HTTP status handling is left to the caller.
    pub async fn get(&self, url: Url) -> Result<Response, SourceError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        tracing::debug!("GET {}", url);
        self.client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(SourceError::from)
    }
}

/// Limiter allowing `requests_per_second` requests; `None` when unlimited
fn rate_limiter(requests_per_second: f32) -> Option<DefaultDirectRateLimiter> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return None;
    }
    let period = Duration::from_secs_f64(1.0 / f64::from(requests_per_second));
    let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(nonzero!(5u32)));
    Some(RateLimiter::direct(quota))
}
