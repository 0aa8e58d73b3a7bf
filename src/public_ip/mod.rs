//! Public address lookup via an HTTP IP-echo endpoint.
//!
//! Graceful fallback: any timeout, non-success status, or empty body
//! reads as "no answer" and the caller renders unknown. The request can
//! never hold the sampling loop past the client timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::constants::IP_ECHO_TIMEOUT_SECS;

/// Resolves the host's public address. Consumed capability; the engine
/// only sees this seam so tests can answer without a network.
pub trait AddressSource: Send + Sync {
    fn resolve_public<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

impl AddressSource for PublicIpClient {
    fn resolve_public<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.resolve())
    }
}

/// Client for a plain-text IP echo service.
pub struct PublicIpClient {
    url: String,
    client: reqwest::Client,
}

impl PublicIpClient {
    /// Create a new client pointing at the given echo endpoint.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(IP_ECHO_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The caller's public address, or None on any failure.
    pub async fn resolve(&self) -> Option<String> {
        let resp = self.client.get(&self.url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body = resp.text().await.ok()?;
        normalize_body(&body)
    }
}

/// Trimmed non-empty response body, else None.
fn normalize_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
