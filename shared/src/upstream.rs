//! Outbound client for the salon booking API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, UpstreamCredentials};
use crate::endpoints::Candidate;
use crate::error::{AttemptFailure, UpstreamFailure};
use crate::{Error, Result};

/// A source of upstream JSON documents.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET one URL. Non-2xx, network and decode failures are all attempt failures.
    async fn get_json(&self, url: &str) -> std::result::Result<Value, AttemptFailure>;
}

/// Build the shared HTTP client with the configured timeout.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Basic-authenticated reqwest client.
#[derive(Clone)]
pub struct HttpUpstream {
    http_client: reqwest::Client,
    authorization: String,
}

impl HttpUpstream {
    pub fn new(http_client: reqwest::Client, credentials: &UpstreamCredentials) -> Self {
        Self {
            http_client,
            authorization: credentials.authorization(),
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, url: &str) -> std::result::Result<Value, AttemptFailure> {
        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| network_failure(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptFailure::http(url, status.as_u16(), &body));
        }

        let body = response.text().await.map_err(|e| network_failure(url, &e))?;
        serde_json::from_str(&body).map_err(|e| AttemptFailure::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn network_failure(url: &str, err: &reqwest::Error) -> AttemptFailure {
    let code = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_redirect() {
        "redirect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };

    AttemptFailure::Network {
        url: url.to_string(),
        message: err.to_string(),
        code: code.to_string(),
    }
}

/// Payload of one successful candidate.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub label: &'static str,
    pub url: String,
    /// Body exactly as returned
    pub body: Value,
    /// Records unwrapped from the candidate's envelope
    pub records: Vec<Value>,
}

/// Run a single candidate and unwrap its envelope.
pub async fn attempt<U: Upstream + ?Sized>(
    upstream: &U,
    candidate: &Candidate,
) -> std::result::Result<Fetched, AttemptFailure> {
    match upstream.get_json(&candidate.url).await {
        Ok(body) => {
            let records = candidate.envelope.extract(&body);
            info!(
                candidate = candidate.label,
                url = %candidate.url,
                envelope = candidate.envelope.name,
                count = records.len(),
                "Upstream candidate succeeded"
            );
            Ok(Fetched {
                label: candidate.label,
                url: candidate.url.clone(),
                body,
                records,
            })
        }
        Err(failure) => {
            warn!(
                candidate = candidate.label,
                url = %candidate.url,
                status = ?failure.status(),
                "Upstream candidate failed"
            );
            Err(failure)
        }
    }
}

/// Try candidates strictly in order and return the first success.
pub async fn fetch_first<U: Upstream + ?Sized>(
    upstream: &U,
    step: &'static str,
    candidates: &[Candidate],
) -> std::result::Result<Fetched, UpstreamFailure> {
    let mut attempts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match attempt(upstream, candidate).await {
            Ok(fetched) => return Ok(fetched),
            Err(failure) => attempts.push(failure),
        }
    }
    Err(UpstreamFailure::new(step, attempts))
}
