use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::time::Duration;

use crate::cache::UsageCache;
use crate::credentials::TokenChain;
use crate::models::UsageSnapshot;
use crate::models::usage::{USAGE_MARKER_FIELD, is_truthy};

pub const USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";
pub const ANTHROPIC_BETA: &str = "oauth-2025-04-20";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how the usage API is reached.
#[derive(Debug, Clone)]
pub struct UsageClient {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for UsageClient {
    fn default() -> Self {
        Self {
            endpoint: USAGE_ENDPOINT.to_string(),
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl UsageClient {
    /// GET the usage document. The whole exchange, connect to last body byte,
    /// is bounded by `timeout`.
    pub fn fetch(&self, token: &str) -> Result<Value> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();

        let mut response = agent
            .get(&self.endpoint)
            .header("Authorization", &format!("Bearer {token}"))
            .header("anthropic-beta", ANTHROPIC_BETA)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("GET {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("usage endpoint answered {status}");
        }

        let doc: Value = response
            .body_mut()
            .read_json()
            .context("decode usage response")?;
        if !is_truthy(doc.get(USAGE_MARKER_FIELD)) {
            bail!("usage response has no {USAGE_MARKER_FIELD}");
        }
        Ok(doc)
    }
}

/// Usage for a session: fresh cache first, then the API when a token exists
/// and fetching is allowed. Every failure collapses to `None`.
pub fn get_usage_snapshot(
    session_id: &str,
    cache: &UsageCache,
    tokens: &TokenChain,
    client: Option<&UsageClient>,
) -> Option<UsageSnapshot> {
    if let Some(snapshot) = cache.load_fresh(session_id) {
        tracing::debug!("usage served from cache");
        return Some(snapshot);
    }

    let client = client?;
    let token = tokens.resolve()?;
    let doc = match client.fetch(&token) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::debug!("usage fetch failed: {err:#}");
            return None;
        }
    };

    if let Err(err) = cache.store(session_id, &doc) {
        tracing::warn!("could not write usage cache: {err:#}");
    }
    UsageSnapshot::from_document(&doc)
}
