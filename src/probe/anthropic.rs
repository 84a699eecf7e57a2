//! Anthropic Messages API probe

use super::{PROBE_PROMPT, ProbeAdapter, send_probe};
use crate::candidates::Secret;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const API_VERSION: &str = "2023-06-01";

/// `POST {base_url}/messages` authenticated with `x-api-key`
pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProbeAdapter for AnthropicAdapter {
    async fn test_call(
        &self,
        model: &str,
        secret: &Secret,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let url = format!("{}/messages", self.base_url);
        let body = json!({
            "model": model,
            "max_tokens": 1,
            "messages": [{ "role": "user", "content": PROBE_PROMPT }],
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", secret.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body);

        send_probe(request, timeout).await
    }
}
