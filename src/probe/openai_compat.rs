//! OpenAI-compatible chat completions probe
//!
//! Shared by every vendor that exposes the OpenAI wire format: OpenAI itself,
//! Groq, Mistral, DeepSeek and OpenRouter.

use super::{PROBE_PROMPT, ProbeAdapter, send_probe};
use crate::candidates::Secret;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// `POST {base_url}/chat/completions` with a bearer token
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiCompatibleAdapter {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProbeAdapter for OpenAiCompatibleAdapter {
    async fn test_call(
        &self,
        model: &str,
        secret: &Secret,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": PROBE_PROMPT }],
            "max_tokens": 1,
        });

        let request = self
            .client
            .post(&url)
            .bearer_auth(secret.expose())
            .json(&body);

        send_probe(request, timeout).await
    }
}
