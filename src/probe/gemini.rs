//! Google Gemini `generateContent` probe

use super::{PROBE_PROMPT, ProbeAdapter, send_probe};
use crate::candidates::Secret;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// `POST {base_url}/models/{model}:generateContent` authenticated with `x-goog-api-key`
///
/// The key travels in a header rather than the `?key=` query parameter so it
/// never shows up in URLs that reqwest includes in error messages.
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, model: &str) -> String {
        // Gemini model listings return "models/<name>"; accept both forms
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ProbeAdapter for GeminiAdapter {
    async fn test_call(
        &self,
        model: &str,
        secret: &Secret,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": PROBE_PROMPT }] }],
            "generationConfig": { "maxOutputTokens": 1 },
        });

        let request = self
            .client
            .post(self.url_for(model))
            .header("x-goog-api-key", secret.expose())
            .json(&body);

        send_probe(request, timeout).await
    }
}
