use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{extract_text, LlmClient};
use crate::config::AssistantConfig;

/// Client for a JSON endpoint accepting `{"prompt", "max_tokens"}` with bearer auth.
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
}

impl HttpLlmClient {
    pub fn new(config: &AssistantConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn ask(&self, prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(endpoint = %self.endpoint, "Sending assistant prompt");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "max_tokens": self.max_tokens,
            }))
            .send()
            .await
            .context("Request error calling assistant endpoint")?
            .error_for_status()
            .context("Assistant endpoint returned an error status")?;

        let body: Value = response
            .json()
            .await
            .context("JSON parsing error from assistant endpoint")?;

        Ok(extract_text(&body))
    }
}
