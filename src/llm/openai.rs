// src/llm/openai.rs
// OpenAI-compatible chat completions provider. Status codes map onto the
// pipeline's error taxonomy; the only timeout lives in the bootstrap
// probe, never on generation calls.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{LlmError, LlmProvider};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    /// Bounded provider-configuration discovery: list available models.
    /// This is the only place in the system with a network timeout.
    pub async fn probe(&self, timeout: Duration) -> Result<Vec<String>, LlmError> {
        let request = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| LlmError::Network("provider probe timed out".to_string()))?
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let response = map_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }
}

async fn map_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "provider returned non-success status");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth,
        StatusCode::NOT_FOUND => LlmError::ModelUnavailable,
        StatusCode::TOO_MANY_REQUESTS => {
            if body.contains("quota") || body.contains("insufficient_quota") {
                LlmError::Quota
            } else {
                LlmError::RateLimit
            }
        }
        _ => LlmError::Server(format!("{status}: {body}")),
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: usize,
    ) -> Result<String, LlmError> {
        let start = Instant::now();
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let response = map_status(response).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::MalformedResponse("no message content in completion".to_string())
            })?
            .to_string();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as i64,
            bytes = content.len(),
            "completion received"
        );
        Ok(content)
    }
}
