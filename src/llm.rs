use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Text-completion service that turns a prompt into a single reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier recorded in the call log.
    fn model(&self) -> &str;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0
        })
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn extract_content(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Generation("No content in LLM response".to_string()))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} byte prompt to {}", prompt.len(), self.model);

        let response = self
            .http
            .post(&format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| GatewayError::Generation(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Generation(format!(
                "LLM API returned {}: {}",
                status,
                body.trim()
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        let content = extract_content(&response_json)?;
        info!("LLM ({}) returned {} chars", self.model, content.len());
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
