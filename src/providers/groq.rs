use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use log::{debug, warn};

use crate::config::LLMConfig;
use crate::llm_manager::LLMProvider;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: String,
    #[serde(rename = "type")]
    #[serde(default)]
    error_type: Option<String>,
}

/// Groq (OpenAI-compatible chat completions) provider
pub struct GroqProvider {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl GroqProvider {
    /// Create a provider from configuration; fails when no API key is set
    pub fn from_config(config: &LLMConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("GROQ_API_KEY environment variable not set")?;
        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: Client::new(),
        })
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Pull the answer text out of a chat completions response body
fn parse_completion(body: &str, max_tokens: u32) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).context("Failed to parse Groq API response")?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No choices in Groq response"))?;

    if choice.finish_reason.as_deref() == Some("length") {
        warn!(
            "Groq response was truncated due to max_tokens limit ({}). Response may be incomplete.",
            max_tokens
        );
    }

    Ok(choice.message.content.trim().to_string())
}

#[async_trait]
impl LLMProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Groq")?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("Raw Groq response: {}", response_text);

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ApiError>(&response_text) {
                return Err(anyhow!(
                    "Groq API error: {} (type: {:?})",
                    error_response.error.message,
                    error_response.error.error_type
                ));
            }
            return Err(anyhow!("Groq API error (status {}): {}", status, response_text));
        }

        parse_completion(&response_text, self.max_tokens)
    }
}
