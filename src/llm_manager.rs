use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{info, warn};

use crate::config::LLMConfig;
use crate::providers::GroqProvider;

/// Trait representing an LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send a prompt to the provider and return the response.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Manager that keeps track of the configured providers.
pub struct LLMManager {
    providers: Vec<Box<dyn LLMProvider>>,
}

impl LLMManager {
    /// Create a new manager with the given providers.
    pub fn new(providers: Vec<Box<dyn LLMProvider>>) -> Self {
        Self { providers }
    }

    /// Build the manager from configuration. A missing API key leaves the
    /// manager without providers rather than failing startup.
    pub fn from_config(config: &LLMConfig) -> Self {
        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();
        match GroqProvider::from_config(config) {
            Ok(provider) => {
                info!("Using LLM provider groq with model {}", config.model);
                providers.push(Box::new(provider));
            }
            Err(e) => warn!("LLM disabled: {:#}", e),
        }
        Self::new(providers)
    }

    /// Send a prompt to the first available provider.
    pub async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let provider = self
            .providers
            .first()
            .ok_or_else(|| anyhow!("No LLM provider available (set GROQ_API_KEY)"))?;

        info!("Asking {} ({})", provider.name(), provider.model_name());
        provider.send_prompt(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider that echoes the prompt back.
    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn send_prompt(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {}", prompt))
        }
    }

    #[tokio::test]
    async fn test_no_providers() {
        let manager = LLMManager::from_config(&LLMConfig::default());
        let err = manager.send_prompt("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "No LLM provider available (set GROQ_API_KEY)");
    }

    #[tokio::test]
    async fn test_first_provider_answers() {
        let manager = LLMManager::new(vec![Box::new(EchoProvider)]);
        assert_eq!(manager.send_prompt("hi").await.unwrap(), "echo: hi");
    }
}
