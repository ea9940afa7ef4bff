use std::time::{Duration, Instant};

use anyhow::Result;
use log::info;

use crate::calculator;
use crate::config::Config;
use crate::intent::{Intent, IntentClassifier};
use crate::llm_manager::LLMManager;
use crate::services::{CurrencyClient, WeatherClient};

/// Outcome of answering one question.
#[derive(Debug, Clone)]
pub struct Response {
    pub intent: Intent,
    pub content: String,
    pub ok: bool,
    pub elapsed: Duration,
}

impl Response {
    /// Label for the component that produced the answer.
    pub fn source(&self) -> &'static str {
        match self.intent {
            Intent::Math => "🧮 Calculator",
            Intent::Weather => "☁️ Weather API",
            Intent::Currency => "💱 Currency API",
            Intent::General => "💡 LLM",
        }
    }
}

/// Routes each question to the calculator, a service, or the language model.
pub struct Assistant {
    classifier: IntentClassifier,
    weather: WeatherClient,
    currency: CurrencyClient,
    llm_manager: LLMManager,
}

impl Assistant {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_parts(
            WeatherClient::new(&config.weather)?,
            CurrencyClient::new(&config.currency)?,
            LLMManager::from_config(&config.llm),
        ))
    }

    pub fn with_parts(
        weather: WeatherClient,
        currency: CurrencyClient,
        llm_manager: LLMManager,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            weather,
            currency,
            llm_manager,
        }
    }

    pub fn classify(&self, question: &str) -> Intent {
        let intent = self.classifier.classify(question);
        info!("Classified '{}' as {}", question, intent);
        intent
    }

    /// Answer `question` with the handler for `intent`. Handler failures are
    /// reported in the response, never propagated.
    pub async fn respond(&self, intent: Intent, question: &str) -> Response {
        let start = Instant::now();
        let result = match intent {
            Intent::Math => calculator::answer(question).map_err(|e| format!("Math error — {}", e)),
            Intent::Weather => self
                .weather
                .handle_query(question)
                .await
                .map_err(|e| format!("Weather error — {}", e)),
            Intent::Currency => self
                .currency
                .handle_query(question)
                .await
                .map_err(|e| format!("Currency error — {}", e)),
            Intent::General => self
                .llm_manager
                .send_prompt(question)
                .await
                .map_err(|e| format!("LLM error — {:#}", e)),
        };
        let elapsed = start.elapsed();

        let (content, ok) = match result {
            Ok(answer) => (answer, true),
            Err(message) => {
                info!("{}", message);
                (message, false)
            }
        };
        Response {
            intent,
            content,
            ok,
            elapsed,
        }
    }

    /// Classify and answer in one step.
    #[cfg(test)]
    pub async fn handle(&self, question: &str) -> Response {
        let intent = self.classify(question);
        self.respond(intent, question).await
    }
}
