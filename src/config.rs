use std::env;
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use log::{info, warn};

/// Main configuration structure for quick_assist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language model settings
    pub llm: LLMConfig,

    /// Status messages and display settings
    pub ui: UIConfig,

    /// Weather service settings
    pub weather: WeatherConfig,

    /// Currency service settings
    pub currency: CurrencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature setting
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens in a completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key, only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    #[serde(default = "default_math_message")]
    pub math_message: String,

    #[serde(default = "default_llm_message")]
    pub llm_message: String,

    #[serde(default = "default_weather_message")]
    pub weather_message: String,

    #[serde(default = "default_currency_message")]
    pub currency_message: String,

    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Informational provider label
    #[serde(default = "default_weather_provider")]
    pub provider: String,

    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    #[serde(default = "default_currency_timeout")]
    pub timeout_seconds: u64,
}

// Default value functions
fn default_model() -> String { "compound-beta-mini".to_string() }
fn default_max_tokens() -> u32 { 512 }
fn default_api_base() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_math_message() -> String { "Math expression detected, using calculator...".to_string() }
fn default_llm_message() -> String { "Fetching information via LLM...".to_string() }
fn default_weather_message() -> String { "Fetching weather via API...".to_string() }
fn default_currency_message() -> String { "Converting currency via API...".to_string() }
fn default_colorful() -> bool { true }
fn default_weather_provider() -> String { "open-meteo".to_string() }
fn default_geocoding_url() -> String { "https://nominatim.openstreetmap.org/search".to_string() }
fn default_forecast_url() -> String { "https://api.open-meteo.com/v1/forecast".to_string() }
fn default_weather_timeout() -> u64 { 30 }
fn default_currency_timeout() -> u64 { 10 }

impl Default for LLMConfig {
    fn default() -> Self {
        LLMConfig {
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            api_base: default_api_base(),
            api_key: None,
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            math_message: default_math_message(),
            llm_message: default_llm_message(),
            weather_message: default_weather_message(),
            currency_message: default_currency_message(),
            colorful: default_colorful(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            provider: default_weather_provider(),
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            timeout_seconds: default_currency_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Parse configuration text; missing sections and fields keep their defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        // Try loading from default locations
        let default_paths = vec![
            "quick_assist.toml",
            ".quick_assist.toml",
            "~/.config/quick_assist/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => {
                        info!("Loaded configuration from {}", path);
                        return Ok(config);
                    }
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Apply environment overrides (environment takes precedence over the file)
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.llm.api_key = lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty());

        if let Some(base) = lookup("GROQ_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            self.llm.model = model;
        }
        if let Some(raw) = lookup("LLM_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(temperature) => self.llm.temperature = temperature,
                Err(_) => warn!("Ignoring invalid LLM_TEMPERATURE value: {}", raw),
            }
        }
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, plain: bool) {
        if plain {
            self.ui.colorful = false;
        }
    }
}
