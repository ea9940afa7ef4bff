use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use anyhow::Context;
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CurrencyConfig;

lazy_static! {
    /// Phrasings that mark a question as a currency conversion (matched on lowercase text).
    static ref QUERY_PATTERNS: Vec<Regex> = [
        r"convert\s+\d+",
        r"\d+\s+[a-z]{3}\s+(?:to|in)\s+[a-z]{3}",
        r"how\s+much\s+is\s+\d+",
        r"quanto\s+(?:é|vale)\s+\d+",
        r"converter\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Patterns capturing amount, source and target currency, tried in order.
    static ref CONVERSION_PATTERNS: Vec<Regex> = [
        r"(?i)(?:convert\s+)?(\d+(?:\.\d+)?)\s+([A-Za-z]{3})\s+(?:to|in)\s+([A-Za-z]{3})",
        r"(?i)how\s+much\s+is\s+(\d+(?:\.\d+)?)\s+([A-Za-z]{3})\s+in\s+([A-Za-z]{3})",
        r"(?i)quanto\s+(?:é|vale)\s+(\d+(?:\.\d+)?)\s+([A-Za-z]{3})\s+em\s+([A-Za-z]{3})",
        r"(?i)converter\s+(\d+(?:\.\d+)?)\s+([A-Za-z]{3})\s+para\s+([A-Za-z]{3})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Approximate USD-relative rates used when every online source fails.
    static ref OFFLINE_USD_RATES: HashMap<String, f64> = [
        ("USD", 1.0),
        ("EUR", 0.85),
        ("GBP", 0.73),
        ("JPY", 110.0),
        ("BRL", 5.0),
        ("CAD", 1.25),
        ("AUD", 1.35),
        ("CHF", 0.92),
        ("CNY", 6.4),
        ("INR", 74.0),
    ]
    .iter()
    .map(|(code, rate)| (code.to_string(), *rate))
    .collect();
}

#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error(
        "Could not parse currency query. Try formats like: 'convert 100 USD to BRL' or '100 USD to EUR'"
    )]
    Unparseable,

    #[error("Currency {0} not supported")]
    UnsupportedCurrency(String),

    #[error("Currency pair {0}/{1} not supported in fallback rates")]
    UnsupportedPair(String, String),

    #[error("{0} limit reached")]
    LimitReached(&'static str),

    #[error("{source_name} request failed: {message}")]
    Request {
        source_name: &'static str,
        message: String,
    },

    #[error("All currency conversion methods failed. Last error: {last_error}")]
    AllSourcesFailed { last_error: String },
}

/// Amount and currency pair parsed from a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

/// A rate quoted by one of the sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub rate: f64,
    /// Set for the built-in approximate table.
    pub offline: bool,
}

/// One source of exchange rates in the fallback chain.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rate for converting one unit of `from` into `to`.
    async fn rate(&self, from: &str, to: &str) -> Result<Quote, CurrencyError>;
}

fn request_error(source_name: &'static str) -> impl Fn(reqwest::Error) -> CurrencyError {
    move |e| CurrencyError::Request {
        source_name,
        message: e.to_string(),
    }
}

async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    source_name: &'static str,
) -> Result<T, CurrencyError> {
    debug!("{}: GET {}", source_name, url);
    client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(request_error(source_name))?
        .json::<T>()
        .await
        .map_err(request_error(source_name))
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// exchangerate-api.com, free tier.
pub struct ExchangeRateApi {
    client: Client,
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    fn name(&self) -> &'static str {
        "exchangerate-api"
    }

    async fn rate(&self, from: &str, to: &str) -> Result<Quote, CurrencyError> {
        let url = format!("https://api.exchangerate-api.com/v4/latest/{}", from);
        let data: RatesResponse = fetch_json(&self.client, &url, self.name()).await?;
        let rate = data
            .rates
            .get(to)
            .copied()
            .ok_or_else(|| CurrencyError::UnsupportedCurrency(to.to_string()))?;
        Ok(Quote { rate, offline: false })
    }
}

/// fixer.io, free tier; only EUR is available as a base.
pub struct Fixer {
    client: Client,
}

#[async_trait]
impl RateSource for Fixer {
    fn name(&self) -> &'static str {
        "fixer"
    }

    async fn rate(&self, from: &str, to: &str) -> Result<Quote, CurrencyError> {
        let url = if from == "EUR" {
            format!("https://api.fixer.io/latest?base=EUR&symbols={}", to)
        } else {
            "https://api.fixer.io/latest?base=EUR".to_string()
        };
        let data: RatesResponse = fetch_json(&self.client, &url, self.name()).await?;
        if data.success == Some(false) {
            return Err(CurrencyError::LimitReached("Fixer API"));
        }
        let rate = cross_rate(&data.rates, "EUR", from, to).ok_or_else(|| {
            CurrencyError::UnsupportedCurrency(format!("{}/{} on Fixer free tier", from, to))
        })?;
        Ok(Quote { rate, offline: false })
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyApiResponse {
    #[serde(default)]
    data: HashMap<String, CurrencyApiValue>,
}

#[derive(Debug, Deserialize)]
struct CurrencyApiValue {
    value: f64,
}

/// currencyapi.com, free tier.
pub struct CurrencyApi {
    client: Client,
}

#[async_trait]
impl RateSource for CurrencyApi {
    fn name(&self) -> &'static str {
        "currencyapi"
    }

    async fn rate(&self, from: &str, to: &str) -> Result<Quote, CurrencyError> {
        let url = format!(
            "https://api.currencyapi.com/v3/latest?base_currency={}&currencies={}",
            from, to
        );
        let data: CurrencyApiResponse = fetch_json(&self.client, &url, self.name()).await?;
        let rate = data
            .data
            .get(to)
            .map(|v| v.value)
            .ok_or(CurrencyError::LimitReached("CurrencyAPI free tier"))?;
        Ok(Quote { rate, offline: false })
    }
}

/// Built-in approximate rates, the last resort.
pub struct OfflineRates;

#[async_trait]
impl RateSource for OfflineRates {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn rate(&self, from: &str, to: &str) -> Result<Quote, CurrencyError> {
        let rate = cross_rate(&OFFLINE_USD_RATES, "USD", from, to)
            .ok_or_else(|| CurrencyError::UnsupportedPair(from.to_string(), to.to_string()))?;
        Ok(Quote { rate, offline: true })
    }
}

/// Rate from `from` to `to` given rates quoted against `base`.
fn cross_rate(rates: &HashMap<String, f64>, base: &str, from: &str, to: &str) -> Option<f64> {
    let quoted = |code: &str| {
        if code == base {
            Some(1.0)
        } else {
            rates.get(code).copied()
        }
    };
    let from_rate = quoted(from)?;
    let to_rate = quoted(to)?;
    if from_rate == 0.0 {
        return None;
    }
    Some(to_rate / from_rate)
}

/// Check whether the question asks for a currency conversion.
pub fn is_currency_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUERY_PATTERNS.iter().any(|pattern| pattern.is_match(&lower))
}

/// Parse amount and currency pair from the question.
pub fn extract_conversion_data(text: &str) -> Option<Conversion> {
    CONVERSION_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(text)?;
        let amount = captures[1].parse::<f64>().ok()?;
        Some(Conversion {
            amount,
            from: captures[2].to_uppercase(),
            to: captures[3].to_uppercase(),
        })
    })
}

/// Currency conversion with an ordered chain of rate sources.
pub struct CurrencyClient {
    sources: Vec<Box<dyn RateSource>>,
}

impl CurrencyClient {
    pub fn new(config: &CurrencyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build currency HTTP client")?;
        Ok(Self::with_sources(vec![
            Box::new(ExchangeRateApi { client: client.clone() }),
            Box::new(Fixer { client: client.clone() }),
            Box::new(CurrencyApi { client }),
            Box::new(OfflineRates),
        ]))
    }

    pub fn with_sources(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Convert `amount`, trying each source in order until one answers.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<String, CurrencyError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        if from == to {
            return Ok(format!(
                "{} {} = {} {} (Same currency)",
                amount, from, amount, to
            ));
        }

        let mut last_error = String::from("no rate sources configured");
        for source in &self.sources {
            match source.rate(&from, &to).await {
                Ok(quote) => {
                    info!("Rate {}/{} from {}: {}", from, to, source.name(), quote.rate);
                    return Ok(format_conversion(amount, &from, &to, quote));
                }
                Err(e) => {
                    debug!("Rate source {} failed: {}", source.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        Err(CurrencyError::AllSourcesFailed { last_error })
    }

    pub async fn handle_query(&self, text: &str) -> Result<String, CurrencyError> {
        let conversion = extract_conversion_data(text).ok_or(CurrencyError::Unparseable)?;
        self.convert(conversion.amount, &conversion.from, &conversion.to)
            .await
    }
}

fn format_conversion(amount: f64, from: &str, to: &str, quote: Quote) -> String {
    let result = amount * quote.rate;
    if quote.offline {
        format!(
            "{} {} = {:.2} {} (Approx. rate: {:.6}) [OFFLINE]",
            amount, from, result, to, quote.rate
        )
    } else {
        format!(
            "{} {} = {:.2} {} (Rate: {:.6})",
            amount, from, result, to, quote.rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRate(f64);

    #[async_trait]
    impl RateSource for FixedRate {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn rate(&self, _from: &str, _to: &str) -> Result<Quote, CurrencyError> {
            Ok(Quote { rate: self.0, offline: false })
        }
    }

    struct Failing(Arc<AtomicUsize>);

    #[async_trait]
    impl RateSource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn rate(&self, _from: &str, _to: &str) -> Result<Quote, CurrencyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CurrencyError::LimitReached("Test API"))
        }
    }

    fn offline_client() -> CurrencyClient {
        CurrencyClient::with_sources(vec![Box::new(OfflineRates)])
    }

    #[test]
    fn test_new_client_source_order() {
        let client = CurrencyClient::new(&CurrencyConfig::default()).unwrap();
        let names: Vec<&str> = client.sources.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(names.last(), Some(&"offline"));
    }

    #[test]
    fn test_is_currency_query() {
        assert!(is_currency_query("Convert 100 USD to BRL"));
        assert!(is_currency_query("50 eur in usd"));
        assert!(is_currency_query("How much is 20 GBP in JPY?"));
        assert!(is_currency_query("quanto é 10 USD em BRL"));
        assert!(is_currency_query("converter 10 USD para BRL"));
        assert!(!is_currency_query("Who was Albert Einstein?"));
        assert!(!is_currency_query("convert dollars"));
    }

    #[test]
    fn test_extract_conversion_data() {
        assert_eq!(
            extract_conversion_data("convert 100 usd to brl"),
            Some(Conversion {
                amount: 100.0,
                from: "USD".to_string(),
                to: "BRL".to_string()
            })
        );
        assert_eq!(
            extract_conversion_data("How much is 12.5 EUR in GBP?"),
            Some(Conversion {
                amount: 12.5,
                from: "EUR".to_string(),
                to: "GBP".to_string()
            })
        );
        assert_eq!(
            extract_conversion_data("Quanto vale 3 USD em BRL"),
            Some(Conversion {
                amount: 3.0,
                from: "USD".to_string(),
                to: "BRL".to_string()
            })
        );
        assert_eq!(
            extract_conversion_data("converter 7 JPY para USD"),
            Some(Conversion {
                amount: 7.0,
                from: "JPY".to_string(),
                to: "USD".to_string()
            })
        );
        assert_eq!(extract_conversion_data("convert some money"), None);
    }

    #[test]
    fn test_cross_rate() {
        let rates = HashMap::from([("USD".to_string(), 1.1), ("GBP".to_string(), 0.88)]);
        assert_eq!(cross_rate(&rates, "EUR", "EUR", "USD"), Some(1.1));
        let usd_to_gbp = cross_rate(&rates, "EUR", "USD", "GBP").unwrap();
        assert!((usd_to_gbp - 0.8).abs() < 1e-12);
        assert_eq!(cross_rate(&rates, "EUR", "USD", "XYZ"), None);
    }

    #[tokio::test]
    async fn test_same_currency() {
        let client = offline_client();
        assert_eq!(
            client.convert(5.0, "usd", "USD").await.unwrap(),
            "5 USD = 5 USD (Same currency)"
        );
    }

    #[tokio::test]
    async fn test_first_successful_source_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CurrencyClient::with_sources(vec![
            Box::new(Failing(calls.clone())),
            Box::new(FixedRate(2.0)),
            Box::new(OfflineRates),
        ]);

        let answer = client.convert(10.0, "USD", "EUR").await.unwrap();
        assert_eq!(answer, "10 USD = 20.00 EUR (Rate: 2.000000)");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_failures_logged_at_debug() {
        use crate::logger::capture::{install, logged};

        install();
        let client = CurrencyClient::with_sources(vec![
            Box::new(Failing(Arc::new(AtomicUsize::new(0)))),
            Box::new(FixedRate(3.0)),
        ]);
        client.convert(1.0, "GBP", "JPY").await.unwrap();

        assert!(logged(log::Level::Debug, "Rate source failing failed"));
        assert!(!logged(log::Level::Warn, "Rate source failing failed"));
    }

    #[tokio::test]
    async fn test_offline_fallback() {
        let client = offline_client();
        let answer = client.convert(100.0, "USD", "BRL").await.unwrap();
        assert_eq!(answer, "100 USD = 500.00 BRL (Approx. rate: 5.000000) [OFFLINE]");
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CurrencyClient::with_sources(vec![
            Box::new(Failing(calls.clone())),
            Box::new(OfflineRates),
        ]);

        let err = client.convert(1.0, "USD", "XYZ").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "All currency conversion methods failed. Last error: Currency pair USD/XYZ not supported in fallback rates"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_query_unparseable() {
        let client = offline_client();
        assert!(matches!(
            client.handle_query("convert lots of money").await,
            Err(CurrencyError::Unparseable)
        ));
    }
}
