use std::time::Duration;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::WeatherConfig;

const USER_AGENT: &str = "quick_assist/0.1 (https://github.com/quick-assist/quick_assist)";

/// Words that mark a question as a weather lookup.
const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "forecast",
    "temperature",
    "tempo",
    "clima",
    "pronóstico",
    "pronostico",
];

/// Leading phrases that are followed directly by a place name.
const LOCATION_LEADS: &[&str] = &[
    "weather in",
    "weather at",
    "tempo em",
    "clima em",
    "pronóstico en",
    "pronostico en",
    "forecast in",
];

lazy_static! {
    /// `... in <place>` at the end of the question.
    static ref TRAILING_LOCATION: Regex =
        Regex::new(r"(?i)\b(?:in|em|en)\s+([A-Za-zÀ-ÿ0-9.\-,\s]+)\??$").unwrap();
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Could not detect a location. Try: 'weather in <City>'.")]
    NoLocation,

    #[error("No results for location '{0}'.")]
    NotFound(String),

    #[error("Geocoding request timed out for '{0}'.")]
    GeocodingTimeout(String),

    #[error("Geocoding request failed: {0}")]
    Geocoding(String),

    #[error("Forecast request failed: {0}")]
    Forecast(String),

    #[error("Weather data unavailable.")]
    Unavailable,
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    display_name: Option<String>,
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<GeocodeAddress>,
}

#[derive(Debug, Deserialize)]
struct GeocodeAddress {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    #[serde(default)]
    weathercode: Option<f64>,
}

/// Describe an Open-Meteo (WMO) weather code.
pub fn describe_weather_code(code: i64) -> String {
    let description = match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        80 => "Rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        other => return format!("Code {}", other),
    };
    description.to_string()
}

/// Check whether the question asks about the weather.
pub fn is_weather_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Pull a place name out of the question, if there is one.
pub fn extract_location(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = TRAILING_LOCATION.captures(text) {
        return Some(captures[1].trim().to_string());
    }

    let lower = text.to_lowercase();
    for lead in LOCATION_LEADS {
        if lower.starts_with(lead) {
            // Leads are matched case-insensitively, so slice by char count.
            let rest: String = text.chars().skip(lead.chars().count()).collect();
            return Some(rest.trim_matches(|c| c == ' ' || c == '?').to_string());
        }
    }
    None
}

/// Client for geocoding and current-weather lookups.
pub struct WeatherClient {
    geocoding_url: String,
    forecast_url: String,
    client: Client,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build weather HTTP client")?;
        debug!("Weather provider: {}", config.provider);
        Ok(Self {
            geocoding_url: config.geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: config.forecast_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn geocode(&self, location_name: &str) -> Result<Location, WeatherError> {
        debug!("Geocoding '{}'", location_name);
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("q", location_name),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                if e.is_timeout() {
                    WeatherError::GeocodingTimeout(location_name.to_string())
                } else {
                    WeatherError::Geocoding(e.to_string())
                }
            })?;

        let results: Vec<GeocodeResult> = response
            .json()
            .await
            .map_err(|e| WeatherError::Geocoding(e.to_string()))?;

        parse_location(results, location_name)
    }

    pub async fn current_weather(&self, location: &Location) -> Result<String, WeatherError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WeatherError::Forecast(e.to_string()))?;

        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Forecast(e.to_string()))?;

        format_current_weather(location, forecast)
    }

    /// Full lookup for a free-text question.
    pub async fn handle_query(&self, text: &str) -> Result<String, WeatherError> {
        let query = extract_location(text).ok_or(WeatherError::NoLocation)?;
        let location = self.geocode(&query).await?;
        info!(
            "Resolved '{}' to {} ({}, {})",
            query, location.name, location.latitude, location.longitude
        );
        self.current_weather(&location).await
    }
}

fn parse_location(results: Vec<GeocodeResult>, query: &str) -> Result<Location, WeatherError> {
    let first = results
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::NotFound(query.to_string()))?;

    let latitude = first
        .lat
        .parse::<f64>()
        .map_err(|e| WeatherError::Geocoding(format!("invalid latitude '{}': {}", first.lat, e)))?;
    let longitude = first
        .lon
        .parse::<f64>()
        .map_err(|e| WeatherError::Geocoding(format!("invalid longitude '{}': {}", first.lon, e)))?;

    Ok(Location {
        name: first.display_name.unwrap_or_else(|| query.to_string()),
        country: first.address.and_then(|a| a.country),
        latitude,
        longitude,
    })
}

fn format_current_weather(
    location: &Location,
    forecast: ForecastResponse,
) -> Result<String, WeatherError> {
    let current = forecast.current_weather.ok_or(WeatherError::Unavailable)?;
    let code = current.weathercode.unwrap_or(0.0) as i64;

    let place = match &location.country {
        Some(country) => format!("{}, {}", location.name, country),
        None => location.name.clone(),
    };
    let show = |value: Option<f64>| value.map_or_else(|| "N/A".to_string(), |v| v.to_string());

    Ok(format!(
        "Weather in {}: {}, {}°C, wind {} m/s.",
        place,
        describe_weather_code(code),
        show(current.temperature),
        show(current.windspeed)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_weather_query() {
        assert!(is_weather_query("Weather in New York"));
        assert!(is_weather_query("what's the FORECAST for tomorrow"));
        assert!(is_weather_query("Como está o clima em Lisboa?"));
        assert!(!is_weather_query("Who was Albert Einstein?"));
    }

    #[test]
    fn test_extract_location_trailing() {
        assert_eq!(
            extract_location("Weather in New York"),
            Some("New York".to_string())
        );
        assert_eq!(
            extract_location("What is the temperature in São Paulo?"),
            Some("São Paulo".to_string())
        );
        assert_eq!(
            extract_location("clima em Rio de Janeiro"),
            Some("Rio de Janeiro".to_string())
        );
    }

    #[test]
    fn test_extract_location_leading() {
        assert_eq!(
            extract_location("weather at Paris!"),
            Some("Paris!".to_string())
        );
    }

    #[test]
    fn test_extract_location_missing() {
        assert_eq!(extract_location(""), None);
        assert_eq!(extract_location("weather"), None);
    }

    #[test]
    fn test_new_client() {
        let config = WeatherConfig {
            timeout_seconds: 5,
            geocoding_url: "https://geocode.example/search/".to_string(),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config).unwrap();
        assert_eq!(client.geocoding_url, "https://geocode.example/search");
    }

    #[test]
    fn test_describe_weather_code() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(95), "Thunderstorm");
        assert_eq!(describe_weather_code(42), "Code 42");
    }

    #[test]
    fn test_parse_location() {
        let results: Vec<GeocodeResult> = serde_json::from_str(
            r#"[{"display_name": "Berlin, Deutschland", "lat": "52.5170365",
                 "lon": "13.3888599", "address": {"country": "Deutschland"}}]"#,
        )
        .unwrap();
        let location = parse_location(results, "Berlin").unwrap();
        assert_eq!(location.name, "Berlin, Deutschland");
        assert_eq!(location.country.as_deref(), Some("Deutschland"));
        assert!((location.latitude - 52.5170365).abs() < 1e-9);
        assert!((location.longitude - 13.3888599).abs() < 1e-9);
    }

    #[test]
    fn test_parse_location_empty() {
        let err = parse_location(Vec::new(), "Atlantis").unwrap_err();
        assert_eq!(err.to_string(), "No results for location 'Atlantis'.");
    }

    #[test]
    fn test_format_current_weather() {
        let location = Location {
            name: "Lisbon".to_string(),
            country: Some("Portugal".to_string()),
            latitude: 38.7,
            longitude: -9.1,
        };
        let forecast: ForecastResponse = serde_json::from_str(
            r#"{"current_weather": {"temperature": 21.5, "windspeed": 11.2, "weathercode": 2}}"#,
        )
        .unwrap();
        assert_eq!(
            format_current_weather(&location, forecast).unwrap(),
            "Weather in Lisbon, Portugal: Partly cloudy, 21.5°C, wind 11.2 m/s."
        );
    }

    #[test]
    fn test_format_current_weather_missing() {
        let location = Location {
            name: "Nowhere".to_string(),
            country: None,
            latitude: 0.0,
            longitude: 0.0,
        };
        let forecast: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            format_current_weather(&location, forecast),
            Err(WeatherError::Unavailable)
        ));
    }
}
