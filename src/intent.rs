use std::fmt;

use crate::calculator;
use crate::services::{currency, weather};

/// What kind of question the user asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Math,
    Weather,
    Currency,
    General,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Math => "math",
            Intent::Weather => "weather",
            Intent::Currency => "currency",
            Intent::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// Classifies raw input into an `Intent`.
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self { Self }

    /// Classify user input. Checks run in priority order: math, weather,
    /// currency; anything else goes to the language model.
    pub fn classify(&self, input: &str) -> Intent {
        if calculator::is_math_question(input) {
            Intent::Math
        } else if weather::is_weather_query(input) {
            Intent::Weather
        } else if currency::is_currency_query(input) {
            Intent::Currency
        } else {
            Intent::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("What is 128 * 46?"), Intent::Math);
        assert_eq!(classifier.classify("Weather in New York"), Intent::Weather);
        assert_eq!(classifier.classify("Convert 100 USD to BRL"), Intent::Currency);
        assert_eq!(classifier.classify("Who was Albert Einstein?"), Intent::General);
    }

    #[test]
    fn test_math_takes_priority() {
        let classifier = IntentClassifier::new();
        // Embedded arithmetic wins over the weather keyword.
        assert_eq!(classifier.classify("temperature 20+5"), Intent::Math);
        assert_eq!(classifier.classify("convert 2*3 usd"), Intent::Math);
    }
}
