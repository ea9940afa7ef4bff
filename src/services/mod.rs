//! Network-backed lookups for weather and exchange rates.

pub mod currency;
pub mod weather;

pub use currency::CurrencyClient;
pub use weather::WeatherClient;
