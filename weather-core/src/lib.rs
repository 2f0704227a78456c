//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the Amap, QWeather and OpenWeatherMap endpoints
//! - Typed records decoded from their JSON, and a provider-neutral report
//! - Display helpers (condition icons, temperature colors)
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
mod de;
pub mod display;
pub mod error;
pub mod model;
pub mod provider;

pub use config::{Config, ProviderConfig};
pub use display::{TemperatureBand, temperature_color, weather_icon};
pub use error::ProviderError;
pub use model::{DailyOutlook, WeatherReport, WeatherRequest};
pub use provider::{
    ProviderId, WeatherProvider, amap::AmapClient, default_provider_from_config,
    openweather::OpenWeatherClient, provider_from_config, qweather::QWeatherClient,
};
