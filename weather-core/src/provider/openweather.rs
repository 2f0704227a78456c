//! OpenWeatherMap current weather, kept as a fallback source.
//!
//! The payload is returned as-is; only the HTTP status is checked.

use reqwest::Client;
use tracing::instrument;

use crate::{
    ProviderError,
    provider::{ProviderId, get_json},
};

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

pub const DEFAULT_CITY: &str = "Beijing";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Current weather for `city` in metric units with Chinese descriptions.
    #[instrument(skip(self))]
    pub async fn current_raw(&self, city: &str) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/weather", self.base_url);

        get_json(
            ProviderId::OpenWeather,
            &self.http,
            &url,
            &[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "zh_cn"),
            ],
        )
        .await
    }
}
