use crate::{
    Config, ProviderError, WeatherReport, WeatherRequest,
    provider::{amap::AmapClient, qweather::QWeatherClient},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug};
use tracing::debug;

pub mod amap;
pub mod openweather;
pub mod qweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Amap,
    QWeather,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Amap => "amap",
            ProviderId::QWeather => "qweather",
            ProviderId::OpenWeather => "openweather",
        }
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::Amap => "AMAP_API_KEY",
            ProviderId::QWeather => "QWEATHER_API_KEY",
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Amap, ProviderId::QWeather, ProviderId::OpenWeather]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "amap" => Ok(ProviderId::Amap),
            "qweather" => Ok(ProviderId::QWeather),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: amap, qweather, openweather."
            )),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// City used when the request does not name one.
    fn default_city(&self) -> &str;

    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReport, ProviderError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::Amap => {
            let api_key = config.provider_api_key(id).ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for provider '{id}'.\n\
                     Hint: run `weather configure {id}` and enter your API key."
                )
            })?;
            Box::new(AmapClient::new(api_key.to_owned()))
        }
        // Built even without a key: supplementary data degrades to empty,
        // required data fails with MissingCredential at call time.
        ProviderId::QWeather => Box::new(QWeatherClient::new(
            config.provider_api_key(id).map(str::to_owned),
            config.provider_api_host(id).map(str::to_owned),
        )),
        ProviderId::OpenWeather => {
            return Err(anyhow::anyhow!(
                "Provider '{id}' is a fallback source without normalized reports.\n\
                 Hint: use `weather raw <city>` to see its payload."
            ));
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

/// GET `url`, require a 2xx status and decode the body as JSON.
pub(crate) async fn get_json(
    provider: ProviderId,
    http: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value, ProviderError> {
    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    debug!(
        url = %redact(res.url().as_str(), query),
        status = %res.status(),
        "{provider} responded"
    );

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Http {
            provider,
            status,
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::Decode { provider, source })
}

/// Move `field` out of a decoded body into a typed record.
pub(crate) fn take_field<T: serde::de::DeserializeOwned>(
    provider: ProviderId,
    body: &mut serde_json::Value,
    field: &str,
) -> Result<T, ProviderError> {
    let value = body.get_mut(field).map(serde_json::Value::take).unwrap_or_default();
    serde_json::from_value(value).map_err(|source| ProviderError::Decode { provider, source })
}

/// Replace credential values in a URL with `***` before logging it.
fn redact(url: &str, query: &[(&str, &str)]) -> String {
    let mut out = url.to_string();
    for (name, value) in query {
        if matches!(*name, "key" | "appid") && !value.is_empty() {
            out = out.replace(value, "***");
        }
    }
    out
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
