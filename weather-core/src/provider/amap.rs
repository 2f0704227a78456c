//! Amap (高德) weather web service.
//!
//! One endpoint serves both live conditions (`extensions=base`) and the
//! multi-day forecast (`extensions=all`). A body `status` of `"1"` means
//! success; anything else carries the reason in `info` / `infocode`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    ProviderError,
    de,
    model::{DailyOutlook, WeatherReport, WeatherRequest},
    provider::{ProviderId, WeatherProvider, get_json, take_field},
};

const BASE_URL: &str = "https://restapi.amap.com/v3";
const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_CITY: &str = "南京市";

/// Live observation for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmapLive {
    pub province: String,
    pub city: String,
    pub adcode: String,
    #[serde(rename = "weather")]
    pub condition: String,
    #[serde(deserialize_with = "de::number")]
    pub temperature: f64,
    #[serde(rename = "winddirection")]
    pub wind_direction: String,
    /// Beaufort-like band as sent, e.g. "≤3".
    #[serde(rename = "windpower")]
    pub wind_power: String,
    #[serde(deserialize_with = "de::number")]
    pub humidity: f64,
    #[serde(rename = "reporttime")]
    pub report_time: String,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub temperature_float: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub humidity_float: Option<f64>,
}

impl AmapLive {
    /// Report time in China Standard Time, as sent by the provider.
    pub fn reported_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.report_time, REPORT_TIME_FORMAT).ok()
    }

    /// Most precise temperature available.
    pub fn temperature_c(&self) -> f64 {
        self.temperature_float.unwrap_or(self.temperature)
    }
}

/// One day of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmapCast {
    pub date: NaiveDate,
    pub week: String,
    #[serde(rename = "dayweather")]
    pub day_condition: String,
    #[serde(rename = "nightweather")]
    pub night_condition: String,
    #[serde(rename = "daytemp", deserialize_with = "de::number")]
    pub day_temp: f64,
    #[serde(rename = "nighttemp", deserialize_with = "de::number")]
    pub night_temp: f64,
    #[serde(rename = "daywind")]
    pub day_wind: String,
    #[serde(rename = "nightwind")]
    pub night_wind: String,
    #[serde(rename = "daypower")]
    pub day_power: String,
    #[serde(rename = "nightpower")]
    pub night_power: String,
}

#[derive(Debug, Deserialize)]
struct AmapForecastCity {
    #[serde(default)]
    casts: Vec<AmapCast>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeWeather {
    pub current: AmapLive,
    pub forecast: Vec<AmapCast>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AmapClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl AmapClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the client at another host, e.g. a mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn weather_info(
        &self,
        city: &str,
        extensions: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/weather/weatherInfo", self.base_url);
        let body = get_json(
            ProviderId::Amap,
            &self.http,
            &url,
            &[
                ("key", self.api_key.as_str()),
                ("city", city),
                ("extensions", extensions),
            ],
        )
        .await?;

        ensure_success(&body)?;
        Ok(body)
    }

    /// Live conditions for `city`. A successful response with no entries
    /// is reported as [`ProviderError::NotFound`].
    #[instrument(skip(self))]
    pub async fn current_conditions(&self, city: &str) -> Result<AmapLive, ProviderError> {
        let mut body = self.weather_info(city, "base").await?;
        let lives: Option<Vec<AmapLive>> = take_field(ProviderId::Amap, &mut body, "lives")?;

        lives.unwrap_or_default().into_iter().next().ok_or_else(|| ProviderError::NotFound {
            provider: ProviderId::Amap,
            query: city.to_string(),
        })
    }

    /// Forecast days for `city`, oldest first.
    ///
    /// When the name matches several administrative regions only the first
    /// region's forecast is returned. An empty list means the provider had
    /// no forecast for the query.
    #[instrument(skip(self))]
    pub async fn forecast(&self, city: &str) -> Result<Vec<AmapCast>, ProviderError> {
        let mut body = self.weather_info(city, "all").await?;
        let forecasts: Option<Vec<AmapForecastCity>> =
            take_field(ProviderId::Amap, &mut body, "forecasts")?;

        let casts = forecasts
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|region| region.casts)
            .unwrap_or_default();

        debug!("Amap returned {} forecast days for {}", casts.len(), city);
        Ok(casts)
    }

    /// Live conditions and forecast, fetched concurrently. Fails if either does.
    #[instrument(skip(self))]
    pub async fn composite_weather(&self, city: &str) -> Result<CompositeWeather, ProviderError> {
        let (current, forecast) =
            tokio::try_join!(self.current_conditions(city), self.forecast(city))?;

        Ok(CompositeWeather {
            current,
            forecast,
            update_time: Utc::now(),
        })
    }
}

fn ensure_success(body: &serde_json::Value) -> Result<(), ProviderError> {
    let field = |name: &str| body.get(name).and_then(|v| v.as_str()).unwrap_or_default();

    if field("status") == "1" {
        return Ok(());
    }

    Err(ProviderError::Rejected {
        provider: ProviderId::Amap,
        code: field("infocode").to_string(),
        message: field("info").to_string(),
    })
}

impl From<CompositeWeather> for WeatherReport {
    fn from(weather: CompositeWeather) -> Self {
        let live = weather.current;

        WeatherReport {
            provider: ProviderId::Amap.to_string(),
            location_name: format!("{}, {}", live.city, live.province),
            observed_at: live.report_time.clone(),
            temperature_c: live.temperature_c(),
            condition: live.condition.clone(),
            humidity_pct: live.humidity_float.unwrap_or(live.humidity),
            wind: format!("{}风 {}级", live.wind_direction, live.wind_power),
            visibility_km: None,
            daily: weather
                .forecast
                .into_iter()
                .map(|cast| DailyOutlook {
                    date: cast.date,
                    condition_day: cast.day_condition,
                    condition_night: cast.night_condition,
                    temp_max_c: cast.day_temp.max(cast.night_temp),
                    temp_min_c: cast.day_temp.min(cast.night_temp),
                })
                .collect(),
            air_quality: None,
            warnings: Vec::new(),
            updated_at: weather.update_time,
        }
    }
}

#[async_trait]
impl WeatherProvider for AmapClient {
    fn id(&self) -> ProviderId {
        ProviderId::Amap
    }

    fn default_city(&self) -> &str {
        DEFAULT_CITY
    }

    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReport, ProviderError> {
        let city = request.city_or(DEFAULT_CITY);
        self.composite_weather(city).await.map(WeatherReport::from)
    }
}
