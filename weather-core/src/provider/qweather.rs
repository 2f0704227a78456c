//! QWeather (和风天气) v7 weather API and v2 location lookup.
//!
//! Location, current conditions and the daily forecast are core data: a
//! missing key, a transport failure or a non-"200" body code is an error.
//! Air quality, hourly forecast and warnings are supplementary: the same
//! failures yield `None` or an empty list.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    ProviderError,
    de,
    model::{DailyOutlook, WeatherReport, WeatherRequest},
    provider::{ProviderId, WeatherProvider, get_json, take_field},
};

const DEFAULT_HOST: &str = "devapi.qweather.com";
const DEFAULT_GEO_BASE_URL: &str = "https://geoapi.qweather.com/v2";
const SUCCESS_CODE: &str = "200";

pub const DEFAULT_CITY: &str = "北京";

/// Placeholder shipped in sample env files; never a real key.
pub(crate) const PLACEHOLDER_KEY: &str = "YOUR_QWEATHER_API_KEY_HERE";

/// Day count for a direct [`QWeatherClient::forecast`] call when the
/// caller has no preference.
pub const DEFAULT_FORECAST_DAYS: u8 = 3;

/// Day count requested by [`QWeatherClient::composite_weather`].
pub const COMPOSITE_FORECAST_DAYS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub id: String,
    #[serde(deserialize_with = "de::number")]
    pub lat: f64,
    #[serde(deserialize_with = "de::number")]
    pub lon: f64,
    /// City-level administrative area.
    pub adm2: String,
    /// Province-level administrative area.
    pub adm1: String,
    pub country: String,
    pub tz: String,
    pub utc_offset: String,
    pub is_dst: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rank: String,
    #[serde(default)]
    pub fx_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub obs_time: String,
    #[serde(deserialize_with = "de::number")]
    pub temp: f64,
    #[serde(deserialize_with = "de::number")]
    pub feels_like: f64,
    pub icon: String,
    pub text: String,
    pub wind360: String,
    pub wind_dir: String,
    pub wind_scale: String,
    #[serde(deserialize_with = "de::number")]
    pub wind_speed: f64,
    #[serde(deserialize_with = "de::number")]
    pub humidity: f64,
    #[serde(deserialize_with = "de::number")]
    pub precip: f64,
    #[serde(deserialize_with = "de::number")]
    pub pressure: f64,
    /// Visibility in km.
    #[serde(deserialize_with = "de::number")]
    pub vis: f64,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub cloud: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub dew: Option<f64>,
}

impl CurrentConditions {
    pub fn is_low_visibility(&self, threshold_km: f64) -> bool {
        self.vis < threshold_km
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub fx_date: NaiveDate,
    #[serde(deserialize_with = "de::number")]
    pub temp_max: f64,
    #[serde(deserialize_with = "de::number")]
    pub temp_min: f64,
    pub text_day: String,
    pub text_night: String,
    pub icon_day: String,
    pub icon_night: String,
    pub wind360_day: String,
    pub wind_dir_day: String,
    pub wind_scale_day: String,
    #[serde(deserialize_with = "de::number")]
    pub wind_speed_day: f64,
    pub wind360_night: String,
    pub wind_dir_night: String,
    pub wind_scale_night: String,
    #[serde(deserialize_with = "de::number")]
    pub wind_speed_night: f64,
    #[serde(deserialize_with = "de::number")]
    pub humidity: f64,
    #[serde(deserialize_with = "de::number")]
    pub precip: f64,
    #[serde(deserialize_with = "de::number")]
    pub pressure: f64,
    #[serde(deserialize_with = "de::number")]
    pub vis: f64,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub cloud: Option<f64>,
    pub uv_index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    pub pub_time: String,
    #[serde(deserialize_with = "de::number")]
    pub aqi: f64,
    pub level: String,
    pub category: String,
    /// Dominant pollutant, "NA" when the air is good.
    pub primary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPoint {
    pub fx_time: String,
    #[serde(deserialize_with = "de::number")]
    pub temp: f64,
    pub icon: String,
    pub text: String,
    pub wind360: String,
    pub wind_dir: String,
    pub wind_scale: String,
    #[serde(deserialize_with = "de::number")]
    pub wind_speed: f64,
    /// Probability of precipitation, percent. Not offered in every region.
    #[serde(default, deserialize_with = "de::optional_number")]
    pub pop: Option<f64>,
    #[serde(deserialize_with = "de::number")]
    pub precip: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub id: String,
    pub pub_time: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub level: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeWeather {
    pub location: Location,
    pub now: CurrentConditions,
    pub daily: Vec<ForecastDay>,
    pub update_time: DateTime<Utc>,
}

/// Human-readable meaning of a QWeather status code.
pub fn describe_code(code: &str) -> &'static str {
    match code {
        "200" => "success",
        "204" => "no data for the requested location",
        "400" => "bad request parameters",
        "401" => "authentication failed, check the API key",
        "402" => "quota exceeded or account overdue",
        "403" => "access denied for this key",
        "404" => "the requested data or location does not exist",
        "429" => "too many requests",
        "500" => "provider timeout or internal error",
        _ => "unknown status code",
    }
}

#[derive(Debug, Clone)]
pub struct QWeatherClient {
    api_key: Option<String>,
    base_url: String,
    geo_base_url: String,
    http: Client,
}

impl QWeatherClient {
    /// `api_host` replaces both the weather and the lookup host when set.
    pub fn new(api_key: Option<String>, api_host: Option<String>) -> Self {
        let host = api_host
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty());

        let (base_url, geo_base_url) = match host {
            Some(host) => (format!("https://{host}/v7"), format!("https://{host}/v2")),
            None => (format!("https://{DEFAULT_HOST}/v7"), DEFAULT_GEO_BASE_URL.to_string()),
        };

        Self::with_base_urls(api_key, &base_url, &geo_base_url)
    }

    /// Point the client at other hosts, e.g. a mock server. A blank key or
    /// the sample placeholder counts as no key.
    pub fn with_base_urls(api_key: Option<String>, base_url: &str, geo_base_url: &str) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty() && k.trim() != PLACEHOLDER_KEY),
            base_url: base_url.trim_end_matches('/').to_string(),
            geo_base_url: geo_base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn require_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingCredential {
            provider: ProviderId::QWeather,
            env_var: ProviderId::QWeather.api_key_env(),
        })
    }

    async fn get(
        &self,
        url: &str,
        location: &str,
        key: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = get_json(
            ProviderId::QWeather,
            &self.http,
            url,
            &[("location", location), ("key", key)],
        )
        .await?;

        ensure_success(&body)?;
        Ok(body)
    }

    /// Cities matching `name`, best match first. May be empty.
    #[instrument(skip(self))]
    pub async fn lookup_location(&self, name: &str) -> Result<Vec<Location>, ProviderError> {
        let key = self.require_key()?;
        let url = format!("{}/city/lookup", self.geo_base_url);

        let mut body = self.get(&url, name, key).await?;
        let found: Option<Vec<Location>> =
            take_field(ProviderId::QWeather, &mut body, "location")?;
        let found = found.unwrap_or_default();

        debug!("QWeather lookup for {} returned {} locations", name, found.len());
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn current_conditions(
        &self,
        location_id: &str,
    ) -> Result<CurrentConditions, ProviderError> {
        let key = self.require_key()?;
        let url = format!("{}/weather/now", self.base_url);

        let mut body = self.get(&url, location_id, key).await?;
        take_field(ProviderId::QWeather, &mut body, "now")
    }

    /// Daily forecast for the next `days` days, oldest first. `days` is
    /// passed through as the `/weather/{days}d` endpoint name.
    #[instrument(skip(self))]
    pub async fn forecast(
        &self,
        location_id: &str,
        days: u8,
    ) -> Result<Vec<ForecastDay>, ProviderError> {
        let key = self.require_key()?;
        let url = format!("{}/weather/{days}d", self.base_url);

        let mut body = self.get(&url, location_id, key).await?;
        let daily: Option<Vec<ForecastDay>> =
            take_field(ProviderId::QWeather, &mut body, "daily")?;
        Ok(daily.unwrap_or_default())
    }

    /// Real-time air quality, or `None` when unavailable for any reason.
    #[instrument(skip(self))]
    pub async fn air_quality(&self, location_id: &str) -> Option<AirQuality> {
        let url = format!("{}/air/now", self.base_url);
        self.supplementary::<Option<AirQuality>>(&url, location_id, "now")
            .await
            .flatten()
    }

    /// 24-hour forecast, or an empty list when unavailable for any reason.
    #[instrument(skip(self))]
    pub async fn hourly(&self, location_id: &str) -> Vec<HourlyPoint> {
        let url = format!("{}/weather/24h", self.base_url);
        self.supplementary::<Option<Vec<HourlyPoint>>>(&url, location_id, "hourly")
            .await
            .flatten()
            .unwrap_or_default()
    }

    /// Active weather warnings, or an empty list when unavailable for any reason.
    #[instrument(skip(self))]
    pub async fn warnings(&self, location_id: &str) -> Vec<Warning> {
        let url = format!("{}/warning/now", self.base_url);
        self.supplementary::<Option<Vec<Warning>>>(&url, location_id, "warning")
            .await
            .flatten()
            .unwrap_or_default()
    }

    async fn supplementary<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        location_id: &str,
        field: &str,
    ) -> Option<T> {
        let key = self.api_key.as_deref()?;

        let result = match self.get(url, location_id, key).await {
            Ok(mut body) => take_field(ProviderId::QWeather, &mut body, field),
            Err(e) => Err(e),
        };

        result
            .map_err(|e| warn!("QWeather {field} unavailable for {location_id}: {e}"))
            .ok()
    }

    /// Resolve `name`, then fetch current conditions and a
    /// [`COMPOSITE_FORECAST_DAYS`]-day forecast concurrently.
    #[instrument(skip(self))]
    pub async fn composite_weather(&self, name: &str) -> Result<CompositeWeather, ProviderError> {
        let location = self
            .lookup_location(name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound {
                provider: ProviderId::QWeather,
                query: name.to_string(),
            })?;

        let (now, daily) = tokio::try_join!(
            self.current_conditions(&location.id),
            self.forecast(&location.id, COMPOSITE_FORECAST_DAYS),
        )?;

        Ok(CompositeWeather {
            location,
            now,
            daily,
            update_time: Utc::now(),
        })
    }
}

fn ensure_success(body: &serde_json::Value) -> Result<(), ProviderError> {
    let code = body.get("code").and_then(|v| v.as_str()).unwrap_or_default();

    if code == SUCCESS_CODE {
        return Ok(());
    }

    Err(ProviderError::Rejected {
        provider: ProviderId::QWeather,
        code: code.to_string(),
        message: describe_code(code).to_string(),
    })
}

fn to_report(
    weather: CompositeWeather,
    air: Option<AirQuality>,
    warnings: Vec<Warning>,
) -> WeatherReport {
    let CompositeWeather { location, now, daily, update_time } = weather;

    WeatherReport {
        provider: ProviderId::QWeather.to_string(),
        location_name: format!("{}, {}", location.name, location.adm1),
        observed_at: now.obs_time,
        temperature_c: now.temp,
        condition: now.text,
        humidity_pct: now.humidity,
        wind: format!("{} {}级", now.wind_dir, now.wind_scale),
        visibility_km: Some(now.vis),
        daily: daily
            .into_iter()
            .map(|day| DailyOutlook {
                date: day.fx_date,
                condition_day: day.text_day,
                condition_night: day.text_night,
                temp_max_c: day.temp_max,
                temp_min_c: day.temp_min,
            })
            .collect(),
        air_quality: air.map(|a| format!("AQI {} {}", a.aqi, a.category)),
        warnings: warnings.into_iter().map(|w| w.title).collect(),
        updated_at: update_time,
    }
}

#[async_trait]
impl WeatherProvider for QWeatherClient {
    fn id(&self) -> ProviderId {
        ProviderId::QWeather
    }

    fn default_city(&self) -> &str {
        DEFAULT_CITY
    }

    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReport, ProviderError> {
        let city = request.city_or(DEFAULT_CITY);
        let weather = self.composite_weather(city).await?;

        let id = weather.location.id.clone();
        let (air, warnings) = tokio::join!(self.air_quality(&id), self.warnings(&id));

        Ok(to_report(weather, air, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::GzipEncoder;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use tokio::io::AsyncReadExt;

    const BEIJING_ID: &str = "101010100";

    fn client(server: &ServerGuard, key: Option<&str>) -> QWeatherClient {
        let url = server.url();
        QWeatherClient::with_base_urls(
            key.map(str::to_string),
            &format!("{url}/v7"),
            &format!("{url}/v2"),
        )
    }

    fn unreachable_client(key: Option<&str>) -> QWeatherClient {
        QWeatherClient::with_base_urls(
            key.map(str::to_string),
            "http://127.0.0.1:9/v7",
            "http://127.0.0.1:9/v2",
        )
    }

    fn query(location: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("location".into(), location.into()),
            Matcher::UrlEncoded("key".into(), "test-key".into()),
        ])
    }

    fn lookup_body() -> serde_json::Value {
        json!({
            "code": "200",
            "location": [{
                "name": "北京", "id": BEIJING_ID, "lat": "39.90499", "lon": "116.40529",
                "adm2": "北京", "adm1": "北京市", "country": "中国", "tz": "Asia/Shanghai",
                "utcOffset": "+08:00", "isDst": "0", "type": "city", "rank": "10",
                "fxLink": "https://www.qweather.com/weather/beijing-101010100.html"
            }]
        })
    }

    fn now_body() -> serde_json::Value {
        json!({
            "code": "200",
            "updateTime": "2024-06-01T14:05+08:00",
            "now": {
                "obsTime": "2024-06-01T14:00+08:00", "temp": "31", "feelsLike": "33",
                "icon": "101", "text": "多云", "wind360": "135", "windDir": "东南风",
                "windScale": "2", "windSpeed": "9", "humidity": "48", "precip": "0.0",
                "pressure": "1003", "vis": "4", "cloud": "", "dew": "19"
            }
        })
    }

    fn daily_body(days: usize) -> serde_json::Value {
        let day = |n: usize| {
            json!({
                "fxDate": format!("2024-06-0{}", n + 1), "tempMax": "33", "tempMin": "21",
                "textDay": "晴", "textNight": "多云", "iconDay": "100", "iconNight": "151",
                "wind360Day": "180", "windDirDay": "南风", "windScaleDay": "1-3",
                "windSpeedDay": "3", "wind360Night": "0", "windDirNight": "北风",
                "windScaleNight": "1-3", "windSpeedNight": "3",
                "humidity": "40", "precip": "0.0", "pressure": "1000", "vis": "25", "cloud": "3",
                "uvIndex": "9"
            })
        };
        json!({ "code": "200", "daily": (0..days).map(day).collect::<Vec<_>>() })
    }

    #[tokio::test]
    async fn required_calls_fail_without_credential() {
        let client = unreachable_client(None);

        let err = client.lookup_location("北京").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));

        let err = client.current_conditions(BEIJING_ID).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));

        let err = client.forecast(BEIJING_ID, 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));

        let err = client.composite_weather("北京").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn placeholder_key_is_not_a_credential() {
        let client = unreachable_client(Some(PLACEHOLDER_KEY));

        let err = client.current_conditions(BEIJING_ID).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));
        assert_eq!(client.air_quality(BEIJING_ID).await, None);
    }

    #[tokio::test]
    async fn optional_calls_are_empty_without_credential() {
        let client = unreachable_client(Some("  "));

        assert_eq!(client.air_quality(BEIJING_ID).await, None);
        assert!(client.hourly(BEIJING_ID).await.is_empty());
        assert!(client.warnings(BEIJING_ID).await.is_empty());
    }

    #[tokio::test]
    async fn optional_calls_swallow_transport_errors() {
        let client = unreachable_client(Some("test-key"));

        assert_eq!(client.air_quality(BEIJING_ID).await, None);
        assert!(client.hourly(BEIJING_ID).await.is_empty());
        assert!(client.warnings(BEIJING_ID).await.is_empty());
    }

    #[tokio::test]
    async fn lookup_parses_locations() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/city/lookup")
            .match_query(query("北京"))
            .with_status(200)
            .with_body(lookup_body().to_string())
            .create_async()
            .await;

        let found = client(&server, Some("test-key"))
            .lookup_location("北京")
            .await
            .expect("lookup");

        mock.assert_async().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, BEIJING_ID);
        assert_eq!(found[0].kind, "city");
        assert!((found[0].lat - 39.90499).abs() < 1e-9);
    }

    #[tokio::test]
    async fn lookup_rejection_carries_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/city/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "code": "999" }).to_string())
            .create_async()
            .await;

        let err = client(&server, Some("test-key")).lookup_location("北京").await.unwrap_err();

        assert!(err.is_rejection());
        assert!(err.to_string().contains("999"));
    }

    #[tokio::test]
    async fn current_conditions_decode_numbers() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v7/weather/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(now_body().to_string())
            .create_async()
            .await;

        let now = client(&server, Some("test-key"))
            .current_conditions(BEIJING_ID)
            .await
            .expect("now");

        assert_eq!(now.temp, 31.0);
        assert_eq!(now.text, "多云");
        assert_eq!(now.cloud, None);
        assert_eq!(now.dew, Some(19.0));
        assert!(now.is_low_visibility(5.0));
        assert!(!now.is_low_visibility(4.0));
    }

    #[tokio::test]
    async fn gzip_encoded_body_is_decoded() {
        let body = now_body().to_string();
        let mut encoder = GzipEncoder::new(body.as_bytes());
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.expect("gzip");

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v7/weather/now")
            .match_query(query(BEIJING_ID))
            .match_header("accept-encoding", Matcher::Regex("gzip".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "gzip")
            .with_body(compressed)
            .create_async()
            .await;

        let now = client(&server, Some("test-key"))
            .current_conditions(BEIJING_ID)
            .await
            .expect("gzip body should decode");

        assert_eq!(now.temp, 31.0);
        assert_eq!(now.wind_dir, "东南风");
    }

    #[tokio::test]
    async fn forecast_uses_requested_day_count() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v7/weather/3d")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(daily_body(3).to_string())
            .create_async()
            .await;

        let days = client(&server, Some("test-key"))
            .forecast(BEIJING_ID, DEFAULT_FORECAST_DAYS)
            .await
            .expect("forecast");

        mock.assert_async().await;
        assert_eq!(days.len(), 3);
        assert!(days.windows(2).all(|w| w[0].fx_date < w[1].fx_date));
    }

    #[tokio::test]
    async fn non_200_body_is_rejection_not_transport() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v7/weather/now")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "code": "401" }).to_string())
            .create_async()
            .await;

        let err = client(&server, Some("test-key"))
            .current_conditions(BEIJING_ID)
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn optional_calls_return_data_on_success() {
        let mut server = Server::new_async().await;
        let _air = server
            .mock("GET", "/v7/air/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(
                json!({
                    "code": "200",
                    "now": { "pubTime": "2024-06-01T14:00+08:00", "aqi": "56", "level": "2",
                             "category": "良", "primary": "PM2.5" }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _hourly = server
            .mock("GET", "/v7/weather/24h")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(
                json!({
                    "code": "200",
                    "hourly": [{ "fxTime": "2024-06-01T15:00+08:00", "temp": "30",
                                 "icon": "100", "text": "晴", "wind360": "180",
                                 "windDir": "南风", "windScale": "1-3", "windSpeed": "7",
                                 "pop": "", "precip": "0.0" }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _warning = server
            .mock("GET", "/v7/warning/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(
                json!({
                    "code": "200",
                    "warning": [{ "id": "w1", "pubTime": "2024-06-01T10:00+08:00",
                                  "title": "北京市气象台发布高温黄色预警",
                                  "type": "11B09", "text": "预计最高气温将达35℃以上" }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(&server, Some("test-key"));

        let air = client.air_quality(BEIJING_ID).await.expect("air quality");
        assert_eq!(air.aqi, 56.0);
        assert_eq!(air.category, "良");

        let hourly = client.hourly(BEIJING_ID).await;
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].pop, None);

        let warnings = client.warnings(BEIJING_ID).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, "");
    }

    #[tokio::test]
    async fn optional_calls_are_empty_on_rejection() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/v7/(air|weather/24h|warning)/?".into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "code": "403" }).to_string())
            .expect(3)
            .create_async()
            .await;

        let client = client(&server, Some("test-key"));

        assert_eq!(client.air_quality(BEIJING_ID).await, None);
        assert!(client.hourly(BEIJING_ID).await.is_empty());
        assert!(client.warnings(BEIJING_ID).await.is_empty());
    }

    #[tokio::test]
    async fn composite_resolves_location_then_fans_out() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/v2/city/lookup")
            .match_query(query("北京"))
            .with_status(200)
            .with_body(lookup_body().to_string())
            .create_async()
            .await;
        let _now = server
            .mock("GET", "/v7/weather/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(now_body().to_string())
            .create_async()
            .await;
        let daily = server
            .mock("GET", format!("/v7/weather/{COMPOSITE_FORECAST_DAYS}d").as_str())
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(daily_body(COMPOSITE_FORECAST_DAYS as usize).to_string())
            .create_async()
            .await;

        let weather = client(&server, Some("test-key"))
            .composite_weather("北京")
            .await
            .expect("composite");

        daily.assert_async().await;
        assert_eq!(weather.location.id, BEIJING_ID);
        assert_eq!(weather.now.temp, 31.0);
        assert_eq!(weather.daily.len(), COMPOSITE_FORECAST_DAYS as usize);
    }

    #[tokio::test]
    async fn composite_not_found_when_lookup_is_empty() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/v2/city/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "code": "200" }).to_string())
            .create_async()
            .await;

        let err = client(&server, Some("test-key"))
            .composite_weather("Atlantis")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound { ref query, .. } if query == "Atlantis"));
    }

    #[tokio::test]
    async fn composite_fails_when_one_fan_out_call_fails() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/v2/city/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(lookup_body().to_string())
            .create_async()
            .await;
        let _now = server
            .mock("GET", "/v7/weather/now")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let _daily = server
            .mock("GET", format!("/v7/weather/{COMPOSITE_FORECAST_DAYS}d").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(daily_body(COMPOSITE_FORECAST_DAYS as usize).to_string())
            .create_async()
            .await;

        let err = client(&server, Some("test-key")).composite_weather("北京").await.unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn report_survives_missing_supplementary_data() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/v2/city/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(lookup_body().to_string())
            .create_async()
            .await;
        let _now = server
            .mock("GET", "/v7/weather/now")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(now_body().to_string())
            .create_async()
            .await;
        let _daily = server
            .mock("GET", format!("/v7/weather/{COMPOSITE_FORECAST_DAYS}d").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(daily_body(COMPOSITE_FORECAST_DAYS as usize).to_string())
            .create_async()
            .await;
        // air and warning endpoints are not mocked, so mockito answers 501

        let report = client(&server, Some("test-key"))
            .get_weather(&WeatherRequest::default())
            .await
            .expect("report");

        assert_eq!(report.provider, "qweather");
        assert_eq!(report.location_name, "北京, 北京市");
        assert_eq!(report.visibility_km, Some(4.0));
        assert_eq!(report.air_quality, None);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn report_carries_air_quality_and_warning_titles() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/v2/city/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(lookup_body().to_string())
            .create_async()
            .await;
        let _now = server
            .mock("GET", "/v7/weather/now")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(now_body().to_string())
            .create_async()
            .await;
        let _daily = server
            .mock("GET", format!("/v7/weather/{COMPOSITE_FORECAST_DAYS}d").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(daily_body(COMPOSITE_FORECAST_DAYS as usize).to_string())
            .create_async()
            .await;
        let air = server
            .mock("GET", "/v7/air/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(
                json!({
                    "code": "200",
                    "now": { "pubTime": "2024-06-01T14:00+08:00", "aqi": "56", "level": "2",
                             "category": "良", "primary": "PM2.5" }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let warning = server
            .mock("GET", "/v7/warning/now")
            .match_query(query(BEIJING_ID))
            .with_status(200)
            .with_body(
                json!({
                    "code": "200",
                    "warning": [{ "id": "w1", "pubTime": "2024-06-01T10:00+08:00",
                                  "title": "北京市气象台发布高温黄色预警",
                                  "type": "11B09", "text": "预计最高气温将达35℃以上" }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let report = client(&server, Some("test-key"))
            .get_weather(&WeatherRequest::for_city("北京"))
            .await
            .expect("report");

        air.assert_async().await;
        warning.assert_async().await;
        assert_eq!(report.air_quality, Some("AQI 56 良".into()));
        assert_eq!(report.warnings, vec!["北京市气象台发布高温黄色预警".to_string()]);
        assert!(report.is_low_visibility(5.0));
    }

    #[test]
    fn custom_host_replaces_both_bases() {
        let client = QWeatherClient::new(Some("k".into()), Some("abc.re.qweatherapi.com/".into()));
        assert_eq!(client.base_url, "https://abc.re.qweatherapi.com/v7");
        assert_eq!(client.geo_base_url, "https://abc.re.qweatherapi.com/v2");

        let client = QWeatherClient::new(Some("k".into()), None);
        assert_eq!(client.base_url, "https://devapi.qweather.com/v7");
        assert_eq!(client.geo_base_url, DEFAULT_GEO_BASE_URL);
    }

    #[test]
    fn describe_code_is_total() {
        assert_eq!(describe_code("402"), "quota exceeded or account overdue");
        assert_eq!(describe_code("garbage"), "unknown status code");
    }
}
