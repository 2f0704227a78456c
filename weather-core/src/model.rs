use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct WeatherRequest {
    /// City name; `None` means the provider's default city.
    pub city: Option<String>,
}

impl WeatherRequest {
    pub fn for_city(city: impl Into<String>) -> Self {
        Self { city: Some(city.into()) }
    }

    pub(crate) fn city_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()).unwrap_or(default)
    }
}

/// Provider-neutral view of a composite weather result, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub provider: String,
    pub location_name: String,
    pub observed_at: String,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: f64,
    pub wind: String,
    pub visibility_km: Option<f64>,
    pub daily: Vec<DailyOutlook>,
    pub air_quality: Option<String>,
    pub warnings: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    pub condition_day: String,
    pub condition_night: String,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
}

impl WeatherReport {
    /// True when visibility was reported and is below `threshold_km`.
    pub fn is_low_visibility(&self, threshold_km: f64) -> bool {
        self.visibility_km.is_some_and(|vis| vis < threshold_km)
    }
}
