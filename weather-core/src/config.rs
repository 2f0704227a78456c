use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::provider::{ProviderId, qweather::PLACEHOLDER_KEY};

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
const DEFAULT_VIS_ALERT_KM: f64 = 5.0;

/// Configuration for a single provider (API key, optional host override).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,

    /// Custom API host, e.g. "abc123.re.qweatherapi.com". Only QWeather uses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional default provider id, e.g. "amap" or "qweather".
    pub default_provider: Option<String>,

    /// City used by `weather show` when none is given.
    #[serde(default)]
    pub default_city: Option<String>,

    /// Refresh period for `weather show --watch`.
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Visibility (km) below which the current conditions are flagged.
    #[serde(default = "default_vis_alert_km")]
    pub vis_alert_km: f64,

    /// Example TOML:
    /// [providers.qweather]
    /// api_key = "..."
    /// api_host = "abc123.re.qweatherapi.com"
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_update_interval_secs() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_vis_alert_km() -> f64 {
    DEFAULT_VIS_ALERT_KM
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_city: None,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            vis_alert_km: DEFAULT_VIS_ALERT_KM,
            providers: HashMap::new(),
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `weather configure <provider>` \
                 (e.g. `weather configure qweather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs.max(1))
    }

    /// Load config from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for id in ProviderId::all() {
            if let Some(key) = non_blank(id.api_key_env()) {
                self.providers.entry(id.as_str().to_string()).or_default().api_key = key;
            }
        }

        if let Some(host) = non_blank("QWEATHER_API_HOST") {
            self.providers
                .entry(ProviderId::QWeather.as_str().to_string())
                .or_default()
                .api_host = Some(host);
        }

        if let Some(city) = non_blank("WEATHER_DEFAULT_CITY") {
            self.default_city = Some(city);
        }

        if let Some(secs) =
            non_blank("WEATHER_UPDATE_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            self.update_interval_secs = secs;
        }

        if let Some(km) = non_blank("WEATHER_VIS_ALERT_KM").and_then(|v| v.parse::<f64>().ok()) {
            self.vis_alert_km = km;
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.entry(provider_id.as_str().to_string()).or_default().api_key = api_key;

        if self.default_provider.is_none() && provider_id != ProviderId::OpenWeather {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    pub fn set_provider_api_host(&mut self, provider_id: ProviderId, api_host: Option<String>) {
        self.providers.entry(provider_id.as_str().to_string()).or_default().api_host = api_host;
    }

    /// Returns API key for a provider, if present. Blank keys and the
    /// sample placeholder count as absent.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id)
            .map(|cfg| cfg.api_key.trim())
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
    }

    pub fn provider_api_host(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id)
            .and_then(|cfg| cfg.api_host.as_deref())
            .map(str::trim)
            .filter(|host| !host.is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}
