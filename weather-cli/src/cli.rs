use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use inquire::{Confirm, Password, Text};
use tracing::{error, info};
use weather_core::{
    Config, OpenWeatherClient, ProviderId, QWeatherClient, WeatherReport, WeatherRequest,
    display::hex_to_rgb, provider::openweather, provider::qweather, provider_from_config,
    default_provider_from_config, temperature_color, weather_icon,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "amap", "qweather" or "openweather".
        provider: String,
    },

    /// Show current conditions and forecast for a city.
    Show {
        /// City name; defaults to the configured or provider default city.
        city: Option<String>,

        /// Provider to use instead of the configured default.
        #[arg(long, short)]
        provider: Option<String>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Keep refreshing at the configured update interval.
        #[arg(long)]
        watch: bool,
    },

    /// Show the QWeather 24-hour forecast for a city.
    Hourly {
        city: Option<String>,
    },

    /// Print the raw OpenWeatherMap payload for a city.
    Raw {
        city: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { city, provider, json, watch } => {
                show(&config, city, provider.as_deref(), json, watch).await
            }
            Command::Hourly { city } => hourly(&config, city).await,
            Command::Raw { city } => raw(&config, city).await,
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    // Only the file is edited; env overrides must not be persisted.
    let mut config = Config::load_file()?;

    let api_key = Password::new(&format!("{id} API key:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.upsert_provider_api_key(id, api_key.trim().to_string());

    if id == ProviderId::QWeather {
        let host = Text::new("Custom API host (leave blank for the public host):")
            .prompt()
            .context("Failed to read API host")?;
        let host = host.trim();
        config.set_provider_api_host(id, (!host.is_empty()).then(|| host.to_string()));
    }

    if id != ProviderId::OpenWeather && config.default_provider.as_deref() != Some(id.as_str()) {
        let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    println!("Saved {id} settings to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(
    config: &Config,
    city: Option<String>,
    provider: Option<&str>,
    json: bool,
    watch: bool,
) -> anyhow::Result<()> {
    let provider = match provider {
        Some(name) => provider_from_config(ProviderId::try_from(name)?, config)?,
        None => default_provider_from_config(config)?,
    };

    let request = WeatherRequest {
        city: city.or_else(|| config.default_city.clone()),
    };
    info!("Using {} for {:?}", provider.id(), request.city);

    if !watch {
        let report = provider.get_weather(&request).await?;
        return print_report(&report, config, json);
    }

    let mut ticker = tokio::time::interval(config.update_interval());
    loop {
        ticker.tick().await;
        match provider.get_weather(&request).await {
            Ok(report) => print_report(&report, config, json)?,
            Err(e) => error!("Failed to refresh weather: {e}"),
        }
    }
}

async fn hourly(config: &Config, city: Option<String>) -> anyhow::Result<()> {
    let client = QWeatherClient::new(
        config.provider_api_key(ProviderId::QWeather).map(str::to_owned),
        config.provider_api_host(ProviderId::QWeather).map(str::to_owned),
    );
    let city = city
        .or_else(|| config.default_city.clone())
        .unwrap_or_else(|| qweather::DEFAULT_CITY.to_string());

    let location = client
        .lookup_location(&city)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No location found for '{city}'"))?;

    let points = client.hourly(&location.id).await;
    if points.is_empty() {
        println!("No hourly forecast available for {}", location.name);
        return Ok(());
    }

    println!("{} {}, {}", "24h forecast".bold(), location.name, location.adm1);
    for point in points {
        println!(
            "  {}  {} {:<6} {}  {} {}级",
            point.fx_time,
            weather_icon(&point.text),
            point.text,
            colored_temp(point.temp),
            point.wind_dir,
            point.wind_scale,
        );
    }

    Ok(())
}

async fn raw(config: &Config, city: Option<String>) -> anyhow::Result<()> {
    let api_key = config.provider_api_key(ProviderId::OpenWeather).ok_or_else(|| {
        anyhow!(
            "No API key configured for provider 'openweather'.\n\
             Hint: run `weather configure openweather` and enter your API key."
        )
    })?;

    let city = city.unwrap_or_else(|| openweather::DEFAULT_CITY.to_string());
    let payload = OpenWeatherClient::new(api_key.to_owned()).current_raw(&city).await?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_report(report: &WeatherReport, config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        weather_icon(&report.condition),
        report.location_name.bold(),
        report.provider,
    );
    println!(
        "  {} {}  humidity {:.0}%  {}",
        colored_temp(report.temperature_c),
        report.condition,
        report.humidity_pct,
        report.wind,
    );

    if let Some(vis) = report.visibility_km {
        let line = format!("  visibility {vis:.1} km");
        if report.is_low_visibility(config.vis_alert_km) {
            println!("{}", format!("{line} (below {:.1} km)", config.vis_alert_km).yellow());
        } else {
            println!("{line}");
        }
    }

    if let Some(air) = &report.air_quality {
        println!("  air quality: {air}");
    }

    for warning in &report.warnings {
        println!("  {} {}", "⚠".red(), warning);
    }

    for day in &report.daily {
        println!(
            "  {}  {} {} / {} {}  {} ~ {}",
            day.date.format("%m-%d"),
            weather_icon(&day.condition_day),
            day.condition_day,
            weather_icon(&day.condition_night),
            day.condition_night,
            colored_temp(day.temp_min_c),
            colored_temp(day.temp_max_c),
        );
    }

    println!(
        "  observed {}, fetched {}",
        report.observed_at,
        report.updated_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
    );

    Ok(())
}

fn colored_temp(temp: f64) -> ColoredString {
    let text = format!("{temp:.1}°C");
    match hex_to_rgb(temperature_color(temp)) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}
