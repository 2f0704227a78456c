//! Presentation helpers shared by all providers.

/// Glyph shown for conditions missing from the table.
pub const DEFAULT_ICON: &str = "🌤️";

const ICONS: &[(&str, &str)] = &[
    ("晴", "☀️"),
    ("多云", "⛅"),
    ("阴", "☁️"),
    ("小雨", "🌦️"),
    ("中雨", "🌧️"),
    ("大雨", "🌧️"),
    ("暴雨", "⛈️"),
    ("雷阵雨", "⛈️"),
    ("雪", "❄️"),
    ("雾", "🌫️"),
    ("霾", "😷"),
    ("沙尘", "🌪️"),
];

/// Emoji for a condition label such as "多云". Exact match only.
pub fn weather_icon(condition: &str) -> &'static str {
    ICONS
        .iter()
        .find(|(label, _)| *label == condition)
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    Scorching,
    Hot,
    Warm,
    Comfortable,
    Cool,
    Chilly,
    Cold,
}

impl TemperatureBand {
    /// Lower bounds are inclusive. NaN lands in `Cold`.
    pub fn from_celsius(temp: f64) -> Self {
        if temp >= 35.0 {
            TemperatureBand::Scorching
        } else if temp >= 30.0 {
            TemperatureBand::Hot
        } else if temp >= 25.0 {
            TemperatureBand::Warm
        } else if temp >= 20.0 {
            TemperatureBand::Comfortable
        } else if temp >= 15.0 {
            TemperatureBand::Cool
        } else if temp >= 10.0 {
            TemperatureBand::Chilly
        } else {
            TemperatureBand::Cold
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TemperatureBand::Scorching => "#ff4757",
            TemperatureBand::Hot => "#ff6b35",
            TemperatureBand::Warm => "#ffa726",
            TemperatureBand::Comfortable => "#66bb6a",
            TemperatureBand::Cool => "#42a5f5",
            TemperatureBand::Chilly => "#5c6bc0",
            TemperatureBand::Cold => "#3f51b5",
        }
    }
}

/// Hex color code for a temperature in °C.
pub fn temperature_color(temp: f64) -> &'static str {
    TemperatureBand::from_celsius(temp).color()
}

/// Parse `#rrggbb` into its components.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
