//! Normalized weather shapes returned to the UI.

use serde::{Deserialize, Serialize};

/// Coarse weather condition used to pick an icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Haze,
    Other,
}

impl Condition {
    /// Map a provider keyword ("Clear", "rain", ...) to a condition.
    pub fn from_keyword(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" | "cloudy" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" => Self::Mist,
            "fog" => Self::Fog,
            "haze" => Self::Haze,
            _ => Self::Other,
        }
    }

    /// First word of a free-text description that names a known condition.
    pub fn from_description(description: &str) -> Self {
        description
            .split_whitespace()
            .map(Self::from_keyword)
            .find(|c| *c != Self::Other)
            .unwrap_or(Self::Other)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "\u{2600}\u{fe0f}",
            Self::Clouds => "\u{2601}\u{fe0f}",
            Self::Rain => "\u{1f327}\u{fe0f}",
            Self::Drizzle => "\u{1f326}\u{fe0f}",
            Self::Thunderstorm => "\u{26c8}\u{fe0f}",
            Self::Snow => "\u{2744}\u{fe0f}",
            Self::Mist | Self::Fog | Self::Haze => "\u{1f32b}\u{fe0f}",
            Self::Other => "\u{1f324}\u{fe0f}",
        }
    }
}

/// Current conditions for one location.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: i64,
    pub feels_like: i64,
    pub description: String,
    pub humidity: i64,
    pub pressure: i64,
    /// km/h, one decimal.
    pub wind_speed: f64,
    pub wind_direction: i64,
    /// km.
    pub visibility: f64,
    pub condition: Condition,
    pub icon: String,
    pub sunrise: String,
    pub sunset: String,
}

/// One aggregated forecast day.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayForecast {
    pub date: String,
    pub day: String,
    pub high_temperature: i64,
    pub low_temperature: i64,
    pub description: String,
    pub condition: Condition,
    pub icon: String,
    pub humidity: i64,
    pub wind_speed: f64,
    pub precipitation_chance: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForecastReport {
    pub location: String,
    pub forecast: Vec<DayForecast>,
    pub timestamp: String,
}

/// Structured error payload returned instead of a report.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeatherErrorBody {
    pub error: String,
    pub message: String,
}

/// "light rain" -> "Light Rain".
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
