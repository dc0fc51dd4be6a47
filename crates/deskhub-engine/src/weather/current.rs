use chrono::{DateTime, FixedOffset, Offset, Utc};

use deskhub_core::errors::UpstreamError;
use deskhub_core::num::{round1, round_i64};
use deskhub_core::weather::{title_case, Condition, WeatherReport};

use super::client::CurrentPayload;

pub(crate) const MS_TO_KMH: f64 = 3.6;

/// "Name, CC", or just the name when the country is missing.
pub(crate) fn display_location(name: &str, country: Option<&str>) -> String {
    match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(cc) => format!("{name}, {cc}"),
        None => name.to_string(),
    }
}

/// Offset for a provider `timezone` shift (seconds east of UTC). Out-of-range
/// shifts fall back to UTC.
pub(crate) fn location_offset(shift_secs: i64) -> FixedOffset {
    i32::try_from(shift_secs)
        .ok()
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// "HH:MM" wall-clock time at the location.
pub(crate) fn local_clock(ts: Option<i64>, offset: FixedOffset) -> String {
    ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|utc| utc.with_timezone(&offset).format("%H:%M").to_string())
        .unwrap_or_default()
}

pub fn map_current(payload: CurrentPayload) -> Result<WeatherReport, UpstreamError> {
    let conditions = payload
        .weather
        .first()
        .ok_or_else(|| UpstreamError::InvalidResponse("weather block missing".into()))?;

    let condition = Condition::from_keyword(&conditions.main);
    let offset = location_offset(payload.timezone);

    Ok(WeatherReport {
        location: display_location(&payload.name, payload.sys.country.as_deref()),
        temperature: round_i64(payload.main.temp),
        feels_like: round_i64(payload.main.feels_like.unwrap_or(payload.main.temp)),
        description: title_case(&conditions.description),
        humidity: round_i64(payload.main.humidity),
        pressure: round_i64(payload.main.pressure),
        wind_speed: round1(payload.wind.speed * MS_TO_KMH),
        wind_direction: round_i64(payload.wind.deg.unwrap_or(0.0)),
        visibility: payload.visibility.unwrap_or(0.0) / 1000.0,
        condition,
        icon: condition.icon().to_string(),
        sunrise: local_clock(payload.sys.sunrise, offset),
        sunset: local_clock(payload.sys.sunset, offset),
    })
}
