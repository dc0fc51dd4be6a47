//! Reduce 3-hourly forecast samples to one summary per location-local day.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use deskhub_core::num::{round1, round_i64};
use deskhub_core::weather::{title_case, Condition, DayForecast, ForecastReport};

use super::client::{ForecastPayload, ForecastSample};
use super::current::{display_location, location_offset, MS_TO_KMH};

pub const FORECAST_DAYS: usize = 5;

#[derive(Default)]
struct DayAccumulator {
    temperatures: Vec<f64>,
    descriptions: Vec<(String, usize)>,
    humidity: Vec<f64>,
    wind_kmh: Vec<f64>,
    precipitation_mm: f64,
}

impl DayAccumulator {
    fn push(&mut self, sample: &ForecastSample) {
        self.temperatures.push(sample.main.temp);
        self.humidity.push(sample.main.humidity);
        self.wind_kmh.push(sample.wind.speed * MS_TO_KMH);
        self.precipitation_mm += sample.rain.as_ref().map_or(0.0, |p| p.three_hours)
            + sample.snow.as_ref().map_or(0.0, |p| p.three_hours);

        if let Some(desc) = sample.weather.first().map(|w| w.description.trim()) {
            if !desc.is_empty() {
                let desc = desc.to_lowercase();
                match self.descriptions.iter_mut().find(|(d, _)| *d == desc) {
                    Some((_, count)) => *count += 1,
                    None => self.descriptions.push((desc, 1)),
                }
            }
        }
    }

    /// Most frequent description; ties go to the one seen first.
    fn mode_description(&self) -> &str {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.descriptions {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map_or("", |(d, _)| d.as_str())
    }

    fn finish(&self, date: NaiveDate) -> DayForecast {
        let high = self.temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = self.temperatures.iter().copied().fold(f64::INFINITY, f64::min);
        let description = self.mode_description();
        let condition = Condition::from_description(description);

        DayForecast {
            date: date.format("%Y-%m-%d").to_string(),
            day: date.format("%A").to_string(),
            high_temperature: round_i64(high),
            low_temperature: round_i64(low),
            description: title_case(description),
            condition,
            icon: condition.icon().to_string(),
            humidity: round_i64(mean(&self.humidity)),
            wind_speed: round1(mean(&self.wind_kmh)),
            precipitation_chance: round_i64(self.precipitation_mm * 10.0).min(100),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Group samples by local calendar day in order of first appearance and
/// summarize the first `FORECAST_DAYS` days.
pub fn aggregate_days(samples: &[ForecastSample], offset: FixedOffset) -> Vec<DayForecast> {
    let mut days: Vec<(NaiveDate, DayAccumulator)> = Vec::new();

    for sample in samples {
        let Some(utc) = DateTime::from_timestamp(sample.dt, 0) else {
            continue;
        };
        let date = utc.with_timezone(&offset).date_naive();

        let idx = match days.iter().position(|(d, _)| *d == date) {
            Some(idx) => idx,
            None => {
                if days.len() == FORECAST_DAYS {
                    continue;
                }
                days.push((date, DayAccumulator::default()));
                days.len() - 1
            }
        };
        days[idx].1.push(sample);
    }

    days.iter().map(|(date, acc)| acc.finish(*date)).collect()
}

pub fn map_forecast(payload: ForecastPayload, now: DateTime<Utc>) -> ForecastReport {
    let offset = location_offset(payload.city.timezone);
    ForecastReport {
        location: display_location(&payload.city.name, payload.city.country.as_deref()),
        forecast: aggregate_days(&payload.list, offset),
        timestamp: now.to_rfc3339(),
    }
}
