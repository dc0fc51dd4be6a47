//! Weather proxy: OpenWeatherMap lookups mapped into dashboard shapes, with
//! every failure reported as a structured error instead of a transport error.

mod client;
mod current;
mod forecast;

pub use client::WeatherClient;
pub use current::map_current;
pub use forecast::{aggregate_days, map_forecast, FORECAST_DAYS};

use chrono::Utc;
use tracing::{instrument, warn};

use deskhub_core::errors::UpstreamError;
use deskhub_core::weather::{ForecastReport, WeatherErrorBody, WeatherReport};

/// Why a weather lookup produced no report.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather API key not configured")]
    NotConfigured,

    #[error("Location required")]
    MissingLocation,

    #[error("Location not found")]
    LocationNotFound(String),

    #[error("Weather service unavailable")]
    Unavailable(UpstreamError),
}

impl WeatherError {
    fn from_upstream(location: &str, e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotFound(_) => Self::LocationNotFound(location.to_string()),
            other => Self::Unavailable(other),
        }
    }

    /// `{error, message}` payload for the UI.
    pub fn body(&self) -> WeatherErrorBody {
        let message = match self {
            Self::NotConfigured => "Please set WEATHER_API_KEY in your .env file".to_string(),
            Self::MissingLocation => "Enter a city name, e.g. \"London\" or \"Paris, FR\"".to_string(),
            Self::LocationNotFound(location) => format!("No weather data found for \"{location}\""),
            Self::Unavailable(e) => e.to_string(),
        };
        WeatherErrorBody {
            error: self.to_string(),
            message,
        }
    }
}

/// Weather lookups. Without a client every call reports `NotConfigured`.
pub struct WeatherService {
    client: Option<WeatherClient>,
}

impl WeatherService {
    pub fn new(client: Option<WeatherClient>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn ready(&self, location: &str) -> Result<(&WeatherClient, String), WeatherError> {
        let client = self.client.as_ref().ok_or(WeatherError::NotConfigured)?;
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }
        Ok((client, location.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn current(&self, location: &str) -> Result<WeatherReport, WeatherError> {
        let (client, location) = self.ready(location)?;
        client
            .current(&location)
            .await
            .and_then(map_current)
            .map_err(|e| {
                warn!(error_kind = e.error_kind(), error = %e, "current weather lookup failed");
                WeatherError::from_upstream(&location, e)
            })
    }

    #[instrument(skip(self))]
    pub async fn forecast(&self, location: &str) -> Result<ForecastReport, WeatherError> {
        let (client, location) = self.ready(location)?;
        let payload = client.forecast(&location).await.map_err(|e| {
            warn!(error_kind = e.error_kind(), error = %e, "forecast lookup failed");
            WeatherError::from_upstream(&location, e)
        })?;
        Ok(map_forecast(payload, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use deskhub_core::security::ApiKey;
    use serde_json::json;

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn current_handler(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
        assert_eq!(q.get("appid").map(String::as_str), Some("weather-key"));
        assert_eq!(q.get("units").map(String::as_str), Some("metric"));
        match q.get("q").map(String::as_str) {
            Some("Paris") => Json(json!({
                "name": "Paris",
                "timezone": 7200,
                "main": { "temp": 21.5, "feels_like": 21.0, "humidity": 55, "pressure": 1018 },
                "weather": [{ "main": "Clear", "description": "clear sky" }],
                "wind": { "speed": 2.5, "deg": 90 },
                "visibility": 10000,
                "sys": { "country": "FR", "sunrise": 1718769600, "sunset": 1718829000 }
            }))
            .into_response(),
            Some("Garbled") => "{not json".into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({ "cod": "404", "message": "city not found" }))).into_response(),
        }
    }

    async fn forecast_handler(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
        match q.get("q").map(String::as_str) {
            Some("Paris") => Json(json!({
                "list": [
                    { "dt": 1718769600, "main": { "temp": 18.0, "humidity": 60 }, "weather": [{ "description": "few clouds" }], "wind": { "speed": 1.0 } },
                    { "dt": 1718780400, "main": { "temp": 24.0, "humidity": 40 }, "weather": [{ "description": "few clouds" }], "wind": { "speed": 3.0 } }
                ],
                "city": { "name": "Paris", "country": "FR", "timezone": 7200 }
            }))
            .into_response(),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        }
    }

    async fn service() -> WeatherService {
        let app = Router::new()
            .route("/weather", get(current_handler))
            .route("/forecast", get(forecast_handler));
        let base = spawn_stub(app).await;
        let key = ApiKey::from_configured(Some("weather-key")).unwrap();
        WeatherService::new(Some(WeatherClient::new(key, &base, Duration::from_secs(5)).unwrap()))
    }

    #[tokio::test]
    async fn current_weather_is_mapped() {
        let report = service().await.current("Paris").await.unwrap();
        assert_eq!(report.location, "Paris, FR");
        assert_eq!(report.temperature, 22);
        assert_eq!(report.description, "Clear Sky");
        assert_eq!(report.wind_speed, 9.0);
        assert_eq!(report.visibility, 10.0);
        assert_eq!(report.sunrise, "06:00");
    }

    #[tokio::test]
    async fn unknown_location_is_not_found() {
        let err = service().await.current("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherError::LocationNotFound(_)));
        assert_eq!(err.body().error, "Location not found");
    }

    #[tokio::test]
    async fn undecodable_body_is_unavailable() {
        let err = service().await.current("Garbled").await.unwrap_err();
        assert!(matches!(err, WeatherError::Unavailable(UpstreamError::InvalidResponse(_))));
        assert_eq!(err.body().error, "Weather service unavailable");
    }

    #[tokio::test]
    async fn forecast_is_aggregated() {
        let report = service().await.forecast("Paris").await.unwrap();
        assert_eq!(report.location, "Paris, FR");
        assert_eq!(report.forecast.len(), 1);
        let day = &report.forecast[0];
        assert_eq!(day.high_temperature, 24);
        assert_eq!(day.low_temperature, 18);
        assert_eq!(day.humidity, 50);
        assert_eq!(day.description, "Few Clouds");
    }

    #[tokio::test]
    async fn forecast_server_error_is_unavailable() {
        let err = service().await.forecast("Nowhere").await.unwrap_err();
        assert!(matches!(err, WeatherError::Unavailable(UpstreamError::ServerError { status: 500, .. })));
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let key = ApiKey::from_configured(Some("weather-key")).unwrap();
        let svc = WeatherService::new(Some(
            WeatherClient::new(key, &format!("http://{addr}"), Duration::from_secs(2)).unwrap(),
        ));
        let err = svc.current("Paris").await.unwrap_err();
        assert!(matches!(err, WeatherError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unconfigured_and_blank_location() {
        let svc = WeatherService::new(None);
        assert!(!svc.is_configured());
        let err = svc.current("Paris").await.unwrap_err();
        assert!(matches!(err, WeatherError::NotConfigured));
        let body = err.body();
        assert_eq!(body.error, "Weather API key not configured");
        assert!(body.message.contains("WEATHER_API_KEY"));

        let svc = service().await;
        assert!(matches!(svc.forecast("  ").await, Err(WeatherError::MissingLocation)));
    }
}
