use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use deskhub_core::errors::UpstreamError;
use deskhub_core::security::ApiKey;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `GET /weather` response, reduced to the fields we map.
#[derive(Clone, Debug, Deserialize)]
pub struct CurrentPayload {
    pub name: String,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<WeatherBlock>,
    #[serde(default)]
    pub wind: WindBlock,
    /// Meters.
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub sys: SysBlock,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub pressure: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WeatherBlock {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WindBlock {
    /// m/s.
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SysBlock {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// `GET /forecast` response: 3-hourly samples plus city metadata.
#[derive(Clone, Debug, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub list: Vec<ForecastSample>,
    pub city: CityBlock,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ForecastSample {
    /// Unix seconds, UTC.
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<WeatherBlock>,
    #[serde(default)]
    pub wind: WindBlock,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Precipitation {
    /// mm over the 3-hour window.
    #[serde(rename = "3h", default)]
    pub three_hours: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CityBlock {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: i64,
}

/// HTTP client for the OpenWeatherMap 2.5 API. Only built when a key is set.
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(api_key: ApiKey, base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::NetworkError(format!("build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub async fn current(&self, location: &str) -> Result<CurrentPayload, UpstreamError> {
        self.get("weather", location).await
    }

    pub async fn forecast(&self, location: &str) -> Result<ForecastPayload, UpstreamError> {
        self.get("forecast", location).await
    }

    #[instrument(skip(self), fields(provider = "openweathermap"))]
    async fn get<T: DeserializeOwned>(&self, endpoint: &str, location: &str) -> Result<T, UpstreamError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.expose()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::from_transport(e.is_timeout(), self.timeout, e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status, "weather request failed");
            return Err(UpstreamError::from_status(status, body));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamError::from_transport(e.is_timeout(), self.timeout, e.to_string()))?;
        debug!(bytes = body.len(), "weather response received");
        serde_json::from_str(&body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("decode {endpoint}: {e}")))
    }
}
