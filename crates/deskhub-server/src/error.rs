use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use deskhub_engine::{EngineError, WeatherError};

/// Error body for every non-weather failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Bad input: empty text, unknown selector, malformed JSON/query/path (400).
    Validation(String),
    NotFound(String),
    /// Storage failure (500). The detail is logged, not returned.
    Storage(String),
    /// Weather lookups answer with their own `{error, message}` body.
    Weather(WeatherError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Weather(WeatherError::NotConfigured) => "WEATHER_NOT_CONFIGURED",
            Self::Weather(WeatherError::MissingLocation) => "VALIDATION_ERROR",
            Self::Weather(WeatherError::LocationNotFound(_)) => "LOCATION_NOT_FOUND",
            Self::Weather(WeatherError::Unavailable(_)) => "WEATHER_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Weather(WeatherError::MissingLocation) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Weather(WeatherError::LocationNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Weather(WeatherError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Weather(WeatherError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(msg) => Self::Validation(msg),
            EngineError::NotFound(what) => Self::NotFound(what),
            EngineError::Storage(err) => Self::Storage(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<deskhub_core::todo::UnknownVariant> for ApiError {
    fn from(e: deskhub_core::todo::UnknownVariant) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        Self::Weather(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Weather(e) => (status, Json(e.body())).into_response(),
            Self::Storage(detail) => {
                error!(detail = %detail, "storage failure");
                let body = ErrorResponse {
                    code: "STORAGE_ERROR".into(),
                    message: "Internal storage error".into(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let message = match &other {
                    Self::Validation(msg) => msg.clone(),
                    Self::NotFound(what) => format!("{what} not found"),
                    _ => String::new(),
                };
                let body = ErrorResponse {
                    code: other.code().into(),
                    message,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
