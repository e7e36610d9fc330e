use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::{aqi::AqiError, auth::AuthError, weather::WeatherError};

/// Error returned by every handler. Each variant maps to one status code;
/// the body is always `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Aqi(#[from] AqiError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AuthError::DuplicateEmail => StatusCode::CONFLICT,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::StorageUnavailable(_) | AuthError::Hashing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Aqi(_) => StatusCode::BAD_REQUEST,
            AppError::Weather(e) => match e {
                WeatherError::InvalidCity => StatusCode::BAD_REQUEST,
                WeatherError::CityNotFound => StatusCode::NOT_FOUND,
                WeatherError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                WeatherError::Network(_)
                | WeatherError::Upstream { .. }
                | WeatherError::Parse(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server-side failures are not detailed.
    fn message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Server error".to_string(),
            StatusCode::BAD_GATEWAY => "Weather service error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        (status, Json(ErrorBody { message: self.message() })).into_response()
    }
}
