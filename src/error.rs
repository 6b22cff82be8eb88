use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use tracing::error;

use crate::models::ApiResponse;

/// Domain and transport error taxonomy. Every variant renders as the
/// `{success: false, message}` envelope with the matching HTTP status.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "Already clocked in today!")]
    AlreadyClockedIn,
    #[display(fmt = "Already clocked out today!")]
    AlreadyClockedOut,
    #[display(fmt = "No clock-in recorded for today yet!")]
    NotClockedInYet,
    #[display(fmt = "{}", _0)]
    RateExceeded(String),
    // Internals stay in the log; clients get a generic message.
    #[display(fmt = "Internal server error")]
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Storage(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::AlreadyClockedIn
            | ApiError::AlreadyClockedOut
            | ApiError::NotClockedInYet => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Storage(e) = self {
            error!(error = %e, "storage failure");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(self.to_string()))
    }
}
