use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::services::DrawError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ineligible: {0}")]
    Ineligible(String),

    #[error("Transient lookup error: {0}")]
    TransientLookup(String),

    #[error("Draw error: {0}")]
    Draw(#[from] DrawError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Whether the caller may simply repeat the failed step.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::TransientLookup(_) | AppError::Persistence(_) => true,
            AppError::ReqwestError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::Ineligible(msg) => {
                log::warn!("Ineligible request: {msg}");
                (
                    actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                    "INELIGIBLE",
                    msg.clone(),
                )
            }
            AppError::TransientLookup(msg) => {
                log::warn!("Transient lookup error: {msg}");
                (
                    actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                    "LOOKUP_FAILED",
                    "No se pudo consultar el servidor, intenta nuevamente".to_string(),
                )
            }
            AppError::Draw(err) => {
                log::warn!("Draw error: {err}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "DRAW_ERROR",
                    err.to_string(),
                )
            }
            AppError::Persistence(msg) => {
                log::error!("Persistence error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "PERSISTENCE_ERROR",
                    "No se pudo guardar el resultado, intenta nuevamente".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "CONFLICT",
                    msg.clone(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
                "retryable": self.is_retryable(),
            }
        }))
    }
}
