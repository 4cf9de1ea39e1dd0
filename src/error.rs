use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Add conversion from std::io::Error
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

// Implement actix_web::ResponseError for AppError
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Handshake(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure to route a single inbound frame. Contained to the session that read it.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Not a signaling-protocol message (type {0:?})")]
    NotSignaling(String),

    #[error("Envelope carries no payload")]
    MissingPayload,

    #[error("Offer carries no sender")]
    MissingSender,

    #[error("Unsupported payload type {0:?}")]
    UnsupportedPayload(String),

    #[error("Failed to serialize envelope: {0}")]
    Serialize(serde_json::Error),

    #[error("Delivery to {peer} failed: {reason}")]
    Delivery { peer: String, reason: String },
}
