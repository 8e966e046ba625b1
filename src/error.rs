use std::collections::BTreeMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Field path to user-facing message, e.g. `driver.vehicle.capacity`.
pub type FieldErrors = BTreeMap<String, String>;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{message}")]
    Unauthorized {
        message: String,
        attempts_remaining: Option<u32>,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many failed login attempts. Try again in {} minute(s)", .retry_after_secs.div_ceil(60))]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Could not verify the Google account")]
    Upstream(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Document encoding error: {0}")]
    BsonSer(#[from] mongodb::bson::ser::Error),

    #[error("Document decoding error: {0}")]
    BsonDe(#[from] mongodb::bson::de::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            message: message.into(),
            attempts_remaining: None,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.into());
        AppError::Validation(fields)
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::BsonSer(_)
                | AppError::BsonDe(_)
                | AppError::Hash(_)
                | AppError::Token(_)
                | AppError::Internal(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message));

        match self {
            AppError::Validation(fields) => {
                body.insert("fields".to_string(), json!(fields));
            }
            AppError::Unauthorized {
                attempts_remaining: Some(remaining),
                ..
            } => {
                body.insert("attempts_remaining".to_string(), json!(remaining));
            }
            AppError::TooManyAttempts { retry_after_secs } => {
                body.insert("retry_after_secs".to_string(), json!(retry_after_secs));
            }
            _ => {}
        }

        let mut response = HttpResponse::build(self.status_code());
        if let AppError::TooManyAttempts { retry_after_secs } = self {
            response.insert_header(("Retry-After", retry_after_secs.to_string()));
        }
        response.json(Value::Object(body))
    }
}
