use actix_cors::Cors;
use actix_web::{http::header, middleware::DefaultHeaders, web};
use log::debug;

use crate::config::Config;
use crate::error::AppError;

pub const JSON_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// CORS for the configured frontend origins, with credentials so the
/// `access_token` cookie travels.
pub fn cors(config: &Config) -> Cors {
    config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![header::RETRY_AFTER])
        .supports_credentials()
        .max_age(3600)
}

/// Hardening headers attached to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "0"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Strict-Transport-Security", "max-age=15552000; includeSubDomains"))
        .add(("Content-Security-Policy", "default-src 'none'; frame-ancestors 'none'"))
        .add(("Cross-Origin-Resource-Policy", "same-site"))
}

/// Body size cap and JSON-shaped errors for malformed payloads.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            debug!("Rejected request body: {}", err);
            AppError::BadRequest(format!("Invalid request body: {err}")).into()
        })
}
