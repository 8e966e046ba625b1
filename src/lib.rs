//! Backend for the bus booking platform: accounts and role-based profiles,
//! bus and seat listings, bookings, and support tickets, served as JSON over
//! actix-web with MongoDB storage.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod validation;

use actix_web::web;
use chrono::Duration;

use config::Config;
use db::MongoDB;
use security::{middleware::json_config, LoginAttemptTracker, TokenService};

/// Shared per-process state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<Config>,
    pub db: web::Data<MongoDB>,
    pub tokens: web::Data<TokenService>,
    pub attempts: web::Data<LoginAttemptTracker>,
    pub http: web::Data<reqwest::Client>,
}

impl AppState {
    pub fn new(config: Config, db: MongoDB) -> Self {
        let tokens = TokenService::from_config(&config);
        let attempts = LoginAttemptTracker::new(
            config.max_login_attempts,
            Duration::minutes(config.lockout_minutes),
        );
        Self {
            config: web::Data::new(config),
            db: web::Data::new(db),
            tokens: web::Data::new(tokens),
            attempts: web::Data::new(attempts),
            http: web::Data::new(reqwest::Client::new()),
        }
    }

    /// Registers the shared state, JSON limits and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(json_config())
            .app_data(self.config.clone())
            .app_data(self.db.clone())
            .app_data(self.tokens.clone())
            .app_data(self.attempts.clone())
            .app_data(self.http.clone())
            .configure(handlers::configure);
    }
}
