use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use log::{info, warn};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "secret";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Runtime settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub refresh_expiry_days: i64,
    pub google_client_id: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_login_attempts: u32,
    pub lockout_minutes: i64,
    pub reset_token_minutes: i64,
    pub bcrypt_cost: u32,
    pub force_seed: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = optional("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let jwt_secret = match optional("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_origins = optional("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            mongodb_uri: optional("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: optional("DATABASE_NAME").unwrap_or_else(|| "bus_booking".to_string()),
            jwt_secret,
            jwt_expiry_hours: parse_in("JWT_EXPIRY_HOURS", 24, 1..=24 * 365)?,
            refresh_expiry_days: parse_in("REFRESH_EXPIRY_DAYS", 7, 1..=365)?,
            google_client_id: optional("GOOGLE_CLIENT_ID"),
            cors_origins,
            max_login_attempts: parse_in("MAX_LOGIN_ATTEMPTS", 5, 1..=100)?,
            lockout_minutes: parse_in("LOCKOUT_MINUTES", 15, 1..=24 * 60)?,
            reset_token_minutes: parse_in("RESET_TOKEN_MINUTES", 60, 1..=24 * 60)?,
            bcrypt_cost: parse_in("BCRYPT_COST", bcrypt::DEFAULT_COST, 4..=31)?,
            force_seed: optional("FORCE_SEED").is_some_and(|v| v == "true"),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: "bus_booking".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            refresh_expiry_days: 7,
            google_client_id: None,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_login_attempts: 5,
            lockout_minutes: 15,
            reset_token_minutes: 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            force_seed: false,
            admin_email: None,
            admin_password: None,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// Like [`parse_or`], but the value must also fall inside `range`.
fn parse_in<T>(key: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + Display + PartialOrd,
    T::Err: Display,
{
    within(key, parse_or(key, default)?, range)
}

fn within<T>(key: &'static str, value: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: Display + PartialOrd,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_inside_the_range_pass() {
        assert_eq!(within("LOCKOUT_MINUTES", 15i64, 1..=1440).unwrap(), 15);
        assert_eq!(within("BCRYPT_COST", 4u32, 4..=31).unwrap(), 4);
    }

    #[test]
    fn negative_zero_and_huge_durations_are_rejected() {
        for bad in [-15i64, 0, i64::MAX] {
            let err = within("LOCKOUT_MINUTES", bad, 1..=1440).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "LOCKOUT_MINUTES", .. }));
        }
        let err = within("JWT_EXPIRY_HOURS", 9_000_000_000i64, 1..=8760).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for JWT_EXPIRY_HOURS: 9000000000 is outside 1..=8760"
        );
    }

    #[test]
    fn defaults_are_within_their_ranges() {
        let config = Config::default();
        assert!(within("JWT_EXPIRY_HOURS", config.jwt_expiry_hours, 1..=24 * 365).is_ok());
        assert!(within("REFRESH_EXPIRY_DAYS", config.refresh_expiry_days, 1..=365).is_ok());
        assert!(within("LOCKOUT_MINUTES", config.lockout_minutes, 1..=24 * 60).is_ok());
    }
}
