use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Claims, Role, TokenKind, TokenPair};

/// Issues and checks the HS256 access/refresh tokens handed to clients.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::hours(config.jwt_expiry_hours),
            Duration::days(config.refresh_expiry_days),
        )
    }

    fn issue(&self, user_id: &str, role: Role, kind: TokenKind) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            kind,
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn issue_pair(&self, user_id: &str, role: Role) -> AppResult<TokenPair> {
        Ok(TokenPair {
            token: self.issue(user_id, role, TokenKind::Access)?,
            refresh_token: self.issue(user_id, role, TokenKind::Refresh)?,
        })
    }

    /// Decodes `token` and insists it is of the expected kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!("Token decoding failed: {:?}", e);
                AppError::unauthorized("Invalid or expired token")
            })?
            .claims;

        if claims.kind != expected {
            debug!("Rejected {:?} token where {:?} was expected", claims.kind, expected);
            return Err(AppError::unauthorized("Invalid or expired token"));
        }
        Ok(claims)
    }
}
