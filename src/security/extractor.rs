use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::{debug, error};
use mongodb::bson::oid::ObjectId;

use super::jwt::TokenService;
use crate::error::{AppError, AppResult};
use crate::models::{Role, TokenKind};

pub const ACCESS_COOKIE: &str = "access_token";

/// The caller behind a verified access token.
///
/// Read from `Authorization: Bearer <token>`, falling back to the
/// `access_token` cookie. Wrap in `Option` for routes where login is optional.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn object_id(&self) -> AppResult<ObjectId> {
        ObjectId::parse_str(&self.id).map_err(|_| AppError::unauthorized("Invalid or expired token"))
    }

    pub fn require(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        self.require(&[Role::Admin, Role::Support])
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        let value = header.to_str().ok()?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
            _ => {
                debug!("Invalid Authorization header format");
                None
            }
        };
    }
    req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string())
}

fn authenticate(req: &HttpRequest) -> AppResult<AuthUser> {
    let tokens = req.app_data::<web::Data<TokenService>>().ok_or_else(|| {
        error!("TokenService is not registered as app data");
        AppError::Internal("authentication is not configured".to_string())
    })?;

    let token = bearer_token(req).ok_or_else(|| {
        debug!("Missing access token");
        AppError::unauthorized("Unauthorized")
    })?;

    let claims = tokens.verify(&token, TokenKind::Access)?;
    debug!("Token decoded successfully for user: {}", claims.sub);
    Ok(AuthUser {
        id: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
