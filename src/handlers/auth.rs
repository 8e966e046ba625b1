use actix_web::{cookie::Cookie, cookie::SameSite, web, HttpResponse};
use chrono::Duration;
use log::{debug, info, warn};
use mongodb::bson::DateTime;
use serde_json::json;

use crate::config::Config;
use crate::db::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthResponse, ForgotPasswordRequest, GoogleLoginRequest, GoogleTokenInfo, LoginRequest,
    PasswordReset, RefreshRequest, RegisterRequest, ResetPasswordRequest, Role, TokenKind, User,
    UserResponse,
};
use crate::security::{
    reset::{generate_reset_token, hash_reset_token},
    LoginAttemptTracker, TokenService, ACCESS_COOKIE,
};
use crate::validation::{self, normalize_phone};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

fn auth_response(tokens: &TokenService, user: User) -> AppResult<AuthResponse> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal(format!("user {} has no id", user.email)))?;
    let pair = tokens.issue_pair(&user_id.to_hex(), user.role)?;
    Ok(AuthResponse {
        token: pair.token,
        refresh_token: pair.refresh_token,
        redirect: user.role.dashboard_path(),
        user: UserResponse::from(user),
    })
}

fn access_cookie(token: &str, config: &Config) -> Cookie<'static> {
    Cookie::build(ACCESS_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(actix_web::cookie::time::Duration::hours(config.jwt_expiry_hours))
        .finish()
}

fn with_session(response: AuthResponse, config: &Config, status: actix_web::http::StatusCode) -> HttpResponse {
    HttpResponse::build(status)
        .cookie(access_cookie(&response.token, config))
        .json(response)
}

pub async fn register(
    db: web::Data<MongoDB>,
    tokens: web::Data<TokenService>,
    config: web::Data<Config>,
    payload: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = payload.into_inner();
    validation::validate_registration(&req)?;

    if db.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let role = req.role.as_deref().map(Role::normalize).unwrap_or_default();
    let hashed_password = bcrypt::hash(&req.password, config.bcrypt_cost)?;
    let mut user = User::new(&req.username, &req.email, hashed_password, role);
    user.phone = req
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(normalize_phone);

    user.id = Some(db.insert_user(&user).await?);
    info!("Registered {} account for {}", user.role, user.email);

    let response = auth_response(&tokens, user)?;
    Ok(with_session(response, &config, actix_web::http::StatusCode::CREATED))
}

pub async fn login(
    db: web::Data<MongoDB>,
    tokens: web::Data<TokenService>,
    attempts: web::Data<LoginAttemptTracker>,
    config: web::Data<Config>,
    credentials: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let key = LoginAttemptTracker::key(&credentials.email);
    attempts.check(&key)?;

    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()));
    }

    let user = db.find_user_by_email(&credentials.email).await?;
    let verified = match &user {
        Some(u) if u.has_password() => bcrypt::verify(&credentials.password, &u.password)?,
        _ => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        warn!("Invalid login attempt for email: {}", key);
        return Err(attempts.record_failure(&key).into_error());
    };

    if !user.is_active {
        warn!("Login refused for deactivated account {}", user.email);
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    attempts.record_success(&key);
    if let Some(id) = &user.id {
        db.record_login(id).await?;
    }
    info!("User {} authenticated successfully", user.email);

    let response = auth_response(&tokens, user)?;
    Ok(with_session(response, &config, actix_web::http::StatusCode::OK))
}

pub async fn google_login(
    db: web::Data<MongoDB>,
    tokens: web::Data<TokenService>,
    config: web::Data<Config>,
    http: web::Data<reqwest::Client>,
    payload: web::Json<GoogleLoginRequest>,
) -> AppResult<HttpResponse> {
    if payload.token.trim().is_empty() {
        return Err(AppError::BadRequest("Google token is required".to_string()));
    }

    // 1. Verify token with Google
    let response = http
        .get(GOOGLE_TOKENINFO_URL)
        .query(&[("id_token", payload.token.trim())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::unauthorized("Invalid Google token"));
    }

    let info: GoogleTokenInfo = response.json().await?;

    if let Some(client_id) = &config.google_client_id {
        if info.aud.as_deref() != Some(client_id.as_str()) {
            warn!("Google token issued for another client: {:?}", info.aud);
            return Err(AppError::unauthorized("Invalid Google token"));
        }
    }
    if info.email_verified.as_deref() == Some("false") {
        return Err(AppError::unauthorized("Google email is not verified"));
    }

    let email = info.email.as_deref().unwrap_or("").trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email not found in Google token".to_string()));
    }
    let name = info.name.as_deref().unwrap_or("Google User");

    // 2. Login or register in DB
    let user = db
        .find_or_create_google_user(email, name, info.picture.as_deref())
        .await?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }
    if let Some(id) = &user.id {
        db.record_login(id).await?;
    }
    info!("Google user {} authenticated", user.email);

    let response = auth_response(&tokens, user)?;
    Ok(with_session(response, &config, actix_web::http::StatusCode::OK))
}

pub async fn refresh(
    db: web::Data<MongoDB>,
    tokens: web::Data<TokenService>,
    config: web::Data<Config>,
    payload: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let claims = tokens.verify(&payload.refresh_token, TokenKind::Refresh)?;
    let user_id = MongoDB::string_to_id(&claims.sub, "User")
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

    // Re-read the user so role changes and deactivation take effect.
    let user = db
        .find_user_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let pair = tokens.issue_pair(&user_id.to_hex(), user.role)?;
    debug!("Refreshed tokens for {}", user.email);
    Ok(HttpResponse::Ok()
        .cookie(access_cookie(&pair.token, &config))
        .json(pair))
}

pub async fn forgot_password(
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    payload: web::Json<ForgotPasswordRequest>,
) -> AppResult<HttpResponse> {
    if !validation::is_valid_email(&payload.email) {
        return Err(AppError::invalid_field("email", "Invalid email address"));
    }

    if let Some(user) = db.find_user_by_email(&payload.email).await? {
        if let Some(id) = &user.id {
            let (token, token_hash) = generate_reset_token();
            let expires_at = DateTime::from_millis(
                (chrono::Utc::now() + Duration::minutes(config.reset_token_minutes))
                    .timestamp_millis(),
            );
            db.store_reset_token(id, &PasswordReset { token_hash, expires_at })
                .await?;
            info!("Password reset requested for {}", user.email);
            // Stand-in for the outgoing email.
            debug!(
                "Reset link for {}: {}/reset-password?token={}",
                user.email, config.frontend_url, token
            );
        }
    } else {
        debug!("Password reset requested for unknown email {}", payload.email);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "If an account exists for that email, a reset link has been sent"
    })))
}

pub async fn reset_password(
    db: web::Data<MongoDB>,
    attempts: web::Data<LoginAttemptTracker>,
    config: web::Data<Config>,
    payload: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    if let Some(problem) = validation::password_problem(&payload.new_password) {
        return Err(AppError::invalid_field("new_password", problem));
    }

    let token_hash = hash_reset_token(&payload.token);
    let user = db
        .find_user_by_reset_token(&token_hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("Reset link is invalid or has expired".to_string()))?;
    let user_id = user.id.ok_or(AppError::NotFound("User"))?;

    let hashed_password = bcrypt::hash(&payload.new_password, config.bcrypt_cost)?;
    db.set_password(&user_id, &hashed_password).await?;
    attempts.record_success(&LoginAttemptTracker::key(&user.email));
    info!("Password reset completed for {}", user.email);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password has been reset. You can now log in"
    })))
}

pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(ACCESS_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true, "message": "Logged out" }))
}
