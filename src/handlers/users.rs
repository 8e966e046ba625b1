use actix_web::{cookie::Cookie, web, HttpResponse};
use log::{info, warn};
use mongodb::bson::{self, doc, Document};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::today;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminUpdateUserRequest, AvatarRequest, ChangePasswordRequest, DeleteAccountRequest,
    DriverDetails, Role, UpdateProfileRequest, User, UserListQuery, UserResponse,
};
use crate::security::{sanitize::sanitize, AuthUser, ACCESS_COOKIE};
use crate::validation::{self, merge_driver_details, normalize_driver_details, normalize_phone};

/// Free-form profile payloads are sanitized before they become typed requests.
fn parse_sanitized<T: DeserializeOwned>(payload: Value) -> AppResult<T> {
    serde_json::from_value(sanitize(payload))
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

fn set_or_unset(
    set: &mut Document,
    unset: &mut Document,
    field: &str,
    value: &Option<String>,
    normalize: impl Fn(&str) -> String,
) {
    if let Some(value) = value {
        let value = value.trim();
        if value.is_empty() {
            unset.insert(field, "");
        } else {
            set.insert(field, normalize(value));
        }
    }
}

/// Turns a validated profile edit into `$set` and `$unset` documents.
pub fn profile_changes(
    req: &UpdateProfileRequest,
    existing_driver: Option<&DriverDetails>,
) -> AppResult<(Document, Document)> {
    let mut set = Document::new();
    let mut unset = Document::new();

    if let Some(username) = &req.username {
        set.insert("username", username.trim());
    }
    set_or_unset(&mut set, &mut unset, "full_name", &req.full_name, str::to_string);
    set_or_unset(&mut set, &mut unset, "phone", &req.phone, normalize_phone);
    set_or_unset(&mut set, &mut unset, "nic", &req.nic, str::to_uppercase);
    set_or_unset(&mut set, &mut unset, "address", &req.address, str::to_string);
    set_or_unset(&mut set, &mut unset, "department", &req.department, str::to_string);

    if let Some(driver) = &req.driver {
        let merged = merge_driver_details(existing_driver, driver);
        set.insert("driver", bson::to_bson(&merged)?);
    }

    Ok((set, unset))
}

fn normalized(mut req: UpdateProfileRequest) -> UpdateProfileRequest {
    if let Some(driver) = req.driver.as_mut() {
        normalize_driver_details(driver);
    }
    req
}

pub async fn get_profile(user: AuthUser, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let profile = db.get_user(&user.object_id()?).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(profile)))
}

pub async fn update_profile(
    user: AuthUser,
    db: web::Data<MongoDB>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let req = normalized(parse_sanitized::<UpdateProfileRequest>(payload.into_inner())?);
    let id = user.object_id()?;
    let current = db.get_user(&id).await?;

    validation::validate_profile_update(current.role, &req, current.driver.as_ref(), today())?;

    let (set, unset) = profile_changes(&req, current.driver.as_ref())?;
    let updated = db.update_user_fields(&id, set, unset).await?;
    info!("User {} updated their profile", updated.email);
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

pub async fn change_password(
    user: AuthUser,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    payload: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    validation::validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let id = user.object_id()?;
    let account = db.get_user(&id).await?;

    if account.has_password() {
        let current = payload.current_password.as_deref().unwrap_or("");
        if current.is_empty() {
            return Err(AppError::invalid_field(
                "current_password",
                "Current password is required",
            ));
        }
        if !bcrypt::verify(current, &account.password)? {
            warn!("Wrong current password on password change for {}", account.email);
            return Err(AppError::invalid_field(
                "current_password",
                "Current password is incorrect",
            ));
        }
        if current == payload.new_password {
            return Err(AppError::invalid_field(
                "new_password",
                "New password must differ from the current one",
            ));
        }
    }

    let hashed_password = bcrypt::hash(&payload.new_password, config.bcrypt_cost)?;
    db.set_password(&id, &hashed_password).await?;
    info!("Password changed for {}", account.email);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Password updated successfully" })))
}

pub async fn update_avatar(
    user: AuthUser,
    db: web::Data<MongoDB>,
    payload: web::Json<AvatarRequest>,
) -> AppResult<HttpResponse> {
    let id = user.object_id()?;
    let (set, unset) = match payload.avatar_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            validation::validate_avatar(url)?;
            (doc! { "avatar_url": url }, Document::new())
        }
        _ => (Document::new(), doc! { "avatar_url": "" }),
    };
    let updated = db.update_user_fields(&id, set, unset).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

pub async fn delete_account(
    user: AuthUser,
    db: web::Data<MongoDB>,
    payload: web::Json<DeleteAccountRequest>,
) -> AppResult<HttpResponse> {
    if payload.confirm.trim() != "DELETE" {
        return Err(AppError::invalid_field("confirm", "Type DELETE to confirm"));
    }

    let id = user.object_id()?;
    let account = db.get_user(&id).await?;
    if account.has_password() {
        let password = payload.password.as_deref().unwrap_or("");
        if password.is_empty() || !bcrypt::verify(password, &account.password)? {
            return Err(AppError::invalid_field("password", "Password is incorrect"));
        }
    }

    let cancelled = db.cancel_user_bookings(&id).await?;
    db.delete_user(&id).await?;
    info!(
        "User {} deleted their account ({} active booking(s) cancelled)",
        account.email, cancelled
    );

    let mut cookie = Cookie::build(ACCESS_COOKIE, "").path("/").finish();
    cookie.make_removal();
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true, "message": "Account deleted successfully" })))
}

pub async fn list_users(
    user: AuthUser,
    db: web::Data<MongoDB>,
    query: web::Query<UserListQuery>,
) -> AppResult<HttpResponse> {
    user.require_staff()?;
    let role = query.role.as_deref().map(Role::normalize);
    let users: Vec<UserResponse> = db
        .list_users(role)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    user.require_staff()?;
    let id = MongoDB::string_to_id(&path.into_inner(), "User")?;
    Ok(HttpResponse::Ok().json(UserResponse::from(db.get_user(&id).await?)))
}

/// Role and activation changes an admin may not apply to their own account.
fn check_self_edit(admin: &AuthUser, target: &User, role: Role, is_active: bool) -> AppResult<()> {
    let is_self = target.id.map(|id| id.to_hex()) == Some(admin.id.clone());
    if is_self && (role != Role::Admin || !is_active) {
        return Err(AppError::Forbidden(
            "Admins cannot demote or deactivate their own account".to_string(),
        ));
    }
    Ok(())
}

pub async fn admin_update_user(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    user.require(&[Role::Admin])?;
    let mut req = parse_sanitized::<AdminUpdateUserRequest>(payload.into_inner())?;
    req.profile = normalized(req.profile);

    let id = MongoDB::string_to_id(&path.into_inner(), "User")?;
    let target = db.get_user(&id).await?;

    let role = req.role.as_deref().map(Role::normalize).unwrap_or(target.role);
    let is_active = req.is_active.unwrap_or(target.is_active);
    check_self_edit(&user, &target, role, is_active)?;

    validation::validate_profile_update(role, &req.profile, target.driver.as_ref(), today())?;

    let (mut set, mut unset) = profile_changes(&req.profile, target.driver.as_ref())?;
    set.insert("role", role.as_str());
    set.insert("is_active", is_active);
    if role != Role::Driver && target.driver.is_some() {
        unset.insert("driver", "");
    }
    if role != Role::Support && target.department.is_some() {
        unset.insert("department", "");
    }

    let updated = db.update_user_fields(&id, set, unset).await?;
    info!(
        "Admin {} updated user {} (role {}, active {})",
        user.id, updated.email, updated.role, updated.is_active
    );
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

pub async fn admin_delete_user(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    user.require(&[Role::Admin])?;
    let id = MongoDB::string_to_id(&path.into_inner(), "User")?;
    if id.to_hex() == user.id {
        return Err(AppError::BadRequest(
            "Use account deletion to remove your own account".to_string(),
        ));
    }

    let cancelled = db.cancel_user_bookings(&id).await?;
    db.delete_user(&id).await?;
    info!("Admin {} deleted user {} ({} booking(s) cancelled)", user.id, id, cancelled);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "User deleted" })))
}
