use serde::{Deserialize, Serialize};

use super::user::DriverDetails;

/// Partial profile edit. `None` leaves a field untouched; an empty string clears it.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub nic: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub driver: Option<DriverDetails>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AdminUpdateUserRequest {
    #[serde(flatten)]
    pub profile: UpdateProfileRequest,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    /// Not required for Google accounts setting their first password.
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Serialize, Deserialize)]
pub struct AvatarRequest {
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub password: Option<String>,
    pub confirm: String,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub role: Option<String>,
}
