use std::fmt;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Account role. Stored lowercase; legacy spellings are normalized on read.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    #[default]
    Passenger,
    Driver,
    Admin,
    Support,
}

impl Role {
    /// Maps free-form role strings (`"user"`, `"Bus Driver"`, `"administrator"`...)
    /// onto a known role. Unknown values fall back to passenger.
    pub fn normalize(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match key.as_str() {
            "driver" | "bus_driver" => Role::Driver,
            "admin" | "administrator" | "super_admin" | "superadmin" => Role::Admin,
            "support" | "support_agent" | "customer_support" | "agent" => Role::Support,
            _ => Role::Passenger,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Passenger => "passenger",
            Role::Driver => "driver",
            Role::Admin => "admin",
            Role::Support => "support",
        }
    }

    /// Where the frontend sends the user after a successful login.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Passenger => "/passenger/dashboard",
            Role::Driver => "/driver/dashboard",
            Role::Admin => "/admin/dashboard",
            Role::Support => "/support/dashboard",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Support)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::normalize(&raw)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Local,
    Google,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DriverLicense {
    pub number: String,
    pub class: String,
    pub expiry_date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub plate_number: String,
    pub model: String,
    pub capacity: i32,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScheduleSlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub route_from: Option<String>,
    #[serde(default)]
    pub route_to: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DriverDetails {
    #[serde(default)]
    pub license: Option<DriverLicense>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub schedule: Option<Vec<ScheduleSlot>>,
}

impl DriverDetails {
    pub fn is_complete(&self) -> bool {
        self.license.is_some()
            && self.vehicle.is_some()
            && self.schedule.as_ref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PasswordReset {
    pub token_hash: String,
    pub expires_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub auth_provider: AuthProvider,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub nic: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub driver: Option<DriverDetails>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub password_reset: Option<PasswordReset>,
    #[serde(default)]
    pub last_login: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn active_by_default() -> bool {
    true
}

impl User {
    pub fn new(username: &str, email: &str, password_hash: String, role: Role) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password: password_hash,
            role,
            auth_provider: AuthProvider::Local,
            full_name: None,
            phone: None,
            nic: None,
            address: None,
            avatar_url: None,
            department: None,
            driver: None,
            is_active: true,
            password_reset: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Google-only accounts have no local password to check.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Public view of a user; never carries the password hash or reset token.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub auth_provider: AuthProvider,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub nic: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverDetails>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            username: user.username,
            email: user.email,
            role: user.role,
            auth_provider: user.auth_provider,
            full_name: user.full_name,
            phone: user.phone,
            nic: user.nic,
            address: user.address,
            avatar_url: user.avatar_url,
            department: user.department,
            driver: user.driver,
            is_active: user.is_active,
            created_at: user.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_legacy_and_mixed_case_roles() {
        assert_eq!(Role::normalize("user"), Role::Passenger);
        assert_eq!(Role::normalize("Customer"), Role::Passenger);
        assert_eq!(Role::normalize("  DRIVER "), Role::Driver);
        assert_eq!(Role::normalize("Bus Driver"), Role::Driver);
        assert_eq!(Role::normalize("Administrator"), Role::Admin);
        assert_eq!(Role::normalize("super-admin"), Role::Admin);
        assert_eq!(Role::normalize("Customer Support"), Role::Support);
        assert_eq!(Role::normalize("support_agent"), Role::Support);
        assert_eq!(Role::normalize("pilot"), Role::Passenger);
        assert_eq!(Role::normalize(""), Role::Passenger);
    }

    #[test]
    fn each_role_has_its_own_dashboard() {
        assert_eq!(Role::Passenger.dashboard_path(), "/passenger/dashboard");
        assert_eq!(Role::Driver.dashboard_path(), "/driver/dashboard");
        assert_eq!(Role::Admin.dashboard_path(), "/admin/dashboard");
        assert_eq!(Role::Support.dashboard_path(), "/support/dashboard");
    }

    #[test]
    fn role_round_trips_through_json_in_normalized_form() {
        let role: Role = serde_json::from_str("\"Administrator\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"admin\"");
    }

    #[test]
    fn driver_details_need_every_section() {
        let mut details = DriverDetails {
            license: Some(DriverLicense {
                number: "B1234567".into(),
                class: "D".into(),
                expiry_date: "2030-01-01".into(),
            }),
            vehicle: Some(Vehicle {
                plate_number: "NB-1234".into(),
                model: "Ashok Leyland Viking".into(),
                capacity: 54,
                vehicle_type: None,
            }),
            schedule: Some(vec![]),
        };
        assert!(!details.is_complete());
        details.schedule = Some(vec![ScheduleSlot {
            day: "Monday".into(),
            start_time: "06:00".into(),
            end_time: "10:00".into(),
            route_from: None,
            route_to: None,
        }]);
        assert!(details.is_complete());
    }
}
