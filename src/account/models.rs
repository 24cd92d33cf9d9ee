//! Data models for user accounts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::mask::{mask_email, mask_phone, mask_real_name};

/// User status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserStatus {
    Active = 1,
    Disabled = 2,
}

impl UserStatus {
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl From<i16> for UserStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => UserStatus::Active,
            _ => UserStatus::Disabled,
        }
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl From<&str> for UserRole {
    /// Unknown roles collapse to `User`
    fn from(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account row. Never serialized directly: use [`UserProfile`] or
/// [`AdminUserView`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub real_name: String,
    pub avatar: String,
    pub status: UserStatus,
    pub role: UserRole,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Fields for a new user row
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub real_name: &'a str,
    pub role: UserRole,
}

/// User as shown to its owner: contact details masked
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "al***e@example.com")]
    pub email: String,
    #[schema(example = "138****5678")]
    pub phone: String,
    pub real_name: String,
    pub avatar: String,
    pub status: UserStatus,
    pub role: UserRole,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: mask_email(&user.email),
            phone: mask_phone(user.phone.as_deref().unwrap_or_default()),
            real_name: mask_real_name(&user.real_name),
            avatar: user.avatar.clone(),
            status: user.status,
            role: user.role,
            balance: user.balance,
            created_at: user.created_at,
        }
    }
}

/// User as listed in the admin console (unmasked, no credentials)
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub real_name: String,
    pub status: UserStatus,
    pub role: UserRole,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for AdminUserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            real_name: user.real_name,
            status: user.status,
            role: user.role,
            balance: user.balance,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice.smith@example.com".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            phone: Some("13812345678".to_string()),
            real_name: "Alice Smith".to_string(),
            avatar: String::new(),
            status: UserStatus::Active,
            role: UserRole::User,
            balance: Decimal::new(10000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_status_from_i16() {
        assert_eq!(UserStatus::from(1), UserStatus::Active);
        assert_eq!(UserStatus::from(2), UserStatus::Disabled);
        assert_eq!(UserStatus::from(99), UserStatus::Disabled);
        assert_eq!(UserStatus::Active.id(), 1);
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("user"), UserRole::User);
        assert_eq!(UserRole::from("root"), UserRole::User);
    }

    #[test]
    fn test_profile_masks_contact_fields() {
        let user = sample_user();
        let profile = UserProfile::from(&user);
        assert_eq!(profile.email, "al***h@example.com");
        assert_eq!(profile.phone, "138****5678");
        assert_eq!(profile.real_name, "A**h");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["status"], "active");
        assert_eq!(json["balance"], "100.00");
    }
}
