use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::error::AuthError;
use super::jwt::{Claims, TokenManager, TokenPair, TokenType};
use super::password::{hash_password, verify_dummy, verify_password};
use crate::account::{
    Email, NewUser, Phone, ProfileChanges, User, UserProfile, UserRepository, UserRole, Username,
    validate_password_strength,
};

/// User Registration Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "Passw0rd")]
    pub password: String,
    #[schema(example = "13812345678")]
    pub phone: Option<String>,
    pub real_name: Option<String>,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    /// Username, email or phone
    #[schema(example = "alice")]
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[schema(example = "Passw0rd")]
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Profile update; omitted fields are left unchanged
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 255))]
    pub avatar: Option<String>,
    #[validate(length(max = 50))]
    pub real_name: Option<String>,
    #[schema(example = "13912345678")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[schema(example = "N3wPassword")]
    pub new_password: String,
}

/// Login / refresh response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

pub struct UserAuthService {
    db: PgPool,
    tokens: Arc<TokenManager>,
}

impl UserAuthService {
    pub fn new(db: PgPool, tokens: Arc<TokenManager>) -> Self {
        Self { db, tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Register a new active user with zero balance
    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile, AuthError> {
        let username = Username::new(&req.username)?;
        let email = Email::new(&req.email)?;
        let phone = match req.phone.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Some(Phone::new(p)?),
            _ => None,
        };
        validate_password_strength(&req.password)?;

        if UserRepository::username_exists(&self.db, username.as_str()).await? {
            return Err(AuthError::UsernameTaken);
        }
        if UserRepository::email_exists(&self.db, email.as_str()).await? {
            return Err(AuthError::EmailTaken);
        }
        if let Some(ref phone) = phone {
            if UserRepository::phone_taken(&self.db, phone.as_str(), None).await? {
                return Err(AuthError::PhoneTaken);
            }
        }

        let password_hash = hash_password(&req.password)?;
        let real_name = req.real_name.as_deref().unwrap_or_default().trim();
        // Uniqueness races between the checks above and this insert surface as 23505 -> Duplicate
        let user = UserRepository::create(
            &self.db,
            &NewUser {
                username: username.as_str(),
                email: email.as_str(),
                password_hash: &password_hash,
                phone: phone.as_ref().map(Phone::as_str),
                real_name,
                role: UserRole::User,
            },
        )
        .await?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(UserProfile::from(&user))
    }

    /// Login with username, email or phone
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let ident = req.username.trim();
        let Some(user) = UserRepository::find_by_login(&self.db, ident).await? else {
            verify_dummy(&req.password);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&req.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.tokens.issue_pair(&user)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            tokens,
            user: UserProfile::from(&user),
        })
    }

    /// Exchange a refresh token for a new pair. The user must still exist and
    /// be active.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;
        let user = self.active_user(&claims).await?;
        let tokens = self.tokens.issue_pair(&user)?;
        Ok(LoginResponse {
            tokens,
            user: UserProfile::from(&user),
        })
    }

    /// Load the user behind a token, rejecting deleted or disabled accounts
    pub async fn active_user(&self, claims: &Claims) -> Result<User, AuthError> {
        let user = UserRepository::get_by_id(&self.db, claims.user_id())
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active() {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AuthError> {
        let user = UserRepository::get_by_id(&self.db, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserProfile::from(&user))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, AuthError> {
        let phone = match req.phone.as_deref() {
            Some(p) => {
                let phone = Phone::new(p)?;
                if UserRepository::phone_taken(&self.db, phone.as_str(), Some(user_id)).await? {
                    return Err(AuthError::PhoneTaken);
                }
                Some(phone)
            }
            None => None,
        };

        let changes = ProfileChanges {
            avatar: req.avatar.as_deref().map(str::trim),
            real_name: req.real_name.as_deref().map(str::trim),
            phone: phone.as_ref().map(Phone::as_str),
        };
        let user = UserRepository::update_profile(&self.db, user_id, &changes)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        tracing::info!(user_id, "profile updated");
        Ok(UserProfile::from(&user))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        req: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let user = UserRepository::get_by_id(&self.db, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !verify_password(&req.old_password, &user.password_hash) {
            return Err(AuthError::OldPasswordMismatch);
        }
        validate_password_strength(&req.new_password)?;

        let password_hash = hash_password(&req.new_password)?;
        if !UserRepository::update_password(&self.db, user_id, &password_hash).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::Database;

    async fn service() -> UserAuthService {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = Database::connect(&url, 5).await.expect("connect");
        db.migrate().await.expect("migrate");
        let tokens = Arc::new(TokenManager::new(&AuthConfig {
            jwt_secret: "0123456789abcdef0123".to_string(),
            ..AuthConfig::default()
        }));
        UserAuthService::new(db.pool().clone(), tokens)
    }

    fn unique_name() -> String {
        format!("u{}", &ulid::Ulid::new().to_string()[16..]).to_lowercase()
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_register_login_refresh() {
        let svc = service().await;
        let name = unique_name();
        let profile = svc
            .register(RegisterRequest {
                username: name.clone(),
                email: format!("{}@example.com", name),
                password: "Passw0rd".to_string(),
                phone: None,
                real_name: Some("Test User".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(profile.real_name, "T**r");

        let dup = svc
            .register(RegisterRequest {
                username: name.clone(),
                email: format!("other-{}@example.com", name),
                password: "Passw0rd".to_string(),
                phone: None,
                real_name: None,
            })
            .await;
        assert!(matches!(dup, Err(AuthError::UsernameTaken)));

        let wrong = svc
            .login(LoginRequest {
                username: name.clone(),
                password: "WrongPass1".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let login = svc
            .login(LoginRequest {
                username: format!("{}@example.com", name),
                password: "Passw0rd".to_string(),
            })
            .await
            .unwrap();
        let refreshed = svc.refresh(&login.tokens.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, login.user.id);
        assert!(svc.refresh(&login.tokens.access_token).await.is_err());
    }
}
