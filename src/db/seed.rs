//! Startup seeding beyond what the SQL migrations insert

use sqlx::PgPool;

use crate::account::{Email, NewUser, UserRepository, UserRole, Username, validate_password_strength};
use crate::config::BootstrapAdmin;
use crate::user_auth::AuthError;
use crate::user_auth::password::hash_password;

/// Create the configured admin account if its username is free.
/// Returns true when a row was inserted.
pub async fn ensure_bootstrap_admin(
    pool: &PgPool,
    admin: &BootstrapAdmin,
) -> Result<bool, AuthError> {
    let username = Username::new(&admin.username)?;
    let email = Email::new(&admin.email)?;
    validate_password_strength(&admin.password)?;

    if UserRepository::username_exists(pool, username.as_str()).await? {
        tracing::debug!(username = username.as_str(), "bootstrap admin already present");
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)?;
    let user = UserRepository::create(
        pool,
        &NewUser {
            username: username.as_str(),
            email: email.as_str(),
            password_hash: &password_hash,
            phone: None,
            real_name: "Administrator",
            role: UserRole::Admin,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, username = %user.username, "bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_bootstrap_rejected_before_db() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://nobody@127.0.0.1:1/none")
            .unwrap();
        let admin = BootstrapAdmin {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "weak".into(),
        };
        let err = ensure_bootstrap_admin(&pool, &admin).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_bootstrap_is_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        let admin = BootstrapAdmin {
            username: "seed_admin".into(),
            email: "seed_admin@example.com".into(),
            password: "Admin12345".into(),
        };
        ensure_bootstrap_admin(&pool, &admin).await.unwrap();
        assert!(!ensure_bootstrap_admin(&pool, &admin).await.unwrap());
    }
}
