//! Repository layer for user rows

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgExecutor, PgPool, Row};

use super::models::{NewUser, User, UserRole, UserStatus};
use crate::gateway::types::PageWindow;

const USER_COLUMNS: &str = "id, username, email, password_hash, phone, real_name, avatar, \
                            status, role, balance, created_at, updated_at";

fn map_user(r: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: r.try_get("id")?,
        username: r.try_get("username")?,
        email: r.try_get("email")?,
        password_hash: r.try_get("password_hash")?,
        phone: r.try_get("phone")?,
        real_name: r.try_get("real_name")?,
        avatar: r.try_get("avatar")?,
        status: UserStatus::from(r.try_get::<i16, _>("status")?),
        role: UserRole::from(r.try_get::<&str, _>("role")?),
        balance: r.try_get("balance")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

/// Profile fields to change; `None` leaves the column untouched
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges<'a> {
    pub avatar: Option<&'a str>,
    pub real_name: Option<&'a str>,
    pub phone: Option<&'a str>,
}

/// User repository for CRUD operations
pub struct UserRepository;

impl UserRepository {
    /// Get user by ID
    pub async fn get_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        user_id: i64,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(exec)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    /// Find a user by username, email or phone. An exact username match wins
    /// when the identifier happens to match several rows.
    pub async fn find_by_login(pool: &PgPool, ident: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 OR phone = $1 \
             ORDER BY (username = $1) DESC, id LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(ident)
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Whether `phone` belongs to a user other than `exclude_user_id`
    pub async fn phone_taken(
        pool: &PgPool,
        phone: &str,
        exclude_user_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(phone)
        .bind(exclude_user_id)
        .fetch_one(pool)
        .await
    }

    /// Create a new active user with zero balance
    pub async fn create(pool: &PgPool, new_user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, phone, real_name, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new_user.username)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.phone)
            .bind(new_user.real_name)
            .bind(new_user.role.as_str())
            .bind(UserStatus::Active.id())
            .fetch_one(pool)
            .await?;
        map_user(&row)
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: i64,
        changes: &ProfileChanges<'_>,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET avatar = COALESCE($2, avatar), real_name = COALESCE($3, real_name), \
             phone = COALESCE($4, phone), updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(changes.avatar)
            .bind(changes.real_name)
            .bind(changes.phone)
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn update_password(
        pool: &PgPool,
        user_id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(password_hash)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_status(
        pool: &PgPool,
        user_id: i64,
        status: UserStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(status.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lock the user row for the rest of the transaction
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    /// Add `delta` (may be negative) to the balance. Returns the new balance,
    /// or `None` when the user is missing or the result would go below zero.
    pub async fn adjust_balance(
        conn: &mut PgConnection,
        user_id: i64,
        delta: Decimal,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        sqlx::query_scalar::<_, Decimal>(
            "UPDATE users SET balance = balance + $2, updated_at = NOW() \
             WHERE id = $1 AND balance + $2 >= 0 RETURNING balance",
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(conn)
        .await
    }

    /// Keyword search over username, email and real name, newest first
    pub async fn search(
        pool: &PgPool,
        keyword: Option<&str>,
        window: PageWindow,
    ) -> Result<(Vec<User>, i64), sqlx::Error> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{}%", k));
        let filter = "($1::TEXT IS NULL OR username ILIKE $1 OR email ILIKE $1 OR real_name ILIKE $1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {}", filter))
            .bind(pattern.as_deref())
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            USER_COLUMNS, filter
        );
        let rows = sqlx::query(&sql)
            .bind(pattern.as_deref())
            .bind(window.limit())
            .bind(window.offset())
            .fetch_all(pool)
            .await?;
        let users = rows.iter().map(map_user).collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }
}
