//! Append-only operation log
//!
//! Writes never fail the caller: a broken insert is logged and dropped.

use sqlx::PgPool;

/// Status column values
const STATUS_OK: i16 = 1;
const STATUS_FAILED: i16 = 2;

#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub user_id: Option<i64>,
    pub username: &'a str,
    /// Area of the system, e.g. `order`, `server`, `admin`
    pub module: &'a str,
    pub action: &'a str,
    pub content: String,
    pub success: bool,
}

impl<'a> AuditEntry<'a> {
    pub fn new(module: &'a str, action: &'a str, content: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: "",
            module,
            action,
            content: content.into(),
            success: true,
        }
    }

    pub fn by(mut self, user_id: i64, username: &'a str) -> Self {
        self.user_id = Some(user_id);
        self.username = username;
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    fn status(&self) -> i16 {
        if self.success { STATUS_OK } else { STATUS_FAILED }
    }
}

pub async fn record(pool: &PgPool, entry: AuditEntry<'_>) {
    let result = sqlx::query(
        "INSERT INTO operation_logs (user_id, username, module, action, content, status) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.user_id)
    .bind(entry.username)
    .bind(entry.module)
    .bind(entry.action)
    .bind(&entry.content)
    .bind(entry.status())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(
            module = entry.module,
            action = entry.action,
            "failed to write operation log: {}",
            e
        );
    }
}
