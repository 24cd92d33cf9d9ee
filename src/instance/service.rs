//! Server listing and lifecycle delegation

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use thiserror::Error;

use super::models::{ServerStatus, ServerView};
use super::repository::ServerRepository;
use crate::account::UserRepository;
use crate::audit::{self, AuditEntry};
use crate::gateway::types::{ApiError, Page, PageWindow, error_codes, response::status_from_u16};
use crate::provider::{ProviderError, ProviderRegistry};

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Server not found")]
    NotFound,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Server has expired")]
    Expired,

    #[error("Server is still being provisioned")]
    NotProvisioned,

    #[error("Cannot {action} a server that is {status}")]
    InvalidState {
        action: &'static str,
        status: ServerStatus,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl InstanceError {
    pub fn code(&self) -> &'static str {
        match self {
            InstanceError::NotFound => "SERVER_NOT_FOUND",
            InstanceError::AccountDisabled => "ACCOUNT_DISABLED",
            InstanceError::Expired => "SERVER_EXPIRED",
            InstanceError::NotProvisioned => "SERVER_NOT_PROVISIONED",
            InstanceError::InvalidState { .. } => "INVALID_STATE",
            InstanceError::Provider(e) => e.code(),
            InstanceError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<InstanceError> for ApiError {
    fn from(err: InstanceError) -> Self {
        match err {
            InstanceError::NotFound => ApiError::not_found(err.to_string()),
            InstanceError::AccountDisabled => {
                ApiError::forbidden(err.to_string()).with_code(error_codes::ACCOUNT_DISABLED)
            }
            InstanceError::Expired
            | InstanceError::NotProvisioned
            | InstanceError::InvalidState { .. } => ApiError::new(
                status_from_u16(409),
                error_codes::INVALID_STATE,
                err.to_string(),
            ),
            InstanceError::Provider(e) => e.into(),
            InstanceError::Database(e) => {
                tracing::error!(error = %e, "server query failed");
                ApiError::internal("Internal server error")
            }
        }
    }
}

/// Power operations a user may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        }
    }

    /// Status the server must be in for the action to be accepted
    pub fn required_status(&self) -> ServerStatus {
        match self {
            LifecycleAction::Start => ServerStatus::Stopped,
            LifecycleAction::Stop | LifecycleAction::Restart => ServerStatus::Running,
        }
    }

    pub fn resulting_status(&self) -> ServerStatus {
        match self {
            LifecycleAction::Start | LifecycleAction::Restart => ServerStatus::Running,
            LifecycleAction::Stop => ServerStatus::Stopped,
        }
    }
}

#[derive(Clone)]
pub struct InstanceService {
    db: PgPool,
    providers: Arc<ProviderRegistry>,
}

impl InstanceService {
    pub fn new(db: PgPool, providers: Arc<ProviderRegistry>) -> Self {
        Self { db, providers }
    }

    pub async fn list(
        &self,
        user_id: i64,
        window: PageWindow,
    ) -> Result<Page<ServerView>, InstanceError> {
        let (items, total) = ServerRepository::list_by_user(&self.db, user_id, window).await?;
        Ok(Page::new(items, total, window))
    }

    pub async fn detail(&self, user_id: i64, server_id: i64) -> Result<ServerView, InstanceError> {
        ServerRepository::get_owned(&self.db, server_id, user_id)
            .await?
            .ok_or(InstanceError::NotFound)
    }

    /// Lock the server row for the rest of `conn`'s transaction and check
    /// that it may be managed: active owner, unexpired and provisioned.
    /// A server found past its expiry is marked `expired`; commit the
    /// transaction even on error to keep that mark.
    async fn lock_manageable(
        conn: &mut PgConnection,
        user_id: i64,
        server_id: i64,
    ) -> Result<ServerView, InstanceError> {
        match UserRepository::get_by_id(&mut *conn, user_id).await? {
            Some(user) if user.is_active() => {}
            _ => return Err(InstanceError::AccountDisabled),
        }
        let view = ServerRepository::lock_owned(&mut *conn, server_id, user_id)
            .await?
            .ok_or(InstanceError::NotFound)?;
        let server = &view.server;
        if server.status == ServerStatus::Expired {
            return Err(InstanceError::Expired);
        }
        if server.is_expired_at(Utc::now()) {
            ServerRepository::set_status(&mut *conn, server.id, ServerStatus::Expired).await?;
            tracing::info!(server_id = server.id, "server marked expired");
            return Err(InstanceError::Expired);
        }
        if !server.is_provisioned() {
            return Err(InstanceError::NotProvisioned);
        }
        Ok(view)
    }

    /// Start, stop or restart. The row lock is held across the vendor call,
    /// so commands on one server apply in the order they won the lock and
    /// the stored status follows the vendor.
    pub async fn perform(
        &self,
        user_id: i64,
        username: &str,
        server_id: i64,
        action: LifecycleAction,
    ) -> Result<ServerView, InstanceError> {
        let mut tx = self.db.begin().await?;
        let view = match Self::lock_manageable(&mut tx, user_id, server_id).await {
            Ok(view) => view,
            Err(e) => {
                tx.commit().await?;
                return Err(e);
            }
        };
        let server = &view.server;
        if server.status != action.required_status() {
            return Err(InstanceError::InvalidState {
                action: action.as_str(),
                status: server.status,
            });
        }

        let adapter = self.providers.get(&view.provider_code)?;
        let result = match action {
            LifecycleAction::Start => adapter.start_instance(&server.instance_id).await,
            LifecycleAction::Stop => adapter.stop_instance(&server.instance_id).await,
            LifecycleAction::Restart => adapter.restart_instance(&server.instance_id).await,
        };

        let entry = AuditEntry::new(
            "server",
            action.as_str(),
            format!("server {} ({})", server.id, server.instance_id),
        )
        .by(user_id, username);
        if let Err(e) = result {
            tx.rollback().await?;
            audit::record(&self.db, entry.failed()).await;
            return Err(e.into());
        }

        ServerRepository::set_status(&mut *tx, server.id, action.resulting_status()).await?;
        tx.commit().await?;
        audit::record(&self.db, entry).await;
        tracing::info!(
            server_id = server.id,
            instance_id = %server.instance_id,
            action = action.as_str(),
            "server lifecycle action applied"
        );

        self.detail(user_id, server_id).await
    }

    /// Pull the vendor's view of the instance into the local row
    pub async fn sync(&self, user_id: i64, server_id: i64) -> Result<ServerView, InstanceError> {
        let mut tx = self.db.begin().await?;
        let view = match Self::lock_manageable(&mut tx, user_id, server_id).await {
            Ok(view) => view,
            Err(e) => {
                tx.commit().await?;
                return Err(e);
            }
        };
        let adapter = self.providers.get(&view.provider_code)?;
        let snapshot = adapter.describe_instance(&view.server.instance_id).await?;
        ServerRepository::apply_snapshot(
            &mut *tx,
            view.server.id,
            &snapshot,
            ServerStatus::from_instance_state(snapshot.state),
        )
        .await?;
        tx.commit().await?;
        self.detail(user_id, server_id).await
    }
}
