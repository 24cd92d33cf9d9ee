//! Server power operations and sync against a real PostgreSQL.
//!
//! Run with: `DATABASE_URL=postgresql://... cargo test --test server_lifecycle -- --ignored`

mod common;

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use cloud_reseller::account::{UserRepository, UserStatus};
use cloud_reseller::db::Database;
use cloud_reseller::instance::{InstanceError, LifecycleAction, ServerRepository, ServerStatus};
use cloud_reseller::provider::CloudProvider;

use common::{ScriptedVendor, connect, funded_user, product_id, request, running_server, services};

async fn stored_status(db: &Database, server_id: i64, user_id: i64) -> ServerStatus {
    ServerRepository::get_owned(db.pool(), server_id, user_id)
        .await
        .unwrap()
        .unwrap()
        .server
        .status
}

async fn log_count(db: &Database, user_id: i64, action: &str, status: i16) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM operation_logs \
         WHERE user_id = $1 AND module = 'server' AND action = $2 AND status = $3",
    )
    .bind(user_id)
    .bind(action)
    .bind(status)
    .fetch_one(db.pool())
    .await
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_stop_persists_status_and_logs() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let vendor = Arc::new(ScriptedVendor::new());
    let (purchases, servers) = services(&db, vendor.clone());
    let server_id = running_server(&db, &purchases, user_id).await;

    let view = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Stop)
        .await
        .unwrap();
    assert_eq!(view.server.status, ServerStatus::Stopped);
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Stopped);
    let snapshot = vendor.describe_instance(&view.server.instance_id).await.unwrap();
    assert_eq!(
        ServerStatus::from_instance_state(snapshot.state),
        Some(ServerStatus::Stopped)
    );
    assert_eq!(log_count(&db, user_id, "stop", 1).await, 1);

    let view = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Start)
        .await
        .unwrap();
    assert_eq!(view.server.status, ServerStatus::Running);
    assert_eq!(log_count(&db, user_id, "start", 1).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_start_on_running_server_rejected() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let (purchases, servers) = services(&db, Arc::new(ScriptedVendor::new()));
    let server_id = running_server(&db, &purchases, user_id).await;

    let err = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Start)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InstanceError::InvalidState {
            action: "start",
            status: ServerStatus::Running
        }
    ));
    assert_eq!(log_count(&db, user_id, "start", 1).await, 0);
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Running);
}

#[tokio::test]
#[ignore]
async fn test_other_users_server_is_not_found() {
    let db = connect().await;
    let owner = funded_user(&db, Decimal::new(100000, 2)).await;
    let stranger = funded_user(&db, Decimal::ZERO).await;
    let (purchases, servers) = services(&db, Arc::new(ScriptedVendor::new()));
    let server_id = running_server(&db, &purchases, owner).await;

    let err = servers
        .perform(stranger, "stranger", server_id, LifecycleAction::Stop)
        .await
        .unwrap_err();
    assert!(matches!(err, InstanceError::NotFound));
    assert!(matches!(
        servers.sync(stranger, server_id).await.unwrap_err(),
        InstanceError::NotFound
    ));
    assert!(matches!(
        servers.detail(stranger, server_id).await.unwrap_err(),
        InstanceError::NotFound
    ));
    assert_eq!(stored_status(&db, server_id, owner).await, ServerStatus::Running);
}

#[tokio::test]
#[ignore]
async fn test_expired_server_is_marked_and_rejected() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let (purchases, servers) = services(&db, Arc::new(ScriptedVendor::new()));
    let server_id = running_server(&db, &purchases, user_id).await;
    sqlx::query("UPDATE servers SET expire_time = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(server_id)
        .execute(db.pool())
        .await
        .unwrap();

    let err = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Stop)
        .await
        .unwrap_err();
    assert!(matches!(err, InstanceError::Expired));
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Expired);

    // Still refused once marked
    assert!(matches!(
        servers.sync(user_id, server_id).await.unwrap_err(),
        InstanceError::Expired
    ));
}

#[tokio::test]
#[ignore]
async fn test_unprovisioned_server_rejected() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let (purchases, servers) = services(&db, Arc::new(ScriptedVendor::new()));
    let receipt = purchases
        .purchase(user_id, request(product_id(&db).await, 1))
        .await
        .unwrap();
    let server_id = receipt.server_ids[0];

    let err = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Start)
        .await
        .unwrap_err();
    assert!(matches!(err, InstanceError::NotProvisioned));
    assert!(matches!(
        servers.sync(user_id, server_id).await.unwrap_err(),
        InstanceError::NotProvisioned
    ));
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Creating);
}

#[tokio::test]
#[ignore]
async fn test_disabled_owner_rejected() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let (purchases, servers) = services(&db, Arc::new(ScriptedVendor::new()));
    let server_id = running_server(&db, &purchases, user_id).await;
    UserRepository::set_status(db.pool(), user_id, UserStatus::Disabled)
        .await
        .unwrap();

    let err = servers
        .perform(user_id, "tester", server_id, LifecycleAction::Stop)
        .await
        .unwrap_err();
    assert!(matches!(err, InstanceError::AccountDisabled));
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Running);
}

#[tokio::test]
#[ignore]
async fn test_sync_pulls_vendor_state() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let vendor = Arc::new(ScriptedVendor::new());
    let (purchases, servers) = services(&db, vendor.clone());
    let server_id = running_server(&db, &purchases, user_id).await;
    let view = servers.detail(user_id, server_id).await.unwrap();

    // Stopped behind our back, e.g. from the vendor console
    vendor.stop_instance(&view.server.instance_id).await.unwrap();
    let view = servers.sync(user_id, server_id).await.unwrap();
    assert_eq!(view.server.status, ServerStatus::Stopped);
    assert_eq!(stored_status(&db, server_id, user_id).await, ServerStatus::Stopped);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_commands_keep_status_in_step_with_vendor() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let vendor = Arc::new(ScriptedVendor {
        restart_lag: Duration::from_millis(150),
        stop_lag: Duration::from_millis(20),
        ..ScriptedVendor::new()
    });
    let (purchases, servers) = services(&db, vendor.clone());
    let server_id = running_server(&db, &purchases, user_id).await;

    let (restart, stop) = tokio::join!(
        servers.perform(user_id, "tester", server_id, LifecycleAction::Restart),
        servers.perform(user_id, "tester", server_id, LifecycleAction::Stop),
    );
    assert!(restart.is_ok() || stop.is_ok());
    for result in [&restart, &stop] {
        if let Err(e) = result {
            assert!(matches!(e, InstanceError::InvalidState { .. }), "{}", e);
        }
    }

    let view = servers.detail(user_id, server_id).await.unwrap();
    let snapshot = vendor.describe_instance(&view.server.instance_id).await.unwrap();
    assert_eq!(
        Some(view.server.status),
        ServerStatus::from_instance_state(snapshot.state)
    );
}
