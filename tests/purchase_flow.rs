//! Wallet purchase and provisioning against a real PostgreSQL.
//!
//! Run with: `DATABASE_URL=postgresql://... cargo test --test purchase_flow -- --ignored`

mod common;

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;

use cloud_reseller::instance::{ServerRepository, ServerStatus};
use cloud_reseller::order::{OrderRepository, OrderStatus, PurchaseError};

use common::{
    PASSWORD, ScriptedVendor, balance_of, connect, funded_user, product_id, request, service,
    tencent,
};

#[tokio::test]
#[ignore]
async fn test_purchase_debits_and_provisions() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let svc = service(&db, Arc::new(tencent()));

    let receipt = svc.purchase(user_id, request(product_id(&db).await, 2)).await.unwrap();
    // 54.00 x 3 months x 2
    assert_eq!(receipt.pay_amount, Decimal::new(32400, 2));
    assert_eq!(receipt.balance, Decimal::new(67600, 2));
    assert_eq!(receipt.status, OrderStatus::Paid);
    assert_eq!(receipt.server_ids.len(), 2);
    assert!(receipt.initial_password.is_some());

    let status = svc
        .provisioner()
        .provision_order(receipt.order_id, PASSWORD)
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Success);

    let servers = ServerRepository::list_by_order(db.pool(), receipt.order_id).await.unwrap();
    assert_eq!(servers.len(), 2);
    for server in &servers {
        assert!(server.instance_id.starts_with("lhins-"));
        assert_eq!(server.status, ServerStatus::Running);
    }
    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"web-1") && names.contains(&"web-2"));
    assert_eq!(balance_of(&db, user_id).await, Decimal::new(67600, 2));
}

#[tokio::test]
#[ignore]
async fn test_insufficient_balance_leaves_no_trace() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(5000, 2)).await;
    let svc = service(&db, Arc::new(tencent()));

    let err = svc
        .purchase(user_id, request(product_id(&db).await, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PurchaseError::InsufficientBalance { .. }));
    assert_eq!(balance_of(&db, user_id).await, Decimal::new(5000, 2));
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_purchases_never_overdraw() {
    let db = connect().await;
    // Enough for exactly two 162.00 orders
    let user_id = funded_user(&db, Decimal::new(35000, 2)).await;
    let svc = Arc::new(service(&db, Arc::new(tencent())));
    let product = product_id(&db).await;

    let results = join_all((0..6).map(|_| {
        let svc = svc.clone();
        async move { svc.purchase(user_id, request(product, 1)).await }
    }))
    .await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 2);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PurchaseError::InsufficientBalance { .. }))
    );
    assert_eq!(balance_of(&db, user_id).await, Decimal::new(2600, 2));
}

#[tokio::test]
#[ignore]
async fn test_failed_create_refunds_each_unit() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let vendor = ScriptedVendor {
        fail_create: true,
        ..ScriptedVendor::new()
    };
    let svc = service(&db, Arc::new(vendor));

    let receipt = svc.purchase(user_id, request(product_id(&db).await, 2)).await.unwrap();
    let status = svc
        .provisioner()
        .provision_order(receipt.order_id, PASSWORD)
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Failed);

    assert_eq!(balance_of(&db, user_id).await, Decimal::new(100000, 2));
    let servers = ServerRepository::list_by_order(db.pool(), receipt.order_id).await.unwrap();
    assert!(servers.iter().all(|s| s.status == ServerStatus::Error));

    let payments = OrderRepository::payments_for_order(db.pool(), receipt.order_id)
        .await
        .unwrap();
    let refunds: Vec<_> = payments.iter().filter(|p| p.amount < Decimal::ZERO).collect();
    assert_eq!(refunds.len(), 2);
    let net: Decimal = payments.iter().map(|p| p.amount).sum();
    assert_eq!(net, Decimal::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_provisioning_runs_once() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let svc = service(&db, Arc::new(tencent()));

    let receipt = svc.purchase(user_id, request(product_id(&db).await, 1)).await.unwrap();
    let provisioner = svc.provisioner();
    assert_eq!(
        provisioner.provision_order(receipt.order_id, PASSWORD).await.unwrap(),
        OrderStatus::Success
    );
    // Already past `paid`: left alone
    assert_eq!(
        provisioner.provision_order(receipt.order_id, PASSWORD).await.unwrap(),
        OrderStatus::Success
    );
    let servers = ServerRepository::list_by_order(db.pool(), receipt.order_id).await.unwrap();
    assert_eq!(servers.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_unrecorded_instance_is_released_and_refunded() {
    let db = connect().await;
    let user_id = funded_user(&db, Decimal::new(100000, 2)).await;
    let first = service(&db, Arc::new(tencent()));
    let receipt = first.purchase(user_id, request(product_id(&db).await, 1)).await.unwrap();
    first.provisioner().provision_order(receipt.order_id, PASSWORD).await.unwrap();
    let taken = ServerRepository::list_by_order(db.pool(), receipt.order_id)
        .await
        .unwrap()[0]
        .instance_id
        .clone();

    // The vendor hands back an id another row already holds
    let vendor = Arc::new(ScriptedVendor {
        reuse_instance_id: Some(taken.clone()),
        ..ScriptedVendor::new()
    });
    let svc = service(&db, vendor.clone());
    let before = balance_of(&db, user_id).await;
    let receipt = svc.purchase(user_id, request(product_id(&db).await, 1)).await.unwrap();
    let status = svc
        .provisioner()
        .provision_order(receipt.order_id, PASSWORD)
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Failed);
    assert_eq!(vendor.deleted(), vec![taken]);
    assert_eq!(balance_of(&db, user_id).await, before);

    let servers = ServerRepository::list_by_order(db.pool(), receipt.order_id).await.unwrap();
    assert_eq!(servers[0].status, ServerStatus::Error);
    assert!(!servers[0].is_provisioned());
}
