//! Shared setup for the PostgreSQL-backed integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cloud_reseller::account::{NewUser, UserRepository, UserRole};
use cloud_reseller::db::Database;
use cloud_reseller::instance::{InstanceService, ServerRepository};
use cloud_reseller::order::{OrderStatus, Provisioner, PurchaseRequest, PurchaseService};
use cloud_reseller::provider::{
    CloudProvider, CreateInstanceRequest, CreateInstanceResponse, Image, ImageFilter,
    InstanceList, InstanceSnapshot, InstanceType, ListInstancesRequest, MetricSeries,
    MetricsRequest, ProviderError, ProviderRegistry, ProviderSettings, Region,
    TencentLighthouseProvider,
};

pub const PASSWORD: &str = "Str0ngPassw0rd";

pub fn tencent() -> TencentLighthouseProvider {
    TencentLighthouseProvider::new(ProviderSettings {
        secret_id: "id".into(),
        secret_key: "key".into(),
        ..ProviderSettings::default()
    })
    .unwrap()
}

/// Tencent simulator with knobs for failure and latency
#[derive(Debug)]
pub struct ScriptedVendor {
    pub inner: TencentLighthouseProvider,
    pub fail_create: bool,
    /// Hand out this id instead of creating an instance
    pub reuse_instance_id: Option<String>,
    /// Applied at the vendor first, reported back after the delay
    pub restart_lag: Duration,
    /// Delay before the vendor applies the stop
    pub stop_lag: Duration,
    pub deleted: Mutex<Vec<String>>,
}

impl ScriptedVendor {
    pub fn new() -> Self {
        Self {
            inner: tencent(),
            fail_create: false,
            reuse_instance_id: None,
            restart_lag: Duration::ZERO,
            stop_lag: Duration::ZERO,
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudProvider for ScriptedVendor {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn code(&self) -> &str {
        self.inner.code()
    }
    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
    ) -> Result<CreateInstanceResponse, ProviderError> {
        if self.fail_create {
            return Err(ProviderError::Rejected {
                code: "ResourceInsufficient".into(),
                message: "sold out".into(),
            });
        }
        if let Some(id) = &self.reuse_instance_id {
            return Ok(CreateInstanceResponse {
                instance_id: id.clone(),
                vendor_order_id: "deal-reused".into(),
            });
        }
        self.inner.create_instance(req).await
    }
    async fn delete_instance(&self, id: &str) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(id.to_string());
        self.inner.delete_instance(id).await
    }
    async fn start_instance(&self, id: &str) -> Result<(), ProviderError> {
        self.inner.start_instance(id).await
    }
    async fn stop_instance(&self, id: &str) -> Result<(), ProviderError> {
        tokio::time::sleep(self.stop_lag).await;
        self.inner.stop_instance(id).await
    }
    async fn restart_instance(&self, id: &str) -> Result<(), ProviderError> {
        let result = self.inner.restart_instance(id).await;
        tokio::time::sleep(self.restart_lag).await;
        result
    }
    async fn describe_instance(&self, id: &str) -> Result<InstanceSnapshot, ProviderError> {
        self.inner.describe_instance(id).await
    }
    async fn list_instances(&self, req: &ListInstancesRequest) -> Result<InstanceList, ProviderError> {
        self.inner.list_instances(req).await
    }
    async fn instance_metrics(&self, req: &MetricsRequest) -> Result<MetricSeries, ProviderError> {
        self.inner.instance_metrics(req).await
    }
    async fn reset_password(&self, id: &str, pw: &str) -> Result<(), ProviderError> {
        self.inner.reset_password(id, pw).await
    }
    async fn rebuild_instance(&self, id: &str, image: &str, pw: &str) -> Result<(), ProviderError> {
        self.inner.rebuild_instance(id, image, pw).await
    }
    async fn regions(&self) -> Result<Vec<Region>, ProviderError> {
        self.inner.regions().await
    }
    async fn images(&self, filter: &ImageFilter) -> Result<Vec<Image>, ProviderError> {
        self.inner.images(filter).await
    }
    async fn instance_types(&self, region: Option<&str>) -> Result<Vec<InstanceType>, ProviderError> {
        self.inner.instance_types(region).await
    }
}

pub async fn connect() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&url, 10).await.unwrap();
    db.migrate().await.unwrap();
    db
}

/// Fresh user holding `balance`
pub async fn funded_user(db: &Database, balance: Decimal) -> i64 {
    let tag = ulid::Ulid::new().to_string().to_lowercase();
    let username = format!("buyer_{}", &tag[16..]);
    let email = format!("{}@example.com", username);
    let user = UserRepository::create(
        db.pool(),
        &NewUser {
            username: &username,
            email: &email,
            password_hash: "x",
            phone: None,
            real_name: "",
            role: UserRole::User,
        },
    )
    .await
    .unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    UserRepository::adjust_balance(&mut conn, user.id, balance)
        .await
        .unwrap()
        .unwrap();
    user.id
}

/// Seeded 54.00/month bundle
pub async fn product_id(db: &Database) -> i64 {
    sqlx::query_scalar(
        "SELECT pr.id FROM products pr JOIN providers p ON p.id = pr.provider_id \
         WHERE p.code = 'tencent' AND pr.code = 'lighthouse-2c4g'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap()
}

pub fn request(product_id: i64, quantity: u32) -> PurchaseRequest {
    serde_json::from_value(serde_json::json!({
        "product_id": product_id,
        "name": "web",
        "period": 3,
        "quantity": quantity,
        "image_id": "img-ubuntu-20-04",
    }))
    .unwrap()
}

fn registry(adapter: Arc<dyn CloudProvider>) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(adapter);
    Arc::new(registry)
}

pub fn service(db: &Database, adapter: Arc<dyn CloudProvider>) -> PurchaseService {
    let provisioner = Provisioner::new(db.pool().clone(), registry(adapter));
    PurchaseService::new(db.pool().clone(), provisioner).without_auto_provision()
}

/// Purchase and lifecycle services sharing one adapter
pub fn services(
    db: &Database,
    adapter: Arc<dyn CloudProvider>,
) -> (PurchaseService, InstanceService) {
    let providers = registry(adapter);
    let provisioner = Provisioner::new(db.pool().clone(), providers.clone());
    (
        PurchaseService::new(db.pool().clone(), provisioner).without_auto_provision(),
        InstanceService::new(db.pool().clone(), providers),
    )
}

/// Buy one unit and provision it; returns the server id
pub async fn running_server(db: &Database, purchases: &PurchaseService, user_id: i64) -> i64 {
    let receipt = purchases
        .purchase(user_id, request(product_id(db).await, 1))
        .await
        .unwrap();
    let status = purchases
        .provisioner()
        .provision_order(receipt.order_id, PASSWORD)
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Success);
    ServerRepository::list_by_order(db.pool(), receipt.order_id)
        .await
        .unwrap()[0]
        .id
}

pub async fn balance_of(db: &Database, user_id: i64) -> Decimal {
    UserRepository::get_by_id(db.pool(), user_id)
        .await
        .unwrap()
        .unwrap()
        .balance
}
