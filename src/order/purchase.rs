//! Purchase transaction
//!
//! Order creation, balance debit, payment record and server rows commit or
//! roll back together. The user row is locked for the whole transaction, so
//! concurrent purchases by the same user serialize on it and can never
//! overdraw the balance. Vendor calls happen only after commit, in
//! [`Provisioner`](super::provisioning::Provisioner).

use chrono::{Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use validator::Validate;

use super::error::PurchaseError;
use super::models::{OrderStatus, OrderType, PaymentMethod, new_order_no};
use super::provisioning::Provisioner;
use super::repository::{NewOrder, NewPayment, OrderRepository};
use crate::account::{UserRepository, validate_password_strength};
use crate::audit::{self, AuditEntry};
use crate::catalog::CatalogRepository;
use crate::instance::models::NewServer;
use crate::instance::repository::ServerRepository;
use crate::money::{line_amount, pay_amount};
use crate::user_auth::password::{generate_random_password, hash_password};

pub const MAX_PERIOD_MONTHS: u32 = 36;
pub const MAX_QUANTITY: u32 = 10;
const GENERATED_PASSWORD_LEN: usize = 16;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct PurchaseRequest {
    #[schema(example = 2)]
    pub product_id: i64,
    /// Server name; multi-unit orders get `-1`, `-2`, ... suffixes
    #[validate(length(min = 1, max = 60, message = "name must be 1-60 characters"))]
    #[schema(example = "web")]
    pub name: String,
    /// Months
    #[validate(range(min = 1, max = 36, message = "period must be 1-36 months"))]
    #[schema(example = 3)]
    pub period: u32,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 10, message = "quantity must be 1-10"))]
    #[schema(example = 1)]
    pub quantity: u32,
    #[schema(example = "img-ubuntu-20-04")]
    pub image_id: Option<String>,
    /// Instance login password; generated when omitted
    pub password: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseReceipt {
    pub order_id: i64,
    pub order_no: String,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "162.00")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "0.00")]
    pub discount_amount: Decimal,
    #[schema(value_type = String, example = "162.00")]
    pub pay_amount: Decimal,
    /// Balance after the debit
    #[schema(value_type = String, example = "838.00")]
    pub balance: Decimal,
    pub server_ids: Vec<i64>,
    /// Present only when the password was generated; shown once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_password: Option<String>,
}

fn server_name(base: &str, index: u32, quantity: u32) -> String {
    if quantity > 1 {
        format!("{}-{}", base, index + 1)
    } else {
        base.to_string()
    }
}

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    provisioner: Provisioner,
    auto_provision: bool,
}

impl PurchaseService {
    pub fn new(db: PgPool, provisioner: Provisioner) -> Self {
        Self {
            db,
            provisioner,
            auto_provision: true,
        }
    }

    /// Leave provisioning to the caller instead of spawning it after commit
    pub fn without_auto_provision(mut self) -> Self {
        self.auto_provision = false;
        self
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    pub async fn purchase(
        &self,
        user_id: i64,
        req: PurchaseRequest,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        req.validate()?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(PurchaseError::InvalidRequest("name must not be blank".into()));
        }

        let (password, generated) = match req.password.as_deref() {
            Some(p) => {
                validate_password_strength(p)?;
                (p.to_string(), false)
            }
            None => (generate_random_password(GENERATED_PASSWORD_LEN), true),
        };
        let password_hash =
            hash_password(&password).map_err(|e| PurchaseError::Hashing(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let product = CatalogRepository::get_product(&mut *tx, req.product_id)
            .await?
            .ok_or(PurchaseError::ProductNotFound)?;
        if !product.is_online() {
            return Err(PurchaseError::ProductOffline);
        }
        let provider = CatalogRepository::get_provider(&mut *tx, product.provider_id)
            .await?
            .filter(|p| p.is_active())
            .ok_or(PurchaseError::ProviderUnavailable)?;

        let amount = line_amount(product.price, req.period, req.quantity)?;
        let discount = Decimal::ZERO;
        let to_pay = pay_amount(amount, discount);

        let user = UserRepository::lock_for_update(&mut tx, user_id)
            .await?
            .ok_or(PurchaseError::UserNotFound)?;
        if !user.is_active() {
            return Err(PurchaseError::AccountDisabled);
        }
        if user.balance < to_pay {
            return Err(PurchaseError::InsufficientBalance {
                required: to_pay,
                available: user.balance,
            });
        }

        let order_no = new_order_no();
        let order_config = serde_json::json!({
            "name": name,
            "image_id": req.image_id,
            "auto_renew": req.auto_renew,
            "region": product.region,
            "zone": product.zone,
        })
        .to_string();
        let order = OrderRepository::insert_order(
            &mut tx,
            &NewOrder {
                user_id,
                order_no: &order_no,
                provider_id: provider.id,
                product_id: product.id,
                order_type: OrderType::New,
                amount,
                discount_amount: discount,
                pay_amount: to_pay,
                pay_method: PaymentMethod::Balance,
                period: req.period as i32,
                quantity: req.quantity as i32,
                config: &order_config,
                remark: "",
            },
        )
        .await?;

        let balance = UserRepository::adjust_balance(&mut tx, user_id, -to_pay)
            .await?
            .ok_or(PurchaseError::InsufficientBalance {
                required: to_pay,
                available: user.balance,
            })?;

        OrderRepository::insert_payment(
            &mut tx,
            &NewPayment {
                order_id: Some(order.id),
                user_id,
                method: PaymentMethod::Balance,
                amount: to_pay,
                remark: "order payment",
            },
        )
        .await?;

        if !OrderRepository::transition(&mut *tx, order.id, OrderStatus::Pending, OrderStatus::Paid)
            .await?
        {
            return Err(PurchaseError::Database(sqlx::Error::RowNotFound));
        }

        let now = Utc::now();
        let expire_time = now
            .checked_add_months(Months::new(req.period))
            .ok_or_else(|| PurchaseError::InvalidRequest("period out of range".into()))?;
        let image_id = req.image_id.as_deref().unwrap_or("");
        let mut server_ids = Vec::with_capacity(req.quantity as usize);
        for i in 0..req.quantity {
            let server = ServerRepository::insert(
                &mut tx,
                &NewServer {
                    user_id,
                    order_id: order.id,
                    provider_id: provider.id,
                    product_id: product.id,
                    name: server_name(name, i, req.quantity),
                    region: &product.region,
                    zone: &product.zone,
                    expire_time,
                    auto_renew: req.auto_renew,
                    password_hash: &password_hash,
                    image_id,
                    os_name: &product.os,
                    cpu: product.cpu,
                    memory: product.memory,
                    storage: product.storage,
                    bandwidth: product.bandwidth,
                    traffic: product.traffic,
                },
            )
            .await?;
            server_ids.push(server.id);
        }

        tx.commit().await?;

        tracing::info!(
            order_no = %order_no,
            user_id,
            product = %product.code,
            quantity = req.quantity,
            pay_amount = %to_pay,
            "order paid"
        );
        audit::record(
            &self.db,
            AuditEntry::new(
                "order",
                "purchase",
                format!("order {} paid {} for {} x {}", order_no, to_pay, req.quantity, product.code),
            )
            .by(user_id, &user.username),
        )
        .await;

        if self.auto_provision {
            self.provisioner.spawn(order.id, password.clone());
        }

        Ok(PurchaseReceipt {
            order_id: order.id,
            order_no,
            status: OrderStatus::Paid,
            amount,
            discount_amount: discount,
            pay_amount: to_pay,
            balance,
            server_ids,
            initial_password: generated.then_some(password),
        })
    }
}
