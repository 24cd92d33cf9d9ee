//! Post-commit instance provisioning
//!
//! One task per paid order, no polling. Units are created concurrently. A
//! unit whose vendor create fails, or whose new instance id cannot be
//! stored, is marked `error` and its share of the payment is refunded in
//! its own transaction.

use futures::future::join_all;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use super::models::{Order, OrderStatus, PaymentMethod};
use super::repository::{NewPayment, OrderRepository};
use crate::account::UserRepository;
use crate::audit::{self, AuditEntry};
use crate::catalog::{CatalogRepository, Product};
use crate::instance::models::{Server, ServerStatus};
use crate::instance::repository::ServerRepository;
use crate::money::round_money;
use crate::provider::{
    CloudProvider, CreateInstanceRequest, ImageFilter, ProviderError, ProviderRegistry,
};

/// Why one unit ended up refunded
#[derive(Error, Debug)]
enum UnitError {
    #[error(transparent)]
    Vendor(#[from] ProviderError),

    #[error("instance {instance_id} created but not recorded: {source}")]
    Unrecorded {
        instance_id: String,
        source: sqlx::Error,
    },
}

impl UnitError {
    fn code(&self) -> &'static str {
        match self {
            UnitError::Vendor(e) => e.code(),
            UnitError::Unrecorded { .. } => "INSTANCE_UNRECORDED",
        }
    }
}

#[derive(Clone)]
pub struct Provisioner {
    db: PgPool,
    providers: Arc<ProviderRegistry>,
}

impl Provisioner {
    pub fn new(db: PgPool, providers: Arc<ProviderRegistry>) -> Self {
        Self { db, providers }
    }

    /// Provision in the background; errors end up in the log.
    pub fn spawn(&self, order_id: i64, password: String) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.provision_order(order_id, &password).await {
                tracing::error!(order_id, "provisioning aborted: {}", e);
            }
        });
    }

    /// Drive a `paid` order to `success` or `failed`. Returns the final
    /// status; an order that is not `paid` is left alone.
    pub async fn provision_order(
        &self,
        order_id: i64,
        password: &str,
    ) -> Result<OrderStatus, sqlx::Error> {
        let order = OrderRepository::get_by_id(&self.db, order_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        if !OrderRepository::transition(
            &self.db,
            order_id,
            OrderStatus::Paid,
            OrderStatus::Processing,
        )
        .await?
        {
            tracing::warn!(order_id, status = %order.status, "order not provisionable");
            return Ok(order.status);
        }

        let servers = ServerRepository::list_by_order(&self.db, order_id).await?;
        let product = CatalogRepository::get_product(&self.db, order.product_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let adapter = match CatalogRepository::get_provider(&self.db, order.provider_id).await? {
            Some(provider) => self.providers.get(&provider.code),
            None => Err(ProviderError::Unavailable(order.provider_id.to_string())),
        };

        let unit_price = unit_refund(&order);
        let outcomes = join_all(servers.iter().map(|server| {
            let adapter = adapter.clone();
            let product = &product;
            let order = &order;
            async move {
                let result = match adapter {
                    Ok(adapter) => {
                        self.provision_unit(adapter.as_ref(), order, product, server, password)
                            .await
                    }
                    Err(e) => Err(UnitError::from(e)),
                };
                match result {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(
                            order_id = order.id,
                            server_id = server.id,
                            error_code = e.code(),
                            "unit provisioning failed: {}",
                            e
                        );
                        if let Err(db_err) = self.fail_unit(order, server, unit_price).await {
                            tracing::error!(
                                order_id = order.id,
                                server_id = server.id,
                                "refund failed: {}",
                                db_err
                            );
                        }
                        false
                    }
                }
            }
        }))
        .await;

        let provisioned = outcomes.iter().filter(|ok| **ok).count();
        let final_status = if provisioned > 0 {
            OrderStatus::Success
        } else {
            OrderStatus::Failed
        };
        OrderRepository::transition(&self.db, order_id, OrderStatus::Processing, final_status)
            .await?;

        tracing::info!(
            order_no = %order.order_no,
            provisioned,
            failed = outcomes.len() - provisioned,
            status = %final_status,
            "order provisioning finished"
        );
        let mut entry = AuditEntry::new(
            "order",
            "provision",
            format!(
                "order {}: {}/{} instances created",
                order.order_no,
                provisioned,
                outcomes.len()
            ),
        );
        entry.user_id = Some(order.user_id);
        if provisioned == 0 {
            entry = entry.failed();
        }
        audit::record(&self.db, entry).await;

        Ok(final_status)
    }

    async fn provision_unit(
        &self,
        adapter: &dyn CloudProvider,
        order: &Order,
        product: &Product,
        server: &Server,
        password: &str,
    ) -> Result<(), UnitError> {
        let image_id = if server.image_id.is_empty() {
            adapter
                .images(&ImageFilter {
                    region: Some(server.region.clone()),
                    ..Default::default()
                })
                .await?
                .into_iter()
                .next()
                .map(|i| i.image_id)
                .unwrap_or_default()
        } else {
            server.image_id.clone()
        };

        let created = adapter
            .create_instance(&CreateInstanceRequest {
                name: server.name.clone(),
                region: server.region.clone(),
                zone: server.zone.clone(),
                image_id,
                instance_type: product.code.clone(),
                password: password.to_string(),
                period_months: order.period.max(1) as u32,
                auto_renew: server.auto_renew,
            })
            .await?;

        let recorded = ServerRepository::set_instance_id(&self.db, server.id, &created.instance_id)
            .await
            .and_then(|updated| {
                if updated {
                    Ok(())
                } else {
                    Err(sqlx::Error::RowNotFound)
                }
            });
        if let Err(source) = recorded {
            // Nothing local points at the instance: release it
            if let Err(e) = adapter.delete_instance(&created.instance_id).await {
                tracing::error!(
                    server_id = server.id,
                    instance_id = %created.instance_id,
                    "failed to release unrecorded instance: {}",
                    e
                );
            }
            return Err(UnitError::Unrecorded {
                instance_id: created.instance_id,
                source,
            });
        }

        // The instance exists from here on: a failed describe only leaves
        // the row with stale details until the next sync.
        match adapter.describe_instance(&created.instance_id).await {
            Ok(snapshot) => {
                let status = ServerStatus::from_instance_state(snapshot.state)
                    .unwrap_or(ServerStatus::Running);
                if let Err(e) =
                    ServerRepository::apply_snapshot(&self.db, server.id, &snapshot, Some(status))
                        .await
                {
                    tracing::error!(server_id = server.id, "failed to store snapshot: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    server_id = server.id,
                    instance_id = %created.instance_id,
                    "describe after create failed: {}",
                    e
                );
                let _ = ServerRepository::set_status(&self.db, server.id, ServerStatus::Running)
                    .await
                    .inspect_err(|e| tracing::error!(server_id = server.id, "{}", e));
            }
        }
        Ok(())
    }

    /// Mark the unit `error` and refund its share in one transaction
    async fn fail_unit(
        &self,
        order: &Order,
        server: &Server,
        refund: Decimal,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE servers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(server.id)
            .bind(ServerStatus::Error.as_str())
            .execute(&mut *tx)
            .await?;
        if refund > Decimal::ZERO {
            UserRepository::adjust_balance(&mut tx, order.user_id, refund).await?;
            let remark = format!("refund for server {}", server.id);
            OrderRepository::insert_payment(
                &mut tx,
                &NewPayment {
                    order_id: Some(order.id),
                    user_id: order.user_id,
                    method: PaymentMethod::Balance,
                    amount: -refund,
                    remark: &remark,
                },
            )
            .await?;
        }
        tx.commit().await?;
        tracing::info!(order_id = order.id, server_id = server.id, %refund, "unit refunded");
        Ok(())
    }
}

/// Share of the paid amount for one unit
pub fn unit_refund(order: &Order) -> Decimal {
    if order.quantity <= 0 {
        return Decimal::ZERO;
    }
    round_money(order.pay_amount / Decimal::from(order.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::models::{OrderType, PaymentMethod};
    use chrono::Utc;

    fn order(pay: Decimal, quantity: i32) -> Order {
        Order {
            id: 1,
            user_id: 7,
            order_no: "ORD1".into(),
            provider_id: 1,
            product_id: 2,
            order_type: OrderType::New,
            status: OrderStatus::Paid,
            amount: pay,
            discount_amount: Decimal::ZERO,
            pay_amount: pay,
            pay_method: PaymentMethod::Balance,
            pay_time: Some(Utc::now()),
            period: 3,
            quantity,
            config: "{}".into(),
            remark: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unit_refund_is_price_times_period() {
        // 54.00 x 3 months x 2 units
        assert_eq!(unit_refund(&order(Decimal::new(32400, 2), 2)), Decimal::new(16200, 2));
        assert_eq!(unit_refund(&order(Decimal::new(10000, 2), 3)), Decimal::new(3333, 2));
        assert_eq!(unit_refund(&order(Decimal::new(10000, 2), 0)), Decimal::ZERO);
    }
}
