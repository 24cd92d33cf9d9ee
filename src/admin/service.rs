//! Admin reporting and management

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use crate::account::{AdminUserView, UserRepository, UserStatus};
use crate::audit::{self, AuditEntry};
use crate::catalog::{CatalogRepository, ProductStatus, ProductView, Provider};
use crate::db::SafeRow;
use crate::gateway::types::{ApiError, Page, PageQuery, PageWindow, error_codes};
use crate::money::{MONEY_SCALE, round_money};
use crate::order::{OrderRepository, OrderStatus, OrderView, PaymentMethod};
use crate::order::repository::NewPayment;
use crate::user_auth::Claims;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Balance cannot go below zero")]
    NegativeBalance,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotFound(_) => ApiError::not_found(err.to_string()),
            AdminError::InvalidRequest(_) => ApiError::bad_request(err.to_string()),
            AdminError::NegativeBalance => {
                ApiError::bad_request(err.to_string()).with_code(error_codes::INSUFFICIENT_BALANCE)
            }
            AdminError::Database(e) => {
                tracing::error!(error = %e, "admin query failed");
                ApiError::internal("Internal server error")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub user_count: i64,
    pub server_count: i64,
    pub order_count: i64,
    pub today_orders: i64,
    /// Sum of `pay_amount` over successful orders
    #[schema(value_type = String, example = "1024.00")]
    pub total_revenue: Decimal,
    #[schema(value_type = String, example = "108.00")]
    pub today_revenue: Decimal,
    pub running_servers: i64,
    /// `pending` + `processing`
    pub pending_orders: i64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// Matches username, email or real name
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// pending | paid | processing | success | failed | cancelled
    pub status: Option<String>,
    /// Matches the order number
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub provider_id: Option<i64>,
}

fn window(page: Option<i64>, size: Option<i64>) -> PageWindow {
    PageQuery { page, size }.window()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProductList {
    pub products: Page<ProductView>,
    /// All providers, for the filter drop-down
    pub providers: Vec<Provider>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductStatusRequest {
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BalanceAdjustRequest {
    /// Positive to credit, negative to debit; at most two decimals
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,
    pub remark: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceAdjustResult {
    pub user_id: i64,
    #[schema(value_type = String, example = "200.00")]
    pub balance: Decimal,
}

/// Non-zero with at most two decimals
fn validate_adjustment(amount: Decimal) -> Result<Decimal, AdminError> {
    if amount.is_zero() {
        return Err(AdminError::InvalidRequest("amount must not be zero".into()));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AdminError::InvalidRequest(format!(
            "amount allows at most {} decimals",
            MONEY_SCALE
        )));
    }
    Ok(round_money(amount))
}

#[derive(Clone)]
pub struct AdminService {
    db: PgPool,
}

impl AdminService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, AdminError> {
        let row = sqlx::query(
            "SELECT \
               (SELECT COUNT(*) FROM users) AS user_count, \
               (SELECT COUNT(*) FROM servers) AS server_count, \
               (SELECT COUNT(*) FROM orders) AS order_count, \
               (SELECT COUNT(*) FROM orders WHERE created_at >= date_trunc('day', NOW())) AS today_orders, \
               (SELECT COALESCE(SUM(pay_amount), 0) FROM orders WHERE status = 'success') AS total_revenue, \
               (SELECT COALESCE(SUM(pay_amount), 0) FROM orders \
                  WHERE status = 'success' AND created_at >= date_trunc('day', NOW())) AS today_revenue, \
               (SELECT COUNT(*) FROM servers WHERE status = 'running') AS running_servers, \
               (SELECT COUNT(*) FROM orders WHERE status IN ('pending', 'processing')) AS pending_orders",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardStats {
            user_count: row.try_get_log("user_count").unwrap_or_default(),
            server_count: row.try_get_log("server_count").unwrap_or_default(),
            order_count: row.try_get_log("order_count").unwrap_or_default(),
            today_orders: row.try_get_log("today_orders").unwrap_or_default(),
            total_revenue: row.try_get_log("total_revenue").unwrap_or_default(),
            today_revenue: row.try_get_log("today_revenue").unwrap_or_default(),
            running_servers: row.try_get_log("running_servers").unwrap_or_default(),
            pending_orders: row.try_get_log("pending_orders").unwrap_or_default(),
        })
    }

    pub async fn list_users(&self, q: &UserListQuery) -> Result<Page<AdminUserView>, AdminError> {
        let window = window(q.page, q.size);
        let (users, total) = UserRepository::search(&self.db, q.keyword.as_deref(), window).await?;
        Ok(Page::new(users, total, window).map(AdminUserView::from))
    }

    pub async fn list_orders(&self, q: &OrderListQuery) -> Result<Page<OrderView>, AdminError> {
        let status = match q.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(
                OrderStatus::parse(s)
                    .ok_or_else(|| AdminError::InvalidRequest(format!("unknown order status {}", s)))?,
            ),
            None => None,
        };
        let window = window(q.page, q.size);
        let (orders, total) =
            OrderRepository::search(&self.db, status, q.keyword.as_deref(), window).await?;
        Ok(Page::new(orders, total, window))
    }

    pub async fn list_products(&self, q: &ProductListQuery) -> Result<AdminProductList, AdminError> {
        let window = window(q.page, q.size);
        let (products, total) =
            CatalogRepository::search_products(&self.db, q.provider_id, window).await?;
        let providers = CatalogRepository::list_providers(&self.db).await?;
        Ok(AdminProductList {
            products: Page::new(products, total, window),
            providers,
        })
    }

    pub async fn set_user_status(
        &self,
        admin: &Claims,
        user_id: i64,
        status: UserStatus,
    ) -> Result<(), AdminError> {
        if user_id == admin.user_id() && status == UserStatus::Disabled {
            return Err(AdminError::InvalidRequest(
                "cannot disable your own account".into(),
            ));
        }
        if !UserRepository::set_status(&self.db, user_id, status).await? {
            return Err(AdminError::NotFound("User"));
        }
        audit::record(
            &self.db,
            AuditEntry::new("admin", "user_status", format!("user {} -> {:?}", user_id, status))
                .by(admin.user_id(), &admin.username),
        )
        .await;
        Ok(())
    }

    /// Credit or debit a balance and record the adjustment as a payment
    pub async fn adjust_balance(
        &self,
        admin: &Claims,
        user_id: i64,
        req: BalanceAdjustRequest,
    ) -> Result<BalanceAdjustResult, AdminError> {
        let amount = validate_adjustment(req.amount)?;
        let remark = match req.remark.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("admin adjustment: {}", r),
            None => "admin adjustment".to_string(),
        };

        let mut tx = self.db.begin().await?;
        UserRepository::lock_for_update(&mut tx, user_id)
            .await?
            .ok_or(AdminError::NotFound("User"))?;
        let balance = UserRepository::adjust_balance(&mut tx, user_id, amount)
            .await?
            .ok_or(AdminError::NegativeBalance)?;
        OrderRepository::insert_payment(
            &mut tx,
            &NewPayment {
                order_id: None,
                user_id,
                method: PaymentMethod::Balance,
                amount,
                remark: &remark,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(user_id, admin_id = admin.user_id(), %amount, %balance, "balance adjusted");
        audit::record(
            &self.db,
            AuditEntry::new("admin", "balance", format!("user {} adjusted by {} -> {}", user_id, amount, balance))
                .by(admin.user_id(), &admin.username),
        )
        .await;

        Ok(BalanceAdjustResult { user_id, balance })
    }

    pub async fn set_product_status(
        &self,
        admin: &Claims,
        product_id: i64,
        status: ProductStatus,
    ) -> Result<(), AdminError> {
        if !CatalogRepository::set_product_status(&self.db, product_id, status).await? {
            return Err(AdminError::NotFound("Product"));
        }
        audit::record(
            &self.db,
            AuditEntry::new(
                "admin",
                "product_status",
                format!("product {} -> {:?}", product_id, status),
            )
            .by(admin.user_id(), &admin.username),
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_adjustment() {
        assert!(validate_adjustment(Decimal::ZERO).is_err());
        assert!(validate_adjustment(Decimal::new(1001, 3)).is_err());
        assert_eq!(
            validate_adjustment(Decimal::new(-2550, 2)).unwrap(),
            Decimal::new(-2550, 2)
        );
        // trailing zeros are fine
        assert!(validate_adjustment(Decimal::new(10000, 3)).is_ok());
    }

    #[test]
    fn test_status_requests_parse_lowercase() {
        let req: UserStatusRequest = serde_json::from_str(r#"{"status":"disabled"}"#).unwrap();
        assert_eq!(req.status, UserStatus::Disabled);
        let req: ProductStatusRequest = serde_json::from_str(r#"{"status":"offline"}"#).unwrap();
        assert_eq!(req.status, ProductStatus::Offline);
        assert!(serde_json::from_str::<ProductStatusRequest>(r#"{"status":"gone"}"#).is_err());
    }

    #[test]
    fn test_balance_request_accepts_string_amount() {
        let req: BalanceAdjustRequest =
            serde_json::from_str(r#"{"amount":"-12.50","remark":"chargeback"}"#).unwrap();
        assert_eq!(req.amount, Decimal::new(-1250, 2));
    }

    #[test]
    fn test_negative_balance_maps_to_400() {
        let api: ApiError = AdminError::NegativeBalance.into();
        assert_eq!(api.status.as_u16(), 400);
        assert_eq!(api.code, error_codes::INSUFFICIENT_BALANCE);
    }

    #[test]
    fn test_dashboard_serializes_money_as_strings() {
        let json = serde_json::to_value(DashboardStats::default()).unwrap();
        assert_eq!(json["total_revenue"], "0");
        assert_eq!(json["pending_orders"], 0);
    }
}
