//! Order and payment queries

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgExecutor, PgPool, Row};

use super::models::{
    Order, OrderStatus, OrderType, OrderView, Payment, PaymentMethod, PaymentStatus,
    new_payment_no,
};
use crate::gateway::types::PageWindow;

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.order_no, o.provider_id, o.product_id, \
                             o.order_type, o.status, o.amount, o.discount_amount, o.pay_amount, \
                             o.pay_method, o.pay_time, o.period, o.quantity, o.config, o.remark, \
                             o.created_at, o.updated_at";

const PAYMENT_COLUMNS: &str = "id, order_id, user_id, payment_no, method, amount, status, \
                               transaction_id, pay_time, remark, created_at";

fn map_order(r: &PgRow) -> Result<Order, sqlx::Error> {
    let status: &str = r.try_get("status")?;
    Ok(Order {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        order_no: r.try_get("order_no")?,
        provider_id: r.try_get("provider_id")?,
        product_id: r.try_get("product_id")?,
        order_type: OrderType::parse(r.try_get("order_type")?),
        status: OrderStatus::parse(status).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unknown order status {:?}", status).into(),
        })?,
        amount: r.try_get("amount")?,
        discount_amount: r.try_get("discount_amount")?,
        pay_amount: r.try_get("pay_amount")?,
        pay_method: PaymentMethod::parse(r.try_get("pay_method")?),
        pay_time: r.try_get("pay_time")?,
        period: r.try_get("period")?,
        quantity: r.try_get("quantity")?,
        config: r.try_get("config")?,
        remark: r.try_get("remark")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn map_payment(r: &PgRow) -> Result<Payment, sqlx::Error> {
    let status = match r.try_get::<&str, _>("status")? {
        "success" => PaymentStatus::Success,
        "failed" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    };
    Ok(Payment {
        id: r.try_get("id")?,
        order_id: r.try_get("order_id")?,
        user_id: r.try_get("user_id")?,
        payment_no: r.try_get("payment_no")?,
        method: PaymentMethod::parse(r.try_get("method")?),
        amount: r.try_get("amount")?,
        status,
        transaction_id: r.try_get("transaction_id")?,
        pay_time: r.try_get("pay_time")?,
        remark: r.try_get("remark")?,
        created_at: r.try_get("created_at")?,
    })
}

/// Fields for a new `pending` order
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: i64,
    pub order_no: &'a str,
    pub provider_id: i64,
    pub product_id: i64,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub discount_amount: Decimal,
    pub pay_amount: Decimal,
    pub pay_method: PaymentMethod,
    pub period: i32,
    pub quantity: i32,
    pub config: &'a str,
    pub remark: &'a str,
}

/// Settled payment entry; negative `amount` for refunds and admin debits
#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub order_id: Option<i64>,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub remark: &'a str,
}

pub struct OrderRepository;

impl OrderRepository {
    pub async fn insert_order(
        conn: &mut PgConnection,
        new: &NewOrder<'_>,
    ) -> Result<Order, sqlx::Error> {
        let sql = format!(
            "INSERT INTO orders AS o (user_id, order_no, provider_id, product_id, order_type, \
             status, amount, discount_amount, pay_amount, pay_method, period, quantity, config, remark) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new.user_id)
            .bind(new.order_no)
            .bind(new.provider_id)
            .bind(new.product_id)
            .bind(new.order_type.as_str())
            .bind(OrderStatus::Pending.as_str())
            .bind(new.amount)
            .bind(new.discount_amount)
            .bind(new.pay_amount)
            .bind(new.pay_method.as_str())
            .bind(new.period)
            .bind(new.quantity)
            .bind(new.config)
            .bind(new.remark)
            .fetch_one(conn)
            .await?;
        map_order(&row)
    }

    /// Insert a `success` payment with a fresh `PAY…` number
    pub async fn insert_payment(
        conn: &mut PgConnection,
        new: &NewPayment<'_>,
    ) -> Result<Payment, sqlx::Error> {
        let sql = format!(
            "INSERT INTO payments (order_id, user_id, payment_no, method, amount, status, pay_time, remark) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7) RETURNING {}",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new.order_id)
            .bind(new.user_id)
            .bind(new_payment_no())
            .bind(new.method.as_str())
            .bind(new.amount)
            .bind(PaymentStatus::Success.as_str())
            .bind(new.remark)
            .fetch_one(conn)
            .await?;
        map_payment(&row)
    }

    /// Compare-and-set the order status. Returns false when the transition
    /// is not allowed or the row is no longer in `from`.
    pub async fn transition<'e, E: PgExecutor<'e>>(
        exec: E,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, sqlx::Error> {
        if !from.can_transition_to(to) {
            tracing::warn!(order_id, %from, %to, "rejected order status transition");
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW(), \
             pay_time = CASE WHEN $3 = 'paid' THEN NOW() ELSE pay_time END \
             WHERE id = $1 AND status = $2",
        )
        .bind(order_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(exec)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_by_id(pool: &PgPool, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {} FROM orders o WHERE o.id = $1", ORDER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(map_order).transpose()
    }

    pub async fn payments_for_order(
        pool: &PgPool,
        order_id: i64,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM payments WHERE order_id = $1 ORDER BY id",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(order_id).fetch_all(pool).await?;
        rows.iter().map(map_payment).collect()
    }

    /// Admin listing: optional status filter, keyword over order number,
    /// newest first
    pub async fn search(
        pool: &PgPool,
        status: Option<OrderStatus>,
        keyword: Option<&str>,
        window: PageWindow,
    ) -> Result<(Vec<OrderView>, i64), sqlx::Error> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{}%", k));
        let status = status.map(|s| s.as_str());
        let filter = "($1::TEXT IS NULL OR o.status = $1) AND ($2::TEXT IS NULL OR o.order_no ILIKE $2)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders o WHERE {}", filter))
                .bind(status)
                .bind(pattern.as_deref())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {}, u.username, v.name AS provider_name, p.name AS product_name \
             FROM orders o \
             JOIN users u ON u.id = o.user_id \
             JOIN providers v ON v.id = o.provider_id \
             JOIN products p ON p.id = o.product_id \
             WHERE {} ORDER BY o.created_at DESC, o.id DESC LIMIT $3 OFFSET $4",
            ORDER_COLUMNS, filter
        );
        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(pattern.as_deref())
            .bind(window.limit())
            .bind(window.offset())
            .fetch_all(pool)
            .await?;
        let items = rows
            .iter()
            .map(|r| {
                Ok(OrderView {
                    order: map_order(r)?,
                    username: r.try_get("username")?,
                    provider_name: r.try_get("provider_name")?,
                    product_name: r.try_get("product_name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok((items, total))
    }
}
