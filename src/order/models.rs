//! Orders and payments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Order lifecycle
///
/// ```text
/// pending ──► paid ──► processing ──► success
///    │          │            │
///    ├► cancelled           └──────► failed
///    └────────► failed ◄─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "success" => Some(OrderStatus::Success),
            "failed" => Some(OrderStatus::Failed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Success | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Paid, Processing)
                | (Paid, Failed)
                | (Processing, Success)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    New,
    Renew,
    Upgrade,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::New => "new",
            OrderType::Renew => "renew",
            OrderType::Upgrade => "upgrade",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "renew" => OrderType::Renew,
            "upgrade" => OrderType::Upgrade,
            _ => OrderType::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Balance,
    Wechat,
    Alipay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Balance => "balance",
            PaymentMethod::Wechat => "wechat",
            PaymentMethod::Alipay => "alipay",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "wechat" => PaymentMethod::Wechat,
            "alipay" => PaymentMethod::Alipay,
            _ => PaymentMethod::Balance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "ORD01J9Z8YQ6Q8W2V3X4Y5Z6A7B8C")]
    pub order_no: String,
    pub provider_id: i64,
    pub product_id: i64,
    pub order_type: OrderType,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "162.00")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "0.00")]
    pub discount_amount: Decimal,
    #[schema(value_type = String, example = "162.00")]
    pub pay_amount: Decimal,
    pub pay_method: PaymentMethod,
    pub pay_time: Option<DateTime<Utc>>,
    /// Months
    pub period: i32,
    pub quantity: i32,
    pub config: String,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order row with the names admins want to see next to it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub username: String,
    pub provider_name: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Payment {
    pub id: i64,
    pub order_id: Option<i64>,
    pub user_id: i64,
    pub payment_no: String,
    pub method: PaymentMethod,
    /// Negative for refunds and debits
    #[schema(value_type = String, example = "162.00")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub pay_time: Option<DateTime<Utc>>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

/// `ORD` + ULID: unique and time-sortable without a DB round trip
pub fn new_order_no() -> String {
    format!("ORD{}", ulid::Ulid::new())
}

pub fn new_payment_no() -> String {
    format!("PAY{}", ulid::Ulid::new())
}
