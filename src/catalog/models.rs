//! Provider and product rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Provider status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ProviderStatus {
    Active = 1,
    Inactive = 2,
}

impl ProviderStatus {
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl From<i16> for ProviderStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ProviderStatus::Active,
            _ => ProviderStatus::Inactive,
        }
    }
}

/// Product sale status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ProductStatus {
    Online = 1,
    Offline = 2,
}

impl ProductStatus {
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl From<i16> for ProductStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ProductStatus::Online,
            _ => ProductStatus::Offline,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Provider {
    pub id: i64,
    #[schema(example = "Tencent Cloud")]
    pub name: String,
    #[schema(example = "tencent")]
    pub code: String,
    pub logo: String,
    pub description: String,
    pub status: ProviderStatus,
    /// Adapter settings JSON; may hold credentials
    #[serde(skip)]
    pub config: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn is_active(&self) -> bool {
        self.status == ProviderStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub provider_id: i64,
    #[schema(example = "Lighthouse 2C4G")]
    pub name: String,
    /// Vendor bundle id, passed to the adapter as the instance type
    #[schema(example = "lighthouse-2c4g")]
    pub code: String,
    #[schema(example = "lighthouse")]
    pub product_type: String,
    pub region: String,
    pub zone: String,
    pub cpu: i32,
    pub memory: i32,
    pub storage: i32,
    pub storage_type: String,
    pub bandwidth: i32,
    pub traffic: i32,
    pub os: String,
    /// Monthly price
    #[schema(value_type = String, example = "54.00")]
    pub price: Decimal,
    #[schema(value_type = String, example = "65.00")]
    pub original_price: Decimal,
    pub status: ProductStatus,
    pub description: String,
    pub features: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_online(&self) -> bool {
        self.status == ProductStatus::Online
    }
}

/// Product joined with its provider's display fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub provider_name: String,
    pub provider_code: String,
}

/// Storefront product filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub provider_id: Option<i64>,
    pub region: Option<String>,
    /// Product type, e.g. `lighthouse`
    #[serde(rename = "type")]
    pub product_type: Option<String>,
}
