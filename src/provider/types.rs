//! Vendor-neutral request/response types for the adapter contract

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Vendor-reported instance state, normalised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Pending,
    Running,
    Stopped,
    Starting,
    Stopping,
    Rebooting,
    Expired,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub region: String,
    pub zone: String,
    pub image_id: String,
    pub instance_type: String,
    pub password: String,
    pub period_months: u32,
    pub auto_renew: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstanceResponse {
    pub instance_id: String,
    /// Vendor-side order/deal reference
    pub vendor_order_id: String,
}

/// Point-in-time view of one instance at the vendor
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub name: String,
    pub state: InstanceState,
    pub region: String,
    pub zone: String,
    pub public_ip: String,
    pub private_ip: String,
    pub os_type: String,
    pub os_name: String,
    pub cpu: i32,
    pub memory: i32,
    pub storage: i32,
    pub bandwidth: i32,
    pub traffic: i32,
    pub used_traffic: i32,
    pub instance_type: String,
    pub image_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ListInstancesRequest {
    pub region: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct InstanceList {
    pub instances: Vec<InstanceSnapshot>,
    pub total_count: u32,
}

#[derive(Debug, Clone)]
pub struct MetricsRequest {
    pub instance_id: String,
    pub metric_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Sample granularity in seconds
    pub period_secs: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricSeries {
    pub metric_name: String,
    pub points: Vec<MetricPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Zone {
    #[schema(example = "ap-guangzhou-3")]
    pub zone_id: String,
    #[schema(example = "Guangzhou Zone 3")]
    pub zone_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Region {
    #[schema(example = "ap-guangzhou")]
    pub region_id: String,
    #[schema(example = "South China (Guangzhou)")]
    pub region_name: String,
    pub zones: Vec<Zone>,
}

/// Filters for [`CloudProvider::images`](super::CloudProvider::images)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageFilter {
    pub region: Option<String>,
    /// LINUX | WINDOWS
    pub os_type: Option<String>,
    /// PUBLIC_IMAGE | PRIVATE_IMAGE
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Image {
    #[schema(example = "img-ubuntu-20-04")]
    pub image_id: String,
    pub image_name: String,
    #[schema(example = "LINUX")]
    pub os_type: String,
    pub os_name: String,
    /// Size in GB
    pub image_size: i32,
    pub image_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstanceType {
    #[schema(example = "lighthouse-1c2g")]
    pub instance_type: String,
    pub cpu: i32,
    /// GB
    pub memory: i32,
    /// GB
    pub storage: i32,
    /// Mbps
    pub bandwidth: i32,
    /// Monthly traffic allowance in GB
    pub traffic: i32,
    /// Vendor list price per month
    #[schema(value_type = String, example = "24.00")]
    pub price: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegionFilter {
    pub region: Option<String>,
}
