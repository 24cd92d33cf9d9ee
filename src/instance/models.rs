//! Server records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::provider::InstanceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Creating,
    Running,
    Stopped,
    Expired,
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Creating => "creating",
            ServerStatus::Running => "running",
            ServerStatus::Stopped => "stopped",
            ServerStatus::Expired => "expired",
            ServerStatus::Error => "error",
        }
    }

    /// Unknown column values read as `Error`
    pub fn parse(s: &str) -> Self {
        match s {
            "creating" => ServerStatus::Creating,
            "running" => ServerStatus::Running,
            "stopped" => ServerStatus::Stopped,
            "expired" => ServerStatus::Expired,
            _ => ServerStatus::Error,
        }
    }

    /// Local status for a vendor state; `None` for transitional states
    /// (starting, stopping, rebooting) that keep the current status.
    pub fn from_instance_state(state: InstanceState) -> Option<Self> {
        match state {
            InstanceState::Pending => Some(ServerStatus::Creating),
            InstanceState::Running => Some(ServerStatus::Running),
            InstanceState::Stopped => Some(ServerStatus::Stopped),
            InstanceState::Expired => Some(ServerStatus::Expired),
            InstanceState::Failed => Some(ServerStatus::Error),
            InstanceState::Starting | InstanceState::Stopping | InstanceState::Rebooting => None,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Server {
    pub id: i64,
    pub user_id: i64,
    pub order_id: i64,
    pub provider_id: i64,
    pub product_id: i64,
    pub name: String,
    /// Vendor instance id; `pending-…` until provisioned
    pub instance_id: String,
    pub region: String,
    pub zone: String,
    pub public_ip: String,
    pub private_ip: String,
    pub status: ServerStatus,
    pub expire_time: DateTime<Utc>,
    pub auto_renew: bool,
    #[serde(skip)]
    pub password_hash: String,
    pub image_id: String,
    pub os_type: String,
    pub os_name: String,
    pub cpu: i32,
    pub memory: i32,
    pub storage: i32,
    pub bandwidth: i32,
    pub traffic: i32,
    pub used_traffic: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Server {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }

    pub fn is_provisioned(&self) -> bool {
        !self.instance_id.starts_with(PENDING_INSTANCE_PREFIX)
    }
}

pub const PENDING_INSTANCE_PREFIX: &str = "pending-";

pub fn pending_instance_id() -> String {
    format!("{}{}", PENDING_INSTANCE_PREFIX, uuid::Uuid::new_v4())
}

/// Server with provider/product names for listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServerView {
    #[serde(flatten)]
    pub server: Server,
    pub provider_name: String,
    pub provider_code: String,
    pub product_name: String,
}

/// Fields for a server row created inside the purchase transaction
#[derive(Debug, Clone)]
pub struct NewServer<'a> {
    pub user_id: i64,
    pub order_id: i64,
    pub provider_id: i64,
    pub product_id: i64,
    pub name: String,
    pub region: &'a str,
    pub zone: &'a str,
    pub expire_time: DateTime<Utc>,
    pub auto_renew: bool,
    pub password_hash: &'a str,
    pub image_id: &'a str,
    pub os_name: &'a str,
    pub cpu: i32,
    pub memory: i32,
    pub storage: i32,
    pub bandwidth: i32,
    pub traffic: i32,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_server() -> Server {
        let now = Utc::now();
        Server {
            id: 11,
            user_id: 7,
            order_id: 3,
            provider_id: 1,
            product_id: 2,
            name: "web".into(),
            instance_id: "lhins-0a1b2c3d".into(),
            region: "ap-guangzhou".into(),
            zone: "ap-guangzhou-3".into(),
            public_ip: "1.2.3.4".into(),
            private_ip: "10.0.0.1".into(),
            status: ServerStatus::Running,
            expire_time: now + Duration::days(30),
            auto_renew: false,
            password_hash: "$argon2id$v=19$...".into(),
            image_id: "img-ubuntu-20-04".into(),
            os_type: "LINUX".into(),
            os_name: "Ubuntu 20.04".into(),
            cpu: 2,
            memory: 4,
            storage: 80,
            bandwidth: 5,
            traffic: 200,
            used_traffic: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ServerStatus::parse("stopped"), ServerStatus::Stopped);
        assert_eq!(ServerStatus::parse("garbage"), ServerStatus::Error);
        assert_eq!(ServerStatus::Creating.to_string(), "creating");
    }

    #[test]
    fn test_from_instance_state() {
        assert_eq!(
            ServerStatus::from_instance_state(InstanceState::Running),
            Some(ServerStatus::Running)
        );
        assert_eq!(
            ServerStatus::from_instance_state(InstanceState::Failed),
            Some(ServerStatus::Error)
        );
        assert_eq!(ServerStatus::from_instance_state(InstanceState::Rebooting), None);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_server()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["status"], "running");
    }

    #[test]
    fn test_expiry_and_provisioned() {
        let mut s = sample_server();
        assert!(!s.is_expired_at(Utc::now()));
        s.expire_time = Utc::now() - Duration::seconds(1);
        assert!(s.is_expired_at(Utc::now()));

        assert!(s.is_provisioned());
        s.instance_id = pending_instance_id();
        assert!(!s.is_provisioned());
    }
}
