//! Tencent Cloud Lighthouse adapter (simulated)
//!
//! No vendor SDK is linked. The adapter validates its credentials like the
//! real one would, then serves the Lighthouse catalog from static tables and
//! keeps instance state in memory so lifecycle calls behave consistently
//! within one process. Ids it has never seen but that carry the `lhins-`
//! prefix are adopted as running instances, so servers created before a
//! restart stay manageable.

use async_trait::async_trait;
use chrono::{Duration, Months, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::config::ProviderSettings;
use super::types::*;
use super::{CloudProvider, ProviderError};

pub const CODE: &str = "tencent";
pub const DEFAULT_ENDPOINT: &str = "lighthouse.tencentcloudapi.com";
pub const DEFAULT_REGION: &str = "ap-guangzhou";
const INSTANCE_PREFIX: &str = "lhins-";

struct TypeSpec {
    id: &'static str,
    cpu: i32,
    memory: i32,
    storage: i32,
    bandwidth: i32,
    traffic: i32,
    price: i64,
}

const INSTANCE_TYPES: &[TypeSpec] = &[
    TypeSpec { id: "lighthouse-1c2g", cpu: 1, memory: 2, storage: 50, bandwidth: 3, traffic: 100, price: 24 },
    TypeSpec { id: "lighthouse-2c4g", cpu: 2, memory: 4, storage: 80, bandwidth: 5, traffic: 200, price: 54 },
    TypeSpec { id: "lighthouse-2c8g", cpu: 2, memory: 8, storage: 100, bandwidth: 6, traffic: 300, price: 108 },
    TypeSpec { id: "lighthouse-4c8g", cpu: 4, memory: 8, storage: 180, bandwidth: 8, traffic: 500, price: 216 },
    TypeSpec { id: "lighthouse-8c16g", cpu: 8, memory: 16, storage: 300, bandwidth: 12, traffic: 1000, price: 432 },
];

static REGIONS: Lazy<Vec<Region>> = Lazy::new(|| {
    let region = |id: &str, name: &str, zones: &[(&str, &str)]| Region {
        region_id: id.to_string(),
        region_name: name.to_string(),
        zones: zones
            .iter()
            .map(|(zid, zname)| Zone {
                zone_id: zid.to_string(),
                zone_name: zname.to_string(),
            })
            .collect(),
    };
    vec![
        region(
            "ap-guangzhou",
            "South China (Guangzhou)",
            &[("ap-guangzhou-3", "Guangzhou Zone 3"), ("ap-guangzhou-4", "Guangzhou Zone 4")],
        ),
        region(
            "ap-beijing",
            "North China (Beijing)",
            &[("ap-beijing-3", "Beijing Zone 3"), ("ap-beijing-4", "Beijing Zone 4")],
        ),
        region(
            "ap-shanghai",
            "East China (Shanghai)",
            &[("ap-shanghai-2", "Shanghai Zone 2"), ("ap-shanghai-3", "Shanghai Zone 3")],
        ),
    ]
});

static IMAGES: Lazy<Vec<Image>> = Lazy::new(|| {
    let image = |id: &str, name: &str, os_type: &str, size: i32, desc: &str| Image {
        image_id: id.to_string(),
        image_name: name.to_string(),
        os_type: os_type.to_string(),
        os_name: name.to_string(),
        image_size: size,
        image_type: "PUBLIC_IMAGE".to_string(),
        description: desc.to_string(),
    };
    vec![
        image("img-ubuntu-20-04", "Ubuntu 20.04", "LINUX", 20, "Ubuntu Server 20.04 LTS 64bit"),
        image("img-centos-7-8", "CentOS 7.8", "LINUX", 20, "CentOS 7.8 64bit"),
        image("img-windows-2019", "Windows Server 2019", "WINDOWS", 40, "Windows Server 2019 Datacenter 64bit"),
    ]
});

#[derive(Debug)]
pub struct TencentLighthouseProvider {
    settings: ProviderSettings,
    instances: Mutex<HashMap<String, InstanceSnapshot>>,
}

impl TencentLighthouseProvider {
    /// Fails with [`ProviderError::IncompleteConfig`] when either key is missing.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let settings = settings.with_defaults(DEFAULT_ENDPOINT, DEFAULT_REGION);
        settings.require_keys()?;
        tracing::info!(
            endpoint = %settings.endpoint,
            region = %settings.region,
            "Tencent Lighthouse adapter ready"
        );
        Ok(Self {
            settings,
            instances: Mutex::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn type_spec(instance_type: &str) -> Option<&'static TypeSpec> {
        INSTANCE_TYPES.iter().find(|t| t.id == instance_type)
    }

    fn adopted_snapshot(&self, instance_id: &str) -> InstanceSnapshot {
        let now = Utc::now();
        let spec = &INSTANCE_TYPES[0];
        InstanceSnapshot {
            instance_id: instance_id.to_string(),
            name: instance_id.to_string(),
            state: InstanceState::Running,
            region: self.settings.region.clone(),
            zone: format!("{}-3", self.settings.region),
            public_ip: "1.2.3.4".to_string(),
            private_ip: "10.0.0.1".to_string(),
            os_type: "LINUX".to_string(),
            os_name: "Ubuntu 20.04".to_string(),
            cpu: spec.cpu,
            memory: spec.memory,
            storage: spec.storage,
            bandwidth: spec.bandwidth,
            traffic: spec.traffic,
            used_traffic: 10,
            instance_type: spec.id.to_string(),
            image_id: "img-ubuntu-20-04".to_string(),
            created_at: now - Duration::days(1),
            expires_at: now + Duration::days(29),
        }
    }

    /// Run `f` against the tracked instance, adopting unknown `lhins-` ids.
    async fn with_instance<T>(
        &self,
        instance_id: &str,
        f: impl FnOnce(&mut InstanceSnapshot) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut instances = self.instances.lock().await;
        if !instances.contains_key(instance_id) {
            if !instance_id.starts_with(INSTANCE_PREFIX) {
                return Err(ProviderError::InstanceNotFound(instance_id.to_string()));
            }
            instances.insert(instance_id.to_string(), self.adopted_snapshot(instance_id));
        }
        match instances.get_mut(instance_id) {
            Some(snapshot) => f(snapshot),
            None => Err(ProviderError::InstanceNotFound(instance_id.to_string())),
        }
    }

    fn transition(
        snapshot: &mut InstanceSnapshot,
        from: InstanceState,
        to: InstanceState,
    ) -> Result<(), ProviderError> {
        if snapshot.state != from {
            return Err(ProviderError::Rejected {
                code: "UnsupportedOperation.InvalidInstanceState".to_string(),
                message: format!(
                    "instance {} is {:?}, expected {:?}",
                    snapshot.instance_id, snapshot.state, from
                ),
            });
        }
        snapshot.state = to;
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for TencentLighthouseProvider {
    fn name(&self) -> &str {
        "Tencent Cloud"
    }

    fn code(&self) -> &str {
        CODE
    }

    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
    ) -> Result<CreateInstanceResponse, ProviderError> {
        let spec = Self::type_spec(&req.instance_type).ok_or_else(|| ProviderError::Rejected {
            code: "InvalidParameterValue.BundleId".to_string(),
            message: format!("unknown bundle {}", req.instance_type),
        })?;
        let image = IMAGES
            .iter()
            .find(|i| i.image_id == req.image_id)
            .ok_or_else(|| ProviderError::Rejected {
                code: "InvalidParameterValue.BlueprintId".to_string(),
                message: format!("unknown blueprint {}", req.image_id),
            })?;
        if req.period_months == 0 {
            return Err(ProviderError::Rejected {
                code: "InvalidParameterValue.Period".to_string(),
                message: "period must be at least one month".to_string(),
            });
        }

        let hex = uuid::Uuid::new_v4().simple().to_string();
        let instance_id = format!("{}{}", INSTANCE_PREFIX, &hex[..8]);
        let now = Utc::now();
        let expires_at = now
            .checked_add_months(Months::new(req.period_months))
            .unwrap_or(now);
        let region = if req.region.is_empty() {
            self.settings.region.clone()
        } else {
            req.region.clone()
        };
        let snapshot = InstanceSnapshot {
            instance_id: instance_id.clone(),
            name: req.name.clone(),
            state: InstanceState::Running,
            zone: req.zone.clone(),
            region,
            public_ip: "1.2.3.4".to_string(),
            private_ip: "10.0.0.1".to_string(),
            os_type: image.os_type.clone(),
            os_name: image.os_name.clone(),
            cpu: spec.cpu,
            memory: spec.memory,
            storage: spec.storage,
            bandwidth: spec.bandwidth,
            traffic: spec.traffic,
            used_traffic: 0,
            instance_type: spec.id.to_string(),
            image_id: image.image_id.clone(),
            created_at: now,
            expires_at,
        };
        self.instances
            .lock()
            .await
            .insert(instance_id.clone(), snapshot);

        tracing::debug!(instance_id = %instance_id, bundle = spec.id, "lighthouse instance created");
        Ok(CreateInstanceResponse {
            vendor_order_id: format!("deal-{}", &hex[8..20]),
            instance_id,
        })
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        match self.instances.lock().await.remove(instance_id) {
            Some(_) => Ok(()),
            None if instance_id.starts_with(INSTANCE_PREFIX) => Ok(()),
            None => Err(ProviderError::InstanceNotFound(instance_id.to_string())),
        }
    }

    async fn start_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.with_instance(instance_id, |s| {
            Self::transition(s, InstanceState::Stopped, InstanceState::Running)
        })
        .await
    }

    async fn stop_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.with_instance(instance_id, |s| {
            Self::transition(s, InstanceState::Running, InstanceState::Stopped)
        })
        .await
    }

    async fn restart_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.with_instance(instance_id, |s| {
            Self::transition(s, InstanceState::Running, InstanceState::Running)
        })
        .await
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceSnapshot, ProviderError> {
        self.with_instance(instance_id, |s| Ok(s.clone())).await
    }

    async fn list_instances(
        &self,
        req: &ListInstancesRequest,
    ) -> Result<InstanceList, ProviderError> {
        let instances = self.instances.lock().await;
        let mut matching: Vec<InstanceSnapshot> = instances
            .values()
            .filter(|s| req.region.as_deref().is_none_or(|r| s.region == r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let total_count = matching.len() as u32;
        let limit = if req.limit == 0 { 20 } else { req.limit } as usize;
        let page = matching
            .into_iter()
            .skip(req.offset as usize)
            .take(limit)
            .collect();
        Ok(InstanceList {
            instances: page,
            total_count,
        })
    }

    async fn instance_metrics(&self, req: &MetricsRequest) -> Result<MetricSeries, ProviderError> {
        self.with_instance(&req.instance_id, |_| Ok(())).await?;
        let unit = if req.metric_name.to_ascii_lowercase().contains("traffic") {
            "MB"
        } else {
            "%"
        };
        Ok(MetricSeries {
            metric_name: req.metric_name.clone(),
            points: vec![
                MetricPoint {
                    timestamp: req.start,
                    value: 50.0,
                    unit: unit.to_string(),
                },
                MetricPoint {
                    timestamp: req.end,
                    value: 60.0,
                    unit: unit.to_string(),
                },
            ],
        })
    }

    async fn reset_password(
        &self,
        instance_id: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        if new_password.len() < 8 {
            return Err(ProviderError::Rejected {
                code: "InvalidParameterValue.Password".to_string(),
                message: "password must be at least 8 characters".to_string(),
            });
        }
        self.with_instance(instance_id, |s| {
            Self::transition(s, InstanceState::Stopped, InstanceState::Stopped)
        })
        .await
    }

    async fn rebuild_instance(
        &self,
        instance_id: &str,
        image_id: &str,
        _password: &str,
    ) -> Result<(), ProviderError> {
        let image = IMAGES
            .iter()
            .find(|i| i.image_id == image_id)
            .ok_or_else(|| ProviderError::Rejected {
                code: "InvalidParameterValue.BlueprintId".to_string(),
                message: format!("unknown blueprint {}", image_id),
            })?;
        self.with_instance(instance_id, |s| {
            s.image_id = image.image_id.clone();
            s.os_type = image.os_type.clone();
            s.os_name = image.os_name.clone();
            s.state = InstanceState::Running;
            Ok(())
        })
        .await
    }

    async fn regions(&self) -> Result<Vec<Region>, ProviderError> {
        Ok(REGIONS.clone())
    }

    async fn images(&self, filter: &ImageFilter) -> Result<Vec<Image>, ProviderError> {
        if !serves_region(filter.region.as_deref()) {
            return Ok(Vec::new());
        }
        Ok(IMAGES
            .iter()
            .filter(|i| {
                filter
                    .os_type
                    .as_deref()
                    .is_none_or(|os| i.os_type.eq_ignore_ascii_case(os))
            })
            .filter(|i| {
                filter
                    .image_type
                    .as_deref()
                    .is_none_or(|t| i.image_type.eq_ignore_ascii_case(t))
            })
            .cloned()
            .collect())
    }

    async fn instance_types(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<InstanceType>, ProviderError> {
        if !serves_region(region) {
            return Ok(Vec::new());
        }
        Ok(INSTANCE_TYPES
            .iter()
            .map(|t| InstanceType {
                instance_type: t.id.to_string(),
                cpu: t.cpu,
                memory: t.memory,
                storage: t.storage,
                bandwidth: t.bandwidth,
                traffic: t.traffic,
                price: Decimal::new(t.price, 0),
                description: format!("{} vCPU / {} GB", t.cpu, t.memory),
            })
            .collect())
    }
}

/// No region means every region
fn serves_region(region: Option<&str>) -> bool {
    region.is_none_or(|r| REGIONS.iter().any(|reg| reg.region_id == r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TencentLighthouseProvider {
        TencentLighthouseProvider::new(ProviderSettings {
            secret_id: "AKIDtest".into(),
            secret_key: "secret".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn create_req() -> CreateInstanceRequest {
        CreateInstanceRequest {
            name: "web-1".into(),
            region: "ap-guangzhou".into(),
            zone: "ap-guangzhou-3".into(),
            image_id: "img-ubuntu-20-04".into(),
            instance_type: "lighthouse-2c4g".into(),
            password: "Passw0rd!".into(),
            period_months: 3,
            auto_renew: false,
        }
    }

    #[test]
    fn test_missing_keys_rejected() {
        let err = TencentLighthouseProvider::new(ProviderSettings::default()).unwrap_err();
        assert!(matches!(err, ProviderError::IncompleteConfig(_)));
    }

    #[test]
    fn test_defaults_applied() {
        let p = provider();
        assert_eq!(p.settings().endpoint, DEFAULT_ENDPOINT);
        assert_eq!(p.settings().region, DEFAULT_REGION);
        assert_eq!(p.code(), "tencent");
        assert_eq!(p.name(), "Tencent Cloud");
    }

    #[tokio::test]
    async fn test_create_then_lifecycle() {
        let p = provider();
        let created = p.create_instance(&create_req()).await.unwrap();
        assert!(created.instance_id.starts_with("lhins-"));

        let snap = p.describe_instance(&created.instance_id).await.unwrap();
        assert_eq!(snap.state, InstanceState::Running);
        assert_eq!(snap.cpu, 2);
        assert_eq!(snap.memory, 4);
        assert_eq!(snap.name, "web-1");

        // starting a running instance is refused
        assert!(matches!(
            p.start_instance(&created.instance_id).await,
            Err(ProviderError::Rejected { .. })
        ));

        p.stop_instance(&created.instance_id).await.unwrap();
        let snap = p.describe_instance(&created.instance_id).await.unwrap();
        assert_eq!(snap.state, InstanceState::Stopped);

        p.start_instance(&created.instance_id).await.unwrap();
        p.restart_instance(&created.instance_id).await.unwrap();

        p.delete_instance(&created.instance_id).await.unwrap();
        let list = p.list_instances(&ListInstancesRequest::default()).await.unwrap();
        assert_eq!(list.total_count, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_bundle() {
        let p = provider();
        let mut req = create_req();
        req.instance_type = "lighthouse-64c512g".into();
        let err = p.create_instance(&req).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_unknown_prefixed_id_is_adopted() {
        let p = provider();
        let snap = p.describe_instance("lhins-deadbeef").await.unwrap();
        assert_eq!(snap.state, InstanceState::Running);
        assert_eq!(snap.public_ip, "1.2.3.4");

        let err = p.describe_instance("ins-foreign").await.unwrap_err();
        assert!(matches!(err, ProviderError::InstanceNotFound(_)));
    }

    #[tokio::test]
    async fn test_catalog_tables() {
        let p = provider();
        let regions = p.regions().await.unwrap();
        assert_eq!(regions.len(), 3);
        assert!(regions.iter().all(|r| r.zones.len() == 2));

        let windows = p
            .images(&ImageFilter {
                os_type: Some("windows".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].image_id, "img-windows-2019");

        let types = p.instance_types(Some("ap-beijing")).await.unwrap();
        assert_eq!(types.len(), 5);
        assert_eq!(types[0].price, Decimal::new(24, 0));
        assert!(p.instance_types(Some("eu-frankfurt")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_images_follow_region() {
        let p = provider();
        let in_region = |region: &str| ImageFilter {
            region: Some(region.into()),
            ..Default::default()
        };
        assert_eq!(p.images(&in_region("ap-beijing")).await.unwrap().len(), 3);
        assert!(p.images(&in_region("eu-frankfurt")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_and_maintenance() {
        let p = provider();
        let id = p.create_instance(&create_req()).await.unwrap().instance_id;
        let now = Utc::now();
        let series = p
            .instance_metrics(&MetricsRequest {
                instance_id: id.clone(),
                metric_name: "CpuUsage".into(),
                start: now - Duration::hours(1),
                end: now,
                period_secs: 300,
            })
            .await
            .unwrap();
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].unit, "%");

        // password reset requires a stopped instance
        assert!(p.reset_password(&id, "NewPassw0rd").await.is_err());
        p.stop_instance(&id).await.unwrap();
        p.reset_password(&id, "NewPassw0rd").await.unwrap();

        p.rebuild_instance(&id, "img-centos-7-8", "NewPassw0rd").await.unwrap();
        let snap = p.describe_instance(&id).await.unwrap();
        assert_eq!(snap.os_name, "CentOS 7.8");
        assert_eq!(snap.state, InstanceState::Running);
    }
}
