//! In-memory O2 inventory records.
//!
//! Resources, deployments, alarms and subscriptions live here. Resource pools
//! are owned by the [`ResourceManager`](ocloud_control::ResourceManager); this
//! store only keeps the O2 identifier and description assigned to each pool
//! name.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use ocloud_core::{AlarmId, DeploymentId, ResourceId, ResourcePoolId, SubscriptionId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status given to newly created resources.
pub const RESOURCE_STATUS_ACTIVE: &str = "active";
/// Status given to newly created deployments.
pub const DEPLOYMENT_STATUS_PENDING: &str = "pending";

/// An infrastructure resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2Resource {
    /// Server-assigned identifier.
    pub id: ResourceId,
    /// Resource name.
    pub name: String,
    /// Resource type, e.g. `server`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Pool the resource belongs to.
    pub pool_id: String,
    /// Lifecycle status.
    pub status: String,
    /// Free-form properties.
    pub properties: Map<String, Value>,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// When the resource was last replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client-supplied resource fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBody {
    /// Resource name.
    #[serde(default)]
    pub name: String,
    /// Resource type.
    #[serde(default, rename = "type")]
    pub resource_type: String,
    /// Pool the resource belongs to.
    #[serde(default)]
    pub pool_id: String,
    /// Lifecycle status; kept on update when absent.
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A deployment managed through O2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2Deployment {
    /// Server-assigned identifier.
    pub id: DeploymentId,
    /// Deployment name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// IDs of the resources the deployment uses.
    pub resources: Vec<String>,
    /// Deployment parameters.
    pub parameters: Map<String, Value>,
    /// When the deployment was created.
    pub created_at: DateTime<Utc>,
    /// When the deployment was last replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client-supplied deployment fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentBody {
    /// Deployment name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Lifecycle status; kept on update when absent.
    #[serde(default)]
    pub status: Option<String>,
    /// IDs of the resources the deployment uses.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Deployment parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// An alarm raised against the O-Cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2Alarm {
    /// Server-assigned identifier.
    pub id: AlarmId,
    /// Alarm type, e.g. `resource`.
    #[serde(rename = "type")]
    pub alarm_type: String,
    /// Severity, e.g. `warning`.
    pub severity: String,
    /// What raised it.
    pub source: String,
    /// Description.
    pub description: String,
    /// When it was raised.
    pub timestamp: DateTime<Utc>,
    /// Whether an operator acknowledged it.
    pub acknowledged: bool,
    /// When it was acknowledged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Client-supplied alarm fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmBody {
    /// Alarm type.
    #[serde(default, rename = "type")]
    pub alarm_type: String,
    /// Severity.
    #[serde(default)]
    pub severity: String,
    /// What raised it.
    #[serde(default)]
    pub source: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// An event subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2Subscription {
    /// Server-assigned identifier.
    pub id: SubscriptionId,
    /// Event type, e.g. `resource-change`.
    #[serde(rename = "type")]
    pub subscription_type: String,
    /// Where notifications are delivered.
    pub callback: String,
    /// Event filter.
    pub filter: BTreeMap<String, String>,
    /// Whether the subscription is live.
    pub active: bool,
}

/// Client-supplied subscription fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionBody {
    /// Event type.
    #[serde(default, rename = "type")]
    pub subscription_type: String,
    /// Where notifications are delivered.
    #[serde(default)]
    pub callback: String,
    /// Event filter.
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
}

/// O2 identity of a resource pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRecord {
    /// O2 identifier.
    pub id: ResourcePoolId,
    /// Pool name in the resource manager.
    pub name: String,
    /// Operator-supplied description.
    pub description: String,
}

#[derive(Default)]
struct Pools {
    by_id: HashMap<ResourcePoolId, PoolRecord>,
    by_name: HashMap<String, ResourcePoolId>,
}

/// The O2 record maps, one lock per family.
#[derive(Default)]
pub struct O2Store {
    pools: RwLock<Pools>,
    resources: RwLock<HashMap<ResourceId, O2Resource>>,
    deployments: RwLock<HashMap<DeploymentId, O2Deployment>>,
    alarms: RwLock<HashMap<AlarmId, O2Alarm>>,
    subscriptions: RwLock<HashMap<SubscriptionId, O2Subscription>>,
}

impl O2Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Pools

    /// The record for `name`, assigning an identifier on first sight.
    pub fn pool_record(&self, name: &str) -> PoolRecord {
        if let Some(record) = self.pool_record_by_name(name) {
            return record;
        }
        let mut pools = self.pools.write();
        // Another writer may have assigned one in between.
        if let Some(id) = pools.by_name.get(name) {
            if let Some(record) = pools.by_id.get(id) {
                return record.clone();
            }
        }
        let record = PoolRecord {
            id: ResourcePoolId::generate(),
            name: name.to_string(),
            description: String::new(),
        };
        pools.by_name.insert(name.to_string(), record.id);
        pools.by_id.insert(record.id, record.clone());
        record
    }

    fn pool_record_by_name(&self, name: &str) -> Option<PoolRecord> {
        let pools = self.pools.read();
        pools
            .by_name
            .get(name)
            .and_then(|id| pools.by_id.get(id))
            .cloned()
    }

    /// Look up a pool record by O2 identifier.
    #[must_use]
    pub fn pool(&self, id: &ResourcePoolId) -> Option<PoolRecord> {
        self.pools.read().by_id.get(id).cloned()
    }

    /// Set the description of the pool named `name`.
    pub fn describe_pool(&self, name: &str, description: impl Into<String>) -> PoolRecord {
        let id = self.pool_record(name).id;
        let mut pools = self.pools.write();
        let description = description.into();
        match pools.by_id.get_mut(&id) {
            Some(record) => {
                record.description = description;
                record.clone()
            }
            None => PoolRecord {
                id,
                name: name.to_string(),
                description,
            },
        }
    }

    /// Forget a pool record.
    pub fn remove_pool(&self, id: &ResourcePoolId) -> Option<PoolRecord> {
        let mut pools = self.pools.write();
        let record = pools.by_id.remove(id)?;
        pools.by_name.remove(&record.name);
        Some(record)
    }

    // Resources

    /// All resources, oldest first.
    #[must_use]
    pub fn list_resources(&self) -> Vec<O2Resource> {
        let mut resources: Vec<_> = self.resources.read().values().cloned().collect();
        resources.sort_by_key(|r| r.created_at);
        resources
    }

    /// Look up a resource.
    #[must_use]
    pub fn get_resource(&self, id: &ResourceId) -> Option<O2Resource> {
        self.resources.read().get(id).cloned()
    }

    /// Create a resource under a fresh identifier.
    pub fn create_resource(&self, body: ResourceBody) -> O2Resource {
        let resource = O2Resource {
            id: ResourceId::generate(),
            name: body.name,
            resource_type: body.resource_type,
            pool_id: body.pool_id,
            status: RESOURCE_STATUS_ACTIVE.to_string(),
            properties: body.properties,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.resources.write().insert(resource.id, resource.clone());
        resource
    }

    /// Replace the resource stored under `id`, keeping its creation time.
    pub fn replace_resource(&self, id: ResourceId, body: ResourceBody) -> O2Resource {
        let now = Utc::now();
        let mut resources = self.resources.write();
        let previous = resources.get(&id);
        let resource = O2Resource {
            id,
            name: body.name,
            resource_type: body.resource_type,
            pool_id: body.pool_id,
            status: body
                .status
                .or_else(|| previous.map(|r| r.status.clone()))
                .unwrap_or_else(|| RESOURCE_STATUS_ACTIVE.to_string()),
            properties: body.properties,
            created_at: previous.map_or(now, |r| r.created_at),
            updated_at: Some(now),
        };
        resources.insert(id, resource.clone());
        resource
    }

    /// Remove a resource. Returns whether it existed.
    pub fn delete_resource(&self, id: &ResourceId) -> bool {
        self.resources.write().remove(id).is_some()
    }

    // Deployments

    /// All deployments, oldest first.
    #[must_use]
    pub fn list_deployments(&self) -> Vec<O2Deployment> {
        let mut deployments: Vec<_> = self.deployments.read().values().cloned().collect();
        deployments.sort_by_key(|d| d.created_at);
        deployments
    }

    /// Look up a deployment.
    #[must_use]
    pub fn get_deployment(&self, id: &DeploymentId) -> Option<O2Deployment> {
        self.deployments.read().get(id).cloned()
    }

    /// Create a deployment under a fresh identifier.
    pub fn create_deployment(&self, body: DeploymentBody) -> O2Deployment {
        let deployment = O2Deployment {
            id: DeploymentId::generate(),
            name: body.name,
            description: body.description,
            status: DEPLOYMENT_STATUS_PENDING.to_string(),
            resources: body.resources,
            parameters: body.parameters,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.deployments
            .write()
            .insert(deployment.id, deployment.clone());
        deployment
    }

    /// Replace the deployment stored under `id`, keeping its creation time.
    pub fn replace_deployment(&self, id: DeploymentId, body: DeploymentBody) -> O2Deployment {
        let now = Utc::now();
        let mut deployments = self.deployments.write();
        let previous = deployments.get(&id);
        let deployment = O2Deployment {
            id,
            name: body.name,
            description: body.description,
            status: body
                .status
                .or_else(|| previous.map(|d| d.status.clone()))
                .unwrap_or_else(|| DEPLOYMENT_STATUS_PENDING.to_string()),
            resources: body.resources,
            parameters: body.parameters,
            created_at: previous.map_or(now, |d| d.created_at),
            updated_at: Some(now),
        };
        deployments.insert(id, deployment.clone());
        deployment
    }

    /// Remove a deployment. Returns whether it existed.
    pub fn delete_deployment(&self, id: &DeploymentId) -> bool {
        self.deployments.write().remove(id).is_some()
    }

    // Alarms

    /// All alarms, newest first.
    #[must_use]
    pub fn list_alarms(&self) -> Vec<O2Alarm> {
        let mut alarms: Vec<_> = self.alarms.read().values().cloned().collect();
        alarms.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alarms
    }

    /// Look up an alarm.
    #[must_use]
    pub fn get_alarm(&self, id: &AlarmId) -> Option<O2Alarm> {
        self.alarms.read().get(id).cloned()
    }

    /// Raise a new alarm.
    pub fn raise_alarm(&self, body: AlarmBody) -> O2Alarm {
        let alarm = O2Alarm {
            id: AlarmId::generate(),
            alarm_type: body.alarm_type,
            severity: body.severity,
            source: body.source,
            description: body.description,
            timestamp: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
        };
        self.alarms.write().insert(alarm.id, alarm.clone());
        alarm
    }

    /// Mark an alarm acknowledged. Acknowledging twice keeps the first time.
    pub fn acknowledge_alarm(&self, id: &AlarmId) -> Option<O2Alarm> {
        let mut alarms = self.alarms.write();
        let alarm = alarms.get_mut(id)?;
        if !alarm.acknowledged {
            alarm.acknowledged = true;
            alarm.acknowledged_at = Some(Utc::now());
        }
        Some(alarm.clone())
    }

    // Subscriptions

    /// All subscriptions.
    #[must_use]
    pub fn list_subscriptions(&self) -> Vec<O2Subscription> {
        let mut subscriptions: Vec<_> = self.subscriptions.read().values().cloned().collect();
        subscriptions.sort_by_key(|s| s.id);
        subscriptions
    }

    /// Look up a subscription.
    #[must_use]
    pub fn get_subscription(&self, id: &SubscriptionId) -> Option<O2Subscription> {
        self.subscriptions.read().get(id).cloned()
    }

    /// Create an active subscription.
    pub fn create_subscription(&self, body: SubscriptionBody) -> O2Subscription {
        let subscription = O2Subscription {
            id: SubscriptionId::generate(),
            subscription_type: body.subscription_type,
            callback: body.callback,
            filter: body.filter,
            active: true,
        };
        self.subscriptions
            .write()
            .insert(subscription.id, subscription.clone());
        subscription
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn delete_subscription(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.write().remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_ids_are_stable_per_name() {
        let store = O2Store::new();
        let first = store.pool_record("edge-1");
        let again = store.pool_record("edge-1");
        let other = store.pool_record("core");

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
        assert_eq!(store.pool(&first.id).unwrap().name, "edge-1");

        store.describe_pool("edge-1", "Edge compute");
        assert_eq!(store.pool(&first.id).unwrap().description, "Edge compute");

        store.remove_pool(&first.id);
        assert!(store.pool(&first.id).is_none());
        assert_ne!(store.pool_record("edge-1").id, first.id);
    }

    #[test]
    fn replace_keeps_created_at_and_status() {
        let store = O2Store::new();
        let created = store.create_resource(ResourceBody {
            name: "server-1".into(),
            ..ResourceBody::default()
        });
        assert_eq!(created.status, RESOURCE_STATUS_ACTIVE);

        let replaced = store.replace_resource(
            created.id,
            ResourceBody {
                name: "server-1b".into(),
                ..ResourceBody::default()
            },
        );
        assert_eq!(replaced.created_at, created.created_at);
        assert_eq!(replaced.status, RESOURCE_STATUS_ACTIVE);
        assert!(replaced.updated_at.is_some());
        assert_eq!(store.get_resource(&created.id).unwrap().name, "server-1b");
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let store = O2Store::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        store.create_deployment(DeploymentBody::default());
                    }
                });
            }
        });
        assert_eq!(store.list_deployments().len(), 400);
    }

    #[test]
    fn acknowledge_is_sticky() {
        let store = O2Store::new();
        let alarm = store.raise_alarm(AlarmBody {
            alarm_type: "resource".into(),
            severity: "warning".into(),
            ..AlarmBody::default()
        });

        let first = store.acknowledge_alarm(&alarm.id).unwrap();
        let second = store.acknowledge_alarm(&alarm.id).unwrap();
        assert!(first.acknowledged);
        assert_eq!(first.acknowledged_at, second.acknowledged_at);
        assert!(store.acknowledge_alarm(&AlarmId::generate()).is_none());
    }

    #[test]
    fn subscriptions_are_created_active() {
        let store = O2Store::new();
        let sub = store.create_subscription(SubscriptionBody {
            subscription_type: "resource-change".into(),
            callback: "http://smo/notify".into(),
            ..SubscriptionBody::default()
        });
        assert!(sub.active);
        assert!(store.delete_subscription(&sub.id));
        assert!(!store.delete_subscription(&sub.id));
    }
}
