//! Namespace and `ResourceQuota` builders.
//!
//! Every resource pool gets a namespace `{prefix}{pool}` and a quota
//! `{pool}-quota` whose hard limits mirror the pool's declared capacity.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Namespace, ResourceQuota, ResourceQuotaSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use ocloud_store::ResourcePoolSpec;

use crate::error::{ClusterError, Result};
use crate::types::{ClusterConfig, PoolScope};

/// Label carrying the pool name.
pub const LABEL_POOL: &str = "ocloud.oran.io/pool";
/// Label carrying the pool type.
pub const LABEL_TYPE: &str = "ocloud.oran.io/type";
/// Label carrying the pool location.
pub const LABEL_LOCATION: &str = "ocloud.oran.io/location";

/// Namespace name for a pool.
#[must_use]
pub fn namespace_for_pool(pool_name: &str, config: &ClusterConfig) -> String {
    format!("{}{pool_name}", config.namespace_prefix)
}

/// Quota object name for a pool.
#[must_use]
pub fn quota_name_for_pool(pool_name: &str) -> String {
    format!("{pool_name}-quota")
}

/// Compute the scope (names, labels, limits) for a pool without touching the cluster.
///
/// # Errors
///
/// Returns `ClusterError::InvalidPool` if the pool has no name.
pub fn pool_scope(pool: &ResourcePoolSpec, config: &ClusterConfig) -> Result<PoolScope> {
    if pool.name.is_empty() {
        return Err(ClusterError::InvalidPool("pool name is empty".to_string()));
    }

    let mut labels = BTreeMap::new();
    labels.insert(LABEL_POOL.to_string(), pool.name.clone());
    labels.insert(LABEL_TYPE.to_string(), pool.pool_type.clone());
    labels.insert(LABEL_LOCATION.to_string(), pool.location.clone());

    // Blank dimensions are left unconstrained.
    let hard: BTreeMap<String, String> = [
        ("cpu", &pool.capacity.cpu),
        ("memory", &pool.capacity.memory),
        ("requests.storage", &pool.capacity.storage),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .map(|(key, value)| (key.to_string(), value.trim().to_string()))
    .collect();

    Ok(PoolScope {
        namespace: namespace_for_pool(&pool.name, config),
        quota_name: quota_name_for_pool(&pool.name),
        labels,
        hard,
    })
}

/// Build the namespace object for a scope.
#[must_use]
pub fn build_namespace(scope: &PoolScope) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(scope.namespace.clone()),
            labels: Some(scope.labels.clone()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build the quota object for a scope.
#[must_use]
pub fn build_resource_quota(scope: &PoolScope) -> ResourceQuota {
    let hard = scope
        .hard
        .iter()
        .map(|(key, value)| (key.clone(), Quantity(value.clone())))
        .collect();

    ResourceQuota {
        metadata: ObjectMeta {
            name: Some(scope.quota_name.clone()),
            namespace: Some(scope.namespace.clone()),
            labels: Some(scope.labels.clone()),
            ..Default::default()
        },
        spec: Some(ResourceQuotaSpec {
            hard: Some(hard),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocloud_store::ResourceCapacity;

    fn test_pool() -> ResourcePoolSpec {
        ResourcePoolSpec {
            name: "edge-1".to_string(),
            pool_type: "compute".to_string(),
            location: "site-a".to_string(),
            capacity: ResourceCapacity {
                cpu: "8".to_string(),
                memory: "16Gi".to_string(),
                storage: "1Ti".to_string(),
                network: "10Gbps".to_string(),
            },
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn names_follow_convention() {
        let config = ClusterConfig::default();
        assert_eq!(namespace_for_pool("edge-1", &config), "ocloud-edge-1");
        assert_eq!(quota_name_for_pool("edge-1"), "edge-1-quota");
    }

    #[test]
    fn scope_has_labels_and_limits() {
        let scope = pool_scope(&test_pool(), &ClusterConfig::default()).unwrap();

        assert_eq!(scope.namespace, "ocloud-edge-1");
        assert_eq!(scope.labels.get(LABEL_POOL).unwrap(), "edge-1");
        assert_eq!(scope.labels.get(LABEL_TYPE).unwrap(), "compute");
        assert_eq!(scope.labels.get(LABEL_LOCATION).unwrap(), "site-a");

        assert_eq!(scope.hard.get("cpu").unwrap(), "8");
        assert_eq!(scope.hard.get("memory").unwrap(), "16Gi");
        assert_eq!(scope.hard.get("requests.storage").unwrap(), "1Ti");
        assert!(!scope.hard.contains_key("network"));
    }

    #[test]
    fn blank_dimensions_are_skipped() {
        let mut pool = test_pool();
        pool.capacity.storage = String::new();

        let scope = pool_scope(&pool, &ClusterConfig::default()).unwrap();
        assert!(!scope.hard.contains_key("requests.storage"));
    }

    #[test]
    fn unnamed_pool_is_rejected() {
        let mut pool = test_pool();
        pool.name = String::new();
        assert!(matches!(
            pool_scope(&pool, &ClusterConfig::default()),
            Err(ClusterError::InvalidPool(_))
        ));
    }

    #[test]
    fn quota_object_mirrors_scope() {
        let scope = pool_scope(&test_pool(), &ClusterConfig::default()).unwrap();

        let namespace = build_namespace(&scope);
        assert_eq!(namespace.metadata.name.as_deref(), Some("ocloud-edge-1"));
        assert_eq!(namespace.metadata.labels.as_ref(), Some(&scope.labels));

        let quota = build_resource_quota(&scope);
        assert_eq!(quota.metadata.name.as_deref(), Some("edge-1-quota"));
        assert_eq!(quota.metadata.namespace.as_deref(), Some("ocloud-edge-1"));

        let hard = quota.spec.unwrap().hard.unwrap();
        assert_eq!(hard.get("cpu"), Some(&Quantity("8".to_string())));
        assert_eq!(hard.get("memory"), Some(&Quantity("16Gi".to_string())));
    }
}
