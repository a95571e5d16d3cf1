//! Kubernetes provisioner implementation.
//!
//! This module provides the `K8sProvisioner`, which gives each resource pool
//! its own namespace and a `ResourceQuota` capped at the pool's capacity.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, ResourceQuota};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::{debug, info};

use ocloud_store::ResourcePoolSpec;

use crate::quota::{build_namespace, build_resource_quota, pool_scope};
use crate::types::{ClusterConfig, PoolScope};
use crate::Result;

/// The `ClusterProvisioner` trait isolates pools inside the underlying cluster.
#[async_trait]
pub trait ClusterProvisioner: Send + Sync {
    /// Ensure the namespace and quota for a pool exist and match its capacity.
    ///
    /// Calling this repeatedly with the same pool is a no-op after the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster API rejects the objects.
    async fn ensure_pool_scope(&self, pool: &ResourcePoolSpec) -> Result<PoolScope>;
}

/// Kubernetes-based provisioner.
pub struct K8sProvisioner {
    client: Client,
    config: ClusterConfig,
}

impl K8sProvisioner {
    /// Create a provisioner using in-cluster config or the local kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes client cannot be created.
    pub async fn new(config: ClusterConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, config })
    }

    /// Create a provisioner with a pre-configured client.
    #[must_use]
    pub fn with_client(client: Client, config: ClusterConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the provisioner config.
    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    async fn ensure_namespace(&self, scope: &PoolScope) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let namespace = build_namespace(scope);

        match namespaces.create(&PostParams::default(), &namespace).await {
            Ok(_) => {
                info!(namespace = %scope.namespace, "Created pool namespace");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(namespace = %scope.namespace, "Pool namespace already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_quota(&self, scope: &PoolScope) -> Result<()> {
        let quotas: Api<ResourceQuota> = Api::namespaced(self.client.clone(), &scope.namespace);
        let quota = build_resource_quota(scope);

        match quotas.create(&PostParams::default(), &quota).await {
            Ok(_) => {
                info!(
                    namespace = %scope.namespace,
                    quota = %scope.quota_name,
                    "Created pool quota"
                );
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                // Capacity may have changed since the quota was created.
                let params = PatchParams {
                    field_manager: Some(self.config.field_manager.clone()),
                    ..Default::default()
                };
                quotas
                    .patch(&scope.quota_name, &params, &Patch::Merge(&quota))
                    .await?;
                debug!(quota = %scope.quota_name, "Pool quota already exists, patched limits");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterProvisioner for K8sProvisioner {
    async fn ensure_pool_scope(&self, pool: &ResourcePoolSpec) -> Result<PoolScope> {
        let scope = pool_scope(pool, &self.config)?;
        self.ensure_namespace(&scope).await?;
        self.ensure_quota(&scope).await?;
        Ok(scope)
    }
}

/// Provisioner used when no cluster is attached.
///
/// Computes the scope so callers see the naming convention, but creates nothing.
#[derive(Debug, Default)]
pub struct NoopProvisioner {
    config: ClusterConfig,
}

impl NoopProvisioner {
    /// Create a no-op provisioner.
    #[must_use]
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClusterProvisioner for NoopProvisioner {
    async fn ensure_pool_scope(&self, pool: &ResourcePoolSpec) -> Result<PoolScope> {
        debug!(pool_name = %pool.name, "Cluster provisioning disabled, skipping");
        pool_scope(pool, &self.config)
    }
}

/// Mock provisioner for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::ClusterError;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashSet};

    /// A mock provisioner that records scopes in memory.
    #[derive(Default)]
    pub struct MockProvisioner {
        config: ClusterConfig,
        scopes: Mutex<BTreeMap<String, PoolScope>>,
        calls: Mutex<usize>,
        failing: Mutex<HashSet<String>>,
    }

    impl MockProvisioner {
        /// Create a new mock provisioner.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make provisioning of `pool_name` fail.
        pub fn fail_pool(&self, pool_name: &str) {
            self.failing.lock().insert(pool_name.to_string());
        }

        /// Number of provisioned scopes.
        #[must_use]
        pub fn scope_count(&self) -> usize {
            self.scopes.lock().len()
        }

        /// Number of `ensure_pool_scope` calls.
        #[must_use]
        pub fn call_count(&self) -> usize {
            *self.calls.lock()
        }

        /// Get the scope provisioned for a namespace.
        #[must_use]
        pub fn scope(&self, namespace: &str) -> Option<PoolScope> {
            self.scopes.lock().get(namespace).cloned()
        }
    }

    #[async_trait]
    impl ClusterProvisioner for MockProvisioner {
        async fn ensure_pool_scope(&self, pool: &ResourcePoolSpec) -> Result<PoolScope> {
            *self.calls.lock() += 1;
            if self.failing.lock().contains(&pool.name) {
                return Err(ClusterError::Config(format!(
                    "injected failure for pool {}",
                    pool.name
                )));
            }
            let scope = pool_scope(pool, &self.config)?;
            self.scopes
                .lock()
                .insert(scope.namespace.clone(), scope.clone());
            Ok(scope)
        }
    }
}
