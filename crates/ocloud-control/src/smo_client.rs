//! HTTP client for the upstream Service Management and Orchestration system.
//!
//! The reconciler connects, registers the O-Cloud, reports per-pool resource
//! updates and forwards alarms. Every call takes the O-Cloud's [`SmoConfig`]
//! so one client serves O-Clouds that point at different SMOs.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocloud_store::{OCloud, ResourcePoolSpec, SmoConfig};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// Trait for SMO communication.
///
/// This trait abstracts the SMO client interface, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait SmoClient: Send + Sync {
    /// Call `GET {endpoint}/api/v1/health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMO is unreachable or answers anything but 200.
    async fn connect(&self, config: &SmoConfig) -> Result<()>;

    /// Register an O-Cloud with `POST {endpoint}/api/v1/oclouds`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the SMO answers 200 or 201.
    async fn register_ocloud(&self, config: &SmoConfig, ocloud: &OCloud) -> Result<()>;

    /// Report a resource change with `POST {endpoint}/api/v1/resource-updates`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the SMO answers 200.
    async fn report_resource_update(&self, config: &SmoConfig, update: &ResourceUpdate)
        -> Result<()>;

    /// Fetch policies with `GET {endpoint}/api/v1/oclouds/{id}/policies`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the SMO answers 200 with a policy list.
    async fn get_policies(&self, config: &SmoConfig, ocloud_id: &str) -> Result<Vec<Policy>>;

    /// Raise an alarm with `POST {endpoint}/api/v1/alarms`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the SMO answers 200 or 201.
    async fn send_alarm(&self, config: &SmoConfig, alarm: &SmoAlarm) -> Result<()>;
}

/// Registration payload sent to the SMO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OCloudRegistration {
    /// O-Cloud identifier, its name.
    pub id: String,
    /// O-Cloud name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Infrastructure flavour.
    pub infrastructure_type: String,
    /// Served regions.
    pub regions: Vec<String>,
    /// Declared pools.
    pub resource_pools: Vec<SmoResourcePool>,
    /// O2 API version.
    pub o2_interface_version: String,
    /// Advertised capabilities.
    pub capabilities: Vec<String>,
    /// When the registration was built.
    pub registered_at: DateTime<Utc>,
}

impl OCloudRegistration {
    /// Project an O-Cloud into its registration payload.
    #[must_use]
    pub fn from_ocloud(ocloud: &OCloud) -> Self {
        Self {
            id: ocloud.name.clone(),
            name: ocloud.name.clone(),
            description: format!("O-Cloud instance {}", ocloud.name),
            infrastructure_type: ocloud.spec.infrastructure_type.clone(),
            regions: ocloud.spec.regions.clone(),
            resource_pools: ocloud
                .spec
                .resource_pools
                .iter()
                .map(SmoResourcePool::from)
                .collect(),
            o2_interface_version: ocloud.spec.o2_interface.version.clone(),
            capabilities: ocloud.spec.smo.capabilities.clone(),
            registered_at: Utc::now(),
        }
    }
}

/// Pool shape inside a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoResourcePool {
    /// Pool name.
    pub name: String,
    /// Pool type.
    #[serde(rename = "type")]
    pub pool_type: String,
    /// Pool location.
    pub location: String,
    /// Declared capacity.
    pub capacity: SmoResourceCapacity,
}

impl From<&ResourcePoolSpec> for SmoResourcePool {
    fn from(pool: &ResourcePoolSpec) -> Self {
        Self {
            name: pool.name.clone(),
            pool_type: pool.pool_type.clone(),
            location: pool.location.clone(),
            capacity: SmoResourceCapacity {
                cpu: pool.capacity.cpu.clone(),
                memory: pool.capacity.memory.clone(),
                storage: pool.capacity.storage.clone(),
                network: pool.capacity.network.clone(),
            },
        }
    }
}

/// Capacity shape inside a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoResourceCapacity {
    /// CPU quantity.
    pub cpu: String,
    /// Memory quantity.
    pub memory: String,
    /// Storage quantity.
    pub storage: String,
    /// Network bandwidth.
    pub network: String,
}

/// A resource change reported upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    /// The reporting O-Cloud.
    #[serde(rename = "oCloudId")]
    pub ocloud_id: String,
    /// Kind of resource, e.g. `resourcePool`.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// `created`, `updated` or `deleted`.
    pub update_type: String,
    /// Previous value, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    /// Current value.
    pub new_value: serde_json::Value,
    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
}

/// A policy published by the SMO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Policy identifier.
    pub id: String,
    /// Policy name.
    pub name: String,
    /// Policy type.
    #[serde(rename = "type")]
    pub policy_type: String,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    /// When the policy applies.
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
    /// What it does.
    #[serde(default)]
    pub actions: Vec<PolicyAction>,
    /// Free-form parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Start of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// A policy condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCondition {
    /// Condition type.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Comparison operator.
    pub operator: String,
    /// Operand.
    pub value: String,
}

/// A policy action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAction {
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Target of the action.
    pub target: String,
    /// Free-form parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// An alarm raised towards the SMO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoAlarm {
    /// Alarm identifier.
    pub id: String,
    /// Alarm type.
    #[serde(rename = "type")]
    pub alarm_type: String,
    /// `critical`, `major`, `minor` or `warning`.
    pub severity: String,
    /// Emitting component.
    pub source: String,
    /// Human-readable description.
    pub description: String,
    /// Structured detail.
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    /// When it was raised.
    pub timestamp: DateTime<Utc>,
    /// Whether an operator has acknowledged it.
    #[serde(default)]
    pub acknowledged: bool,
}

/// HTTP client for SMO endpoints.
#[derive(Debug, Clone)]
pub struct HttpSmoClient {
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl HttpSmoClient {
    /// Create a client with the given request timeout.
    ///
    /// `auth_token` is sent as a bearer token to SMOs whose `authType` is set.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Internal` if the HTTP client cannot be built.
    pub fn new(timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ControlError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, auth_token })
    }

    /// Create a client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, auth_token: Option<String>) -> Self {
        Self { client, auth_token }
    }

    fn url(config: &SmoConfig, path: &str) -> String {
        format!("{}{path}", config.endpoint.trim_end_matches('/'))
    }

    fn authorize(&self, config: &SmoConfig, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.auth_token, config.auth_type.is_empty()) {
            (Some(token), false) => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn send(
        &self,
        config: &SmoConfig,
        request: reqwest::RequestBuilder,
        what: &str,
        accepted: &[StatusCode],
    ) -> Result<reqwest::Response> {
        let response = self
            .authorize(config, request)
            .send()
            .await
            .map_err(|e| ControlError::Smo {
                status: None,
                message: format!("{what} failed: {e}"),
            })?;

        let status = response.status();
        if accepted.contains(&status) {
            Ok(response)
        } else {
            Err(ControlError::Smo {
                status: Some(status.as_u16()),
                message: format!("{what} returned status {}", status.as_u16()),
            })
        }
    }
}

#[async_trait]
impl SmoClient for HttpSmoClient {
    async fn connect(&self, config: &SmoConfig) -> Result<()> {
        tracing::info!(
            endpoint = %config.endpoint,
            aiml_enabled = config.aiml_enabled,
            "Connecting to SMO"
        );

        let request = self.client.get(Self::url(config, "/api/v1/health"));
        self.send(config, request, "SMO health check", &[StatusCode::OK])
            .await
            .inspect_err(|e| tracing::error!(error = %e, "SMO health check failed"))?;

        tracing::info!(endpoint = %config.endpoint, "Connected to SMO");
        Ok(())
    }

    async fn register_ocloud(&self, config: &SmoConfig, ocloud: &OCloud) -> Result<()> {
        tracing::info!(ocloud = %ocloud.name, "Registering O-Cloud with SMO");

        let registration = OCloudRegistration::from_ocloud(ocloud);
        let request = self
            .client
            .post(Self::url(config, "/api/v1/oclouds"))
            .json(&registration);
        self.send(
            config,
            request,
            "O-Cloud registration",
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;

        tracing::info!(ocloud = %ocloud.name, "O-Cloud registered with SMO");
        Ok(())
    }

    async fn report_resource_update(
        &self,
        config: &SmoConfig,
        update: &ResourceUpdate,
    ) -> Result<()> {
        tracing::debug!(
            resource_type = %update.resource_type,
            resource_id = %update.resource_id,
            "Reporting resource update to SMO"
        );

        let request = self
            .client
            .post(Self::url(config, "/api/v1/resource-updates"))
            .json(update);
        self.send(config, request, "resource update", &[StatusCode::OK])
            .await?;
        Ok(())
    }

    async fn get_policies(&self, config: &SmoConfig, ocloud_id: &str) -> Result<Vec<Policy>> {
        tracing::debug!(ocloud = %ocloud_id, "Fetching policies from SMO");

        let request = self
            .client
            .get(Self::url(config, &format!("/api/v1/oclouds/{ocloud_id}/policies")));
        let response = self
            .send(config, request, "policies fetch", &[StatusCode::OK])
            .await?;

        let policies: Vec<Policy> = response.json().await.map_err(|e| ControlError::Smo {
            status: None,
            message: format!("failed to decode policies: {e}"),
        })?;

        tracing::info!(policy_count = policies.len(), "Fetched policies from SMO");
        Ok(policies)
    }

    async fn send_alarm(&self, config: &SmoConfig, alarm: &SmoAlarm) -> Result<()> {
        tracing::warn!(
            alarm_type = %alarm.alarm_type,
            severity = %alarm.severity,
            "Sending alarm to SMO"
        );

        let request = self
            .client
            .post(Self::url(config, "/api/v1/alarms"))
            .json(alarm);
        self.send(
            config,
            request,
            "alarm send",
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;
        Ok(())
    }
}

/// A no-op SMO client for when no SMO is reachable from this deployment.
///
/// Every call succeeds without network traffic.
#[derive(Debug, Clone, Default)]
pub struct NoopSmoClient;

impl NoopSmoClient {
    /// Create a new no-op SMO client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SmoClient for NoopSmoClient {
    async fn connect(&self, config: &SmoConfig) -> Result<()> {
        tracing::warn!(
            endpoint = %config.endpoint,
            "NoopSmoClient: connect called but SMO integration is disabled"
        );
        Ok(())
    }

    async fn register_ocloud(&self, _config: &SmoConfig, ocloud: &OCloud) -> Result<()> {
        tracing::warn!(
            ocloud = %ocloud.name,
            "NoopSmoClient: register_ocloud called but SMO integration is disabled"
        );
        Ok(())
    }

    async fn report_resource_update(
        &self,
        _config: &SmoConfig,
        _update: &ResourceUpdate,
    ) -> Result<()> {
        Ok(())
    }

    async fn get_policies(&self, _config: &SmoConfig, _ocloud_id: &str) -> Result<Vec<Policy>> {
        Ok(Vec::new())
    }

    async fn send_alarm(&self, _config: &SmoConfig, alarm: &SmoAlarm) -> Result<()> {
        tracing::warn!(
            alarm_type = %alarm.alarm_type,
            "NoopSmoClient: send_alarm called but SMO integration is disabled"
        );
        Ok(())
    }
}

/// Mock SMO client for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    /// A mock SMO client that records calls in memory.
    #[derive(Default)]
    pub struct MockSmoClient {
        fail_connect: Mutex<bool>,
        fail_register: Mutex<bool>,
        fail_updates: Mutex<bool>,
        connects: Mutex<usize>,
        registrations: Mutex<Vec<String>>,
        updates: Mutex<Vec<ResourceUpdate>>,
        alarms: Mutex<Vec<SmoAlarm>>,
        policies: Mutex<Vec<Policy>>,
    }

    impl MockSmoClient {
        /// Create a new mock SMO client.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `connect` fail.
        pub fn set_fail_connect(&self, fail: bool) {
            *self.fail_connect.lock() = fail;
        }

        /// Make `register_ocloud` fail.
        pub fn set_fail_register(&self, fail: bool) {
            *self.fail_register.lock() = fail;
        }

        /// Make `report_resource_update` fail.
        pub fn set_fail_updates(&self, fail: bool) {
            *self.fail_updates.lock() = fail;
        }

        /// Policies returned by `get_policies`.
        pub fn set_policies(&self, policies: Vec<Policy>) {
            *self.policies.lock() = policies;
        }

        /// Number of `connect` calls.
        #[must_use]
        pub fn connect_count(&self) -> usize {
            *self.connects.lock()
        }

        /// Names of registered O-Clouds, in call order.
        #[must_use]
        pub fn registrations(&self) -> Vec<String> {
            self.registrations.lock().clone()
        }

        /// Reported resource updates, in call order.
        #[must_use]
        pub fn updates(&self) -> Vec<ResourceUpdate> {
            self.updates.lock().clone()
        }

        /// Raised alarms, in call order.
        #[must_use]
        pub fn alarms(&self) -> Vec<SmoAlarm> {
            self.alarms.lock().clone()
        }
    }

    fn injected(what: &str) -> ControlError {
        ControlError::Smo {
            status: Some(503),
            message: format!("{what} returned status 503"),
        }
    }

    #[async_trait]
    impl SmoClient for MockSmoClient {
        async fn connect(&self, _config: &SmoConfig) -> Result<()> {
            *self.connects.lock() += 1;
            if *self.fail_connect.lock() {
                return Err(injected("SMO health check"));
            }
            Ok(())
        }

        async fn register_ocloud(&self, _config: &SmoConfig, ocloud: &OCloud) -> Result<()> {
            if *self.fail_register.lock() {
                return Err(injected("O-Cloud registration"));
            }
            self.registrations.lock().push(ocloud.name.clone());
            Ok(())
        }

        async fn report_resource_update(
            &self,
            _config: &SmoConfig,
            update: &ResourceUpdate,
        ) -> Result<()> {
            if *self.fail_updates.lock() {
                return Err(injected("resource update"));
            }
            self.updates.lock().push(update.clone());
            Ok(())
        }

        async fn get_policies(&self, _config: &SmoConfig, _ocloud_id: &str) -> Result<Vec<Policy>> {
            Ok(self.policies.lock().clone())
        }

        async fn send_alarm(&self, _config: &SmoConfig, alarm: &SmoAlarm) -> Result<()> {
            self.alarms.lock().push(alarm.clone());
            Ok(())
        }
    }
}
