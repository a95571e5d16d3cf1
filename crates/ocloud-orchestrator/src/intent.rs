//! RIC deployment intents.
//!
//! An intent is the declarative input to a workflow. Field names follow the
//! camelCase wire shape used by the management API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A request to deploy a RIC platform with its xApps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentIntent {
    /// API version of the intent document.
    #[serde(default)]
    pub api_version: String,
    /// Intent kind, e.g. `RICDeployment`.
    pub kind: String,
    /// Object metadata.
    pub metadata: IntentMetadata,
    /// Desired deployment.
    pub spec: RicDeploymentSpec,
}

impl DeploymentIntent {
    /// Intent name from the metadata.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Name, namespace and labels of an intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    /// Intent name.
    pub name: String,
    /// Target namespace.
    #[serde(default)]
    pub namespace: String,
    /// Free-form labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// What to deploy and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RicDeploymentSpec {
    /// `near-rt` or `non-rt`.
    #[serde(default)]
    pub ric_type: String,
    /// RIC platform components.
    #[serde(default)]
    pub platform: PlatformSpec,
    /// xApps to deploy on the platform.
    #[serde(default)]
    pub xapps: Vec<XappSpec>,
    /// O-RAN interfaces.
    #[serde(default)]
    pub interfaces: InterfacesSpec,
    /// Security posture.
    #[serde(default)]
    pub security: SecuritySpec,
    /// Observability stack.
    #[serde(default)]
    pub monitoring: MonitoringSpec,
    /// Resource pool to allocate from.
    #[serde(default)]
    pub target_pool: String,
}

/// RIC platform description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Platform release.
    #[serde(default)]
    pub version: String,
    /// Component names, e.g. `e2mgr`.
    #[serde(default)]
    pub components: Vec<String>,
    /// Resources reserved for the platform.
    #[serde(default)]
    pub resources: ResourceSpec,
    /// Run components highly available.
    #[serde(default)]
    pub ha: bool,
}

/// CPU and memory quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// CPU quantity, e.g. `"8"` or `"500m"`.
    #[serde(default)]
    pub cpu: String,
    /// Memory quantity, e.g. `"16Gi"`.
    #[serde(default)]
    pub memory: String,
}

/// An xApp to deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XappSpec {
    /// xApp name.
    pub name: String,
    /// xApp version.
    #[serde(default)]
    pub version: String,
    /// SDK the xApp is built on.
    #[serde(default)]
    pub framework: String,
    /// Container image.
    #[serde(default)]
    pub image: String,
    /// Resources reserved for the xApp.
    #[serde(default)]
    pub resources: ResourceSpec,
}

/// The four O-RAN interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfacesSpec {
    /// E2 towards the RAN nodes.
    #[serde(default)]
    pub e2: InterfaceSpec,
    /// A1 towards the non-RT RIC.
    #[serde(default)]
    pub a1: InterfaceSpec,
    /// O1 management.
    #[serde(default)]
    pub o1: InterfaceSpec,
    /// O2 towards the O-Cloud.
    #[serde(default)]
    pub o2: InterfaceSpec,
}

impl InterfacesSpec {
    /// Interfaces paired with their names, in E2, A1, O1, O2 order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, &InterfaceSpec); 4] {
        [("E2", &self.e2), ("A1", &self.a1), ("O1", &self.o1), ("O2", &self.o2)]
    }
}

/// One interface's settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSpec {
    /// Whether to configure the interface.
    #[serde(default)]
    pub enabled: bool,
    /// Interface specification version.
    #[serde(default)]
    pub version: String,
    /// Transport security mode, e.g. `mtls`.
    #[serde(default)]
    pub security: String,
}

/// Security posture for the deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    /// Enforce zero-trust networking.
    #[serde(default)]
    pub zero_trust: bool,
    /// Require mutual TLS between components.
    #[serde(default)]
    pub mtls: bool,
    /// Only run signed images.
    #[serde(default)]
    pub image_signing: bool,
    /// Scan workloads at runtime.
    #[serde(default)]
    pub runtime_scan: bool,
    /// Compliance frameworks to satisfy, e.g. `O-RAN-WG11`.
    #[serde(default)]
    pub compliance: Vec<String>,
}

/// Observability stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    /// Deploy Prometheus.
    #[serde(default)]
    pub prometheus: bool,
    /// Deploy Grafana.
    #[serde(default)]
    pub grafana: bool,
    /// Deploy Jaeger.
    #[serde(default)]
    pub jaeger: bool,
    /// Forward VES events.
    #[serde(default)]
    pub ves: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_intent() {
        let json = r#"{
            "apiVersion": "oran.io/v1",
            "kind": "RICDeployment",
            "metadata": {"name": "ric-east", "namespace": "ricplt"},
            "spec": {
                "ricType": "near-rt",
                "platform": {
                    "version": "1.0",
                    "components": ["e2mgr", "e2term"],
                    "resources": {"cpu": "8", "memory": "16Gi"},
                    "ha": true
                },
                "xapps": [{"name": "traffic-steering", "resources": {"cpu": "2", "memory": "4Gi"}}],
                "interfaces": {"e2": {"enabled": true, "version": "3.0", "security": "mtls"}},
                "security": {"zeroTrust": true, "mtls": true, "compliance": ["O-RAN-WG11"]},
                "monitoring": {"prometheus": true},
                "targetPool": "edge-1"
            }
        }"#;

        let intent: DeploymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.name(), "ric-east");
        assert_eq!(intent.spec.platform.resources.memory, "16Gi");
        assert!(intent.spec.platform.ha);
        assert_eq!(intent.spec.xapps[0].name, "traffic-steering");
        assert!(intent.spec.interfaces.e2.enabled);
        assert!(!intent.spec.interfaces.a1.enabled);
        assert!(intent.spec.security.zero_trust);
        assert_eq!(intent.spec.target_pool, "edge-1");
    }

    #[test]
    fn named_interfaces_keep_order() {
        let interfaces = InterfacesSpec::default();
        let names: Vec<_> = interfaces.named().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["E2", "A1", "O1", "O2"]);
    }
}
