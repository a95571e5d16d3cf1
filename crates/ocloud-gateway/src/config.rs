//! Gateway configuration types.
//!
//! This module defines configuration for the two listeners (management API and
//! O2 IMS API), persistence, and the credentials the gateway hands to its
//! collaborators.

use std::time::Duration;

use ocloud_auth::AuthConfig;
use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Management API listen address.
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// O2 IMS API listen address.
    #[serde(default = "GatewayConfig::default_o2_listen_addr")]
    pub o2_listen_addr: String,

    /// RocksDB data directory.
    #[serde(default = "GatewayConfig::default_data_dir")]
    pub data_dir: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// HS256 secret for O2 bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected O2 token issuer.
    #[serde(default = "GatewayConfig::default_jwt_issuer")]
    pub jwt_issuer: String,

    /// Expected O2 token audience.
    #[serde(default = "GatewayConfig::default_jwt_audience")]
    pub jwt_audience: String,

    /// Bearer token presented to the SMO.
    #[serde(default)]
    pub smo_auth_token: Option<String>,

    /// Provision pool namespaces and quotas in Kubernetes.
    #[serde(default)]
    pub kubernetes_enabled: bool,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_o2_listen_addr() -> String {
        "0.0.0.0:8090".to_string()
    }

    fn default_data_dir() -> String {
        "/data".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MiB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    fn default_jwt_issuer() -> String {
        AuthConfig::default().issuer
    }

    fn default_jwt_audience() -> String {
        AuthConfig::default().audience
    }

    /// Load configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(v) = var("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = var("O2_LISTEN_ADDR") {
            config.o2_listen_addr = v;
        }
        if let Some(v) = var("DATA_DIR") {
            config.data_dir = v;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout_seconds = v;
        }
        if let Some(v) = var("MAX_BODY_BYTES").and_then(|v| v.parse().ok()) {
            config.max_body_bytes = v;
        }
        if let Some(v) = var("CORS_ORIGINS") {
            config.cors_origins = v.split(',').map(|o| o.trim().to_string()).collect();
        }
        if let Some(v) = var("O2_JWT_SECRET") {
            config.jwt_secret = v;
        }
        if let Some(v) = var("O2_JWT_ISSUER") {
            config.jwt_issuer = v;
        }
        if let Some(v) = var("O2_JWT_AUDIENCE") {
            config.jwt_audience = v;
        }
        config.smo_auth_token = var("SMO_AUTH_TOKEN");
        if let Some(v) = var("KUBERNETES_ENABLED") {
            config.kubernetes_enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Bearer-token validation settings for the O2 API.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            audience: self.jwt_audience.clone(),
            ..AuthConfig::default()
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            o2_listen_addr: Self::default_o2_listen_addr(),
            data_dir: Self::default_data_dir(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            jwt_secret: String::new(),
            jwt_issuer: Self::default_jwt_issuer(),
            jwt_audience: Self::default_jwt_audience(),
            smo_auth_token: None,
            kubernetes_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.o2_listen_addr, "0.0.0.0:8090");
        assert_eq!(config.data_dir, "/data");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(!config.kubernetes_enabled);
    }

    #[test]
    fn timeout_duration() {
        let config = GatewayConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn auth_config_carries_jwt_settings() {
        let config = GatewayConfig {
            jwt_secret: "s3cret".to_string(),
            jwt_audience: "o2ims-east".to_string(),
            ..GatewayConfig::default()
        };
        let auth = config.auth_config();
        assert!(auth.is_configured());
        assert_eq!(auth.audience, "o2ims-east");
        assert_eq!(auth.issuer, "ocloud-smo");
    }
}
