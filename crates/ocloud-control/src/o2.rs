//! Boundary to the O2 IMS API server.
//!
//! The reconciler hands each O-Cloud's [`O2InterfaceConfig`] to an
//! [`O2Interface`] and asks it to serve. The gateway crate provides the real
//! server; this crate only depends on the trait.

use async_trait::async_trait;
use ocloud_store::O2InterfaceConfig;

use crate::error::Result;

/// The O2 IMS API as seen by the reconciler.
#[async_trait]
pub trait O2Interface: Send + Sync {
    /// Apply the interface configuration.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::O2` if the configuration cannot be applied.
    async fn initialize(&self, config: &O2InterfaceConfig) -> Result<()>;

    /// Start serving the API. Calling this while already serving is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::O2` if the listener cannot be started.
    async fn start_api_server(&self) -> Result<()>;
}

/// An O2 interface that accepts every call and serves nothing.
#[derive(Debug, Clone, Default)]
pub struct NoopO2Interface;

#[async_trait]
impl O2Interface for NoopO2Interface {
    async fn initialize(&self, config: &O2InterfaceConfig) -> Result<()> {
        tracing::debug!(version = %config.version, "NoopO2Interface: initialize");
        Ok(())
    }

    async fn start_api_server(&self) -> Result<()> {
        Ok(())
    }
}

/// Mock O2 interface for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::ControlError;
    use parking_lot::Mutex;

    /// Records configurations and start calls; failures can be injected.
    #[derive(Default)]
    pub struct MockO2Interface {
        configs: Mutex<Vec<O2InterfaceConfig>>,
        starts: Mutex<usize>,
        fail_initialize: Mutex<bool>,
        fail_start: Mutex<bool>,
    }

    impl MockO2Interface {
        /// Create a new mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `initialize` fail.
        pub fn set_fail_initialize(&self, fail: bool) {
            *self.fail_initialize.lock() = fail;
        }

        /// Make `start_api_server` fail.
        pub fn set_fail_start(&self, fail: bool) {
            *self.fail_start.lock() = fail;
        }

        /// Configurations passed to `initialize`, in call order.
        #[must_use]
        pub fn configs(&self) -> Vec<O2InterfaceConfig> {
            self.configs.lock().clone()
        }

        /// Number of `start_api_server` calls.
        #[must_use]
        pub fn start_count(&self) -> usize {
            *self.starts.lock()
        }
    }

    #[async_trait]
    impl O2Interface for MockO2Interface {
        async fn initialize(&self, config: &O2InterfaceConfig) -> Result<()> {
            if *self.fail_initialize.lock() {
                return Err(ControlError::O2("injected initialize failure".into()));
            }
            self.configs.lock().push(config.clone());
            Ok(())
        }

        async fn start_api_server(&self) -> Result<()> {
            *self.starts.lock() += 1;
            if *self.fail_start.lock() {
                return Err(ControlError::O2("address already in use".into()));
            }
            Ok(())
        }
    }
}
