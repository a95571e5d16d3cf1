//! Bearer-token authentication for the O2 IMS API.
//!
//! When an O-Cloud declares `o2Interface.authEnabled`, every O2 request other
//! than health and info must carry `Authorization: Bearer <jwt>`. Tokens are
//! HS256-signed with a shared secret and must name the configured issuer and
//! audience.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   Bearer <jwt>   ┌─────────────────────┐
//! │  SMO / NFO   │ ───────────────► │  O2 gateway         │
//! └──────────────┘                  │  (bearer extractor) │
//!                                   └──────────┬──────────┘
//!                                              │ validate()
//!                                              ▼
//!                                   ┌─────────────────────┐
//!                                   │  HmacJwtValidator   │
//!                                   │  iss / aud / exp    │
//!                                   └─────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwt::{HmacJwtValidator, JwtValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for O2 bearer-token validation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HS256 signing secret. Empty means unconfigured.
    pub secret: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Whether a signing secret has been provided.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "ocloud-smo".to_string(),
            audience: "o2ims".to_string(),
            leeway_seconds: 30,
        }
    }
}
