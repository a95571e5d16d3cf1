//! JWT validation and claims extraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Validated claims extracted from a JWT.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The caller, from the `sub` claim.
    pub subject: String,
    /// Scopes from the space-separated `scope` claim.
    pub scopes: Vec<String>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    exp: u64,
    #[serde(default)]
    scope: Option<String>,
}

/// HS256 validator using a shared secret.
pub struct HmacJwtValidator {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl HmacJwtValidator {
    /// Create a validator from configuration.
    ///
    /// An unconfigured secret yields a validator that rejects every token with
    /// [`AuthError::NotConfigured`].
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let key = config
            .is_configured()
            .then(|| DecodingKey::from_secret(config.secret.as_bytes()));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = config.leeway_seconds;

        Self { key, validation }
    }
}

#[async_trait]
impl JwtValidator for HmacJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let key = self.key.as_ref().ok_or(AuthError::NotConfigured)?;

        let token_data =
            decode::<RawClaims>(token, key, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::MissingClaim("sub".to_string()));
        }

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        tracing::debug!(subject = %claims.sub, "Validated O2 bearer token");

        Ok(ValidatedClaims {
            subject: claims.sub,
            scopes: claims
                .scope
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            expires_at,
        })
    }
}

/// A mock JWT validator for testing.
///
/// Accepts any token of the form `test-token:<subject>`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockJwtValidator {
    /// Scopes granted to every validated token.
    pub scopes: Vec<String>,
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let subject = token
            .strip_prefix("test-token:")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<subject>".to_string()))?;

        Ok(ValidatedClaims {
            subject: subject.to_string(),
            scopes: self.scopes.clone(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        iss: &'a str,
        aud: &'a str,
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        scope: Option<&'a str>,
    }

    fn config() -> AuthConfig {
        AuthConfig {
            secret: "s3cret".to_string(),
            leeway_seconds: 0,
            ..AuthConfig::default()
        }
    }

    fn sign(claims: &TestClaims<'_>, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn valid_claims() -> TestClaims<'static> {
        TestClaims {
            iss: "ocloud-smo",
            aud: "o2ims",
            sub: "smo-operator",
            exp: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            scope: Some("o2ims:read o2ims:write"),
        }
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let validator = HmacJwtValidator::new(&config());
        let token = sign(&valid_claims(), "s3cret");

        let claims = validator.validate(&token).await.unwrap();
        assert_eq!(claims.subject, "smo-operator");
        assert_eq!(claims.scopes, vec!["o2ims:read", "o2ims:write"]);
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let validator = HmacJwtValidator::new(&config());
        let token = sign(&valid_claims(), "other");

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let validator = HmacJwtValidator::new(&config());
        let claims = TestClaims {
            exp: (Utc::now() - chrono::Duration::hours(1)).timestamp(),
            ..valid_claims()
        };

        let result = validator.validate(&sign(&claims, "s3cret")).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn rejects_wrong_audience_and_issuer() {
        let validator = HmacJwtValidator::new(&config());

        let wrong_aud = TestClaims {
            aud: "somebody-else",
            ..valid_claims()
        };
        let result = validator.validate(&sign(&wrong_aud, "s3cret")).await;
        assert!(matches!(result, Err(AuthError::InvalidAudience)));

        let wrong_iss = TestClaims {
            iss: "rogue",
            ..valid_claims()
        };
        let result = validator.validate(&sign(&wrong_iss, "s3cret")).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[tokio::test]
    async fn unconfigured_validator_rejects_everything() {
        let validator = HmacJwtValidator::new(&AuthConfig::default());
        let token = sign(&valid_claims(), "s3cret");

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let validator = HmacJwtValidator::new(&config());
        let result = validator.validate("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn mock_validator_works() {
        let validator = MockJwtValidator::default();
        let claims = validator.validate("test-token:operator").await.unwrap();
        assert_eq!(claims.subject, "operator");

        assert!(validator.validate("test-token:").await.is_err());
        assert!(validator.validate("Bearer nope").await.is_err());
    }
}
