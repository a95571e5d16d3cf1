//! Authentication extractor for the O2 API.
//!
//! This module provides the `O2Caller` extractor. When the active O2 interface
//! config has `authEnabled` set it validates the `Authorization: Bearer <token>`
//! header; otherwise every caller is let through anonymously.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use ocloud_auth::{AuthError, ValidatedClaims};

use crate::error::ApiError;
use crate::state::O2State;

/// The caller of an O2 request.
#[derive(Debug, Clone)]
pub struct O2Caller {
    /// Claims of the presented token, `None` when auth is disabled.
    pub claims: Option<ValidatedClaims>,
}

impl O2Caller {
    /// The token subject, or `anonymous`.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.claims.as_ref().map_or("anonymous", |c| c.subject.as_str())
    }
}

/// Extract the bearer token from request parts.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::MissingToken.into())
}

#[async_trait]
impl FromRequestParts<Arc<O2State>> for O2Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<O2State>,
    ) -> Result<Self, Self::Rejection> {
        if !state.auth_enabled() {
            return Ok(Self { claims: None });
        }

        let token = bearer_token(parts)?;
        let claims = state.jwt_validator.validate(token).await?;
        tracing::debug!(subject = %claims.subject, "O2 caller authenticated");

        Ok(Self {
            claims: Some(claims),
        })
    }
}
