pub mod sessions;
pub mod token;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::identity::Identity;
use crate::state::AppState;

/// Turns a presented bearer credential into an identity.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AppError>;
}

/// Extractor for routes that require a bearer credential.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        state.sessions.verify(token).map(AuthUser)
    }
}
