use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::auth::jwt::{AccountKind, Claims};
use crate::data::AccountStore;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::Provider;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Verified claims of any account kind.
#[derive(Debug, Clone)]
pub struct BearerClaims(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for BearerClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;
        let claims = state.tokens.verify(token)?;
        Ok(BearerClaims(claims))
    }
}

/// The provider behind a valid provider token.
///
/// Rejects with 401 for a missing/invalid token or a deleted account, and 403
/// for a customer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedProvider(pub Provider);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedProvider {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let BearerClaims(claims) = BearerClaims::from_request_parts(parts, state).await?;

        if claims.kind != AccountKind::Provider {
            return Err(AppError::Forbidden("Provider access required".to_string()));
        }

        if let Some(provider) = state.provider_cache.get(&claims.sub).await {
            return Ok(AuthenticatedProvider(provider));
        }

        let provider = AccountStore::new(state.db.clone())
            .find_provider(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Provider not found".to_string()))?;

        state
            .provider_cache
            .insert(claims.sub, provider.clone())
            .await;

        Ok(AuthenticatedProvider(provider))
    }
}
