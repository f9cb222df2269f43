use crate::auth::{hash_password, verify_password, AccountKind, BearerClaims};
use crate::data::AccountStore;
use crate::errors::AppError;
use crate::handlers::{AppState, JsonBody};
use crate::models::*;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

const INVALID_LOGIN: &str = "Invalid email or password";

fn customer_summary(customer: &Customer) -> Value {
    json!({
        "id": customer.id,
        "name": customer.name,
        "email": customer.email,
    })
}

fn provider_summary(provider: &Provider) -> Value {
    json!({
        "id": provider.id,
        "businessName": provider.business_name,
        "ownerName": provider.owner_name,
        "email": provider.email,
    })
}

/// POST /api/auth/customer/register
pub async fn register_customer(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CustomerRegistration>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registration = payload.validate()?;
    let password_hash = hash_password(registration.password.clone()).await?;

    let customer = AccountStore::new(state.db.clone())
        .insert_customer(&registration, &password_hash)
        .await?;
    let token = state.tokens.issue(customer.id, AccountKind::Customer)?;

    tracing::info!("Registered customer {}", customer.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Customer registered successfully",
            "token": token,
            "customer": customer_summary(&customer),
        })),
    ))
}

/// POST /api/auth/provider/register
pub async fn register_provider(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<ProviderRegistration>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registration = payload.validate()?;
    let password_hash = hash_password(registration.password.clone()).await?;

    let provider = AccountStore::new(state.db.clone())
        .insert_provider(&registration, &password_hash)
        .await?;
    let token = state.tokens.issue(provider.id, AccountKind::Provider)?;

    tracing::info!("Registered provider {} ({})", provider.id, provider.business_name);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Provider registered successfully",
            "token": token,
            "provider": provider_summary(&provider),
        })),
    ))
}

/// POST /api/auth/customer/login
pub async fn login_customer(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let credentials = payload.validate()?;

    let customer = AccountStore::new(state.db.clone())
        .find_customer_by_email(&credentials.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !verify_password(credentials.password, customer.password_hash.clone()).await? {
        tracing::debug!("Rejected login for customer {}", customer.id);
        return Err(AppError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    let token = state.tokens.issue(customer.id, AccountKind::Customer)?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "customer": customer_summary(&customer),
    })))
}

/// POST /api/auth/provider/login
pub async fn login_provider(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let credentials = payload.validate()?;

    let provider = AccountStore::new(state.db.clone())
        .find_provider_by_email(&credentials.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !verify_password(credentials.password, provider.password_hash.clone()).await? {
        tracing::debug!("Rejected login for provider {}", provider.id);
        return Err(AppError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    let token = state.tokens.issue(provider.id, AccountKind::Provider)?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "provider": provider_summary(&provider),
    })))
}

/// GET /api/auth/profile
///
/// Returns the account behind any valid bearer token, without its password hash.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    BearerClaims(claims): BearerClaims,
) -> Result<Json<Value>, AppError> {
    let accounts = AccountStore::new(state.db.clone());

    let user = match claims.kind {
        AccountKind::Customer => {
            let customer = accounts
                .find_customer(claims.sub)
                .await?
                .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
            serde_json::to_value(customer)
        }
        AccountKind::Provider => {
            let provider = accounts
                .find_provider(claims.sub)
                .await?
                .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))?;
            serde_json::to_value(provider)
        }
    }
    .map_err(|e| AppError::InternalError(format!("Failed to serialize profile: {}", e)))?;

    Ok(Json(json!({
        "type": claims.kind.as_str(),
        "user": user,
    })))
}
