use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::TenantContext;

use crate::jwt::validate_token;

// Validates the bearer token and attaches the `User` and its `TenantContext`
// to the request. Tokens that are not bound to a tenant cannot reach any
// scheduling route.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    let tenant = TenantContext::from_user(&user)
        .ok_or_else(|| AppError::Forbidden("Token is not bound to a tenant".to_string()))?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(tenant);

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

pub fn extract_tenant<B>(request: &Request<B>) -> Result<TenantContext, AppError> {
    request
        .extensions()
        .get::<TenantContext>()
        .cloned()
        .ok_or_else(|| AppError::Forbidden("Tenant context missing".to_string()))
}
