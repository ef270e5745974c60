use axum::{
    extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::{bearer_token, AuthError, JwtClaims, JwtService},
    models::user::{LoginRequest, RefreshTokenResponse, RegisterRequest, UserPublic},
    services::{auth_service::AuthService, AppState},
};

/// POST /auth/register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    tracing::info!("Registering new user: {}", req.email);

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.db.clone(), jwt_service);

    let response = service.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": response })),
    ))
}

/// POST /auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    tracing::info!("Login attempt for user: {}", req.email);

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.db.clone(), jwt_service);

    let response = service.login(req).await?;

    Ok(Json(json!({ "success": true, "data": response })))
}

/// GET /auth/me - Get current user (protected)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.db.clone(), jwt_service);

    // Resolves the token's subject against storage: a valid signature whose
    // user row is gone is still Unauthorized
    let user = service.verify_token(token).await?;

    tracing::debug!(user_id = %user.id, "Returning current user");

    Ok(Json(json!({
        "success": true,
        "data": { "user": UserPublic::from(user) }
    })))
}

/// POST /auth/refresh - Issue a fresh token for the authenticated caller
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Refreshing token for user_id: {}", claims.sub);

    let user_id = claims.user_id()?;
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.db.clone(), jwt_service);

    let token = service.refresh_token(user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": RefreshTokenResponse { token }
    })))
}
