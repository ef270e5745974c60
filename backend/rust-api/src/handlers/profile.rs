use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::ApiError,
    middlewares::auth::JwtClaims,
    services::{profile_service::ProfileService, AppState},
};

/// GET /profile - The caller's profile with aggregate statistics (protected)
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Getting profile for user_id: {}", claims.sub);

    let user_id = claims.user_id()?;

    let service = ProfileService::new(state.db.clone());
    let profile = service.get_profile(user_id).await?;

    Ok(Json(json!({ "success": true, "data": profile })))
}
