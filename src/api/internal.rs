//! Service-to-service endpoints, not exposed through the public gateway

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use super::auth::UserResponse;
use super::state::AppState;
use super::types::{ApiError, Json};

pub fn create_internal_router() -> Router<AppState> {
    Router::new().route("/users/external/{external_id}", get(get_by_external_id))
}

/// GET /internal/users/external/{external_id}
pub async fn get_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.get_by_external_identity(external_id).await?;

    Ok(Json(UserResponse { user }))
}
