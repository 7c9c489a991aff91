//! Account and session endpoints under `/api/v1/auth`

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{optional_identity, require_identity, Identity, OptionalIdentity};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::token::TokenPair;
use crate::domain::user::{UserId, UserProfile};
use crate::infrastructure::user::{AuthSession, ProfileUpdate, RegisterRequest};

/// Create the authentication router
pub fn create_auth_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh));

    let protected = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/external", post(link_external))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_identity));

    let optional = Router::new()
        .route("/session", get(session))
        .route_layer(middleware::from_fn_with_state(state, optional_identity));

    public.merge(protected).merge(optional)
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileBody {
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkExternalBody {
    pub external_id: i64,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let session = state
        .accounts
        .register(RegisterRequest {
            email: body.email,
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AuthSession>, ApiError> {
    let session = state.accounts.login(&body.email, &body.password).await?;

    Ok(Json(session))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<TokensResponse>, ApiError> {
    let tokens = state.accounts.refresh_session(&body.refresh_token).await?;

    Ok(Json(TokensResponse { tokens }))
}

/// GET /api/v1/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.get_profile(identity.user_id).await?;

    Ok(Json(UserResponse { user }))
}

/// PUT /api/v1/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .accounts
        .update_profile(
            identity.user_id,
            ProfileUpdate {
                email: body.email,
                username: body.username,
            },
        )
        .await?;

    Ok(Json(UserResponse { user }))
}

/// POST /api/v1/auth/external
pub async fn link_external(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(body): Json<LinkExternalBody>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .accounts
        .link_external_identity(identity.user_id, body.external_id)
        .await?;

    Ok(Json(UserResponse { user }))
}

/// GET /api/v1/auth/session
pub async fn session(OptionalIdentity(identity): OptionalIdentity) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: identity.is_some(),
        user_id: identity.map(|i| i.user_id),
    })
}
