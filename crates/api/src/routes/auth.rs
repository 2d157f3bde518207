use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use coursedeck_auth::Role;

use crate::{
    routes::models::{AuthResponse, LoginRequest, RoleRequest, SignupRequest},
    util::authorize,
    ApiError, AppState,
};

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let (user, session) = state
        .authenticator()
        .signup(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse {
        id: user.public_id,
        access_token: session.token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, session) = state
        .authenticator()
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse {
        id: user.public_id,
        access_token: session.token,
    }))
}

pub async fn select_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleRequest>,
) -> Result<StatusCode, ApiError> {
    let user = authorize(&state, &headers, &[]).await?;

    let role = Role::parse(&payload.role)?;
    if role == Role::Unset {
        return Err(ApiError::bad_request("unknown role: unset"));
    }

    state.authenticator().select_role(user.id, role).await?;
    Ok(StatusCode::OK)
}
