use axum::http::{header::AUTHORIZATION, HeaderMap};
use coursedeck_auth::{Role, User};

use crate::{ApiError, AppState};

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

/// The authorization gate in front of every mutating route: resolves the
/// bearer token to a user and, when `roles` is non-empty, requires the
/// user's role to be one of them.
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    roles: &[Role],
) -> Result<User, ApiError> {
    let token = require_bearer(headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !roles.is_empty() && !roles.contains(&user.role) {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(user)
}
