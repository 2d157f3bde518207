use axum::{extract::State, http::HeaderMap, Json};
use coursedeck_auth::Role;

use crate::{routes::models::AdminProfileResponse, util::authorize, ApiError, AppState};

pub async fn admin_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminProfileResponse>, ApiError> {
    let user = authorize(&state, &headers, &[Role::Admin]).await?;

    Ok(Json(AdminProfileResponse {
        name: user.name,
        email: user.email,
    }))
}
