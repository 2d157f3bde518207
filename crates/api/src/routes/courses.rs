use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use coursedeck_auth::Role;
use serde::Deserialize;

use crate::{
    routes::models::{Course, UpdateCourseRequest, UpdateVideoRequest},
    services::course as course_service,
    util::authorize,
    ApiError, AppState,
};

const CONTENT_EDITORS: &[Role] = &[Role::Instructor, Role::Admin];

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Course creation takes `title` and `description` as multipart form
/// fields; content is attached by later upload calls.
pub async fn create_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Course>, ApiError> {
    let user = authorize(&state, &headers, CONTENT_EDITORS).await?;

    let mut title = String::new();
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid title field: {e}")))?;
            }
            Some("description") => {
                description = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("invalid description field: {e}"))
                })?;
            }
            _ => {}
        }
    }

    let course = course_service::create_course(state.db_pool(), user.id, &title, &description)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(course = %course.id, instructor = %user.public_id, "course created");
    Ok(Json(course))
}

pub async fn list_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Course>>, ApiError> {
    authorize(&state, &headers, &[]).await?;

    let courses = course_service::list_courses(state.db_pool())
        .await
        .map_err(ApiError::from)?;
    Ok(Json(courses))
}

pub async fn search_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    authorize(&state, &headers, &[]).await?;

    let courses = course_service::search_courses(state.db_pool(), &query.q)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<Json<Course>, ApiError> {
    authorize(&state, &headers, &[]).await?;

    let course = course_service::get_course(state.db_pool(), &course_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    authorize(&state, &headers, CONTENT_EDITORS).await?;

    let course = course_service::update_course(
        state.db_pool(),
        &course_id,
        payload.title.as_deref(),
        payload.description.as_deref(),
    )
    .await
    .map_err(ApiError::from)?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, CONTENT_EDITORS).await?;

    course_service::delete_course(state.db_pool(), &course_id)
        .await
        .map_err(ApiError::from)?;
    tracing::info!(course = %course_id, "course deleted");
    Ok(StatusCode::OK)
}

pub async fn enroll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = authorize(&state, &headers, &[]).await?;

    course_service::enroll(state.db_pool(), user.id, &course_id)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::OK)
}

pub async fn enrolled_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Course>>, ApiError> {
    let user = authorize(&state, &headers, &[]).await?;

    let courses = course_service::enrolled_courses(state.db_pool(), user.id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(courses))
}

pub async fn user_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Course>>, ApiError> {
    let user = authorize(&state, &headers, CONTENT_EDITORS).await?;

    let courses = course_service::user_courses(state.db_pool(), user.id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(courses))
}

pub async fn update_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((course_id, video_id)): Path<(String, String)>,
    Json(payload): Json<UpdateVideoRequest>,
) -> Result<Json<Course>, ApiError> {
    authorize(&state, &headers, &[]).await?;

    let course = course_service::update_video_title(
        state.db_pool(),
        &course_id,
        &video_id,
        &payload.title,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(Json(course))
}

pub async fn delete_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((course_id, video_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[]).await?;

    course_service::delete_video(state.db_pool(), &course_id, &video_id)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::OK)
}
