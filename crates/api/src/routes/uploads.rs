use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use coursedeck_auth::Role;

use crate::{
    routes::models::ContentItem,
    services::{course as course_service, upload as upload_service},
    util::authorize,
    ApiError, AppState,
};

const CONTENT_EDITORS: &[Role] = &[Role::Instructor, Role::Admin];
const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Thumbnail upload: stores the file, appends an image-kind content item
/// and points the course's `image` field at it.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ContentItem>, ApiError> {
    authorize(&state, &headers, CONTENT_EDITORS).await?;

    let (file_name, bytes) = extract_file(multipart, "image").await?;
    if bytes.len() > state.storage().max_image_bytes {
        return Err(ApiError::bad_request("Image exceeds the upload size limit"));
    }

    let stored = upload_service::store_file(
        &state.storage().images_dir,
        "/Images",
        &file_name,
        &bytes,
    )
    .await
    .map_err(ApiError::from)?;

    let item = course_service::append_content(
        state.db_pool(),
        &course_id,
        "image",
        &file_name,
        &stored.url,
        &idempotency_key(&headers),
    )
    .await
    .map_err(ApiError::from)?;

    course_service::set_course_image(state.db_pool(), &course_id, &stored.url)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(item))
}

pub async fn upload_pdf(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ContentItem>, ApiError> {
    authorize(&state, &headers, CONTENT_EDITORS).await?;

    let (file_name, bytes) = extract_file(multipart, "pdf").await?;

    let stored =
        upload_service::store_file(&state.storage().pdfs_dir, "/pdfs", &file_name, &bytes)
            .await
            .map_err(ApiError::from)?;

    let item = course_service::append_content(
        state.db_pool(),
        &course_id,
        "pdf",
        &file_name,
        &stored.url,
        &idempotency_key(&headers),
    )
    .await
    .map_err(ApiError::from)?;

    Ok(Json(item))
}

pub async fn upload_video(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ContentItem>, ApiError> {
    authorize(&state, &headers, CONTENT_EDITORS).await?;

    let (file_name, bytes) = extract_file(multipart, "video").await?;

    let stored =
        upload_service::store_file(&state.storage().videos_dir, "/videos", &file_name, &bytes)
            .await
            .map_err(ApiError::from)?;

    let item = course_service::append_content(
        state.db_pool(),
        &course_id,
        "video",
        &file_name,
        &stored.url,
        &idempotency_key(&headers),
    )
    .await
    .map_err(ApiError::from)?;

    Ok(Json(item))
}

async fn extract_file(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Empty {field_name} file provided"
            )));
        }

        return Ok((file_name, bytes));
    }

    Err(ApiError::bad_request(format!(
        "No {field_name} file provided"
    )))
}

/// Clients send a stable key per staged file so retries deduplicate; a
/// missing header degrades to the original at-least-once behavior.
fn idempotency_key(headers: &HeaderMap) -> String {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .unwrap_or_else(cuid2::create_id)
}
