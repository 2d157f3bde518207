mod error;
mod state;
mod util;

pub mod routes;
pub mod services;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub fn build_router(state: AppState) -> Router {
    let storage = state.storage().clone();

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth routes
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/select-role", post(routes::auth::select_role))
        // Course routes
        .route(
            "/api/courses/createCourse",
            post(routes::courses::create_course),
        )
        .route("/api/courses", get(routes::courses::list_courses))
        .route("/api/courses/search", get(routes::courses::search_courses))
        .route(
            "/api/courses/student/enrolled",
            get(routes::courses::enrolled_courses),
        )
        .route(
            "/api/courses/user/courses",
            get(routes::courses::user_courses),
        )
        .route("/api/courses/:course_id", get(routes::courses::get_course))
        .route(
            "/api/courses/:course_id",
            put(routes::courses::update_course),
        )
        .route(
            "/api/courses/:course_id",
            delete(routes::courses::delete_course),
        )
        .route("/api/courses/:course_id/enroll", post(routes::courses::enroll))
        // Upload routes
        .route(
            "/api/courses/:course_id/upload-image",
            post(routes::uploads::upload_image),
        )
        .route(
            "/api/courses/:course_id/upload/pdf",
            post(routes::uploads::upload_pdf),
        )
        .route(
            "/api/courses/:course_id/upload/video",
            post(routes::uploads::upload_video),
        )
        // Video content routes
        .route(
            "/api/courses/:course_id/videos/:video_id",
            put(routes::courses::update_video),
        )
        .route(
            "/api/courses/:course_id/videos/:video_id",
            delete(routes::courses::delete_video),
        )
        // Admin routes
        .route("/admin/admin-profile", get(routes::admin::admin_profile))
        // Uploaded files are served straight from disk, no access control.
        .nest_service("/Images", ServeDir::new(&storage.images_dir))
        .nest_service("/videos", ServeDir::new(&storage.videos_dir))
        .nest_service("/pdfs", ServeDir::new(&storage.pdfs_dir))
        .layer(DefaultBodyLimit::max(storage.max_upload_bytes))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-idempotency-key"),
        ])
}
