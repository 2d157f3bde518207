use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tempfile::TempDir;

use coursedeck_client::{ClientError, CourseClient, CredentialStore, Role, UploadWorkflow};

// Nothing listens on this port; calls against it fail at connect time.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn store_with_credential(dir: &TempDir) -> CredentialStore {
    let mut store = CredentialStore::open(dir.path().join("auth.json")).expect("open store");
    store.save("user-1", "token-1").expect("save credential");
    store
}

fn empty_store(dir: &TempDir) -> CredentialStore {
    CredentialStore::open(dir.path().join("auth.json")).expect("open store")
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn create_course_router() -> Router {
    Router::new().route(
        "/api/courses/createCourse",
        post(|| async {
            Json(serde_json::json!({
                "id": "course-1",
                "title": "Test course",
                "description": "",
            }))
        }),
    )
}

#[tokio::test]
async fn blank_title_is_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    let client = CourseClient::new(UNREACHABLE);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("   ");
    workflow.create_course().await;

    let state = workflow.state();
    assert_eq!(state.error.as_deref(), Some("Title is required"));
    assert!(!state.course_done);
}

#[tokio::test]
async fn course_creation_requires_a_credential() {
    let dir = TempDir::new().unwrap();
    let client = CourseClient::new(UNREACHABLE);
    let mut workflow = UploadWorkflow::new(client, empty_store(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    assert_eq!(
        workflow.state().error.as_deref(),
        Some("Please log in to create a course")
    );
}

#[tokio::test]
async fn unreachable_server_reports_creation_failure() {
    let dir = TempDir::new().unwrap();
    let client = CourseClient::new(UNREACHABLE);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    let state = workflow.state();
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to create course. Check your network or try again.")
    );
    assert!(!state.saving);
    assert!(state.course_id.is_none());
}

#[tokio::test]
async fn thumbnail_stage_requires_a_course() {
    let dir = TempDir::new().unwrap();
    let client = CourseClient::new(UNREACHABLE);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.stage_thumbnail(PathBuf::from("cover.png"));
    workflow.upload_thumbnail().await;

    assert_eq!(
        workflow.state().error.as_deref(),
        Some("Course must be created first")
    );
}

#[tokio::test]
async fn video_stage_requires_staged_files() {
    let dir = TempDir::new().unwrap();
    let base_url = serve(create_course_router()).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;
    assert!(workflow.state().course_done);

    workflow.upload_videos().await;
    assert_eq!(workflow.state().error.as_deref(), Some("No videos selected"));
}

#[tokio::test]
async fn file_stages_are_enabled_once_the_course_exists() {
    let dir = TempDir::new().unwrap();
    let base_url = serve(create_course_router()).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    assert!(workflow.can_create_course());

    workflow.stage_thumbnail(PathBuf::from("cover.png"));
    workflow.stage_videos([PathBuf::from("lesson.mp4")]);
    workflow.stage_pdfs([PathBuf::from("notes.pdf")]);

    // Nothing runs before the course exists.
    assert!(!workflow.can_upload_thumbnail());
    assert!(!workflow.can_upload_videos());
    assert!(!workflow.can_upload_pdfs());

    workflow.create_course().await;
    assert!(workflow.state().course_done);
    assert!(!workflow.can_create_course());

    // The file stages do not depend on each other: videos and PDFs are
    // available even though the thumbnail has not been uploaded.
    assert!(workflow.can_upload_thumbnail());
    assert!(workflow.can_upload_videos());
    assert!(workflow.can_upload_pdfs());

    workflow.stage_videos([]);
    assert!(!workflow.can_upload_videos());
}

#[tokio::test]
async fn video_stage_continues_past_a_failed_file() {
    let dir = TempDir::new().unwrap();
    let uploads = Arc::new(AtomicUsize::new(0));
    let counter = uploads.clone();

    let router = create_course_router().route(
        "/api/courses/:course_id/upload/video",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"message": "Video uploaded successfully"}))
            }
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    let good = dir.path().join("lesson.mp4");
    std::fs::write(&good, b"video bytes").unwrap();
    let missing = dir.path().join("missing.mp4");
    workflow.stage_videos([missing, good]);

    workflow.upload_videos().await;

    let state = workflow.state();
    assert_eq!(
        state.error.as_deref(),
        Some("One or more videos failed to upload")
    );
    assert!(!state.videos_done);
    // The unreadable first file did not stop the second from uploading.
    assert_eq!(uploads.load(Ordering::SeqCst), 1);
    assert!(!state.videos[0].uploaded);
    assert!(state.videos[1].uploaded);
}

#[tokio::test]
async fn retrying_videos_skips_already_uploaded_files() {
    let dir = TempDir::new().unwrap();
    let uploads = Arc::new(AtomicUsize::new(0));
    let counter = uploads.clone();

    let router = create_course_router().route(
        "/api/courses/:course_id/upload/video",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"message": "Video uploaded successfully"}))
            }
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    let good = dir.path().join("lesson.mp4");
    std::fs::write(&good, b"video bytes").unwrap();
    let missing = dir.path().join("missing.mp4");
    workflow.stage_videos([good, missing.clone()]);

    workflow.upload_videos().await;
    assert_eq!(uploads.load(Ordering::SeqCst), 1);

    // Make the failed file readable and retry; the first file is not re-sent.
    std::fs::write(&missing, b"more video bytes").unwrap();
    workflow.upload_videos().await;

    let state = workflow.state();
    assert!(state.videos_done);
    assert_eq!(state.error, None);
    assert_eq!(uploads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pdf_stage_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let uploads = Arc::new(AtomicUsize::new(0));
    let counter = uploads.clone();

    let router = create_course_router().route(
        "/api/courses/:course_id/upload/pdf",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"message": "PDF uploaded successfully"}))
            }
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    let good = dir.path().join("notes.pdf");
    std::fs::write(&good, b"pdf bytes").unwrap();
    let missing = dir.path().join("missing.pdf");
    workflow.stage_pdfs([missing, good]);

    workflow.upload_pdfs().await;

    let state = workflow.state();
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to upload one or more PDFs")
    );
    assert!(!state.pdfs_done);
    // The failure on the first file short-circuited the second.
    assert_eq!(uploads.load(Ordering::SeqCst), 0);
    assert!(!state.pdfs[1].uploaded);
}

#[tokio::test]
async fn pdf_stage_attempts_files_before_the_failure() {
    let dir = TempDir::new().unwrap();
    let uploads = Arc::new(AtomicUsize::new(0));
    let counter = uploads.clone();

    let router = create_course_router().route(
        "/api/courses/:course_id/upload/pdf",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"message": "PDF uploaded successfully"}))
            }
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut workflow = UploadWorkflow::new(client, store_with_credential(&dir));

    workflow.set_title("Rust for dogs");
    workflow.create_course().await;

    let first = dir.path().join("chapter1.pdf");
    let last = dir.path().join("chapter3.pdf");
    std::fs::write(&first, b"pdf one").unwrap();
    std::fs::write(&last, b"pdf three").unwrap();
    let missing = dir.path().join("missing.pdf");
    workflow.stage_pdfs([first, missing, last]);

    workflow.upload_pdfs().await;

    let state = workflow.state();
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to upload one or more PDFs")
    );
    // The file before the failure was sent; the one after it was not.
    assert_eq!(uploads.load(Ordering::SeqCst), 1);
    assert!(state.pdfs[0].uploaded);
    assert!(!state.pdfs[1].uploaded);
    assert!(!state.pdfs[2].uploaded);
}

#[tokio::test]
async fn search_terms_with_reserved_characters_reach_the_server_intact() {
    let dir = TempDir::new().unwrap();
    let router = Router::new().route(
        "/api/courses/search",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let q = params.get("q").cloned().unwrap_or_default();
            Json(serde_json::json!([{ "id": "course-1", "title": q }]))
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let store = store_with_credential(&dir);

    let term = "rust & c# 100%";
    let results = client.search_courses(&store, term).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, term);
}

#[tokio::test]
async fn invalid_token_on_role_selection_clears_credential() {
    let dir = TempDir::new().unwrap();
    let router = Router::new().route(
        "/api/auth/select-role",
        post(|| async {
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"message": "Invalid token"})),
            )
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut store = store_with_credential(&dir);

    let err = client
        .select_role(&mut store, Role::Instructor)
        .await
        .expect_err("stale token");

    assert!(matches!(err, ClientError::InvalidToken));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn other_role_selection_failures_keep_credential() {
    let dir = TempDir::new().unwrap();
    let router = Router::new().route(
        "/api/auth/select-role",
        post(|| async {
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"message": "Access denied"})),
            )
        }),
    );
    let base_url = serve(router).await;
    let client = CourseClient::new(base_url);
    let mut store = store_with_credential(&dir);

    let err = client
        .select_role(&mut store, Role::Instructor)
        .await
        .expect_err("forbidden");

    match err {
        ClientError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Access denied");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.is_authenticated());
    assert_eq!(store.token(), Some("token-1"));
}

#[tokio::test]
async fn listings_degrade_to_empty_when_unreachable() {
    let dir = TempDir::new().unwrap();
    let client = CourseClient::new(UNREACHABLE);
    let store = store_with_credential(&dir);

    assert!(client.fetch_courses(&store).await.is_empty());
    assert!(client.fetch_user_courses(&store).await.is_empty());
    assert!(client.search_courses(&store, "rust").await.is_empty());
    assert!(client.get_course(&store, "course-1").await.is_none());
    assert!(!client.delete_course(&store, "course-1").await);
    assert!(!client.enroll(&store, "course-1").await);
}
