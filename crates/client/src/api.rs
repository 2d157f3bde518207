use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{error, warn};

use crate::credentials::CredentialStore;
use crate::error::ClientError;
use crate::types::{AuthResponse, Course, Role, UploadOutcome};

const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// HTTP client for the course API. Holds no credential itself: every
/// authorized call reads the token fresh from the credential store it is
/// handed, so a rotation is picked up immediately.
#[derive(Debug, Clone)]
pub struct CourseClient {
    http: reqwest::Client,
    base_url: String,
}

impl CourseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self, request: RequestBuilder, store: &CredentialStore) -> RequestBuilder {
        match store.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn signup(
        &self,
        store: &mut CredentialStore,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/signup"))
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let auth = decode_auth(response).await?;
        store.save(&auth.id, &auth.access_token)?;
        Ok(())
    }

    pub async fn login(
        &self,
        store: &mut CredentialStore,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let auth = decode_auth(response).await?;
        store.save(&auth.id, &auth.access_token)?;
        Ok(())
    }

    /// Role selection is the one call that re-raises failures: its caller
    /// distinguishes a stale token (credential cleared, log in again)
    /// from a transient error by the returned variant.
    pub async fn select_role(
        &self,
        store: &mut CredentialStore,
        role: Role,
    ) -> Result<(), ClientError> {
        if store.token().is_none() {
            return Err(ClientError::NoCredential);
        }

        let request = self
            .http
            .post(self.url("/api/auth/select-role"))
            .json(&serde_json::json!({ "role": role.as_str() }));
        let response = self.bearer(request, store).send().await?;

        if response.status().is_success() {
            store.set_role(role)?;
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::FORBIDDEN && body.contains("Invalid token") {
            store.clear()?;
            return Err(ClientError::InvalidToken);
        }

        Err(ClientError::Rejected {
            status: status.as_u16(),
            message: parse_message(&body).unwrap_or(body),
        })
    }

    /// Create a course with title and description only. Returns `None`
    /// on any failure; the cause is logged here rather than raised.
    pub async fn create_course(
        &self,
        store: &CredentialStore,
        title: &str,
        description: &str,
    ) -> Option<Course> {
        if title.trim().is_empty() {
            warn!("refusing to create course with blank title");
            return None;
        }
        if store.token().is_none() {
            warn!("no credential available, cannot create course");
            return None;
        }

        let form = Form::new()
            .text("title", title.to_owned())
            .text("description", description.to_owned());

        let request = self
            .http
            .post(self.url("/api/courses/createCourse"))
            .multipart(form);

        match self.bearer(request, store).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<Course>().await.ok()
            }
            Ok(response) => {
                error!(status = %response.status(), "course creation rejected");
                None
            }
            Err(err) => {
                error!(error = %err, "course creation failed");
                None
            }
        }
    }

    pub async fn upload_thumbnail(
        &self,
        store: &CredentialStore,
        course_id: &str,
        path: &Path,
        idempotency_key: &str,
    ) -> UploadOutcome {
        let url = format!("/api/courses/{course_id}/upload-image");
        self.upload_file(store, &url, "image", path, idempotency_key)
            .await
    }

    pub async fn upload_video(
        &self,
        store: &CredentialStore,
        course_id: &str,
        path: &Path,
        idempotency_key: &str,
    ) -> bool {
        let url = format!("/api/courses/{course_id}/upload/video");
        self.upload_file(store, &url, "video", path, idempotency_key)
            .await
            .success
    }

    pub async fn upload_pdf(
        &self,
        store: &CredentialStore,
        course_id: &str,
        path: &Path,
        idempotency_key: &str,
    ) -> bool {
        let url = format!("/api/courses/{course_id}/upload/pdf");
        self.upload_file(store, &url, "pdf", path, idempotency_key)
            .await
            .success
    }

    /// List all courses; failures degrade to an empty list.
    pub async fn fetch_courses(&self, store: &CredentialStore) -> Vec<Course> {
        self.fetch_course_list(store, "/api/courses").await
    }

    /// List the courses owned by the authenticated instructor.
    pub async fn fetch_user_courses(&self, store: &CredentialStore) -> Vec<Course> {
        self.fetch_course_list(store, "/api/courses/user/courses")
            .await
    }

    pub async fn fetch_enrolled_courses(&self, store: &CredentialStore) -> Vec<Course> {
        self.fetch_course_list(store, "/api/courses/student/enrolled")
            .await
    }

    pub async fn search_courses(&self, store: &CredentialStore, term: &str) -> Vec<Course> {
        let request = self
            .http
            .get(self.url("/api/courses/search"))
            .query(&[("q", term)]);
        self.send_course_list(request, store, "/api/courses/search")
            .await
    }

    pub async fn get_course(&self, store: &CredentialStore, course_id: &str) -> Option<Course> {
        let request = self.http.get(self.url(&format!("/api/courses/{course_id}")));
        match self.bearer(request, store).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<Course>().await.ok()
            }
            Ok(response) => {
                warn!(status = %response.status(), course_id, "failed to fetch course");
                None
            }
            Err(err) => {
                warn!(error = %err, course_id, "failed to fetch course");
                None
            }
        }
    }

    pub async fn delete_course(&self, store: &CredentialStore, course_id: &str) -> bool {
        let request = self
            .http
            .delete(self.url(&format!("/api/courses/{course_id}")));
        match self.bearer(request, store).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    error!(status = %response.status(), course_id, "failed to delete course");
                }
                ok
            }
            Err(err) => {
                error!(error = %err, course_id, "failed to delete course");
                false
            }
        }
    }

    pub async fn enroll(&self, store: &CredentialStore, course_id: &str) -> bool {
        let request = self
            .http
            .post(self.url(&format!("/api/courses/{course_id}/enroll")));
        match self.bearer(request, store).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                error!(error = %err, course_id, "enrollment failed");
                false
            }
        }
    }

    async fn fetch_course_list(&self, store: &CredentialStore, path: &str) -> Vec<Course> {
        let request = self.http.get(self.url(path));
        self.send_course_list(request, store, path).await
    }

    async fn send_course_list(
        &self,
        request: RequestBuilder,
        store: &CredentialStore,
        path: &str,
    ) -> Vec<Course> {
        match self.bearer(request, store).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<Vec<Course>>().await.unwrap_or_else(|err| {
                    warn!(error = %err, path, "failed to decode course list");
                    Vec::new()
                })
            }
            Ok(response) => {
                warn!(status = %response.status(), path, "failed to fetch courses");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, path, "failed to fetch courses");
                Vec::new()
            }
        }
    }

    async fn upload_file(
        &self,
        store: &CredentialStore,
        path_url: &str,
        field: &str,
        file: &Path,
        idempotency_key: &str,
    ) -> UploadOutcome {
        let bytes = match tokio::fs::read(file).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(error = %err, file = %file.display(), "cannot read staged file");
                return UploadOutcome {
                    success: false,
                    status: 0,
                    message: Some(format!("Cannot read file: {err}")),
                };
            }
        };

        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_owned();

        let form = Form::new().part(
            field.to_owned(),
            Part::bytes(bytes).file_name(file_name),
        );

        let request = self
            .http
            .post(self.url(path_url))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .multipart(form);

        match self.bearer(request, store).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    UploadOutcome {
                        success: true,
                        status: status.as_u16(),
                        message: None,
                    }
                } else {
                    let body = response.text().await.unwrap_or_default();
                    error!(status = %status, field, "upload rejected: {body}");
                    UploadOutcome {
                        success: false,
                        status: status.as_u16(),
                        message: parse_message(&body),
                    }
                }
            }
            Err(err) => {
                error!(error = %err, field, "upload failed");
                UploadOutcome {
                    success: false,
                    status: 0,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}

async fn decode_auth(response: Response) -> Result<AuthResponse, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            message: parse_message(&body).unwrap_or(body),
        });
    }
    Ok(response.json::<AuthResponse>().await?)
}

fn parse_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(|msg| msg.to_owned())
}
