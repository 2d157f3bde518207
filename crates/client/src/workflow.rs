use std::path::PathBuf;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::CourseClient;
use crate::credentials::CredentialStore;
use crate::types::UploadOutcome;

/// A file queued for upload. Each staged file carries its own
/// idempotency key, minted once at staging time, so a retried request
/// replays the same key and the server can deduplicate.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub key: String,
    pub uploaded: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            key: uuid::Uuid::new_v4().to_string(),
            uploaded: false,
        }
    }
}

/// Snapshot of the upload session, published through a watch channel
/// after every mutation. Consumers render from the snapshot alone.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub title: String,
    pub description: String,
    pub course_id: Option<String>,
    pub thumbnail: Option<StagedFile>,
    pub videos: Vec<StagedFile>,
    pub pdfs: Vec<StagedFile>,
    pub saving: bool,
    pub error: Option<String>,
    pub course_done: bool,
    pub thumbnail_done: bool,
    pub videos_done: bool,
    pub pdfs_done: bool,
    pub refresh_needed: bool,
}

/// Drives the four-stage course publication sequence: course details,
/// then thumbnail, videos and PDFs. The course must exist before any
/// file stage runs; the file stages themselves are independent.
pub struct UploadWorkflow {
    client: CourseClient,
    store: CredentialStore,
    state: UploadState,
    tx: watch::Sender<UploadState>,
}

impl UploadWorkflow {
    pub fn new(client: CourseClient, store: CredentialStore) -> Self {
        let state = UploadState::default();
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            client,
            store,
            state,
            tx,
        }
    }

    /// Subscribe to state snapshots. Every mutation publishes one.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn credentials(&mut self) -> &mut CredentialStore {
        &mut self.store
    }

    pub fn client(&self) -> &CourseClient {
        &self.client
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.state.title = title.into();
        self.publish();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.state.description = description.into();
        self.publish();
    }

    pub fn stage_thumbnail(&mut self, path: impl Into<PathBuf>) {
        self.state.thumbnail = Some(StagedFile::new(path.into()));
        self.publish();
    }

    pub fn stage_videos(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.state.videos = paths.into_iter().map(StagedFile::new).collect();
        self.publish();
    }

    pub fn stage_pdfs(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.state.pdfs = paths.into_iter().map(StagedFile::new).collect();
        self.publish();
    }

    pub fn can_create_course(&self) -> bool {
        !self.state.title.trim().is_empty() && !self.state.course_done
    }

    pub fn can_upload_thumbnail(&self) -> bool {
        self.state.course_done && self.state.thumbnail.is_some()
    }

    pub fn can_upload_videos(&self) -> bool {
        self.state.course_done && !self.state.videos.is_empty()
    }

    pub fn can_upload_pdfs(&self) -> bool {
        self.state.course_done && !self.state.pdfs.is_empty()
    }

    /// Stage one: create the course shell from title and description.
    pub async fn create_course(&mut self) {
        if self.state.title.trim().is_empty() {
            self.fail("Title is required");
            return;
        }
        if self.store.token().is_none() {
            self.fail("Please log in to create a course");
            return;
        }

        self.begin();
        let created = self
            .client
            .create_course(&self.store, &self.state.title, &self.state.description)
            .await;

        match created {
            Some(course) => {
                info!(course_id = %course.id, "course created");
                self.state.course_id = Some(course.id);
                self.state.course_done = true;
                self.finish(None);
            }
            None => {
                self.finish(Some(
                    "Failed to create course. Check your network or try again.".to_owned(),
                ));
            }
        }
    }

    /// Stage two: upload the thumbnail image.
    pub async fn upload_thumbnail(&mut self) {
        let Some(course_id) = self.state.course_id.clone() else {
            self.fail("Course must be created first");
            return;
        };
        let Some(staged) = self.state.thumbnail.clone() else {
            self.fail("No thumbnail selected");
            return;
        };

        self.begin();
        let outcome = self
            .client
            .upload_thumbnail(&self.store, &course_id, &staged.path, &staged.key)
            .await;

        if outcome.success {
            if let Some(thumbnail) = self.state.thumbnail.as_mut() {
                thumbnail.uploaded = true;
            }
            self.state.thumbnail_done = true;
            self.finish(None);
        } else {
            self.finish(Some(thumbnail_error(&outcome)));
        }
    }

    /// Stage three: upload every staged video. A failed video does not
    /// stop the rest; the stage reports one aggregate error at the end
    /// and only completes once all videos are up.
    pub async fn upload_videos(&mut self) {
        let Some(course_id) = self.state.course_id.clone() else {
            self.fail("Course must be created first");
            return;
        };
        if self.state.videos.is_empty() {
            self.fail("No videos selected");
            return;
        }

        self.begin();
        let mut all_ok = true;
        for index in 0..self.state.videos.len() {
            let staged = self.state.videos[index].clone();
            if staged.uploaded {
                continue;
            }
            let ok = self
                .client
                .upload_video(&self.store, &course_id, &staged.path, &staged.key)
                .await;
            if ok {
                self.state.videos[index].uploaded = true;
            } else {
                warn!(path = %staged.path.display(), "video upload failed");
                all_ok = false;
            }
        }

        if all_ok {
            self.state.videos_done = true;
            self.finish(None);
        } else {
            self.finish(Some("One or more videos failed to upload".to_owned()));
        }
    }

    /// Stage four: upload the PDFs, stopping at the first failure. On
    /// full success the session is complete and resets for the next
    /// course; the final snapshot keeps all stage flags set so
    /// observers can react before the reset.
    pub async fn upload_pdfs(&mut self) {
        let Some(course_id) = self.state.course_id.clone() else {
            self.fail("Course must be created first");
            return;
        };
        if self.state.pdfs.is_empty() {
            self.fail("No PDFs selected");
            return;
        }

        self.begin();
        let mut all_ok = true;
        for index in 0..self.state.pdfs.len() {
            let staged = self.state.pdfs[index].clone();
            if staged.uploaded {
                continue;
            }
            let ok = self
                .client
                .upload_pdf(&self.store, &course_id, &staged.path, &staged.key)
                .await;
            if ok {
                self.state.pdfs[index].uploaded = true;
            } else {
                warn!(path = %staged.path.display(), "pdf upload failed");
                all_ok = false;
                break;
            }
        }

        if !all_ok {
            self.finish(Some("Failed to upload one or more PDFs".to_owned()));
            return;
        }

        self.state.pdfs_done = true;
        self.state.refresh_needed = true;
        self.finish(None);
        info!(%course_id, "course publication complete");

        // Quietly start the next session. The completed snapshot above
        // is the one observers see; the reset itself is not published.
        self.state = UploadState::default();
    }

    /// Abandon the in-progress session and publish the cleared state.
    pub fn reset(&mut self) {
        self.state = UploadState::default();
        self.publish();
    }

    fn begin(&mut self) {
        self.state.saving = true;
        self.state.error = None;
        self.publish();
    }

    fn finish(&mut self, error: Option<String>) {
        self.state.saving = false;
        self.state.error = error;
        self.publish();
    }

    fn fail(&mut self, message: &str) {
        self.state.error = Some(message.to_owned());
        self.publish();
    }

    fn publish(&self) {
        let _ = self.tx.send(self.state.clone());
    }
}

fn thumbnail_error(outcome: &UploadOutcome) -> String {
    match &outcome.message {
        Some(message) => message.clone(),
        None => format!("Failed to upload thumbnail: HTTP {}", outcome.status),
    }
}
