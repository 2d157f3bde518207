//! Device-side companion to the course API: a persistent credential
//! store, an HTTP client, and the staged upload workflow.

mod api;
mod credentials;
mod error;
mod types;
mod workflow;

pub use api::CourseClient;
pub use credentials::CredentialStore;
pub use error::ClientError;
pub use types::{AuthResponse, ContentItem, Course, Role, UploadOutcome};
pub use workflow::{StagedFile, UploadState, UploadWorkflow};
