use serde::{Deserialize, Serialize};

/// The role a credential carries; mirrors the server's enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Unset,
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unset => "unset",
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Result of a thumbnail upload: enough for the workflow to decide the
/// user-facing message without re-reading the response.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub success: bool,
    pub status: u16,
    pub message: Option<String>,
}
