use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialData {
    user_id: String,
    token: String,
    #[serde(default)]
    role: Role,
}

/// File-backed store for the device credential (user id, bearer token,
/// selected role). Explicitly constructed with its path and passed to
/// collaborators, so "used before initialized" cannot happen.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    data: Option<CredentialData>,
}

impl CredentialStore {
    /// Open the store, loading the persisted credential when present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => Some(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        Ok(Self { path, data })
    }

    /// Persist a fresh credential, overwriting any prior one. The role
    /// resets to `Unset` until the next role selection.
    pub fn save(&mut self, user_id: &str, token: &str) -> Result<(), ClientError> {
        self.data = Some(CredentialData {
            user_id: user_id.to_owned(),
            token: token.to_owned(),
            role: Role::Unset,
        });
        self.persist()?;
        debug!(user_id, "saved credential");
        Ok(())
    }

    pub fn set_role(&mut self, role: Role) -> Result<(), ClientError> {
        let data = self.data.as_mut().ok_or(ClientError::NoCredential)?;
        data.role = role;
        self.persist()?;
        debug!(role = role.as_str(), "saved selected role");
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.user_id.as_str())
    }

    pub fn role(&self) -> Role {
        self.data.as_ref().map(|data| data.role).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.is_some()
    }

    /// Erase the credential; subsequent reads return absent.
    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.data = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        debug!("cleared credential");
        Ok(())
    }

    // Write-then-rename so readers never observe a torn credential file.
    fn persist(&self) -> Result<(), ClientError> {
        let Some(data) = &self.data else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::open(dir.path().join("auth.json")).expect("open store")
    }

    #[test]
    fn starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.role(), Role::Unset);
    }

    #[test]
    fn save_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save("user-1", "token-1").expect("save");
        store.set_role(Role::Instructor).expect("set role");

        let reopened = store_in(&dir);
        assert_eq!(reopened.user_id(), Some("user-1"));
        assert_eq!(reopened.token(), Some("token-1"));
        assert_eq!(reopened.role(), Role::Instructor);
    }

    #[test]
    fn save_overwrites_prior_credential_and_resets_role() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save("user-1", "token-1").expect("save");
        store.set_role(Role::Admin).expect("set role");

        store.save("user-2", "token-2").expect("resave");
        assert_eq!(store.user_id(), Some("user-2"));
        assert_eq!(store.role(), Role::Unset);
    }

    #[test]
    fn clear_erases_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save("user-1", "token-1").expect("save");
        store.clear().expect("clear");

        assert!(!store.is_authenticated());
        let reopened = store_in(&dir);
        assert!(!reopened.is_authenticated());
    }

    #[test]
    fn set_role_without_credential_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let err = store.set_role(Role::Student).expect_err("no credential");
        assert!(matches!(err, ClientError::NoCredential));
    }
}
