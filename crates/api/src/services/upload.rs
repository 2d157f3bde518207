use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::error::ServiceError;

pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

/// Persist an uploaded file under a timestamp-derived name that keeps the
/// original extension, and return the public URL it is served under.
pub async fn store_file(
    dir: &str,
    url_prefix: &str,
    original_name: &str,
    bytes: &[u8],
) -> Result<StoredFile, ServiceError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ServiceError::internal(format!("failed to create upload dir: {e}")))?;

    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let millis = chrono::Utc::now().timestamp_millis();

    // Two uploads can land in the same millisecond; create_new claims
    // the name atomically so concurrent writers never overwrite.
    let mut attempt = 0;
    let (file_name, path, mut file) = loop {
        let candidate = if attempt == 0 {
            format!("{millis}{ext}")
        } else {
            format!("{millis}_{attempt}{ext}")
        };
        let path = PathBuf::from(dir).join(&candidate);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => break (candidate, path, file),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => {
                return Err(ServiceError::internal(format!(
                    "failed to store upload: {err}"
                )))
            }
        }
    };

    file.write_all(bytes)
        .await
        .map_err(|e| ServiceError::internal(format!("failed to store upload: {e}")))?;
    file.flush()
        .await
        .map_err(|e| ServiceError::internal(format!("failed to store upload: {e}")))?;

    tracing::info!(path = %path.display(), size = bytes.len(), "stored uploaded file");

    Ok(StoredFile {
        url: format!("{url_prefix}/{file_name}"),
        file_name,
    })
}
