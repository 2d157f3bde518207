use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "coursedeck.toml",
    "config/coursedeck.toml",
    "../coursedeck.toml",
    "../config/coursedeck.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://coursedeck.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 86_400,
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// Where uploaded course material lands on disk. The directory names
/// double as the public URL prefixes the server serves them under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub images_dir: String,
    pub videos_dir: String,
    pub pdfs_dir: String,
    pub max_image_bytes: usize,
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: "Images".to_string(),
            videos_dir: "Videos".to_string(),
            pdfs_dir: "pdfs".to_string(),
            max_image_bytes: 5_000_000,
            max_upload_bytes: 500_000_000,
        }
    }
}

/// Load the application configuration by combining defaults, an optional
/// TOML file, and `COURSEDECK__` environment overrides.
pub fn load() -> anyhow::Result<AppConfig> {
    let mut builder = config::Config::builder();

    let environment_overrides = config::Environment::with_prefix("COURSEDECK").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURSEDECK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURSEDECK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.storage.images_dir, "Images");
        assert_eq!(config.storage.max_image_bytes, 5_000_000);
        assert_eq!(config.auth.session_ttl_seconds, 86_400);
    }
}
