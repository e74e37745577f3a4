//! Studio Configuration
//!
//! Settings are resolved in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the config directory (optional; timeouts must be
//!    positive)
//! 3. Environment variables
//! 4. Explicit overrides from the surface (CLI flags)
//!
//! # Environment Variables
//!
//! - `VIBE_CONFIG_DIR`: directory for `config.toml` and `credentials.toml`
//! - `VIBE_SERVICE_URL`: generation service base URL
//! - `VIBE_REQUEST_TIMEOUT_SECS`: timeout for ordinary calls
//! - `VIBE_IMAGE_TIMEOUT_SECS`: timeout for image generation

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::CREDENTIALS_FILE;

/// File name of the optional settings file
pub const CONFIG_FILE: &str = "config.toml";

/// Default generation service endpoint
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000/api";

/// Errors from reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path:?}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML
    #[error("invalid config {path:?}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable had an unusable value
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// A `config.toml` key had an unusable value
    #[error("invalid value {value} for {key} in {path:?}")]
    InvalidFile {
        /// File that failed
        path: PathBuf,
        /// Key name
        key: &'static str,
        /// Offending value
        value: u64,
    },

    /// No config directory could be determined
    #[error("no config directory available; set VIBE_CONFIG_DIR")]
    NoConfigDir,
}

/// Contents of `config.toml`; every key is optional
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudioToml {
    /// Service base URL
    pub service_url: Option<String>,
    /// Timeout for ordinary calls, seconds
    pub request_timeout_secs: Option<u64>,
    /// Timeout for image generation, seconds
    pub image_timeout_secs: Option<u64>,
}

/// Overrides supplied by a surface
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Config directory
    pub config_dir: Option<PathBuf>,
    /// Service base URL
    pub service_url: Option<String>,
}

/// Resolved studio configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudioConfig {
    /// Generation service base URL, without trailing slash
    pub service_url: String,
    /// Timeout for ordinary calls, seconds
    pub request_timeout_secs: u64,
    /// Timeout for image generation, seconds (images take 30-60s)
    pub image_timeout_secs: u64,
    /// Directory holding `config.toml` and `credentials.toml`
    pub config_dir: PathBuf,
}

impl StudioConfig {
    /// Defaults rooted at the given config directory
    #[must_use]
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 60,
            image_timeout_secs: 180,
            config_dir: config_dir.into(),
        }
    }

    /// Resolve every layer
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or malformed `config.toml`, a bad
    /// environment value, or when no config directory can be found.
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let config_dir = match overrides.config_dir.clone() {
            Some(dir) => dir,
            None => match std::env::var_os("VIBE_CONFIG_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => default_config_dir().ok_or(ConfigError::NoConfigDir)?,
            },
        };

        let mut config = Self::with_dir(config_dir);
        let path = config.config_path();
        if let Some(file) = load_toml(&path)? {
            config.apply_toml(&path, file)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        if let Some(url) = overrides.service_url {
            config.service_url = url;
        }
        config.service_url = config.service_url.trim_end_matches('/').to_string();

        tracing::debug!(
            service_url = %config.service_url,
            config_dir = ?config.config_dir,
            "configuration resolved"
        );
        Ok(config)
    }

    /// Path of `config.toml`
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Path of `credentials.toml`
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE)
    }

    /// Timeout for ordinary calls
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for image generation
    #[must_use]
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    fn apply_toml(&mut self, path: &Path, file: StudioToml) -> Result<(), ConfigError> {
        let timeout = |key: &'static str, secs: u64| {
            if secs == 0 {
                return Err(ConfigError::InvalidFile {
                    path: path.to_path_buf(),
                    key,
                    value: secs,
                });
            }
            Ok(secs)
        };

        if let Some(url) = file.service_url {
            self.service_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = timeout("request_timeout_secs", secs)?;
        }
        if let Some(secs) = file.image_timeout_secs {
            self.image_timeout_secs = timeout("image_timeout_secs", secs)?;
        }
        Ok(())
    }

    /// Apply environment values read through `lookup`
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VIBE_SERVICE_URL") {
            self.service_url = url;
        }
        if let Some(secs) = parse_secs(&lookup, "VIBE_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "VIBE_IMAGE_TIMEOUT_SECS")? {
            self.image_timeout_secs = secs;
        }
        Ok(())
    }
}

fn parse_secs<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(secs)),
            _ => Err(ConfigError::InvalidEnv { key, value }),
        },
    }
}

/// `$XDG_CONFIG_HOME/vibegraphics` (or the platform equivalent)
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vibegraphics"))
}

/// Read `config.toml` if present
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_toml(path: &Path) -> Result<Option<StudioToml>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::with_dir("/tmp/studio");
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/tmp/studio/credentials.toml")
        );
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "service_url = \"http://studio.local:8080/api/\"\nimage_timeout_secs = 300\n",
        )
        .unwrap();

        let config = StudioConfig::load(ConfigOverrides {
            config_dir: Some(dir.path().to_path_buf()),
            service_url: None,
        })
        .unwrap();

        // VIBE_SERVICE_URL may be set in the environment running the tests
        if std::env::var_os("VIBE_SERVICE_URL").is_none() {
            assert_eq!(config.service_url, "http://studio.local:8080/api");
        }
        if std::env::var_os("VIBE_IMAGE_TIMEOUT_SECS").is_none() {
            assert_eq!(config.image_timeout_secs, 300);
        }
    }

    #[test]
    fn test_explicit_override_wins() {
        let dir = TempDir::new().unwrap();
        let config = StudioConfig::load(ConfigOverrides {
            config_dir: Some(dir.path().to_path_buf()),
            service_url: Some("http://override:1/api".to_string()),
        })
        .unwrap();
        assert_eq!(config.service_url, "http://override:1/api");
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_unknown_toml_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(load_toml(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_toml_rejects_zero_timeout() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "request_timeout_secs = 0\n").unwrap();

        let err = StudioConfig::load(ConfigOverrides {
            config_dir: Some(dir.path().to_path_buf()),
            service_url: None,
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFile {
                key: "request_timeout_secs",
                value: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_env_layer() {
        let env: HashMap<&str, &str> = [
            ("VIBE_SERVICE_URL", "http://env:9000/api"),
            ("VIBE_REQUEST_TIMEOUT_SECS", "15"),
        ]
        .into_iter()
        .collect();

        let mut config = StudioConfig::with_dir("/tmp/studio");
        config
            .apply_env(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.service_url, "http://env:9000/api");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.image_timeout_secs, 180);
    }

    #[test]
    fn test_env_rejects_zero_timeout() {
        let mut config = StudioConfig::with_dir("/tmp/studio");
        let err = config
            .apply_env(|key| (key == "VIBE_IMAGE_TIMEOUT_SECS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: "VIBE_IMAGE_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
