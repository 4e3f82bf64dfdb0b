//! Configuration for template persistence.
//!
//! ```rust
//! use persist::WriterConfig;
//!
//! let config = WriterConfig::new("/var/www/files/cohesion/templates", "/tmp/cohesion-scratch");
//! assert_eq!(config.dir_mode, 0o777);
//! assert_eq!(config.manifest_key, "temporary_templates");
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest key under which staged template paths accumulate.
pub const DEFAULT_MANIFEST_KEY: &str = "temporary_templates";
/// Permissions of a freshly created template directory.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Directory the rendering layer reads templates from.
    pub template_dir: PathBuf,
    /// Staging directory for batch rebuilds.
    pub scratch_dir: PathBuf,
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
    #[serde(default = "default_manifest_key")]
    pub manifest_key: String,
}

fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

fn default_manifest_key() -> String {
    DEFAULT_MANIFEST_KEY.into()
}

impl WriterConfig {
    pub fn new(template_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            scratch_dir: scratch_dir.into(),
            dir_mode: DEFAULT_DIR_MODE,
            manifest_key: DEFAULT_MANIFEST_KEY.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.template_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDirectory("template_dir"));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDirectory("scratch_dir"));
        }
        if self.template_dir == self.scratch_dir {
            return Err(ConfigError::SharedDirectory(self.template_dir.clone()));
        }
        if self.dir_mode > 0o7777 {
            return Err(ConfigError::InvalidMode(self.dir_mode));
        }
        if self.manifest_key.trim().is_empty() {
            return Err(ConfigError::EmptyManifestKey);
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    MissingDirectory(&'static str),
    /// Staged writes would land on live templates.
    #[error("template_dir and scratch_dir must differ: {0:?}")]
    SharedDirectory(PathBuf),
    #[error("dir_mode {0:o} is not a permission mode")]
    InvalidMode(u32),
    #[error("manifest_key must not be empty")]
    EmptyManifestKey,
}
