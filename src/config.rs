//! YAML configuration file support.
//!
//! One file configures every stage of the pipeline:
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! redact:
//!   version: 1
//!   token_prefix: "[coh-content:"
//!   token_suffix: "]"
//!   digest_len: 16
//!
//! reconcile:
//!   generic_theme: "coh-generic-theme"
//!   template_extension: ".html.twig"
//!
//! writer:
//!   template_dir: "/var/www/files/cohesion/templates"
//!   scratch_dir: "/var/www/private/cohesion/scratch"
//!   dir_mode: 0o777
//!   manifest_key: "temporary_templates"
//!
//! themes: ["olivero", "claro"]
//!
//! batch:
//!   parallel: true
//!
//! logging:
//!   filter: "info"
//!   json: false
//! ```
//!
//! `dir_mode` also accepts a plain decimal integer (511 == 0o777).

use std::fs;
use std::path::Path;

use persist::WriterConfig;
use reconcile::ReconcileConfig;
use redact::RedactConfig;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration of the template pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwigpressConfig {
    /// Configuration format version.
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub redact: RedactConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    pub writer: WriterYamlConfig,

    /// Themes whose suffixed templates are cleaned up once outputs converge.
    #[serde(default)]
    pub themes: Vec<String>,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Writer section; same fields as [`WriterConfig`] with a friendlier mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterYamlConfig {
    pub template_dir: String,
    pub scratch_dir: String,
    #[serde(default = "default_dir_mode", deserialize_with = "deserialize_mode")]
    pub dir_mode: u32,
    #[serde(default = "default_manifest_key")]
    pub manifest_key: String,
}

fn default_dir_mode() -> u32 {
    persist::DEFAULT_DIR_MODE
}

fn default_manifest_key() -> String {
    persist::DEFAULT_MANIFEST_KEY.into()
}

/// Accepts `511`, `"0o777"` or `"777"` (octal).
fn deserialize_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mode {
        Int(u32),
        Text(String),
    }

    match Mode::deserialize(deserializer)? {
        Mode::Int(mode) => Ok(mode),
        Mode::Text(text) => {
            let digits = text.trim().trim_start_matches("0o");
            u32::from_str_radix(digits, 8).map_err(serde::de::Error::custom)
        }
    }
}

impl WriterYamlConfig {
    pub fn to_writer_config(&self) -> WriterConfig {
        WriterConfig {
            template_dir: self.template_dir.clone().into(),
            scratch_dir: self.scratch_dir.clone().into(),
            dir_mode: self.dir_mode,
            manifest_key: self.manifest_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchConfig {
    /// Process entities of a batch on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl TwigpressConfig {
    /// A configuration with default stages writing into the given directories.
    pub fn new(template_dir: impl Into<String>, scratch_dir: impl Into<String>) -> Self {
        Self {
            version: "1.0".into(),
            name: None,
            redact: RedactConfig::default(),
            reconcile: ReconcileConfig::default(),
            writer: WriterYamlConfig {
                template_dir: template_dir.into(),
                scratch_dir: scratch_dir.into(),
                dir_mode: default_dir_mode(),
                manifest_key: default_manifest_key(),
            },
            themes: Vec::new(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: TwigpressConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.redact
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("redact: {e}")))?;
        self.reconcile
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("reconcile: {e}")))?;
        self.writer
            .to_writer_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("writer: {e}")))?;

        if let Some(theme) = self.themes.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(format!(
                "themes: empty theme name {theme:?}"
            )));
        }
        Ok(())
    }
}
