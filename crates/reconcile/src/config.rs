//! Configuration for theme reconciliation.
//!
//! ```rust
//! use reconcile::ReconcileConfig;
//!
//! let config = ReconcileConfig::default();
//! assert_eq!(config.generic_theme, "coh-generic-theme");
//! assert_eq!(config.template_extension, ".html.twig");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Theme identifier the compiler uses for output shared by every theme that
/// does not generate its own templates.
pub const DEFAULT_GENERIC_THEME: &str = "coh-generic-theme";
/// Extension of the host template dialect.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = ".html.twig";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Reserved theme name written under the shared filename.
    pub generic_theme: String,
    /// Appended to every template filename, including the leading dot.
    pub template_extension: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            generic_theme: DEFAULT_GENERIC_THEME.into(),
            template_extension: DEFAULT_TEMPLATE_EXTENSION.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("generic_theme must not be empty")]
    EmptyGenericTheme,
    #[error("template_extension must start with '.' and contain no path separator: {0:?}")]
    InvalidExtension(String),
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generic_theme.trim().is_empty() {
            return Err(ConfigError::EmptyGenericTheme);
        }
        let ext = &self.template_extension;
        if !ext.starts_with('.') || ext.len() < 2 || ext.contains(['/', '\\']) {
            return Err(ConfigError::InvalidExtension(ext.clone()));
        }
        Ok(())
    }
}
