use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while preparing a layout for the compiler.
///
/// Traversal itself is total over the node types, so the only failures are
/// a bad configuration or a layout that could not be decoded in the first
/// place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedactError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("layout document could not be decoded: {0}")]
    Decode(String),
}
