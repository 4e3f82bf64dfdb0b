use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop reconciliation before any file decision is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconcileError {
    /// The compiler reported an error for a theme. Nothing may be written.
    #[error("template compilation error for theme {theme}: {message}")]
    Compile { theme: String, message: String },
    #[error("compiler returned no usable templates")]
    NoTemplates,
    #[error("malformed compiler response: {0}")]
    Decode(String),
    #[error("invalid template name: {0:?}")]
    InvalidName(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl ReconcileError {
    /// True when the error originates from the remote compiler rather than
    /// from local input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ReconcileError::Compile { .. } | ReconcileError::NoTemplates | ReconcileError::Decode(_)
        )
    }
}
