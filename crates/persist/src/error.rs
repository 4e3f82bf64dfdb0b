//! Error types produced by the persist crate.
//!
//! Every failure is local to one write attempt. Callers decide whether to
//! retry, skip, or abort; nothing here panics past the writer boundary.
//!
//! | Error | Raised by |
//! |-------|-----------|
//! | [`CreateDir`](PersistError::CreateDir) | permanent write, directory missing and not creatable |
//! | [`Write`](PersistError::Write) | permanent or temporary content write |
//! | [`Delete`](PersistError::Delete) | stale file cleanup |
//! | [`Manifest`](PersistError::Manifest) | temporary write whose path could not be registered |
//! | [`Metadata`](PersistError::Metadata) | metadata store (only ever logged by the writer) |
//! | [`InvalidFilename`](PersistError::InvalidFilename) | filename escaping its directory |
//! | [`Backend`](PersistError::Backend) | store internals, e.g. a poisoned lock |

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PersistError {
    #[error("unable to create template directory {path:?}: {reason}")]
    CreateDir { path: PathBuf, reason: String },
    #[error("unable to create template file {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("unable to delete template file {path:?}: {reason}")]
    Delete { path: PathBuf, reason: String },
    /// The staged file was written but could not be registered; it must be
    /// treated as not committed.
    #[error("unable to register temporary template {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },
    #[error("unable to store metadata for {key}: {reason}")]
    Metadata { key: String, reason: String },
    #[error("invalid template filename: {0:?}")]
    InvalidFilename(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl PersistError {
    pub(crate) fn backend(msg: impl Into<String>) -> Self {
        PersistError::Backend(msg.into())
    }
}
