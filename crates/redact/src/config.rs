//! Configuration types for content redaction.
//!
//! [`RedactConfig`] controls the shape of the placeholder tokens minted by the
//! [`TokenVault`](crate::TokenVault). The token shape is part of the contract
//! with the remote compiler: it must survive compilation untouched, so it is
//! kept to plain ASCII with a fixed-width lowercase hex body.
//!
//! # Examples
//!
//! ```rust
//! use redact::RedactConfig;
//!
//! let config = RedactConfig::default();
//! assert_eq!(config.version, 1);
//! assert_eq!(config.token_prefix, "[coh-content:");
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default opening delimiter of a content token.
pub const DEFAULT_TOKEN_PREFIX: &str = "[coh-content:";
/// Default closing delimiter of a content token.
pub const DEFAULT_TOKEN_SUFFIX: &str = "]";
/// Default number of hex characters between the delimiters.
pub const DEFAULT_DIGEST_LEN: usize = 16;

const MIN_DIGEST_LEN: usize = 8;
const MAX_DIGEST_LEN: usize = 64;

/// Configuration for the redaction pass.
///
/// # Version Requirements
///
/// `version` is mixed into every token digest, so two configurations with
/// different versions never mint the same token for the same content.
/// Version 0 is reserved and rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    /// Digest salt version. Must be >= 1.
    pub version: u32,
    /// Opening delimiter of every token.
    pub token_prefix: String,
    /// Closing delimiter of every token.
    pub token_suffix: String,
    /// Number of hex characters in the token body (8..=64).
    pub digest_len: usize,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            version: 1,
            token_prefix: DEFAULT_TOKEN_PREFIX.into(),
            token_suffix: DEFAULT_TOKEN_SUFFIX.into(),
            digest_len: DEFAULT_DIGEST_LEN,
        }
    }
}

/// Errors that can occur when validating a [`RedactConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config version must be >= 1")]
    ZeroVersion,
    #[error("token prefix must not be empty")]
    EmptyPrefix,
    #[error("token delimiters must not contain quotes or backslashes: {0:?}")]
    UnsafeDelimiter(String),
    #[error("digest_len ({0}) must be between 8 and 64")]
    DigestLength(usize),
}

impl RedactConfig {
    /// Validates internal consistency of this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::ZeroVersion);
        }
        if self.token_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        for delimiter in [&self.token_prefix, &self.token_suffix] {
            if delimiter.contains(['\'', '"', '\\']) {
                return Err(ConfigError::UnsafeDelimiter(delimiter.clone()));
            }
        }
        if !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&self.digest_len) {
            return Err(ConfigError::DigestLength(self.digest_len));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RedactConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_version() {
        let cfg = RedactConfig {
            version: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroVersion));
    }

    #[test]
    fn rejects_quoted_delimiters() {
        let cfg = RedactConfig {
            token_suffix: "']".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsafeDelimiter(_))));
    }

    #[test]
    fn rejects_out_of_range_digest() {
        for len in [0, 7, 65] {
            let cfg = RedactConfig {
                digest_len: len,
                ..Default::default()
            };
            assert_eq!(cfg.validate(), Err(ConfigError::DigestLength(len)));
        }
    }
}
