//! Layout redaction layer.
//!
//! Before a layout leaves the process for the remote template compiler, every
//! literal piece of content in it is swapped for an opaque token. The
//! compiler only ever sees structure; the [`TokenVault`] produced by the pass
//! maps the tokens back to the original strings once compiled template text
//! comes back.
//!
//! ## What we do
//!
//! - Mint collision-free tokens ([`TokenVault`])
//! - Walk the layout tree and tokenize string content ([`redact`])
//! - Put the content back into compiled template text, escaping quotes where
//!   the token sat inside a single-quoted literal ([`detokenize`])
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock, no randomness. The same layout and config always yield
//! the same tokens.
//!
//! ## Invariants worth knowing
//!
//! - A token never occurs as a substring of the document it was minted for
//! - Running [`redact`] on its own output changes nothing
//! - Detokenization substitutes from a snapshot and never rescans its output

mod config;
mod detokenize;
mod error;
mod layout;
mod redactor;
mod vault;

pub use crate::config::{
    ConfigError, RedactConfig, DEFAULT_DIGEST_LEN, DEFAULT_TOKEN_PREFIX, DEFAULT_TOKEN_SUFFIX,
};
pub use crate::detokenize::{detokenize, escape_single_quotes};
pub use crate::error::RedactError;
pub use crate::layout::{DocumentKind, LayoutDocument, LayoutNode, NodePath};
pub use crate::redactor::{redact, Redacted};
pub use crate::vault::{TokenFormat, TokenVault};
