//! Placeholder tokens and their reverse mapping.
//!
//! A token looks like `[coh-content:3f9a01c2d4e5b6a7]`: a fixed prefix, a
//! fixed-width lowercase hex digest, a fixed suffix. The digest is
//!
//! ```text
//! SHA-256(version.to_be_bytes() || counter.to_be_bytes() || 0x00 || original)
//! ```
//!
//! truncated to `digest_len` hex characters. The counter advances on every
//! attempt, so a token that is already issued, or that already occurs
//! anywhere in the document being processed, is simply skipped.
//!
//! A vault lives for one redaction pass and is consumed by the matching
//! detokenization. It is not meant to be shared between passes.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::config::{RedactConfig, DEFAULT_TOKEN_PREFIX};
use crate::layout::LayoutDocument;

/// The fixed shape of a content token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFormat {
    prefix: String,
    suffix: String,
    digest_len: usize,
}

impl TokenFormat {
    pub fn from_config(cfg: &RedactConfig) -> Self {
        let prefix = if cfg.token_prefix.is_empty() {
            DEFAULT_TOKEN_PREFIX.to_string()
        } else {
            cfg.token_prefix.clone()
        };
        Self {
            prefix,
            suffix: cfg.token_suffix.clone(),
            digest_len: cfg.digest_len.clamp(1, 64),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Byte length of every token of this format.
    pub fn token_len(&self) -> usize {
        self.prefix.len() + self.digest_len + self.suffix.len()
    }

    /// True when `candidate` is exactly one token of this format.
    pub fn is_token(&self, candidate: &str) -> bool {
        candidate.len() == self.token_len()
            && candidate
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
                .is_some_and(|body| {
                    body.bytes()
                        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
                })
    }

    fn render(&self, digest_hex: &str) -> String {
        let body = digest_hex.get(..self.digest_len).unwrap_or(digest_hex);
        format!("{}{}{}", self.prefix, body, self.suffix)
    }
}

impl Default for TokenFormat {
    fn default() -> Self {
        Self::from_config(&RedactConfig::default())
    }
}

/// Token → original string, in insertion order.
#[derive(Debug, Clone)]
pub struct TokenVault {
    format: TokenFormat,
    version: u32,
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    haystack: String,
    counter: u64,
}

impl TokenVault {
    /// An empty vault with nothing to avoid but its own tokens.
    pub fn new(cfg: &RedactConfig) -> Self {
        Self {
            format: TokenFormat::from_config(cfg),
            version: cfg.version,
            entries: Vec::new(),
            index: HashMap::new(),
            haystack: String::new(),
            counter: 0,
        }
    }

    /// An empty vault that refuses to mint any token already present as a
    /// substring of `doc`.
    pub fn for_document(doc: &LayoutDocument, cfg: &RedactConfig) -> Self {
        let mut vault = Self::new(cfg);
        doc.for_each_str(&mut |s| {
            vault.haystack.push_str(s);
            vault.haystack.push('\0');
        });
        vault
    }

    pub fn format(&self) -> &TokenFormat {
        &self.format
    }

    /// Issues a fresh token for `original` and records the mapping.
    pub fn mint(&mut self, original: &str) -> String {
        loop {
            let digest = token_digest(self.version, self.counter, original);
            self.counter += 1;
            let token = self.format.render(&digest);
            if self.index.contains_key(&token) || self.haystack.contains(token.as_str()) {
                continue;
            }
            self.index.insert(token.clone(), self.entries.len());
            self.entries.push((token.clone(), original.to_string()));
            return token;
        }
    }

    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.index
            .get(token)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    /// `(token, original)` pairs in the order they were minted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(token, original)| (token.as_str(), original.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn token_digest(version: u32, counter: u64, original: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_be_bytes());
    hasher.update(counter.to_be_bytes());
    hasher.update([0]);
    hasher.update(original.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DocumentKind, LayoutNode};
    use serde_json::json;

    #[test]
    fn minted_tokens_are_recognized_and_resolve() {
        let mut vault = TokenVault::new(&RedactConfig::default());
        let token = vault.mint("Hello");
        assert!(vault.format().is_token(&token));
        assert_eq!(token.len(), vault.format().token_len());
        assert_eq!(vault.resolve(&token), Some("Hello"));
        assert_eq!(vault.resolve("[coh-content:0000000000000000]"), None);
    }

    #[test]
    fn same_content_gets_distinct_tokens() {
        let mut vault = TokenVault::new(&RedactConfig::default());
        let a = vault.mint("same");
        let b = vault.mint("same");
        assert_ne!(a, b);
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn minting_is_deterministic() {
        let cfg = RedactConfig::default();
        let mut first = TokenVault::new(&cfg);
        let mut second = TokenVault::new(&cfg);
        for text in ["a", "b", "c"] {
            assert_eq!(first.mint(text), second.mint(text));
        }
    }

    #[test]
    fn skips_tokens_already_present_in_document() {
        let cfg = RedactConfig::default();
        let expected = TokenVault::new(&cfg).mint("body");

        let doc = LayoutDocument::new(
            DocumentKind::StandaloneTemplate,
            vec![LayoutNode::Content {
                value: json!(format!("literal text quoting {expected} verbatim")),
                draft: false,
            }],
        );
        let mut vault = TokenVault::for_document(&doc, &cfg);
        let token = vault.mint("body");
        assert_ne!(token, expected);
        assert!(vault.format().is_token(&token));
    }

    #[test]
    fn is_token_rejects_near_misses() {
        let format = TokenFormat::default();
        assert!(format.is_token("[coh-content:0123456789abcdef]"));
        assert!(!format.is_token("[coh-content:0123456789ABCDEF]"));
        assert!(!format.is_token("[coh-content:0123456789abcde]"));
        assert!(!format.is_token("x[coh-content:0123456789abcdef]"));
        assert!(!format.is_token("plain text"));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut vault = TokenVault::new(&RedactConfig::default());
        let t1 = vault.mint("one");
        let t2 = vault.mint("two");
        let pairs: Vec<_> = vault.iter().collect();
        assert_eq!(pairs, vec![(t1.as_str(), "one"), (t2.as_str(), "two")]);
    }
}
