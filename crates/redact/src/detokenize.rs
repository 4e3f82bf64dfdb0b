//! Restores original content in compiled template text.
//!
//! Replacements are computed for the whole vault before the text is touched,
//! then applied in one left-to-right pass. Substituted text is never scanned
//! again, so an original value that happens to look like a token stays
//! literal.
//!
//! A token that the compiler placed between single quotes (`'<token>'`) is
//! inside a string literal of the template dialect. Its original is first
//! un-escaped (`\'` → `'`) and then every quote is escaped (`'` → `\'`), so
//! the literal stays well formed whether or not the author already escaped
//! quotes.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::vault::TokenVault;

/// Replaces every vault token in `compiled` with its original string.
pub fn detokenize(compiled: &str, vault: &TokenVault) -> String {
    if vault.is_empty() {
        return compiled.to_string();
    }

    let replacements: HashMap<&str, Cow<'_, str>> = vault
        .iter()
        .map(|(token, original)| {
            let replacement = if is_single_quoted(compiled, token) {
                Cow::Owned(escape_single_quotes(original))
            } else {
                Cow::Borrowed(original)
            };
            (token, replacement)
        })
        .collect();

    let format = vault.format();
    let prefix = format.prefix();
    let token_len = format.token_len();

    let mut out = String::with_capacity(compiled.len());
    let mut rest = compiled;
    while let Some(pos) = rest.find(prefix) {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match candidate
            .get(..token_len)
            .and_then(|token| replacements.get(token))
        {
            Some(replacement) => {
                out.push_str(replacement);
                rest = &candidate[token_len..];
            }
            None => {
                out.push_str(prefix);
                rest = &candidate[prefix.len()..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_single_quoted(compiled: &str, token: &str) -> bool {
    compiled
        .match_indices(token)
        .any(|(idx, _)| {
            compiled[..idx].ends_with('\'') && compiled[idx + token.len()..].starts_with('\'')
        })
}

/// Normalizes `\'` to `'`, then escapes every `'`.
pub fn escape_single_quotes(original: &str) -> String {
    original.replace("\\'", "'").replace('\'', "\\'")
}
