use serde_json::Value;

use crate::config::RedactConfig;
use crate::detokenize::detokenize;
use crate::error::RedactError;
use crate::layout::{LayoutDocument, LayoutNode, NodePath};
use crate::vault::{TokenFormat, TokenVault};

/// Output of one redaction pass.
#[derive(Debug, Clone)]
pub struct Redacted {
    /// The layout with literal content swapped for tokens.
    pub document: LayoutDocument,
    /// Reverse mapping for the matching detokenization.
    pub vault: TokenVault,
    /// Paths of the content nodes that were tokenized, in traversal order.
    pub redacted_paths: Vec<NodePath>,
}

impl Redacted {
    /// Restores original content in compiled text produced from `document`.
    pub fn restore(&self, compiled: &str) -> String {
        detokenize(compiled, &self.vault)
    }
}

/// Replaces every rendering-relevant string literal in `doc` with a token,
/// including strings nested inside structured content values.
///
/// Draft content is only scanned when `preview` is set. Values that already
/// are tokens are left alone, so running the pass twice is a no-op.
pub fn redact(
    doc: &LayoutDocument,
    preview: bool,
    cfg: &RedactConfig,
) -> Result<Redacted, RedactError> {
    cfg.validate()?;

    let mut vault = TokenVault::for_document(doc, cfg);
    let mut document = doc.clone();
    let mut redacted_paths = Vec::new();

    let format = vault.format().clone();
    let mut pass = Pass {
        preview,
        format: &format,
        vault: &mut vault,
        redacted_paths: &mut redacted_paths,
    };
    let root = NodePath::root();
    for (idx, node) in document.nodes.iter_mut().enumerate() {
        pass.visit(node, root.child(idx));
    }

    Ok(Redacted {
        document,
        vault,
        redacted_paths,
    })
}

struct Pass<'a> {
    preview: bool,
    format: &'a TokenFormat,
    vault: &'a mut TokenVault,
    redacted_paths: &'a mut Vec<NodePath>,
}

impl Pass<'_> {
    fn visit(&mut self, node: &mut LayoutNode, path: NodePath) {
        match node {
            LayoutNode::Component { children, .. } | LayoutNode::Field { children, .. } => {
                for (idx, child) in children.iter_mut().enumerate() {
                    self.visit(child, path.child(idx));
                }
            }
            LayoutNode::Content { value, draft } => {
                if *draft && !self.preview {
                    return;
                }
                if self.tokenize(value) {
                    self.redacted_paths.push(path);
                }
            }
            LayoutNode::Reference { .. } => {}
        }
    }

    /// Tokenizes every string in `value`, descending into arrays and object
    /// values. Object keys are structure and stay as they are.
    fn tokenize(&mut self, value: &mut Value) -> bool {
        match value {
            Value::String(text) => {
                if self.format.is_token(text) {
                    return false;
                }
                *text = self.vault.mint(text);
                true
            }
            Value::Array(items) => items
                .iter_mut()
                .fold(false, |minted, item| self.tokenize(item) | minted),
            Value::Object(map) => map
                .values_mut()
                .fold(false, |minted, item| self.tokenize(item) | minted),
            Value::Null | Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DocumentKind;
    use serde_json::json;

    fn content(value: Value, draft: bool) -> LayoutNode {
        LayoutNode::Content { value, draft }
    }

    fn sample() -> LayoutDocument {
        LayoutDocument::new(
            DocumentKind::ComponentLayout,
            vec![LayoutNode::Component {
                uid: "hero".into(),
                children: vec![
                    LayoutNode::Field {
                        name: "title".into(),
                        children: vec![content(json!("Welcome"), false)],
                    },
                    content(json!(42), false),
                    content(json!(true), false),
                    content(json!("Unsaved edit"), true),
                    LayoutNode::Reference {
                        target: "media:7".into(),
                    },
                ],
            }],
        )
    }

    fn string_at(doc: &LayoutDocument, path: &[usize]) -> Value {
        let mut node = &doc.nodes[path[0]];
        for &idx in &path[1..] {
            node = &node.children()[idx];
        }
        match node {
            LayoutNode::Content { value, .. } => value.clone(),
            other => panic!("expected content node, got {other:?}"),
        }
    }

    #[test]
    fn empty_document_is_unchanged() {
        let doc = LayoutDocument::default();
        let out = redact(&doc, false, &RedactConfig::default()).expect("redact");
        assert_eq!(out.document, doc);
        assert!(out.vault.is_empty());
        assert!(out.redacted_paths.is_empty());
    }

    #[test]
    fn tokenizes_committed_strings_only() {
        let doc = sample();
        let out = redact(&doc, false, &RedactConfig::default()).expect("redact");

        assert_eq!(out.vault.len(), 1);
        assert_eq!(out.redacted_paths, vec![NodePath::root().child(0).child(0).child(0)]);

        let title = string_at(&out.document, &[0, 0, 0]);
        let token = title.as_str().expect("string");
        assert_eq!(out.vault.resolve(token), Some("Welcome"));

        assert_eq!(string_at(&out.document, &[0, 1]), json!(42));
        assert_eq!(string_at(&out.document, &[0, 2]), json!(true));
        assert_eq!(string_at(&out.document, &[0, 3]), json!("Unsaved edit"));
    }

    #[test]
    fn preview_also_tokenizes_drafts() {
        let out = redact(&sample(), true, &RedactConfig::default()).expect("redact");
        assert_eq!(out.vault.len(), 2);
        let draft = string_at(&out.document, &[0, 3]);
        assert_eq!(out.vault.resolve(draft.as_str().expect("string")), Some("Unsaved edit"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let cfg = RedactConfig::default();
        let once = redact(&sample(), true, &cfg).expect("first");
        let twice = redact(&once.document, true, &cfg).expect("second");
        assert_eq!(once.document, twice.document);
        assert!(twice.vault.is_empty());
    }

    #[test]
    fn nested_content_values_are_tokenized() {
        let doc = LayoutDocument::new(
            DocumentKind::ComponentLayout,
            vec![content(
                json!({
                    "text": "Confidential launch date",
                    "textFormat": "cohesion",
                    "items": ["First point", 3, {"label": "Deep"}]
                }),
                false,
            )],
        );
        let out = redact(&doc, false, &RedactConfig::default()).expect("redact");

        let wire = out.document.to_json().expect("encode");
        for original in ["Confidential", "First point", "Deep", "\"cohesion\""] {
            assert!(!wire.contains(original), "{original} leaked: {wire}");
        }
        assert!(wire.contains("\"textFormat\""));
        assert!(wire.contains("\"label\""));
        assert_eq!(out.vault.len(), 4);
        assert_eq!(out.redacted_paths, vec![NodePath::root().child(0)]);

        let value = string_at(&out.document, &[0]);
        assert_eq!(value["items"][1], json!(3));
        let token = value["text"].as_str().expect("string");
        assert_eq!(out.vault.resolve(token), Some("Confidential launch date"));

        let again = redact(&out.document, false, &RedactConfig::default()).expect("second");
        assert_eq!(again.document, out.document);
        assert!(again.redacted_paths.is_empty());
    }

    #[test]
    fn restore_uses_the_pass_vault() {
        let out = redact(&sample(), false, &RedactConfig::default()).expect("redact");
        let token = string_at(&out.document, &[0, 0, 0]);
        let compiled = format!("<h1>{}</h1>", token.as_str().expect("string"));
        assert_eq!(out.restore(&compiled), "<h1>Welcome</h1>");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = RedactConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            redact(&sample(), false, &cfg),
            Err(RedactError::InvalidConfig(_))
        ));
    }
}
