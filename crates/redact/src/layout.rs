//! Layout document model.
//!
//! A [`LayoutDocument`] is the tree a site-builder entity hands to the
//! compiler. Only the parts the redaction pass cares about are modelled:
//! structural nodes (components, fields, references) and literal content.
//!
//! ```text
//! LayoutDocument
//! ├── kind: DocumentKind
//! ├── supports_quick_edit: bool
//! └── nodes: Vec<LayoutNode>
//!     ├── Component { uid, children }
//!     ├── Field { name, children }
//!     ├── Content { value, draft }
//!     └── Reference { target }
//! ```
//!
//! # JSON shape
//!
//! ```rust
//! use redact::{DocumentKind, LayoutDocument, LayoutNode};
//!
//! let doc = LayoutDocument::from_json(r#"{
//!     "kind": "component_layout",
//!     "nodes": [
//!         { "type": "component", "uid": "cpt-1", "children": [
//!             { "type": "content", "value": "Hello" }
//!         ]}
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(doc.kind, DocumentKind::ComponentLayout);
//! assert!(doc.supports_quick_edit);
//! assert!(matches!(doc.nodes[0], LayoutNode::Component { .. }));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RedactError;

/// What kind of entity produced the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Layout attached to a content entity; rendered, never persisted as a file.
    ContentLayout,
    /// Layout of a reusable component.
    ComponentLayout,
    /// Content, master or view template.
    #[default]
    StandaloneTemplate,
}

/// A layout tree plus the facts about its owner the compiler needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LayoutDocument {
    #[serde(default)]
    pub kind: DocumentKind,
    /// Whether the owning entity opts into quick-edit wrappers.
    #[serde(default = "default_quick_edit")]
    pub supports_quick_edit: bool,
    #[serde(default)]
    pub nodes: Vec<LayoutNode>,
}

fn default_quick_edit() -> bool {
    true
}

/// One node of the layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutNode {
    Component {
        uid: String,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    Field {
        name: String,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    /// Literal content. `draft` marks contextual values that are not yet
    /// committed (only rendered in preview).
    Content {
        value: Value,
        #[serde(default)]
        draft: bool,
    },
    Reference {
        target: String,
    },
}

impl LayoutNode {
    /// Child nodes, empty for leaves.
    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Component { children, .. } | LayoutNode::Field { children, .. } => {
                children
            }
            LayoutNode::Content { .. } | LayoutNode::Reference { .. } => &[],
        }
    }
}

impl LayoutDocument {
    pub fn new(kind: DocumentKind, nodes: Vec<LayoutNode>) -> Self {
        Self {
            kind,
            supports_quick_edit: true,
            nodes,
        }
    }

    /// Decodes a layout from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, RedactError> {
        serde_json::from_str(json).map_err(|err| RedactError::Decode(err.to_string()))
    }

    /// Encodes the layout as JSON for transmission.
    pub fn to_json(&self) -> Result<String, RedactError> {
        serde_json::to_string(self).map_err(|err| RedactError::Decode(err.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visits every string in the tree: identifiers, names, targets and any
    /// string nested inside content values.
    pub fn for_each_str(&self, visit: &mut dyn FnMut(&str)) {
        fn walk_value(value: &Value, visit: &mut dyn FnMut(&str)) {
            match value {
                Value::String(s) => visit(s),
                Value::Array(items) => items.iter().for_each(|v| walk_value(v, visit)),
                Value::Object(map) => {
                    for (key, v) in map {
                        visit(key);
                        walk_value(v, visit);
                    }
                }
                Value::Null | Value::Bool(_) | Value::Number(_) => {}
            }
        }

        fn walk(node: &LayoutNode, visit: &mut dyn FnMut(&str)) {
            match node {
                LayoutNode::Component { uid, .. } => visit(uid),
                LayoutNode::Field { name, .. } => visit(name),
                LayoutNode::Content { value, .. } => walk_value(value, visit),
                LayoutNode::Reference { target } => visit(target),
            }
            for child in node.children() {
                walk(child, visit);
            }
        }

        for node in &self.nodes {
            walk(node, visit);
        }
    }
}

/// Position of a node: child indices from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}
