//! The remote template compiler seam.
//!
//! The pipeline never talks HTTP itself. It builds a [`CompileRequest`] from
//! the redacted layout and hands it to whatever [`Compiler`] the host
//! injected. [`JsonCompiler`] covers the common case of a JSON API reached
//! through some [`Transport`]; [`EchoCompiler`] renders locally and is used
//! for dry runs and tests.

use std::collections::BTreeMap;

use reconcile::{decode_responses, CompiledResponse};
use redact::{DocumentKind, LayoutDocument, LayoutNode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Failures talking to the compiler. Template errors reported *by* the
/// compiler arrive inside [`CompiledResponse`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("compiler unavailable: {0}")]
    Unavailable(String),
    #[error("compiler rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed compiler exchange: {0}")]
    Malformed(String),
}

/// Flags that tell the compiler how to wrap the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileSettings {
    /// Content/master/view template: wrapped in an `<article>` for quick edit.
    pub is_content_template: bool,
    pub is_component_template: bool,
    /// Component output carries the contextual editing wrapper.
    pub is_component_contextual: bool,
    /// Twig is returned for rendering, not for persisting.
    pub is_layout_entity: bool,
    pub is_preview: bool,
}

impl CompileSettings {
    pub fn new(kind: DocumentKind, supports_quick_edit: bool, preview: bool) -> Self {
        let is_component = kind == DocumentKind::ComponentLayout;
        let is_layout_entity = kind == DocumentKind::ContentLayout || preview;
        Self {
            is_content_template: kind == DocumentKind::StandaloneTemplate,
            is_component_template: is_component,
            is_component_contextual: is_component && supports_quick_edit,
            is_layout_entity,
            is_preview: is_layout_entity && preview,
        }
    }

    pub fn for_document(document: &LayoutDocument, preview: bool) -> Self {
        Self::new(document.kind, document.supports_quick_edit, preview)
    }

    /// The compiled output is only rendered, never written to disk.
    pub fn is_render_only(&self) -> bool {
        self.is_layout_entity
    }
}

/// Everything the compiler gets to see. `templates` is always the redacted
/// layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub entity_id: String,
    pub entity_type_id: String,
    pub settings: CompileSettings,
    #[serde(rename = "templates")]
    pub layout: LayoutDocument,
}

/// Turns a redacted layout into one compiled template per theme.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<CompiledResponse>, CompileError>;
}

/// Moves one JSON body to the compiler service and returns its JSON answer.
pub trait Transport: Send + Sync {
    fn send(&self, body: &Value) -> Result<Value, CompileError>;
}

/// [`Compiler`] for the JSON wire format, over any [`Transport`].
#[derive(Debug, Clone)]
pub struct JsonCompiler<T> {
    transport: T,
}

impl<T: Transport> JsonCompiler<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Compiler for JsonCompiler<T> {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<CompiledResponse>, CompileError> {
        let body =
            serde_json::to_value(request).map_err(|e| CompileError::Malformed(e.to_string()))?;
        let payload = self.transport.send(&body)?;
        decode_responses(&payload).map_err(|e| CompileError::Malformed(e.to_string()))
    }
}

/// Local stand-in for the compiler service.
///
/// Renders the (tokenized) layout to plain markup once per theme. A theme
/// given a variant class gets its output wrapped, so its template diverges
/// from the others.
#[derive(Debug, Clone, Default)]
pub struct EchoCompiler {
    themes: Vec<String>,
    variants: BTreeMap<String, String>,
}

impl EchoCompiler {
    pub fn new<I, S>(themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            themes: themes.into_iter().map(Into::into).collect(),
            variants: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, theme: impl Into<String>, class: impl Into<String>) -> Self {
        self.variants.insert(theme.into(), class.into());
        self
    }

    fn render(&self, request: &CompileRequest) -> String {
        let mut out = String::new();
        render_nodes(&request.layout.nodes, &mut out);
        let settings = &request.settings;
        if settings.is_content_template {
            out = format!("<article>{out}</article>");
        } else if settings.is_component_contextual {
            out = format!("<div class=\"coh-contextual\">{out}</div>");
        }
        out
    }
}

impl Compiler for EchoCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<CompiledResponse>, CompileError> {
        let body = self.render(request);
        let metadata = json!({
            "filename": format!("{}-{}", request.entity_type_id, request.entity_id),
        });
        Ok(self
            .themes
            .iter()
            .map(|theme| {
                let twig = match self.variants.get(theme) {
                    Some(class) => format!("<div class=\"{class}\">{body}</div>"),
                    None => body.clone(),
                };
                let response = CompiledResponse::new(theme.clone(), twig);
                match metadata.as_object() {
                    Some(map) => response.with_metadata(map.clone()),
                    None => response,
                }
            })
            .collect())
    }
}

fn render_nodes(nodes: &[LayoutNode], out: &mut String) {
    for node in nodes {
        match node {
            LayoutNode::Component { uid, children } => {
                out.push_str(&format!("<div data-uid=\"{uid}\">"));
                render_nodes(children, out);
                out.push_str("</div>");
            }
            LayoutNode::Field { name, children } => {
                out.push_str(&format!("{{% block {name} %}}"));
                render_nodes(children, out);
                out.push_str("{% endblock %}");
            }
            LayoutNode::Content { value, .. } => match value {
                Value::String(text) => out.push_str(text),
                Value::Null => {}
                other => out.push_str(&other.to_string()),
            },
            LayoutNode::Reference { target } => {
                out.push_str(&format!("{{{{ include('{target}') }}}}"));
            }
        }
    }
}
