#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use twigpress::{
    CompileError, CompileRequest, CompiledResponse, Compiler, DocumentKind, EntityRef,
    EntityRequest, FileStore, InMemoryFileStore, InMemoryManifest, InMemoryMetadataStore,
    LayoutDocument, LayoutNode, ManifestStore, Pipeline, Stores, TwigpressConfig,
};

pub const TEMPLATE_DIR: &str = "/site/templates";
pub const SCRATCH_DIR: &str = "/site/scratch";
pub const TEMPLATE: &str = "component--cpt-hero";

/// Compiler driven by a closure over the request it receives.
pub struct FnCompiler<F>(F);

impl<F> FnCompiler<F>
where
    F: Fn(&CompileRequest) -> Result<Vec<CompiledResponse>, CompileError> + Send + Sync,
{
    pub fn new(compile: F) -> Self {
        Self(compile)
    }
}

impl<F> Compiler for FnCompiler<F>
where
    F: Fn(&CompileRequest) -> Result<Vec<CompiledResponse>, CompileError> + Send + Sync,
{
    fn compile(&self, request: &CompileRequest) -> Result<Vec<CompiledResponse>, CompileError> {
        (self.0)(request)
    }
}

/// Every string content value in the tree, depth first.
pub fn content_strings(nodes: &[LayoutNode]) -> Vec<String> {
    let mut out = Vec::new();
    collect(nodes, &mut out);
    out
}

fn collect(nodes: &[LayoutNode], out: &mut Vec<String>) {
    for node in nodes {
        if let LayoutNode::Content {
            value: Value::String(s),
            ..
        } = node
        {
            out.push(s.clone());
        }
        collect(node.children(), out);
    }
}

/// `<p>` per content string of the request, the way a compiler would lay
/// tokens out.
pub fn paragraphs(request: &CompileRequest) -> String {
    content_strings(&request.layout.nodes)
        .iter()
        .map(|s| format!("<p>{s}</p>"))
        .collect()
}

/// Same markup for every theme.
pub fn uniform(themes: &'static [&'static str]) -> impl Compiler {
    FnCompiler::new(move |req: &CompileRequest| {
        let body = paragraphs(req);
        Ok(themes
            .iter()
            .map(|theme| CompiledResponse::new(*theme, body.clone()))
            .collect())
    })
}

/// Each theme wraps the markup in its own class.
pub fn divergent(themes: &'static [&'static str]) -> impl Compiler {
    FnCompiler::new(move |req: &CompileRequest| {
        let body = paragraphs(req);
        Ok(themes
            .iter()
            .map(|theme| {
                CompiledResponse::new(*theme, format!("<div class=\"{theme}\">{body}</div>"))
            })
            .collect())
    })
}

pub fn content(text: &str) -> LayoutNode {
    LayoutNode::Content {
        value: Value::String(text.into()),
        draft: false,
    }
}

pub fn hero_document(texts: &[&str]) -> LayoutDocument {
    LayoutDocument::new(
        DocumentKind::ComponentLayout,
        vec![LayoutNode::Component {
            uid: "cpt-hero".into(),
            children: texts.iter().map(|t| content(t)).collect(),
        }],
    )
}

pub fn hero_request(texts: &[&str]) -> EntityRequest {
    EntityRequest::new(
        EntityRef::new("cohesion_component", "hero", TEMPLATE),
        hero_document(texts),
    )
}

pub fn filename(theme: Option<&str>) -> String {
    match theme {
        Some(theme) => format!("{TEMPLATE}--{theme}.html.twig"),
        None => format!("{TEMPLATE}.html.twig"),
    }
}

/// In-memory stores plus a config over them.
pub struct Harness {
    pub cfg: TwigpressConfig,
    pub files: Arc<InMemoryFileStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub manifest: Arc<InMemoryManifest>,
}

impl Harness {
    pub fn new() -> Self {
        let mut cfg = TwigpressConfig::new(TEMPLATE_DIR, SCRATCH_DIR);
        cfg.themes = vec!["olivero".into(), "claro".into()];
        Self {
            cfg,
            files: Arc::new(InMemoryFileStore::with_dirs([SCRATCH_DIR])),
            metadata: Arc::new(InMemoryMetadataStore::new()),
            manifest: Arc::new(InMemoryManifest::new()),
        }
    }

    pub fn stores(&self) -> Stores {
        Stores::new(
            self.files.clone(),
            self.metadata.clone(),
            self.manifest.clone(),
        )
    }

    pub fn pipeline(&self, compiler: impl Compiler + 'static) -> Pipeline {
        Pipeline::new(self.cfg.clone(), Arc::new(compiler), self.stores()).expect("pipeline")
    }

    /// Puts a file into the template directory as if a previous run wrote it.
    pub fn seed(&self, name: &str, content: &str) {
        let dir = Path::new(TEMPLATE_DIR);
        self.files.create_dir(dir, 0o777).expect("mkdir");
        self.files
            .write_replace(&dir.join(name), content.as_bytes())
            .expect("seed");
    }

    pub fn template(&self, name: &str) -> Option<String> {
        self.read(&Path::new(TEMPLATE_DIR).join(name))
    }

    pub fn staged(&self, name: &str) -> Option<String> {
        self.read(&Path::new(SCRATCH_DIR).join(name))
    }

    fn read(&self, path: &Path) -> Option<String> {
        self.files
            .read(path)
            .map(|bytes| String::from_utf8(bytes).expect("utf8"))
    }

    pub fn manifest_entries(&self) -> Vec<PathBuf> {
        self.manifest
            .entries(&self.cfg.writer.manifest_key)
            .expect("manifest")
    }
}
