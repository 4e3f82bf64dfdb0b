//! Workspace umbrella crate for the twigpress template pipeline.
//!
//! This crate stitches redaction, compilation, reconciliation and
//! persistence together so a host can turn a layout document into template
//! files with a single call:
//!
//! ```text
//! LayoutDocument ─ redact ─> tokens only ─ Compiler ─> twig per theme
//!        ─ detokenize ─> reconcile ─> write / stage ─> PipelineReport
//! ```
//!
//! The compiler and every storage backend are injected, see [`Compiler`] and
//! [`Stores`].
//!
//! ```rust
//! use std::sync::Arc;
//! use twigpress::{
//!     DocumentKind, EchoCompiler, EntityRef, EntityRequest, LayoutDocument, LayoutNode, Pipeline,
//!     ReportOutcome, Stores, TwigpressConfig,
//! };
//!
//! let cfg = TwigpressConfig::new("/site/templates", "/site/scratch");
//! let stores = Stores::in_memory(&cfg.writer.to_writer_config());
//! let compiler = Arc::new(EchoCompiler::new(["olivero", "claro"]));
//! let pipeline = Pipeline::new(cfg, compiler, stores).unwrap();
//!
//! let doc = LayoutDocument::new(
//!     DocumentKind::ComponentLayout,
//!     vec![LayoutNode::Content { value: "Hello".into(), draft: false }],
//! );
//! let request = EntityRequest::new(
//!     EntityRef::new("cohesion_component", "hero", "component--cpt-hero"),
//!     doc,
//! );
//! let report = pipeline.process(&request).unwrap();
//! assert!(report.success);
//! assert_eq!(report.outcome, ReportOutcome::Shared);
//! ```

pub mod config;

mod batch;
mod compiler;
mod metrics;
mod pipeline;

pub use persist::{
    FileStore, InMemoryFileStore, InMemoryManifest, InMemoryMetadataStore, LocalFileStore,
    ManifestStore, MetadataStore, PersistError, StorageMode, WriterConfig,
};
pub use reconcile::{
    CompiledResponse, CompiledTemplate, ReconcileConfig, ReconcileError, TemplateName,
};
pub use redact::{
    detokenize, redact, DocumentKind, LayoutDocument, LayoutNode, RedactConfig, RedactError,
    TokenVault,
};

pub use crate::batch::{run_batch, BatchOutcome};
pub use crate::compiler::{
    CompileError, CompileRequest, CompileSettings, Compiler, EchoCompiler, JsonCompiler,
    Transport,
};
pub use crate::config::{ConfigLoadError, TwigpressConfig};
pub use crate::metrics::PipelineMetrics;
pub use crate::pipeline::{
    EntityRef, EntityRequest, Pipeline, PipelineReport, ReportOutcome, Stores, WriteFailure,
};

use std::error::Error;
use std::fmt;

/// Errors that stop an entity before any template is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    InvalidConfig(String),
    Redact(RedactError),
    Compile(CompileError),
    Reconcile(ReconcileError),
}

impl PipelineError {
    /// The compiler rejected the templates; nothing was written and the
    /// previous files are untouched.
    pub fn is_compile_failure(&self) -> bool {
        match self {
            PipelineError::Compile(_) => true,
            PipelineError::Reconcile(err) => err.is_remote(),
            PipelineError::InvalidConfig(_) | PipelineError::Redact(_) => false,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidConfig(msg) => write!(f, "invalid pipeline configuration: {msg}"),
            PipelineError::Redact(err) => write!(f, "redaction failure: {err}"),
            PipelineError::Compile(err) => write!(f, "compilation failure: {err}"),
            PipelineError::Reconcile(err) => {
                write!(f, "template has not been saved: {err}")
            }
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Redact(err) => Some(err),
            PipelineError::Compile(err) => Some(err),
            PipelineError::Reconcile(err) => Some(err),
            PipelineError::InvalidConfig(_) => None,
        }
    }
}

impl From<RedactError> for PipelineError {
    fn from(value: RedactError) -> Self {
        PipelineError::Redact(value)
    }
}

impl From<CompileError> for PipelineError {
    fn from(value: CompileError) -> Self {
        PipelineError::Compile(value)
    }
}

impl From<ReconcileError> for PipelineError {
    fn from(value: ReconcileError) -> Self {
        PipelineError::Reconcile(value)
    }
}
