use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use persist::{
    FileStore, InMemoryFileStore, InMemoryManifest, InMemoryMetadataStore, LocalFileStore,
    ManifestStore, MetadataStore, PersistedTemplate, StorageMode, TemplateWriter, WriterConfig,
};
use reconcile::{
    CompiledResponse, Outcome, ReconcileError, Reconciler, Reconciliation, TemplateName,
};
use redact::{redact, LayoutDocument, Redacted};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};

use crate::compiler::{CompileRequest, CompileSettings, Compiler};
use crate::config::TwigpressConfig;
use crate::metrics::{MetricsSpan, PipelineMetrics};
use crate::PipelineError;

/// Identifies the entity a layout belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type_id: String,
    pub entity_id: String,
    /// Filename stem of the entity's templates, e.g. `component--cpt-hero`.
    pub template_name: String,
}

impl EntityRef {
    pub fn new(
        entity_type_id: impl Into<String>,
        entity_id: impl Into<String>,
        template_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_type_id: entity_type_id.into(),
            entity_id: entity_id.into(),
            template_name: template_name.into(),
        }
    }
}

/// One unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRequest {
    pub entity: EntityRef,
    pub document: LayoutDocument,
    #[serde(default)]
    pub preview: bool,
    #[serde(default = "default_mode")]
    pub mode: StorageMode,
    /// When false the compiled output is checked but nothing is written.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_mode() -> StorageMode {
    StorageMode::Permanent
}

fn default_persist() -> bool {
    true
}

impl EntityRequest {
    pub fn new(entity: EntityRef, document: LayoutDocument) -> Self {
        Self {
            entity,
            document,
            preview: false,
            mode: default_mode(),
            persist: default_persist(),
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_mode(mut self, mode: StorageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// Storage collaborators shared by every run of a [`Pipeline`].
#[derive(Clone)]
pub struct Stores {
    pub files: Arc<dyn FileStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub manifest: Arc<dyn ManifestStore>,
}

impl Stores {
    pub fn new(
        files: Arc<dyn FileStore>,
        metadata: Arc<dyn MetadataStore>,
        manifest: Arc<dyn ManifestStore>,
    ) -> Self {
        Self {
            files,
            metadata,
            manifest,
        }
    }

    /// Real filesystem; metadata and manifest live for the process only.
    pub fn local() -> Self {
        Self::new(
            Arc::new(LocalFileStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryManifest::new()),
        )
    }

    /// Nothing touches the disk; the scratch directory is pre-created.
    pub fn in_memory(cfg: &WriterConfig) -> Self {
        Self::new(
            Arc::new(InMemoryFileStore::with_dirs([cfg.scratch_dir.clone()])),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryManifest::new()),
        )
    }
}

/// What happened to the compiled templates of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// Content layout or preview: restored twig per theme, nothing written.
    Rendered { templates: BTreeMap<String, String> },
    /// One file shared by every theme.
    Shared,
    /// One file per theme.
    PerTheme { themes: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub filename: String,
    pub error: String,
}

/// Structured result of [`Pipeline::process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub entity: EntityRef,
    pub mode: StorageMode,
    pub outcome: ReportOutcome,
    /// Number of content nodes swapped for tokens.
    pub redacted: usize,
    /// False when the request asked for a dry run.
    pub persisted: bool,
    pub written: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
    pub stale_removed: Vec<PathBuf>,
    /// Stale filenames left in place: deferred in temporary mode, or kept
    /// because a write failed.
    pub stale_pending: Vec<String>,
    pub success: bool,
}

/// Redact, compile, restore, reconcile and persist one entity at a time.
///
/// A pipeline holds no per-entity state, so one instance can serve many
/// threads at once.
pub struct Pipeline {
    config: Arc<TwigpressConfig>,
    writer_cfg: WriterConfig,
    compiler: Arc<dyn Compiler>,
    stores: Stores,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    pub fn new(
        config: TwigpressConfig,
        compiler: Arc<dyn Compiler>,
        stores: Stores,
    ) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        let writer_cfg = config.writer.to_writer_config();
        Ok(Self {
            config: Arc::new(config),
            writer_cfg,
            compiler,
            stores,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, recorder: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn config(&self) -> &TwigpressConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Runs one entity through every stage.
    ///
    /// Errors stop the run before anything is written. Failures of
    /// individual file writes do not; they are listed in the report and
    /// clear its `success` flag.
    pub fn process(&self, request: &EntityRequest) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();
        let entity = &request.entity;
        let span = tracing::span!(
            Level::INFO,
            "twigpress.process",
            entity_type_id = %entity.entity_type_id,
            entity_id = %entity.entity_id,
            template = %entity.template_name,
            mode = ?request.mode
        );
        let _guard = span.enter();

        match self.process_inner(request) {
            Ok(report) => {
                let elapsed_micros = start.elapsed().as_micros();
                info!(
                    success = report.success,
                    written = report.written.len(),
                    failures = report.failures.len(),
                    elapsed_micros,
                    "process_success"
                );
                Ok(report)
            }
            Err(err) => {
                let elapsed_micros = start.elapsed().as_micros();
                warn!(error = %err, elapsed_micros, "process_failure");
                Err(err)
            }
        }
    }

    fn process_inner(&self, request: &EntityRequest) -> Result<PipelineReport, PipelineError> {
        let name = TemplateName::new(request.entity.template_name.as_str())?;

        let redacted = self.redact(request)?;
        let settings = CompileSettings::for_document(&request.document, request.preview);
        let mut responses = self.compile(request, settings, &redacted)?;
        for response in &mut responses {
            response.template.twig = redacted.restore(&response.template.twig);
        }

        let mut report = PipelineReport {
            entity: request.entity.clone(),
            mode: request.mode,
            outcome: ReportOutcome::Shared,
            redacted: redacted.redacted_paths.len(),
            persisted: false,
            written: Vec::new(),
            failures: Vec::new(),
            stale_removed: Vec::new(),
            stale_pending: Vec::new(),
            success: true,
        };

        if settings.is_render_only() {
            report.outcome = ReportOutcome::Rendered {
                templates: render_only(&responses)?,
            };
            debug!(themes = responses.len(), "template_render_only");
            return Ok(report);
        }

        let reconciliation = self.reconcile(&name, &responses)?;
        report.outcome = match &reconciliation.outcome {
            Outcome::Shared(_) => ReportOutcome::Shared,
            Outcome::PerTheme(templates) => ReportOutcome::PerTheme {
                themes: templates.keys().cloned().collect(),
            },
        };

        if request.persist {
            self.persist(request.mode, &reconciliation, &mut report);
        }
        Ok(report)
    }

    fn redact(&self, request: &EntityRequest) -> Result<Redacted, PipelineError> {
        let mut metrics = MetricsSpan::start(self.metrics.as_ref());
        match redact(&request.document, request.preview, &self.config.redact) {
            Ok(redacted) => {
                if let Some(span) = metrics.take() {
                    span.record_redact(Ok(()));
                }
                debug!(
                    tokens = redacted.vault.len(),
                    nodes = redacted.redacted_paths.len(),
                    preview = request.preview,
                    "redact_success"
                );
                Ok(redacted)
            }
            Err(err) => {
                if let Some(span) = metrics.take() {
                    span.record_redact(Err(err.clone()));
                }
                Err(PipelineError::Redact(err))
            }
        }
    }

    fn compile(
        &self,
        request: &EntityRequest,
        settings: CompileSettings,
        redacted: &Redacted,
    ) -> Result<Vec<CompiledResponse>, PipelineError> {
        let compile_request = CompileRequest {
            entity_id: request.entity.entity_id.clone(),
            entity_type_id: request.entity.entity_type_id.clone(),
            settings,
            layout: redacted.document.clone(),
        };

        let mut metrics = MetricsSpan::start(self.metrics.as_ref());
        match self.compiler.compile(&compile_request) {
            Ok(responses) => {
                if let Some(span) = metrics.take() {
                    span.record_compile(Ok(()));
                }
                debug!(themes = responses.len(), "compile_success");
                Ok(responses)
            }
            Err(err) => {
                if let Some(span) = metrics.take() {
                    span.record_compile(Err(err.clone()));
                }
                Err(PipelineError::Compile(err))
            }
        }
    }

    fn reconcile(
        &self,
        name: &TemplateName,
        responses: &[CompiledResponse],
    ) -> Result<Reconciliation, PipelineError> {
        let mut metrics = MetricsSpan::start(self.metrics.as_ref());
        let result = Reconciler::new(&self.config.reconcile, name)
            .with_enabled_themes(self.config.themes.iter().cloned())
            .reconcile(responses);
        if let Some(span) = metrics.take() {
            span.record_reconcile(result.as_ref().map(|_| ()).map_err(|err| err.clone()));
        }
        result.map_err(PipelineError::from)
    }

    fn persist(
        &self,
        mode: StorageMode,
        reconciliation: &Reconciliation,
        report: &mut PipelineReport,
    ) {
        let metrics = MetricsSpan::start(self.metrics.as_ref());
        let writer = TemplateWriter::new(
            &self.writer_cfg,
            self.stores.files.as_ref(),
            self.stores.metadata.as_ref(),
            self.stores.manifest.as_ref(),
        );

        report.persisted = true;
        for template in reconciliation.templates() {
            let persisted = PersistedTemplate {
                filename: template.filename.clone(),
                metadata_key: template.metadata_key.clone(),
                content: template.twig.clone(),
                metadata: template.metadata.clone(),
            };
            match writer.write(mode, &persisted) {
                Ok(path) => report.written.push(path),
                Err(err) => report.failures.push(WriteFailure {
                    filename: template.filename.clone(),
                    error: err.to_string(),
                }),
            }
        }

        let stale = reconciliation.stale.iter();
        if mode == StorageMode::Permanent && report.failures.is_empty() {
            let cleanup = writer.remove_stale(stale);
            report.stale_removed = cleanup.removed;
            report.failures.extend(cleanup.failed.into_iter().map(|err| {
                WriteFailure {
                    filename: failed_filename(&err),
                    error: err.to_string(),
                }
            }));
        } else {
            report.stale_pending = stale.cloned().collect();
            if !report.stale_pending.is_empty() {
                info!(
                    stale = report.stale_pending.len(),
                    mode = ?mode,
                    "stale_cleanup_deferred"
                );
            }
        }

        report.success = report.failures.is_empty();
        if let Some(span) = metrics {
            span.record_persist(report.written.len(), report.failures.len());
        }
    }
}

/// Restored twig per theme, refusing output the compiler flagged.
fn render_only(responses: &[CompiledResponse]) -> Result<BTreeMap<String, String>, PipelineError> {
    if let Some(failed) = responses
        .iter()
        .filter(|r| r.error_message().is_some())
        .min_by(|a, b| a.theme_name.cmp(&b.theme_name))
    {
        return Err(PipelineError::Reconcile(ReconcileError::Compile {
            theme: failed.theme_name.clone(),
            message: failed.error_message().unwrap_or_default().to_string(),
        }));
    }

    let mut templates = BTreeMap::new();
    for response in responses {
        if templates
            .insert(response.theme_name.clone(), response.template.twig.clone())
            .is_some()
        {
            return Err(PipelineError::Reconcile(ReconcileError::Decode(format!(
                "duplicate response for theme {}",
                response.theme_name
            ))));
        }
    }
    Ok(templates)
}

fn failed_filename(err: &persist::PersistError) -> String {
    match err {
        persist::PersistError::Delete { path, .. } => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        persist::PersistError::InvalidFilename(name) => name.clone(),
        _ => String::new(),
    }
}
