use std::sync::Arc;
use std::time::{Duration, Instant};

use reconcile::ReconcileError;
use redact::RedactError;

use crate::compiler::CompileError;

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_redact(&self, latency: Duration, result: Result<(), RedactError>);
    fn record_compile(&self, latency: Duration, result: Result<(), CompileError>);
    fn record_reconcile(&self, latency: Duration, result: Result<(), ReconcileError>);
    /// Called once per entity after the write phase, with per-file counts.
    fn record_persist(&self, latency: Duration, written: usize, failed: usize);
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(recorder: Option<&Arc<dyn PipelineMetrics>>) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: Arc::clone(recorder),
            start: Instant::now(),
        })
    }

    pub(crate) fn record_redact(self, result: Result<(), RedactError>) {
        self.recorder.record_redact(self.start.elapsed(), result);
    }

    pub(crate) fn record_compile(self, result: Result<(), CompileError>) {
        self.recorder.record_compile(self.start.elapsed(), result);
    }

    pub(crate) fn record_reconcile(self, result: Result<(), ReconcileError>) {
        self.recorder.record_reconcile(self.start.elapsed(), result);
    }

    pub(crate) fn record_persist(self, written: usize, failed: usize) {
        self.recorder
            .record_persist(self.start.elapsed(), written, failed);
    }
}
