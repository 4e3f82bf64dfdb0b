//! Batch rebuilds.
//!
//! A rebuild pushes many entities through the same [`Pipeline`]. Each one
//! gets exactly one [`BatchOutcome`]; a failing entity never stops the rest.
//! Callers normally build the requests with [`StorageMode::Temporary`] so
//! nothing goes live until the whole batch has been promoted.
//!
//! [`StorageMode::Temporary`]: persist::StorageMode::Temporary

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::{EntityRef, EntityRequest, Pipeline, PipelineReport, ReportOutcome};

/// Result of one entity in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub entity: EntityRef,
    pub success: bool,
    pub message: String,
}

/// Processes every request, in parallel when the pipeline's batch config
/// asks for it and the `parallel` feature is on. Outcomes keep request order.
pub fn run_batch(pipeline: &Pipeline, requests: &[EntityRequest]) -> Vec<BatchOutcome> {
    let outcomes = if pipeline.config().batch.parallel {
        run_parallel(pipeline, requests)
    } else {
        requests.iter().map(|r| outcome(pipeline, r)).collect()
    };

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed == 0 {
        info!(entities = outcomes.len(), "batch_success");
    } else {
        warn!(entities = outcomes.len(), failed, "batch_partial_failure");
    }
    outcomes
}

#[cfg(feature = "parallel")]
fn run_parallel(pipeline: &Pipeline, requests: &[EntityRequest]) -> Vec<BatchOutcome> {
    use rayon::prelude::*;

    requests
        .par_iter()
        .map(|request| outcome(pipeline, request))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_parallel(pipeline: &Pipeline, requests: &[EntityRequest]) -> Vec<BatchOutcome> {
    requests.iter().map(|r| outcome(pipeline, r)).collect()
}

fn outcome(pipeline: &Pipeline, request: &EntityRequest) -> BatchOutcome {
    match pipeline.process(request) {
        Ok(report) => BatchOutcome {
            entity: request.entity.clone(),
            success: report.success,
            message: summarize(&report),
        },
        Err(err) => BatchOutcome {
            entity: request.entity.clone(),
            success: false,
            message: err.to_string(),
        },
    }
}

fn summarize(report: &PipelineReport) -> String {
    if let ReportOutcome::Rendered { templates } = &report.outcome {
        return format!("rendered {} theme(s)", templates.len());
    }
    if !report.persisted {
        return "compiled, nothing written".into();
    }
    if report.success {
        return format!("saved {} template(s)", report.written.len());
    }
    let failed: Vec<&str> = report
        .failures
        .iter()
        .map(|f| f.filename.as_str())
        .collect();
    format!(
        "saved {} template(s), {} failed: {}",
        report.written.len(),
        report.failures.len(),
        failed.join(", ")
    )
}
