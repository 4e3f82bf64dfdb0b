//! Theme output reconciliation.
//!
//! The compiler returns one template per theme. When every theme produced
//! the same output there is no reason to keep a file per theme: one shared
//! file is written and the theme-suffixed leftovers are scheduled for
//! deletion. When themes diverge, each keeps its own file and the shared one
//! is scheduled for deletion instead, unless the generic-theme entry takes it
//! over.
//!
//! Every decision is made over sorted theme identifiers, so the same
//! response set always yields the same [`Reconciliation`].
//!
//! ```rust
//! use reconcile::{CompiledResponse, Reconciler, ReconcileConfig, TemplateName};
//!
//! let cfg = ReconcileConfig::default();
//! let name = TemplateName::new("component--cpt-hero").unwrap();
//! let responses = vec![
//!     CompiledResponse::new("olivero", "<div>hero</div>"),
//!     CompiledResponse::new("claro", "<div>hero</div>"),
//! ];
//!
//! let result = Reconciler::new(&cfg, &name).reconcile(&responses).unwrap();
//! assert!(result.is_shared());
//! assert!(result.stale.contains("component--cpt-hero--claro.html.twig"));
//! ```

mod config;
mod error;
mod naming;
mod reconciler;
mod response;

pub use crate::config::{
    ConfigError, ReconcileConfig, DEFAULT_GENERIC_THEME, DEFAULT_TEMPLATE_EXTENSION,
};
pub use crate::error::ReconcileError;
pub use crate::naming::{TemplateName, THEME_SEPARATOR};
pub use crate::reconciler::{Outcome, Reconciler, Reconciliation, RenderedTemplate};
pub use crate::response::{decode_responses, CompiledResponse, CompiledTemplate};
