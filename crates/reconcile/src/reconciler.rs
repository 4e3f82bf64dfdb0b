use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::naming::TemplateName;
use crate::response::{CompiledResponse, CompiledTemplate};

/// A template ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// Theme the file belongs to; `None` for the shared file.
    pub theme: Option<String>,
    pub filename: String,
    /// Key under which the metadata is stored (filename without extension).
    pub metadata_key: String,
    pub twig: String,
    pub metadata: Option<Map<String, Value>>,
}

/// File layout decided for one set of compiler responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every theme compiled to the same output.
    Shared(RenderedTemplate),
    /// Themes diverged; one entry per theme identifier, sorted.
    PerTheme(BTreeMap<String, RenderedTemplate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: Outcome,
    /// Filenames from a previous layout that no longer apply.
    pub stale: BTreeSet<String>,
}

impl Reconciliation {
    pub fn is_shared(&self) -> bool {
        matches!(self.outcome, Outcome::Shared(_))
    }

    /// Templates to write, in theme order.
    pub fn templates(&self) -> Vec<&RenderedTemplate> {
        match &self.outcome {
            Outcome::Shared(template) => vec![template],
            Outcome::PerTheme(templates) => templates.values().collect(),
        }
    }
}

/// Decides between one shared template file and per-theme files.
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    cfg: &'a ReconcileConfig,
    name: &'a TemplateName,
    enabled_themes: BTreeSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(cfg: &'a ReconcileConfig, name: &'a TemplateName) -> Self {
        Self {
            cfg,
            name,
            enabled_themes: BTreeSet::new(),
        }
    }

    /// Themes whose suffixed files must be cleaned up when outputs converge,
    /// in addition to the themes present in the response.
    pub fn with_enabled_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_themes
            .extend(themes.into_iter().map(Into::into));
        self
    }

    pub fn reconcile(
        &self,
        responses: &[CompiledResponse],
    ) -> Result<Reconciliation, ReconcileError> {
        self.cfg.validate()?;

        if let Some(failed) = responses
            .iter()
            .filter(|r| r.error_message().is_some())
            .min_by(|a, b| a.theme_name.cmp(&b.theme_name))
        {
            return Err(ReconcileError::Compile {
                theme: failed.theme_name.clone(),
                message: failed.error_message().unwrap_or_default().to_string(),
            });
        }

        let mut by_theme: BTreeMap<&str, &CompiledTemplate> = BTreeMap::new();
        for response in responses {
            if by_theme
                .insert(response.theme_name.as_str(), &response.template)
                .is_some()
            {
                return Err(ReconcileError::Decode(format!(
                    "duplicate response for theme {}",
                    response.theme_name
                )));
            }
        }

        let mut templates = by_theme.values();
        let Some(first) = templates.next() else {
            return Err(ReconcileError::NoTemplates);
        };
        let converged = templates.all(|t| t == first);

        if converged {
            let stale: BTreeSet<String> = self
                .enabled_themes
                .iter()
                .map(String::as_str)
                .chain(by_theme.keys().copied())
                .filter(|theme| *theme != self.cfg.generic_theme)
                .map(|theme| self.name.filename(Some(theme), &self.cfg.template_extension))
                .collect();
            debug!(
                template = %self.name.as_str(),
                themes = by_theme.len(),
                stale = stale.len(),
                "reconcile_shared"
            );
            return Ok(Reconciliation {
                outcome: Outcome::Shared(self.render(None, first)),
                stale,
            });
        }

        let mut per_theme = BTreeMap::new();
        let mut generic_present = false;
        for (theme, template) in &by_theme {
            let suffix = if *theme == self.cfg.generic_theme {
                generic_present = true;
                None
            } else {
                Some(*theme)
            };
            per_theme.insert(theme.to_string(), self.render(suffix, template));
        }

        // A generic entry rewrites the shared file in place.
        let mut stale = BTreeSet::new();
        if !generic_present {
            stale.insert(self.name.filename(None, &self.cfg.template_extension));
        }
        debug!(
            template = %self.name.as_str(),
            themes = per_theme.len(),
            generic_present,
            "reconcile_per_theme"
        );
        Ok(Reconciliation {
            outcome: Outcome::PerTheme(per_theme),
            stale,
        })
    }

    fn render(&self, theme: Option<&str>, template: &CompiledTemplate) -> RenderedTemplate {
        RenderedTemplate {
            theme: theme.map(str::to_string),
            filename: self.name.filename(theme, &self.cfg.template_extension),
            metadata_key: self.name.stem(theme),
            twig: template.twig.clone(),
            metadata: template.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name() -> TemplateName {
        TemplateName::new("view--front").expect("name")
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_outputs_collapse_to_shared() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![
            CompiledResponse::new("c", "x"),
            CompiledResponse::new("a", "x"),
            CompiledResponse::new("b", "x"),
        ];
        let result = Reconciler::new(&cfg, &name).reconcile(&responses).expect("reconcile");

        let Outcome::Shared(template) = &result.outcome else {
            panic!("expected shared outcome");
        };
        assert_eq!(template.twig, "x");
        assert_eq!(template.filename, "view--front.html.twig");
        assert_eq!(template.metadata_key, "view--front");
        assert_eq!(
            result.stale,
            set(&[
                "view--front--a.html.twig",
                "view--front--b.html.twig",
                "view--front--c.html.twig"
            ])
        );
    }

    #[test]
    fn diverging_outputs_stay_per_theme() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![CompiledResponse::new("b", "y"), CompiledResponse::new("a", "x")];
        let result = Reconciler::new(&cfg, &name).reconcile(&responses).expect("reconcile");

        let Outcome::PerTheme(map) = &result.outcome else {
            panic!("expected per-theme outcome");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["a"].twig, "x");
        assert_eq!(map["b"].filename, "view--front--b.html.twig");
        assert_eq!(result.stale, set(&["view--front.html.twig"]));
    }

    #[test]
    fn generic_theme_writes_the_shared_file() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![
            CompiledResponse::new("coh-generic-theme", "generic"),
            CompiledResponse::new("olivero", "custom"),
        ];
        let result = Reconciler::new(&cfg, &name).reconcile(&responses).expect("reconcile");

        let Outcome::PerTheme(map) = &result.outcome else {
            panic!("expected per-theme outcome");
        };
        let generic = &map["coh-generic-theme"];
        assert_eq!(generic.theme, None);
        assert_eq!(generic.filename, "view--front.html.twig");
        assert_eq!(map["olivero"].filename, "view--front--olivero.html.twig");
        assert!(result.stale.is_empty());
    }

    #[test]
    fn shared_cleanup_covers_enabled_themes_but_not_generic() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![
            CompiledResponse::new("coh-generic-theme", "x"),
            CompiledResponse::new("olivero", "x"),
        ];
        let result = Reconciler::new(&cfg, &name)
            .with_enabled_themes(["claro", "olivero"])
            .reconcile(&responses)
            .expect("reconcile");
        assert!(result.is_shared());
        assert_eq!(
            result.stale,
            set(&["view--front--claro.html.twig", "view--front--olivero.html.twig"])
        );
    }

    #[test]
    fn metadata_differences_count_as_divergence() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let meta = |v: &str| json!({ "filename": v }).as_object().cloned().expect("object");
        let responses = vec![
            CompiledResponse::new("a", "x").with_metadata(meta("one")),
            CompiledResponse::new("b", "x").with_metadata(meta("two")),
        ];
        let result = Reconciler::new(&cfg, &name).reconcile(&responses).expect("reconcile");
        assert!(!result.is_shared());
    }

    #[test]
    fn any_error_short_circuits() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![CompiledResponse::new("a", "x"), CompiledResponse::failed("b", "boom")];
        let err = Reconciler::new(&cfg, &name)
            .reconcile(&responses)
            .expect_err("must fail");
        assert_eq!(
            err,
            ReconcileError::Compile {
                theme: "b".into(),
                message: "boom".into()
            }
        );
    }

    #[test]
    fn error_choice_is_order_independent() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let forward = vec![CompiledResponse::failed("b", "second"), CompiledResponse::failed("a", "first")];
        let mut backward = forward.clone();
        backward.reverse();
        let r = Reconciler::new(&cfg, &name);
        assert_eq!(r.reconcile(&forward), r.reconcile(&backward));
    }

    #[test]
    fn empty_response_set_is_rejected() {
        let cfg = ReconcileConfig::default();
        let name = name();
        assert_eq!(
            Reconciler::new(&cfg, &name).reconcile(&[]),
            Err(ReconcileError::NoTemplates)
        );
    }

    #[test]
    fn input_order_does_not_change_the_decision() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let mut responses = vec![
            CompiledResponse::new("a", "x"),
            CompiledResponse::new("b", "y"),
            CompiledResponse::new("c", "x"),
        ];
        let reconciler = Reconciler::new(&cfg, &name);
        let first = reconciler.reconcile(&responses).expect("first");
        responses.reverse();
        let second = reconciler.reconcile(&responses).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_theme_records_are_rejected() {
        let cfg = ReconcileConfig::default();
        let name = name();
        let responses = vec![
            CompiledResponse::new("a", "x"),
            CompiledResponse::new("b", "x"),
            CompiledResponse::new("a", "y"),
        ];
        assert!(matches!(
            Reconciler::new(&cfg, &name).reconcile(&responses),
            Err(ReconcileError::Decode(msg)) if msg.contains("theme a")
        ));
    }
}
