use crate::error::ReconcileError;

/// Separator between the entity name and a theme name.
pub const THEME_SEPARATOR: &str = "--";

/// Entity-derived base name of a template file.
///
/// `<name><ext>` is the shared template, `<name>--<theme><ext>` a
/// theme-specific one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateName(String);

impl TemplateName {
    pub fn new(base: impl Into<String>) -> Result<Self, ReconcileError> {
        let base = base.into();
        if base.trim().is_empty() || base.contains(['/', '\\', '\0']) || base == "." || base == ".."
        {
            return Err(ReconcileError::InvalidName(base));
        }
        Ok(Self(base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename without extension; also the metadata key.
    pub fn stem(&self, theme: Option<&str>) -> String {
        match theme {
            Some(theme) => format!("{}{THEME_SEPARATOR}{theme}", self.0),
            None => self.0.clone(),
        }
    }

    pub fn filename(&self, theme: Option<&str>, extension: &str) -> String {
        format!("{}{extension}", self.stem(theme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_and_theme_filenames() {
        let name = TemplateName::new("component--cpt-hero").expect("name");
        assert_eq!(name.filename(None, ".html.twig"), "component--cpt-hero.html.twig");
        assert_eq!(
            name.filename(Some("olivero"), ".html.twig"),
            "component--cpt-hero--olivero.html.twig"
        );
        assert_eq!(name.stem(Some("olivero")), "component--cpt-hero--olivero");
    }

    #[test]
    fn rejects_path_like_names() {
        for bad in ["", "  ", "a/b", "..", "a\\b"] {
            assert!(TemplateName::new(bad).is_err(), "{bad:?} accepted");
        }
    }
}
