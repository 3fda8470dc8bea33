//! Command implementations.

pub mod extract;
pub mod fields;

pub use self::extract::execute_extract;
pub use self::fields::execute_fields;

use immo_extractor::DocType;
use std::path::{Path, PathBuf};

/// Template for a command: the explicit override, or the document type's
/// template inside `templates_dir`.
pub fn resolve_template_path(
    doc_type: DocType,
    template: Option<&Path>,
    templates_dir: &Path,
) -> PathBuf {
    match template {
        Some(path) => path.to_path_buf(),
        None => doc_type.template_path(templates_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_from_doc_type() {
        let path = resolve_template_path(DocType::Dta, None, Path::new("/srv/templates"));
        assert_eq!(path, Path::new("/srv/templates").join("DTA_empty.json"));
    }

    #[test]
    fn test_template_override() {
        let path = resolve_template_path(
            DocType::Dta,
            Some(Path::new("custom.json")),
            Path::new("/srv/templates"),
        );
        assert_eq!(path, Path::new("custom.json"));
    }
}
