//! Field specifications derived from extraction templates

use std::fmt;

/// Description of one template leaf to extract
///
/// `path` is a dot-separated route from the template root to the leaf and
/// uniquely identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Dot-separated path (e.g. "immeuble.adresse")
    pub path: String,

    /// Human readable label shown to the LLM
    pub label: String,

    /// Expected type marker copied from the template (e.g. "string", "list")
    pub expected_type: String,
}

impl FieldSpec {
    /// Create a new field spec
    pub fn new(
        path: impl Into<String>,
        label: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            expected_type: expected_type.into(),
        }
    }

    /// Create a field spec whose label is its path
    pub fn from_path(path: impl Into<String>, expected_type: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            label: path.clone(),
            path,
            expected_type: expected_type.into(),
        }
    }

    /// Path segments from root to leaf
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.path, self.label, self.expected_type)
    }
}
