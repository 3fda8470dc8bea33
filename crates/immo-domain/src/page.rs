//! Document pages

/// One page of document text
///
/// Page numbers start at 1. A page that failed to load keeps its slot with
/// empty text so that numbering stays aligned with the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number in the source document
    pub number: u32,

    /// Native text, OCR text, or both
    pub text: String,
}

impl Page {
    /// Create a new page
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Create a page with no text
    pub fn empty(number: u32) -> Self {
        Self::new(number, String::new())
    }

    /// True if the page carries no usable text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
