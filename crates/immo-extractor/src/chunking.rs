//! Page chunking and flattening for prompts

use immo_domain::Page;

/// Splits a page sequence into contiguous groups and renders them as text
pub struct PageChunker {
    pages_per_chunk: usize,
    max_chars: usize,
}

impl PageChunker {
    /// Create a new page chunker
    ///
    /// A `pages_per_chunk` of 0 is treated as 1.
    pub fn new(pages_per_chunk: usize, max_chars: usize) -> Self {
        Self {
            pages_per_chunk: pages_per_chunk.max(1),
            max_chars,
        }
    }

    /// Contiguous groups of pages; the last one may be smaller
    pub fn chunk<'a>(&self, pages: &'a [Page]) -> Vec<&'a [Page]> {
        pages.chunks(self.pages_per_chunk).collect()
    }

    /// Paginated text of `pages`, within the character budget
    pub fn flatten(&self, pages: &[Page]) -> String {
        flatten_pages(pages, self.max_chars)
    }
}

/// Render pages as `[page N]` sections
///
/// Pages are added in order until the next one would push the total past
/// `max_chars` characters; everything from that page on is dropped.
pub fn flatten_pages(pages: &[Page], max_chars: usize) -> String {
    let mut snippets = Vec::new();
    let mut total = 0;

    for page in pages {
        let snippet = format!("[page {}]\n{}\n", page.number, page.text.trim());
        total += snippet.chars().count();
        if total > max_chars {
            break;
        }
        snippets.push(snippet);
    }

    snippets.join("\n")
}
