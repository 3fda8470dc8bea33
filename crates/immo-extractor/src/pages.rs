//! Page loading with OCR fallback
//!
//! PDFs are read page by page: native text comes from the PDF content
//! streams, and pages with too little of it are rendered and sent to OCR.
//! Any other file is treated as a single image.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use immo_domain::traits::OcrProvider;
use immo_domain::Page;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Rendering resolution for OCR, in dots per inch
const RENDER_DPI: u32 = 200;

/// Programs able to rasterize one PDF page, tried in order
const RENDERERS: &[&str] = &["pdftoppm", "pdftocairo"];

/// A paginated document
pub trait PageSource {
    /// Total number of pages
    fn page_count(&self) -> usize;

    /// Native text of a 1-based page
    fn native_text(&self, number: u32) -> Result<String, ExtractorError>;

    /// PNG rendering of a 1-based page
    fn render_png(&self, number: u32) -> Result<Vec<u8>, ExtractorError>;
}

/// Options for [`load_pages`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Maximum pages to load, 0 for all
    pub max_pages: usize,

    /// OCR every page regardless of native text
    pub ocr_all: bool,

    /// Pages with fewer native characters are OCRed
    pub native_text_threshold: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&ExtractorConfig::default())
    }
}

impl From<&ExtractorConfig> for LoadOptions {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            ocr_all: config.ocr_all,
            native_text_threshold: config.native_text_threshold,
        }
    }
}

/// PDF file backed by `lopdf`, rendered with poppler tools
pub struct PdfDocument {
    path: PathBuf,
    document: lopdf::Document,
}

impl PdfDocument {
    /// Open a PDF file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let path = path.as_ref();
        let document = lopdf::Document::load(path).map_err(|e| {
            ExtractorError::Document(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    fn native_text(&self, number: u32) -> Result<String, ExtractorError> {
        self.document
            .extract_text(&[number])
            .map_err(|e| ExtractorError::Document(format!("page {}: {}", number, e)))
    }

    fn render_png(&self, number: u32) -> Result<Vec<u8>, ExtractorError> {
        let workdir = TempDir::new()?;
        let prefix = workdir.path().join("page");
        let page = number.to_string();
        let dpi = RENDER_DPI.to_string();

        let mut last_error = String::from("no renderer available");
        for program in RENDERERS {
            let output = Command::new(program)
                .args(["-f", page.as_str(), "-l", page.as_str(), "-r", dpi.as_str()])
                .args(["-png", "-singlefile"])
                .arg(&self.path)
                .arg(&prefix)
                .output();

            match output {
                Ok(output) if output.status.success() => {
                    return Ok(fs::read(prefix.with_extension("png"))?);
                }
                Ok(output) => {
                    last_error = format!(
                        "{} failed: {}",
                        program,
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                Err(e) => last_error = format!("{}: {}", program, e),
            }
        }

        Err(ExtractorError::Document(format!(
            "cannot render page {}: {}",
            number, last_error
        )))
    }
}

/// Load the pages of `path`
///
/// `.pdf` files (any case) go through [`PdfDocument`]; every other file is a
/// single page transcribed by `ocr`. Only a PDF that cannot be opened is an
/// error: failures on individual pages leave that page with whatever text
/// was recovered.
pub fn load_pages<O>(
    path: &Path,
    options: &LoadOptions,
    ocr: &O,
) -> Result<Vec<Page>, ExtractorError>
where
    O: OcrProvider,
    O::Error: Display,
{
    if is_pdf(path) {
        let document = PdfDocument::open(path)?;
        load_from_source(&document, options, ocr)
    } else {
        Ok(vec![load_image(path, ocr)])
    }
}

/// Load pages from any [`PageSource`]
pub fn load_from_source<S, O>(
    source: &S,
    options: &LoadOptions,
    ocr: &O,
) -> Result<Vec<Page>, ExtractorError>
where
    S: PageSource + ?Sized,
    O: OcrProvider,
    O::Error: Display,
{
    let total = source.page_count();
    let limit = match options.max_pages {
        0 => total,
        max => total.min(max),
    };
    info!("Loading {} of {} pages", limit, total);

    let mut pages = Vec::with_capacity(limit);
    let mut ocr_pages = 0;

    for number in (1..=limit).map(|n| n as u32) {
        let native = match source.native_text(number) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Native text of page {} unavailable: {}", number, e);
                String::new()
            }
        };

        let mut text = native.clone();
        if options.ocr_all || native.chars().count() < options.native_text_threshold {
            ocr_pages += 1;
            match source.render_png(number) {
                Ok(image) => match ocr.transcribe(&image) {
                    Ok(ocr_text) => text = combine_text(&native, &ocr_text),
                    Err(e) => warn!("OCR of page {} failed: {}", number, e),
                },
                Err(e) => warn!("Rendering of page {} failed: {}", number, e),
            }
        }

        debug!(page = number, chars = text.len(), "Page loaded");
        pages.push(Page::new(number, text));
    }

    info!("Loaded {} pages ({} sent to OCR)", pages.len(), ocr_pages);
    Ok(pages)
}

fn load_image<O>(path: &Path, ocr: &O) -> Page
where
    O: OcrProvider,
    O::Error: Display,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            return Page::empty(1);
        }
    };

    match ocr.transcribe(&bytes) {
        Ok(text) => Page::new(1, text),
        Err(e) => {
            warn!("OCR of {} failed: {}", path.display(), e);
            Page::empty(1)
        }
    }
}

/// Native text augmented with OCR text it does not already contain
///
/// The containment check uses the OCR text as returned.
fn combine_text(native: &str, ocr_text: &str) -> String {
    if ocr_text.is_empty() || native.contains(ocr_text) {
        native.to_string()
    } else if native.is_empty() {
        ocr_text.to_string()
    } else {
        format!("{}\n{}", native, ocr_text).trim().to_string()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
