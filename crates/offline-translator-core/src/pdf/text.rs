use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ocr::OcrEngine;
use crate::util::has_visible_text;
use super::document::{DocumentReader, MupdfReader, PageTextSource};
use super::render::{MupdfRasterizer, Rasterizer};

/// Share of the overall job progress covered by extraction (0..=50).
pub const EXTRACTION_PROGRESS_SPAN: f32 = 50.0;

/// Where a page's text came from.
///
/// A page contributes exactly one of these; there is no variant carrying
/// both native and OCR text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageText {
    /// Text embedded in the PDF
    Native(String),
    /// No embedded text; recognized from a rasterized page (may be empty)
    Ocr(String),
    /// No embedded text and OCR did not succeed
    Failed(String),
}

impl PageText {
    /// The usable text, or `None` for a failed page.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Native(text) | Self::Ocr(text) => Some(text),
            Self::Failed(_) => None,
        }
    }

    pub const fn is_ocr(&self) -> bool {
        matches!(self, Self::Ocr(_))
    }
}

/// Walks a PDF page by page, falling back to OCR for pages without
/// embedded text.
#[derive(Clone)]
pub struct TextExtractor {
    reader: Arc<dyn DocumentReader>,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
    /// Resolution for OCR renders, higher than the preview tier
    pub ocr_dpi: u32,
}

impl TextExtractor {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
        ocr_dpi: u32,
    ) -> Self {
        Self {
            reader,
            rasterizer,
            ocr,
            ocr_dpi,
        }
    }

    /// Extractor using MuPDF for reading and rasterizing.
    pub fn with_mupdf(ocr: Arc<dyn OcrEngine>, ocr_dpi: u32) -> Self {
        Self::new(Arc::new(MupdfReader), Arc::new(MupdfRasterizer), ocr, ocr_dpi)
    }

    /// Extract per-page results in page order.
    ///
    /// Stops at the first [`PageText::Failed`] page, which is the last entry
    /// of the returned vector. `on_progress` receives `k / N * 50` after each
    /// successfully processed page `k`.
    pub fn extract_pages<F>(&self, path: &Path, mut on_progress: F) -> Result<Vec<PageText>>
    where
        F: FnMut(f32),
    {
        let source = self.reader.open(path)?;
        let total = source.page_count();
        let mut pages = Vec::with_capacity(total);

        for page in 1..=total {
            let result = self.extract_page(source.as_ref(), path, page)?;
            let failed = matches!(result, PageText::Failed(_));
            pages.push(result);

            if failed {
                break;
            }

            #[allow(clippy::cast_precision_loss)]
            on_progress(page as f32 / total as f32 * EXTRACTION_PROGRESS_SPAN);
        }

        let ocr_pages = pages.iter().filter(|p| p.is_ocr()).count();
        info!(
            "Extracted {} of {} pages from {} ({} via OCR)",
            pages.len(),
            total,
            path.display(),
            ocr_pages
        );

        Ok(pages)
    }

    /// Extract the whole document as one string, one `\n` after each page.
    pub fn extract<F>(&self, path: &Path, on_progress: F) -> Result<String>
    where
        F: FnMut(f32),
    {
        let pages = self.extract_pages(path, on_progress)?;
        join_pages(&pages)
    }

    fn extract_page(
        &self,
        source: &dyn PageTextSource,
        path: &Path,
        page: usize,
    ) -> Result<PageText> {
        let native = source.page_text(page)?;
        if has_visible_text(&native) {
            debug!("Page {}: {} chars of native text", page, native.len());
            return Ok(PageText::Native(native));
        }

        debug!("Page {}: no native text, running OCR at {} dpi", page, self.ocr_dpi);

        let recognized = self
            .rasterizer
            .render(path, source.cache_id(), page, self.ocr_dpi)
            .and_then(|image| self.ocr.recognize(&image));

        Ok(match recognized {
            Ok(text) => PageText::Ocr(text),
            Err(e) => {
                warn!("OCR failed on page {}: {}", page, e);
                PageText::Failed(e.to_string())
            }
        })
    }
}

/// Concatenate page results, enforcing the all-or-nothing contract.
pub fn join_pages(pages: &[PageText]) -> Result<String> {
    let mut text = String::new();

    for (i, page) in pages.iter().enumerate() {
        match page {
            PageText::Native(fragment) | PageText::Ocr(fragment) => {
                text.push_str(fragment);
                text.push('\n');
            }
            PageText::Failed(cause) => {
                return Err(Error::OcrFailure {
                    page: i + 1,
                    cause: cause.clone(),
                });
            }
        }
    }

    if !has_visible_text(&text) {
        return Err(Error::EmptyDocumentText);
    }

    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_join_native_pages() {
        let pages = vec![
            PageText::Native("Hello.".to_string()),
            PageText::Native("World.".to_string()),
        ];
        assert_eq!(join_pages(&pages).unwrap(), "Hello.\nWorld.\n");
    }

    #[test]
    fn test_join_keeps_empty_ocr_pages_as_separators() {
        let pages = vec![
            PageText::Ocr(String::new()),
            PageText::Native("Body".to_string()),
        ];
        assert_eq!(join_pages(&pages).unwrap(), "\nBody\n");
    }

    #[test]
    fn test_join_failed_page_reports_position() {
        let pages = vec![
            PageText::Native("ok".to_string()),
            PageText::Failed("engine crashed".to_string()),
        ];
        let err = join_pages(&pages).unwrap_err();
        assert!(matches!(
            err,
            Error::OcrFailure { page: 2, ref cause } if cause == "engine crashed"
        ));
    }

    #[test]
    fn test_join_whitespace_only_is_empty_document() {
        let pages = vec![PageText::Ocr("  \n ".to_string())];
        assert!(matches!(join_pages(&pages), Err(Error::EmptyDocumentText)));
        assert!(matches!(join_pages(&[]), Err(Error::EmptyDocumentText)));
    }

    #[test]
    fn test_page_text_accessors() {
        assert_eq!(PageText::Ocr("x".to_string()).text(), Some("x"));
        assert_eq!(PageText::Failed("e".to_string()).text(), None);
        assert!(PageText::Ocr(String::new()).is_ocr());
        assert!(!PageText::Native("n".to_string()).is_ocr());
    }
}
