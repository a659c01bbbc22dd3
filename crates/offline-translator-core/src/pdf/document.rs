use std::path::{Path, PathBuf};
use std::sync::Arc;

use mupdf::{Document as MuDocument, TextPageOptions};

use crate::error::{Error, Result};
use super::page_index::PageIndex;

/// Per-page native text access for one opened document.
pub trait PageTextSource {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Content identity, stable for identical bytes
    fn cache_id(&self) -> &str;

    /// Embedded text of a 1-based page; empty when the page has none
    fn page_text(&self, page: usize) -> Result<String>;
}

/// Opens documents for reading ("path -> page count, page N text").
pub trait DocumentReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PageTextSource>>;

    /// Re-read a document only to learn how many pages it has.
    fn page_count(&self, path: &Path) -> Result<usize> {
        Ok(self.open(path)?.page_count())
    }
}

/// A PDF loaded into memory.
///
/// MuPDF handles are not `Send`, so only the bytes are kept and a fresh
/// handle is opened for each operation.
pub struct PdfDocument {
    path: PathBuf,
    bytes: Arc<Vec<u8>>,
    page_count: usize,
    /// MD5 hex of the bytes
    cache_id: String,
}

impl PdfDocument {
    /// Open a PDF from bytes, reporting errors against `path`
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let path = path.into();
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "").map_err(|e| Error::UnreadableDocument {
            path: path.clone(),
            reason: format!("failed to parse PDF: {e}"),
        })?;

        let page_count = doc.page_count().map_err(|e| Error::UnreadableDocument {
            path: path.clone(),
            reason: format!("failed to get page count: {e}"),
        })?;

        let cache_id = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            path,
            bytes: Arc::new(bytes),
            page_count: usize::try_from(page_count).unwrap_or(0),
            cache_id,
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::UnreadableDocument {
            path: path.to_path_buf(),
            reason: format!("failed to read file: {e}"),
        })?;
        Self::from_bytes(path, bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// MD5 of the document bytes, computed once on load.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "").map_err(|e| Error::UnreadableDocument {
            path: self.path.clone(),
            reason: format!("failed to open document: {e}"),
        })
    }

    /// Plain text of a 1-based page, one line per MuPDF text line.
    pub fn page_text(&self, page: usize) -> Result<String> {
        let page_index = PageIndex::try_from_page_number(page, self.page_count)?;

        let doc = self.open_document()?;
        let mu_page = doc
            .load_page(page_index.into())
            .map_err(|e| self.unreadable(format!("failed to load page {page}: {e}")))?;

        let text_page = mu_page
            .to_text_page(TextPageOptions::empty())
            .map_err(|e| self.unreadable(format!("failed to read text of page {page}: {e}")))?;

        let mut text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                text.extend(line.chars().filter_map(|c| c.char()));
                text.push('\n');
            }
        }

        Ok(text)
    }

    fn unreadable(&self, reason: String) -> Error {
        Error::UnreadableDocument {
            path: self.path.clone(),
            reason,
        }
    }
}

impl PageTextSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn page_text(&self, page: usize) -> Result<String> {
        Self::page_text(self, page)
    }
}

impl Clone for PdfDocument {
    /// O(1): only the `Arc` around the bytes is cloned.
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            bytes: Arc::clone(&self.bytes),
            page_count: self.page_count,
            cache_id: self.cache_id.clone(),
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("path", &self.path)
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// [`DocumentReader`] backed by MuPDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfReader;

impl DocumentReader for MupdfReader {
    fn open(&self, path: &Path) -> Result<Box<dyn PageTextSource>> {
        Ok(Box::new(PdfDocument::from_file(path)?))
    }
}
