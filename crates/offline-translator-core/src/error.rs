use std::path::PathBuf;

use thiserror::Error;

use crate::config::Lang;

/// Unified error type for offline-translator-core
///
/// This enum covers every failure the pipeline can report:
/// - Document access (reading, page bounds, rasterizing)
/// - Text extraction (OCR, empty documents)
/// - Translation (missing language routes, engine failures)
/// - Output (writing the translated PDF)
/// - Session bookkeeping and configuration
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// The file could not be read or parsed as a PDF
    #[error("unreadable document {}: {reason}", path.display())]
    UnreadableDocument { path: PathBuf, reason: String },

    /// Requested page is outside `1..=total`
    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The rasterizer failed on an otherwise readable page
    #[error("failed to render page {page}: {reason}")]
    RenderFailure { page: usize, reason: String },

    /// The file on disk no longer matches the document that was opened
    #[error("{} changed since it was opened", path.display())]
    DocumentChanged { path: PathBuf },

    // ==========================================================================
    // Extraction Errors
    // ==========================================================================
    /// A page had no native text and OCR could not recover any
    #[error("OCR failed on page {page}: {cause}")]
    OcrFailure { page: usize, cause: String },

    /// The OCR engine itself failed (missing binary, bad exit status)
    #[error("OCR engine error: {0}")]
    OcrEngine(String),

    /// Every page was processed but no usable text came out
    #[error("no text could be extracted from the PDF")]
    EmptyDocumentText,

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// No installed route for the requested language pair
    #[error(
        "translation packages for {source_lang} -> {target_lang} are not installed; install the language pair and try again"
    )]
    NotInstalled { source_lang: Lang, target_lang: Lang },

    /// The translation engine returned an error
    #[error("translation failed: {0}")]
    TranslationFailure(String),

    /// Listing installed routes from the engine failed
    #[error("failed to list installed translation routes: {0}")]
    RouteDiscovery(String),

    /// Nothing to translate
    #[error("no text found to translate")]
    EmptyInput,

    // ==========================================================================
    // Output Errors
    // ==========================================================================
    /// The translated PDF could not be laid out or saved
    #[error("failed to write translated PDF: {0}")]
    WriteFailure(String),

    /// The configured output font could not be used
    #[error("unusable font {}: {reason}", path.display())]
    InvalidFont { path: PathBuf, reason: String },

    // ==========================================================================
    // Session Errors
    // ==========================================================================
    /// A job was requested before any input PDF was selected
    #[error("no input PDF selected")]
    NoInputSelected,

    /// A job is already running in this session
    #[error("a translation job is already running")]
    JobAlreadyRunning,

    /// Saving was requested but no job has produced output yet
    #[error("no translated PDF is available yet")]
    NoTranslatedOutput,

    /// The background worker panicked or was aborted
    #[error("background worker stopped unexpectedly: {0}")]
    WorkerPanicked(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the user can fix this by installing a language pair.
    pub const fn is_missing_route(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
