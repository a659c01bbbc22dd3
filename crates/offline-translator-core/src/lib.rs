//! Offline PDF Translator Core Library
//!
//! This library provides the core functionality for translating PDF documents
//! without network access:
//! - PDF text extraction with OCR fallback for image-only pages
//! - Translation through locally installed language packages
//! - Writing the translation as a new paginated PDF
//! - Background translation jobs and paged previews for an interactive session

pub mod config;
pub mod error;
pub mod job;
pub mod ocr;
pub mod pdf;
pub mod preview;
pub mod session;
pub mod translator;
pub mod util;

pub use config::{
    AppConfig, Lang, LanguageOption, LanguagePair, LayoutConfig, OcrConfig, TranslatorConfig,
    language_label, supported_languages, DEFAULT_OUTPUT_FILE, DEFAULT_SOURCE_LANG,
    DEFAULT_TARGET_LANG,
};
pub use error::{Error, Result};
pub use job::{
    JobEvent, JobFailure, JobId, JobMessage, JobRequest, JobStage, JobState, TranslationPipeline,
};
pub use ocr::{OcrEngine, TesseractOcr};
pub use pdf::{
    DocumentReader, EmbeddedFont, LopdfWriter, MupdfRasterizer, MupdfReader, PageRenderer,
    PageText, PdfDocument, PdfWriter, Rasterizer, TextExtractor,
};
pub use preview::{PagedPreviewCache, PreviewCursor};
pub use session::{Notice, TranslatorSession};
pub use translator::{
    ArgosEngine, InstalledRoutes, Route, TranslationEngine, Translator, create_translator,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "zh");
        assert_eq!(config.target_lang.as_str(), "en");
        assert_eq!(config.output_path, std::path::Path::new("translated.pdf"));
    }
}
