use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 (e.g. "en", "zh")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An ordered (source, target) language pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: Lang,
    pub target: Lang,
}

impl LanguagePair {
    pub fn new(source: impl Into<Lang>, target: impl Into<Lang>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// OCR engine configuration (tesseract command line)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Executable to invoke
    #[serde(default = "default_ocr_command")]
    pub command: String,
    /// Tesseract language model (e.g. "eng", "chi_sim")
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: default_ocr_language(),
        }
    }
}

/// Offline translation engine configuration (Argos Translate command line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Translation executable
    #[serde(default = "default_translate_command")]
    pub translate_command: String,
    /// Package manager executable used to list and install language pairs
    #[serde(default = "default_package_command")]
    pub package_command: String,
    /// Pairs installed by the explicit `install` management step
    #[serde(default = "default_required_pairs")]
    pub required_pairs: Vec<LanguagePair>,
}

impl TranslatorConfig {
    pub fn new(translate_command: impl Into<String>, package_command: impl Into<String>) -> Self {
        Self {
            translate_command: translate_command.into(),
            package_command: package_command.into(),
            required_pairs: default_required_pairs(),
        }
    }
}

fn default_translate_command() -> String {
    "argos-translate".to_string()
}

fn default_package_command() -> String {
    "argospm".to_string()
}

fn default_required_pairs() -> Vec<LanguagePair> {
    ["ko", "de", "zh", "es"]
        .into_iter()
        .flat_map(|code| [LanguagePair::new(code, "en"), LanguagePair::new("en", code)])
        .collect()
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::new(default_translate_command(), default_package_command())
    }
}

/// Page geometry and typography for the generated PDF, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_page_width")]
    pub page_width: f32,
    #[serde(default = "default_page_height")]
    pub page_height: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Baseline-to-baseline distance
    #[serde(default = "default_leading")]
    pub leading: f32,
    /// Vertical gap after each paragraph
    #[serde(default = "default_paragraph_spacing")]
    pub paragraph_spacing: f32,
    /// TrueType font to embed; standard Helvetica (Latin-1 only) when unset
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

// US Letter
const fn default_page_width() -> f32 {
    612.0
}

const fn default_page_height() -> f32 {
    792.0
}

const fn default_margin() -> f32 {
    72.0
}

const fn default_font_size() -> f32 {
    10.0
}

const fn default_leading() -> f32 {
    12.0
}

const fn default_paragraph_spacing() -> f32 {
    12.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            font_size: default_font_size(),
            leading: default_leading(),
            paragraph_spacing: default_paragraph_spacing(),
            font_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Where each successful job writes its PDF (overwritten every run)
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Resolution of preview renders
    #[serde(default = "default_preview_dpi")]
    pub preview_dpi: u32,

    /// Resolution used when rasterizing pages for OCR; must exceed `preview_dpi`
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,

    /// Rendered pages kept per preview slot
    #[serde(default = "default_preview_cache_pages")]
    pub preview_cache_pages: u64,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub translator: TranslatorConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

const fn default_preview_dpi() -> u32 {
    100
}

const fn default_ocr_dpi() -> u32 {
    200
}

const fn default_preview_cache_pages() -> u64 {
    32
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            output_path: default_output_path(),
            preview_dpi: default_preview_dpi(),
            ocr_dpi: default_ocr_dpi(),
            preview_cache_pages: default_preview_cache_pages(),
            ocr: OcrConfig::default(),
            translator: TranslatorConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/offline-translator/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("offline-translator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.preview_dpi == 0 {
            return Err(invalid("preview_dpi", "must be greater than zero"));
        }
        if self.ocr_dpi <= self.preview_dpi {
            return Err(invalid(
                "ocr_dpi",
                format!("must be higher than preview_dpi ({})", self.preview_dpi),
            ));
        }
        if self.preview_cache_pages == 0 {
            return Err(invalid("preview_cache_pages", "must be at least 1"));
        }

        let layout = &self.layout;
        if layout.font_size <= 0.0 || layout.leading < layout.font_size {
            return Err(invalid(
                "layout.leading",
                "font_size must be positive and leading at least font_size",
            ));
        }
        if layout.paragraph_spacing < 0.0 {
            return Err(invalid("layout.paragraph_spacing", "must not be negative"));
        }
        if layout.page_width <= 2.0 * layout.margin
            || layout.page_height - 2.0 * layout.margin < layout.leading
        {
            return Err(invalid(
                "layout.margin",
                "margins leave no room for a line of text",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::ConfigInvalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// ISO language code (e.g., "en", "zh")
    pub code: &'static str,
    /// Display name (e.g., "English", "Chinese")
    pub name: &'static str,
}

impl LanguageOption {
    /// Label in the form `Korean (ko)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

/// Languages offered by the translator tools.
pub fn supported_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "en", name: "English" },
        LanguageOption { code: "es", name: "Spanish" },
        LanguageOption { code: "fr", name: "French" },
        LanguageOption { code: "de", name: "German" },
        LanguageOption { code: "it", name: "Italian" },
        LanguageOption { code: "pt", name: "Portuguese" },
        LanguageOption { code: "ru", name: "Russian" },
        LanguageOption { code: "zh", name: "Chinese" },
        LanguageOption { code: "ja", name: "Japanese" },
        LanguageOption { code: "ko", name: "Korean" },
        LanguageOption { code: "ar", name: "Arabic" },
        LanguageOption { code: "hi", name: "Hindi" },
        LanguageOption { code: "nl", name: "Dutch" },
        LanguageOption { code: "sv", name: "Swedish" },
        LanguageOption { code: "pl", name: "Polish" },
        LanguageOption { code: "tr", name: "Turkish" },
    ]
}

/// Display label for a language code, falling back to the bare code.
pub fn language_label(code: &str) -> String {
    supported_languages()
        .into_iter()
        .find(|lang| lang.code == code)
        .map_or_else(|| code.to_string(), |lang| lang.label())
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "zh";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";
/// Default output file, relative to the working directory
pub const DEFAULT_OUTPUT_FILE: &str = "translated.pdf";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_path, PathBuf::from("translated.pdf"));
        assert!(config.ocr_dpi > config.preview_dpi);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            source_lang = "ko"
            [layout]
            font_size = 11.0
            leading = 14.0
            "#,
        )
        .unwrap();

        assert_eq!(config.source_lang.as_str(), "ko");
        assert_eq!(config.target_lang.as_str(), "en");
        assert!((config.layout.font_size - 11.0).abs() < f32::EPSILON);
        assert!((config.layout.page_width - 612.0).abs() < f32::EPSILON);
        assert_eq!(config.ocr.command, "tesseract");
        assert!(config.layout.font_path.is_none());
    }

    #[test]
    fn test_layout_font_path() {
        let config = AppConfig::from_toml(
            r#"
            [layout]
            font_path = "/usr/share/fonts/NanumGothic.ttf"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.layout.font_path.as_deref(),
            Some(std::path::Path::new("/usr/share/fonts/NanumGothic.ttf"))
        );
    }

    #[test]
    fn test_ocr_dpi_must_exceed_preview_dpi() {
        let result = AppConfig::from_toml("preview_dpi = 200\nocr_dpi = 200\n");
        assert!(matches!(
            result,
            Err(Error::ConfigInvalid { ref field, .. }) if field == "ocr_dpi"
        ));
    }

    #[test]
    fn test_required_pairs_cover_both_directions() {
        let pairs = default_required_pairs();
        assert_eq!(pairs.len(), 8);
        assert!(pairs.contains(&LanguagePair::new("ko", "en")));
        assert!(pairs.contains(&LanguagePair::new("en", "es")));
    }

    #[test]
    fn test_language_label() {
        assert_eq!(language_label("ko"), "Korean (ko)");
        assert_eq!(language_label("xx"), "xx");
    }
}
