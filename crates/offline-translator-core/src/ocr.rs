//! OCR seam: "image -> recognized text".
//!
//! An empty string is a valid result (blank or unrecognizable page); only an
//! engine malfunction is an error.

use std::process::Command;

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbaImage) -> Result<String>;
}

/// Runs the `tesseract` command line on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub command: String,
    pub language: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.command.clone(), config.language.clone())
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &RgbaImage) -> Result<String> {
        let input = tempfile::Builder::new()
            .prefix("ocr-page-")
            .suffix(".png")
            .tempfile()?;

        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| Error::OcrEngine(format!("failed to stage page image: {e}")))?;

        debug!(
            "Running {} on {}x{} image ({})",
            self.command,
            image.width(),
            image.height(),
            self.language
        );

        let output = Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| Error::OcrEngine(format!("failed to launch {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::OcrEngine(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_engine_error() {
        let ocr = TesseractOcr::new("definitely-not-a-real-ocr-binary", "eng");
        let image = RgbaImage::new(2, 2);

        let result = ocr.recognize(&image);
        assert!(matches!(
            result,
            Err(Error::OcrEngine(ref msg)) if msg.contains("failed to launch")
        ));
    }
}
