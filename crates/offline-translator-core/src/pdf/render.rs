use std::path::Path;

use image::{ImageEncoder, RgbaImage};
use mupdf::{Colorspace, Matrix};
use webp::Encoder as WebpEncoder;

use crate::error::{Error, Result};
use super::document::PdfDocument;
use super::page_index::PageIndex;

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizes one page of a PDF file ("render page N of path at DPI").
///
/// `doc_id` is the content identity the caller opened. When the file at
/// `path` no longer has it, implementations fail with
/// [`Error::DocumentChanged`] instead of rendering the new content.
pub trait Rasterizer: Send + Sync {
    fn render(&self, path: &Path, doc_id: &str, page: usize, dpi: u32) -> Result<RgbaImage>;
}

/// Page renderer for an in-memory document
pub struct PageRenderer<'a> {
    pub doc: &'a PdfDocument,
    pub dpi: u32,
}

impl<'a> PageRenderer<'a> {
    pub const fn new(doc: &'a PdfDocument, dpi: u32) -> Self {
        Self { doc, dpi }
    }

    #[allow(clippy::cast_precision_loss)] // DPI values are small
    fn scale(&self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }

    /// Render a 1-based page to an RGBA image buffer
    pub fn render_page(&self, page: usize) -> Result<RgbaImage> {
        let page_index = PageIndex::try_from_page_number(page, self.doc.page_count())?;

        if self.dpi == 0 {
            return Err(Error::RenderFailure {
                page,
                reason: "resolution must be greater than zero".to_string(),
            });
        }

        let doc = self.doc.open_document()?;
        let mu_page = doc.load_page(page_index.into()).map_err(|e| Error::RenderFailure {
            page,
            reason: format!("failed to load page: {e}"),
        })?;

        let scale = self.scale();
        let matrix = Matrix::new_scale(scale, scale);

        let pixmap = mu_page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| Error::RenderFailure {
                page,
                reason: format!("failed to render: {e}"),
            })?;

        let width = pixmap.width();
        let height = pixmap.height();
        let n = pixmap.n() as usize;

        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for px in pixmap.samples().chunks(n) {
            match *px {
                [gray] => rgba.extend_from_slice(&[gray, gray, gray, 255]),
                [r, g, b] => rgba.extend_from_slice(&[r, g, b, 255]),
                [r, g, b, a] => rgba.extend_from_slice(&[r, g, b, a]),
                _ => {
                    return Err(Error::RenderFailure {
                        page,
                        reason: format!("unexpected pixel format with {n} components"),
                    });
                }
            }
        }

        RgbaImage::from_raw(width, height, rgba).ok_or_else(|| Error::RenderFailure {
            page,
            reason: "pixel buffer does not match image dimensions".to_string(),
        })
    }
}

/// [`Rasterizer`] backed by MuPDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfRasterizer;

impl Rasterizer for MupdfRasterizer {
    fn render(&self, path: &Path, doc_id: &str, page: usize, dpi: u32) -> Result<RgbaImage> {
        let doc = PdfDocument::from_file(path)?;
        if doc.cache_id() != doc_id {
            return Err(Error::DocumentChanged {
                path: path.to_path_buf(),
            });
        }
        PageRenderer::new(&doc, dpi).render_page(page)
    }
}

/// Encode a rendered page as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut png_data = Vec::new();
    // Fast compression is still lossless
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png_data,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    );

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::RenderFailure {
            page: 0,
            reason: format!("failed to encode PNG: {e}"),
        })?;

    Ok(png_data)
}

/// Encode a rendered page as lossy WebP (quality 85).
pub fn encode_webp(image: &RgbaImage) -> Vec<u8> {
    WebpEncoder::from_rgba(image.as_raw(), image.width(), image.height())
        .encode(85.0)
        .to_vec()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkerboard() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn test_encode_png_magic() {
        let png = encode_png(&checkerboard()).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn test_mupdf_rasterizer_rejects_replaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let writer = crate::pdf::LopdfWriter::default();

        std::fs::write(&path, writer.render("First version").unwrap()).unwrap();
        let opened = PdfDocument::from_file(&path).unwrap();
        let image = MupdfRasterizer.render(&path, opened.cache_id(), 1, 36).unwrap();
        assert!(image.width() > 0);

        std::fs::write(&path, writer.render("Second version").unwrap()).unwrap();
        let result = MupdfRasterizer.render(&path, opened.cache_id(), 1, 36);
        assert!(matches!(result, Err(Error::DocumentChanged { .. })));
    }

    #[test]
    fn test_encode_webp_magic() {
        let webp = encode_webp(&checkerboard());
        assert!(webp.starts_with(b"RIFF"));
        assert_eq!(&webp[8..12], b"WEBP");
    }
}
