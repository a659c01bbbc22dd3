mod document;
mod font;
mod page_index;
mod render;
mod text;
pub mod writer;

pub use document::{DocumentReader, MupdfReader, PageTextSource, PdfDocument};
pub use font::EmbeddedFont;
pub use page_index::PageIndex;
pub use render::{MupdfRasterizer, PageRenderer, Rasterizer, encode_png, encode_webp};
pub use text::{EXTRACTION_PROGRESS_SPAN, PageText, TextExtractor, join_pages};
pub use writer::{LopdfWriter, PdfWriter, split_paragraphs};
