//! Reflowed PDF output for translated text.
//!
//! The translated text is split into paragraphs on blank lines and flowed
//! top-to-bottom onto fixed-size pages. Original pagination is not kept.
//!
//! # Coordinates
//!
//! PDF user space has its origin at the bottom-left corner, so the layout
//! cursor starts at `page_height - margin` and moves downward.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info};

use super::font::EmbeddedFont;
use crate::config::LayoutConfig;
use crate::error::{Error, Result};

/// Average Helvetica glyph width as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f32 = 0.5;

/// Narrowest wrap width, in ems, regardless of page geometry.
const MIN_LINE_EMS: f32 = 5.0;

/// Font resource name used in content streams.
const FONT_NAME: &str = "F1";

/// Writes translated text to a PDF file ("paragraphs + page size -> PDF").
pub trait PdfWriter: Send + Sync {
    fn write(&self, text: &str, output: &Path) -> Result<()>;
}

/// Split text into paragraphs on blank-line boundaries.
///
/// Single newlines inside a paragraph become spaces; paragraphs that are
/// empty after trimming are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|para| para.replace('\n', " ").trim().to_string())
        .filter(|para| !para.is_empty())
        .collect()
}

/// A line of text at its baseline position on a page.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    baseline: f32,
    text: String,
}

/// [`PdfWriter`] that lays out text with lopdf.
///
/// Uses an embedded TrueType font when one is set, otherwise standard
/// Helvetica, which only covers Latin-1.
#[derive(Debug, Clone, Default)]
pub struct LopdfWriter {
    pub layout: LayoutConfig,
    font: Option<Arc<EmbeddedFont>>,
}

impl LopdfWriter {
    pub const fn new(layout: LayoutConfig) -> Self {
        Self { layout, font: None }
    }

    /// Writer for `layout`, loading `layout.font_path` if set.
    pub fn from_config(layout: &LayoutConfig) -> Result<Self> {
        let writer = Self::new(layout.clone());
        match &layout.font_path {
            Some(path) => Ok(writer.with_font(EmbeddedFont::from_file(path)?)),
            None => Ok(writer),
        }
    }

    #[must_use]
    pub fn with_font(mut self, font: EmbeddedFont) -> Self {
        info!("Embedding {} in translated PDFs", font.path().display());
        self.font = Some(Arc::new(font));
        self
    }

    pub fn font(&self) -> Option<&EmbeddedFont> {
        self.font.as_deref()
    }

    /// Lay out `text` and return the PDF bytes.
    pub fn render(&self, text: &str) -> Result<Vec<u8>> {
        let paragraphs = split_paragraphs(text);
        let pages = self.layout_pages(&paragraphs);
        debug!(
            "Laid out {} paragraphs on {} pages",
            paragraphs.len(),
            pages.len()
        );
        self.build_document(&pages)
    }

    fn char_width(&self, c: char) -> f32 {
        match &self.font {
            Some(font) => font.char_width(c, self.layout.font_size),
            None => self.layout.font_size * CHAR_WIDTH_FACTOR,
        }
    }

    fn max_line_width(&self) -> f32 {
        let layout = &self.layout;
        let usable_width = layout.page_width - 2.0 * layout.margin;
        usable_width.max(MIN_LINE_EMS * layout.font_size)
    }

    fn text_operand(&self, text: &str) -> Object {
        match &self.font {
            Some(font) => font.text_object(text),
            None => Object::String(encode_win_ansi(text), StringFormat::Literal),
        }
    }

    /// Flow paragraphs onto pages. Always returns at least one page.
    fn layout_pages(&self, paragraphs: &[String]) -> Vec<Vec<PlacedLine>> {
        let layout = &self.layout;
        let top = layout.page_height - layout.margin;
        let bottom = layout.margin;
        let max_width = self.max_line_width();

        let mut pages = Vec::new();
        let mut current: Vec<PlacedLine> = Vec::new();
        let mut cursor = top;

        for paragraph in paragraphs {
            for line in word_wrap(paragraph, max_width, |c| self.char_width(c)) {
                if cursor - layout.leading < bottom && !current.is_empty() {
                    pages.push(std::mem::take(&mut current));
                    cursor = top;
                }
                current.push(PlacedLine {
                    baseline: cursor - layout.font_size,
                    text: line,
                });
                cursor -= layout.leading;
            }
            cursor -= layout.paragraph_spacing;
        }

        pages.push(current);
        pages
    }

    fn build_document(&self, pages: &[Vec<PlacedLine>]) -> Result<Vec<u8>> {
        let layout = &self.layout;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = match &self.font {
            Some(font) => {
                let text: String = pages.iter().flatten().map(|line| line.text.as_str()).collect();
                font.embed(&mut doc, &text)?
            }
            None => doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ])),
        };

        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(FONT_NAME, Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::with_capacity(pages.len());
        for lines in pages {
            let content_id = self.add_content_stream(&mut doc, lines)?;
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(layout.page_width),
                        Object::Real(layout.page_height),
                    ]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len())
            .map_err(|_| Error::WriteFailure("too many pages".to_string()))?;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::WriteFailure(format!("failed to serialize PDF: {e}")))?;
        Ok(output)
    }

    fn add_content_stream(&self, doc: &mut Document, lines: &[PlacedLine]) -> Result<ObjectId> {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_NAME.as_bytes().to_vec()),
                    Object::Real(self.layout.font_size),
                ],
            ),
        ];

        for line in lines {
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(self.layout.margin),
                    Object::Real(line.baseline),
                ],
            ));
            operations.push(Operation::new("Tj", vec![self.text_operand(&line.text)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let bytes = Content { operations }
            .encode()
            .map_err(|e| Error::WriteFailure(format!("failed to encode page content: {e}")))?;

        Ok(doc.add_object(Stream::new(Dictionary::new(), bytes)))
    }
}

impl PdfWriter for LopdfWriter {
    /// Writes to a temporary file next to `output` and renames it into place,
    /// so a failed write leaves any previous file untouched.
    fn write(&self, text: &str, output: &Path) -> Result<()> {
        let bytes = self.render(text)?;

        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            Error::WriteFailure(format!("failed to create file in {}: {e}", dir.display()))
        })?;
        staged
            .write_all(&bytes)
            .map_err(|e| Error::WriteFailure(format!("failed to write PDF: {e}")))?;
        staged.persist(output).map_err(|e| {
            Error::WriteFailure(format!("failed to save {}: {}", output.display(), e.error))
        })?;

        info!("Wrote {} ({} bytes)", output.display(), bytes.len());
        Ok(())
    }
}

/// Word wrap text to lines no wider than `max_width`, measuring each
/// character with `width_of`.
///
/// Words wider than a line are split between characters, which is also how
/// text without spaces (Chinese, Japanese) gets wrapped.
fn word_wrap(text: &str, max_width: f32, width_of: impl Fn(char) -> f32) -> Vec<String> {
    let space = width_of(' ');
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        for (piece, piece_width) in split_word(word, max_width, &width_of) {
            if current_line.is_empty() {
                current_line = piece;
                current_width = piece_width;
            } else if current_width + space + piece_width <= max_width {
                current_line.push(' ');
                current_line.push_str(&piece);
                current_width += space + piece_width;
            } else {
                lines.push(std::mem::replace(&mut current_line, piece));
                current_width = piece_width;
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Break one word into pieces that each fit `max_width`, with their widths.
fn split_word(word: &str, max_width: f32, width_of: impl Fn(char) -> f32) -> Vec<(String, f32)> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0;

    for c in word.chars() {
        let char_width = width_of(c);
        if !piece.is_empty() && width + char_width > max_width {
            pieces.push((std::mem::take(&mut piece), width));
            width = 0.0;
        }
        piece.push(c);
        width += char_width;
    }
    if !piece.is_empty() {
        pieces.push((piece, width));
    }
    pieces
}

/// Encode text for a WinAnsiEncoding simple font; unmappable characters
/// become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::font::testing::hangul_font;

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs("First line\nsame para\n\n\n\nSecond\n\n   \n\nThird ");
        assert_eq!(paragraphs, vec!["First line same para", "Second", "Third"]);
    }

    #[test]
    fn test_split_paragraphs_empty() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n \n\n").is_empty());
    }

    #[test]
    fn test_word_wrap_basic() {
        let lines = word_wrap("Hello world this is a test", 10.0, |_| 1.0);
        assert_eq!(lines, vec!["Hello", "world this", "is a test"]);
    }

    #[test]
    fn test_word_wrap_splits_long_words() {
        let lines = word_wrap("abcdefghijklmno", 10.0, |_| 1.0);
        assert_eq!(lines, vec!["abcdefghij", "klmno"]);
    }

    #[test]
    fn test_word_wrap_counts_chars_not_bytes() {
        let lines = word_wrap("ééééé ééééé", 11.0, |_| 1.0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_word_wrap_uses_character_widths() {
        let width = |c: char| if c.is_ascii() { 1.0 } else { 2.0 };
        let lines = word_wrap("ab 안녕하세요", 6.0, width);
        assert_eq!(lines, vec!["ab", "안녕하", "세요"]);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Año €"), vec![b'A', 0xF1, b'o', b' ', 0x80]);
        assert_eq!(encode_win_ansi("中"), vec![b'?']);
    }

    #[test]
    fn test_layout_empty_text_has_one_blank_page() {
        let writer = LopdfWriter::default();
        let pages = writer.layout_pages(&[]);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_layout_overflows_onto_new_pages() {
        let writer = LopdfWriter::default();
        let paragraphs: Vec<String> = (0..200).map(|i| format!("Paragraph number {i}.")).collect();

        let pages = writer.layout_pages(&paragraphs);
        assert!(pages.len() > 1, "200 paragraphs should not fit on one page");

        let bottom = writer.layout.margin - writer.layout.font_size;
        for page in &pages {
            assert!(!page.is_empty());
            for line in page {
                assert!(line.baseline >= bottom, "line below bottom margin: {}", line.baseline);
                assert!(line.baseline <= writer.layout.page_height - writer.layout.margin);
            }
        }
    }

    #[test]
    fn test_render_produces_loadable_pdf() {
        let writer = LopdfWriter::default();
        let bytes = writer.render("Hola.\n\nMundo (con paréntesis).").unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    fn hangul_writer() -> LopdfWriter {
        let font = EmbeddedFont::from_bytes(Path::new("hangul.ttf"), hangul_font()).unwrap();
        LopdfWriter::default().with_font(font)
    }

    #[test]
    fn test_embedded_font_keeps_korean_text() {
        let bytes = hangul_writer().render("안녕하세요").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        let page_id = doc.page_iter().next().unwrap();
        let fonts = doc.get_page_fonts(page_id).unwrap();
        let font = fonts.get(FONT_NAME.as_bytes()).unwrap();
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let text = doc.extract_text(&[1]).unwrap();
        assert_eq!(text.trim(), "안녕하세요");
    }

    #[test]
    fn test_embedded_font_wraps_by_glyph_width() {
        // Hangul glyphs are a full em wide, twice the Helvetica estimate
        let writer = hangul_writer();
        let paragraph = "안녕하세요".repeat(40);
        let pages = writer.layout_pages(&[paragraph]);

        let per_line = (writer.max_line_width() / writer.layout.font_size).floor();
        for line in &pages[0] {
            #[allow(clippy::cast_precision_loss)]
            let chars = line.text.chars().count() as f32;
            assert!(chars <= per_line, "{chars} glyphs on a {per_line}-em line");
        }
        assert_eq!(pages[0].iter().map(|l| l.text.chars().count()).sum::<usize>(), 200);
    }

    #[test]
    fn test_from_config_loads_font_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hangul.ttf");
        std::fs::write(&path, hangul_font()).unwrap();

        let layout = LayoutConfig {
            font_path: Some(path),
            ..LayoutConfig::default()
        };
        let writer = LopdfWriter::from_config(&layout).unwrap();
        assert_eq!(writer.font().map(|f| f.glyph_id('안')), Some(4));

        let missing = LayoutConfig {
            font_path: Some(dir.path().join("missing.ttf")),
            ..LayoutConfig::default()
        };
        assert!(matches!(
            LopdfWriter::from_config(&missing),
            Err(Error::InvalidFont { .. })
        ));
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("translated.pdf");
        std::fs::write(&output, b"stale").unwrap();

        LopdfWriter::default().write("Fresh content", &output).unwrap();

        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("translated.pdf");

        let result = LopdfWriter::default().write("text", &output);
        assert!(matches!(result, Err(Error::WriteFailure(_))));
    }
}
