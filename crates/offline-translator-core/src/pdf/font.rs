//! TrueType font embedding for non-Latin output.
//!
//! The font is embedded as a composite font so any character it covers can
//! be drawn:
//! - **Type0 font** with `Identity-H` encoding (two-byte glyph IDs)
//!   - **CIDFontType2** with per-glyph widths, `CIDToGIDMap /Identity`
//!     - **FontDescriptor** + **FontFile2** (the raw TrueType program)
//!   - **ToUnicode CMap** so text can be extracted again

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};
use ttf_parser::Face;

use crate::error::{Error, Result};

/// Maximum entries per `beginbfchar` block.
const BFCHAR_BLOCK: usize = 100;

/// A parsed TrueType font, ready to be embedded.
///
/// Glyph mapping and advances are read once at load time so the raw bytes
/// can be owned without borrowing from a parsed face.
#[derive(Clone)]
pub struct EmbeddedFont {
    path: PathBuf,
    data: Vec<u8>,
    base_name: String,
    units_per_em: u16,
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
    bbox: [i16; 4],
    ascender: i16,
    descender: i16,
    cap_height: i16,
}

impl EmbeddedFont {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::InvalidFont {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(path, data)
    }

    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidFont {
            path: path.to_path_buf(),
            reason,
        };

        if data.starts_with(b"OTTO") {
            return Err(invalid(
                "CFF outlines are not supported; use a font with TrueType outlines".to_string(),
            ));
        }

        let face = Face::parse(&data, 0).map_err(|e| invalid(format!("failed to parse: {e}")))?;

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code_point| {
                    if let (Some(c), Some(glyph)) =
                        (char::from_u32(code_point), subtable.glyph_index(code_point))
                    {
                        glyphs.entry(c).or_insert(glyph.0);
                    }
                });
            }
        }
        if glyphs.is_empty() {
            return Err(invalid("no Unicode character map".to_string()));
        }

        let advances = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0))
            .collect();
        let bbox = face.global_bounding_box();
        let ascender = face.ascender();

        let font = Self {
            path: path.to_path_buf(),
            base_name: base_font_name(path),
            units_per_em: face.units_per_em(),
            glyphs,
            advances,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            ascender,
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or(ascender),
            data,
        };
        debug!(
            "Loaded font {} ({} mapped characters)",
            font.path.display(),
            font.glyphs.len()
        );
        Ok(font)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Glyph ID for a character, `.notdef` (0) when the font lacks it.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyphs.get(&c).copied().unwrap_or(0)
    }

    pub fn has_glyph(&self, c: char) -> bool {
        self.glyphs.contains_key(&c)
    }

    /// Advance width of a character in points at `font_size`.
    pub fn char_width(&self, c: char, font_size: f32) -> f32 {
        let advance = self.advance(self.glyph_id(c));
        f32::from(advance) * font_size / f32::from(self.units_per_em)
    }

    fn advance(&self, gid: u16) -> u16 {
        self.advances.get(usize::from(gid)).copied().unwrap_or(0)
    }

    /// Big-endian glyph IDs for an `Identity-H` text string.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.chars()
            .flat_map(|c| self.glyph_id(c).to_be_bytes())
            .collect()
    }

    /// Text operand for `Tj`.
    pub fn text_object(&self, text: &str) -> Object {
        Object::String(self.encode(text), StringFormat::Hexadecimal)
    }

    /// Scale a font-unit width to PDF's 1000-unit glyph space.
    fn scale_width(&self, width: u16) -> i64 {
        i64::from(width) * 1000 / i64::from(self.units_per_em)
    }

    /// Add the font objects to `doc` and return the Type0 font's id.
    ///
    /// Widths and ToUnicode entries cover the characters in `text` only.
    pub fn embed(&self, doc: &mut Document, text: &str) -> Result<ObjectId> {
        let mut used: BTreeMap<u16, char> = BTreeMap::new();
        let mut missing = 0usize;
        for c in text.chars().filter(|c| !c.is_control()) {
            if self.has_glyph(c) {
                used.entry(self.glyph_id(c)).or_insert(c);
            } else {
                missing += 1;
            }
        }
        if missing > 0 {
            warn!(
                "{} characters are not covered by {} and will be blank",
                missing,
                self.path.display()
            );
        }

        let length = i64::try_from(self.data.len())
            .map_err(|_| Error::WriteFailure("font program too large".to_string()))?;
        let font_file_id = doc.add_object(
            Stream::new(
                Dictionary::from_iter([("Length1", Object::Integer(length))]),
                self.data.clone(),
            )
            .with_compression(true),
        );

        let base_name = Object::Name(self.base_name.as_bytes().to_vec());
        let descriptor_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", base_name.clone()),
            ("Flags", Object::Integer(32)),
            (
                "FontBBox",
                Object::Array(self.bbox.iter().map(|&v| Object::Integer(i64::from(v))).collect()),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(self.ascender))),
            ("Descent", Object::Integer(i64::from(self.descender))),
            ("CapHeight", Object::Integer(i64::from(self.cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]));

        let cid_font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", base_name.clone()),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::string_literal("Adobe")),
                    ("Ordering", Object::string_literal("Identity")),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(descriptor_id)),
            ("DW", Object::Integer(self.scale_width(self.advance(self.glyph_id(' '))))),
            ("W", Object::Array(self.widths_array(used.keys().copied()))),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]));

        let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), to_unicode_cmap(&used)));

        Ok(doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", base_name),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ])))
    }

    /// `W` array: `[first_gid [w1 w2 ...]]` for each run of consecutive glyphs.
    fn widths_array(&self, gids: impl Iterator<Item = u16>) -> Vec<Object> {
        let mut result = Vec::new();
        let mut run: Option<(u16, Vec<Object>)> = None;

        for gid in gids {
            let width = Object::Integer(self.scale_width(self.advance(gid)));
            if let Some((first, widths)) = run.as_mut() {
                if usize::from(*first) + widths.len() == usize::from(gid) {
                    widths.push(width);
                    continue;
                }
            }
            if let Some((first, widths)) = run.replace((gid, vec![width])) {
                result.push(Object::Integer(i64::from(first)));
                result.push(Object::Array(widths));
            }
        }
        if let Some((first, widths)) = run {
            result.push(Object::Integer(i64::from(first)));
            result.push(Object::Array(widths));
        }
        result
    }
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("path", &self.path)
            .field("base_name", &self.base_name)
            .field("glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

/// PostScript-safe font name from the file stem.
fn base_font_name(path: &Path) -> String {
    let name: String = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

/// ToUnicode CMap mapping each used glyph ID back to its character.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo <<\n\
         /Registry (Adobe)\n\
         /Ordering (UCS)\n\
         /Supplement 0\n\
         >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<_> = used.iter().collect();
    for block in entries.chunks(BFCHAR_BLOCK) {
        let _ = writeln!(cmap, "{} beginbfchar", block.len());
        for (gid, c) in block {
            let mut units = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

/// Minimal TrueType fonts for tests.
#[cfg(test)]
pub(crate) mod testing {
    /// Characters covered by [`hangul_font`], in glyph order starting at 1.
    pub const HANGUL_CHARS: [char; 6] = [' ', '녕', '세', '안', '요', '하'];

    /// A font with `head`, `hhea`, `maxp`, `hmtx` and a format 12 `cmap`
    /// covering [`HANGUL_CHARS`]. No outlines; enough for metrics and mapping.
    pub fn hangul_font() -> Vec<u8> {
        let glyph_count = u16::try_from(HANGUL_CHARS.len() + 1).unwrap_or(u16::MAX);

        let mut head = Vec::new();
        head.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // version
        head.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // fontRevision
        head.extend_from_slice(&0u32.to_be_bytes()); // checkSumAdjustment
        head.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes()); // magicNumber
        head.extend_from_slice(&0u16.to_be_bytes()); // flags
        head.extend_from_slice(&1000u16.to_be_bytes()); // unitsPerEm
        head.extend_from_slice(&[0; 16]); // created, modified
        for v in [0i16, -200, 1000, 800] {
            head.extend_from_slice(&v.to_be_bytes());
        }
        head.extend_from_slice(&0u16.to_be_bytes()); // macStyle
        head.extend_from_slice(&8u16.to_be_bytes()); // lowestRecPPEM
        head.extend_from_slice(&2i16.to_be_bytes()); // fontDirectionHint
        head.extend_from_slice(&0i16.to_be_bytes()); // indexToLocFormat
        head.extend_from_slice(&0i16.to_be_bytes()); // glyphDataFormat

        let mut hhea = Vec::new();
        hhea.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        for v in [800i16, -200, 0] {
            hhea.extend_from_slice(&v.to_be_bytes());
        }
        hhea.extend_from_slice(&1000u16.to_be_bytes()); // advanceWidthMax
        hhea.extend_from_slice(&[0; 22]);
        hhea.extend_from_slice(&glyph_count.to_be_bytes()); // numberOfHMetrics

        let mut maxp = Vec::new();
        maxp.extend_from_slice(&0x0000_5000u32.to_be_bytes());
        maxp.extend_from_slice(&glyph_count.to_be_bytes());

        let mut hmtx = Vec::new();
        for gid in 0..glyph_count {
            let advance: u16 = match gid {
                0 => 500,
                1 => 250,
                _ => 1000,
            };
            hmtx.extend_from_slice(&advance.to_be_bytes());
            hmtx.extend_from_slice(&0i16.to_be_bytes());
        }

        let mut groups = Vec::new();
        for (gid, c) in (1u32..).zip(HANGUL_CHARS) {
            let code = u32::from(c);
            groups.extend_from_slice(&code.to_be_bytes());
            groups.extend_from_slice(&code.to_be_bytes());
            groups.extend_from_slice(&gid.to_be_bytes());
        }
        let group_count = u32::try_from(HANGUL_CHARS.len()).unwrap_or(0);
        let subtable_len = u32::try_from(16 + groups.len()).unwrap_or(0);

        let mut cmap = Vec::new();
        cmap.extend_from_slice(&0u16.to_be_bytes()); // version
        cmap.extend_from_slice(&1u16.to_be_bytes()); // numTables
        cmap.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
        cmap.extend_from_slice(&10u16.to_be_bytes()); // encoding: full Unicode
        cmap.extend_from_slice(&12u32.to_be_bytes()); // subtable offset
        cmap.extend_from_slice(&12u16.to_be_bytes()); // format
        cmap.extend_from_slice(&0u16.to_be_bytes());
        cmap.extend_from_slice(&subtable_len.to_be_bytes());
        cmap.extend_from_slice(&0u32.to_be_bytes()); // language
        cmap.extend_from_slice(&group_count.to_be_bytes());
        cmap.extend_from_slice(&groups);

        assemble(&[
            (*b"cmap", cmap),
            (*b"head", head),
            (*b"hhea", hhea),
            (*b"hmtx", hmtx),
            (*b"maxp", maxp),
        ])
    }

    /// sfnt container; `tables` must be sorted by tag.
    fn assemble(tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
        let count = u16::try_from(tables.len()).unwrap_or(0);
        let mut font = Vec::new();
        font.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        font.extend_from_slice(&count.to_be_bytes());
        font.extend_from_slice(&[0; 6]); // searchRange, entrySelector, rangeShift

        let mut offset = 12 + 16 * tables.len();
        let mut body = Vec::new();
        for (tag, data) in tables {
            font.extend_from_slice(tag);
            font.extend_from_slice(&0u32.to_be_bytes()); // checksum
            font.extend_from_slice(&u32::try_from(offset).unwrap_or(0).to_be_bytes());
            font.extend_from_slice(&u32::try_from(data.len()).unwrap_or(0).to_be_bytes());

            body.extend_from_slice(data);
            while body.len() % 4 != 0 {
                body.push(0);
            }
            offset = 12 + 16 * tables.len() + body.len();
        }
        font.extend_from_slice(&body);
        font
    }
}
