//! Font handling for PDF documents
//!
//! Two kinds of fonts are supported: the standard Type1 fonts every viewer
//! provides (Helvetica, Courier, ZapfDingbats) and TrueType fonts registered
//! by the caller, which are embedded as Type0/CIDFontType2 with Identity-H
//! encoding.

use crate::object::deflate_stream;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::{BTreeSet, HashMap};

/// Helvetica advance widths for codes 32..=126 (1/1000 em)
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Standard Type1 fonts available without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    Courier,
    ZapfDingbats,
}

impl StandardFont {
    /// Resolve a font name or AcroForm resource alias (`Helv`, `Cour`, `ZaDb`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim_start_matches('/') {
            "Helv" | "Helvetica" | "Arial" | "ArialMT" => Some(StandardFont::Helvetica),
            "Cour" | "Courier" | "CourierNew" => Some(StandardFont::Courier),
            "ZaDb" | "ZapfDingbats" => Some(StandardFont::ZapfDingbats),
            _ => None,
        }
    }

    /// PostScript name used as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Advance width of a character in 1/1000 em
    pub fn char_width(&self, c: char) -> u16 {
        match self {
            StandardFont::Courier => 600,
            StandardFont::Helvetica => {
                let code = c as u32;
                if (32..=126).contains(&code) {
                    HELVETICA_WIDTHS[(code - 32) as usize]
                } else {
                    556
                }
            }
            StandardFont::ZapfDingbats => match c {
                ' ' => 278,
                '4' => 846,
                '5' => 762,
                '8' => 677,
                'l' => 791,
                _ => 788,
            },
        }
    }

    /// Text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 / 1000.0 * font_size as f64
    }

    /// Encode text as a PDF literal string for the `Tj` operator
    ///
    /// Characters outside Latin-1 cannot be shown with a simple font and are
    /// replaced with `?`.
    pub fn encode_text_literal(&self, text: &str) -> String {
        let mut out = String::from("(");
        for c in text.chars() {
            let code = if (c as u32) < 0x100 { c as u32 as u8 } else { b'?' };
            match code {
                b'(' | b')' | b'\\' => {
                    out.push('\\');
                    out.push(code as char);
                }
                0x20..=0x7E => out.push(code as char),
                _ => out.push_str(&format!("\\{code:03o}")),
            }
        }
        out.push(')');
        out
    }

    /// Font dictionary for this standard font
    pub fn to_pdf_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        if *self != StandardFont::ZapfDingbats {
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        }
        dict
    }
}

/// Font data structure for embedded TrueType fonts
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    pub ttf_data: Vec<u8>,
    /// Characters used (for widths and the ToUnicode map)
    pub used_chars: BTreeSet<char>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            ttf_data: ttf_data.to_vec(),
            used_chars: BTreeSet::new(),
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Add characters to the used set
    pub fn add_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face().and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f64 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let units: u32 = text
            .chars()
            .filter_map(|c| face.glyph_index(c))
            .filter_map(|gid| face.glyph_hor_advance(gid))
            .map(|w| w as u32)
            .sum();
        units as f64 / face.units_per_em() as f64 * font_size as f64
    }

    /// Encode text as hex glyph IDs for the `Tj` operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::from("<");
        for c in text.chars() {
            let gid = face
                .as_ref()
                .and_then(|f| f.glyph_index(c))
                .map(|g| g.0)
                .unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        result.push('>');
        result
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// References between the objects are left as placeholders and wired up
    /// by the document when the objects are added.
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let face = self
            .face()
            .ok_or_else(|| PdfError::FontParseError(self.name.clone()))?;
        let font_name = Object::Name(self.name.clone().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap(&face);
        let tounicode_stream = deflate_stream(
            Dictionary::from_iter(vec![("Type", "CMap".into())]),
            tounicode_content.as_bytes(),
        )?;

        let font_file_stream = deflate_stream(
            Dictionary::from_iter(vec![("Length1", (self.ttf_data.len() as i64).into())]),
            &self.ttf_data,
        )?;

        let units_per_em = face.units_per_em() as f64;
        let scale = |v: i16| ((v as f64) * 1000.0 / units_per_em) as i64;
        let ascender = scale(face.ascender());
        let descender = scale(face.descender());

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()),
            (
                "FontBBox",
                vec![0.into(), descender.into(), 1000.into(), ascender.into()].into(),
            ),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("W", self.generate_widths_array(&face).into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for the glyphs in use: `[gid [width] ...]`
    fn generate_widths_array(&self, face: &ttf_parser::Face<'_>) -> Vec<Object> {
        let units_per_em = face.units_per_em() as f64;
        let mut gids: Vec<ttf_parser::GlyphId> = self
            .used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c))
            .collect();
        gids.sort();
        gids.dedup();

        let mut widths = Vec::with_capacity(gids.len() * 2);
        for gid in gids {
            let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f64;
            widths.push((gid.0 as i64).into());
            widths.push(vec![((advance * 1000.0 / units_per_em) as i64).into()].into());
        }
        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self, face: &ttf_parser::Face<'_>) -> String {
        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        let mapped: Vec<(u16, char)> = self
            .used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|g| (g.0, c)))
            .collect();

        // bfchar sections are limited to 100 entries each
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                let mut utf16 = [0u16; 2];
                let hex: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }
}

/// A resolved font: either a standard Type1 font or a registered TrueType font
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Font {
    Standard(StandardFont),
    Embedded(String),
}

impl Font {
    /// Key used to track the font's resource across pages
    pub fn key(&self) -> String {
        match self {
            Font::Standard(font) => font.base_font().to_string(),
            Font::Embedded(name) => name.clone(),
        }
    }
}

/// Registry of caller-provided TrueType fonts
///
/// Lookups fall back to the standard fonts, and unknown names resolve to
/// Helvetica so a field referencing an unavailable font still renders.
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    fonts: HashMap<String, FontData>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TrueType font under `name`
    pub fn register(&mut self, name: &str, ttf_data: &[u8]) -> Result<()> {
        if self.fonts.contains_key(name) || StandardFont::from_name(name).is_some() {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        let font = FontData::from_ttf(name, ttf_data)?;
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// Resolve a font name to a registered or standard font
    pub fn resolve(&self, name: &str) -> Font {
        if self.fonts.contains_key(name) {
            return Font::Embedded(name.to_string());
        }
        Font::Standard(StandardFont::from_name(name).unwrap_or(StandardFont::Helvetica))
    }

    /// Width of `text` in points when set in `font_name` at `font_size`
    pub fn text_width(&self, font_name: &str, text: &str, font_size: f32) -> f64 {
        match self.resolve(font_name) {
            Font::Standard(font) => font.text_width_points(text, font_size),
            Font::Embedded(name) => self
                .fonts
                .get(&name)
                .map(|f| f.text_width_points(text, font_size))
                .unwrap_or(0.0),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FontData> {
        self.fonts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FontData> {
        self.fonts.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_font_aliases() {
        assert_eq!(StandardFont::from_name("Helv"), Some(StandardFont::Helvetica));
        assert_eq!(StandardFont::from_name("/ZaDb"), Some(StandardFont::ZapfDingbats));
        assert_eq!(StandardFont::from_name("Cour"), Some(StandardFont::Courier));
        assert_eq!(StandardFont::from_name("F1"), None);
    }

    #[test]
    fn test_helvetica_widths() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.char_width(' '), 278);
        assert_eq!(font.char_width('A'), 667);
        assert_eq!(font.char_width('i'), 222);
        assert_eq!(font.char_width('~'), 584);
        // "Hi" = 722 + 222 = 944 units -> 9.44pt at 10pt
        assert!((font.text_width_points("Hi", 10.0) - 9.44).abs() < 1e-9);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let font = StandardFont::Courier;
        assert_eq!(font.text_width_points("iiii", 10.0), font.text_width_points("WWWW", 10.0));
    }

    #[test]
    fn test_encode_text_literal_escapes() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.encode_text_literal("a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(font.encode_text_literal("é"), "(\\351)");
        assert_eq!(font.encode_text_literal("ก"), "(?)");
    }

    #[test]
    fn test_standard_font_dict() {
        let dict = StandardFont::ZapfDingbats.to_pdf_dict();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"ZapfDingbats");
        assert!(!dict.has(b"Encoding"));

        let dict = StandardFont::Helvetica.to_pdf_dict();
        assert_eq!(
            dict.get(b"Encoding").unwrap().as_name().unwrap(),
            b"WinAnsiEncoding"
        );
    }

    #[test]
    fn test_font_book_resolves_unknown_to_helvetica() {
        let book = FontBook::new();
        assert_eq!(book.resolve("F7"), Font::Standard(StandardFont::Helvetica));
        assert_eq!(book.resolve("Cour"), Font::Standard(StandardFont::Courier));
        assert_eq!(book.resolve("Helv").key(), "Helvetica");
    }

    #[test]
    fn test_font_book_rejects_invalid_ttf() {
        let mut book = FontBook::new();
        let result = book.register("broken", &[0, 1, 2, 3]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
        assert!(!book.contains("broken"));
    }

    #[test]
    fn test_font_book_rejects_standard_name() {
        let mut book = FontBook::new();
        let result = book.register("Helvetica", &[]);
        assert!(matches!(result, Err(PdfError::FontAlreadyExists(_))));
    }
}
