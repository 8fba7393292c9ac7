//! Helpers for reading and writing lopdf objects
//!
//! Form dictionaries mix direct values and indirect references freely, and
//! most field attributes are inheritable through `/Parent`. These helpers
//! keep that resolution logic in one place.

use crate::{Rect, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::io::Write;

/// Maximum `/Parent` hops followed before giving up on a malformed tree
pub const MAX_PARENT_DEPTH: usize = 32;

/// PDFDocEncoding codes that differ from Latin-1
const PDF_DOC_DIFFERENCES: [(u8, char); 40] = [
    (0x18, '\u{02D8}'),
    (0x19, '\u{02C7}'),
    (0x1A, '\u{02C6}'),
    (0x1B, '\u{02D9}'),
    (0x1C, '\u{02DD}'),
    (0x1D, '\u{02DB}'),
    (0x1E, '\u{02DA}'),
    (0x1F, '\u{02DC}'),
    (0x80, '\u{2022}'),
    (0x81, '\u{2020}'),
    (0x82, '\u{2021}'),
    (0x83, '\u{2026}'),
    (0x84, '\u{2014}'),
    (0x85, '\u{2013}'),
    (0x86, '\u{0192}'),
    (0x87, '\u{2044}'),
    (0x88, '\u{2039}'),
    (0x89, '\u{203A}'),
    (0x8A, '\u{2212}'),
    (0x8B, '\u{2030}'),
    (0x8C, '\u{201E}'),
    (0x8D, '\u{201C}'),
    (0x8E, '\u{201D}'),
    (0x8F, '\u{2018}'),
    (0x90, '\u{2019}'),
    (0x91, '\u{201A}'),
    (0x92, '\u{2122}'),
    (0x93, '\u{FB01}'),
    (0x94, '\u{FB02}'),
    (0x95, '\u{0141}'),
    (0x96, '\u{0152}'),
    (0x97, '\u{0160}'),
    (0x98, '\u{0178}'),
    (0x99, '\u{017D}'),
    (0x9A, '\u{0131}'),
    (0x9B, '\u{0142}'),
    (0x9C, '\u{0153}'),
    (0x9D, '\u{0161}'),
    (0x9E, '\u{017E}'),
    (0xA0, '\u{20AC}'),
];

fn pdf_doc_char(byte: u8) -> char {
    PDF_DOC_DIFFERENCES
        .iter()
        .find(|(b, _)| *b == byte)
        .map(|(_, c)| *c)
        .unwrap_or(byte as char)
}

fn pdf_doc_byte(c: char) -> Option<u8> {
    if let Some((b, _)) = PDF_DOC_DIFFERENCES.iter().find(|(_, d)| *d == c) {
        return Some(*b);
    }
    let code = c as u32;
    let remapped =
        (0x18..=0x1F).contains(&code) || (0x7F..=0xA0).contains(&code) || code == 0xAD;
    (code < 0x100 && !remapped).then_some(code as u8)
}

/// Resolve an object through at most one level of indirection
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve an object to a dictionary (direct or referenced)
pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).and_then(|o| o.as_dict().ok())
}

/// Look up `key` in a dictionary, resolving an indirect value
pub fn get_resolved<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// Look up an inheritable field attribute, walking the `/Parent` chain
pub fn get_inherited<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(value) = get_resolved(doc, current, key) {
            return Some(value);
        }
        current = get_resolved(doc, current, b"Parent")?.as_dict().ok()?;
    }
    None
}

/// Convert a numeric object (Integer or Real) to f64
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Convert a numeric object to an integer, truncating reals
pub fn integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(f) => Some(*f as i64),
        _ => None,
    }
}

/// Read a 4-number array as a normalized rectangle
pub fn rect(doc: &Document, obj: &Object) -> Option<Rect> {
    let array = resolve(doc, obj)?.as_array().ok()?;
    if array.len() < 4 {
        return None;
    }
    let mut values = [0.0; 4];
    for (slot, item) in values.iter_mut().zip(array.iter()) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(Rect::new(values[0], values[1], values[2], values[3]))
}

/// Get the name bytes of a Name object as a string
pub fn name(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or PDFDocEncoding)
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

/// Read a String or Name object as text
pub fn text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Encode text as a PDF text string object
///
/// Text representable in PDFDocEncoding is written as a literal byte string,
/// anything else as UTF-16BE with a byte order mark.
pub fn encode_text_string(value: &str) -> Object {
    if let Some(bytes) = value.chars().map(pdf_doc_byte).collect::<Option<Vec<u8>>>() {
        return Object::String(bytes, StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Build a FlateDecode stream from uncompressed `content`
pub fn deflate_stream(mut dict: Dictionary, content: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    let compressed = encoder.finish()?;

    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    Ok(Stream::new(dict, compressed).with_compression(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_decode_utf16_text_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x0E, 0x01];
        assert_eq!(decode_text_string(&bytes), "A\u{0E01}");
    }

    #[test]
    fn test_decode_latin1_text_string() {
        assert_eq!(decode_text_string(b"Caf\xe9"), "Café");
    }

    #[test]
    fn test_encode_text_string_round_trip_unicode() {
        let obj = encode_text_string("สวัสดี");
        match obj {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(decode_text_string(&bytes), "สวัสดี");
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_encode_text_string_latin1_is_literal() {
        match encode_text_string("Smith") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"Smith"),
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_pdf_doc_encoding_punctuation() {
        assert_eq!(
            decode_text_string(b"\x80 A\x84B \x8Dq\x8E \xA0"),
            "\u{2022} A\u{2014}B \u{201C}q\u{201D} \u{20AC}"
        );

        match encode_text_string("\u{2018}Caf\u{e9}\u{2019} \u{2013} 5\u{20AC}") {
            Object::String(bytes, StringFormat::Literal) => {
                assert_eq!(bytes, b"\x8FCaf\xe9\x90 \x85 5\xA0");
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_encode_text_string_raw_c1_controls_use_utf16() {
        match encode_text_string("a\u{0085}") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(decode_text_string(&bytes), "a\u{0085}");
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_deflate_stream_round_trips() {
        let stream = deflate_stream(dictionary! { "Type" => "CMap" }, b"BT ET").unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name_str().unwrap(), "FlateDecode");
        assert_eq!(stream.decompressed_content().unwrap(), b"BT ET");
    }

    #[test]
    fn test_rect_reads_mixed_numbers() {
        let doc = Document::new();
        let obj = Object::Array(vec![
            Object::Integer(100),
            Object::Real(720.5),
            Object::Integer(50),
            Object::Real(700.0),
        ]);
        let rect = rect(&doc, &obj).unwrap();
        assert_eq!(rect, Rect::new(50.0, 700.0, 100.0, 720.5));
    }

    #[test]
    fn test_get_inherited_walks_parent() {
        let mut doc = Document::new();
        let parent_id = doc.add_object(dictionary! {
            "FT" => "Btn",
            "Ff" => 32768,
        });
        let kid = dictionary! {
            "Parent" => parent_id,
            "Subtype" => "Widget",
        };

        let ft = get_inherited(&doc, &kid, b"FT").and_then(name);
        assert_eq!(ft.as_deref(), Some("Btn"));
        assert_eq!(get_inherited(&doc, &kid, b"Ff").and_then(integer), Some(32768));
        assert!(get_inherited(&doc, &kid, b"MaxLen").is_none());
    }
}
