//! Text rendering utilities

use crate::document::Color;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text color (RGB)
    pub color: Color,
}

/// Format a coordinate for a content stream, dropping a trailing `.0`
pub(crate) fn fmt_num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Generate PDF operators for text insertion
///
/// Creates the text operators (BT, rg, Tf, Td, Tj, ET) that show one
/// already-encoded string at a baseline position. Placement (alignment,
/// wrapping, comb cells) is decided by the caller.
///
/// # Arguments
/// * `encoded` - Encoded string operand, literal `(..)` or hex `<..>`
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `ctx` - Text rendering context
pub fn generate_text_operators(encoded: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");

    ops.push_str(&format!(
        "{} {} {} rg\n",
        fmt_num(ctx.color.r as f64),
        fmt_num(ctx.color.g as f64),
        fmt_num(ctx.color.b as f64)
    ));

    ops.push_str(&format!(
        "/{} {} Tf\n",
        ctx.font_name,
        fmt_num(ctx.font_size as f64)
    ));

    ops.push_str(&format!("{} {} Td\n", fmt_num(x), fmt_num(y)));

    ops.push_str(&format!("{encoded} Tj\n"));

    ops.push_str("ET\n");

    ops.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(font: &str, size: f32, color: Color) -> TextRenderContext {
        TextRenderContext {
            font_name: font.to_string(),
            font_size: size,
            color,
        }
    }

    #[test]
    fn test_generate_text_operators() {
        let ctx = ctx("F1", 12.0, Color::black());
        let ops = generate_text_operators("(Hello)", 100.0, 700.0, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.starts_with("BT\n"));
        assert!(ops_str.contains("0 0 0 rg"));
        assert!(ops_str.contains("/F1 12 Tf"));
        assert!(ops_str.contains("100 700 Td"));
        assert!(ops_str.contains("(Hello) Tj"));
        assert!(ops_str.ends_with("ET\n"));
    }

    #[test]
    fn test_generate_text_operators_fractional_position() {
        let ctx = ctx("FF1", 9.5, Color::black());
        let ops = generate_text_operators("<0041>", 102.5, 710.125, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("/FF1 9.5 Tf"));
        assert!(ops_str.contains("102.5 710.125 Td"));
        assert!(ops_str.contains("<0041> Tj"));
    }

    #[test]
    fn test_generate_text_operators_with_color() {
        let ops = generate_text_operators("(A)", 0.0, 0.0, &ctx("F1", 12.0, Color::red()));
        let ops_str = String::from_utf8(ops).unwrap();
        assert!(ops_str.contains("1 0 0 rg"));
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(12.0), "12");
        assert_eq!(fmt_num(-50.0), "-50");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.333");
    }
}
