//! Text preparation for drawn values: truncation, wrapping and run building

use crate::font::{checkbox_radio_font_size, text_field_font_size};
use crate::template::WidgetAnnot;
use crate::widgets::{ButtonStyle, Dropdown, Text};
use pdf_core::{Color, FontBook, TextRun};

/// Font used when neither the widget nor its `/DA` names one
pub const FALLBACK_FONT: &str = "Helvetica";

/// Font used for check box and radio symbols
pub const SYMBOL_FONT: &str = "ZapfDingbats";

/// Line spacing as a multiple of the font size
pub const LINE_LEADING: f64 = 1.2;

/// A value ready to be positioned and drawn
#[derive(Debug, Clone, PartialEq)]
pub struct TextToDraw {
    pub font: String,
    pub font_size: f32,
    pub color: Color,
    pub lines: Vec<String>,
    /// Per-line x coordinates for aligned multiline text
    pub line_x: Option<Vec<f64>>,
    /// Number of equal cells the value is spread over, for comb fields
    pub comb_cells: Option<usize>,
    /// Per-character x offsets for comb fields
    pub comb_paddings: Option<Vec<f64>>,
}

impl TextToDraw {
    pub fn new(
        font: impl Into<String>,
        font_size: f32,
        color: Color,
        lines: Vec<String>,
    ) -> Self {
        Self {
            font: font.into(),
            font_size,
            color,
            lines,
            line_x: None,
            comb_cells: None,
            comb_paddings: None,
        }
    }

    /// First line, used for single-line placement
    pub fn first_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }

    pub fn leading(&self) -> f64 {
        self.font_size as f64 * LINE_LEADING
    }

    /// Build the text run with the first baseline at `(x, y)`
    pub fn into_run(self, x: f64, y: f64) -> TextRun {
        let mut run = TextRun::new(self.font.clone(), self.font_size, self.color);

        if let Some(paddings) = &self.comb_paddings {
            for (c, padding) in self.first_line().chars().zip(paddings.iter()) {
                run.push(c.to_string(), x + padding, y);
            }
            return run;
        }

        let leading = self.leading();
        for (i, line) in self.lines.iter().enumerate() {
            let line_x = self
                .line_x
                .as_ref()
                .and_then(|xs| xs.get(i).copied())
                .unwrap_or(x);
            run.push(line.clone(), line_x, y - i as f64 * leading);
        }
        run
    }
}

/// Cut a value to at most `max_length` characters
pub fn truncate_to_max_length(value: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) => value.chars().take(max).collect(),
        None => value.to_string(),
    }
}

/// Split text into lines that fit `width` points
///
/// Explicit newlines always break. Within a paragraph words are packed
/// greedily; a single word wider than the line is broken between characters.
pub fn wrap_text_lines(
    text: &str,
    width: f64,
    font: &str,
    font_size: f32,
    fonts: &FontBook,
) -> Vec<String> {
    let fits = |s: &str| fonts.text_width(font, s, font_size) <= width;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                current.push(c);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::replace(&mut current, c.to_string()));
                }
            }
        }
        lines.push(current);
    }

    lines
}

fn resolve_color(widget_color: Option<Color>, annot: &WidgetAnnot) -> Color {
    widget_color.unwrap_or(annot.appearance.color)
}

fn resolve_font(widget_font: Option<&str>, annot: &WidgetAnnot) -> String {
    widget_font
        .or(annot.appearance.font.as_deref())
        .unwrap_or(FALLBACK_FONT)
        .to_string()
}

/// Prepare a text field value; `None` when the field has no value
pub fn text_to_draw(annot: &WidgetAnnot, text: &Text, fonts: &FontBook) -> Option<TextToDraw> {
    let value = text.value.as_deref()?;
    let max_length = text.max_length.or(annot.max_length);
    let value = truncate_to_max_length(value, max_length);

    let font = resolve_font(text.font.as_deref(), annot);
    let font_size = text.font_size.unwrap_or_else(|| text_field_font_size(annot));
    let color = resolve_color(text.font_color, annot);

    let lines = if annot.is_multiline() {
        wrap_text_lines(&value, annot.rect.width(), &font, font_size, fonts)
    } else {
        vec![value.replace(['\r', '\n'], " ")]
    };

    let mut draw = TextToDraw::new(font, font_size, color, lines);
    draw.comb_cells = max_length.filter(|cells| text.comb && *cells > 0);
    Some(draw)
}

/// Prepare the selected label of a choice field
pub fn dropdown_to_draw(annot: &WidgetAnnot, dropdown: &Dropdown) -> Option<TextToDraw> {
    let label = dropdown.selected()?;
    let font = resolve_font(dropdown.font.as_deref(), annot);
    let font_size = dropdown
        .font_size
        .unwrap_or_else(|| text_field_font_size(annot));
    let color = resolve_color(dropdown.font_color, annot);

    Some(TextToDraw::new(font, font_size, color, vec![label.to_string()]))
}

/// Prepare the symbol of a selected check box or radio button
pub fn checkbox_radio_to_draw(
    annot: &WidgetAnnot,
    style: ButtonStyle,
    size: Option<f32>,
    color: Option<Color>,
) -> TextToDraw {
    TextToDraw::new(
        SYMBOL_FONT,
        size.unwrap_or_else(|| checkbox_radio_font_size(annot)),
        resolve_color(color, annot),
        vec![style.symbol().to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_to_max_length("สวัสดี", Some(2)), "สว");
        assert_eq!(truncate_to_max_length("abc", None), "abc");
        assert_eq!(truncate_to_max_length("abc", Some(10)), "abc");
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        let fonts = FontBook::new();
        // Courier is 6pt per character at size 10
        let lines = wrap_text_lines("aaa bbb ccc", 45.0, "Courier", 10.0, &fonts);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_keeps_explicit_newlines() {
        let fonts = FontBook::new();
        let lines = wrap_text_lines("one\n\ntwo", 100.0, "Courier", 10.0, &fonts);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let fonts = FontBook::new();
        let lines = wrap_text_lines("abcdefgh", 26.0, "Courier", 10.0, &fonts);
        assert_eq!(lines, vec!["abcd", "efgh"]);
    }

    fn text_annot(flags: i64, max_length: Option<usize>) -> WidgetAnnot {
        WidgetAnnot {
            id: None,
            key: "zip".to_string(),
            page: 1,
            rect: pdf_core::Rect::new(0.0, 0.0, 100.0, 20.0),
            field_type: Some(crate::template::FieldType::Text),
            flags,
            appearance: Default::default(),
            alignment: pdf_core::Align::Left,
            max_length,
            choices: vec![],
            button_style: None,
        }
    }

    #[test]
    fn test_comb_cells_follow_widget_settings() {
        let fonts = FontBook::new();
        let annot = text_annot(crate::template::flags::COMB, Some(5));
        let mut text = Text {
            name: "zip".to_string(),
            value: Some("123456".to_string()),
            max_length: Some(5),
            comb: true,
            ..Default::default()
        };

        let draw = text_to_draw(&annot, &text, &fonts).unwrap();
        assert_eq!(draw.comb_cells, Some(5));
        assert_eq!(draw.lines, vec!["12345"]);

        text.comb = false;
        assert_eq!(text_to_draw(&annot, &text, &fonts).unwrap().comb_cells, None);

        // a plain field turned into a comb field by its settings
        text.comb = true;
        text.max_length = Some(4);
        let draw = text_to_draw(&text_annot(0, None), &text, &fonts).unwrap();
        assert_eq!(draw.comb_cells, Some(4));
        assert_eq!(draw.lines, vec!["1234"]);
    }

    #[test]
    fn test_into_run_stacks_lines() {
        let draw = TextToDraw::new(
            "Courier",
            10.0,
            Color::black(),
            vec!["a".to_string(), "b".to_string()],
        );
        let run = draw.into_run(5.0, 100.0);
        assert_eq!(run.spans.len(), 2);
        assert!((run.spans[1].y - 88.0).abs() < 1e-9);
        assert_eq!(run.spans[1].x, 5.0);
    }

    #[test]
    fn test_into_run_spreads_comb_characters() {
        let mut draw = TextToDraw::new("Courier", 10.0, Color::black(), vec!["12".to_string()]);
        draw.comb_paddings = Some(vec![7.0, 27.0]);
        let run = draw.into_run(100.0, 50.0);
        let xs: Vec<f64> = run.spans.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![107.0, 127.0]);
        assert_eq!(run.spans[1].text, "2");
    }
}
