//! Placement of drawn values inside widget rectangles

use crate::layout::TextToDraw;
use crate::template::WidgetAnnot;
use pdf_core::{Align, FontBook};

/// Rendered height of a line of text at `font_size`
fn string_height(font_size: f32) -> f64 {
    font_size as f64 * 96.0 / 72.0
}

/// Baseline that vertically centers a line in the widget
fn centered_baseline(annot: &WidgetAnnot, font_size: f32) -> f64 {
    let mid_y = annot.rect.mid_y();
    (mid_y - string_height(font_size) / 2.0 + mid_y) / 2.0
}

fn aligned_x(annot: &WidgetAnnot, alignment: Align, text_width: f64) -> f64 {
    match alignment {
        Align::Left => annot.rect.x1,
        Align::Center => annot.rect.mid_x() - text_width / 2.0,
        Align::Right => annot.rect.x2 - text_width,
    }
}

/// Position of a check box or radio symbol, centered in the widget
pub fn get_draw_checkbox_radio_coordinates(
    annot: &WidgetAnnot,
    draw: &TextToDraw,
    fonts: &FontBook,
) -> (f64, f64) {
    let width = fonts.text_width(&draw.font, draw.first_line(), draw.font_size);
    (
        annot.rect.mid_x() - width / 2.0,
        centered_baseline(annot, draw.font_size),
    )
}

/// Origin and size of the box an image is fitted into
pub fn get_draw_image_coordinates_resolutions(annot: &WidgetAnnot) -> (f64, f64, f64, f64) {
    (
        annot.rect.x1,
        annot.rect.y1,
        annot.rect.width(),
        annot.rect.height(),
    )
}

/// Baseline origin of the first line of a text value
///
/// Comb fields start at the left edge; their characters are spread by
/// [`get_character_x_paddings`]. Multiline text hangs from the top edge.
pub fn get_draw_text_coordinates(
    annot: &WidgetAnnot,
    draw: &TextToDraw,
    fonts: &FontBook,
) -> (f64, f64) {
    let x = if draw.comb_paddings.is_some() {
        annot.rect.x1
    } else {
        let width = fonts.text_width(&draw.font, draw.first_line(), draw.font_size);
        aligned_x(annot, annot.alignment, width)
    };

    let y = if annot.is_multiline() {
        annot.rect.y2 - string_height(draw.font_size) / 1.5
    } else {
        centered_baseline(annot, draw.font_size)
    };

    (x, y)
}

/// Per-line x coordinates of multiline text; `None` for single-line fields
pub fn get_text_line_x_coordinates(
    annot: &WidgetAnnot,
    draw: &TextToDraw,
    fonts: &FontBook,
) -> Option<Vec<f64>> {
    if !annot.is_multiline() {
        return None;
    }

    Some(
        draw.lines
            .iter()
            .map(|line| {
                let width = fonts.text_width(&draw.font, line, draw.font_size);
                aligned_x(annot, annot.alignment, width)
            })
            .collect(),
    )
}

/// Offsets of each character from the left edge of a comb field
///
/// The field is divided into [`TextToDraw::comb_cells`] cells and each
/// character is centered in its own cell.
pub fn get_character_x_paddings(
    annot: &WidgetAnnot,
    draw: &TextToDraw,
    fonts: &FontBook,
) -> Option<Vec<f64>> {
    let cells = draw.comb_cells?;
    let cell = annot.rect.width() / cells as f64;

    Some(
        draw.first_line()
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let char_width = fonts.text_width(&draw.font, &c.to_string(), draw.font_size);
                i as f64 * cell + (cell - char_width) / 2.0
            })
            .collect(),
    )
}
