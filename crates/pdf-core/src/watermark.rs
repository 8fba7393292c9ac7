//! Overlay layers ("watermarks") composited onto template pages
//!
//! A watermark collects the text runs and images destined for one page.
//! Merging opens the template once, draws every non-empty watermark on top of
//! its page and serializes the result.

use crate::document::{Color, PdfDocument};
use crate::{FontBook, PdfError, Result};
use tracing::debug;

/// One positioned string inside a text run
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Text drawn with a single font, size and color
///
/// A run holds one span for a single-line value, one span per line for
/// wrapped text, or one span per character for comb fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Registered TTF name or standard font name
    pub font: String,
    pub font_size: f32,
    pub color: Color,
    pub spans: Vec<TextSpan>,
}

impl TextRun {
    pub fn new(font: impl Into<String>, font_size: f32, color: Color) -> Self {
        Self {
            font: font.into(),
            font_size,
            color,
            spans: Vec::new(),
        }
    }

    /// A run with one span
    pub fn single(
        font: impl Into<String>,
        font_size: f32,
        color: Color,
        text: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Self {
        let mut run = Self::new(font, font_size, color);
        run.push(text, x, y);
        run
    }

    pub fn push(&mut self, text: impl Into<String>, x: f64, y: f64) {
        self.spans.push(TextSpan {
            text: text.into(),
            x,
            y,
        });
    }
}

/// An image placed into a box on the page
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// Encoded image bytes (any format the `image` crate decodes)
    pub data: Vec<u8>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImagePlacement {
    pub fn new(data: Vec<u8>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            data,
            x,
            y,
            width,
            height,
        }
    }
}

/// Anything that can be drawn on an overlay layer
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Text(TextRun),
    Image(ImagePlacement),
}

impl From<TextRun> for DrawItem {
    fn from(run: TextRun) -> Self {
        DrawItem::Text(run)
    }
}

impl From<ImagePlacement> for DrawItem {
    fn from(image: ImagePlacement) -> Self {
        DrawItem::Image(image)
    }
}

/// Overlay layer for one page (1-indexed)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watermark {
    pub page: usize,
    pub items: Vec<DrawItem>,
}

impl Watermark {
    pub fn new(page: usize, items: Vec<DrawItem>) -> Self {
        Self { page, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build one overlay per page where only `page` carries `items`
///
/// # Arguments
/// * `page_count` - Number of pages in the template
/// * `page` - Target page (1-indexed)
/// * `items` - Text runs or images to draw
pub fn create_watermarks_and_draw<T: Into<DrawItem>>(
    page_count: usize,
    page: usize,
    items: Vec<T>,
) -> Result<Vec<Watermark>> {
    if page == 0 || page > page_count {
        return Err(PdfError::InvalidPage(page, page_count));
    }

    let mut items = Some(items.into_iter().map(Into::into).collect::<Vec<_>>());
    Ok((1..=page_count)
        .map(|p| {
            let layer = if p == page {
                items.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            Watermark::new(p, layer)
        })
        .collect())
}

/// Composite each non-empty watermark onto its page
///
/// # Arguments
/// * `pdf` - Template PDF bytes
/// * `watermarks` - Overlay layers, at most one per page is typical
/// * `fonts` - Registered fonts referenced by text runs
pub fn merge_watermarks_with_pdf(
    pdf: &[u8],
    watermarks: &[Watermark],
    fonts: &FontBook,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::open_from_bytes(pdf)?.with_fonts(fonts.clone());

    for watermark in watermarks.iter().filter(|w| !w.is_empty()) {
        debug!(
            page = watermark.page,
            items = watermark.items.len(),
            "merging overlay"
        );
        for item in &watermark.items {
            match item {
                DrawItem::Text(run) => doc.insert_text(watermark.page, run)?,
                DrawItem::Image(image) => doc.insert_image(watermark.page, image)?,
            }
        }
    }

    doc.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_run_single() {
        let run = TextRun::single("Helv", 10.0, Color::black(), "abc", 5.0, 6.0);
        assert_eq!(run.spans.len(), 1);
        assert_eq!(run.spans[0].text, "abc");
        assert_eq!((run.spans[0].x, run.spans[0].y), (5.0, 6.0));
    }

    #[test]
    fn test_create_watermarks_and_draw_targets_one_page() {
        let run = TextRun::single("Helv", 10.0, Color::black(), "x", 0.0, 0.0);
        let watermarks = create_watermarks_and_draw(3, 2, vec![run]).unwrap();

        assert_eq!(watermarks.len(), 3);
        assert!(watermarks[0].is_empty());
        assert_eq!(watermarks[1].page, 2);
        assert_eq!(watermarks[1].items.len(), 1);
        assert!(watermarks[2].is_empty());
    }

    #[test]
    fn test_create_watermarks_and_draw_rejects_bad_page() {
        let result = create_watermarks_and_draw::<DrawItem>(1, 2, vec![]);
        assert!(matches!(result, Err(PdfError::InvalidPage(2, 1))));
        let result = create_watermarks_and_draw::<DrawItem>(1, 0, vec![]);
        assert!(matches!(result, Err(PdfError::InvalidPage(0, 1))));
    }

    #[test]
    fn test_image_placement_is_a_draw_item() {
        let image = ImagePlacement::new(vec![1, 2], 1.0, 2.0, 3.0, 4.0);
        assert_eq!(image.width, 3.0);
        assert!(matches!(DrawItem::from(image), DrawItem::Image(_)));
    }
}
