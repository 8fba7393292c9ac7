//! PDF Core - Low-level PDF manipulation for form filling
//!
//! This crate provides functionality for:
//! - Loading PDF bytes and writing the drawn result back out
//! - Standard-14 and embedded TrueType font metrics
//! - Compositing overlay layers ("watermarks") of text and images onto pages
//! - Reading and encoding PDF objects (numbers, rectangles, text strings)
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Color, DrawItem, FontBook, TextRun, Watermark, merge_watermarks_with_pdf};
//!
//! let run = TextRun::single("Helvetica", 12.0, Color::black(), "Hello", 72.0, 700.0);
//! let watermark = Watermark::new(1, vec![DrawItem::Text(run)]);
//! let output = merge_watermarks_with_pdf(&template, &[watermark], &FontBook::new())?;
//! ```

mod document;
mod font;
mod image;
pub mod object;
mod text;
mod watermark;

pub use document::{Color, PdfDocument};
pub use font::{Font, FontBook, FontData, StandardFont};
pub use image::{any_image_to_jpg, fit_dimensions};
pub use text::{generate_text_operators, TextRenderContext};
pub use watermark::{
    create_watermarks_and_draw, merge_watermarks_with_pdf, DrawItem, ImagePlacement, TextRun,
    TextSpan, Watermark,
};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options (the `/Q` quadding of a form field)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Map a `/Q` value (0, 1, 2) to an alignment; anything else is left
    pub fn from_quadding(q: i64) -> Self {
        match q {
            1 => Align::Center,
            2 => Align::Right,
            _ => Align::Left,
        }
    }
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    /// Create a rectangle, normalizing the corners so `x1 <= x2` and `y1 <= y2`
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn mid_x(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        (self.y1 + self.y2) / 2.0
    }
}
