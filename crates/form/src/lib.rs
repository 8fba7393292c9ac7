//! Form - AcroForm inspection and filling
//!
//! This crate provides:
//! - Widget discovery and typing from a template's annotations
//! - Overlay filling: values drawn onto the pages as text and images
//! - Direct filling: `/V`, `/AS` and friends written into the field dictionaries
//! - A JSON data layer with a schema and sample data per template
//!
//! # Example
//!
//! ```ignore
//! use form::{FillOptions, FormWrapper};
//!
//! let mut form = FormWrapper::new(std::fs::read("template.pdf")?)?;
//! form.fill([("LastName", "Smith")], FillOptions::default())?;
//! std::fs::write("filled.pdf", form.read())?;
//! ```

pub mod coordinate;
pub mod filler;
pub mod font;
pub mod layout;
pub mod parser;
pub mod patterns;
pub mod template;
mod widgets;
mod wrapper;

pub use template::WidgetAnnot;
pub use widgets::*;
pub use wrapper::{FillOptions, FormWrapper, OverlayOptions, PdfWrapper};

use thiserror::Error;

/// Errors that can occur during form processing
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid value for '{key}': expected {expected}")]
    InvalidValue { key: String, expected: String },

    #[error("Failed to parse data: {0}")]
    ParseError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = FormError::InvalidValue {
            key: "agree".to_string(),
            expected: "a boolean".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for 'agree': expected a boolean");
    }
}
