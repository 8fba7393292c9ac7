//! WASM bindings for rspdfform
//!
//! This crate provides JavaScript-friendly API for:
//! - Inspecting a PDF form (schema and sample data)
//! - Filling field values directly, with optional flattening
//! - Drawing values over the pages with registered fonts and images
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { PdfForm } from 'form-wasm';
//!
//! await init();
//!
//! const form = PdfForm.fromBytes(pdfBytes);
//! console.log(form.schema());
//!
//! // Direct fill: values stay editable unless flattened
//! const filled = form.fill({ name: "Jane", agree: true }, false, true);
//!
//! // Overlay fill with a custom font and an image
//! form.registerFont('sarabun', fontBytes);
//! form.setImage('photo', pngBytes);
//! const drawn = form.fillOverlay({ name: "สมชาย" });
//! ```

use form::{FieldValue, FillOptions, FormWrapper, OverlayOptions, PdfWrapper};
use pdf_core::FontBook;
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn to_js(value: &serde_json::Value) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

/// A PDF form template
#[wasm_bindgen]
pub struct PdfForm {
    template: Vec<u8>,
    schema: serde_json::Value,
    sample_data: serde_json::Value,
    images: BTreeMap<String, Vec<u8>>,
    fonts: FontBook,
}

impl PdfForm {
    fn load(data: &[u8]) -> form::Result<PdfForm> {
        let form = FormWrapper::new(data.to_vec())?;
        Ok(PdfForm {
            template: data.to_vec(),
            schema: form.schema(),
            sample_data: form.sample_data(),
            images: BTreeMap::new(),
            fonts: FontBook::new(),
        })
    }

    fn fill_direct(&self, json: &str, options: FillOptions) -> form::Result<Vec<u8>> {
        let mut form = FormWrapper::new(self.template.clone())?;
        form.fill_json(json, options)?;
        Ok(form.read().to_vec())
    }

    fn fill_drawn(&self, json: &str) -> form::Result<Vec<u8>> {
        let mut pdf = PdfWrapper::new(self.template.clone())?.with_fonts(self.fonts.clone());
        for (key, data) in &self.images {
            if let Some(widget) = pdf.widget_mut(key) {
                widget.set_value(FieldValue::Image(data.clone()))?;
            }
        }
        pdf.fill_json(json, OverlayOptions::default())?;
        Ok(pdf.read().to_vec())
    }
}

#[wasm_bindgen]
impl PdfForm {
    /// Load a form from PDF bytes
    ///
    /// @param data - PDF file bytes (Uint8Array)
    /// @returns PdfForm instance
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(data: &[u8]) -> Result<PdfForm, JsValue> {
        PdfForm::load(data).map_err(js_error)
    }

    /// JSON schema of the accepted fill data
    pub fn schema(&self) -> Result<JsValue, JsValue> {
        to_js(&self.schema)
    }

    /// Example fill data covering every field
    #[wasm_bindgen(js_name = sampleData)]
    pub fn sample_data(&self) -> Result<JsValue, JsValue> {
        to_js(&self.sample_data)
    }

    /// Set the image drawn into a signature or image field by `fillOverlay`
    ///
    /// @param key - Field name
    /// @param data - Image bytes (Uint8Array, JPEG or PNG)
    #[wasm_bindgen(js_name = setImage)]
    pub fn set_image(&mut self, key: &str, data: &[u8]) {
        self.images.insert(key.to_string(), data.to_vec());
    }

    /// Register a TrueType font usable by `fillOverlay`
    ///
    /// @param name - Font identifier
    /// @param data - TTF file bytes (Uint8Array)
    #[wasm_bindgen(js_name = registerFont)]
    pub fn register_font(&mut self, name: &str, data: &[u8]) -> Result<(), JsValue> {
        self.fonts.register(name, data).map_err(js_error)
    }

    /// Write values into the form fields
    ///
    /// @param data - Object of field name to value
    /// @param flatten - Mark filled fields read-only
    /// @param adobeMode - Ask viewers to regenerate appearances
    /// @returns PDF bytes (Uint8Array)
    pub fn fill(&self, data: JsValue, flatten: bool, adobe_mode: bool) -> Result<Vec<u8>, JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(data)?;
        let json = serde_json::to_string(&value).map_err(js_error)?;
        let options = FillOptions {
            flatten,
            adobe_mode,
        };
        self.fill_direct(&json, options).map_err(js_error)
    }

    /// Draw values over the pages and remove the form fields
    ///
    /// @param data - Object of field name to value
    /// @returns PDF bytes (Uint8Array)
    #[wasm_bindgen(js_name = fillOverlay)]
    pub fn fill_overlay(&self, data: JsValue) -> Result<Vec<u8>, JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(data)?;
        let json = serde_json::to_string(&value).map_err(js_error)?;
        self.fill_drawn(&json).map_err(js_error)
    }
}
