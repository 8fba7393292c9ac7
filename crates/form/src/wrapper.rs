//! High-level wrappers around a template and its widgets

use crate::filler::{fill, simple_fill};
use crate::parser::{json_to_field_value, parse_data};
use crate::template::{build_widgets, remove_all_widgets};
use crate::widgets::{FieldValue, Widget, Widgets};
use crate::Result;
use pdf_core::FontBook;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Options for filling field values directly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillOptions {
    /// Mark every filled field read-only
    pub flatten: bool,
    /// Set `/NeedAppearances` so viewers rebuild field appearances
    pub adobe_mode: bool,
}

/// Options for filling by drawing over the pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayOptions {
    /// Keep the interactive fields under the drawn values
    pub keep_widgets: bool,
}

fn apply_values<I, K, V>(widgets: &mut Widgets, data: I) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<FieldValue>,
{
    for (key, value) in data {
        let key = key.as_ref();
        match widgets.get_mut(key) {
            Some(widget) => widget.set_value(value.into())?,
            None => warn!(key, "no widget with this key, skipping"),
        }
    }
    Ok(())
}

fn apply_json(widgets: &mut Widgets, json: &str) -> Result<()> {
    for (key, value) in parse_data(json)? {
        let Some(widget) = widgets.get_mut(&key) else {
            warn!(key = %key, "no widget with this key, skipping");
            continue;
        };
        if let Some(value) = json_to_field_value(widget, &value)? {
            widget.set_value(value)?;
        }
    }
    Ok(())
}

/// Fills a form by writing values into its field dictionaries
///
/// Viewers render the values from the fields themselves, so the result stays
/// editable unless flattened.
#[derive(Debug, Clone)]
pub struct FormWrapper {
    stream: Vec<u8>,
    widgets: Widgets,
}

impl FormWrapper {
    /// Inspect a template
    pub fn new(template: Vec<u8>) -> Result<Self> {
        let widgets = build_widgets(&template)?;
        info!(widgets = widgets.len(), "loaded form template");
        Ok(Self {
            stream: template,
            widgets,
        })
    }

    /// Inspect a template file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(std::fs::read(path)?)
    }

    pub fn widgets(&self) -> &Widgets {
        &self.widgets
    }

    /// Mutable access to a widget, e.g. to change its render settings
    pub fn widget_mut(&mut self, key: &str) -> Option<&mut Widget> {
        self.widgets.get_mut(key)
    }

    /// JSON schema of the accepted fill data
    pub fn schema(&self) -> Value {
        self.widgets.schema()
    }

    /// Example fill data
    pub fn sample_data(&self) -> Value {
        self.widgets.sample_data()
    }

    /// Set values and write them into the current document
    pub fn fill<I, K, V>(&mut self, data: I, options: FillOptions) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        apply_values(&mut self.widgets, data)?;
        self.write_fields(options)?;
        Ok(self)
    }

    /// Like [`fill`](Self::fill), with the data given as a JSON object
    pub fn fill_json(&mut self, json: &str, options: FillOptions) -> Result<&mut Self> {
        apply_json(&mut self.widgets, json)?;
        self.write_fields(options)?;
        Ok(self)
    }

    fn write_fields(&mut self, options: FillOptions) -> Result<()> {
        self.stream = simple_fill(
            &self.stream,
            &self.widgets,
            options.flatten,
            options.adobe_mode,
        )?;
        Ok(())
    }

    /// Bytes of the current document
    pub fn read(&self) -> &[u8] {
        &self.stream
    }
}

/// Fills a form by drawing values over its pages
///
/// Fonts registered here can be named in a widget's `font` setting. After a
/// fill the interactive fields are removed unless
/// [`OverlayOptions::keep_widgets`] is set.
#[derive(Debug, Clone)]
pub struct PdfWrapper {
    stream: Vec<u8>,
    widgets: Widgets,
    fonts: FontBook,
}

impl PdfWrapper {
    /// Inspect a template
    pub fn new(template: Vec<u8>) -> Result<Self> {
        let widgets = build_widgets(&template)?;
        info!(widgets = widgets.len(), "loaded overlay template");
        Ok(Self {
            stream: template,
            widgets,
            fonts: FontBook::new(),
        })
    }

    /// Inspect a template file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(std::fs::read(path)?)
    }

    /// Use an existing set of registered fonts
    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    /// Register a TrueType font under `name`
    pub fn register_font(&mut self, name: &str, ttf_data: &[u8]) -> Result<&mut Self> {
        self.fonts.register(name, ttf_data)?;
        Ok(self)
    }

    pub fn widgets(&self) -> &Widgets {
        &self.widgets
    }

    /// Mutable access to a widget, e.g. to change its render settings
    pub fn widget_mut(&mut self, key: &str) -> Option<&mut Widget> {
        self.widgets.get_mut(key)
    }

    /// JSON schema of the accepted fill data
    pub fn schema(&self) -> Value {
        self.widgets.schema()
    }

    /// Example fill data
    pub fn sample_data(&self) -> Value {
        self.widgets.sample_data()
    }

    /// Set values and draw them over the current document
    pub fn fill<I, K, V>(&mut self, data: I, options: OverlayOptions) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        apply_values(&mut self.widgets, data)?;
        self.draw(options)?;
        Ok(self)
    }

    /// Like [`fill`](Self::fill), with the data given as a JSON object
    pub fn fill_json(&mut self, json: &str, options: OverlayOptions) -> Result<&mut Self> {
        apply_json(&mut self.widgets, json)?;
        self.draw(options)?;
        Ok(self)
    }

    fn draw(&mut self, options: OverlayOptions) -> Result<()> {
        let drawn = fill(&self.stream, &self.widgets, &self.fonts)?;
        self.stream = if options.keep_widgets {
            drawn
        } else {
            remove_all_widgets(&drawn)?
        };
        Ok(())
    }

    /// Bytes of the current document
    pub fn read(&self) -> &[u8] {
        &self.stream
    }
}
