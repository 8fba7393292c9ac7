//! Widget types and fill values

use crate::{FormError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub use pdf_core::Color;

/// Symbol drawn for a selected check box or radio button
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Check,
    Cross,
    Circle,
}

impl ButtonStyle {
    /// ZapfDingbats character for this style
    pub fn symbol(&self) -> char {
        match self {
            ButtonStyle::Check => '4',
            ButtonStyle::Cross => '8',
            ButtonStyle::Circle => 'l',
        }
    }

    /// Style from a widget's normal caption (`/MK /CA`)
    pub fn from_caption(caption: &str) -> Option<Self> {
        match caption {
            "4" => Some(ButtonStyle::Check),
            "5" | "8" => Some(ButtonStyle::Cross),
            "l" => Some(ButtonStyle::Circle),
            _ => None,
        }
    }
}

/// A text field
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Text {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    /// Registered font name or standard font name; defaults to the field's `/DA` font
    #[serde(default)]
    pub font: Option<String>,
    /// Font size in points; defaults to the `/DA` size or an automatic size
    #[serde(default, rename = "fontSize")]
    pub font_size: Option<f32>,
    #[serde(default, rename = "fontColor")]
    pub font_color: Option<Color>,
    #[serde(default, rename = "maxLength")]
    pub max_length: Option<usize>,
    /// Characters are spread over `max_length` equal cells
    #[serde(default)]
    pub comb: bool,
}

/// A check box
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Checkbox {
    pub name: String,
    #[serde(default)]
    pub value: Option<bool>,
    /// Symbol size in points; defaults to a size derived from the widget box
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default, rename = "buttonStyle")]
    pub button_style: ButtonStyle,
    #[serde(default, rename = "fontColor")]
    pub font_color: Option<Color>,
}

/// A radio button group; the value is the index of the selected option
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Radio {
    pub name: String,
    #[serde(default)]
    pub value: Option<usize>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default = "default_radio_style", rename = "buttonStyle")]
    pub button_style: ButtonStyle,
    #[serde(default, rename = "fontColor")]
    pub font_color: Option<Color>,
    /// Number of widget annotations in the group
    #[serde(rename = "numberOfOptions")]
    pub number_of_options: usize,
}

fn default_radio_style() -> ButtonStyle {
    ButtonStyle::Circle
}

/// A choice field; the value is the index of the selected choice
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dropdown {
    pub name: String,
    #[serde(default)]
    pub value: Option<usize>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default, rename = "fontSize")]
    pub font_size: Option<f32>,
    #[serde(default, rename = "fontColor")]
    pub font_color: Option<Color>,
}

impl Dropdown {
    /// Label of the selected choice
    pub fn selected(&self) -> Option<&str> {
        self.value
            .and_then(|i| self.choices.get(i))
            .map(String::as_str)
    }
}

/// A signature or image field holding encoded image bytes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageField {
    pub name: String,
    #[serde(skip)]
    pub value: Option<Vec<u8>>,
}

/// A fillable widget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    Text(Text),
    Checkbox(Checkbox),
    Radio(Radio),
    Dropdown(Dropdown),
    Signature(ImageField),
    Image(ImageField),
}

/// A value to fill into a widget
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Check(bool),
    Index(usize),
    Image(Vec<u8>),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Check(b)
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::Index(i)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        FieldValue::Image(bytes)
    }
}

fn invalid(key: &str, expected: impl Into<String>) -> FormError {
    FormError::InvalidValue {
        key: key.to_string(),
        expected: expected.into(),
    }
}

impl Widget {
    pub fn name(&self) -> &str {
        match self {
            Widget::Text(w) => &w.name,
            Widget::Checkbox(w) => &w.name,
            Widget::Radio(w) => &w.name,
            Widget::Dropdown(w) => &w.name,
            Widget::Signature(w) | Widget::Image(w) => &w.name,
        }
    }

    /// Short kind name, as used in the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Widget::Text(_) => "text",
            Widget::Checkbox(_) => "checkbox",
            Widget::Radio(_) => "radio",
            Widget::Dropdown(_) => "dropdown",
            Widget::Signature(_) => "signature",
            Widget::Image(_) => "image",
        }
    }

    pub fn has_value(&self) -> bool {
        match self {
            Widget::Text(w) => w.value.is_some(),
            Widget::Checkbox(w) => w.value.is_some(),
            Widget::Radio(w) => w.value.is_some(),
            Widget::Dropdown(w) => w.value.is_some(),
            Widget::Signature(w) | Widget::Image(w) => w.value.is_some(),
        }
    }

    /// Set the widget's value, checking it against the widget kind
    ///
    /// Text fields also take numbers, dropdowns take a choice label as well
    /// as an index.
    pub fn set_value(&mut self, value: FieldValue) -> Result<()> {
        match (self, value) {
            (Widget::Text(w), FieldValue::Text(s)) => w.value = Some(s),
            (Widget::Text(w), FieldValue::Index(i)) => w.value = Some(i.to_string()),
            (Widget::Text(w), _) => return Err(invalid(&w.name, "a string")),

            (Widget::Checkbox(w), FieldValue::Check(b)) => w.value = Some(b),
            (Widget::Checkbox(w), _) => return Err(invalid(&w.name, "a boolean")),

            (Widget::Radio(w), FieldValue::Index(i)) if i < w.number_of_options => {
                w.value = Some(i)
            }
            (Widget::Radio(w), _) => {
                return Err(invalid(
                    &w.name,
                    format!("an option index below {}", w.number_of_options),
                ))
            }

            (Widget::Dropdown(w), FieldValue::Index(i)) if i < w.choices.len() => {
                w.value = Some(i)
            }
            (Widget::Dropdown(w), FieldValue::Text(label)) => {
                let index = w.choices.iter().position(|c| *c == label).ok_or_else(|| {
                    invalid(&w.name, format!("one of {:?}", w.choices))
                })?;
                w.value = Some(index);
            }
            (Widget::Dropdown(w), _) => {
                return Err(invalid(
                    &w.name,
                    format!("a choice index below {} or a choice label", w.choices.len()),
                ))
            }

            (Widget::Signature(w) | Widget::Image(w), FieldValue::Image(bytes)) => {
                w.value = Some(bytes)
            }
            (Widget::Signature(w) | Widget::Image(w), _) => {
                return Err(invalid(&w.name, "image bytes"))
            }
        }
        Ok(())
    }

    /// JSON schema fragment describing the accepted value
    pub fn schema_definition(&self) -> Value {
        match self {
            Widget::Text(w) => match w.max_length {
                Some(max) => json!({ "type": "string", "maxLength": max }),
                None => json!({ "type": "string" }),
            },
            Widget::Checkbox(_) => json!({ "type": "boolean" }),
            Widget::Radio(w) => json!({
                "type": "integer",
                "minimum": 0,
                "maximum": w.number_of_options.saturating_sub(1),
            }),
            Widget::Dropdown(w) => json!({
                "type": "integer",
                "minimum": 0,
                "maximum": w.choices.len().saturating_sub(1),
                "description": w.choices.join(", "),
            }),
            Widget::Signature(_) | Widget::Image(_) => json!({
                "type": "string",
                "description": "path to an image file",
            }),
        }
    }

    /// Example value accepted by `schema_definition`
    pub fn sample_value(&self) -> Value {
        match self {
            Widget::Text(w) => {
                let sample: String = match w.max_length {
                    Some(max) => w.name.chars().take(max).collect(),
                    None => w.name.clone(),
                };
                Value::String(sample)
            }
            Widget::Checkbox(_) => Value::Bool(true),
            Widget::Radio(w) => json!(w.number_of_options.saturating_sub(1)),
            Widget::Dropdown(w) => json!(w.choices.len().saturating_sub(1)),
            Widget::Signature(_) | Widget::Image(_) => Value::Null,
        }
    }
}

/// Widgets of a template keyed by field name, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widgets {
    entries: Vec<Widget>,
    index: HashMap<String, usize>,
}

impl Widgets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a widget, replacing any widget with the same name
    pub fn insert(&mut self, widget: Widget) {
        match self.index.get(widget.name()) {
            Some(&i) => self.entries[i] = widget,
            None => {
                self.index.insert(widget.name().to_string(), self.entries.len());
                self.entries.push(widget);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Widget> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Widget> {
        self.index.get(key).map(|&i| &mut self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Widget> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON schema of the data accepted by `fill_json`
    pub fn schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .iter()
            .map(|w| (w.name().to_string(), w.schema_definition()))
            .collect();
        json!({ "type": "object", "properties": properties })
    }

    /// Example data covering every widget
    pub fn sample_data(&self) -> Value {
        let data: serde_json::Map<String, Value> = self
            .iter()
            .map(|w| (w.name().to_string(), w.sample_value()))
            .collect();
        Value::Object(data)
    }
}

impl<'a> IntoIterator for &'a Widgets {
    type Item = &'a Widget;
    type IntoIter = std::slice::Iter<'a, Widget>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
