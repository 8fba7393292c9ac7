//! Template inspection: widget annotations, keys and widget construction

use crate::widgets::{ButtonStyle, Checkbox, Dropdown, ImageField, Radio, Text, Widget, Widgets};
use crate::{FormError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf_core::object::{self, get_inherited, get_resolved};
use pdf_core::{Align, Color, Rect};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Field flag bits (`/Ff`)
pub mod flags {
    pub const READ_ONLY: i64 = 1;
    pub const MULTILINE: i64 = 1 << 12;
    pub const RADIO: i64 = 1 << 15;
    pub const PUSHBUTTON: i64 = 1 << 16;
    pub const COMB: i64 = 1 << 24;
}

/// Field type (`/FT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Button,
    Choice,
    Signature,
}

impl FieldType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Tx" => Some(FieldType::Text),
            "Btn" => Some(FieldType::Button),
            "Ch" => Some(FieldType::Choice),
            "Sig" => Some(FieldType::Signature),
            _ => None,
        }
    }
}

/// Parsed default appearance string (`/DA`)
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAppearance {
    /// Font resource name, e.g. `Helv`
    pub font: Option<String>,
    /// Font size, 0 meaning auto
    pub font_size: f32,
    pub color: Color,
}

impl Default for DefaultAppearance {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            color: Color::black(),
        }
    }
}

impl DefaultAppearance {
    /// Parse the `Tf` and color operators of a `/DA` string
    pub fn parse(da: &str) -> Self {
        let mut appearance = Self::default();
        let mut operands: Vec<&str> = Vec::new();
        let num = |s: &str| s.parse::<f32>().unwrap_or(0.0);

        for token in da.split_whitespace() {
            match token {
                "Tf" if operands.len() >= 2 => {
                    let n = operands.len();
                    appearance.font = Some(operands[n - 2].trim_start_matches('/').to_string());
                    appearance.font_size = num(operands[n - 1]);
                }
                "g" if !operands.is_empty() => {
                    appearance.color = Color::gray(num(operands[operands.len() - 1]));
                }
                "rg" if operands.len() >= 3 => {
                    let n = operands.len();
                    appearance.color = Color::rgb(
                        num(operands[n - 3]),
                        num(operands[n - 2]),
                        num(operands[n - 1]),
                    );
                }
                "k" if operands.len() >= 4 => {
                    let n = operands.len();
                    appearance.color = Color::from_cmyk(
                        num(operands[n - 4]),
                        num(operands[n - 3]),
                        num(operands[n - 2]),
                        num(operands[n - 1]),
                    );
                }
                _ if token.starts_with('/') || token.parse::<f32>().is_ok() => {
                    operands.push(token);
                    continue;
                }
                _ => {}
            }
            operands.clear();
        }

        appearance
    }
}

/// Snapshot of a widget annotation as needed for filling
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetAnnot {
    /// Object ID when the annotation is an indirect object
    pub id: Option<ObjectId>,
    pub key: String,
    /// Page number (1-indexed)
    pub page: usize,
    pub rect: Rect,
    pub field_type: Option<FieldType>,
    pub flags: i64,
    pub appearance: DefaultAppearance,
    pub alignment: Align,
    pub max_length: Option<usize>,
    /// Display strings of a choice field's options
    pub choices: Vec<String>,
    pub button_style: Option<ButtonStyle>,
}

impl WidgetAnnot {
    pub fn has_flag(&self, flag: i64) -> bool {
        self.flags & flag != 0
    }

    pub fn is_multiline(&self) -> bool {
        self.field_type == Some(FieldType::Text) && self.has_flag(flags::MULTILINE)
    }

    pub fn is_comb(&self) -> bool {
        self.field_type == Some(FieldType::Text)
            && self.has_flag(flags::COMB)
            && self.max_length.is_some()
    }
}

/// Key of a widget annotation: its `/T`, or the nearest `/T` up the `/Parent` chain
pub fn get_widget_key(doc: &Document, annot: &Dictionary) -> Option<String> {
    let mut current = annot;
    for _ in 0..object::MAX_PARENT_DEPTH {
        if let Some(key) = get_resolved(doc, current, b"T").and_then(object::text) {
            return Some(key);
        }
        current = get_resolved(doc, current, b"Parent")?.as_dict().ok()?;
    }
    None
}

pub(crate) fn is_widget(doc: &Document, dict: &Dictionary) -> bool {
    get_resolved(doc, dict, b"Subtype").and_then(object::name).as_deref() == Some("Widget")
}

/// Read the fill-relevant attributes of a widget annotation
pub fn read_widget_annot(
    doc: &Document,
    annot: &Dictionary,
    id: Option<ObjectId>,
    page: usize,
) -> Option<WidgetAnnot> {
    let key = get_widget_key(doc, annot)?;

    let rect = get_resolved(doc, annot, b"Rect")
        .and_then(|r| object::rect(doc, r))
        .unwrap_or_default();
    let field_type = get_inherited(doc, annot, b"FT")
        .and_then(object::name)
        .and_then(|n| FieldType::from_name(&n));
    let flags = get_inherited(doc, annot, b"Ff")
        .and_then(object::integer)
        .unwrap_or(0);

    let da = get_inherited(doc, annot, b"DA")
        .and_then(object::text)
        .or_else(|| acroform_default_appearance(doc));
    let appearance = da.as_deref().map(DefaultAppearance::parse).unwrap_or_default();

    let alignment = get_inherited(doc, annot, b"Q")
        .and_then(object::integer)
        .map(Align::from_quadding)
        .unwrap_or_default();
    let max_length = get_inherited(doc, annot, b"MaxLen")
        .and_then(object::integer)
        .filter(|&n| n > 0)
        .map(|n| n as usize);

    let choices = get_inherited(doc, annot, b"Opt")
        .and_then(|o| o.as_array().ok())
        .map(|options| {
            options
                .iter()
                .filter_map(|opt| choice_label(doc, opt))
                .collect()
        })
        .unwrap_or_default();

    let button_style = get_resolved(doc, annot, b"MK")
        .and_then(|mk| mk.as_dict().ok())
        .and_then(|mk| get_resolved(doc, mk, b"CA"))
        .and_then(object::text)
        .and_then(|ca| ButtonStyle::from_caption(&ca));

    Some(WidgetAnnot {
        id,
        key,
        page,
        rect,
        field_type,
        flags,
        appearance,
        alignment,
        max_length,
        choices,
        button_style,
    })
}

/// Display string of an `/Opt` entry; `[export display]` pairs use the display string
fn choice_label(doc: &Document, opt: &Object) -> Option<String> {
    match object::resolve(doc, opt)? {
        Object::Array(pair) => pair
            .get(1)
            .or_else(|| pair.first())
            .and_then(|o| object::resolve(doc, o))
            .and_then(object::text),
        other => object::text(other),
    }
}

pub(crate) fn catalog(doc: &Document) -> Option<&Dictionary> {
    doc.trailer
        .get(b"Root")
        .ok()
        .and_then(|root| object::resolve_dict(doc, root))
}

fn acroform_default_appearance(doc: &Document) -> Option<String> {
    let acroform = get_resolved(doc, catalog(doc)?, b"AcroForm")?.as_dict().ok()?;
    get_resolved(doc, acroform, b"DA").and_then(object::text)
}

/// Annotation entries of a page, resolved to dictionaries
pub(crate) fn page_annotations<'a>(
    doc: &'a Document,
    page_id: ObjectId,
) -> Vec<(Option<ObjectId>, &'a Dictionary)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(annots) = get_resolved(doc, page, b"Annots").and_then(|a| a.as_array().ok()) else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|entry| match entry {
            Object::Reference(id) => doc.get_dictionary(*id).ok().map(|d| (Some(*id), d)),
            Object::Dictionary(d) => Some((None, d)),
            _ => None,
        })
        .collect()
}

/// Widget annotations of every page (1-indexed), in `/Annots` order
pub fn widgets_in_document(doc: &Document) -> BTreeMap<usize, Vec<WidgetAnnot>> {
    let mut result = BTreeMap::new();

    for (page_number, page_id) in doc.get_pages() {
        let page = page_number as usize;
        let widgets: Vec<WidgetAnnot> = page_annotations(doc, page_id)
            .into_iter()
            .filter(|(_, dict)| is_widget(doc, dict))
            .filter_map(|(id, dict)| {
                let annot = read_widget_annot(doc, dict, id, page);
                if annot.is_none() {
                    warn!(page, "skipping widget without a field name");
                }
                annot
            })
            .collect();
        result.insert(page, widgets);
    }

    result
}

/// Widget annotations of a PDF, grouped by page
pub fn get_widgets_by_page(pdf: &[u8]) -> Result<BTreeMap<usize, Vec<WidgetAnnot>>> {
    let doc = load(pdf)?;
    Ok(widgets_in_document(&doc))
}

pub(crate) fn load(pdf: &[u8]) -> Result<Document> {
    Document::load_mem(pdf)
        .map_err(|e| FormError::PdfError(pdf_core::PdfError::OpenError(e.to_string())))
}

/// Build the widget for an annotation; `None` when its type is not fillable
pub fn construct_widget(annot: &WidgetAnnot, key: &str) -> Option<Widget> {
    let name = key.to_string();
    let widget = match annot.field_type? {
        FieldType::Text => Widget::Text(Text {
            name,
            max_length: annot.max_length,
            comb: annot.is_comb(),
            ..Default::default()
        }),
        FieldType::Button if annot.has_flag(flags::PUSHBUTTON) => {
            Widget::Image(ImageField { name, value: None })
        }
        FieldType::Button if annot.has_flag(flags::RADIO) => Widget::Radio(Radio {
            name,
            value: None,
            size: None,
            button_style: annot.button_style.unwrap_or(ButtonStyle::Circle),
            font_color: None,
            number_of_options: 1,
        }),
        FieldType::Button => Widget::Checkbox(Checkbox {
            name,
            button_style: annot.button_style.unwrap_or_default(),
            ..Default::default()
        }),
        FieldType::Choice => Widget::Dropdown(Dropdown {
            name,
            choices: annot.choices.clone(),
            ..Default::default()
        }),
        FieldType::Signature => Widget::Signature(ImageField { name, value: None }),
    };
    Some(widget)
}

/// Build every widget of a document
///
/// The first annotation of a key constructs the widget; each further
/// annotation of a radio key adds an option.
pub fn build_widgets_from_document(doc: &Document) -> Widgets {
    let mut widgets = Widgets::new();

    for annots in widgets_in_document(doc).into_values() {
        for annot in annots {
            match widgets.get_mut(&annot.key) {
                Some(Widget::Radio(radio)) => radio.number_of_options += 1,
                Some(_) => {}
                None => {
                    if let Some(widget) = construct_widget(&annot, &annot.key) {
                        debug!(key = %annot.key, kind = widget.kind(), "found widget");
                        widgets.insert(widget);
                    }
                }
            }
        }
    }

    widgets
}

/// Build every widget of a PDF
pub fn build_widgets(pdf: &[u8]) -> Result<Widgets> {
    let doc = load(pdf)?;
    Ok(build_widgets_from_document(&doc))
}

/// Strip widget annotations from every page and drop the AcroForm
pub fn remove_all_widgets_from_document(doc: &mut Document) -> Result<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let kept: Vec<Object> = {
            let Ok(page) = doc.get_dictionary(page_id) else {
                continue;
            };
            let Some(annots) = get_resolved(doc, page, b"Annots").and_then(|a| a.as_array().ok())
            else {
                continue;
            };
            annots
                .iter()
                .filter(|entry| {
                    object::resolve_dict(doc, entry)
                        .map(|d| !is_widget(doc, d))
                        .unwrap_or(true)
                })
                .cloned()
                .collect()
        };

        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        if kept.is_empty() {
            page.remove(b"Annots");
        } else {
            page.set("Annots", Object::Array(kept));
        }
    }

    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_object_mut(root_id)?.as_dict_mut()?.remove(b"AcroForm");
    doc.prune_objects();
    Ok(())
}

/// Strip widget annotations from a PDF
pub fn remove_all_widgets(pdf: &[u8]) -> Result<Vec<u8>> {
    let mut doc = load(pdf)?;
    remove_all_widgets_from_document(&mut doc)?;
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    #[test]
    fn test_parse_default_appearance() {
        let da = DefaultAppearance::parse("/Helv 12 Tf 0 0 1 rg");
        assert_eq!(da.font.as_deref(), Some("Helv"));
        assert_eq!(da.font_size, 12.0);
        assert_eq!(da.color, Color::blue());

        let da = DefaultAppearance::parse("0.5 g /Cour 0 Tf");
        assert_eq!(da.font.as_deref(), Some("Cour"));
        assert_eq!(da.font_size, 0.0);
        assert_eq!(da.color, Color::gray(0.5));

        let da = DefaultAppearance::parse("");
        assert_eq!(da, DefaultAppearance::default());
    }

    #[test]
    fn test_widget_key_from_parent() {
        let mut doc = Document::new();
        let parent_id = doc.add_object(dictionary! {
            "T" => Object::String(b"color".to_vec(), StringFormat::Literal),
        });
        let kid = dictionary! { "Parent" => parent_id, "Subtype" => "Widget" };
        assert_eq!(get_widget_key(&doc, &kid).as_deref(), Some("color"));
        assert_eq!(get_widget_key(&doc, &dictionary! {}), None);
    }

    #[test]
    fn test_read_widget_annot_inherits_from_parent() {
        let mut doc = Document::new();
        let parent_id = doc.add_object(dictionary! {
            "FT" => "Ch",
            "T" => Object::string_literal("country"),
            "DA" => Object::string_literal("/Helv 9 Tf 0 g"),
            "Opt" => vec![
                Object::string_literal("Thailand"),
                Object::Array(vec![Object::string_literal("JP"), Object::string_literal("Japan")]),
            ],
        });
        let kid = dictionary! {
            "Parent" => parent_id,
            "Subtype" => "Widget",
            "Rect" => vec![10.into(), 20.into(), 110.into(), 40.into()],
        };

        let annot = read_widget_annot(&doc, &kid, None, 1).unwrap();
        assert_eq!(annot.key, "country");
        assert_eq!(annot.field_type, Some(FieldType::Choice));
        assert_eq!(annot.choices, vec!["Thailand", "Japan"]);
        assert_eq!(annot.appearance.font_size, 9.0);
        assert_eq!(annot.rect, Rect::new(10.0, 20.0, 110.0, 40.0));
    }

    fn annot(field_type: FieldType, flags: i64) -> WidgetAnnot {
        WidgetAnnot {
            id: None,
            key: "k".to_string(),
            page: 1,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            field_type: Some(field_type),
            flags,
            appearance: DefaultAppearance::default(),
            alignment: Align::Left,
            max_length: Some(4),
            choices: vec![],
            button_style: Some(ButtonStyle::Cross),
        }
    }

    #[test]
    fn test_construct_widget_kinds() {
        let kind = |ft, f| construct_widget(&annot(ft, f), "k").map(|w| w.kind());
        assert_eq!(kind(FieldType::Text, 0), Some("text"));
        assert_eq!(kind(FieldType::Button, 0), Some("checkbox"));
        assert_eq!(kind(FieldType::Button, flags::RADIO), Some("radio"));
        assert_eq!(kind(FieldType::Button, flags::PUSHBUTTON), Some("image"));
        assert_eq!(kind(FieldType::Choice, 0), Some("dropdown"));
        assert_eq!(kind(FieldType::Signature, 0), Some("signature"));

        let mut untyped = annot(FieldType::Text, 0);
        untyped.field_type = None;
        assert_eq!(construct_widget(&untyped, "k"), None);
    }

    #[test]
    fn test_construct_text_widget_reads_comb() {
        match construct_widget(&annot(FieldType::Text, flags::COMB), "k") {
            Some(Widget::Text(text)) => {
                assert!(text.comb);
                assert_eq!(text.max_length, Some(4));
            }
            other => panic!("unexpected widget {other:?}"),
        }
        match construct_widget(&annot(FieldType::Button, 0), "k") {
            Some(Widget::Checkbox(cb)) => assert_eq!(cb.button_style, ButtonStyle::Cross),
            other => panic!("unexpected widget {other:?}"),
        }
    }
}
