//! Filling: drawing values over the template, or writing them into the fields

use crate::coordinate::{
    get_character_x_paddings, get_draw_checkbox_radio_coordinates,
    get_draw_image_coordinates_resolutions, get_draw_text_coordinates,
    get_text_line_x_coordinates,
};
use crate::layout::{checkbox_radio_to_draw, dropdown_to_draw, text_to_draw, TextToDraw};
use crate::patterns::{
    page_annotation_ids, simple_clear_radio_value, simple_flatten_generic, simple_flatten_radio,
    simple_update_checkbox_value, simple_update_dropdown_value, simple_update_radio_value,
    simple_update_text_value,
};
use crate::template::{self, get_widget_key, is_widget, WidgetAnnot};
use crate::widgets::{Checkbox, ImageField, Radio, Widget, Widgets};
use crate::Result;
use lopdf::{Document, Object};
use pdf_core::{
    any_image_to_jpg, create_watermarks_and_draw, merge_watermarks_with_pdf, DrawItem, FontBook,
    ImagePlacement, TextRun,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A check box or radio widget being drawn
#[derive(Debug, Clone, Copy)]
pub enum Toggle<'a> {
    Checkbox(&'a Checkbox),
    Radio(&'a Radio),
}

/// Prepare the symbol of a check box or radio annotation
///
/// `radio_tracker` counts the annotations seen so far per radio key; the
/// annotation whose position matches the selected index is drawn.
pub fn check_radio_handler(
    annot: &WidgetAnnot,
    toggle: Toggle<'_>,
    radio_tracker: &mut HashMap<String, usize>,
    fonts: &FontBook,
) -> (TextToDraw, f64, f64, bool) {
    let (draw, need_to_draw) = match toggle {
        Toggle::Checkbox(checkbox) => (
            checkbox_radio_to_draw(
                annot,
                checkbox.button_style,
                checkbox.size,
                checkbox.font_color,
            ),
            checkbox.value == Some(true),
        ),
        Toggle::Radio(radio) => {
            let seen = radio_tracker.entry(annot.key.clone()).or_insert(0);
            *seen += 1;
            (
                checkbox_radio_to_draw(annot, radio.button_style, radio.size, radio.font_color),
                radio.value == Some(*seen - 1),
            )
        }
    };

    let (x, y) = get_draw_checkbox_radio_coordinates(annot, &draw, fonts);
    (draw, x, y, need_to_draw)
}

/// Queue a signature or image value to be fitted into its annotation
///
/// Returns whether anything was queued.
pub fn signature_image_handler(
    annot: &WidgetAnnot,
    field: &ImageField,
    images: &mut Vec<ImagePlacement>,
) -> Result<bool> {
    let Some(data) = &field.value else {
        return Ok(false);
    };

    let jpg = any_image_to_jpg(data)?;
    let (x, y, width, height) = get_draw_image_coordinates_resolutions(annot);
    images.push(ImagePlacement::new(jpg, x, y, width, height));
    Ok(true)
}

/// Position a text value, computing per-line and per-character offsets first
pub fn text_handler(
    annot: &WidgetAnnot,
    mut draw: TextToDraw,
    fonts: &FontBook,
) -> (TextToDraw, f64, f64, bool) {
    draw.line_x = get_text_line_x_coordinates(annot, &draw, fonts);
    draw.comb_paddings = get_character_x_paddings(annot, &draw, fonts);
    let (x, y) = get_draw_text_coordinates(annot, &draw, fonts);
    (draw, x, y, true)
}

/// Draw items onto their pages of `stream`
pub fn get_drawn_stream<T: Into<DrawItem>>(
    items_by_page: BTreeMap<usize, Vec<T>>,
    stream: &[u8],
    page_count: usize,
    fonts: &FontBook,
) -> Result<Vec<u8>> {
    let mut watermarks = Vec::new();
    for (page, items) in items_by_page {
        watermarks.extend(create_watermarks_and_draw(page_count, page, items)?);
    }
    Ok(merge_watermarks_with_pdf(stream, &watermarks, fonts)?)
}

/// Draw every widget value over the template
///
/// Text, check boxes, radio buttons and choices are drawn as text; images
/// and signatures are drawn in a second pass when any are present.
pub fn fill(template: &[u8], widgets: &Widgets, fonts: &FontBook) -> Result<Vec<u8>> {
    let doc = template::load(template)?;
    let page_count = doc.get_pages().len();
    let annots_by_page = template::widgets_in_document(&doc);
    drop(doc);

    let mut texts: BTreeMap<usize, Vec<TextRun>> = BTreeMap::new();
    let mut images: BTreeMap<usize, Vec<ImagePlacement>> = BTreeMap::new();
    let mut radio_tracker = HashMap::new();
    let mut any_image = false;

    for (page, annots) in annots_by_page {
        for annot in annots {
            let Some(widget) = widgets.get(&annot.key) else {
                continue;
            };

            let handled = match widget {
                Widget::Checkbox(checkbox) => Some(check_radio_handler(
                    &annot,
                    Toggle::Checkbox(checkbox),
                    &mut radio_tracker,
                    fonts,
                )),
                Widget::Radio(radio) => Some(check_radio_handler(
                    &annot,
                    Toggle::Radio(radio),
                    &mut radio_tracker,
                    fonts,
                )),
                Widget::Signature(field) | Widget::Image(field) => {
                    any_image |=
                        signature_image_handler(&annot, field, images.entry(page).or_default())?;
                    None
                }
                Widget::Text(text) => {
                    text_to_draw(&annot, text, fonts).map(|draw| text_handler(&annot, draw, fonts))
                }
                Widget::Dropdown(dropdown) => {
                    dropdown_to_draw(&annot, dropdown).map(|draw| text_handler(&annot, draw, fonts))
                }
            };

            if let Some((draw, x, y, true)) = handled {
                debug!(key = %annot.key, page, x, y, "drawing value");
                texts.entry(page).or_default().push(draw.into_run(x, y));
            }
        }
    }

    let mut stream = get_drawn_stream(texts, template, page_count, fonts)?;
    if any_image {
        stream = get_drawn_stream(images, &stream, page_count, fonts)?;
    }

    info!(pages = page_count, "filled form overlay");
    Ok(stream)
}

/// Ask viewers to regenerate field appearances (`/NeedAppearances true`)
pub fn enable_adobe_mode(doc: &mut Document, adobe_mode: bool) -> Result<()> {
    if !adobe_mode {
        return Ok(());
    }

    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let acroform_ref = match doc.get_dictionary(root_id)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return Ok(()),
    };

    let acroform = match acroform_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_object_mut(root_id)?
            .as_dict_mut()?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    };
    acroform.set("NeedAppearances", true);
    Ok(())
}

/// Write every widget value into the field dictionaries
///
/// With `flatten` the filled fields are also marked read-only.
pub fn simple_fill(
    template: &[u8],
    widgets: &Widgets,
    flatten: bool,
    adobe_mode: bool,
) -> Result<Vec<u8>> {
    let mut doc = template::load(template)?;
    enable_adobe_mode(&mut doc, adobe_mode)?;

    let mut radio_tracker: HashMap<String, usize> = HashMap::new();
    let mut filled = 0usize;
    let pages: Vec<_> = doc.get_pages().into_values().collect();

    for page_id in pages {
        for annot_id in page_annotation_ids(&mut doc, page_id)? {
            let key = {
                let dict = doc.get_dictionary(annot_id)?;
                if !is_widget(&doc, dict) {
                    continue;
                }
                get_widget_key(&doc, dict)
            };
            let Some(widget) = key.as_deref().and_then(|k| widgets.get(k)) else {
                continue;
            };
            if !widget.has_value() {
                continue;
            }

            match widget {
                Widget::Checkbox(checkbox) => {
                    simple_update_checkbox_value(
                        &mut doc,
                        annot_id,
                        checkbox.value.unwrap_or_default(),
                    )?;
                }
                Widget::Radio(radio) => {
                    let seen = radio_tracker.entry(radio.name.clone()).or_insert(0);
                    *seen += 1;
                    if radio.value == Some(*seen - 1) {
                        simple_update_radio_value(&mut doc, annot_id)?;
                    } else {
                        simple_clear_radio_value(&mut doc, annot_id)?;
                    }
                }
                Widget::Dropdown(dropdown) => {
                    if let (Some(index), Some(label)) = (dropdown.value, dropdown.selected()) {
                        simple_update_dropdown_value(&mut doc, annot_id, index, label)?;
                    }
                }
                Widget::Text(text) => {
                    let value = text.value.as_deref().unwrap_or_default();
                    simple_update_text_value(&mut doc, annot_id, value)?;
                }
                Widget::Signature(_) | Widget::Image(_) => {}
            }

            if flatten {
                match widget {
                    Widget::Radio(_) => simple_flatten_radio(&mut doc, annot_id)?,
                    _ => simple_flatten_generic(&mut doc, annot_id)?,
                }
            }
            filled += 1;
        }
    }

    info!(filled, flatten, adobe_mode, "filled form fields");
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{flags, DefaultAppearance, FieldType};
    use crate::widgets::ButtonStyle;
    use lopdf::dictionary;
    use pdf_core::{Align, Rect};

    fn button(key: &str, flags: i64) -> WidgetAnnot {
        WidgetAnnot {
            id: None,
            key: key.to_string(),
            page: 1,
            rect: Rect::new(0.0, 0.0, 16.0, 16.0),
            field_type: Some(FieldType::Button),
            flags,
            appearance: DefaultAppearance::default(),
            alignment: Align::Left,
            max_length: None,
            choices: vec![],
            button_style: None,
        }
    }

    #[test]
    fn test_radio_tracker_draws_selected_option_only() {
        let fonts = FontBook::new();
        let radio = Radio {
            name: "color".to_string(),
            value: Some(1),
            size: None,
            button_style: ButtonStyle::Circle,
            font_color: None,
            number_of_options: 3,
        };
        let annot = button("color", flags::RADIO);
        let mut tracker = HashMap::new();

        let drawn: Vec<bool> = (0..3)
            .map(|_| check_radio_handler(&annot, Toggle::Radio(&radio), &mut tracker, &fonts).3)
            .collect();
        assert_eq!(drawn, vec![false, true, false]);
        assert_eq!(tracker["color"], 3);
    }

    #[test]
    fn test_checkbox_symbol_fills_box() {
        let fonts = FontBook::new();
        let checkbox = Checkbox {
            name: "agree".to_string(),
            value: Some(true),
            button_style: ButtonStyle::Cross,
            ..Default::default()
        };
        let (draw, _, _, need) = check_radio_handler(
            &button("agree", 0),
            Toggle::Checkbox(&checkbox),
            &mut HashMap::new(),
            &fonts,
        );
        assert!(need);
        assert_eq!(draw.lines, vec!["8"]);
        assert_eq!(draw.font_size, 12.0);
    }

    #[test]
    fn test_signature_without_value_queues_nothing() {
        let mut images = Vec::new();
        let field = ImageField {
            name: "sig".to_string(),
            value: None,
        };
        let queued = signature_image_handler(&button("sig", 0), &field, &mut images).unwrap();
        assert!(!queued);
        assert!(images.is_empty());
    }

    #[test]
    fn test_enable_adobe_mode_on_direct_acroform() {
        let mut doc = Document::with_version("1.7");
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => dictionary! { "Fields" => Vec::<Object>::new() },
        });
        doc.trailer.set("Root", catalog_id);

        enable_adobe_mode(&mut doc, true).unwrap();

        let acroform = doc
            .get_dictionary(catalog_id)
            .unwrap()
            .get(b"AcroForm")
            .and_then(Object::as_dict)
            .unwrap();
        assert!(acroform.get(b"NeedAppearances").and_then(Object::as_bool).unwrap());
    }

    #[test]
    fn test_enable_adobe_mode_without_acroform_is_noop() {
        let mut doc = Document::with_version("1.7");
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog" });
        doc.trailer.set("Root", catalog_id);

        enable_adobe_mode(&mut doc, true).unwrap();
        assert!(!doc.get_dictionary(catalog_id).unwrap().has(b"AcroForm"));
    }
}
