//! Font sizing for drawn field values

use crate::template::WidgetAnnot;

/// Size used for multiline fields whose `/DA` asks for auto sizing
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Symbol size for a check box or radio button that fills its box
pub fn checkbox_radio_font_size(annot: &WidgetAnnot) -> f32 {
    let area = annot.rect.width() * annot.rect.height();
    (area.sqrt() * 72.0 / 96.0) as f32
}

/// Font size for a text field: the `/DA` size, or one derived from the box
pub fn text_field_font_size(annot: &WidgetAnnot) -> f32 {
    if annot.appearance.font_size > 0.0 {
        return annot.appearance.font_size;
    }
    if annot.is_multiline() {
        return DEFAULT_FONT_SIZE;
    }
    ((annot.rect.height() * 2.0 / 3.0) as f32).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{flags, DefaultAppearance, FieldType};
    use pdf_core::{Align, Rect};

    fn annot(rect: Rect, font_size: f32, flags: i64) -> WidgetAnnot {
        WidgetAnnot {
            id: None,
            key: "f".to_string(),
            page: 1,
            rect,
            field_type: Some(FieldType::Text),
            flags,
            appearance: DefaultAppearance {
                font_size,
                ..Default::default()
            },
            alignment: Align::Left,
            max_length: None,
            choices: vec![],
            button_style: None,
        }
    }

    #[test]
    fn test_checkbox_radio_font_size() {
        let a = annot(Rect::new(0.0, 0.0, 16.0, 16.0), 0.0, 0);
        assert_eq!(checkbox_radio_font_size(&a), 12.0);
    }

    #[test]
    fn test_text_field_font_size() {
        assert_eq!(
            text_field_font_size(&annot(Rect::new(0.0, 0.0, 100.0, 30.0), 9.0, 0)),
            9.0
        );
        assert_eq!(
            text_field_font_size(&annot(Rect::new(0.0, 0.0, 100.0, 30.0), 0.0, 0)),
            20.0
        );
        assert_eq!(
            text_field_font_size(&annot(Rect::new(0.0, 0.0, 100.0, 90.0), 0.0, flags::MULTILINE)),
            DEFAULT_FONT_SIZE
        );
        assert_eq!(
            text_field_font_size(&annot(Rect::new(0.0, 0.0, 100.0, 0.9), 0.0, 0)),
            1.0
        );
    }
}
