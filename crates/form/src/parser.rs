//! JSON fill data parsing

use crate::widgets::{FieldValue, Widget};
use crate::{FormError, Result};
use serde_json::{Map, Value};

/// Parse a JSON object of `key -> value` fill data
pub fn parse_data(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(FormError::ParseError(format!(
            "fill data must be a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Convert a scalar JSON value to display text
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Convert a JSON value to a fill value for `widget`
///
/// `null` clears nothing and yields `None`. Strings given to signature and
/// image widgets are read as file paths.
pub fn json_to_field_value(widget: &Widget, value: &Value) -> Result<Option<FieldValue>> {
    let mismatch = |expected: &str| FormError::InvalidValue {
        key: widget.name().to_string(),
        expected: format!("{expected}, got {}", kind_of(value)),
    };

    let field_value = match (widget, value) {
        (_, Value::Null) => return Ok(None),
        (Widget::Text(_), Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            FieldValue::Text(value_to_string(value))
        }
        (Widget::Text(_), _) => return Err(mismatch("a string")),
        (Widget::Checkbox(_), Value::Bool(b)) => FieldValue::Check(*b),
        (Widget::Checkbox(_), _) => return Err(mismatch("a boolean")),
        (Widget::Radio(_) | Widget::Dropdown(_), Value::Number(n)) => {
            match n.as_u64().and_then(|index| usize::try_from(index).ok()) {
                Some(index) => FieldValue::Index(index),
                None => return Err(mismatch("a non-negative integer")),
            }
        }
        (Widget::Dropdown(_), Value::String(label)) => FieldValue::Text(label.clone()),
        (Widget::Radio(_), _) => return Err(mismatch("an option index")),
        (Widget::Dropdown(_), _) => return Err(mismatch("a choice index or label")),
        (Widget::Signature(_) | Widget::Image(_), Value::String(path)) => {
            FieldValue::Image(std::fs::read(path)?)
        }
        (Widget::Signature(_) | Widget::Image(_), _) => return Err(mismatch("an image file path")),
    };

    Ok(Some(field_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{Checkbox, Dropdown, ImageField, Text};
    use serde_json::json;

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("hello")), "hello");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(null)), "");
    }

    #[test]
    fn test_parse_data_requires_object() {
        let data = parse_data(r#"{"name": "Jane", "agree": true}"#).unwrap();
        assert_eq!(data.len(), 2);

        let err = parse_data("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(matches!(parse_data("{"), Err(FormError::JsonError(_))));
    }

    #[test]
    fn test_json_to_field_value() {
        let text = Widget::Text(Text {
            name: "zip".to_string(),
            ..Default::default()
        });
        assert_eq!(
            json_to_field_value(&text, &json!(10110)).unwrap(),
            Some(FieldValue::Text("10110".to_string()))
        );
        assert_eq!(json_to_field_value(&text, &json!(null)).unwrap(), None);

        let checkbox = Widget::Checkbox(Checkbox {
            name: "agree".to_string(),
            ..Default::default()
        });
        assert_eq!(
            json_to_field_value(&checkbox, &json!(true)).unwrap(),
            Some(FieldValue::Check(true))
        );
        let err = json_to_field_value(&checkbox, &json!("yes")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for 'agree': expected a boolean, got a string"
        );

        let dropdown = Widget::Dropdown(Dropdown {
            name: "country".to_string(),
            ..Default::default()
        });
        assert_eq!(
            json_to_field_value(&dropdown, &json!(1)).unwrap(),
            Some(FieldValue::Index(1))
        );
        assert_eq!(
            json_to_field_value(&dropdown, &json!("Japan")).unwrap(),
            Some(FieldValue::Text("Japan".to_string()))
        );
        assert!(json_to_field_value(&dropdown, &json!(-1)).is_err());
        assert!(json_to_field_value(&dropdown, &json!(1.5)).is_err());
    }

    #[test]
    fn test_index_beyond_address_space_is_never_an_option() {
        let mut dropdown = Widget::Dropdown(Dropdown {
            name: "country".to_string(),
            choices: vec!["Thailand".to_string(), "Japan".to_string()],
            ..Default::default()
        });

        // 2^32 + 1 wraps to 1 when narrowed to a 32-bit usize
        let result = json_to_field_value(&dropdown, &json!(4_294_967_297u64))
            .and_then(|value| dropdown.set_value(value.unwrap()));
        assert!(matches!(result, Err(FormError::InvalidValue { .. })));
        assert!(matches!(&dropdown, Widget::Dropdown(d) if d.value.is_none()));
    }

    #[test]
    fn test_missing_image_file_is_io_error() {
        let image = Widget::Image(ImageField {
            name: "photo".to_string(),
            value: None,
        });
        let result = json_to_field_value(&image, &json!("/nonexistent/photo.png"));
        assert!(matches!(result, Err(FormError::IoError(_))));
    }
}
