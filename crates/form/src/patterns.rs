//! Direct edits of field dictionaries: values, appearance states and flags

use crate::template::flags;
use crate::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf_core::object::{self, get_resolved};
use tracing::trace;

/// Name of the "off" appearance state
pub const OFF_STATE: &str = "Off";

/// On-state used when a button has no appearance dictionary to read it from
pub const DEFAULT_ON_STATE: &str = "Yes";

/// Annotation IDs of a page, in `/Annots` order
///
/// Annotations stored inline in the `/Annots` array are moved into their own
/// objects so they can be edited by ID.
pub fn page_annotation_ids(doc: &mut Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let (entries, annots_ref) = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => (items.clone(), Some(*id)),
                _ => return Ok(Vec::new()),
            },
            Ok(Object::Array(items)) => (items.clone(), None),
            _ => return Ok(Vec::new()),
        }
    };

    let mut promoted = false;
    let mut ids = Vec::with_capacity(entries.len());
    let mut rewritten = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Object::Reference(id) => {
                ids.push(id);
                rewritten.push(Object::Reference(id));
            }
            Object::Dictionary(dict) => {
                let id = doc.add_object(dict);
                promoted = true;
                ids.push(id);
                rewritten.push(Object::Reference(id));
            }
            other => rewritten.push(other),
        }
    }

    if promoted {
        trace!(?page_id, "moved inline annotations into indirect objects");
        match annots_ref {
            Some(id) => *doc.get_object_mut(id)? = Object::Array(rewritten),
            None => doc
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Annots", Object::Array(rewritten)),
        }
    }

    Ok(ids)
}

fn parent_id(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(Object::as_reference).ok()
}

/// Object holding the value of the field an annotation belongs to
///
/// A kid widget without its own `/T` shares its parent's value.
fn value_target(doc: &Document, annot_id: ObjectId) -> Result<ObjectId> {
    let annot = doc.get_dictionary(annot_id)?;
    Ok(match parent_id(annot) {
        Some(parent) if !annot.has(b"T") => parent,
        _ => annot_id,
    })
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary> {
    Ok(doc.get_object_mut(id)?.as_dict_mut()?)
}

/// The "on" appearance state of a button widget
pub fn on_state_name(doc: &Document, annot: &Dictionary) -> String {
    let Some(ap) = get_resolved(doc, annot, b"AP").and_then(|ap| ap.as_dict().ok()) else {
        return DEFAULT_ON_STATE.to_string();
    };

    [b"N".as_slice(), b"D".as_slice()]
        .into_iter()
        .filter_map(|key| get_resolved(doc, ap, key).and_then(|o| o.as_dict().ok()))
        .flat_map(|states| states.iter().map(|(name, _)| name))
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .find(|name| name != OFF_STATE)
        .unwrap_or_else(|| DEFAULT_ON_STATE.to_string())
}

/// Check or uncheck a check box widget
pub fn simple_update_checkbox_value(
    doc: &mut Document,
    annot_id: ObjectId,
    checked: bool,
) -> Result<()> {
    let state = if checked {
        on_state_name(doc, doc.get_dictionary(annot_id)?)
    } else {
        OFF_STATE.to_string()
    };
    let target = value_target(doc, annot_id)?;

    dict_mut(doc, annot_id)?.set("AS", Object::Name(state.clone().into_bytes()));
    dict_mut(doc, target)?.set("V", Object::Name(state.into_bytes()));
    Ok(())
}

/// Select one widget of a radio group
pub fn simple_update_radio_value(doc: &mut Document, annot_id: ObjectId) -> Result<()> {
    let annot = doc.get_dictionary(annot_id)?;
    let state = on_state_name(doc, annot);
    let group = parent_id(annot).unwrap_or(annot_id);

    dict_mut(doc, annot_id)?.set("AS", Object::Name(state.clone().into_bytes()));
    dict_mut(doc, group)?.set("V", Object::Name(state.into_bytes()));
    Ok(())
}

/// Turn off a radio widget that is not the selected option
pub fn simple_clear_radio_value(doc: &mut Document, annot_id: ObjectId) -> Result<()> {
    dict_mut(doc, annot_id)?.set("AS", Object::Name(OFF_STATE.as_bytes().to_vec()));
    Ok(())
}

/// Select a choice by index
///
/// A kid widget only sets its parent's `/V`; a field that is its own widget
/// also records `/I`. The stale appearance stream is removed so viewers
/// regenerate it.
pub fn simple_update_dropdown_value(
    doc: &mut Document,
    annot_id: ObjectId,
    index: usize,
    label: &str,
) -> Result<()> {
    let target = value_target(doc, annot_id)?;

    let field = dict_mut(doc, target)?;
    field.set("V", object::encode_text_string(label));
    if target == annot_id {
        field.set("I", vec![Object::Integer(index as i64)]);
    }
    dict_mut(doc, annot_id)?.remove(b"AP");
    Ok(())
}

/// Set the value of a text field
///
/// The stale appearance stream is removed so viewers regenerate it.
pub fn simple_update_text_value(
    doc: &mut Document,
    annot_id: ObjectId,
    value: &str,
) -> Result<()> {
    let target = value_target(doc, annot_id)?;

    dict_mut(doc, target)?.set("V", object::encode_text_string(value));
    dict_mut(doc, annot_id)?.remove(b"AP");
    Ok(())
}

fn set_read_only(doc: &mut Document, id: ObjectId) -> Result<()> {
    let current = {
        let dict = doc.get_dictionary(id)?;
        get_resolved(doc, dict, b"Ff")
            .and_then(object::integer)
            .unwrap_or(0)
    };
    dict_mut(doc, id)?.set("Ff", current | flags::READ_ONLY);
    Ok(())
}

/// Make a radio group read-only
pub fn simple_flatten_radio(doc: &mut Document, annot_id: ObjectId) -> Result<()> {
    let group = parent_id(doc.get_dictionary(annot_id)?).unwrap_or(annot_id);
    set_read_only(doc, group)
}

/// Make a field read-only
///
/// Flags live on the parent when the widget carries none of its own.
pub fn simple_flatten_generic(doc: &mut Document, annot_id: ObjectId) -> Result<()> {
    let annot = doc.get_dictionary(annot_id)?;
    let target = match parent_id(annot) {
        Some(parent) if !annot.has(b"Ff") => parent,
        _ => annot_id,
    };
    set_read_only(doc, target)
}
