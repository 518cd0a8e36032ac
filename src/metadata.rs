//! Descriptive-metadata extraction
//!
//! Pulls a fixed set of fields out of the descriptive-metadata document.
//! Every field is optional upstream; absence always maps to an explicit empty
//! value so each output row carries the complete field set.

use quick_xml::events::{BytesStart, Event};

use crate::error::ExportError;
use crate::xml;

/// Descriptive fields of one object.
///
/// Century and day-level dates are parallel lists, kept apart to preserve the
/// granularity distinction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub media_type: String,
    pub title: String,
    pub summary: String,
    pub century: Vec<String>,
    pub date: Vec<String>,
    pub repository: String,
    pub collection_title: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    MediaType,
    Title,
    Summary,
    Century,
    Date,
    Repository,
    CollectionTitle,
    Subject,
}

/// Extract the metadata fields from a descriptive-metadata document.
pub fn parse_metadata(pid: &str, doc: &str) -> Result<MetadataFields, ExportError> {
    let mut reader = xml::reader(doc);
    let mut fields = MetadataFields::default();
    // Element path below the document root; capture = (field, depth, buffer).
    let mut path: Vec<String> = Vec::new();
    let mut capture: Option<(Field, usize, String)> = None;

    loop {
        match reader.read_event().map_err(|e| ExportError::malformed(pid, e))? {
            Event::Start(e) => {
                path.push(xml::local(e.name()));
                if capture.is_none() {
                    if let Some(field) = match_field(&path, &e) {
                        capture = Some((field, path.len(), String::new()));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = capture.as_mut() {
                    buf.push_str(&t.unescape().map_err(|e| ExportError::malformed(pid, e))?);
                }
            }
            Event::End(_) => {
                if matches!(capture.as_ref(), Some((_, depth, _)) if path.len() == *depth) {
                    if let Some((field, _, buf)) = capture.take() {
                        commit(&mut fields, field, buf);
                    }
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fields)
}

/// Match the current element (already pushed onto `path`) against the fixed
/// extraction paths. Paths are relative to the document root.
fn match_field(path: &[String], e: &BytesStart) -> Option<Field> {
    let rel: Vec<&str> = path.iter().skip(1).map(String::as_str).collect();
    match rel.as_slice() {
        ["mediaType", "form"] => Some(Field::MediaType),
        ["title"] if xml::attr(e, "type").as_deref() == Some("main") => Some(Field::Title),
        ["description"] if xml::attr(e, "type").as_deref() == Some("summary") => {
            Some(Field::Summary)
        }
        ["covTime", "century"] => Some(Field::Century),
        ["covTime", "date"] => Some(Field::Date),
        ["repository", "corpName"] => Some(Field::Repository),
        ["relationships", "relation", "bibRef", "title"] => Some(Field::CollectionTitle),
        ["subject"] if xml::attr(e, "type").as_deref() == Some("topical") => Some(Field::Subject),
        _ => None,
    }
}

fn commit(fields: &mut MetadataFields, field: Field, value: String) {
    let value = value.trim().to_string();
    match field {
        Field::MediaType => set_scalar(&mut fields.media_type, value),
        Field::Title => set_scalar(&mut fields.title, value),
        Field::Summary => set_scalar(&mut fields.summary, value),
        Field::Repository => set_scalar(&mut fields.repository, value),
        Field::CollectionTitle => set_scalar(&mut fields.collection_title, value),
        Field::Century => push_value(&mut fields.century, value),
        Field::Date => push_value(&mut fields.date, value),
        // Whitespace-only subjects are markup artifacts, not real subjects.
        Field::Subject => push_value(&mut fields.subjects, value),
    }
}

// First occurrence wins, matching the upstream cataloging convention.
fn set_scalar(slot: &mut String, value: String) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value;
    }
}

fn push_value(list: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        list.push(value);
    }
}
