//! Object-type classification
//!
//! The object-type document drives the top-level branch of the pipeline:
//! collections are skipped as direct targets, content objects go through the
//! full fetch-and-assemble path, anything else is logged and skipped.

use quick_xml::events::Event;

use crate::error::ExportError;
use crate::xml;

const COLLECTION_TAG: &str = "UMD_COLLECTION";
const CONTENT_TAG: &str = "UMD_IMAGE";

/// Object type derived once per identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    Collection,
    Content,
    /// An unexpected type tag, preserved verbatim for the skip log line.
    Unknown(String),
}

/// Classify an object from its type document.
///
/// A document without a `type` element is a [`ExportError::MalformedResponse`].
pub fn classify(pid: &str, doc: &str) -> Result<ObjectType, ExportError> {
    let mut reader = xml::reader(doc);
    let mut in_type = false;
    let mut value: Option<String> = None;

    loop {
        match reader.read_event().map_err(|e| ExportError::malformed(pid, e))? {
            Event::Start(e) if xml::local(e.name()) == "type" => {
                in_type = true;
            }
            Event::Text(t) if in_type => {
                let text = t.unescape().map_err(|e| ExportError::malformed(pid, e))?;
                value.get_or_insert_with(String::new).push_str(&text);
            }
            Event::End(e) if xml::local(e.name()) == "type" => {
                in_type = false;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match value.as_deref().map(str::trim) {
        None | Some("") => Err(ExportError::malformed(
            pid,
            "type document has no type element",
        )),
        Some(COLLECTION_TAG) => Ok(ObjectType::Collection),
        Some(CONTENT_TAG) => Ok(ObjectType::Content),
        Some(other) => Ok(ObjectType::Unknown(other.to_string())),
    }
}
