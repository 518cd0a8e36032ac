//! Small helpers over the `quick-xml` event reader
//!
//! The upstream documents mix a default METS namespace with an xlink prefix,
//! so all matching here is on local names with prefixes stripped.

use quick_xml::events::BytesStart;
use quick_xml::name::QName;
use quick_xml::Reader;

/// Build a reader over an in-memory document with whitespace trimming on.
pub fn reader(doc: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(doc);
    reader.config_mut().trim_text(true);
    reader
}

/// Element name with any namespace prefix stripped.
pub fn local(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.local_name().as_ref()).into_owned()
}

/// Look up an attribute by local name, ignoring namespace prefixes.
pub fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == name.as_bytes() {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}
