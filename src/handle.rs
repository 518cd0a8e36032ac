//! Persistent-identifier resolution
//!
//! A handle is minted separately from the object's own identifier and is a
//! required linking field downstream, so a missing handle is fatal for that
//! identifier rather than defaulted.

use quick_xml::events::Event;

use crate::error::ExportError;
use crate::xml;

/// Extract the handle string from a handle document.
pub fn parse_handle(pid: &str, doc: &str) -> Result<String, ExportError> {
    let mut reader = xml::reader(doc);
    let mut path: Vec<String> = Vec::new();
    let mut capturing = false;
    let mut value = String::new();

    loop {
        match reader.read_event().map_err(|e| ExportError::malformed(pid, e))? {
            Event::Start(e) => {
                path.push(xml::local(e.name()));
                let rel: Vec<&str> = path.iter().skip(1).map(String::as_str).collect();
                if value.is_empty() && rel.as_slice() == ["result", "handlehttp"] {
                    capturing = true;
                }
            }
            Event::Text(t) if capturing => {
                value.push_str(&t.unescape().map_err(|e| ExportError::malformed(pid, e))?);
            }
            Event::End(_) => {
                capturing = false;
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let value = value.trim().to_string();
    if value.is_empty() {
        Err(ExportError::HandleNotFound {
            pid: pid.to_string(),
        })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handle() {
        let doc = r#"<response>
  <result>
    <handlehttp>http://hdl.handle.net/1903.1/12345</handlehttp>
  </result>
</response>"#;
        let handle = parse_handle("umd:1", doc).unwrap();
        assert_eq!(handle, "http://hdl.handle.net/1903.1/12345");
    }

    #[test]
    fn test_missing_handle_element() {
        let doc = "<response><result></result></response>";
        let result = parse_handle("umd:1", doc);
        assert!(matches!(
            result,
            Err(ExportError::HandleNotFound { pid }) if pid == "umd:1"
        ));
    }

    #[test]
    fn test_empty_handle_element() {
        let doc = "<response><result><handlehttp>  </handlehttp></result></response>";
        assert!(matches!(
            parse_handle("umd:1", doc),
            Err(ExportError::HandleNotFound { .. })
        ));
    }
}
