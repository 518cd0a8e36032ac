//! Structural-relationship resolution
//!
//! The structural document describes an object's related entities across four
//! correlated element lists, joined only by a document-local file id: the
//! collection-membership pointers, the has-part pointers, the page-sequence
//! tree (order and label per page), and the file-location list that maps each
//! file id to the related object's actual identifier.
//!
//! Resolution runs the lists in a fixed pass order (membership, parts, page
//! attributes, file locations) over an arena of builder records keyed by the
//! file id, then validates that every builder ended up with a resolved
//! identifier. A correlation-key mismatch is a fault for the whole identifier,
//! never a silently empty field: an unresolved identifier would corrupt the
//! derivative URLs built from it downstream.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::ExportError;
use crate::xml;

/// How a related entity is connected to the object under resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    MemberOfCollection,
    HasPart,
}

/// One fully resolved related entity.
///
/// `order` and `label` are only present for has-part entries that represent
/// paginated content. The document-local file id used to correlate the source
/// lists never leaves this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEntry {
    pub kind: RelationKind,
    pub pid: String,
    pub order: Option<u32>,
    pub label: Option<String>,
}

#[derive(Debug)]
struct RelationBuilder {
    file_id: String,
    kind: RelationKind,
    pid: Option<String>,
    order: Option<u32>,
    label: Option<String>,
}

/// Ordered arena of builders keyed by the document-local file id.
///
/// Registration order is first-scan order, which is the fallback page order
/// when no explicit sequence numbers are present.
#[derive(Debug, Default)]
struct RelationArena {
    builders: Vec<RelationBuilder>,
    index: HashMap<String, usize>,
}

impl RelationArena {
    fn register(&mut self, file_id: &str, kind: RelationKind) {
        if self.index.contains_key(file_id) {
            debug!("duplicate registration of file id {}", file_id);
            return;
        }
        self.index.insert(file_id.to_string(), self.builders.len());
        self.builders.push(RelationBuilder {
            file_id: file_id.to_string(),
            kind,
            pid: None,
            order: None,
            label: None,
        });
    }

    fn get_mut(&mut self, file_id: &str) -> Option<&mut RelationBuilder> {
        let i = self.index.get(file_id).copied()?;
        Some(&mut self.builders[i])
    }

    fn finish(self, pid: &str) -> Result<Vec<RelationEntry>, ExportError> {
        let mut entries = Vec::with_capacity(self.builders.len());
        for builder in self.builders {
            let resolved = match builder.pid {
                Some(p) => p,
                None => {
                    return Err(ExportError::UnresolvedRelation {
                        pid: pid.to_string(),
                        file_id: builder.file_id,
                    })
                }
            };
            entries.push(RelationEntry {
                kind: builder.kind,
                pid: resolved,
                order: builder.order,
                label: builder.label,
            });
        }
        Ok(entries)
    }
}

/// The four element lists of one structural document, in document order.
#[derive(Debug, Default)]
struct StructuralLists {
    membership: Vec<String>,
    parts: Vec<String>,
    pages: Vec<PageRef>,
    locations: Vec<FileLocation>,
}

#[derive(Debug)]
struct PageRef {
    file_id: String,
    order: Option<u32>,
    label: Option<String>,
}

#[derive(Debug)]
struct FileLocation {
    file_id: String,
    href: String,
}

/// Scopes opened while walking the document, innermost last.
#[derive(Debug)]
enum Scope {
    StructMap,
    Rels,
    Kind(RelationKind),
    Images,
    Page {
        order: Option<u32>,
        label: Option<String>,
        seen: bool,
    },
    File(String),
    Other,
}

/// Resolve the structural relationships of one object.
pub fn resolve_relations(pid: &str, doc: &str) -> Result<Vec<RelationEntry>, ExportError> {
    let lists = scan_document(pid, doc)?;

    let mut arena = RelationArena::default();
    for file_id in &lists.membership {
        arena.register(file_id, RelationKind::MemberOfCollection);
    }
    for file_id in &lists.parts {
        arena.register(file_id, RelationKind::HasPart);
    }
    for page in &lists.pages {
        match arena.get_mut(&page.file_id) {
            Some(builder) => {
                builder.order = page.order;
                builder.label = page.label.clone();
            }
            None => {
                return Err(ExportError::DanglingPageReference {
                    pid: pid.to_string(),
                    file_id: page.file_id.clone(),
                })
            }
        }
    }
    for location in &lists.locations {
        match arena.get_mut(&location.file_id) {
            Some(builder) => builder.pid = Some(location.href.clone()),
            // The file section may describe datastreams outside the
            // relationship lists.
            None => debug!("file id {} has no relationship entry; ignoring", location.file_id),
        }
    }

    arena.finish(pid)
}

fn scan_document(pid: &str, doc: &str) -> Result<StructuralLists, ExportError> {
    let mut reader = xml::reader(doc);
    let mut lists = StructuralLists::default();
    let mut stack: Vec<Scope> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| ExportError::malformed(pid, e))? {
            Event::Start(e) => {
                record_leaf(&e, &mut stack, &mut lists);
                let scope = open_scope(pid, &e, &stack)?;
                stack.push(scope);
            }
            Event::Empty(e) => record_leaf(&e, &mut stack, &mut lists),
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lists)
}

fn open_scope(pid: &str, e: &BytesStart, stack: &[Scope]) -> Result<Scope, ExportError> {
    let scope = match xml::local(e.name()).as_str() {
        "structMap" => Scope::StructMap,
        "div" => match stack.last() {
            Some(Scope::StructMap) => match xml::attr(e, "ID").as_deref() {
                Some("rels") => Scope::Rels,
                Some("images") => Scope::Images,
                _ => Scope::Other,
            },
            Some(Scope::Rels) => match xml::attr(e, "ID").as_deref() {
                Some("isMemberOfCollection") => Scope::Kind(RelationKind::MemberOfCollection),
                Some("hasPart") => Scope::Kind(RelationKind::HasPart),
                _ => Scope::Other,
            },
            Some(Scope::Images) => {
                let order = match xml::attr(e, "ORDER") {
                    Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                        ExportError::malformed(pid, format!("non-numeric page ORDER '{}'", raw))
                    })?),
                    None => None,
                };
                Scope::Page {
                    order,
                    label: xml::attr(e, "LABEL"),
                    seen: false,
                }
            }
            _ => Scope::Other,
        },
        "file" => match xml::attr(e, "ID") {
            Some(id) => Scope::File(id),
            None => Scope::Other,
        },
        _ => Scope::Other,
    };
    Ok(scope)
}

/// Record an `fptr` or `FLocat` pointer into the list its innermost enclosing
/// scope belongs to.
fn record_leaf(e: &BytesStart, stack: &mut [Scope], lists: &mut StructuralLists) {
    match xml::local(e.name()).as_str() {
        "fptr" => {
            let file_id = match xml::attr(e, "FILEID") {
                Some(id) => id,
                None => return,
            };
            for scope in stack.iter_mut().rev() {
                match scope {
                    Scope::Kind(RelationKind::MemberOfCollection) => {
                        lists.membership.push(file_id);
                        break;
                    }
                    Scope::Kind(RelationKind::HasPart) => {
                        lists.parts.push(file_id);
                        break;
                    }
                    Scope::Page { order, label, seen } => {
                        // Only the first pointer names the page itself.
                        if !*seen {
                            *seen = true;
                            lists.pages.push(PageRef {
                                file_id,
                                order: *order,
                                label: label.clone(),
                            });
                        }
                        break;
                    }
                    _ => {}
                }
            }
        }
        "FLocat" => {
            let href = match xml::attr(e, "href") {
                Some(h) => h,
                None => return,
            };
            for scope in stack.iter().rev() {
                if let Scope::File(file_id) = scope {
                    lists.locations.push(FileLocation {
                        file_id: file_id.clone(),
                        href,
                    });
                    break;
                }
            }
        }
        _ => {}
    }
}
