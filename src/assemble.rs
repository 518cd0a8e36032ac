//! Record assembly
//!
//! Merges the outputs of the metadata, relationship, and handle fetches into
//! an item record, registers collection memberships in the shared registry,
//! and emits one file record per has-part relation.

use tracing::warn;

use crate::metadata::MetadataFields;
use crate::records::{CollectionRegistry, FileRecord, ItemRecord};
use crate::relations::{RelationEntry, RelationKind};
use crate::repository::Repository;

/// An assembled item together with the file records it owns.
#[derive(Debug)]
pub struct AssembledItem {
    pub item: ItemRecord,
    pub files: Vec<FileRecord>,
}

/// Assemble one content object.
///
/// Page ordering: if any has-part entry carries a sequence order, all entries
/// are sorted by it (numeric ascending, missing-order entries last); with no
/// orders at all, discovery order is preserved.
pub fn assemble<R: Repository + ?Sized>(
    pid: &str,
    metadata: MetadataFields,
    relations: Vec<RelationEntry>,
    handle: String,
    repo: &R,
    registry: &mut CollectionRegistry,
) -> AssembledItem {
    let mut member_of = Vec::new();
    let mut parts = Vec::new();

    for entry in relations {
        match entry.kind {
            RelationKind::MemberOfCollection => {
                registry.add_member(&entry.pid, pid);
                member_of.push(entry.pid);
            }
            RelationKind::HasPart => parts.push(entry),
        }
    }

    let with_order = parts.iter().filter(|e| e.order.is_some()).count();
    if with_order > 0 {
        if with_order < parts.len() {
            warn!(
                "{}: {} of {} pages carry no sequence order; sorting them last",
                pid,
                parts.len() - with_order,
                parts.len()
            );
        }
        parts.sort_by_key(|e| (e.order.is_none(), e.order));
    }

    let mut file_urls = Vec::with_capacity(parts.len());
    let mut files = Vec::with_capacity(parts.len());
    for entry in parts {
        let url = repo.image_url(&entry.pid);
        file_urls.push(url.clone());
        files.push(FileRecord {
            pid: entry.pid,
            order: entry.order,
            label: entry.label,
            url,
            parent_pid: pid.to_string(),
        });
    }

    let item = ItemRecord {
        pid: pid.to_string(),
        handle,
        media_type: metadata.media_type,
        title: metadata.title,
        summary: metadata.summary,
        century: metadata.century,
        date: metadata.date,
        repository: metadata.repository,
        collection_title: metadata.collection_title,
        subjects: metadata.subjects,
        file_urls,
        member_of,
    };

    AssembledItem { item, files }
}
