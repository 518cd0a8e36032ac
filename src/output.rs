//! CSV serialization
//!
//! Each record family has a fixed column set; multi-valued fields are joined
//! with a fixed sub-delimiter. The items and files outputs can be opened in
//! append mode for resumed runs, in which case the header row is only written
//! once.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::records::{CollectionRecord, FileRecord, ItemRecord};

/// Joins multi-valued fields in the flat output.
pub const SUBDELIMITER: &str = ";";

const ITEM_COLUMNS: [&str; 12] = [
    "pid",
    "handle",
    "media_type",
    "title",
    "summary",
    "century",
    "date",
    "repository",
    "collection_title",
    "subjects",
    "member_of",
    "files",
];

const COLLECTION_COLUMNS: [&str; 2] = ["pid", "children"];

const FILE_COLUMNS: [&str; 5] = ["pid", "order", "label", "url", "parent_pid"];

/// Output file locations derived from the operator-supplied prefix.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub items: PathBuf,
    pub collections: PathBuf,
    pub files: PathBuf,
    pub checkpoint: PathBuf,
}

impl OutputPaths {
    pub fn new(prefix: &str) -> Self {
        Self {
            items: PathBuf::from(format!("{}-items.csv", prefix)),
            collections: PathBuf::from(format!("{}-collections.csv", prefix)),
            files: PathBuf::from(format!("{}-files.csv", prefix)),
            checkpoint: PathBuf::from(format!("{}-checkpoint.json", prefix)),
        }
    }
}

fn open_writer(path: &Path, append: bool) -> Result<(csv::Writer<File>, bool), ExportError> {
    let needs_header = !append
        || std::fs::metadata(path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
    let file = if append {
        OpenOptions::new().create(true).append(true).open(path)?
    } else {
        File::create(path)?
    };
    Ok((csv::Writer::from_writer(file), needs_header))
}

fn join(values: &[String]) -> String {
    values.join(SUBDELIMITER)
}

/// Write (or append) the item family.
pub fn write_items(path: &Path, items: &[ItemRecord], append: bool) -> Result<(), ExportError> {
    let (mut writer, needs_header) = open_writer(path, append)?;
    if needs_header {
        writer.write_record(ITEM_COLUMNS)?;
    }
    for item in items {
        let century = join(&item.century);
        let date = join(&item.date);
        let subjects = join(&item.subjects);
        let member_of = join(&item.member_of);
        let files = join(&item.file_urls);
        writer.write_record([
            item.pid.as_str(),
            item.handle.as_str(),
            item.media_type.as_str(),
            item.title.as_str(),
            item.summary.as_str(),
            century.as_str(),
            date.as_str(),
            item.repository.as_str(),
            item.collection_title.as_str(),
            subjects.as_str(),
            member_of.as_str(),
            files.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the collection family. Always rewritten whole: the registry is only
/// finalized once the batch completes.
pub fn write_collections(
    path: &Path,
    collections: &[CollectionRecord],
) -> Result<(), ExportError> {
    let (mut writer, _) = open_writer(path, false)?;
    writer.write_record(COLLECTION_COLUMNS)?;
    for collection in collections {
        let children = join(&collection.children);
        writer.write_record([collection.pid.as_str(), children.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write (or append) the file family.
pub fn write_files(path: &Path, files: &[FileRecord], append: bool) -> Result<(), ExportError> {
    let (mut writer, needs_header) = open_writer(path, append)?;
    if needs_header {
        writer.write_record(FILE_COLUMNS)?;
    }
    for file in files {
        let order = file.order.map(|o| o.to_string()).unwrap_or_default();
        let label = file.label.clone().unwrap_or_default();
        writer.write_record([
            file.pid.as_str(),
            order.as_str(),
            label.as_str(),
            file.url.as_str(),
            file.parent_pid.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
