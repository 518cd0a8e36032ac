//! Fedora Repository Export Library
//!
//! This library migrates digital-object metadata and derivative images from a
//! legacy Fedora repository (simple HTTP GET endpoints returning XML) into
//! flat CSV files suitable for bulk import into a content-management system.
//!
//! # Overview
//!
//! The batch driver processes a list of object identifiers, one at a time:
//!
//! 1. Classifying each identifier from its type document (collections are
//!    skipped as direct targets but still appear as relationship targets)
//! 2. Fetching the descriptive metadata, structural relationships, and
//!    persistent handle of each content object
//! 3. Resolving the structural document's four correlated element lists into
//!    relation entries with correct page ordering
//! 4. Assembling item, collection, and file records, with collection
//!    membership deduplicated across the whole batch
//! 5. Writing one CSV file per record family
//!
//! # Usage
//!
//! ```ignore
//! use fedora_export::{
//!     run_export, CancelFlag, ExportOptions, HttpRepository, DEFAULT_BASE_URL,
//!     DEFAULT_TIMEOUT,
//! };
//!
//! let repo = HttpRepository::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)?;
//! let options = ExportOptions {
//!     pid_file: "pids.txt".into(),
//!     output_prefix: "export".to_string(),
//!     resume: false,
//! };
//!
//! let stats = run_export(&repo, &options, &CancelFlag::new())?;
//! println!("exported {} items", stats.exported);
//! ```

pub mod assemble;
pub mod checkpoint;
pub mod classify;
pub mod error;
pub mod handle;
pub mod images;
pub mod input;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod relations;
pub mod repository;
mod xml;

// Re-export main types for convenience
pub use crate::assemble::{assemble, AssembledItem};
pub use crate::checkpoint::Checkpoint;
pub use crate::classify::{classify, ObjectType};
pub use crate::error::ExportError;
pub use crate::handle::parse_handle;
pub use crate::images::{download_images, ImageOptions, ImageStats, DEFAULT_DELAY};
pub use crate::input::load_pids;
pub use crate::metadata::{parse_metadata, MetadataFields};
pub use crate::output::{OutputPaths, SUBDELIMITER};
pub use crate::pipeline::{run_export, CancelFlag, ExportOptions, ExportStats};
pub use crate::records::{CollectionRecord, CollectionRegistry, FileRecord, ItemRecord};
pub use crate::relations::{resolve_relations, RelationEntry, RelationKind};
pub use crate::repository::{HttpRepository, Repository, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
