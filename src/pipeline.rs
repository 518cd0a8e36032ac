//! Batch driver
//!
//! Strictly sequential processing: one identifier's full pipeline (classify,
//! metadata, relations, handle, assemble) completes before the next begins.
//! The collection registry is the only shared mutable state and lives on this
//! driver's stack. Cancellation is cooperative, checked between identifiers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::assemble::{assemble, AssembledItem};
use crate::checkpoint::Checkpoint;
use crate::classify::{classify, ObjectType};
use crate::error::ExportError;
use crate::handle::parse_handle;
use crate::input::load_pids;
use crate::metadata::parse_metadata;
use crate::output::{self, OutputPaths};
use crate::records::{CollectionRegistry, FileRecord, ItemRecord};
use crate::relations::resolve_relations;
use crate::repository::Repository;

/// Options for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// File with one object identifier per line.
    pub pid_file: PathBuf,
    /// Prefix for the generated output files.
    pub output_prefix: String,
    /// Skip identifiers completed by a previous run and append to its output.
    pub resume: bool,
}

/// Statistics from one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Identifiers actually processed (resume-skipped ones excluded).
    pub processed: usize,
    pub exported: usize,
    pub collections_skipped: usize,
    pub unknown_skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Cooperative cancellation flag, checked between identifiers.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Outcome {
    Item(AssembledItem),
    Collection,
    Unknown(String),
}

/// Run the whole batch and write the three output families.
///
/// A transport failure aborts the loop, but everything assembled up to that
/// point is still written before the error is returned. Per-identifier faults
/// are logged and skipped.
pub fn run_export<R: Repository + ?Sized>(
    repo: &R,
    options: &ExportOptions,
    cancel: &CancelFlag,
) -> Result<ExportStats, ExportError> {
    let pids = load_pids(&options.pid_file)?;
    let paths = OutputPaths::new(&options.output_prefix);
    info!("loaded {} pids from {}", pids.len(), options.pid_file.display());

    let mut checkpoint = if options.resume && paths.checkpoint.exists() {
        let checkpoint = Checkpoint::load(&paths.checkpoint)?;
        info!(
            "resuming: {} pids already completed",
            checkpoint.completed.len()
        );
        checkpoint
    } else {
        Checkpoint::default()
    };
    let mut registry =
        CollectionRegistry::from_records(std::mem::take(&mut checkpoint.collections));
    let append = options.resume;

    let mut items: Vec<ItemRecord> = Vec::new();
    let mut files: Vec<FileRecord> = Vec::new();
    let mut stats = ExportStats::default();
    let mut fatal: Option<ExportError> = None;

    for pid in &pids {
        if cancel.is_cancelled() {
            info!("cancellation requested; stopping before {}", pid);
            stats.cancelled = true;
            break;
        }
        if options.resume && checkpoint.is_completed(pid) {
            debug!("{} already completed; skipping", pid);
            continue;
        }

        stats.processed += 1;
        match process_one(repo, pid, &mut registry) {
            Ok(Outcome::Item(assembled)) => {
                info!(
                    "{}: {} pages, {} collection memberships",
                    pid,
                    assembled.files.len(),
                    assembled.item.member_of.len()
                );
                files.extend(assembled.files);
                items.push(assembled.item);
                checkpoint.mark_completed(pid);
                stats.exported += 1;
            }
            Ok(Outcome::Collection) => {
                info!("{} is a collection; skipping", pid);
                checkpoint.mark_completed(pid);
                stats.collections_skipped += 1;
            }
            Ok(Outcome::Unknown(tag)) => {
                warn!("unexpected digital object type {} for {}; skipping", tag, pid);
                checkpoint.mark_completed(pid);
                stats.unknown_skipped += 1;
            }
            Err(e) if e.is_fatal() => {
                error!("aborting batch: {}", e);
                fatal = Some(e);
                break;
            }
            Err(e) => {
                warn!("skipping {}: {}", pid, e);
                stats.failed += 1;
            }
        }
    }

    // Whatever was assembled gets written, even when aborting.
    output::write_items(&paths.items, &items, append)?;
    output::write_files(&paths.files, &files, append)?;
    output::write_collections(&paths.collections, registry.records())?;
    checkpoint.collections = registry.records().to_vec();
    checkpoint.save(&paths.checkpoint)?;
    info!(
        "wrote {} items, {} collections, {} files",
        items.len(),
        registry.len(),
        files.len()
    );

    match fatal {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}

fn process_one<R: Repository + ?Sized>(
    repo: &R,
    pid: &str,
    registry: &mut CollectionRegistry,
) -> Result<Outcome, ExportError> {
    match classify(pid, &repo.object_type_doc(pid)?)? {
        ObjectType::Collection => Ok(Outcome::Collection),
        ObjectType::Unknown(tag) => Ok(Outcome::Unknown(tag)),
        ObjectType::Content => {
            let metadata = parse_metadata(pid, &repo.metadata_doc(pid)?)?;
            let relations = resolve_relations(pid, &repo.relations_doc(pid)?)?;
            let handle = parse_handle(pid, &repo.handle_doc(pid)?)?;
            Ok(Outcome::Item(assemble(
                pid, metadata, relations, handle, repo, registry,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doinfo(type_tag: &str) -> String {
        format!(
            r#"<doInfo xmlns="http://www.itd.umd.edu/fedora/doInfo"><type>{}</type></doInfo>"#,
            type_tag
        )
    }

    fn metadata_doc(title: &str) -> String {
        format!(
            r#"<descMeta>
  <mediaType type="image"><form type="analog">photograph</form></mediaType>
  <title type="main">{}</title>
  <covTime><century>1900-1999</century><date>1925-05-01</date></covTime>
  <repository><corpName>Special Collections</corpName></repository>
  <subject type="topical">Labor unions</subject>
</descMeta>"#,
            title
        )
    }

    fn rels_doc(collections: &[&str], parts: &[(&str, u32)]) -> String {
        let mut file_sec = String::new();
        let mut membership = String::new();
        let mut has_part = String::new();
        let mut pages = String::new();
        for (i, collection) in collections.iter().enumerate() {
            file_sec.push_str(&format!(
                r#"<file ID="rel{}"><FLocat xlink:href="{}"/></file>"#,
                i, collection
            ));
            membership.push_str(&format!(r#"<fptr FILEID="rel{}"/>"#, i));
        }
        for (i, (part, order)) in parts.iter().enumerate() {
            file_sec.push_str(&format!(
                r#"<file ID="img{}"><FLocat xlink:href="{}"/></file>"#,
                i, part
            ));
            has_part.push_str(&format!(r#"<fptr FILEID="img{}"/>"#, i));
            pages.push_str(&format!(
                r#"<div ORDER="{}" LABEL="Page {}"><div><fptr FILEID="img{}"/></div></div>"#,
                order, order, i
            ));
        }
        format!(
            r#"<mets xmlns="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink">
  <fileSec><fileGrp>{}</fileGrp></fileSec>
  <structMap>
    <div ID="rels">
      <div ID="isMemberOfCollection">{}</div>
      <div ID="hasPart">{}</div>
    </div>
    <div ID="images">{}</div>
  </structMap>
</mets>"#,
            file_sec, membership, has_part, pages
        )
    }

    #[derive(Default)]
    struct FakeRepository {
        types: HashMap<String, String>,
        metadata: HashMap<String, String>,
        relations: HashMap<String, String>,
        handles: HashMap<String, String>,
    }

    impl FakeRepository {
        fn add_collection(&mut self, pid: &str) {
            self.types.insert(pid.to_string(), doinfo("UMD_COLLECTION"));
        }

        fn add_content(&mut self, pid: &str, collections: &[&str], parts: &[(&str, u32)]) {
            self.types.insert(pid.to_string(), doinfo("UMD_IMAGE"));
            self.metadata
                .insert(pid.to_string(), metadata_doc(&format!("Title of {}", pid)));
            self.relations
                .insert(pid.to_string(), rels_doc(collections, parts));
            self.handles.insert(
                pid.to_string(),
                format!(
                    "<response><result><handlehttp>http://hdl.test/{}</handlehttp></result></response>",
                    pid
                ),
            );
        }

        fn set_relations(&mut self, pid: &str, doc: &str) {
            self.relations.insert(pid.to_string(), doc.to_string());
        }

        fn set_handle_doc(&mut self, pid: &str, doc: &str) {
            self.handles.insert(pid.to_string(), doc.to_string());
        }

        fn doc(map: &HashMap<String, String>, pid: &str) -> Result<String, ExportError> {
            map.get(pid)
                .cloned()
                .ok_or_else(|| ExportError::UpstreamUnavailable {
                    pid: pid.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }

    impl Repository for FakeRepository {
        fn object_type_doc(&self, pid: &str) -> Result<String, ExportError> {
            Self::doc(&self.types, pid)
        }
        fn metadata_doc(&self, pid: &str) -> Result<String, ExportError> {
            Self::doc(&self.metadata, pid)
        }
        fn relations_doc(&self, pid: &str) -> Result<String, ExportError> {
            Self::doc(&self.relations, pid)
        }
        fn handle_doc(&self, pid: &str) -> Result<String, ExportError> {
            Self::doc(&self.handles, pid)
        }
        fn image_bytes(&self, _pid: &str) -> Result<Vec<u8>, ExportError> {
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
        fn image_url(&self, pid: &str) -> String {
            format!("http://repo.test/get/{}/image", pid)
        }
    }

    struct TestRun {
        _dir: tempfile::TempDir,
        pid_file: PathBuf,
        prefix: String,
    }

    fn test_run(pids: &[&str]) -> TestRun {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pids.txt");
        std::fs::write(&pid_file, pids.join("\n")).unwrap();
        let prefix = dir.path().join("out").to_string_lossy().into_owned();
        TestRun {
            pid_file,
            prefix,
            _dir: dir,
        }
    }

    fn options(run: &TestRun, resume: bool) -> ExportOptions {
        ExportOptions {
            pid_file: run.pid_file.clone(),
            output_prefix: run.prefix.clone(),
            resume,
        }
    }

    fn read(run: &TestRun, suffix: &str) -> String {
        std::fs::read_to_string(format!("{}-{}", run.prefix, suffix)).unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:100", &["umd:999"], &[("umd:101", 1), ("umd:102", 2)]);
        repo.add_collection("umd:200");
        let run = test_run(&["umd:100", "umd:200"]);

        let stats = run_export(&repo, &options(&run, false), &CancelFlag::new()).unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.exported, 1);
        assert_eq!(stats.collections_skipped, 1);
        assert_eq!(stats.failed, 0);

        let items = read(&run, "items.csv");
        assert_eq!(items.lines().count(), 2);
        assert!(items.contains("umd:100"));
        assert!(items.contains("http://hdl.test/umd:100"));
        assert!(items
            .contains("http://repo.test/get/umd:101/image;http://repo.test/get/umd:102/image"));
        assert!(!items.contains("umd:200"));

        let collections = read(&run, "collections.csv");
        assert_eq!(collections.lines().count(), 2);
        assert!(collections.contains("umd:999,umd:100"));
        assert!(!collections.contains("umd:200"));

        let files = read(&run, "files.csv");
        assert_eq!(files.lines().count(), 3);
        assert!(files.contains("umd:101,1,Page 1,http://repo.test/get/umd:101/image,umd:100"));
        assert!(files.contains("umd:102,2,Page 2,http://repo.test/get/umd:102/image,umd:100"));
        assert!(!files.contains("umd:200"));
    }

    #[test]
    fn test_collection_membership_accumulates_across_items() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:1", &["umd:900"], &[]);
        repo.add_content("umd:2", &["umd:900"], &[]);
        let run = test_run(&["umd:1", "umd:2"]);

        run_export(&repo, &options(&run, false), &CancelFlag::new()).unwrap();

        let collections = read(&run, "collections.csv");
        assert_eq!(collections.lines().count(), 2);
        assert!(collections.contains("umd:900,umd:1;umd:2"));
    }

    #[test]
    fn test_faulty_identifier_does_not_poison_the_batch() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:bad", &[], &[("umd:11", 1)]);
        repo.set_relations(
            "umd:bad",
            r#"<mets xmlns="http://www.loc.gov/METS/">
  <structMap>
    <div ID="images"><div ORDER="1" LABEL="Page 1"><div><fptr FILEID="ghost"/></div></div></div>
  </structMap>
</mets>"#,
        );
        repo.add_content("umd:good", &[], &[("umd:21", 1)]);
        let run = test_run(&["umd:bad", "umd:good"]);

        let stats = run_export(&repo, &options(&run, false), &CancelFlag::new()).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.exported, 1);

        let items = read(&run, "items.csv");
        assert!(!items.contains("umd:bad"));
        assert!(items.contains("umd:good"));
    }

    #[test]
    fn test_missing_handle_skips_identifier_only() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:1", &[], &[]);
        repo.set_handle_doc("umd:1", "<response><result/></response>");
        repo.add_content("umd:2", &[], &[]);
        let run = test_run(&["umd:1", "umd:2"]);

        let stats = run_export(&repo, &options(&run, false), &CancelFlag::new()).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.exported, 1);
    }

    #[test]
    fn test_transport_failure_aborts_but_writes_assembled_records() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:1", &[], &[]);
        // umd:unreachable has no documents at all.
        let run = test_run(&["umd:1", "umd:unreachable", "umd:never"]);

        let result = run_export(&repo, &options(&run, false), &CancelFlag::new());
        assert!(matches!(
            result,
            Err(ExportError::UpstreamUnavailable { pid, .. }) if pid == "umd:unreachable"
        ));

        let items = read(&run, "items.csv");
        assert!(items.contains("umd:1"));
        assert!(!items.contains("umd:never"));
    }

    #[test]
    fn test_cancellation_between_identifiers() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:1", &[], &[]);
        let run = test_run(&["umd:1"]);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let stats = run_export(&repo, &options(&run, false), &cancel).unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.processed, 0);

        // Output files still exist, holding just their headers.
        assert!(read(&run, "items.csv").starts_with("pid,"));
    }

    #[test]
    fn test_resume_skips_completed_and_appends() {
        let mut repo = FakeRepository::default();
        repo.add_content("umd:1", &["umd:900"], &[]);
        repo.add_content("umd:2", &["umd:900"], &[]);

        let first = test_run(&["umd:1"]);
        let stats = run_export(&repo, &options(&first, false), &CancelFlag::new()).unwrap();
        assert_eq!(stats.exported, 1);

        // Second run over the extended pid list, resuming into the same
        // output prefix.
        std::fs::write(&first.pid_file, "umd:1\numd:2\n").unwrap();
        let stats = run_export(&repo, &options(&first, true), &CancelFlag::new()).unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.exported, 1);

        let items = read(&first, "items.csv");
        assert_eq!(items.lines().count(), 3);
        assert_eq!(items.lines().filter(|l| l.starts_with("pid,")).count(), 1);
        assert!(items.contains("umd:1"));
        assert!(items.contains("umd:2"));

        // Registry restored from the checkpoint: membership keeps
        // accumulating across runs.
        let collections = read(&first, "collections.csv");
        assert!(collections.contains("umd:900,umd:1;umd:2"));
    }

    #[test]
    fn test_unknown_type_is_skipped_not_failed() {
        let mut repo = FakeRepository::default();
        repo.types
            .insert("umd:odd".to_string(), doinfo("UMD_VIDEO"));
        let run = test_run(&["umd:odd"]);

        let stats = run_export(&repo, &options(&run, false), &CancelFlag::new()).unwrap();
        assert_eq!(stats.unknown_skipped, 1);
        assert_eq!(stats.failed, 0);
    }
}
