//! Resume state
//!
//! A checkpoint records which pids have been fully processed and a snapshot of
//! the collection registry, so a resumed run can skip completed work while
//! collection membership keeps accumulating across runs. The checkpoint is
//! only written after the output files are, so it never claims rows that were
//! not persisted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::records::CollectionRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Pids already processed to completion, in processing order.
    pub completed: Vec<String>,
    /// Collection-registry snapshot at the time of the last write.
    pub collections: Vec<CollectionRecord>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn is_completed(&self, pid: &str) -> bool {
        self.completed.iter().any(|p| p == pid)
    }

    pub fn mark_completed(&mut self, pid: &str) {
        if !self.is_completed(pid) {
            self.completed.push(pid.to_string());
        }
    }
}
