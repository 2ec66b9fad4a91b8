//! Board storage
//!
//! The whole board is one JSON document (`.pane-pm/board.json`), read at the
//! start of a command and written back after a mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use super::record::{LogEntry, Record, RecordKind, RecordPatch};
use crate::core::{PmError, PmResult};

/// Records of one kind with their id counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub items: Vec<Record>,
}

impl Collection {
    fn allocate_id(&mut self) -> u64 {
        // Ids start at 1 and are never reused
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// The shared log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBook {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub entries: Vec<LogEntry>,
}

/// In-memory board state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub tasks: Collection,
    #[serde(default)]
    pub milestones: Collection,
    #[serde(default)]
    pub docs: Collection,
    #[serde(default)]
    pub log: LogBook,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: RecordKind) -> &Collection {
        match kind {
            RecordKind::Task => &self.tasks,
            RecordKind::Milestone => &self.milestones,
            RecordKind::Doc => &self.docs,
        }
    }

    fn collection_mut(&mut self, kind: RecordKind) -> &mut Collection {
        match kind {
            RecordKind::Task => &mut self.tasks,
            RecordKind::Milestone => &mut self.milestones,
            RecordKind::Doc => &mut self.docs,
        }
    }

    fn not_found(kind: RecordKind, id: u64) -> PmError {
        PmError::RecordNotFound {
            resource: kind.to_string(),
            id,
        }
    }

    /// All records of `kind`, in id order
    pub fn list(&self, kind: RecordKind) -> &[Record] {
        &self.collection(kind).items
    }

    pub fn get(&self, kind: RecordKind, id: u64) -> PmResult<&Record> {
        self.collection(kind)
            .items
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(kind, id))
    }

    /// Create a record and return a copy of it
    pub fn create(
        &mut self,
        kind: RecordKind,
        title: impl Into<String>,
        fields: BTreeMap<String, String>,
        actor: &str,
    ) -> Record {
        let collection = self.collection_mut(kind);
        let record = Record::new(collection.allocate_id(), title, fields, actor);
        tracing::info!("{} created {} #{}", actor, kind, record.id);
        collection.items.push(record.clone());
        record
    }

    /// Apply `patch` to a record and return the updated copy
    pub fn update(&mut self, kind: RecordKind, id: u64, patch: &RecordPatch) -> PmResult<Record> {
        let record = self
            .collection_mut(kind)
            .items
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(kind, id))?;
        record.apply(patch);
        Ok(record.clone())
    }

    /// Remove a record and return it
    pub fn delete(&mut self, kind: RecordKind, id: u64) -> PmResult<Record> {
        let items = &mut self.collection_mut(kind).items;
        let index = items
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Self::not_found(kind, id))?;
        Ok(items.remove(index))
    }

    /// Append a log entry
    pub fn append_log(&mut self, actor: &str, message: impl Into<String>) -> LogEntry {
        self.log.next_id = self.log.next_id.max(1);
        let entry = LogEntry {
            id: self.log.next_id,
            actor: actor.to_string(),
            message: message.into(),
            at: Utc::now(),
        };
        self.log.next_id += 1;
        self.log.entries.push(entry.clone());
        entry
    }

    /// The most recent `limit` log entries, oldest first
    pub fn log_entries(&self, limit: Option<usize>) -> &[LogEntry] {
        let entries = &self.log.entries;
        let start = limit
            .map(|n| entries.len().saturating_sub(n))
            .unwrap_or(0);
        &entries[start..]
    }

    pub fn log_entry(&self, id: u64) -> PmResult<&LogEntry> {
        self.log
            .entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| PmError::RecordNotFound {
                resource: "log".to_string(),
                id,
            })
    }
}

/// Reads and writes `board.json`
#[derive(Debug, Clone)]
pub struct BoardStore {
    path: PathBuf,
}

impl BoardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the board (empty when the file is missing)
    pub fn load(&self) -> PmResult<Board> {
        if !self.path.exists() {
            return Ok(Board::default());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the board
    pub fn save(&self, board: &Board) -> PmResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, board)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
