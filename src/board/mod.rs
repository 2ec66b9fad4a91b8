//! Shared project board
//!
//! Tasks, milestones and docs are generic records with a title and free-form
//! fields; the log is an append-only list of messages.

mod record;
mod store;

pub use record::{parse_assignments, LogEntry, Record, RecordKind, RecordPatch, TITLE_FIELD};
pub use store::{Board, BoardStore, Collection, LogBook};
