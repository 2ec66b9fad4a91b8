//! Board record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::{PmError, PmResult};
use crate::permissions::{is_token, Resource};

/// Field name reserved for a record's title
pub const TITLE_FIELD: &str = "title";

/// Kinds of board records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Task,
    Milestone,
    Doc,
}

impl RecordKind {
    /// Permission resource guarding this kind
    pub fn resource(&self) -> Resource {
        match self {
            RecordKind::Task => Resource::Task,
            RecordKind::Milestone => Resource::Milestone,
            RecordKind::Doc => Resource::Doc,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource().as_str())
    }
}

/// A task, milestone or doc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    /// Free-form fields (status, assignee, ...)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Actor that created the record
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a new record
    pub fn new(
        id: u64,
        title: impl Into<String>,
        fields: BTreeMap<String, String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            fields,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch and bump `updated_at`
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        for key in &patch.unset {
            self.fields.remove(key);
        }
        for (key, value) in &patch.set {
            self.fields.insert(key.clone(), value.clone());
        }
        self.updated_at = Utc::now();
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Changes requested by an update command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub set: BTreeMap<String, String>,
    pub unset: BTreeSet<String>,
}

impl RecordPatch {
    /// Build a patch from CLI arguments
    ///
    /// `assignments` are `key=value` strings. Keys must be tokens and may not
    /// be `title` (the title has its own argument).
    pub fn from_args(
        title: Option<String>,
        assignments: &[String],
        unset: &[String],
    ) -> PmResult<Self> {
        let set = parse_assignments(assignments)?;
        let mut removed = BTreeSet::new();
        for key in unset {
            validate_field_name(key)?;
            removed.insert(key.clone());
        }

        Ok(Self {
            title,
            set,
            unset: removed,
        })
    }

    /// Names of all fields this patch touches
    pub fn fields(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = self.set.keys().cloned().collect();
        fields.extend(self.unset.iter().cloned());
        if self.title.is_some() {
            fields.insert(TITLE_FIELD.to_string());
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.set.is_empty() && self.unset.is_empty()
    }
}

fn validate_field_name(key: &str) -> PmResult<()> {
    if !is_token(key) {
        return Err(PmError::invalid_input(format!(
            "field names must be [A-Za-z0-9_] tokens, got {:?}",
            key
        )));
    }
    if key == TITLE_FIELD {
        return Err(PmError::invalid_input(
            "use --title to change a record's title",
        ));
    }
    Ok(())
}

/// Parse `key=value` assignments
pub fn parse_assignments(assignments: &[String]) -> PmResult<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for raw in assignments {
        let (key, value) = raw.split_once('=').ok_or_else(|| {
            PmError::invalid_input(format!("expected key=value, got {:?}", raw))
        })?;
        let key = key.trim();
        validate_field_name(key)?;
        fields.insert(key.to_string(), value.to_string());
    }
    Ok(fields)
}

/// An entry in the shared log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub actor: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_assignments() {
        let fields = parse_assignments(&args(&["status=done", "note=a=b", "empty="])).unwrap();

        assert_eq!(fields.get("status").map(String::as_str), Some("done"));
        assert_eq!(fields.get("note").map(String::as_str), Some("a=b"));
        assert_eq!(fields.get("empty").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_assignments_rejects_bad_keys() {
        assert!(parse_assignments(&args(&["status"])).is_err());
        assert!(parse_assignments(&args(&["bad key=x"])).is_err());
        assert!(parse_assignments(&args(&["title=x"])).is_err());
    }

    #[test]
    fn test_patch_fields() {
        let patch = RecordPatch::from_args(
            Some("New title".into()),
            &args(&["status=done", "assignee=codex"]),
            &args(&["blocked_by"]),
        )
        .unwrap();

        let fields: Vec<String> = patch.fields().into_iter().collect();
        assert_eq!(fields, vec!["assignee", "blocked_by", "status", "title"]);
        assert!(!patch.is_empty());
        assert!(RecordPatch::default().is_empty());
    }

    #[test]
    fn test_apply_patch() {
        let mut fields = BTreeMap::new();
        fields.insert("blocked_by".to_string(), "3".to_string());
        let mut record = Record::new(1, "Write parser", fields, "human");
        let created = record.updated_at;

        let patch =
            RecordPatch::from_args(None, &args(&["status=done"]), &args(&["blocked_by"])).unwrap();
        record.apply(&patch);

        assert_eq!(record.title, "Write parser");
        assert_eq!(record.field("status"), Some("done"));
        assert_eq!(record.field("blocked_by"), None);
        assert!(record.updated_at >= created);
    }
}
