//! Permission checks
//!
//! A `PermissionCheck` describes the operation a command is about to perform:
//! a resource, an action on it, and (for updates) the set of fields touched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::core::{PmError, PmResult};

use super::path::{is_token, PermissionPath};

/// Resources managed by pane-pm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Task,
    Milestone,
    Doc,
    Team,
    Log,
    Message,
}

impl Resource {
    /// Name used in permission paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Task => "task",
            Resource::Milestone => "milestone",
            Resource::Doc => "doc",
            Resource::Team => "team",
            Resource::Log => "log",
            Resource::Message => "message",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation requested by the current command
///
/// Fields are kept in a `BTreeSet`, so iteration is always alphabetical and
/// logically equal checks canonicalize to the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub fields: BTreeSet<String>,
}

impl PermissionCheck {
    /// Build a check from raw parts
    ///
    /// Rejects empty or non-token resource/action/field names, since those
    /// could never round-trip through a permission path.
    pub fn new<I, S>(resource: &str, action: &str, fields: I) -> PmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !is_token(resource) {
            return Err(PmError::InvalidCheck(format!(
                "resource must be a non-empty [A-Za-z0-9_] token, got {:?}",
                resource
            )));
        }
        if !is_token(action) {
            return Err(PmError::InvalidCheck(format!(
                "action must be a non-empty [A-Za-z0-9_] token, got {:?}",
                action
            )));
        }

        let fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
        if let Some(bad) = fields.iter().find(|f| !is_token(f)) {
            return Err(PmError::InvalidCheck(format!(
                "field names must be [A-Za-z0-9_] tokens, got {:?}",
                bad
            )));
        }

        Ok(Self {
            resource: resource.to_string(),
            action: action.to_string(),
            fields,
        })
    }

    fn simple(resource: Resource, action: &str) -> Self {
        Self {
            resource: resource.as_str().to_string(),
            action: action.to_string(),
            fields: BTreeSet::new(),
        }
    }

    /// `pm:<resource>:list`
    pub fn list(resource: Resource) -> Self {
        Self::simple(resource, "list")
    }

    /// `pm:<resource>:show`
    pub fn show(resource: Resource) -> Self {
        Self::simple(resource, "show")
    }

    /// `pm:<resource>:create`
    pub fn create(resource: Resource) -> Self {
        Self::simple(resource, "create")
    }

    /// `pm:<resource>:delete`
    pub fn delete(resource: Resource) -> Self {
        Self::simple(resource, "delete")
    }

    /// `pm:<resource>:update(<fields>)`
    pub fn update<I, S>(resource: Resource, fields: I) -> PmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(resource.as_str(), "update", fields)
    }

    /// `pm:message:send`
    pub fn send_message() -> Self {
        Self::simple(Resource::Message, "send")
    }

    /// Canonical permission path, fields sorted alphabetically
    pub fn canonical_path(&self) -> String {
        PermissionPath::from(self).to_string()
    }
}

impl fmt::Display for PermissionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_path())
    }
}
