//! Permission paths and deny rules
//!
//! Grammar: `pm:<resource>:<action>` optionally followed by
//! `(<field>,<field>,...)` or `(*)`. Resource, action and field names are
//! `[A-Za-z0-9_]+` tokens.
//!
//! Deny patterns are parsed once, when the config is loaded, into a
//! [`DenyRule`]. The string form only exists in the config file.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use super::check::PermissionCheck;

const PATH_PREFIX: &str = "pm";

fn path_regex() -> &'static Regex {
    static PATH_RE: OnceLock<Regex> = OnceLock::new();
    PATH_RE.get_or_init(|| {
        Regex::new(r"^pm:([A-Za-z0-9_]+):([A-Za-z0-9_]+)(?:\(([^()]*)\))?$")
            .expect("permission path regex is valid")
    })
}

/// Whether `s` is a non-empty `[A-Za-z0-9_]` token
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// How a permission path constrains fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    /// No parentheses: the whole action, whatever the fields
    Action,
    /// `(*)`: any non-empty field set
    Wildcard,
    /// `(a,b)`: any check touching at least one listed field
    Listed(BTreeSet<String>),
}

/// A parsed permission path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPath {
    pub resource: String,
    pub action: String,
    pub fields: FieldMatch,
}

impl PermissionPath {
    /// Parse a permission path
    ///
    /// Returns `None` when the string does not follow the grammar. Empty
    /// parentheses and empty list entries (`(a,,b)`) are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = path_regex().captures(raw.trim())?;
        let resource = caps.get(1)?.as_str().to_string();
        let action = caps.get(2)?.as_str().to_string();

        let fields = match caps.get(3) {
            None => FieldMatch::Action,
            Some(list) if list.as_str().trim() == "*" => FieldMatch::Wildcard,
            Some(list) => {
                let mut names = BTreeSet::new();
                for name in list.as_str().split(',') {
                    let name = name.trim();
                    if !is_token(name) {
                        return None;
                    }
                    names.insert(name.to_string());
                }
                FieldMatch::Listed(names)
            }
        };

        Some(Self {
            resource,
            action,
            fields,
        })
    }

    /// Field names in sorted order (empty for `Action`, `["*"]` for `Wildcard`)
    pub fn field_names(&self) -> Vec<&str> {
        match &self.fields {
            FieldMatch::Action => Vec::new(),
            FieldMatch::Wildcard => vec!["*"],
            FieldMatch::Listed(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Check whether this path, used as a deny pattern, blocks `check`
    pub fn matches(&self, check: &PermissionCheck) -> bool {
        if self.resource != check.resource || self.action != check.action {
            return false;
        }

        match &self.fields {
            FieldMatch::Action => true,
            // A field-less use of the action is not covered by `(*)`
            FieldMatch::Wildcard => !check.fields.is_empty(),
            FieldMatch::Listed(names) => !names.is_disjoint(&check.fields),
        }
    }
}

impl From<&PermissionCheck> for PermissionPath {
    fn from(check: &PermissionCheck) -> Self {
        let fields = if check.fields.is_empty() {
            FieldMatch::Action
        } else {
            FieldMatch::Listed(check.fields.clone())
        };

        Self {
            resource: check.resource.clone(),
            action: check.action.clone(),
            fields,
        }
    }
}

impl fmt::Display for PermissionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", PATH_PREFIX, self.resource, self.action)?;
        match &self.fields {
            FieldMatch::Action => Ok(()),
            FieldMatch::Wildcard => f.write_str("(*)"),
            FieldMatch::Listed(names) => {
                let joined: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "({})", joined.join(","))
            }
        }
    }
}

/// A stored deny pattern
///
/// Malformed patterns are kept (so they can be reported and written back)
/// but never match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DenyRule {
    Pattern(PermissionPath),
    Malformed(String),
}

impl DenyRule {
    /// Parse a deny pattern
    pub fn parse(raw: &str) -> Self {
        match PermissionPath::parse(raw) {
            Some(path) => DenyRule::Pattern(path),
            None => DenyRule::Malformed(raw.to_string()),
        }
    }

    /// Check whether this rule blocks `check`
    pub fn matches(&self, check: &PermissionCheck) -> bool {
        match self {
            DenyRule::Pattern(path) => path.matches(check),
            DenyRule::Malformed(_) => false,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DenyRule::Malformed(_))
    }
}

impl From<String> for DenyRule {
    fn from(raw: String) -> Self {
        DenyRule::parse(&raw)
    }
}

impl From<DenyRule> for String {
    fn from(rule: DenyRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for DenyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyRule::Pattern(path) => fmt::Display::fmt(path, f),
            DenyRule::Malformed(raw) => f.write_str(raw),
        }
    }
}
