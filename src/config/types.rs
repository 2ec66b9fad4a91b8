//! Configuration types
//!
//! `config.json` holds the pane registry, per-agent deny lists and a few
//! transport settings. Every field has a default so partial files load.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::identity::{PaneRegistry, HUMAN_ACTOR};
use crate::permissions::{is_token, DenyRule};
use crate::transport::{TmuxTransport, DEFAULT_PANE_FORMAT, DEFAULT_TIMEOUT_MS};

/// Deny list for one agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPermissionConfig {
    /// Deny patterns, parsed at load time
    #[serde(default)]
    pub deny: Vec<DenyRule>,
}

/// Transport and display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// tmux format used for pane coordinates in the registry
    #[serde(default = "default_pane_format")]
    pub pane_format: String,

    /// Timeout for a single tmux call in milliseconds
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,

    /// Lines captured by `read` when `--lines` is not given
    #[serde(default = "default_capture_lines")]
    pub capture_lines: usize,
}

fn default_pane_format() -> String {
    DEFAULT_PANE_FORMAT.to_string()
}

fn default_transport_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_capture_lines() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pane_format: default_pane_format(),
            transport_timeout_ms: default_transport_timeout_ms(),
            capture_lines: default_capture_lines(),
        }
    }
}

/// The full project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmConfig {
    /// Agent name -> pane coordinate
    #[serde(default)]
    pub agents: PaneRegistry,

    /// Agent name -> deny list
    #[serde(default)]
    pub permissions: BTreeMap<String, AgentPermissionConfig>,

    #[serde(default)]
    pub settings: Settings,
}

impl PmConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// The pane registry
    pub fn registry(&self) -> &PaneRegistry {
        &self.agents
    }

    /// Deny rules for `agent` (empty when it has none)
    pub fn deny_rules(&self, agent: &str) -> &[DenyRule] {
        self.permissions
            .get(agent)
            .map(|p| p.deny.as_slice())
            .unwrap_or(&[])
    }

    /// Append a deny rule; returns false if an equal rule is already present
    pub fn add_deny(&mut self, agent: &str, rule: DenyRule) -> bool {
        let entry = self.permissions.entry(agent.to_string()).or_default();
        if entry.deny.contains(&rule) {
            return false;
        }
        tracing::info!("Adding deny rule {} for {}", rule, agent);
        entry.deny.push(rule);
        true
    }

    /// Remove a deny rule; returns whether anything was removed
    ///
    /// `pattern` is compared in canonical form, so field order and spacing
    /// don't matter.
    pub fn remove_deny(&mut self, agent: &str, pattern: &str) -> bool {
        let target = DenyRule::parse(pattern);
        let Some(entry) = self.permissions.get_mut(agent) else {
            return false;
        };

        let before = entry.deny.len();
        entry.deny.retain(|rule| *rule != target);
        let removed = entry.deny.len() != before;

        if entry.deny.is_empty() {
            self.permissions.remove(agent);
        }
        removed
    }

    /// Build the tmux transport described by the settings
    pub fn transport(&self) -> TmuxTransport {
        TmuxTransport::new()
            .with_pane_format(self.settings.pane_format.clone())
            .with_timeout_ms(self.settings.transport_timeout_ms)
    }

    /// Report problems that would make identity or permissions surprising
    ///
    /// Problems are reported, never fatal: a malformed pattern simply never
    /// matches at evaluation time.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (agent, _) in self.agents.iter() {
            if agent == HUMAN_ACTOR {
                issues.push(ConfigIssue::ReservedName {
                    agent: agent.to_string(),
                });
            } else if !is_token(agent) {
                issues.push(ConfigIssue::InvalidAgentName {
                    agent: agent.to_string(),
                });
            }
        }

        let mut by_pane: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (agent, pane) in self.agents.iter() {
            by_pane.entry(pane).or_default().push(agent.to_string());
        }
        for (pane, agents) in by_pane {
            if agents.len() > 1 {
                issues.push(ConfigIssue::DuplicatePane {
                    pane: pane.to_string(),
                    agents,
                });
            }
        }

        for (agent, perms) in &self.permissions {
            if !self.agents.contains(agent) {
                issues.push(ConfigIssue::UnknownAgentRules {
                    agent: agent.clone(),
                });
            }
            let mut seen = BTreeSet::new();
            for rule in &perms.deny {
                if let DenyRule::Malformed(raw) = rule {
                    if seen.insert(raw.as_str()) {
                        issues.push(ConfigIssue::MalformedPattern {
                            agent: agent.clone(),
                            pattern: raw.clone(),
                        });
                    }
                }
            }
        }

        issues
    }
}

/// A problem found by [`PmConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigIssue {
    /// Deny pattern that will never match anything
    MalformedPattern { agent: String, pattern: String },
    /// Several agents registered to one pane; only the first is ever resolved
    DuplicatePane { pane: String, agents: Vec<String> },
    /// `human` cannot be registered as an agent
    ReservedName { agent: String },
    /// Agent name is not a `[A-Za-z0-9_]` token
    InvalidAgentName { agent: String },
    /// Deny list for an agent that has no pane
    UnknownAgentRules { agent: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MalformedPattern { agent, pattern } => {
                write!(f, "{}: deny pattern {:?} is malformed and will never match", agent, pattern)
            }
            ConfigIssue::DuplicatePane { pane, agents } => {
                write!(f, "pane {} is registered to several agents: {}", pane, agents.join(", "))
            }
            ConfigIssue::ReservedName { agent } => {
                write!(f, "{}: reserved for the human operator", agent)
            }
            ConfigIssue::InvalidAgentName { agent } => {
                write!(f, "{:?}: agent names must be [A-Za-z0-9_] tokens", agent)
            }
            ConfigIssue::UnknownAgentRules { agent } => write!(
                f,
                "{}: has deny rules but no registered pane (applies only via {} / {})",
                agent,
                crate::identity::ACTOR_ENV,
                crate::identity::AGENT_ENV
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "agents": { "codex": "10.1", "claude": "10.2" },
        "permissions": {
            "codex": { "deny": ["pm:task:update(status)", "pm:team:*"] }
        }
    }"#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let config: PmConfig = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(config.registry().pane_of("codex"), Some("10.1"));
        assert_eq!(config.deny_rules("codex").len(), 2);
        assert!(config.deny_rules("claude").is_empty());
        assert!(config.deny_rules("nobody").is_empty());
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.settings.pane_format, DEFAULT_PANE_FORMAT);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: PmConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PmConfig::default());
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut config: PmConfig = serde_json::from_str(SAMPLE).unwrap();
        config.agents.insert("human", "0.0");
        config.agents.insert("gemini", "10.1");
        config.add_deny("ghost", DenyRule::parse("pm:task:delete"));

        let issues = config.validate();

        assert!(issues.contains(&ConfigIssue::MalformedPattern {
            agent: "codex".into(),
            pattern: "pm:team:*".into()
        }));
        assert!(issues.contains(&ConfigIssue::DuplicatePane {
            pane: "10.1".into(),
            agents: vec!["codex".into(), "gemini".into()]
        }));
        assert!(issues.contains(&ConfigIssue::ReservedName {
            agent: "human".into()
        }));
        assert!(issues.contains(&ConfigIssue::UnknownAgentRules {
            agent: "ghost".into()
        }));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_clean_config_has_no_issues() {
        let mut config = PmConfig::new();
        config.agents.insert("codex", "10.1");
        config.add_deny("codex", DenyRule::parse("pm:task:delete"));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_add_and_remove_deny() {
        let mut config = PmConfig::new();

        assert!(config.add_deny("codex", DenyRule::parse("pm:task:update(status,assignee)")));
        assert!(!config.add_deny("codex", DenyRule::parse("pm:task:update(assignee, status)")));
        assert_eq!(config.deny_rules("codex").len(), 1);

        assert!(!config.remove_deny("codex", "pm:task:delete"));
        assert!(config.remove_deny("codex", "pm:task:update(assignee,status)"));
        assert!(config.deny_rules("codex").is_empty());
        assert!(!config.permissions.contains_key("codex"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let config: PmConfig = serde_json::from_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: PmConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back, config);
        // Malformed patterns are written back untouched
        assert!(json.contains("pm:team:*"));
    }
}
