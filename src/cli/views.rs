//! Serializable views used for command output

use serde::Serialize;

use crate::config::PmConfig;
use crate::identity::PaneIndex;
use crate::transport::PaneInfo;

/// A registered (or deny-listed) agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub name: String,
    /// `None` for agents that only have deny rules
    pub pane: Option<String>,
    pub deny: Vec<String>,
}

impl TeamMember {
    pub fn from_config(config: &PmConfig, name: &str) -> Self {
        Self {
            name: name.to_string(),
            pane: config.registry().pane_of(name).map(str::to_string),
            deny: config
                .deny_rules(name)
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Every registered agent, in name order
    pub fn roster(config: &PmConfig) -> Vec<Self> {
        config
            .registry()
            .iter()
            .map(|(name, _)| Self::from_config(config, name))
            .collect()
    }
}

/// A multiplexer pane joined with the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneRow {
    pub coordinate: String,
    pub pane_id: String,
    pub command: String,
    pub agent: Option<String>,
}

impl PaneRow {
    pub fn join(panes: Vec<PaneInfo>, index: &PaneIndex) -> Vec<Self> {
        panes
            .into_iter()
            .map(|pane| PaneRow {
                agent: index.agent_at(&pane.coordinate).map(str::to_string),
                coordinate: pane.coordinate,
                pane_id: pane.pane_id,
                command: pane.command,
            })
            .collect()
    }
}

/// Result of `send`
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub from: String,
    pub to: String,
    pub pane: String,
    pub text: String,
}

/// Result of `read`
#[derive(Debug, Clone, Serialize)]
pub struct Capture {
    pub agent: String,
    pub pane: String,
    pub lines: usize,
    pub text: String,
}
