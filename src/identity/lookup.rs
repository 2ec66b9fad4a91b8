//! Pane registry and pane lookup

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::transport::PaneTransport;

/// Registered agents, keyed by agent name, valued by pane coordinate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneRegistry(BTreeMap<String, String>);

impl PaneRegistry {
    /// Register (or move) an agent; returns the previous pane if any
    pub fn insert(&mut self, agent: impl Into<String>, pane: impl Into<String>) -> Option<String> {
        self.0.insert(agent.into(), pane.into())
    }

    pub fn remove(&mut self, agent: &str) -> Option<String> {
        self.0.remove(agent)
    }

    /// Pane registered for `agent`
    pub fn pane_of(&self, agent: &str) -> Option<&str> {
        self.0.get(agent).map(String::as_str)
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.0.contains_key(agent)
    }

    /// Agents in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, p)| (a.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the reverse (pane -> agent) index
    pub fn index(&self) -> PaneIndex {
        PaneIndex::build(self)
    }
}

impl<A: Into<String>, P: Into<String>> FromIterator<(A, P)> for PaneRegistry {
    fn from_iter<T: IntoIterator<Item = (A, P)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(a, p)| (a.into(), p.into())).collect())
    }
}

/// Reverse index from pane coordinate to agent name
///
/// Built once per invocation. When several agents claim the same pane the
/// alphabetically first agent owns it.
#[derive(Debug, Clone, Default)]
pub struct PaneIndex {
    by_pane: HashMap<String, String>,
}

impl PaneIndex {
    pub fn build(registry: &PaneRegistry) -> Self {
        let mut by_pane = HashMap::with_capacity(registry.len());
        for (agent, pane) in registry.iter() {
            by_pane
                .entry(pane.to_string())
                .or_insert_with(|| agent.to_string());
        }
        Self { by_pane }
    }

    /// Agent registered at `pane`
    pub fn agent_at(&self, pane: &str) -> Option<&str> {
        self.by_pane.get(pane).map(String::as_str)
    }
}

/// Outcome of looking up the invoking pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneLookup {
    /// The transport could not tell which pane we are in
    Unavailable,
    /// We know the pane but no agent is registered there
    Unregistered { pane: String },
    /// The pane belongs to a registered agent
    Registered { agent: String, pane: String },
}

impl PaneLookup {
    /// Classify a resolved pane coordinate against the index
    pub fn classify(index: &PaneIndex, pane: Option<String>) -> Self {
        match pane {
            None => PaneLookup::Unavailable,
            Some(pane) => match index.agent_at(&pane) {
                Some(agent) => PaneLookup::Registered {
                    agent: agent.to_string(),
                    pane,
                },
                None => PaneLookup::Unregistered { pane },
            },
        }
    }
}

/// Find the agent registered at the pane owning `token`
///
/// `token` is the invoking process's own pane handle. The focused pane is
/// never consulted.
pub async fn lookup_pane(
    registry: &PaneRegistry,
    transport: &dyn PaneTransport,
    token: &str,
) -> PaneLookup {
    let pane = transport.current_pane(token).await;
    tracing::debug!("Pane token {} resolved to {:?}", token, pane);
    PaneLookup::classify(&registry.index(), pane)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    fn registry() -> PaneRegistry {
        [("codex", "10.1"), ("claude", "10.2")].into_iter().collect()
    }

    #[test]
    fn test_index_lookup() {
        let index = registry().index();
        assert_eq!(index.agent_at("10.1"), Some("codex"));
        assert_eq!(index.agent_at("10.2"), Some("claude"));
        assert_eq!(index.agent_at("99.9"), None);
    }

    #[test]
    fn test_index_duplicate_pane_first_agent_wins() {
        let registry: PaneRegistry = [("zed", "1.0"), ("amp", "1.0")].into_iter().collect();
        assert_eq!(registry.index().agent_at("1.0"), Some("amp"));
    }

    #[tokio::test]
    async fn test_lookup_registered() {
        let transport = MockTransport::new().with_pane("%3", "10.1");
        let result = lookup_pane(&registry(), &transport, "%3").await;

        assert_eq!(
            result,
            PaneLookup::Registered {
                agent: "codex".into(),
                pane: "10.1".into()
            }
        );
        // Only the process's own token is queried
        assert_eq!(*transport.queries.lock().unwrap(), vec!["%3".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_unregistered_and_unavailable() {
        let transport = MockTransport::new().with_pane("%3", "99.9");

        assert_eq!(
            lookup_pane(&registry(), &transport, "%3").await,
            PaneLookup::Unregistered {
                pane: "99.9".into()
            }
        );
        assert_eq!(
            lookup_pane(&registry(), &transport, "%404").await,
            PaneLookup::Unavailable
        );
    }

    #[test]
    fn test_registry_serializes_as_plain_map() {
        let json = serde_json::to_string(&registry()).unwrap();
        assert_eq!(json, r#"{"claude":"10.2","codex":"10.1"}"#);

        let back: PaneRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pane_of("codex"), Some("10.1"));
    }
}
