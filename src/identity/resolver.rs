//! Actor resolution
//!
//! Works out who is really issuing the current command. The pane that
//! invoked us is ground truth; `PM_ACTOR` / `PM_AGENT` are advisory and only
//! used when the pane says nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::lookup::{lookup_pane, PaneLookup, PaneRegistry};
use crate::transport::PaneTransport;

/// Actor name used for the human operator
pub const HUMAN_ACTOR: &str = "human";

/// Advisory identity variable (takes precedence)
pub const ACTOR_ENV: &str = "PM_ACTOR";
/// Advisory identity synonym
pub const AGENT_ENV: &str = "PM_AGENT";

const TMUX_ENV: &str = "TMUX";
const TMUX_PANE_ENV: &str = "TMUX_PANE";

/// Where a resolved identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorSource {
    /// The invoking pane is registered to the actor
    Pane,
    /// Self-declared through the environment
    Env,
    /// Nothing known, assumed to be the human
    Default,
}

impl fmt::Display for ActorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActorSource::Pane => "pane",
            ActorSource::Env => "env",
            ActorSource::Default => "default",
        })
    }
}

/// Result of identity resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorResolution {
    pub actor: String,
    pub source: ActorSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ActorResolution {
    fn new(actor: impl Into<String>, source: ActorSource) -> Self {
        Self {
            actor: actor.into(),
            source,
            warning: None,
        }
    }

    fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn is_human(&self) -> bool {
        self.actor == HUMAN_ACTOR
    }
}

/// Ambient process state the resolver depends on
///
/// Captured once at startup so resolution itself never touches globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationEnv {
    /// Self-declared actor name
    pub advisory_actor: Option<String>,
    /// Whether a multiplexer session is present at all
    pub in_multiplexer: bool,
    /// The process's own pane handle
    pub pane_token: Option<String>,
}

impl InvocationEnv {
    /// Read the environment of the current process
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            advisory_actor: non_empty(ACTOR_ENV).or_else(|| non_empty(AGENT_ENV)),
            in_multiplexer: non_empty(TMUX_ENV).is_some(),
            pane_token: non_empty(TMUX_PANE_ENV),
        }
    }

    /// Environment of a process outside any multiplexer
    pub fn outside(advisory_actor: Option<&str>) -> Self {
        Self {
            advisory_actor: advisory_actor.map(str::to_string),
            in_multiplexer: false,
            pane_token: None,
        }
    }

    /// Environment of a process running in pane `token`
    pub fn in_pane(token: &str, advisory_actor: Option<&str>) -> Self {
        Self {
            advisory_actor: advisory_actor.map(str::to_string),
            in_multiplexer: true,
            pane_token: Some(token.to_string()),
        }
    }

    /// Inside the multiplexer with a pane handle to query
    pub fn inside_multiplexer(&self) -> bool {
        self.in_multiplexer && self.pane_token.is_some()
    }
}

/// Identity when no pane information is usable
fn resolve_without_pane(advisory: Option<&str>) -> ActorResolution {
    match advisory {
        Some(name) => ActorResolution::new(name, ActorSource::Env),
        None => ActorResolution::new(HUMAN_ACTOR, ActorSource::Default),
    }
}

/// Combine a pane lookup with the advisory identity
pub fn resolve_from_lookup(lookup: &PaneLookup, advisory: Option<&str>) -> ActorResolution {
    match lookup {
        PaneLookup::Unavailable => resolve_without_pane(advisory),
        PaneLookup::Registered { agent, pane } => {
            let resolution = ActorResolution::new(agent.as_str(), ActorSource::Pane);
            match advisory {
                Some(claimed) if claimed != agent.as_str() => resolution.with_warning(format!(
                    "identity mismatch: environment claims '{}' but pane {} is registered to '{}'; pane wins",
                    claimed, pane, agent
                )),
                _ => resolution,
            }
        }
        PaneLookup::Unregistered { pane } => match advisory {
            Some(claimed) => ActorResolution::new(claimed, ActorSource::Env).with_warning(format!(
                "unregistered pane: {} is not in the registry; trusting environment identity '{}'",
                pane, claimed
            )),
            None => ActorResolution::new(HUMAN_ACTOR, ActorSource::Default),
        },
    }
}

/// Resolve the actor issuing the current command
///
/// Never fails: transport problems degrade to the advisory/default path.
pub async fn resolve_actor(
    registry: &PaneRegistry,
    env: &InvocationEnv,
    transport: &dyn PaneTransport,
) -> ActorResolution {
    let advisory = env.advisory_actor.as_deref();

    let lookup = match (&env.pane_token, env.inside_multiplexer()) {
        (Some(token), true) => lookup_pane(registry, transport, token).await,
        _ => PaneLookup::Unavailable,
    };

    let resolution = resolve_from_lookup(&lookup, advisory);
    match &resolution.warning {
        Some(warning) => tracing::info!("{}", warning),
        None => tracing::debug!(
            "Resolved actor {} (source: {})",
            resolution.actor,
            resolution.source
        ),
    }
    resolution
}
