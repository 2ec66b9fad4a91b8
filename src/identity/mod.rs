//! Identity resolution
//!
//! Decides which actor is issuing the current command:
//! - `PaneRegistry` / `PaneIndex` - the roster of agents and their panes
//! - `lookup_pane` - maps the invoking pane to a registered agent
//! - `resolve_actor` - combines the pane with the advisory identity

mod lookup;
mod resolver;

pub use lookup::{lookup_pane, PaneIndex, PaneLookup, PaneRegistry};
pub use resolver::{
    resolve_actor, resolve_from_lookup, ActorResolution, ActorSource, InvocationEnv, ACTOR_ENV,
    AGENT_ENV, HUMAN_ACTOR,
};
