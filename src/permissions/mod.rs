//! Permission system for pane-pm commands
//!
//! Every command describes what it is about to do as a [`PermissionCheck`]
//! and asks [`check_permission`] whether the current actor may do it.
//!
//! ## Deny patterns
//!
//! Agents carry deny lists in the config file:
//!
//! - `pm:task:update` blocks every task update
//! - `pm:task:update(*)` blocks updates that touch any field
//! - `pm:task:update(status,assignee)` blocks updates touching either field
//!
//! Patterns that don't parse never match. The human operator is never
//! restricted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pane_pm::permissions::{check_permission, PermissionCheck, Resource};
//!
//! let check = PermissionCheck::update(Resource::Task, ["status"])?;
//! let outcome = check_permission(&config, &env, &transport, &check).await;
//! if !outcome.allowed {
//!     eprintln!("{} may not {}", outcome.actor, outcome.path);
//! }
//! ```

mod check;
mod engine;
mod path;

pub use check::{PermissionCheck, Resource};
pub use engine::{check_permission, evaluate, PermissionOutcome};
pub use path::{is_token, DenyRule, FieldMatch, PermissionPath};
