//! Project configuration
//!
//! - `PmConfig` - pane registry, deny lists and transport settings
//! - `ConfigLoader` - finds the project root and reads/writes `.pane-pm/`
//! - `ConfigIssue` - problems reported by `PmConfig::validate`

mod loader;
mod types;

pub use loader::{ConfigLoader, ROOT_ENV, STATE_DIR};
pub use types::{AgentPermissionConfig, ConfigIssue, PmConfig, Settings};
