//! pane-pm
//!
//! Project management for a human and several AI agents working side by side
//! in tmux panes. Every command runs under an actor resolved from the pane it
//! was invoked in, and per-agent deny rules decide what that actor may do.

pub mod board;
pub mod config;
pub mod core;
pub mod identity;
pub mod permissions;
pub mod transport;

pub mod cli;
pub mod logging;

pub use crate::core::{PmError, PmResult};
