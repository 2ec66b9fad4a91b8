//! Core types shared across pane-pm
//!
//! - `PmError` / `PmResult` - Error types

pub mod error;

pub use error::{PmError, PmResult};
