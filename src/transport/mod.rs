//! Pane transport
//!
//! The terminal multiplexer is reached through the [`PaneTransport`] trait so
//! identity resolution and the CLI can be exercised without a live tmux
//! server. [`TmuxTransport`] is the real implementation.

mod tmux;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::PmResult;

pub use tmux::{TmuxTransport, DEFAULT_PANE_FORMAT, DEFAULT_TIMEOUT_MS};

/// A pane reported by the multiplexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneInfo {
    /// Coordinate in the configured pane format (what the registry stores)
    pub coordinate: String,
    /// tmux's own pane id (e.g. `%12`)
    pub pane_id: String,
    /// Command currently running in the pane
    pub command: String,
}

/// Capability to query and drive multiplexer panes
#[async_trait]
pub trait PaneTransport: Send + Sync {
    /// Coordinate of the pane owning `token`
    ///
    /// `token` is the invoking process's own pane handle (`$TMUX_PANE`), never
    /// the focused pane. Any failure, including a timeout, yields `None`.
    async fn current_pane(&self, token: &str) -> Option<String>;

    /// Type `text` into a pane and press Enter
    async fn send_text(&self, pane: &str, text: &str) -> PmResult<()>;

    /// Capture the last `lines` lines of a pane's buffer
    async fn capture(&self, pane: &str, lines: usize) -> PmResult<String>;

    /// Enumerate all panes
    async fn list_panes(&self) -> PmResult<Vec<PaneInfo>>;
}

#[async_trait]
impl<T: PaneTransport + ?Sized> PaneTransport for std::sync::Arc<T> {
    async fn current_pane(&self, token: &str) -> Option<String> {
        (**self).current_pane(token).await
    }

    async fn send_text(&self, pane: &str, text: &str) -> PmResult<()> {
        (**self).send_text(pane, text).await
    }

    async fn capture(&self, pane: &str, lines: usize) -> PmResult<String> {
        (**self).capture(pane, lines).await
    }

    async fn list_panes(&self) -> PmResult<Vec<PaneInfo>> {
        (**self).list_panes().await
    }
}
