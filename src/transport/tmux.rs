//! tmux-backed pane transport
//!
//! Every call shells out to `tmux` with a short timeout. Queries used for
//! identity resolution never fail loudly: a missing server, a bad pane token or
//! a timeout all come back as `None`.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::{PaneInfo, PaneTransport};
use crate::core::{PmError, PmResult};

/// Default pane coordinate format (`<window>.<pane>`, e.g. `10.1`)
pub const DEFAULT_PANE_FORMAT: &str = "#{window_index}.#{pane_index}";
/// Default timeout for a single tmux invocation in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Pane transport that talks to a tmux server
#[derive(Debug, Clone)]
pub struct TmuxTransport {
    /// tmux executable
    binary: String,
    /// Format string used to print pane coordinates
    pane_format: String,
    /// Upper bound for each tmux call
    timeout: Duration,
}

impl TmuxTransport {
    /// Create a transport with the default format and timeout
    pub fn new() -> Self {
        Self {
            binary: "tmux".to_string(),
            pane_format: DEFAULT_PANE_FORMAT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Set the pane coordinate format
    pub fn with_pane_format(mut self, format: impl Into<String>) -> Self {
        self.pane_format = format.into();
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Use a different tmux executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Run tmux with `args` and return its stdout
    async fn run(&self, args: &[&str]) -> PmResult<String> {
        tracing::debug!("Running {} {:?}", self.binary, args);

        let output_future = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, output_future).await {
            Ok(result) => result.map_err(|e| {
                PmError::transport(format!("failed to run {}: {}", self.binary, e))
            })?,
            Err(_) => {
                return Err(PmError::transport(format!(
                    "{} timed out after {}ms",
                    self.binary,
                    self.timeout.as_millis()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PmError::transport(format!(
                "{} {} failed: {}",
                self.binary,
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list_format(&self) -> String {
        format!("{}\t#{{pane_id}}\t#{{pane_current_command}}", self.pane_format)
    }
}

impl Default for TmuxTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `list-panes` output produced with [`TmuxTransport::list_format`]
fn parse_pane_list(output: &str) -> Vec<PaneInfo> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let coordinate = parts.next()?.trim();
            let pane_id = parts.next()?.trim();
            let command = parts.next().unwrap_or_default().trim();
            if coordinate.is_empty() {
                return None;
            }
            Some(PaneInfo {
                coordinate: coordinate.to_string(),
                pane_id: pane_id.to_string(),
                command: command.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl PaneTransport for TmuxTransport {
    async fn current_pane(&self, token: &str) -> Option<String> {
        match self
            .run(&["display-message", "-p", "-t", token, self.pane_format.as_str()])
            .await
        {
            Ok(out) => {
                let coordinate = out.trim();
                if coordinate.is_empty() {
                    None
                } else {
                    Some(coordinate.to_string())
                }
            }
            Err(e) => {
                tracing::debug!("Pane query for {} failed: {}", token, e);
                None
            }
        }
    }

    async fn send_text(&self, pane: &str, text: &str) -> PmResult<()> {
        tracing::info!("Sending {} chars to pane {}", text.len(), pane);
        self.run(&["send-keys", "-t", pane, "-l", "--", text]).await?;
        self.run(&["send-keys", "-t", pane, "Enter"]).await?;
        Ok(())
    }

    async fn capture(&self, pane: &str, lines: usize) -> PmResult<String> {
        let start = format!("-{}", lines);
        let out = self
            .run(&["capture-pane", "-p", "-J", "-t", pane, "-S", start.as_str()])
            .await?;
        Ok(out.trim_end().to_string())
    }

    async fn list_panes(&self) -> PmResult<Vec<PaneInfo>> {
        let format = self.list_format();
        let out = self.run(&["list-panes", "-a", "-F", format.as_str()]).await?;
        Ok(parse_pane_list(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pane_list() {
        let output = "0.0\t%0\tzsh\n10.1\t%12\tclaude\n\n2.3\t%7\n";
        let panes = parse_pane_list(output);

        assert_eq!(panes.len(), 3);
        assert_eq!(panes[1].coordinate, "10.1");
        assert_eq!(panes[1].pane_id, "%12");
        assert_eq!(panes[1].command, "claude");
        assert_eq!(panes[2].command, "");
    }

    #[test]
    fn test_list_format_uses_pane_format() {
        let transport = TmuxTransport::new().with_pane_format("#{session_name}:#{pane_index}");
        assert_eq!(
            transport.list_format(),
            "#{session_name}:#{pane_index}\t#{pane_id}\t#{pane_current_command}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_tmux_times_out_to_default_actor() {
        use crate::identity::{resolve_actor, ActorSource, InvocationEnv, PaneRegistry, HUMAN_ACTOR};
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow-tmux");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\necho 10.1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transport = TmuxTransport::new()
            .with_binary(script.to_string_lossy())
            .with_timeout_ms(200);

        let started = Instant::now();
        assert_eq!(transport.current_pane("%1").await, None);
        assert!(started.elapsed() < Duration::from_secs(1));

        // The slow server would have answered with codex's pane
        let registry: PaneRegistry = [("codex", "10.1")].into_iter().collect();
        let res = resolve_actor(&registry, &InvocationEnv::in_pane("%1", None), &transport).await;
        assert_eq!(res.actor, HUMAN_ACTOR);
        assert_eq!(res.source, ActorSource::Default);
        assert!(res.warning.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_means_no_pane() {
        let transport = TmuxTransport::new().with_binary("/nonexistent/pane-pm-tmux");

        assert_eq!(transport.current_pane("%1").await, None);
        assert!(matches!(
            transport.capture("10.1", 5).await,
            Err(PmError::Transport(_))
        ));
    }
}
