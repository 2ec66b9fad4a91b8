//! Command line definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pane-pm - coordinate a human and AI agents across tmux panes
#[derive(Parser, Debug)]
#[command(name = "pane-pm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root (defaults to $PANE_PM_ROOT or the nearest .pane-pm/)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Print JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show who pane-pm thinks is invoking it
    Whoami,

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Manage milestones
    Milestone {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Manage docs
    Doc {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Read and append to the shared log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Manage registered agents and their deny rules
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Type a message into an agent's pane
    Send {
        /// Target agent
        agent: String,

        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show the recent output of an agent's pane
    Read {
        /// Target agent
        agent: String,

        /// Number of lines to capture (at least 1)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        lines: Option<u64>,
    },

    /// List multiplexer panes and the agents registered to them
    Panes,

    /// Project configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Operations on tasks, milestones and docs
#[derive(Subcommand, Debug)]
pub enum RecordAction {
    /// List records
    #[command(alias = "ls")]
    List,

    /// Show one record
    Show { id: u64 },

    /// Create a record
    Create {
        title: String,

        /// Set a field (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Change a record's title or fields
    Update {
        id: u64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Set a field (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Remove a field (repeatable)
        #[arg(long = "unset", value_name = "KEY")]
        unset: Vec<String>,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum LogAction {
    /// Show recent entries
    List {
        /// Only the last N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one entry
    Show { id: u64 },

    /// Append an entry as the current actor
    Create {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TeamAction {
    /// List registered agents
    #[command(alias = "ls")]
    List,

    /// Show an agent and its deny rules
    Show { name: String },

    /// Register an agent at a pane
    Create { name: String, pane: String },

    /// Move an agent to another pane
    Update {
        name: String,

        #[arg(long)]
        pane: String,
    },

    /// Unregister an agent (its deny rules are removed too)
    #[command(alias = "rm")]
    Delete { name: String },

    /// Add a deny pattern, e.g. 'pm:task:update(status)'
    Deny { name: String, pattern: String },

    /// Remove a deny pattern
    Undeny { name: String, pattern: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create .pane-pm/ in the project root
    Init,

    /// Validate the config and report problems
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_update() {
        let cli = Cli::try_parse_from([
            "pane-pm", "--json", "task", "update", "3", "--set", "status=done", "--set",
            "assignee=codex", "--unset", "blocked_by",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Task {
                action: RecordAction::Update { id, title, set, unset },
            } => {
                assert_eq!(id, 3);
                assert!(title.is_none());
                assert_eq!(set, vec!["status=done", "assignee=codex"]);
                assert_eq!(unset, vec!["blocked_by"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_send_joins_trailing_words() {
        let cli = Cli::try_parse_from(["pane-pm", "send", "codex", "please", "run", "tests"])
            .unwrap();

        match cli.command {
            Commands::Send { agent, text } => {
                assert_eq!(agent, "codex");
                assert_eq!(text.join(" "), "please run tests");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pane-pm", "team", "list", "--root", "/tmp/p"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/p")));
    }

    #[test]
    fn test_read_rejects_zero_lines() {
        assert!(Cli::try_parse_from(["pane-pm", "read", "codex", "-n", "0"]).is_err());

        let cli = Cli::try_parse_from(["pane-pm", "read", "codex", "--lines", "5"]).unwrap();
        match cli.command {
            Commands::Read { lines, .. } => assert_eq!(lines, Some(5)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_text() {
        assert!(Cli::try_parse_from(["pane-pm", "send", "codex"]).is_err());
    }
}
