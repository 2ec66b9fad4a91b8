//! Command line interface
//!
//! `args` holds the clap definition, `commands` runs it against the config,
//! board and pane transport, and `console` renders results.

mod args;
mod commands;
mod console;
mod views;

pub use args::{Cli, Commands, ConfigAction, LogAction, RecordAction, TeamAction};
pub use commands::App;
pub use console::Console;
pub use views::{Capture, PaneRow, SendReceipt, TeamMember};
