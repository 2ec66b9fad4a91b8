use colored::*;
use serde::Serialize;

use crate::board::{LogEntry, Record, RecordKind};
use crate::config::ConfigIssue;
use crate::core::PmResult;
use crate::identity::{ActorResolution, ActorSource};

use super::views::{PaneRow, TeamMember};

/// Console handles all terminal output, human-readable or JSON
pub struct Console {
    json: bool,
    actor_color: Color,
    id_color: Color,
}

impl Console {
    /// Create a new Console
    pub fn new(json: bool) -> Self {
        Self {
            json,
            actor_color: Color::Cyan,
            id_color: Color::Magenta,
        }
    }

    /// Print `value` as JSON, or run `human` to render it
    pub fn emit<T, F>(&self, value: &T, human: F) -> PmResult<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&Self),
    {
        if self.json {
            self.print_json(value)
        } else {
            human(self);
            Ok(())
        }
    }

    /// Print a value as pretty JSON on stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> PmResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a confirmation line
    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print a warning on stderr
    pub fn print_warning(&self, warning: &str) {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Explain a denial: who we think is asking, why, and which rule blocked it
    pub fn print_denied(
        &self,
        actor: &str,
        basis: ActorSource,
        path: &str,
        rule: Option<&str>,
        warning: Option<&str>,
    ) {
        eprintln!(
            "{} {} may not {}",
            "Permission denied:".red().bold(),
            actor.color(self.actor_color).bold(),
            path.bold()
        );
        eprintln!("  actor resolved from: {}", describe_source(basis));
        if let Some(rule) = rule {
            eprintln!("  blocked by deny rule: {}", rule.yellow());
        }
        if let Some(warning) = warning {
            eprintln!("  {} {}", "warning:".yellow(), warning);
        }
    }

    /// Print the resolved identity
    pub fn print_resolution(&self, resolution: &ActorResolution) {
        println!(
            "{} {}",
            resolution.actor.color(self.actor_color).bold(),
            format!("({})", describe_source(resolution.source)).bright_black()
        );
        if let Some(warning) = &resolution.warning {
            println!("{} {}", "Warning:".yellow().bold(), warning);
        }
    }

    /// Print a table of records
    pub fn print_records(&self, kind: RecordKind, records: &[Record]) {
        if records.is_empty() {
            println!("{}", format!("No {}s.", kind).bright_black());
            return;
        }

        for record in records {
            let summary: Vec<String> = record
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!(
                "{} {} {}",
                format!("#{:<4}", record.id).color(self.id_color),
                record.title.bold(),
                summary.join(" ").bright_black()
            );
        }
    }

    /// Print one record in full
    pub fn print_record(&self, kind: RecordKind, record: &Record) {
        println!(
            "{} {}",
            format!("{} #{}", kind, record.id).color(self.id_color).bold(),
            record.title.bold()
        );
        for (key, value) in &record.fields {
            println!("  {:<12} {}", format!("{}:", key).bright_black(), value);
        }
        println!(
            "  {:<12} {} at {}",
            "created:".bright_black(),
            record.created_by.color(self.actor_color),
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!(
            "  {:<12} {}",
            "updated:".bright_black(),
            record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    /// Print log entries
    pub fn print_log_entries(&self, entries: &[LogEntry]) {
        if entries.is_empty() {
            println!("{}", "Log is empty.".bright_black());
            return;
        }
        for entry in entries {
            self.print_log_entry(entry);
        }
    }

    pub fn print_log_entry(&self, entry: &LogEntry) {
        println!(
            "{} {} {} {}",
            format!("#{:<4}", entry.id).color(self.id_color),
            entry.at.format("%Y-%m-%d %H:%M").to_string().bright_black(),
            format!("[{}]", entry.actor).color(self.actor_color),
            entry.message
        );
    }

    /// Print the team roster
    pub fn print_team(&self, members: &[TeamMember]) {
        if members.is_empty() {
            println!("{}", "No agents registered.".bright_black());
            return;
        }
        for member in members {
            let rules = match member.deny.len() {
                0 => String::new(),
                1 => "1 deny rule".to_string(),
                n => format!("{} deny rules", n),
            };
            println!(
                "{:<16} {:<10} {}",
                member.name.color(self.actor_color).bold(),
                member.pane.as_deref().unwrap_or("-"),
                rules.bright_black()
            );
        }
    }

    /// Print one team member with its deny rules
    pub fn print_member(&self, member: &TeamMember) {
        println!(
            "{} {}",
            member.name.color(self.actor_color).bold(),
            format!("(pane {})", member.pane.as_deref().unwrap_or("unregistered")).bright_black()
        );
        if member.deny.is_empty() {
            println!("  {}", "no deny rules".bright_black());
        }
        for rule in &member.deny {
            println!("  deny {}", rule.yellow());
        }
    }

    /// Print multiplexer panes with their registered agents
    pub fn print_panes(&self, panes: &[PaneRow]) {
        if panes.is_empty() {
            println!("{}", "No panes.".bright_black());
            return;
        }
        for pane in panes {
            let agent = match &pane.agent {
                Some(agent) => agent.color(self.actor_color).bold(),
                None => "-".bright_black(),
            };
            println!(
                "{:<10} {:<6} {:<16} {}",
                pane.coordinate,
                pane.pane_id.bright_black(),
                agent,
                pane.command
            );
        }
    }

    /// Print config validation results
    pub fn print_issues(&self, issues: &[ConfigIssue]) {
        if issues.is_empty() {
            self.print_success("Config OK");
            return;
        }
        for issue in issues {
            println!("{} {}", "✗".red().bold(), issue);
        }
    }
}

fn describe_source(source: ActorSource) -> &'static str {
    match source {
        ActorSource::Pane => "registered pane",
        ActorSource::Env => "environment (PM_ACTOR / PM_AGENT)",
        ActorSource::Default => "default, no pane or environment identity",
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(false)
    }
}
