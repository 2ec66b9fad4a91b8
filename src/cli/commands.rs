//! Command handlers
//!
//! Each handler builds the `PermissionCheck` for what it is about to do and
//! asks the permission engine before touching any state. Config and board
//! are loaded fresh for every invocation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::args::{Commands, ConfigAction, LogAction, RecordAction, TeamAction};
use super::console::Console;
use super::views::{Capture, PaneRow, SendReceipt, TeamMember};
use crate::board::{BoardStore, RecordKind, RecordPatch};
use crate::config::{ConfigLoader, PmConfig};
use crate::core::{PmError, PmResult};
use crate::identity::{resolve_actor, InvocationEnv, HUMAN_ACTOR};
use crate::permissions::{
    check_permission, is_token, DenyRule, PermissionCheck, PermissionOutcome, Resource,
};
use crate::transport::PaneTransport;

/// Everything a command needs for one invocation
pub struct App {
    loader: ConfigLoader,
    config: PmConfig,
    env: InvocationEnv,
    transport: Box<dyn PaneTransport>,
    console: Console,
}

impl App {
    /// Create an app from already loaded state
    pub fn new(
        loader: ConfigLoader,
        config: PmConfig,
        env: InvocationEnv,
        transport: Box<dyn PaneTransport>,
        console: Console,
    ) -> Self {
        Self {
            loader,
            config,
            env,
            transport,
            console,
        }
    }

    /// The configuration this invocation runs with
    pub fn config(&self) -> &PmConfig {
        &self.config
    }

    /// Run one command
    pub async fn run(&mut self, command: Commands) -> PmResult<()> {
        match command {
            Commands::Whoami => self.whoami().await,
            Commands::Task { action } => self.record(RecordKind::Task, action).await,
            Commands::Milestone { action } => self.record(RecordKind::Milestone, action).await,
            Commands::Doc { action } => self.record(RecordKind::Doc, action).await,
            Commands::Log { action } => self.log(action).await,
            Commands::Team { action } => self.team(action).await,
            Commands::Send { agent, text } => self.send(&agent, &text.join(" ")).await,
            Commands::Read { agent, lines } => self.read(&agent, lines).await,
            Commands::Panes => self.panes().await,
            Commands::Config { action } => self.config_command(action),
        }
    }

    /// Check `check` for the current actor, failing with `PermissionDenied`
    ///
    /// Resolution warnings are printed for allowed checks; a denial carries
    /// its warning in the error.
    async fn authorize(&self, check: PermissionCheck) -> PmResult<PermissionOutcome> {
        let outcome =
            check_permission(&self.config, &self.env, self.transport.as_ref(), &check).await;
        if outcome.allowed {
            if let Some(warning) = &outcome.warning {
                self.console.print_warning(warning);
            }
        }
        outcome.into_result()
    }

    fn board_store(&self) -> BoardStore {
        BoardStore::new(self.loader.board_path())
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&Console)) -> PmResult<()> {
        self.console.emit(value, human)
    }

    async fn whoami(&self) -> PmResult<()> {
        let resolution =
            resolve_actor(self.config.registry(), &self.env, self.transport.as_ref()).await;
        self.emit(&resolution, |c| c.print_resolution(&resolution))
    }

    async fn record(&self, kind: RecordKind, action: RecordAction) -> PmResult<()> {
        let resource = kind.resource();
        let store = self.board_store();

        match action {
            RecordAction::List => {
                self.authorize(PermissionCheck::list(resource)).await?;
                let board = store.load()?;
                let records = board.list(kind);
                self.emit(&records, |c| c.print_records(kind, records))
            }
            RecordAction::Show { id } => {
                self.authorize(PermissionCheck::show(resource)).await?;
                let board = store.load()?;
                let record = board.get(kind, id)?;
                self.emit(record, |c| c.print_record(kind, record))
            }
            RecordAction::Create { title, set } => {
                let fields = crate::board::parse_assignments(&set)?;
                let outcome = self.authorize(PermissionCheck::create(resource)).await?;

                let mut board = store.load()?;
                let record = board.create(kind, title, fields, &outcome.actor);
                store.save(&board)?;
                self.emit(&record, |c| {
                    c.print_success(&format!("Created {} #{}", kind, record.id))
                })
            }
            RecordAction::Update {
                id,
                title,
                set,
                unset,
            } => {
                let patch = RecordPatch::from_args(title, &set, &unset)?;
                if patch.is_empty() {
                    return Err(PmError::invalid_input(
                        "nothing to update: pass --title, --set or --unset",
                    ));
                }
                self.authorize(PermissionCheck::update(resource, patch.fields())?)
                    .await?;

                let mut board = store.load()?;
                let record = board.update(kind, id, &patch)?;
                store.save(&board)?;
                self.emit(&record, |c| {
                    c.print_success(&format!("Updated {} #{}", kind, record.id))
                })
            }
            RecordAction::Delete { id } => {
                self.authorize(PermissionCheck::delete(resource)).await?;

                let mut board = store.load()?;
                let record = board.delete(kind, id)?;
                store.save(&board)?;
                self.emit(&record, |c| {
                    c.print_success(&format!("Deleted {} #{}", kind, record.id))
                })
            }
        }
    }

    async fn log(&self, action: LogAction) -> PmResult<()> {
        let store = self.board_store();

        match action {
            LogAction::List { limit } => {
                self.authorize(PermissionCheck::list(Resource::Log)).await?;
                let board = store.load()?;
                let entries = board.log_entries(limit);
                self.emit(&entries, |c| c.print_log_entries(entries))
            }
            LogAction::Show { id } => {
                self.authorize(PermissionCheck::show(Resource::Log)).await?;
                let board = store.load()?;
                let entry = board.log_entry(id)?;
                self.emit(entry, |c| c.print_log_entry(entry))
            }
            LogAction::Create { message } => {
                let outcome = self.authorize(PermissionCheck::create(Resource::Log)).await?;

                let mut board = store.load()?;
                let entry = board.append_log(&outcome.actor, message.join(" "));
                store.save(&board)?;
                self.emit(&entry, |c| c.print_log_entry(&entry))
            }
        }
    }

    fn require_agent(&self, name: &str) -> PmResult<String> {
        self.config
            .registry()
            .pane_of(name)
            .map(str::to_string)
            .ok_or_else(|| PmError::UnknownAgent(name.to_string()))
    }

    fn save_config(&self) -> PmResult<()> {
        self.loader.save(&self.config)
    }

    async fn team(&mut self, action: TeamAction) -> PmResult<()> {
        match action {
            TeamAction::List => {
                self.authorize(PermissionCheck::list(Resource::Team)).await?;
                let roster = TeamMember::roster(&self.config);
                self.emit(&roster, |c| c.print_team(&roster))
            }
            TeamAction::Show { name } => {
                self.authorize(PermissionCheck::show(Resource::Team)).await?;
                if !self.config.registry().contains(&name)
                    && self.config.deny_rules(&name).is_empty()
                {
                    return Err(PmError::UnknownAgent(name));
                }
                let member = TeamMember::from_config(&self.config, &name);
                self.emit(&member, |c| c.print_member(&member))
            }
            TeamAction::Create { name, pane } => {
                validate_agent_name(&name)?;
                self.authorize(PermissionCheck::create(Resource::Team)).await?;
                if self.config.registry().contains(&name) {
                    return Err(PmError::AgentExists(name));
                }
                if let Some(owner) = self.config.registry().index().agent_at(&pane) {
                    self.console
                        .print_warning(&format!("pane {} is already registered to {}", pane, owner));
                }

                self.config.agents.insert(name.as_str(), pane.as_str());
                self.save_config()?;
                let member = TeamMember::from_config(&self.config, &name);
                self.emit(&member, |c| {
                    c.print_success(&format!("Registered {} at pane {}", name, pane))
                })
            }
            TeamAction::Update { name, pane } => {
                self.authorize(PermissionCheck::update(Resource::Team, ["pane"])?)
                    .await?;
                self.require_agent(&name)?;

                self.config.agents.insert(name.as_str(), pane.as_str());
                self.save_config()?;
                let member = TeamMember::from_config(&self.config, &name);
                self.emit(&member, |c| {
                    c.print_success(&format!("Moved {} to pane {}", name, pane))
                })
            }
            TeamAction::Delete { name } => {
                self.authorize(PermissionCheck::delete(Resource::Team)).await?;
                self.require_agent(&name)?;

                let member = TeamMember::from_config(&self.config, &name);
                self.config.agents.remove(&name);
                self.config.permissions.remove(&name);
                self.save_config()?;
                self.emit(&member, |c| c.print_success(&format!("Removed {}", name)))
            }
            TeamAction::Deny { name, pattern } => {
                let rule = DenyRule::parse(&pattern);
                if rule.is_malformed() {
                    return Err(PmError::invalid_input(format!(
                        "{:?} is not a valid pattern (expected pm:<resource>:<action>[(<fields>|*)])",
                        pattern
                    )));
                }
                validate_agent_name(&name)?;
                self.authorize(PermissionCheck::update(Resource::Team, ["deny"])?)
                    .await?;

                let added = self.config.add_deny(&name, rule.clone());
                if added {
                    self.save_config()?;
                }
                if !self.config.registry().contains(&name) {
                    self.console.print_warning(&format!(
                        "{} is not registered; the rule only applies through PM_ACTOR / PM_AGENT",
                        name
                    ));
                }
                let member = TeamMember::from_config(&self.config, &name);
                self.emit(&member, |c| {
                    if added {
                        c.print_success(&format!("{} may no longer {}", name, rule))
                    } else {
                        c.print_success(&format!("{} already denied {}", name, rule))
                    }
                })
            }
            TeamAction::Undeny { name, pattern } => {
                self.authorize(PermissionCheck::update(Resource::Team, ["deny"])?)
                    .await?;

                if !self.config.remove_deny(&name, &pattern) {
                    return Err(PmError::invalid_input(format!(
                        "{} has no deny rule {:?}",
                        name, pattern
                    )));
                }
                self.save_config()?;
                let member = TeamMember::from_config(&self.config, &name);
                self.emit(&member, |c| {
                    c.print_success(&format!("Removed deny rule {} from {}", pattern, name))
                })
            }
        }
    }

    async fn send(&self, agent: &str, text: &str) -> PmResult<()> {
        let pane = self.require_agent(agent)?;
        let outcome = self.authorize(PermissionCheck::send_message()).await?;

        let framed = format!("[from {}] {}", outcome.actor, text);
        self.transport.send_text(&pane, &framed).await?;

        let receipt = SendReceipt {
            from: outcome.actor,
            to: agent.to_string(),
            pane,
            text: framed,
        };
        self.emit(&receipt, |c| {
            c.print_success(&format!("Sent to {} (pane {})", receipt.to, receipt.pane))
        })
    }

    async fn read(&self, agent: &str, lines: Option<u64>) -> PmResult<()> {
        let pane = self.require_agent(agent)?;
        let lines = match lines {
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => self.config.settings.capture_lines,
        };
        // tmux reads `-S -0` as the top of the screen, not an empty capture
        if lines == 0 {
            return Err(PmError::invalid_input("read needs at least one line"));
        }

        let text = self.transport.capture(&pane, lines).await?;
        let capture = Capture {
            agent: agent.to_string(),
            pane,
            lines,
            text,
        };
        self.emit(&capture, |_| println!("{}", capture.text))
    }

    async fn panes(&self) -> PmResult<()> {
        let panes = self.transport.list_panes().await?;
        let rows = PaneRow::join(panes, &self.config.registry().index());
        self.emit(&rows, |c| c.print_panes(&rows))
    }

    fn config_command(&self, action: ConfigAction) -> PmResult<()> {
        match action {
            ConfigAction::Init => {
                let created = self.loader.init()?;
                let path = self.loader.config_path();
                let mut result = BTreeMap::new();
                result.insert("created", created.to_string());
                result.insert("path", path.display().to_string());
                self.emit(&result, |c| {
                    if created {
                        c.print_success(&format!("Created {}", path.display()))
                    } else {
                        c.print_success(&format!("{} already exists", path.display()))
                    }
                })
            }
            ConfigAction::Check => {
                let issues = self.config.validate();
                self.emit(&issues, |c| c.print_issues(&issues))?;
                if issues.is_empty() {
                    Ok(())
                } else {
                    Err(PmError::invalid_config(format!(
                        "{} problem(s) in {}",
                        issues.len(),
                        self.loader.config_path().display()
                    )))
                }
            }
        }
    }
}

fn validate_agent_name(name: &str) -> PmResult<()> {
    if name == HUMAN_ACTOR {
        return Err(PmError::invalid_input(format!(
            "'{}' is reserved for the human operator",
            HUMAN_ACTOR
        )));
    }
    if !is_token(name) {
        return Err(PmError::invalid_input(format!(
            "agent names must be [A-Za-z0-9_] tokens, got {:?}",
            name
        )));
    }
    Ok(())
}
