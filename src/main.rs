use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use pane_pm::cli::{App, Cli, Console};
use pane_pm::config::ConfigLoader;
use pane_pm::identity::InvocationEnv;
use pane_pm::logging;
use pane_pm::PmError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let console = Console::new(cli.json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<PmError>() {
                Some(PmError::PermissionDenied {
                    actor,
                    basis,
                    path,
                    rule,
                    warning,
                }) => {
                    console.print_denied(actor, *basis, path, rule.as_deref(), warning.as_deref());
                    3
                }
                Some(pm) => {
                    console.print_error(&format!("{:#}", err));
                    pm.exit_code()
                }
                None => {
                    console.print_error(&format!("{:#}", err));
                    1
                }
            };
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loader = ConfigLoader::discover(cli.root)?;

    let log_dir = loader.is_initialized().then(|| loader.log_dir());
    let _guard = logging::init_logging(log_dir.as_deref())?;

    tracing::debug!(root = %loader.root().display(), "pane-pm starting");

    let config = loader
        .load()
        .with_context(|| format!("Failed to load {}", loader.config_path().display()))?;
    let env = InvocationEnv::from_env();
    let transport = config.transport();

    let mut app = App::new(
        loader,
        config,
        env,
        Box::new(transport),
        Console::new(cli.json),
    );
    app.run(cli.command).await?;
    Ok(())
}
