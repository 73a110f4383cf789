//! `etx-dashboard` -- terminal front end for the ETX job runner.
//!
//! # Environment variables
//!
//! | Variable                    | Default                 | Description                       |
//! |-----------------------------|-------------------------|-----------------------------------|
//! | `ETX_BACKEND_URL`           | `http://127.0.0.1:5000` | Job-runner backend                |
//! | `JOB_POLL_INTERVAL_MS`      | `1500`                  | Job log/status poll period        |
//! | `TERMINAL_POLL_INTERVAL_MS` | `1000`                  | Terminal output poll period       |
//! | `SETTINGS_CONFIRM_MS`       | `1000`                  | How long "Saved" stays visible    |
//! | `REQUEST_TIMEOUT_SECS`      | `30`                    | Per-request HTTP timeout          |
//! | `RUST_LOG`                  | `etx_dashboard=info,etx_client=info` | Log filter           |

use std::io::{self, Stdout};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etx_core::job::JobStatus;
use etx_core::terminal::{TerminalMode, TerminalState};
use etx_dashboard::app::Dashboard;
use etx_dashboard::cli::{Cli, Command, RunArgs, SettingsCommand};
use etx_dashboard::config::DashboardConfig;
use etx_dashboard::console::{format_history, format_hosts, format_settings, ConsolePresenter};
use etx_dashboard::dispatcher::UiAction;
use etx_dashboard::screen::{HostnamePicker, ScreenEvent};
use etx_dashboard::settings::SAVED_MESSAGE;

const STOP_COMMAND: &str = ":stop";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = DashboardConfig::from_env()?;
    if let Some(url) = cli.url.clone() {
        config.backend_url = url;
    }
    tracing::debug!(backend_url = %config.backend_url, "Loaded dashboard configuration");

    let dashboard = Dashboard::connect(&config)?;
    run_command(&dashboard, &config, cli.command).await
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "etx_dashboard=info,etx_client=info".into());

    // stdout belongs to the presenter.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr)))
        .init();
}

async fn run_command(
    dashboard: &Dashboard,
    config: &DashboardConfig,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => run_job(dashboard, config, args).await,
        Command::History => {
            dashboard.history.refresh().await?;
            println!("{}", format_history(&dashboard.screen.history()));
            Ok(())
        }
        Command::Log { job_id, output } => {
            let log = dashboard.history.download(&job_id).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, log)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(job_id = %job_id, path = %path.display(), "Log saved");
                }
                None => print!("{log}"),
            }
            Ok(())
        }
        Command::Settings(cmd) => run_settings(dashboard, cmd).await,
        Command::Terminal { mode } => {
            let mode: TerminalMode = mode.parse()?;
            run_terminal(dashboard, mode).await
        }
        Command::Hosts(host) => {
            println!("{}", format_hosts(&HostnamePicker::new(host.is_gpu())));
            Ok(())
        }
    }
}

fn spawn_presenter(
    dashboard: &Dashboard,
    cancel: &CancellationToken,
) -> JoinHandle<io::Result<Stdout>> {
    let presenter = ConsolePresenter::new(dashboard.screen.clone(), io::stdout());
    tokio::spawn(presenter.run(dashboard.screen.subscribe(), cancel.clone()))
}

async fn stop_presenter(
    handle: JoinHandle<io::Result<Stdout>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    cancel.cancel();
    handle.await??;
    Ok(())
}

async fn run_job(
    dashboard: &Dashboard,
    config: &DashboardConfig,
    args: RunArgs,
) -> anyhow::Result<()> {
    let action: UiAction = args.action.parse()?;

    dashboard.dispatcher.set_gpu(args.host.is_gpu());
    if let Some(hostname) = args.hostname.as_deref() {
        dashboard.dispatcher.select_hostname(hostname)?;
    }

    let cancel = CancellationToken::new();
    let presenter = spawn_presenter(dashboard, &cancel);
    let mut events = dashboard.screen.subscribe();
    let mut outcome = dashboard.poller.outcome();

    let Some(job) = dashboard.dispatcher.dispatch(action).await? else {
        stop_presenter(presenter, cancel).await?;
        bail!("backend did not start {}", action.job_type());
    };

    let status = tokio::select! {
        changed = outcome.wait_for(Option::is_some) => changed.ok().and_then(|s| *s),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(job_id = %job.id, "Interrupted, no longer following job");
            dashboard.poller.stop();
            None
        }
    };

    if status.is_some() {
        // The poller redraws history after the final status; wait for it.
        let redrawn = tokio::time::timeout(config.request_timeout, async {
            loop {
                match events.recv().await {
                    Ok(ScreenEvent::History) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                }
            }
        });
        if redrawn.await.is_err() {
            tracing::warn!("History was not refreshed in time");
        }
    }

    stop_presenter(presenter, cancel).await?;

    match status {
        Some(JobStatus::Success) | None => Ok(()),
        Some(status) => bail!("job {} ended with status {status}", job.id),
    }
}

async fn run_settings(dashboard: &Dashboard, cmd: SettingsCommand) -> anyhow::Result<()> {
    let settings = &dashboard.settings;
    match cmd {
        SettingsCommand::Show { legacy } => {
            if legacy {
                settings.load_legacy().await?;
            } else {
                settings.load().await?;
            }
            println!("{}", format_settings(&dashboard.screen.settings_form()));
        }
        SettingsCommand::Save { file } => {
            settings.load().await?;
            settings.import_json_file(&file)?;
            report_saved(settings.save().await?)?;
        }
        SettingsCommand::Export { file } => {
            settings.load().await?;
            settings.export_file(&file)?;
            println!("Exported settings to {}", file.display());
        }
        SettingsCommand::Import { file, legacy } => {
            settings.load().await?;
            import_and_save(dashboard, &file, legacy).await?;
        }
    }
    Ok(())
}

async fn import_and_save(dashboard: &Dashboard, file: &Path, legacy: bool) -> anyhow::Result<()> {
    let filled = dashboard.settings.import_file(file)?;
    tracing::info!(fields = filled, path = %file.display(), "Settings imported");
    let saved = if legacy {
        dashboard.settings.save_legacy().await?
    } else {
        dashboard.settings.save().await?
    };
    report_saved(saved)
}

fn report_saved(saved: bool) -> anyhow::Result<()> {
    if !saved {
        bail!("backend did not confirm the settings save");
    }
    println!("{SAVED_MESSAGE}");
    Ok(())
}

async fn run_terminal(dashboard: &Dashboard, mode: TerminalMode) -> anyhow::Result<()> {
    let terminal = &dashboard.terminal;
    let cancel = CancellationToken::new();
    let presenter = spawn_presenter(dashboard, &cancel);
    let mut events = dashboard.screen.subscribe();

    if let Err(e) = terminal.start(mode).await {
        // Give the presenter a moment to print the error pane.
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_presenter(presenter, cancel).await?;
        return Err(e.into());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = mode.is_interactive();

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim() == STOP_COMMAND => break,
                Some(line) => {
                    terminal.send_line(&line).await;
                }
                None => stdin_open = false,
            },
            event = events.recv() => match event {
                Ok(ScreenEvent::TerminalControls) | Err(RecvError::Lagged(_)) => {
                    if terminal.state() == TerminalState::Finished {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if terminal.session().is_some() && !terminal.stop().await? {
        tracing::warn!("Terminal session was not stopped cleanly");
    }

    stop_presenter(presenter, cancel).await
}
