use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use robot_console::app::App;
use robot_console::backend::BackendClient;
use robot_console::config::Config;
use robot_console::handler::handle_event;
use robot_console::orchestrator::{Completion, Orchestrator};
use robot_console::selection::ConfigurationForm;
use robot_console::{tui, ui};

#[derive(Parser)]
#[command(name = "robot-console")]
#[command(about = "Converse with the grasp-planning assistant and command the robot")]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(short, long)]
    backend: Option<String>,
    /// Diagnostic log file (overrides config)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Per-request timeout in seconds; requests never time out by default
    #[arg(long)]
    timeout: Option<u64>,
    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (loaded, load_error) = Config::load_or_default();
    if let Some(e) = &load_error {
        // Logging is not up yet and the terminal is still in cooked mode
        eprintln!("warning: {e:#}; using defaults");
    }
    let config = effective_config(&cli, loaded, load_error.as_ref())?;
    if cli.save_config {
        config.save()?;
    }

    init_file_logging(&config.log_file_path()?)?;
    if let Some(e) = load_error {
        tracing::warn!(error = ?e, "config file ignored, running on defaults");
    }
    tracing::info!(backend = %config.backend_url, "starting robot console");

    run(config).await
}

/// Apply command-line overrides. Refuses `--save-config` when the existing
/// file could not be loaded, so a typo never gets replaced by defaults.
fn effective_config(
    cli: &Cli,
    mut config: Config,
    load_error: Option<&anyhow::Error>,
) -> Result<Config> {
    if let (true, Some(e)) = (cli.save_config, load_error) {
        bail!("not saving over a config file that failed to load: {e:#}");
    }
    if let Some(backend) = &cli.backend {
        config.backend_url = backend.clone();
    }
    if let Some(log_file) = &cli.log_file {
        config.log_file = Some(log_file.clone());
    }
    if cli.timeout.is_some() {
        config.request_timeout_secs = cli.timeout;
    }
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    let client = BackendClient::with_timeout(&config.backend_url, config.request_timeout())?;
    let (completions_tx, completions_rx) = mpsc::unbounded_channel::<Completion>();
    let form = ConfigurationForm::with_defaults(&config.options);
    let orchestrator = Orchestrator::new(client, form, completions_tx);
    let mut app = App::new(orchestrator, &config.backend_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(completions_rx);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("robot console stopped");
    result
}

fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory '{}'", parent.display())
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
