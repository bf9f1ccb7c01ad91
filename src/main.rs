//! webpilot - a language-model driven browser agent.
//!
//! Main entry point for the CLI and the interactive prompt.

mod adapters;
mod cli;
mod console;
mod repl;
mod run_logger;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webpilot_agent::{AgentStatus, Orchestrator, ToolRegistry};
use webpilot_config::{Config, ConfigLoader, ConfigValidator};
use webpilot_protocols::BrowserDriver;
use webpilot_tools_browser::{BrowserToolOptions, CandidateAnalyst, CdpDriver, browser_tools};

use crate::cli::{Cli, Commands};
use crate::console::{Console, ConsoleConfirmation};
use crate::repl::Session;
use crate::run_logger::RunLogger;

const LOG_DIR: &str = "logs";

/// Initialize tracing with console and file output.
///
/// Log files are written to `./logs/` with daily rotation.
fn init_tracing(log_level: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("Failed to create log directory")?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("webpilot")
        .filename_suffix("log")
        .max_log_files(14)
        .build(LOG_DIR)
        .context("Failed to create log file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The worker flushes on drop; keep it for the whole process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let mut config = ConfigLoader::load_resolved(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if cli.headless {
        config.browser.headless = true;
    }

    match cli.command {
        Some(Commands::Config) => {
            print_config(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Run) | None => run(config, cli.task).await,
    }
}

/// Print the effective configuration followed by validation results.
fn print_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);

    let validation = ConfigValidator::validate(config);
    for error in &validation.errors {
        println!("error: {}", error);
    }
    for warning in &validation.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    if validation.is_valid() {
        println!("Configuration is valid.");
    }
    Ok(())
}

async fn run(config: Config, task: Option<String>) -> Result<ExitCode> {
    check_config(&config)?;

    let provider = adapters::build_provider(&config.llm)?;
    info!("Using {} ({})", provider.id(), provider.model());

    let run_logger = Arc::new(RunLogger::create(&config.output.runs_dir).await?);

    let cdp = Arc::new(
        CdpDriver::launch(adapters::driver_config(&config))
            .await
            .context("Failed to start the browser")?,
    );
    let driver: Arc<dyn BrowserDriver> = cdp.clone();

    let tools = browser_tools(
        driver.clone(),
        BrowserToolOptions {
            query_dom_limit: Some(config.agent.query_dom_limit),
            analyst: CandidateAnalyst::with_llm(provider.clone()),
        },
    );
    let registry = ToolRegistry::from_tools(tools)?;
    info!("Registered {} browser tools", registry.len());

    let console = Arc::new(Console::stdin());
    let orchestrator = Orchestrator::new(
        adapters::orchestrator_config(&config, run_logger.run_dir().to_path_buf()),
        provider,
        driver.clone(),
        registry,
    )
    .with_confirmation(Arc::new(ConsoleConfirmation::new(console.clone())))
    .with_run_observer(run_logger);

    let mut session = Session::new(orchestrator, driver, console);
    let code = match task {
        Some(task) => {
            let result = session.run_task(&task).await;
            if result.status == AgentStatus::Done {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            session.repl().await;
            ExitCode::SUCCESS
        }
    };

    if let Err(e) = cdp.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }
    Ok(code)
}

fn check_config(config: &Config) -> Result<()> {
    let validation = ConfigValidator::validate(config);
    for warning in &validation.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        let errors: Vec<String> = validation.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

