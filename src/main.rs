//! bootpool-install - Main entry point

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use bootpool_install::cli::{Cli, Commands, InstallArgs};
use bootpool_install::config_file::HeadlessConfig;
use bootpool_install::engine::enumerate::{candidates, eligible_disks};
use bootpool_install::host::SystemHost;
use bootpool_install::installer::{perform_when_done, Orchestrator};
use bootpool_install::populate::{Populator, ScriptPopulator, SkipPopulate};
use bootpool_install::product::ProductIdentity;
use bootpool_install::prompt::{ConsolePrompter, HeadlessPrompter, Prompter};
use bootpool_install::tool_runner::SystemRunner;
use bootpool_install::units::human;
use bootpool_install::{process_guard, sanity};

const LOG_FILE: &str = "/tmp/install.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr, and to the install log when it can be opened.
fn init_logging() {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(env_filter());

    let file = OpenOptions::new().create(true).append(true).open(LOG_FILE);
    let file_layer = file.as_ref().ok().and_then(|f| f.try_clone().ok()).map(|f| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(f)
            .with_filter(env_filter())
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Err(e) = file {
        tracing::warn!("Not writing {}: {}", LOG_FILE, e);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging();
    info!("bootpool-install {} starting", env!("CARGO_PKG_VERSION"));

    // Tools spawned later are killed on SIGINT/SIGTERM; inside the
    // critical section the signal waits until the section ends
    if let Err(e) = process_guard::init_signal_handlers() {
        tracing::warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    match cli.command() {
        Commands::Validate { config } => validate(&config),
        Commands::Disks { json } => list_disks(json),
        Commands::Install => install(&cli.install),
    }
}

fn validate(path: &Path) -> Result<()> {
    info!("Validating configuration file: {}", path.display());
    match HeadlessConfig::load_from_file(path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("✗ Configuration validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn list_disks(json: bool) -> Result<()> {
    let host = SystemHost::new();
    let product = ProductIdentity::default();
    let found = candidates(&host, &eligible_disks(&host, &product.media_label));

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    if found.is_empty() {
        println!("No eligible disks");
    }
    for disk in &found {
        println!(
            "{:<10} {:>10}  {:<9} {}",
            disk.name,
            human(disk.media_size),
            disk.transport,
            disk.description
        );
    }
    Ok(())
}

fn install(args: &InstallArgs) -> Result<()> {
    sanity::run_preflight_checks_with_options(args.skip_root_check);

    let file = args
        .config
        .as_deref()
        .map(HeadlessConfig::load_from_file)
        .transpose()
        .context("Cannot start an unattended install")?;
    let run = args.run_config(file.as_ref());

    let host = SystemHost::new();
    let mut prompter: Box<dyn Prompter> = if run.is_unattended() {
        info!("Running unattended");
        Box::new(HeadlessPrompter)
    } else {
        Box::new(ConsolePrompter::stdio())
    };
    let populator: Box<dyn Populator> = match &args.populate {
        Some(script) => Box::new(ScriptPopulator::new(script)),
        None => Box::new(SkipPopulate),
    };

    let outcome = Orchestrator::new(&host, prompter.as_mut(), populator.as_ref(), &run).run();
    let outcome = match outcome {
        Ok(outcome) => outcome,
        // The operator has already been told
        Err(_) => std::process::exit(1),
    };

    let mut summary = format!(
        "Installed boot environment {} on {} ({}).",
        outcome.environment,
        outcome.disks.join(" "),
        outcome.pool
    );
    if let Some(size) = outcome.data_size {
        summary.push_str(&format!(" Data partition: {}.", human(size)));
    }
    prompter.notify(&summary);
    if !outcome.stamp_failures.is_empty() {
        prompter.notify("Some disks could not be made bootable; see the warnings above.");
    }

    perform_when_done(run.when_done, &SystemRunner, prompter.as_mut())?;
    Ok(())
}
