use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use audio_route_switch::audio::AudioDevice;
use audio_route_switch::config::{Config, ConfigLoader};
use audio_route_switch::logging::{LoggingConfig, cleanup_old_logs, initialize_logging};
use audio_route_switch::scenario::Scenario;
use audio_route_switch::selection::{DeviceChangeListener, EngineSettings};
use audio_route_switch::service::SignalHandler;
use audio_route_switch::system::StandardFileSystem;

#[derive(Parser)]
#[command(name = "audio-route-switch")]
#[command(about = "Priority-based audio route selection for voice calls")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file and show the effective settings
    CheckConfig,
    /// Replay a scenario file against a simulated audio stack
    Simulate {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::for_path(cli.config.as_deref())?;
    let config = loader.load_config()?;

    let (_guard, log_dir) = initialize_logging(LoggingConfig::from_config(&config, cli.verbose)?)?;
    if let Some(dir) = &log_dir {
        info!("Writing logs to {}", dir.display());
        if let Err(e) = cleanup_old_logs(dir, config.logging.keep_days) {
            warn!("Failed to clean up old logs: {}", e);
        }
    }
    info!(
        "Configuration loaded from {}",
        loader.get_config_path().display()
    );

    match cli.command {
        Commands::CheckConfig => check_config(&loader, &config),
        Commands::Simulate { scenario } => simulate(loader, &config, &scenario).await,
    }
}

fn check_config(loader: &ConfigLoader<StandardFileSystem>, config: &Config) -> Result<()> {
    config.validate().context("Configuration is invalid")?;
    let order = config.priority_order()?;
    let retry = config.retry_settings();

    println!("Configuration: {}", loader.get_config_path().display());
    println!("  Device order:       {}", order);
    println!("  Manage audio focus: {}", config.routing.manage_audio_focus);
    println!(
        "  Bluetooth retry:    every {:?}, give up after {:?}",
        retry.interval, retry.timeout
    );
    println!("  Log level:          {}", config.general.log_level);
    println!("Configuration is valid");
    Ok(())
}

async fn simulate(
    loader: ConfigLoader<StandardFileSystem>,
    config: &Config,
    path: &Path,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let settings = EngineSettings::from(config);
    info!(
        "Simulating {} with {} step(s)",
        path.display(),
        scenario.steps.len()
    );

    let (signal_handler, signals) = SignalHandler::channel();
    let signal_task = tokio::spawn(async move {
        if let Err(e) = signal_handler.listen_for_signals().await {
            error!("Signal handler error: {}", e);
        }
    });

    let status = scenario
        .run_with(&settings, print_changes(), |service| {
            service.with_signals(signals).with_config_loader(loader)
        })
        .await;
    signal_task.abort();
    let status = status?;

    println!(
        "Final: state={} selected={} headset={}",
        status.state,
        describe(status.selected.as_ref()),
        status.headset
    );
    Ok(())
}

fn print_changes() -> DeviceChangeListener {
    Box::new(|devices, selected| {
        let names: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
        println!(
            "devices=[{}] selected={}",
            names.join(", "),
            describe(selected)
        );
    })
}

fn describe(device: Option<&AudioDevice>) -> String {
    device.map_or_else(|| "none".to_string(), |d| d.to_string())
}
