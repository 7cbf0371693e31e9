use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fogchart::config::AppConfig;
use fogchart::control_input::{ControlCommand, spawn_stdin_reader};
use fogchart::controller::{Controller, ControllerSettings};
use fogchart::format_seed;
use fogchart::pipeline::Pipeline;
use fogchart::seed::{SeedChoice, generate_runtime_seed};
use tokio::sync::mpsc;
use tracing::{Level, info};
use tracing_subscriber::filter::EnvFilter;

/// Explores fogged map regions by clicking toward the nearest reachable fog.
///
/// Commands on stdin: `t` toggles auto-navigation, `r` refreshes, `c x y w h` calibrates
/// the grid from a click on a w×h view, `s` prints status, `q` quits.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; defaults to the per-user fogchart.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the delay jitter between navigation cycles
    #[arg(long)]
    seed: Option<u64>,

    /// Log clicks instead of running the actuator command
    #[arg(long)]
    dry_run: bool,

    /// Enable auto-navigation at startup
    #[arg(long)]
    auto: bool,

    /// Write the annotated frame here, overriding the configuration
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if args.overlay.is_some() {
        config.output.overlay = args.overlay;
    }

    let seed = SeedChoice::resolve(args.seed, generate_runtime_seed());
    info!(seed = %format_seed(seed.value()), source = seed.label(), "jitter seed");

    let pipeline = Pipeline::from_config(&config, args.dry_run)?;
    let controller = Controller::new(
        Arc::new(pipeline),
        ControllerSettings {
            refresh_every: config.timing.refresh_every(),
            jitter: config.timing.jitter,
            seed: seed.value(),
        },
    );

    let (commands, inbox) = mpsc::channel(16);
    spawn_stdin_reader(commands.clone());
    if args.auto {
        commands.send(ControlCommand::ToggleAuto).await?;
    }
    drop(commands);

    controller.run(inbox).await;
    Ok(())
}
