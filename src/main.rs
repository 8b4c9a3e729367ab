//! game-shuffler
//!
//! Rotates focus between running emulator windows, showing one game at a
//! time until the operator has marked every game complete. Optionally
//! mirrors the shown game into OBS source visibility.

mod config;
mod desktop;
mod games;
mod input;
mod logging;
mod obs;
mod shuffle;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use config::Config;
use games::{ExportSink, GameRegistry};
use input::HotkeyRouter;
use obs::ObsOverlay;
use shuffle::{OverlayTarget, RunOutcome, Scheduler, SignalFlags, Timing};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config_path = config_arg(&args)?;

    let _log_guard = logging::init_logging()?;
    info!("game-shuffler starting...");

    let config = Config::load(config_path.as_deref())?;
    info!("Configuration loaded from {:?}", config.config_path()?);
    config.validate().context("Invalid configuration")?;
    config.log_summary();

    let runtime = tokio::runtime::Runtime::new()?;

    let flags = Arc::new(SignalFlags::new());

    HotkeyRouter::from_config(&config.hotkeys)?.spawn(flags.clone())?;

    let ctrl_c_flags = flags.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        ctrl_c_flags.request_shutdown();
    })?;

    let (locator, focus) = desktop::create_desktop(&config.general.window_marker)?;

    let mut scheduler = Scheduler::new(
        GameRegistry::new(config.games.titles.iter().cloned()),
        flags,
        locator,
        focus,
        ExportSink::from_config(&config.export),
        Timing::from_config(&config.general),
        StdRng::from_entropy(),
    );

    if config.obs.obs_integration {
        match runtime.block_on(ObsOverlay::connect(&config.obs)) {
            Ok(overlay) => {
                scheduler = scheduler.with_overlay(OverlayTarget {
                    sync: Box::new(overlay),
                    scene: config.obs.scene_name.clone(),
                    active_transform: config.obs.active_transform,
                });
            }
            Err(e) => {
                error!("{:#}", e);
                warn!("Continuing without OBS integration");
            }
        }
    }

    if ExportSink::from_config(&config.export).is_enabled() {
        info!("Status exports enabled");
    }

    let outcome = runtime.block_on(scheduler.run());
    let registry = scheduler.registry();
    info!(
        "Completed {}/{} games",
        registry.completed(),
        registry.len()
    );
    match outcome {
        RunOutcome::Exhausted => info!("All games finished"),
        RunOutcome::Shutdown => info!("Shutdown complete"),
    }

    Ok(())
}

/// Value of `-c/--config`, if given
fn config_arg(args: &[String]) -> Result<Option<PathBuf>> {
    let Some(pos) = args.iter().position(|a| a == "--config" || a == "-c") else {
        return Ok(None);
    };

    args.get(pos + 1)
        .map(|p| Some(PathBuf::from(p)))
        .context("--config requires a path")
}

fn print_help() {
    println!("game-shuffler - Rotate focus between running emulator windows");
    println!();
    println!("USAGE:");
    println!("    game-shuffler [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help            Print this help message");
    println!("    -c, --config <PATH>   Use this config file instead of the default");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                  Set log level (e.g., debug, info, warn)");
    println!("    GAME_SHUFFLER_LOG_PATH    Override the log directory");
}
