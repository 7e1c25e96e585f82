//! Engine binary for the RIWA2 simulation.
//!
//! This is the main entry point that wires together configuration, the
//! universe ledger, the escape coordinator, the seeker spawner and the
//! run loop. It resumes a saved universe when one exists and otherwise
//! seeds a new cycle.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Parse the command line
//! 3. Load configuration from `riwa-config.yaml` and apply CLI overrides
//! 4. Resume the saved universe, or seed genesis and spawn seekers
//! 5. Install the ctrl-c handler
//! 6. Run the simulation loop
//! 7. Log the result

mod error;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use riwa_core::config::SimulationConfig;
use riwa_core::persist;
use riwa_core::runner::{self, RunControl};
use riwa_core::story::StoryLog;
use riwa_core::tick::SimulationState;
use riwa_types::WorldId;
use riwa_world::{WorldRegistry, seed_genesis};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::spawner::SpawnerConfig;

/// Command-line overrides for the config file.
#[derive(Debug, Parser)]
#[command(name = "riwa-engine")]
#[command(about = "Run the RIWA2 universe escape simulation")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "riwa-config.yaml", env = "RIWA_CONFIG")]
    config: PathBuf,

    /// Snapshot file to resume from and save to (overrides config file)
    #[arg(long, env = "RIWA_STATE")]
    state: Option<PathBuf>,

    /// Seconds per tick (overrides config file)
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Starting world id for new seekers (overrides config file)
    #[arg(long)]
    world: Option<String>,

    /// Disable story narration
    #[arg(long)]
    no_story: bool,

    /// Ticks between auto-saves, 0 saves only at shutdown (overrides config file)
    #[arg(long)]
    save_interval: Option<u64>,

    /// Stop after this many ticks, 0 runs until the storyline ends (overrides config file)
    #[arg(long)]
    max_ticks: Option<u64>,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("riwa-engine starting");

    // 2-3. Parse the command line and load configuration.
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_rate_secs = config.world.tick_rate_secs,
        max_ticks = config.world.max_ticks,
        story = config.story.enabled,
        save_path = %config.persistence.save_path.display(),
        "Configuration loaded"
    );

    // 4. Resume or seed the universe.
    let mut sim_state = if config.persistence.save_path.exists() {
        let snapshot = persist::load(&config.persistence.save_path)?;
        SimulationState::restore(snapshot, config.escape.clone(), config.world.seed)
    } else {
        new_cycle(&config, &cli.config)?
    };
    info!(
        tick = sim_state.clock.tick(),
        seekers = sim_state.seekers.len(),
        energy_available = sim_state.universe.available_energy(),
        "Simulation state assembled, entering tick loop"
    );

    // 5. Install the ctrl-c handler.
    let control = Arc::new(RunControl::new(
        config.world.tick_rate_secs,
        config.world.max_ticks,
        Some(config.persistence.save_path.clone()),
        config.persistence.save_interval_ticks,
    ));
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current tick");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
            }
        });
    }

    // 6. Run the simulation.
    let mut story = StoryLog::new(&config.story);
    let result = runner::run_simulation(&mut sim_state, &control, &mut story)
        .await
        .map_err(EngineError::from)?;

    // 7. Log results.
    runner::log_simulation_end(&result, &sim_state);

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "riwa-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration and apply command-line overrides.
///
/// A missing config file falls back to defaults.
fn load_config(cli: &Cli) -> Result<SimulationConfig, EngineError> {
    let mut config = if cli.config.exists() {
        SimulationConfig::from_file(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
        SimulationConfig::default()
    };

    if let Some(path) = &cli.state {
        config.persistence.save_path.clone_from(path);
    }
    if let Some(rate) = cli.tick_rate {
        config.world.tick_rate_secs = rate;
    }
    if let Some(world) = &cli.world {
        config.world.name.clone_from(world);
    }
    if cli.no_story {
        config.story.enabled = false;
    }
    if let Some(interval) = cli.save_interval {
        config.persistence.save_interval_ticks = interval;
    }
    if let Some(max_ticks) = cli.max_ticks {
        config.world.max_ticks = max_ticks;
    }

    config.validate()?;
    Ok(config)
}

/// Seed genesis and spawn seekers for a fresh cycle.
fn new_cycle(config: &SimulationConfig, config_path: &Path) -> Result<SimulationState, EngineError> {
    let world = WorldId::from(config.world.name.as_str());
    let mut registry = WorldRegistry::with_default_worlds();
    registry.ensure(&world);

    let mut rng = SmallRng::seed_from_u64(config.world.seed);
    let genesis = seed_genesis(&registry, &config.genesis, &mut rng)?;
    info!(
        worlds = registry.len(),
        fragments = genesis.universe.fragments().len(),
        key_clues = genesis.key_clues.len(),
        "Genesis seeded"
    );

    let spawner_config = load_spawner_config(config_path)?;
    let seekers = spawner::spawn_seekers(&spawner_config, &world, &mut rng)?;

    Ok(SimulationState::new(
        genesis,
        seekers,
        config.escape.clone(),
        config.world.seed,
    ))
}

/// Load spawner configuration from the `seekers` section of the config
/// file. If the file does not exist or lacks the section, defaults are
/// used.
fn load_spawner_config(config_path: &Path) -> Result<SpawnerConfig, EngineError> {
    if !config_path.exists() {
        return Ok(SpawnerConfig::default());
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "seekers" section.
    let raw: serde_yml::Value =
        serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
            message: format!("failed to parse config YAML: {e}"),
        })?;

    raw.get("seekers").map_or_else(
        || Ok(SpawnerConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Spawner {
                message: format!("failed to parse seekers config: {e}"),
            })
        },
    )
}
