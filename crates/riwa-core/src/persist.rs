//! Save and resume the simulation as one JSON document.
//!
//! A [`UniverseSnapshot`] holds everything needed to continue a cycle:
//! the tick counter, the ledger, the coordinator's gateway and attempts,
//! the clue catalog and the seekers. Writes go to a sibling temporary file
//! that is then renamed over the target, so an interrupted save never
//! leaves a truncated snapshot behind.
//!
//! Loading runs [`UniverseState::audit`] and checks the gateway's own
//! invariants before the snapshot is handed back.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use riwa_escape::{EscapeCoordinator, EscapeSnapshot, RandomDestination};
use riwa_ledger::{LedgerError, UniverseState};
use riwa_types::CoordinateKeyFragment;

use crate::clock::SimulationClock;
use crate::config::EscapeConfig;
use crate::tick::{Seeker, SimulationState};

/// Errors that can occur while saving or loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Reading, writing or renaming the file failed.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not a valid snapshot.
    #[error("malformed snapshot: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The snapshot parsed but its ledger is inconsistent.
    #[error("snapshot failed ledger audit: {source}")]
    Audit {
        /// The first violation found.
        #[from]
        source: LedgerError,
    },

    /// The snapshot's gateway state contradicts itself.
    #[error("snapshot gateway is inconsistent: {reason}")]
    Gateway {
        /// Which gateway invariant was broken.
        reason: String,
    },
}

/// Everything persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseSnapshot {
    /// Tick the snapshot was taken at.
    #[serde(default)]
    pub tick: u64,
    /// The universe ledger.
    pub universe: UniverseState,
    /// Gateway and attempt history.
    #[serde(default)]
    pub escape: EscapeSnapshot,
    /// Full clue records.
    #[serde(default)]
    pub key_clues: Vec<CoordinateKeyFragment>,
    /// Seekers in acting order.
    #[serde(default)]
    pub seekers: Vec<Seeker>,
}

/// Write `snapshot` to `path` atomically.
///
/// # Errors
///
/// Returns [`PersistError::Json`] if serialization fails or
/// [`PersistError::Io`] if the file cannot be written or renamed.
pub fn save(path: &Path, snapshot: &UniverseSnapshot) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = temp_path(path);

    std::fs::write(&tmp, json).map_err(|source| PersistError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), tick = snapshot.tick, "Snapshot saved");
    Ok(())
}

/// Read and audit a snapshot from `path`.
///
/// # Errors
///
/// Returns [`PersistError::Io`] if the file cannot be read,
/// [`PersistError::Json`] if it is not a valid snapshot (including
/// missing required fields or unknown enum tags),
/// [`PersistError::Audit`] if the ledger is inconsistent, or
/// [`PersistError::Gateway`] if the gateway state contradicts itself
/// (for example active with no activating entity).
pub fn load(path: &Path) -> Result<UniverseSnapshot, PersistError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: UniverseSnapshot = serde_json::from_str(&contents)?;
    snapshot.universe.audit()?;
    if let Some(reason) = snapshot.escape.gateway.invariant_violation() {
        return Err(PersistError::Gateway {
            reason: reason.to_owned(),
        });
    }

    info!(
        path = %path.display(),
        tick = snapshot.tick,
        escaped = snapshot.universe.entities_escaped().len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}

/// Sibling path used while a save is in flight.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl SimulationState {
    /// Capture the persisted part of the state.
    pub fn snapshot(&self) -> UniverseSnapshot {
        UniverseSnapshot {
            tick: self.clock.tick(),
            universe: self.universe.clone(),
            escape: self.coordinator.snapshot(),
            key_clues: self.key_clues.clone(),
            seekers: self.seekers.clone(),
        }
    }

    /// Resume from a snapshot.
    ///
    /// The random streams are reseeded from `seed` and the saved tick, so
    /// a resumed run does not replay the choices of the original run.
    pub fn restore(snapshot: UniverseSnapshot, escape: EscapeConfig, seed: u64) -> Self {
        let stream = seed.wrapping_add(snapshot.tick);
        Self {
            clock: SimulationClock::at(snapshot.tick),
            universe: snapshot.universe,
            coordinator: EscapeCoordinator::from_snapshot(
                snapshot.escape,
                Box::new(RandomDestination::seeded(stream)),
            ),
            key_clues: snapshot.key_clues,
            seekers: snapshot.seekers,
            escape,
            rng: SmallRng::seed_from_u64(stream),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use riwa_types::{EntityId, EscapeStatus, WorldId};
    use riwa_world::{GenesisConfig, WorldRegistry, seed_genesis};

    use crate::tick::run_tick;

    fn scratch_file(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("riwa-{label}-{}.json", uuid::Uuid::new_v4()))
    }

    fn make_state() -> SimulationState {
        let mut rng = SmallRng::seed_from_u64(7);
        let genesis = seed_genesis(
            &WorldRegistry::with_default_worlds(),
            &GenesisConfig::default(),
            &mut rng,
        )
        .unwrap();
        let seekers = vec![Seeker {
            id: EntityId::from("E1"),
            name: "Lin".to_owned(),
            world: WorldId::from("cyberpunk_city"),
        }];
        SimulationState::new(genesis, seekers, EscapeConfig::default(), 7)
    }

    #[test]
    fn save_then_load_restores_state() {
        let mut state = make_state();
        for _ in 0..5 {
            let _ = run_tick(&mut state).unwrap();
        }
        let path = scratch_file("roundtrip");

        save(&path, &state.snapshot()).unwrap();
        let loaded = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, state.snapshot());
        assert_eq!(loaded.tick, 5);

        let restored = SimulationState::restore(loaded, EscapeConfig::default(), 7);
        assert_eq!(restored.clock.tick(), 5);
        assert_eq!(
            restored.coordinator.progress(&EntityId::from("E1")),
            state.coordinator.progress(&EntityId::from("E1"))
        );
    }

    #[test]
    fn restored_state_keeps_running() {
        let mut state = make_state();
        let _ = run_tick(&mut state).unwrap();
        let mut restored = SimulationState::restore(state.snapshot(), EscapeConfig::default(), 7);

        let summary = run_tick(&mut restored).unwrap();
        assert_eq!(summary.tick, 2);
        assert_eq!(
            restored.coordinator.attempt(&EntityId::from("E1")).map(|a| a.status),
            Some(EscapeStatus::FragmentsCollecting)
        );
        assert_eq!(restored.coordinator.history(&EntityId::from("E1")).len(), 1);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let state = make_state();
        let path = scratch_file("tmp");
        save(&path, &state.snapshot()).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load(&scratch_file("absent"));
        assert!(matches!(result, Err(PersistError::Io { .. })));
    }

    #[test]
    fn missing_universe_is_json_error() {
        let path = scratch_file("partial");
        std::fs::write(&path, r#"{"tick": 3}"#).unwrap();
        let result = load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(PersistError::Json { .. })));
    }

    #[test]
    fn overdrawn_ledger_fails_audit() {
        let state = make_state();
        let mut value = serde_json::to_value(state.snapshot()).unwrap();
        value["universe"]["total_source_energy_allocated"] = serde_json::Value::from(5);
        value["universe"]["source_energy_consumed"] = serde_json::Value::from(9);

        let path = scratch_file("overdrawn");
        std::fs::write(&path, value.to_string()).unwrap();
        let result = load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            result,
            Err(PersistError::Audit {
                source: LedgerError::Overdrawn { .. }
            })
        ));
    }

    #[test]
    fn active_gateway_without_activator_fails_load() {
        let state = make_state();
        let mut value = serde_json::to_value(state.snapshot()).unwrap();
        value["escape"]["gateway"] = serde_json::json!({ "is_active": true });

        let path = scratch_file("orphan-gateway");
        std::fs::write(&path, value.to_string()).unwrap();
        let result = load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(PersistError::Gateway { .. })));
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let tmp = temp_path(Path::new("saves/riwa-state.json"));
        assert_eq!(tmp, PathBuf::from("saves/riwa-state.json.tmp"));
    }
}
