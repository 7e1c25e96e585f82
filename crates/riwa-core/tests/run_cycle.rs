//! End-to-end runs of a whole cycle through the run loop.

#![allow(clippy::unwrap_used)]

use rand::SeedableRng;
use rand::rngs::SmallRng;
use riwa_core::config::{EscapeConfig, StoryConfig};
use riwa_core::persist;
use riwa_core::runner::{NoOpCallback, RunControl, SimulationEndReason, run_simulation};
use riwa_core::story::StoryLog;
use riwa_core::tick::{Seeker, SimulationState};
use riwa_types::{EntityId, EscapeStatus, WorldId};
use riwa_world::{GenesisConfig, WorldRegistry, seed_genesis};

fn fresh_state(seed: u64) -> SimulationState {
    let mut rng = SmallRng::seed_from_u64(seed);
    let genesis = seed_genesis(
        &WorldRegistry::with_default_worlds(),
        &GenesisConfig::default(),
        &mut rng,
    )
    .unwrap();
    let seekers = ["Lin", "Mara", "Quill"]
        .iter()
        .zip(1_u32..)
        .map(|(name, n)| Seeker {
            id: EntityId::new(format!("seeker-{n}")),
            name: (*name).to_owned(),
            world: WorldId::from("cyberpunk_city"),
        })
        .collect();
    SimulationState::new(genesis, seekers, EscapeConfig::default(), seed)
}

#[tokio::test]
async fn cycle_runs_to_a_single_escape() {
    let mut state = fresh_state(11);
    let control = RunControl::new(0.0, 1_000, None, 0);
    let mut story = StoryLog::new(&StoryConfig::default());

    let result = run_simulation(&mut state, &control, &mut story)
        .await
        .unwrap();

    assert_eq!(result.end_reason, SimulationEndReason::StorylineComplete);
    assert_eq!(state.universe.entities_escaped().len(), 1);
    assert!(state.coordinator.gateway().is_active);
    assert!(state.universe.audit().is_ok());

    let statuses: Vec<EscapeStatus> = state
        .seekers
        .iter()
        .filter_map(|s| state.coordinator.attempt(&s.id).map(|a| a.status))
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == EscapeStatus::Escaped).count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == EscapeStatus::Failed).count(),
        2
    );

    assert!(!story.is_empty());
    assert!(story.entries().any(|e| e.text.contains("is gone.")));
}

#[tokio::test]
async fn interrupted_cycle_resumes_from_disk() {
    let path = std::env::temp_dir().join(format!("riwa-resume-{}.json", uuid::Uuid::new_v4()));

    let mut first = fresh_state(5);
    let control = RunControl::new(0.0, 6, Some(path.clone()), 0);
    let result = run_simulation(&mut first, &control, &mut NoOpCallback)
        .await
        .unwrap();
    assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);

    let snapshot = persist::load(&path).unwrap();
    assert_eq!(snapshot.tick, 6);
    let mut resumed = SimulationState::restore(snapshot, EscapeConfig::default(), 5);

    let control = RunControl::new(0.0, 1_000, Some(path.clone()), 10);
    let result = run_simulation(&mut resumed, &control, &mut NoOpCallback)
        .await
        .unwrap();
    let saved = persist::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(result.end_reason, SimulationEndReason::StorylineComplete);
    assert_eq!(resumed.clock.tick(), result.total_ticks.saturating_add(6));
    assert_eq!(saved.tick, resumed.clock.tick());
    assert_eq!(resumed.universe.entities_escaped().len(), 1);
    // Attempts made before the save are continued, not restarted.
    for seeker in &resumed.seekers {
        assert_eq!(resumed.coordinator.history(&seeker.id).len(), 1);
    }
}
