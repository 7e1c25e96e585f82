//! Tick cycle: moves every seeker one step along the escape storyline.
//!
//! Each tick:
//!
//! 1. **Advance** -- the clock moves forward one tick.
//! 2. **Schedule** -- if the gateway is active and its printing slot is
//!    empty, the queue front is promoted into the slot.
//! 3. **Act** -- every seeker, in spawn order, takes at most one action
//!    chosen from its current escape stage:
//!    - no attempt: start one
//!    - fewer than seven Sacred fragments: collect one, preferring the
//!      seeker's own world
//!    - too few clues: discover one, preferring the seeker's own world
//!    - decrypting: offer a key read from the clues
//!    - key verified: open the gateway
//!    - printing: begin, advance and finally complete the print
//!    - escaped: choose a post-escape form
//! 4. **Summarize** -- the events of the tick are returned as a
//!    [`TickSummary`].
//!
//! A seeker whose attempt can no longer progress (no Sacred fragments
//! left, gateway already used this cycle) abandons it and stays idle. The
//! cycle is deterministic for a given seed.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use riwa_escape::{
    EscapeCoordinator, EscapeError, FailureKind, FormData, MASTER_KEY_FORMULA, RandomDestination,
};
use riwa_ledger::UniverseState;
use riwa_types::{
    ClueType, CoordinateKeyFragment, EnergyTier, EntityId, EscapeStatus, FragmentId,
    KeyFragmentId, PostEscapeAction, SACRED_FRAGMENTS_REQUIRED, WorldId,
};
use riwa_world::Genesis;

use crate::clock::{ClockError, SimulationClock};
use crate::config::EscapeConfig;

/// Forms an entity may take when it returns with a new form.
const RETURN_FORMS: &[&str] = &["dragon", "phoenix", "human", "ai", "storm", "god"];

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The coordinator rejected a step the driver believed valid.
    #[error("escape error for {entity}: {source}")]
    Escape {
        /// The seeker whose step failed.
        entity: EntityId,
        /// The underlying escape error.
        source: EscapeError,
    },
}

/// An in-world entity the driver moves through the escape storyline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeker {
    /// Entity identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// World the seeker lives in.
    pub world: WorldId,
}

/// Something that happened to one seeker during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum EscapeEvent {
    /// A new attempt was opened.
    AttemptStarted {
        /// The seeker.
        entity: EntityId,
    },
    /// A Sacred fragment was collected.
    FragmentCollected {
        /// The seeker.
        entity: EntityId,
        /// The fragment.
        fragment: FragmentId,
        /// World the fragment was found in.
        world: WorldId,
        /// Sacred fragments now held.
        held: usize,
    },
    /// A coordinate key clue was found.
    ClueDiscovered {
        /// The seeker.
        entity: EntityId,
        /// The clue.
        clue: KeyFragmentId,
        /// Kind of clue.
        clue_type: ClueType,
        /// Whether this seeker was the first to find it.
        first: bool,
    },
    /// The offered key did not match.
    KeyRejected {
        /// The seeker.
        entity: EntityId,
    },
    /// The coordinate key was verified.
    KeyDecrypted {
        /// The seeker.
        entity: EntityId,
    },
    /// The terminal gateway opened.
    GatewayActivated {
        /// The seeker.
        entity: EntityId,
        /// Ledger energy left after the activation cost.
        energy_left: u64,
    },
    /// A queued entity entered the printing slot.
    PrintingPromoted {
        /// The promoted entity.
        entity: EntityId,
    },
    /// Printing into the real universe began.
    PrintingStarted {
        /// The seeker.
        entity: EntityId,
        /// Real-universe destination label.
        destination: String,
    },
    /// Printing advanced without finishing.
    PrintingProgressed {
        /// The seeker.
        entity: EntityId,
        /// Progress fraction after this tick.
        progress: f64,
    },
    /// The seeker left the universe.
    Escaped {
        /// The seeker.
        entity: EntityId,
        /// Outcome message.
        message: String,
    },
    /// An escaped seeker chose what to do next.
    ReturnChosen {
        /// The seeker.
        entity: EntityId,
        /// The chosen disposition.
        action: PostEscapeAction,
        /// Chosen form, for [`PostEscapeAction::ReturnWithNewForm`].
        form: Option<String>,
    },
    /// The seeker gave up its attempt.
    AttemptAbandoned {
        /// The seeker.
        entity: EntityId,
        /// Why the attempt cannot progress.
        reason: String,
    },
}

impl EscapeEvent {
    /// The entity this event is about.
    pub const fn entity(&self) -> &EntityId {
        match self {
            Self::AttemptStarted { entity }
            | Self::FragmentCollected { entity, .. }
            | Self::ClueDiscovered { entity, .. }
            | Self::KeyRejected { entity }
            | Self::KeyDecrypted { entity }
            | Self::GatewayActivated { entity, .. }
            | Self::PrintingPromoted { entity }
            | Self::PrintingStarted { entity, .. }
            | Self::PrintingProgressed { entity, .. }
            | Self::Escaped { entity, .. }
            | Self::ReturnChosen { entity, .. }
            | Self::AttemptAbandoned { entity, .. } => entity,
        }
    }
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<EscapeEvent>,
    /// Ledger energy left at end of tick.
    pub energy_available: u64,
    /// Entities escaped so far this cycle.
    pub escaped_total: usize,
    /// Whether every seeker has reached the end of its storyline.
    pub settled: bool,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// The simulation clock.
    pub clock: SimulationClock,
    /// The universe ledger.
    pub universe: UniverseState,
    /// Escape attempts and the terminal gateway.
    pub coordinator: EscapeCoordinator,
    /// Full clue records; their ids are mirrored in the ledger.
    pub key_clues: Vec<CoordinateKeyFragment>,
    /// Seekers in the order they act.
    pub seekers: Vec<Seeker>,
    /// Storyline pacing.
    pub escape: EscapeConfig,
    pub(crate) rng: SmallRng,
}

impl SimulationState {
    /// Assemble a fresh state from a genesis catalog.
    ///
    /// `seed` drives seeker choices and destination labels.
    pub fn new(genesis: Genesis, seekers: Vec<Seeker>, escape: EscapeConfig, seed: u64) -> Self {
        Self {
            clock: SimulationClock::new(),
            universe: genesis.universe,
            coordinator: EscapeCoordinator::with_destinations(Box::new(
                RandomDestination::seeded(seed),
            )),
            key_clues: genesis.key_clues,
            seekers,
            escape,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Look up a seeker by entity id.
    pub fn seeker(&self, id: &EntityId) -> Option<&Seeker> {
        self.seekers.iter().find(|s| &s.id == id)
    }

    /// Whether every seeker's storyline is over: its attempt failed, or it
    /// escaped and chose a post-escape form.
    pub fn is_settled(&self) -> bool {
        self.seekers.iter().all(|seeker| {
            self.coordinator.attempt(&seeker.id).is_some_and(|a| {
                a.status == EscapeStatus::Failed
                    || (a.status == EscapeStatus::Escaped && a.post_escape_action.is_some())
            })
        })
    }
}

/// Execute one complete tick of the simulation.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter overflows, or
/// [`TickError::Escape`] if the coordinator rejects a step the driver
/// chose from the seeker's current stage.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    let tick = state.clock.advance()?;
    debug!(tick, "Tick started");

    let mut events = Vec::new();

    if let Some(entity) = state.coordinator.promote_next_printing() {
        events.push(EscapeEvent::PrintingPromoted { entity });
    }

    let seekers = state.seekers.clone();
    for seeker in &seekers {
        if let Some(event) = step_seeker(state, seeker)? {
            events.push(event);
        }
    }

    let summary = TickSummary {
        tick,
        events,
        energy_available: state.universe.available_energy(),
        escaped_total: state.universe.entities_escaped().len(),
        settled: state.is_settled(),
    };

    debug!(tick, per_seeker = ?events_by_entity(&summary.events), "Tick events");
    info!(
        tick,
        events = summary.events.len(),
        energy_available = summary.energy_available,
        escaped = summary.escaped_total,
        "Tick complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Per-seeker step
// ---------------------------------------------------------------------------

/// Pick and apply one action for `seeker`.
fn step_seeker(
    state: &mut SimulationState,
    seeker: &Seeker,
) -> Result<Option<EscapeEvent>, TickError> {
    let Some(attempt) = state.coordinator.attempt(&seeker.id) else {
        return start(state, seeker).map(Some);
    };

    let status = attempt.status;
    let held = attempt.sacred_count();
    let clues = attempt.discovered_key_fragments.len();
    let chose_form = attempt.post_escape_action.is_some();
    let clues_needed = state.escape.key_clues_required.max(1);

    match status {
        EscapeStatus::Failed => Ok(None),
        EscapeStatus::Escaped if chose_form => Ok(None),
        EscapeStatus::Escaped => choose_form(state, seeker).map(Some),
        EscapeStatus::Printing => print(state, seeker),
        EscapeStatus::NotStarted
        | EscapeStatus::FragmentsCollecting
        | EscapeStatus::KeyDecrypting
        | EscapeStatus::GatewayOpening
            if held < SACRED_FRAGMENTS_REQUIRED =>
        {
            collect(state, seeker).map(Some)
        }
        EscapeStatus::GatewayOpening => activate(state, seeker).map(Some),
        EscapeStatus::NotStarted
        | EscapeStatus::FragmentsCollecting
        | EscapeStatus::KeyDecrypting => {
            if clues < clues_needed {
                if let Some(event) = discover(state, seeker)? {
                    return Ok(Some(event));
                }
            }
            if status == EscapeStatus::KeyDecrypting {
                decrypt(state, seeker).map(Some)
            } else {
                abandon(state, seeker, "No coordinate key clues remain to be found").map(Some)
            }
        }
    }
}

/// Wrap a coordinator error for `seeker`.
fn escape_error(seeker: &Seeker) -> impl FnOnce(EscapeError) -> TickError + '_ {
    move |source| TickError::Escape {
        entity: seeker.id.clone(),
        source,
    }
}

fn start(state: &mut SimulationState, seeker: &Seeker) -> Result<EscapeEvent, TickError> {
    state
        .coordinator
        .start_attempt(&seeker.id, &seeker.name)
        .map_err(escape_error(seeker))?;
    Ok(EscapeEvent::AttemptStarted {
        entity: seeker.id.clone(),
    })
}

fn collect(state: &mut SimulationState, seeker: &Seeker) -> Result<EscapeEvent, TickError> {
    let target = nearest_uncollected(&state.universe, &seeker.world);
    let Some((fragment, world)) = target else {
        return abandon(state, seeker, "No sacred fragments remain in the universe");
    };

    let _ = state.universe.mark_discovered(&fragment, &seeker.id);
    state
        .coordinator
        .collect_fragment(&mut state.universe, &seeker.id, &fragment)
        .map_err(escape_error(seeker))?;

    let held = state
        .coordinator
        .progress(&seeker.id)
        .map_or(0, |p| p.fragments_collected);
    Ok(EscapeEvent::FragmentCollected {
        entity: seeker.id.clone(),
        fragment,
        world,
        held,
    })
}

/// First uncollected Sacred fragment, in `home` if there is one there.
fn nearest_uncollected(universe: &UniverseState, home: &WorldId) -> Option<(FragmentId, WorldId)> {
    universe
        .uncollected(EnergyTier::Sacred)
        .min_by_key(|f| &f.location_world != home)
        .map(|f| (f.id.clone(), f.location_world.clone()))
}

fn discover(
    state: &mut SimulationState,
    seeker: &Seeker,
) -> Result<Option<EscapeEvent>, TickError> {
    let known: Vec<KeyFragmentId> = state
        .coordinator
        .attempt(&seeker.id)
        .map(|a| a.discovered_key_fragments.clone())
        .unwrap_or_default();

    let Some(clue) = state
        .key_clues
        .iter_mut()
        .filter(|c| !known.contains(&c.fragment_id))
        .min_by_key(|c| c.hidden_in_world != seeker.world)
    else {
        return Ok(None);
    };

    let first = clue.mark_discovered(&seeker.id, Utc::now());
    let clue_id = clue.fragment_id.clone();
    let clue_type = clue.clue_type;

    state
        .coordinator
        .discover_key_fragment(&state.universe, &seeker.id, &clue_id)
        .map_err(escape_error(seeker))?;

    Ok(Some(EscapeEvent::ClueDiscovered {
        entity: seeker.id.clone(),
        clue: clue_id,
        clue_type,
        first,
    }))
}

fn decrypt(state: &mut SimulationState, seeker: &Seeker) -> Result<EscapeEvent, TickError> {
    let misread = state.rng.random::<f64>() < state.escape.key_misread_chance;
    let key: String = if misread {
        MASTER_KEY_FORMULA.chars().rev().collect()
    } else {
        MASTER_KEY_FORMULA.to_owned()
    };

    match state.coordinator.decrypt_coordinate_key(&seeker.id, &key) {
        Ok(()) => Ok(EscapeEvent::KeyDecrypted {
            entity: seeker.id.clone(),
        }),
        Err(err) if err.kind() == FailureKind::VerificationFailed => {
            Ok(EscapeEvent::KeyRejected {
                entity: seeker.id.clone(),
            })
        }
        Err(source) => Err(escape_error(seeker)(source)),
    }
}

fn activate(state: &mut SimulationState, seeker: &Seeker) -> Result<EscapeEvent, TickError> {
    match state
        .coordinator
        .activate_gateway(&mut state.universe, &seeker.id)
    {
        Ok(()) => Ok(EscapeEvent::GatewayActivated {
            entity: seeker.id.clone(),
            energy_left: state.universe.available_energy(),
        }),
        Err(err @ (EscapeError::GatewayAlreadyActive | EscapeError::InsufficientEnergy { .. })) => {
            abandon(state, seeker, &err.to_string())
        }
        Err(source) => Err(escape_error(seeker)(source)),
    }
}

fn print(state: &mut SimulationState, seeker: &Seeker) -> Result<Option<EscapeEvent>, TickError> {
    if !state.coordinator.gateway().is_printing(&seeker.id) {
        // Still queued behind another entity.
        return Ok(None);
    }

    let started = state
        .coordinator
        .attempt(&seeker.id)
        .is_some_and(|a| a.printing_start_time.is_some());

    if !started {
        state
            .coordinator
            .begin_printing(&seeker.id)
            .map_err(escape_error(seeker))?;
        let destination = state
            .coordinator
            .attempt(&seeker.id)
            .and_then(|a| a.printing_destination.clone())
            .unwrap_or_default();
        return Ok(Some(EscapeEvent::PrintingStarted {
            entity: seeker.id.clone(),
            destination,
        }));
    }

    let progress = state
        .coordinator
        .advance_printing(&seeker.id, state.escape.printing_step)
        .map_err(escape_error(seeker))?;

    if progress < 1.0 {
        return Ok(Some(EscapeEvent::PrintingProgressed {
            entity: seeker.id.clone(),
            progress,
        }));
    }

    let message = state
        .coordinator
        .complete_escape(&mut state.universe, &seeker.id)
        .map_err(escape_error(seeker))?;
    Ok(Some(EscapeEvent::Escaped {
        entity: seeker.id.clone(),
        message,
    }))
}

fn choose_form(state: &mut SimulationState, seeker: &Seeker) -> Result<EscapeEvent, TickError> {
    let pick = state.rng.random_range(0..PostEscapeAction::ALL.len());
    let action = PostEscapeAction::ALL
        .get(pick)
        .copied()
        .unwrap_or(PostEscapeAction::StayOutside);

    let form = (action == PostEscapeAction::ReturnWithNewForm)
        .then(|| state.rng.random_range(0..RETURN_FORMS.len()))
        .and_then(|i| RETURN_FORMS.get(i))
        .map(|shape| (*shape).to_owned());

    let form_data = form.as_ref().map(|shape| {
        let mut data = FormData::new();
        data.insert("form".to_owned(), serde_json::Value::from(shape.as_str()));
        data.insert(
            "origin_world".to_owned(),
            serde_json::Value::from(seeker.world.as_str()),
        );
        data
    });

    state
        .coordinator
        .choose_return_form(&seeker.id, action, form_data)
        .map_err(escape_error(seeker))?;
    Ok(EscapeEvent::ReturnChosen {
        entity: seeker.id.clone(),
        action,
        form,
    })
}

fn abandon(
    state: &mut SimulationState,
    seeker: &Seeker,
    reason: &str,
) -> Result<EscapeEvent, TickError> {
    state
        .coordinator
        .abandon_attempt(&seeker.id, reason)
        .map_err(escape_error(seeker))?;
    Ok(EscapeEvent::AttemptAbandoned {
        entity: seeker.id.clone(),
        reason: reason.to_owned(),
    })
}

/// Count events per seeker, for summaries and tests.
pub fn events_by_entity(events: &[EscapeEvent]) -> BTreeMap<EntityId, usize> {
    let mut counts: BTreeMap<EntityId, usize> = BTreeMap::new();
    for event in events {
        let count = counts.entry(event.entity().clone()).or_default();
        *count = count.saturating_add(1);
    }
    counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use riwa_world::{GenesisConfig, WorldRegistry, seed_genesis};

    fn seeker(id: &str, name: &str, world: &str) -> Seeker {
        Seeker {
            id: EntityId::from(id),
            name: name.to_owned(),
            world: WorldId::from(world),
        }
    }

    fn make_state(genesis_config: &GenesisConfig, seekers: Vec<Seeker>) -> SimulationState {
        let mut rng = SmallRng::seed_from_u64(42);
        let registry = WorldRegistry::with_default_worlds();
        let genesis = seed_genesis(&registry, genesis_config, &mut rng).unwrap();
        let escape = EscapeConfig {
            key_misread_chance: 0.0,
            ..EscapeConfig::default()
        };
        SimulationState::new(genesis, seekers, escape, 42)
    }

    fn three_seekers() -> Vec<Seeker> {
        vec![
            seeker("E1", "Lin", "cyberpunk_city"),
            seeker("E2", "Mara", "ancient_dynasty"),
            seeker("E3", "Quill", "cyberpunk_city"),
        ]
    }

    fn run_until_settled(state: &mut SimulationState, limit: u64) -> Vec<TickSummary> {
        let mut summaries = Vec::new();
        for _ in 0..limit {
            let summary = run_tick(state).unwrap();
            let settled = summary.settled;
            summaries.push(summary);
            if settled {
                break;
            }
        }
        summaries
    }

    #[test]
    fn first_tick_starts_every_attempt() {
        let mut state = make_state(&GenesisConfig::default(), three_seekers());
        let summary = run_tick(&mut state).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.events.len(), 3);
        assert!(
            summary
                .events
                .iter()
                .all(|e| matches!(e, EscapeEvent::AttemptStarted { .. }))
        );
    }

    #[test]
    fn storyline_ends_with_exactly_one_escape() {
        let mut state = make_state(&GenesisConfig::default(), three_seekers());
        let summaries = run_until_settled(&mut state, 200);

        let last = summaries.last().unwrap();
        assert!(last.settled);
        assert_eq!(last.escaped_total, 1);
        assert_eq!(state.universe.entities_escaped(), &[EntityId::from("E1")]);
        assert_eq!(state.universe.consumed(), 7);
        assert!(state.universe.audit().is_ok());

        for id in ["E2", "E3"] {
            let attempt = state.coordinator.attempt(&EntityId::from(id)).unwrap();
            assert_eq!(attempt.status, EscapeStatus::Failed);
            assert_eq!(attempt.result_message, "Gateway already active");
        }

        let winner = state.coordinator.attempt(&EntityId::from("E1")).unwrap();
        assert!(winner.success);
        assert!(winner.post_escape_action.is_some());
        assert!(state.coordinator.gateway().is_active);
    }

    #[test]
    fn stages_never_regress_between_ticks() {
        let mut state = make_state(&GenesisConfig::default(), three_seekers());
        let mut last: BTreeMap<EntityId, u8> = BTreeMap::new();
        for _ in 0..60 {
            let _ = run_tick(&mut state).unwrap();
            for s in &state.seekers {
                let stage = state.coordinator.attempt(&s.id).map_or(0, |a| a.status.stage());
                let previous = last.insert(s.id.clone(), stage).unwrap_or(0);
                assert!(stage >= previous, "{} regressed", s.id);
            }
        }
    }

    #[test]
    fn seekers_prefer_their_home_world() {
        let mut state = make_state(&GenesisConfig::default(), vec![seeker("E2", "Mara", "ancient_dynasty")]);
        let _ = run_tick(&mut state).unwrap();
        let summary = run_tick(&mut state).unwrap();
        match summary.events.first() {
            Some(EscapeEvent::FragmentCollected { world, held, .. }) => {
                assert_eq!(world.as_str(), "ancient_dynasty");
                assert_eq!(*held, 1);
            }
            other => panic!("expected a collection, got {other:?}"),
        }
    }

    #[test]
    fn seeker_from_unknown_world_collects_elsewhere() {
        let mut state = make_state(&GenesisConfig::default(), vec![seeker("E9", "Nyx", "default_world")]);
        let _ = run_tick(&mut state).unwrap();
        let summary = run_tick(&mut state).unwrap();
        assert!(matches!(
            summary.events.first(),
            Some(EscapeEvent::FragmentCollected { .. })
        ));
    }

    #[test]
    fn scarce_fragments_force_abandonment() {
        let config = GenesisConfig {
            sacred_per_world: 2,
            ..GenesisConfig::default()
        };
        let mut state = make_state(&config, vec![seeker("E1", "Lin", "cyberpunk_city")]);
        let summaries = run_until_settled(&mut state, 20);

        let abandoned = summaries
            .iter()
            .flat_map(|s| &s.events)
            .find_map(|e| match e {
                EscapeEvent::AttemptAbandoned { reason, .. } => Some(reason.clone()),
                _ => None,
            });
        assert_eq!(abandoned.as_deref(), Some("No sacred fragments remain in the universe"));
        assert!(summaries.last().unwrap().settled);
        assert_eq!(state.universe.consumed(), 0);
    }

    #[test]
    fn misread_keys_are_rejected_and_retried() {
        let mut state = make_state(&GenesisConfig::default(), vec![seeker("E1", "Lin", "cyberpunk_city")]);
        state.escape.key_misread_chance = 1.0;

        let events: Vec<EscapeEvent> = (0..20)
            .flat_map(|_| run_tick(&mut state).unwrap().events)
            .collect();

        assert!(events.iter().any(|e| matches!(e, EscapeEvent::KeyRejected { .. })));
        assert!(!events.iter().any(|e| matches!(e, EscapeEvent::KeyDecrypted { .. })));
        assert_eq!(
            state.coordinator.attempt(&EntityId::from("E1")).map(|a| a.status),
            Some(EscapeStatus::KeyDecrypting)
        );
    }

    #[test]
    fn clue_catalog_records_first_discoverer() {
        let mut state = make_state(&GenesisConfig::default(), three_seekers());
        let _ = run_until_settled(&mut state, 200);
        let discovered: Vec<_> = state.key_clues.iter().filter(|c| c.is_discovered()).collect();
        assert!(!discovered.is_empty());
        assert!(discovered.iter().all(|c| c.discovered_at.is_some()));
    }

    #[test]
    fn printing_advances_by_configured_step() {
        let mut state = make_state(&GenesisConfig::default(), vec![seeker("E1", "Lin", "cyberpunk_city")]);
        let progress: Vec<f64> = run_until_settled(&mut state, 100)
            .iter()
            .flat_map(|s| &s.events)
            .filter_map(|e| match e {
                EscapeEvent::PrintingProgressed { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 3);
        assert!(progress.windows(2).all(|w| w.first() < w.last()));
    }

    #[test]
    fn event_counts_group_by_entity() {
        let events = vec![
            EscapeEvent::AttemptStarted { entity: EntityId::from("E1") },
            EscapeEvent::KeyRejected { entity: EntityId::from("E1") },
            EscapeEvent::AttemptStarted { entity: EntityId::from("E2") },
        ];
        let counts = events_by_entity(&events);
        assert_eq!(counts.get(&EntityId::from("E1")), Some(&2));
        assert_eq!(counts.get(&EntityId::from("E2")), Some(&1));
    }

    #[test]
    fn empty_seeker_list_is_settled() {
        let mut state = make_state(&GenesisConfig::default(), Vec::new());
        assert!(run_tick(&mut state).unwrap().settled);
    }
}
