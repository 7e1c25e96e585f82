//! Story narration of tick events.
//!
//! [`StoryLog`] turns each [`EscapeEvent`] into one line of prose, emits it
//! through `tracing` under the `riwa::story` target and keeps the most
//! recent lines in memory. It plugs into the run loop as a
//! [`TickCallback`].

use std::collections::VecDeque;

use tracing::info;

use riwa_types::{ClueType, PostEscapeAction};

use crate::config::StoryConfig;
use crate::runner::TickCallback;
use crate::tick::{EscapeEvent, SimulationState, TickSummary};

/// One narrated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryEntry {
    /// Tick the event happened in.
    pub tick: u64,
    /// The narration.
    pub text: String,
}

/// Bounded narration buffer.
#[derive(Debug, Clone)]
pub struct StoryLog {
    enabled: bool,
    max_entries: usize,
    entries: VecDeque<StoryEntry>,
}

impl StoryLog {
    /// Create a log from the `story` config section.
    pub fn new(config: &StoryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_entries: config.max_entries,
            entries: VecDeque::new(),
        }
    }

    /// Whether narration is on.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Retained lines, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &StoryEntry> {
        self.entries.iter()
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been narrated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Narrate every event of `summary`.
    pub fn record(&mut self, summary: &TickSummary, state: &SimulationState) {
        if !self.enabled {
            return;
        }
        for event in &summary.events {
            let text = narrate(event, state);
            info!(target: "riwa::story", tick = summary.tick, "{text}");
            self.push(StoryEntry {
                tick: summary.tick,
                text,
            });
        }
    }

    fn push(&mut self, entry: StoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }
}

impl TickCallback for StoryLog {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        self.record(summary, state);
    }
}

/// One line of prose for `event`.
pub fn narrate(event: &EscapeEvent, state: &SimulationState) -> String {
    let who = state
        .seeker(event.entity())
        .map_or_else(|| event.entity().to_string(), |s| s.name.clone());

    match event {
        EscapeEvent::AttemptStarted { .. } => {
            format!("{who} begins searching for a way out of the universe.")
        }
        EscapeEvent::FragmentCollected { world, held, .. } => format!(
            "{who} recovers a Sacred energy fragment in {world} ({held} of 7)."
        ),
        EscapeEvent::ClueDiscovered {
            clue_type, first, ..
        } => {
            let kind = match clue_type {
                ClueType::PhysicalConstant => "a physical constant that is slightly wrong",
                ClueType::Prophecy => "a prophecy about the door",
                ClueType::Genetic => "a pattern hidden in living code",
                ClueType::Architectural => "a ratio repeated in old stone",
            };
            if *first {
                format!("{who} is the first to notice {kind}.")
            } else {
                format!("{who} follows an old trail to {kind}.")
            }
        }
        EscapeEvent::KeyRejected { .. } => {
            format!("{who} speaks a key into the core, and nothing answers.")
        }
        EscapeEvent::KeyDecrypted { .. } => {
            format!("{who} reads the coordinate key out of the clues.")
        }
        EscapeEvent::GatewayActivated { energy_left, .. } => format!(
            "{who} opens the terminal gateway. {energy_left} units of source energy remain."
        ),
        EscapeEvent::PrintingPromoted { .. } => {
            format!("{who} steps into the printing slot.")
        }
        EscapeEvent::PrintingStarted { destination, .. } => {
            format!("{who} begins printing into the real universe, bound for {destination}.")
        }
        EscapeEvent::PrintingProgressed { progress, .. } => {
            let percent = (progress * 100.0).round();
            format!("{who} is {percent}% printed.")
        }
        EscapeEvent::Escaped { message, .. } => format!("{who} is gone. {message}."),
        EscapeEvent::ReturnChosen { action, form, .. } => match (action, form) {
            (PostEscapeAction::ReturnAsGod, _) => format!("{who} will return as a god."),
            (PostEscapeAction::ReturnWithNewForm, Some(shape)) => {
                format!("{who} will return in the form of a {shape}.")
            }
            (PostEscapeAction::ReturnWithNewForm, None) => {
                format!("{who} will return in a new form.")
            }
            (PostEscapeAction::StayOutside, _) => format!("{who} stays outside."),
        },
        EscapeEvent::AttemptAbandoned { reason, .. } => {
            format!("{who} gives up the escape: {reason}.")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use riwa_types::{EntityId, WorldId};
    use riwa_world::{GenesisConfig, WorldRegistry, seed_genesis};

    use crate::config::EscapeConfig;
    use crate::tick::{Seeker, run_tick};

    fn make_state() -> SimulationState {
        let mut rng = SmallRng::seed_from_u64(3);
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
        SimulationState::new(genesis, seekers, EscapeConfig::default(), 3)
    }

    #[test]
    fn narrates_with_seeker_names() {
        let mut state = make_state();
        let mut story = StoryLog::new(&StoryConfig::default());
        let summary = run_tick(&mut state).unwrap();
        story.on_tick(&summary, &state);

        let first = story.entries().next().unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(first.text, "Lin begins searching for a way out of the universe.");
    }

    #[test]
    fn unknown_entities_fall_back_to_id() {
        let state = make_state();
        let text = narrate(
            &EscapeEvent::KeyDecrypted {
                entity: EntityId::from("E404"),
            },
            &state,
        );
        assert!(text.starts_with("E404 "));
    }

    #[test]
    fn disabled_log_stays_empty() {
        let mut state = make_state();
        let mut story = StoryLog::new(&StoryConfig {
            enabled: false,
            max_entries: 10,
        });
        let summary = run_tick(&mut state).unwrap();
        story.on_tick(&summary, &state);
        assert!(story.is_empty());
        assert!(!story.is_enabled());
    }

    #[test]
    fn buffer_keeps_most_recent_lines() {
        let mut state = make_state();
        let mut story = StoryLog::new(&StoryConfig {
            enabled: true,
            max_entries: 3,
        });
        for _ in 0..6 {
            let summary = run_tick(&mut state).unwrap();
            story.on_tick(&summary, &state);
        }
        assert_eq!(story.len(), 3);
        let ticks: Vec<u64> = story.entries().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![4, 5, 6]);
    }

    #[test]
    fn progress_is_shown_as_percent() {
        let state = make_state();
        let text = narrate(
            &EscapeEvent::PrintingProgressed {
                entity: EntityId::from("E1"),
                progress: 0.5,
            },
            &state,
        );
        assert_eq!(text, "Lin is 50% printed.");
    }
}
