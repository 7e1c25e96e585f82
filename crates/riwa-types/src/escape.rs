//! Escape records: the terminal gateway, per-entity attempts and the
//! read-only progress projection.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{EscapeStatus, PostEscapeAction};
use crate::ids::{AttemptId, EntityId, FragmentId, GatewayId, KeyFragmentId, WorldId};
use crate::structs::Coordinates;

/// Sacred-tier fragments required to activate the gateway.
pub const SACRED_FRAGMENTS_REQUIRED: usize = 7;

/// Energy debited from the ledger when the gateway activates.
pub const DEFAULT_GATEWAY_ENERGY_COST: u64 = 7;

/// Default world hosting the terminal gateway.
pub const GATEWAY_WORLD: &str = "universe_singularity";

// ---------------------------------------------------------------------------
// Terminal gateway
// ---------------------------------------------------------------------------

/// The single portal through which entities are printed out of the
/// universe.
///
/// At most one gateway exists per universe. When `is_active` is true,
/// `activated_by_entity` is set. `printing_progress` is only meaningful
/// while `current_printing_entity` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalGateway {
    /// Gateway identity.
    #[serde(default)]
    pub gateway_id: GatewayId,
    /// World hosting the gateway.
    #[serde(default = "default_gateway_world")]
    pub location_world: WorldId,
    /// Position of the gateway inside its world.
    #[serde(default)]
    pub location_coordinates: Coordinates,
    /// Whether the gateway has been opened this cycle.
    #[serde(default)]
    pub is_active: bool,
    /// When the gateway was opened.
    #[serde(default)]
    pub activation_time: Option<DateTime<Utc>>,
    /// Entity that opened the gateway.
    #[serde(default)]
    pub activated_by_entity: Option<EntityId>,
    /// Energy debited on activation.
    #[serde(default = "default_energy_cost")]
    pub source_energy_cost: u64,
    /// Entities that can print at once.
    #[serde(default = "default_printing_capacity")]
    pub printing_capacity: u32,
    /// Entities waiting to print, front first.
    #[serde(default)]
    pub entities_in_queue: VecDeque<EntityId>,
    /// Entity occupying the printing slot.
    #[serde(default)]
    pub current_printing_entity: Option<EntityId>,
    /// Printing progress from 0.0 to 1.0.
    #[serde(default)]
    pub printing_progress: f64,
}

fn default_gateway_world() -> WorldId {
    WorldId::from(GATEWAY_WORLD)
}

const fn default_energy_cost() -> u64 {
    DEFAULT_GATEWAY_ENERGY_COST
}

const fn default_printing_capacity() -> u32 {
    1
}

impl Default for TerminalGateway {
    fn default() -> Self {
        Self {
            gateway_id: GatewayId::new(),
            location_world: default_gateway_world(),
            location_coordinates: Coordinates::ORIGIN,
            is_active: false,
            activation_time: None,
            activated_by_entity: None,
            source_energy_cost: DEFAULT_GATEWAY_ENERGY_COST,
            printing_capacity: default_printing_capacity(),
            entities_in_queue: VecDeque::new(),
            current_printing_entity: None,
            printing_progress: 0.0,
        }
    }
}

impl TerminalGateway {
    /// Whether `entity` occupies the printing slot.
    pub fn is_printing(&self, entity: &EntityId) -> bool {
        self.current_printing_entity.as_ref() == Some(entity)
    }

    /// Whether `entity` is waiting in the queue.
    pub fn is_queued(&self, entity: &EntityId) -> bool {
        self.entities_in_queue.contains(entity)
    }

    /// Remove every occurrence of `entity` from the queue.
    pub fn dequeue(&mut self, entity: &EntityId) {
        self.entities_in_queue.retain(|queued| queued != entity);
    }

    /// Move the queue front into the empty printing slot.
    ///
    /// Returns the promoted entity, or `None` when the gateway is closed,
    /// the slot is occupied or nobody is waiting.
    pub fn promote_next(&mut self) -> Option<EntityId> {
        if !self.is_active || self.current_printing_entity.is_some() {
            return None;
        }
        let next = self.entities_in_queue.pop_front()?;
        self.current_printing_entity = Some(next.clone());
        self.printing_progress = 0.0;
        Some(next)
    }

    /// Empty the printing slot and reset progress.
    pub fn clear_printing_slot(&mut self) {
        self.current_printing_entity = None;
        self.printing_progress = 0.0;
    }

    /// First broken gateway invariant, if any.
    ///
    /// ```text
    /// is_active                        =>  activated_by_entity is set
    /// current_printing_entity is set   =>  is_active
    /// 0.0 <= printing_progress <= 1.0
    /// ```
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.is_active && self.activated_by_entity.is_none() {
            return Some("gateway is active but has no activating entity");
        }
        if !self.is_active && self.current_printing_entity.is_some() {
            return Some("gateway is closed but an entity holds the printing slot");
        }
        if !(0.0..=1.0).contains(&self.printing_progress) {
            return Some("printing progress is outside [0, 1]");
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Escape attempts
// ---------------------------------------------------------------------------

/// One entity's attempt to escape the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscapeAttempt {
    /// Attempt identity.
    #[serde(default)]
    pub attempt_id: AttemptId,
    /// Entity making the attempt.
    pub entity_id: EntityId,
    /// Display name of that entity.
    pub entity_name: String,
    /// When the attempt was created.
    #[serde(default = "Utc::now")]
    pub start_time: DateTime<Utc>,

    /// Current stage.
    #[serde(default)]
    pub status: EscapeStatus,

    /// Sacred-tier fragments collected during this attempt.
    #[serde(default, rename = "collected_a_level_fragments")]
    pub collected_sacred_fragments: Vec<FragmentId>,
    /// Coordinate key clues discovered during this attempt.
    #[serde(default)]
    pub discovered_key_fragments: Vec<KeyFragmentId>,
    /// The verified coordinate key.
    #[serde(default)]
    pub final_coordinate_key: Option<String>,

    /// Gateway this attempt opened.
    #[serde(default)]
    pub gateway_id: Option<GatewayId>,
    /// When that gateway opened.
    #[serde(default)]
    pub gateway_activation_time: Option<DateTime<Utc>>,

    /// When printing began.
    #[serde(default)]
    pub printing_start_time: Option<DateTime<Utc>>,
    /// When printing finished.
    #[serde(default)]
    pub printing_complete_time: Option<DateTime<Utc>>,
    /// Real-universe location the entity is printed to.
    #[serde(default)]
    pub printing_destination: Option<String>,

    /// Whether the entity escaped.
    #[serde(default)]
    pub success: bool,
    /// Outcome description.
    #[serde(default)]
    pub result_message: String,

    /// Disposition chosen after escaping.
    #[serde(default)]
    pub post_escape_action: Option<PostEscapeAction>,
    /// Free-form description of the chosen new form.
    #[serde(default)]
    pub new_form_chosen: Option<BTreeMap<String, serde_json::Value>>,
}

impl EscapeAttempt {
    /// Create a fresh attempt in [`EscapeStatus::NotStarted`].
    pub fn new(entity_id: EntityId, entity_name: impl Into<String>) -> Self {
        Self {
            attempt_id: AttemptId::new(),
            entity_id,
            entity_name: entity_name.into(),
            start_time: Utc::now(),
            status: EscapeStatus::NotStarted,
            collected_sacred_fragments: Vec::new(),
            discovered_key_fragments: Vec::new(),
            final_coordinate_key: None,
            gateway_id: None,
            gateway_activation_time: None,
            printing_start_time: None,
            printing_complete_time: None,
            printing_destination: None,
            success: false,
            result_message: String::new(),
            post_escape_action: None,
            new_form_chosen: None,
        }
    }

    /// Move to `next` if that keeps the status monotonic.
    ///
    /// Returns `false` and leaves the status unchanged otherwise.
    pub fn advance_to(&mut self, next: EscapeStatus) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Number of Sacred-tier fragments held by this attempt.
    pub fn sacred_count(&self) -> usize {
        self.collected_sacred_fragments.len()
    }

    /// Whether the attempt can still change.
    pub const fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Progress projection
// ---------------------------------------------------------------------------

/// Read-only snapshot of an entity's escape progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeProgress {
    /// Current stage.
    pub status: EscapeStatus,
    /// Sacred-tier fragments collected.
    pub fragments_collected: usize,
    /// Sacred-tier fragments needed to open the gateway.
    pub fragments_needed: usize,
    /// Key clues discovered.
    pub key_fragments_discovered: usize,
    /// Whether a verified coordinate key is held.
    pub has_coordinate_key: bool,
    /// Whether the gateway is active and was opened by this entity.
    pub gateway_active: bool,
    /// Whether the entity escaped.
    pub success: bool,
}
