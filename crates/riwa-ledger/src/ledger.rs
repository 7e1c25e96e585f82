//! The universe ledger: energy counters, fragment catalog and escape
//! bookkeeping for one universe cycle.
//!
//! # Design
//!
//! - **Monotonic**: `source_energy_consumed` only grows.
//! - **Atomic debits**: [`UniverseState::consume_energy`] checks and
//!   consumes in one step, or does nothing.
//! - **Append-only catalog**: fragments are added at genesis and never
//!   removed; only their attribution fields change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use riwa_types::{
    EnergyFragment, EnergyTier, EntityId, FragmentId, GatewayLocation, KeyFragmentId, StarData,
    UniverseMigrationPlan,
};

use crate::LedgerError;

/// Default universe identity.
pub const DEFAULT_UNIVERSE_ID: &str = "RIWA2-Metaverse-001";

/// Default universe generation.
pub const DEFAULT_CYCLE_NUMBER: u64 = 8374;

/// Default energy allocation, in Sacred-tier equivalents.
pub const DEFAULT_ENERGY_ALLOCATION: u64 = 1_000_000;

/// Default number of Sacred fragments needed for one escape.
pub const DEFAULT_ESCAPE_KEYS_NEEDED: usize = 7;

/// Default number of active virtual worlds.
pub const DEFAULT_VIRTUAL_WORLDS: u32 = 2;

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Outcome of [`UniverseState::check_escape_readiness`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeReadiness {
    /// Whether the entity may attempt escape.
    pub ready: bool,
    /// Human-readable explanation.
    pub reason: String,
}

impl core::fmt::Display for EscapeReadiness {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.reason)
    }
}

// ---------------------------------------------------------------------------
// UniverseState
// ---------------------------------------------------------------------------

/// Global state and resource ledger of one universe cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseState {
    /// Universe identity.
    #[serde(default = "default_universe_id")]
    pub universe_id: String,
    /// Current universe generation.
    #[serde(default = "default_cycle_number")]
    pub cycle_number: u64,
    /// When this cycle began.
    #[serde(default = "Utc::now")]
    pub creation_timestamp: DateTime<Utc>,

    /// Star hosting the universe core.
    pub current_star: StarData,
    /// Plan for moving the core to the next star.
    pub migration_plan: UniverseMigrationPlan,

    #[serde(default = "default_energy_allocation")]
    total_source_energy_allocated: u64,
    #[serde(default)]
    source_energy_consumed: u64,
    #[serde(default)]
    source_energy_fragments: Vec<EnergyFragment>,

    /// Known gateway positions across worlds.
    #[serde(default)]
    pub escape_gateway_locations: Vec<GatewayLocation>,
    #[serde(default)]
    entities_escaped: Vec<EntityId>,
    /// Sacred fragments one escape requires.
    #[serde(default = "default_escape_keys_needed")]
    pub escape_keys_needed: usize,
    #[serde(default)]
    coordinate_key_fragments: Vec<KeyFragmentId>,

    /// Number of virtual worlds running.
    #[serde(default = "default_virtual_worlds")]
    pub virtual_worlds_active: u32,
}

fn default_universe_id() -> String {
    DEFAULT_UNIVERSE_ID.to_owned()
}

const fn default_cycle_number() -> u64 {
    DEFAULT_CYCLE_NUMBER
}

const fn default_energy_allocation() -> u64 {
    DEFAULT_ENERGY_ALLOCATION
}

const fn default_escape_keys_needed() -> usize {
    DEFAULT_ESCAPE_KEYS_NEEDED
}

const fn default_virtual_worlds() -> u32 {
    DEFAULT_VIRTUAL_WORLDS
}

impl Default for UniverseState {
    fn default() -> Self {
        Self::with_allocation(DEFAULT_ENERGY_ALLOCATION)
    }
}

impl UniverseState {
    /// Create a fresh universe with the default allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh universe with `total` units of energy allocated.
    pub fn with_allocation(total: u64) -> Self {
        Self {
            universe_id: default_universe_id(),
            cycle_number: DEFAULT_CYCLE_NUMBER,
            creation_timestamp: Utc::now(),
            current_star: StarData::sol(),
            migration_plan: UniverseMigrationPlan::default(),
            total_source_energy_allocated: total,
            source_energy_consumed: 0,
            source_energy_fragments: Vec::new(),
            escape_gateway_locations: Vec::new(),
            entities_escaped: Vec::new(),
            escape_keys_needed: DEFAULT_ESCAPE_KEYS_NEEDED,
            coordinate_key_fragments: Vec::new(),
            virtual_worlds_active: DEFAULT_VIRTUAL_WORLDS,
        }
    }

    // -----------------------------------------------------------------------
    // Energy
    // -----------------------------------------------------------------------

    /// Total energy allocated to this cycle.
    pub const fn total_allocated(&self) -> u64 {
        self.total_source_energy_allocated
    }

    /// Energy consumed so far.
    pub const fn consumed(&self) -> u64 {
        self.source_energy_consumed
    }

    /// Energy still available: `allocated - consumed`.
    pub const fn available_energy(&self) -> u64 {
        self.total_source_energy_allocated
            .saturating_sub(self.source_energy_consumed)
    }

    /// Debit `amount` units of energy if that many are available.
    ///
    /// Returns `false` and leaves the counters untouched when the debit
    /// does not fit.
    pub fn consume_energy(&mut self, amount: u64) -> bool {
        let available = self.available_energy();
        if available < amount {
            debug!(amount, available, "energy debit refused");
            return false;
        }
        // available >= amount, so consumed + amount <= allocated.
        self.source_energy_consumed = self.source_energy_consumed.saturating_add(amount);
        debug!(
            amount,
            consumed = self.source_energy_consumed,
            "energy debited"
        );
        true
    }

    // -----------------------------------------------------------------------
    // Fragment catalog
    // -----------------------------------------------------------------------

    /// All fragments in catalog order.
    pub fn fragments(&self) -> &[EnergyFragment] {
        &self.source_energy_fragments
    }

    /// Look up a fragment by id.
    pub fn fragment(&self, id: &FragmentId) -> Option<&EnergyFragment> {
        self.source_energy_fragments.iter().find(|f| &f.id == id)
    }

    /// Add a fragment to the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateFragment`] if the id is taken.
    pub fn add_fragment(&mut self, fragment: EnergyFragment) -> Result<(), LedgerError> {
        if self.fragment(&fragment.id).is_some() {
            return Err(LedgerError::DuplicateFragment(fragment.id));
        }
        self.source_energy_fragments.push(fragment);
        Ok(())
    }

    /// Stamp `collector` as the collector of a fragment.
    ///
    /// Returns the fragment's tier, or `None` if the id is unknown. A
    /// fragment collected again is re-attributed to the newer collector.
    pub fn mark_collected(
        &mut self,
        id: &FragmentId,
        collector: &EntityId,
        at: DateTime<Utc>,
    ) -> Option<EnergyTier> {
        let fragment = self
            .source_energy_fragments
            .iter_mut()
            .find(|f| &f.id == id)?;

        if let Some(previous) = fragment.collected_by.as_ref().filter(|p| *p != collector) {
            warn!(
                fragment = %id,
                previous = %previous,
                collector = %collector,
                "fragment re-attributed to a new collector"
            );
        }
        fragment.collected_by = Some(collector.clone());
        fragment.collected_at = Some(at);
        Some(fragment.tier)
    }

    /// Record the first discoverer of a fragment.
    ///
    /// Returns `false` if the id is unknown or a discoverer is already
    /// recorded.
    pub fn mark_discovered(&mut self, id: &FragmentId, discoverer: &EntityId) -> bool {
        match self.source_energy_fragments.iter_mut().find(|f| &f.id == id) {
            Some(fragment) if fragment.discovered_by.is_none() => {
                fragment.discovered_by = Some(discoverer.clone());
                true
            }
            _ => false,
        }
    }

    /// Number of `tier` fragments currently attributed to `entity`.
    pub fn fragments_collected_by(&self, entity: &EntityId, tier: EnergyTier) -> usize {
        self.source_energy_fragments
            .iter()
            .filter(|f| f.tier == tier && f.is_collected_by(entity))
            .count()
    }

    /// Fragments of `tier` nobody has collected yet.
    pub fn uncollected(&self, tier: EnergyTier) -> impl Iterator<Item = &EnergyFragment> {
        self.source_energy_fragments
            .iter()
            .filter(move |f| f.tier == tier && !f.is_collected())
    }

    // -----------------------------------------------------------------------
    // Coordinate key clues
    // -----------------------------------------------------------------------

    /// The flat list of clue identities.
    pub fn key_fragment_ids(&self) -> &[KeyFragmentId] {
        &self.coordinate_key_fragments
    }

    /// Register a clue identity. Duplicates are ignored.
    pub fn add_key_fragment_id(&mut self, id: KeyFragmentId) {
        if !self.coordinate_key_fragments.contains(&id) {
            self.coordinate_key_fragments.push(id);
        }
    }

    /// Whether `id` is a registered clue identity.
    pub fn has_key_fragment(&self, id: &KeyFragmentId) -> bool {
        self.coordinate_key_fragments.contains(id)
    }

    // -----------------------------------------------------------------------
    // Escapes
    // -----------------------------------------------------------------------

    /// Entities that escaped this cycle, in escape order.
    pub fn entities_escaped(&self) -> &[EntityId] {
        &self.entities_escaped
    }

    /// Record that `entity` escaped.
    pub fn record_escape(&mut self, entity: EntityId) {
        self.entities_escaped.push(entity);
    }

    /// Whether an entity holds enough Sacred fragments and the key.
    ///
    /// The key check tests whether the entity id itself appears in the
    /// clue list, which holds clue identities rather than entity
    /// identities. It only passes on an id collision.
    pub fn check_escape_readiness(&self, entity: &EntityId) -> EscapeReadiness {
        let held = self.fragments_collected_by(entity, EnergyTier::Sacred);
        let has_fragments = held >= self.escape_keys_needed;
        let has_key = self
            .coordinate_key_fragments
            .iter()
            .any(|clue| clue.as_str() == entity.as_str());

        if has_fragments && has_key {
            return EscapeReadiness {
                ready: true,
                reason: "Ready for escape".to_owned(),
            };
        }

        let reason = if has_fragments {
            "Key coordinates incomplete".to_owned()
        } else {
            let missing = self.escape_keys_needed.saturating_sub(held);
            format!("Missing: {missing} fragments")
        };
        EscapeReadiness {
            ready: false,
            reason,
        }
    }

    /// Verify the ledger's integrity invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`LedgerError`] found.
    pub fn audit(&self) -> Result<(), LedgerError> {
        crate::audit::audit(
            self.total_source_energy_allocated,
            self.source_energy_consumed,
            &self.source_energy_fragments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riwa_types::{Coordinates, WorldId};

    fn fragment(id: &str, tier: EnergyTier) -> EnergyFragment {
        EnergyFragment::new(
            FragmentId::from(id),
            tier,
            WorldId::from("cyberpunk_city"),
            Coordinates::ORIGIN,
        )
    }

    fn universe_with_sacred(count: usize) -> UniverseState {
        let mut universe = UniverseState::new();
        for i in 0..count {
            let _ = universe.add_fragment(fragment(&format!("sacred-{i}"), EnergyTier::Sacred));
        }
        universe
    }

    #[test]
    fn consume_within_allocation() {
        let mut universe = UniverseState::with_allocation(10);
        assert!(universe.consume_energy(7));
        assert_eq!(universe.consumed(), 7);
        assert_eq!(universe.available_energy(), 3);
    }

    #[test]
    fn refused_debit_leaves_counters_unchanged() {
        let mut universe = UniverseState::with_allocation(10);
        assert!(universe.consume_energy(7));
        assert!(!universe.consume_energy(7));
        assert_eq!(universe.consumed(), 7);
    }

    #[test]
    fn consumption_never_exceeds_allocation() {
        let mut universe = UniverseState::with_allocation(20);
        for amount in [3, 9, 5, 11, 2, 1, 8] {
            let _ = universe.consume_energy(amount);
            assert!(universe.consumed() <= universe.total_allocated());
        }
        assert_eq!(universe.consumed(), 20);
    }

    #[test]
    fn exact_drain_is_allowed() {
        let mut universe = UniverseState::with_allocation(7);
        assert!(universe.consume_energy(7));
        assert_eq!(universe.available_energy(), 0);
        assert!(universe.consume_energy(0));
        assert!(!universe.consume_energy(1));
    }

    #[test]
    fn duplicate_fragment_rejected() {
        let mut universe = UniverseState::new();
        assert!(universe.add_fragment(fragment("f1", EnergyTier::Rare)).is_ok());
        assert_eq!(
            universe.add_fragment(fragment("f1", EnergyTier::Sacred)),
            Err(LedgerError::DuplicateFragment(FragmentId::from("f1"))),
        );
        assert_eq!(universe.fragments().len(), 1);
    }

    #[test]
    fn mark_collected_stamps_attribution() {
        let mut universe = universe_with_sacred(1);
        let id = FragmentId::from("sacred-0");
        let entity = EntityId::from("E1");

        let tier = universe.mark_collected(&id, &entity, Utc::now());
        assert_eq!(tier, Some(EnergyTier::Sacred));

        let stored = universe.fragment(&id);
        assert_eq!(stored.and_then(|f| f.collected_by.clone()), Some(entity));
        assert!(stored.and_then(|f| f.collected_at).is_some());
    }

    #[test]
    fn mark_collected_unknown_fragment() {
        let mut universe = UniverseState::new();
        let tier = universe.mark_collected(
            &FragmentId::from("ghost"),
            &EntityId::from("E1"),
            Utc::now(),
        );
        assert_eq!(tier, None);
    }

    #[test]
    fn discovery_is_write_once() {
        let mut universe = universe_with_sacred(1);
        let id = FragmentId::from("sacred-0");
        assert!(universe.mark_discovered(&id, &EntityId::from("E1")));
        assert!(!universe.mark_discovered(&id, &EntityId::from("E2")));
        assert_eq!(
            universe.fragment(&id).and_then(|f| f.discovered_by.clone()),
            Some(EntityId::from("E1")),
        );
    }

    #[test]
    fn readiness_reports_fragment_shortfall() {
        let mut universe = universe_with_sacred(7);
        let entity = EntityId::from("E1");
        for i in 0..3 {
            let _ = universe.mark_collected(
                &FragmentId::new(format!("sacred-{i}")),
                &entity,
                Utc::now(),
            );
        }
        // The key check would pass on its own.
        universe.add_key_fragment_id(KeyFragmentId::from("E1"));

        let readiness = universe.check_escape_readiness(&entity);
        assert!(!readiness.ready);
        assert_eq!(readiness.reason, "Missing: 4 fragments");
    }

    #[test]
    fn readiness_reports_incomplete_key() {
        let mut universe = universe_with_sacred(7);
        let entity = EntityId::from("E1");
        for i in 0..7 {
            let _ = universe.mark_collected(
                &FragmentId::new(format!("sacred-{i}")),
                &entity,
                Utc::now(),
            );
        }
        universe.add_key_fragment_id(KeyFragmentId::from("clue-1"));

        let readiness = universe.check_escape_readiness(&entity);
        assert!(!readiness.ready);
        assert_eq!(readiness.reason, "Key coordinates incomplete");
    }

    #[test]
    fn readiness_passes_only_on_id_collision() {
        let mut universe = universe_with_sacred(7);
        let entity = EntityId::from("E1");
        for i in 0..7 {
            let _ = universe.mark_collected(
                &FragmentId::new(format!("sacred-{i}")),
                &entity,
                Utc::now(),
            );
        }
        universe.add_key_fragment_id(KeyFragmentId::from("E1"));

        let readiness = universe.check_escape_readiness(&entity);
        assert!(readiness.ready);
        assert_eq!(readiness.to_string(), "Ready for escape");
    }

    #[test]
    fn rare_fragments_do_not_count_toward_readiness() {
        let mut universe = UniverseState::new();
        let entity = EntityId::from("E1");
        for i in 0..7 {
            let id = format!("rare-{i}");
            let _ = universe.add_fragment(fragment(&id, EnergyTier::Rare));
            let _ = universe.mark_collected(&FragmentId::new(id), &entity, Utc::now());
        }
        assert_eq!(universe.fragments_collected_by(&entity, EnergyTier::Sacred), 0);
        assert_eq!(universe.check_escape_readiness(&entity).reason, "Missing: 7 fragments");
    }

    #[test]
    fn key_fragment_ids_are_deduplicated() {
        let mut universe = UniverseState::new();
        universe.add_key_fragment_id(KeyFragmentId::from("clue-1"));
        universe.add_key_fragment_id(KeyFragmentId::from("clue-1"));
        assert_eq!(universe.key_fragment_ids().len(), 1);
        assert!(universe.has_key_fragment(&KeyFragmentId::from("clue-1")));
        assert!(!universe.has_key_fragment(&KeyFragmentId::from("clue-2")));
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let mut universe = universe_with_sacred(2);
        let _ = universe.consume_energy(42);
        let _ = universe.mark_collected(
            &FragmentId::from("sacred-1"),
            &EntityId::from("E9"),
            Utc::now(),
        );
        universe.add_key_fragment_id(KeyFragmentId::from("clue-1"));
        universe.record_escape(EntityId::from("E3"));

        let json = serde_json::to_string(&universe).unwrap_or_default();
        let back: Option<UniverseState> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(universe));
    }

    #[test]
    fn missing_numeric_fields_use_defaults() {
        let mut json = serde_json::to_value(UniverseState::new()).unwrap_or_default();
        if let Some(map) = json.as_object_mut() {
            map.remove("escape_keys_needed");
            map.remove("total_source_energy_allocated");
            map.remove("cycle_number");
            map.remove("source_energy_fragments");
        }
        let back: Option<UniverseState> = serde_json::from_value(json).ok();
        assert_eq!(back.as_ref().map(|u| u.escape_keys_needed), Some(7));
        assert_eq!(back.as_ref().map(UniverseState::total_allocated), Some(1_000_000));
        assert_eq!(back.as_ref().map(|u| u.cycle_number), Some(8374));
        assert_eq!(back.map(|u| u.fragments().len()), Some(0));
    }

    #[test]
    fn missing_star_data_is_a_load_error() {
        let mut json = serde_json::to_value(UniverseState::new()).unwrap_or_default();
        if let Some(map) = json.as_object_mut() {
            map.remove("current_star");
        }
        assert!(serde_json::from_value::<UniverseState>(json).is_err());
    }
}
