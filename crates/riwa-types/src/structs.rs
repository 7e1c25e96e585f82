//! Resource and cosmic records: fragments, key clues, stars and the
//! migration plan.
//!
//! All records persist as nested JSON objects. Optional attribution fields
//! default to `None` when absent; everything else is required.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ClueType, EnergyTier};
use crate::ids::{EntityId, FragmentId, KeyFragmentId, WorldId};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A position inside a world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// East-west axis.
    pub x: f64,
    /// North-south axis.
    pub y: f64,
    /// Vertical axis.
    pub z: f64,
}

impl Coordinates {
    /// The world origin.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a new coordinate triple.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Energy fragments
// ---------------------------------------------------------------------------

/// A discoverable unit of source energy.
///
/// Fragments are created at genesis and never deleted. Only the
/// attribution fields change afterwards, and only through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyFragment {
    /// Catalog identity.
    pub id: FragmentId,
    /// Scarcity tier.
    #[serde(rename = "level")]
    pub tier: EnergyTier,
    /// World the fragment lies in.
    pub location_world: WorldId,
    /// Position inside that world.
    pub location_coordinates: Coordinates,
    /// Entity that first discovered the fragment.
    #[serde(default)]
    pub discovered_by: Option<EntityId>,
    /// Entity that last collected the fragment.
    #[serde(default)]
    pub collected_by: Option<EntityId>,
    /// When it was collected.
    #[serde(default, rename = "collection_timestamp")]
    pub collected_at: Option<DateTime<Utc>>,
}

impl EnergyFragment {
    /// Create an undiscovered, uncollected fragment.
    pub const fn new(
        id: FragmentId,
        tier: EnergyTier,
        location_world: WorldId,
        location_coordinates: Coordinates,
    ) -> Self {
        Self {
            id,
            tier,
            location_world,
            location_coordinates,
            discovered_by: None,
            collected_by: None,
            collected_at: None,
        }
    }

    /// Whether some entity has collected this fragment.
    pub const fn is_collected(&self) -> bool {
        self.collected_by.is_some()
    }

    /// Whether this fragment was collected by `entity`.
    pub fn is_collected_by(&self, entity: &EntityId) -> bool {
        self.collected_by.as_ref() == Some(entity)
    }
}

// ---------------------------------------------------------------------------
// Coordinate key clues
// ---------------------------------------------------------------------------

/// A clue toward the coordinate key, hidden somewhere in a world.
///
/// The discovery fields are written once, when the clue is first found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateKeyFragment {
    /// Clue identity. Mirrored into the ledger's flat key list.
    pub fragment_id: KeyFragmentId,
    /// World that hides the clue.
    pub hidden_in_world: WorldId,
    /// Category of hiding place.
    pub clue_type: ClueType,
    /// The data carried by the clue.
    pub clue_value: String,
    /// What an entity must do to unlock the clue.
    pub discovery_requirements: BTreeMap<String, serde_json::Value>,
    /// When it was discovered.
    #[serde(default)]
    pub discovered_at: Option<DateTime<Utc>>,
    /// Who discovered it.
    #[serde(default)]
    pub discovered_by: Option<EntityId>,
}

impl CoordinateKeyFragment {
    /// Whether the clue has been discovered.
    pub const fn is_discovered(&self) -> bool {
        self.discovered_by.is_some()
    }

    /// Record the discoverer if none is recorded yet.
    ///
    /// Returns `false` and leaves the record unchanged when the clue was
    /// already discovered.
    pub fn mark_discovered(&mut self, entity: &EntityId, at: DateTime<Utc>) -> bool {
        if self.is_discovered() {
            return false;
        }
        self.discovered_by = Some(entity.clone());
        self.discovered_at = Some(at);
        true
    }
}

// ---------------------------------------------------------------------------
// Stellar infrastructure
// ---------------------------------------------------------------------------

/// Physical parameters of the star hosting the universe core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarData {
    /// Display name, e.g. `Sol-001`.
    pub name: String,
    /// Catalog identity.
    pub catalog_id: String,
    /// Years until the star dies.
    pub lifespan_remaining_years: f64,
    /// Theoretical energy output.
    pub fusion_power_output_watts: f64,
    /// Shield integrity from 0.0 to 1.0.
    pub protection_shield_status: f64,
    /// Whether the high-dimensional cloak is up.
    pub cloaking_field_active: bool,
}

impl StarData {
    /// The star the universe core orbits at genesis.
    pub fn sol() -> Self {
        Self {
            name: "Sol-001".to_owned(),
            catalog_id: "SOL_001".to_owned(),
            lifespan_remaining_years: 4.5e9,
            fusion_power_output_watts: 3.828e26,
            protection_shield_status: 0.98,
            cloaking_field_active: true,
        }
    }
}

/// Schedule for moving the universe core to the next star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseMigrationPlan {
    /// Star currently hosting the core.
    pub current_star: StarData,
    /// Destination star.
    pub next_star_name: String,
    /// Distance to the destination in light years.
    pub next_star_distance_ly: f64,
    /// Replica units already waiting at the destination.
    pub replication_units_deployed: u32,
    /// Cosmic year the migration is expected.
    pub estimated_migration_year: u64,
    /// Whether migration has begun.
    #[serde(default)]
    pub migration_in_progress: bool,
}

impl Default for UniverseMigrationPlan {
    fn default() -> Self {
        Self {
            current_star: StarData::sol(),
            next_star_name: "Proxima Centauri".to_owned(),
            next_star_distance_ly: 4.24,
            replication_units_deployed: 3,
            estimated_migration_year: 3_200_000_000,
            migration_in_progress: false,
        }
    }
}

/// A known position of a terminal gateway within a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayLocation {
    /// World containing the gateway.
    pub world: WorldId,
    /// Position inside that world.
    pub coordinates: Coordinates,
}
