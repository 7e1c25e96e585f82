//! Universe genesis: the initial fragment catalog and key clue set.
//!
//! Genesis scatters energy fragments of every obtainable tier across the
//! registered worlds and hides coordinate key clues among them. It also
//! records the single `Absolute`-tier fragment, already depleted by the
//! act of creation. No later code path creates `Absolute` fragments.
//!
//! Given the same registry, configuration and RNG seed, genesis produces
//! the same catalog (timestamps aside).

use std::collections::BTreeMap;

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use riwa_ledger::UniverseState;
use riwa_types::{
    ClueType, CoordinateKeyFragment, Coordinates, EnergyFragment, EnergyTier, EntityId,
    FragmentId, GATEWAY_WORLD, GatewayLocation, KeyFragmentId, WorldId,
};

use crate::error::WorldError;
use crate::registry::WorldRegistry;

/// Collector recorded on the depleted genesis fragment.
pub const GENESIS_COLLECTOR: &str = "universe_genesis";

/// Half-width of the coordinate cube fragments are scattered in.
const WORLD_EXTENT: f64 = 500.0;

/// Genesis parameters, read from the `genesis` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenesisConfig {
    /// Energy allocated to the new cycle.
    #[serde(default = "default_energy_allocated")]
    pub energy_allocated: u64,
    /// `Common` fragments per world.
    #[serde(default = "default_common_per_world")]
    pub common_per_world: u32,
    /// `Rare` fragments per world.
    #[serde(default = "default_rare_per_world")]
    pub rare_per_world: u32,
    /// `Precious` fragments per world.
    #[serde(default = "default_precious_per_world")]
    pub precious_per_world: u32,
    /// `Legendary` fragments per world.
    #[serde(default = "default_legendary_per_world")]
    pub legendary_per_world: u32,
    /// `Sacred` fragments per world.
    #[serde(default = "default_sacred_per_world")]
    pub sacred_per_world: u32,
    /// Coordinate key clues hidden per world.
    #[serde(default = "default_key_clues_per_world")]
    pub key_clues_per_world: u32,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            energy_allocated: default_energy_allocated(),
            common_per_world: default_common_per_world(),
            rare_per_world: default_rare_per_world(),
            precious_per_world: default_precious_per_world(),
            legendary_per_world: default_legendary_per_world(),
            sacred_per_world: default_sacred_per_world(),
            key_clues_per_world: default_key_clues_per_world(),
        }
    }
}

const fn default_energy_allocated() -> u64 {
    riwa_ledger::ledger::DEFAULT_ENERGY_ALLOCATION
}

const fn default_common_per_world() -> u32 {
    12
}

const fn default_rare_per_world() -> u32 {
    6
}

const fn default_precious_per_world() -> u32 {
    3
}

const fn default_legendary_per_world() -> u32 {
    2
}

const fn default_sacred_per_world() -> u32 {
    12
}

const fn default_key_clues_per_world() -> u32 {
    4
}

impl GenesisConfig {
    /// Per-world fragment counts for every tier genesis scatters.
    const fn tier_counts(&self) -> [(EnergyTier, u32); 5] {
        [
            (EnergyTier::Common, self.common_per_world),
            (EnergyTier::Rare, self.rare_per_world),
            (EnergyTier::Precious, self.precious_per_world),
            (EnergyTier::Legendary, self.legendary_per_world),
            (EnergyTier::Sacred, self.sacred_per_world),
        ]
    }
}

/// Output of [`seed_genesis`].
#[derive(Debug, Clone)]
pub struct Genesis {
    /// The freshly seeded ledger.
    pub universe: UniverseState,
    /// Full clue records. Their ids are mirrored in the ledger's flat list.
    pub key_clues: Vec<CoordinateKeyFragment>,
}

/// Seed a new universe cycle across every registered world.
///
/// # Errors
///
/// Returns [`WorldError::EmptyRegistry`] if no worlds are registered, or
/// [`WorldError::Ledger`] if the catalog rejects a fragment.
pub fn seed_genesis(
    registry: &WorldRegistry,
    config: &GenesisConfig,
    rng: &mut impl Rng,
) -> Result<Genesis, WorldError> {
    if registry.is_empty() {
        return Err(WorldError::EmptyRegistry);
    }

    let mut universe = UniverseState::with_allocation(config.energy_allocated);
    universe.virtual_worlds_active = u32::try_from(registry.len()).unwrap_or(u32::MAX);

    let mut depleted = EnergyFragment::new(
        FragmentId::from("genesis:Omega_Absolute:000"),
        EnergyTier::Absolute,
        WorldId::from(GATEWAY_WORLD),
        Coordinates::ORIGIN,
    );
    depleted.discovered_by = Some(EntityId::from(GENESIS_COLLECTOR));
    depleted.collected_by = Some(EntityId::from(GENESIS_COLLECTOR));
    depleted.collected_at = Some(universe.creation_timestamp);
    universe.add_fragment(depleted)?;

    universe.escape_gateway_locations.push(GatewayLocation {
        world: WorldId::from(GATEWAY_WORLD),
        coordinates: Coordinates::ORIGIN,
    });

    let mut key_clues = Vec::new();
    for world in registry.worlds() {
        for (tier, count) in config.tier_counts() {
            for n in 1..=count {
                let id = FragmentId::new(format!("{}:{}:{n:03}", world.id, tier.as_str()));
                let fragment =
                    EnergyFragment::new(id, tier, world.id.clone(), scatter(rng));
                universe.add_fragment(fragment)?;
            }
        }

        for n in 1..=config.key_clues_per_world {
            let clue = hide_clue(&world.id, n, rng);
            universe.add_key_fragment_id(clue.fragment_id.clone());
            key_clues.push(clue);
        }
    }

    info!(
        worlds = registry.len(),
        fragments = universe.fragments().len(),
        key_clues = key_clues.len(),
        energy = universe.total_allocated(),
        "Genesis complete"
    );

    Ok(Genesis {
        universe,
        key_clues,
    })
}

/// A random position inside a world.
fn scatter(rng: &mut impl Rng) -> Coordinates {
    Coordinates::new(
        rng.random_range(-WORLD_EXTENT..WORLD_EXTENT),
        rng.random_range(-WORLD_EXTENT..WORLD_EXTENT),
        rng.random_range(-WORLD_EXTENT..WORLD_EXTENT),
    )
}

/// Build the `n`th clue hidden in `world`.
fn hide_clue(world: &WorldId, n: u32, rng: &mut impl Rng) -> CoordinateKeyFragment {
    let idx = usize::try_from(n)
        .unwrap_or(0)
        .checked_rem(ClueType::ALL.len())
        .unwrap_or(0);
    let clue_type = ClueType::ALL
        .get(idx)
        .copied()
        .unwrap_or(ClueType::Prophecy);

    let clue_value = match clue_type {
        ClueType::PhysicalConstant => {
            format!("alpha = 1/{:.6}", 137.035_999 + f64::from(n) * 1e-6)
        }
        ClueType::Prophecy => {
            format!("when {n} suns align, the door remembers its maker")
        }
        ClueType::Genetic => {
            let codons = ["ATG", "GCA", "TTC", "CGA", "TAG"];
            (0..4)
                .filter_map(|_| codons.get(rng.random_range(0..codons.len())))
                .copied()
                .collect::<Vec<_>>()
                .join("-")
        }
        ClueType::Architectural => format!("pillar ratio 1.618:{n}"),
    };

    let mut discovery_requirements = BTreeMap::new();
    discovery_requirements.insert(
        "visit_world".to_owned(),
        serde_json::Value::from(world.as_str()),
    );
    discovery_requirements.insert(
        "min_ticks_in_world".to_owned(),
        serde_json::Value::from(n),
    );

    CoordinateKeyFragment {
        fragment_id: KeyFragmentId::new(format!("clue:{world}:{n:02}")),
        hidden_in_world: world.clone(),
        clue_type,
        clue_value,
        discovery_requirements,
        discovered_at: None,
        discovered_by: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn seeded() -> Genesis {
        let mut rng = SmallRng::seed_from_u64(42);
        let registry = WorldRegistry::with_default_worlds();
        match seed_genesis(&registry, &GenesisConfig::default(), &mut rng) {
            Ok(genesis) => genesis,
            Err(e) => panic!("genesis failed: {e}"),
        }
    }

    #[test]
    fn empty_registry_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = seed_genesis(&WorldRegistry::new(), &GenesisConfig::default(), &mut rng);
        assert!(matches!(result, Err(WorldError::EmptyRegistry)));
    }

    #[test]
    fn every_world_gets_sacred_fragments() {
        let genesis = seeded();
        for world in ["cyberpunk_city", "ancient_dynasty"] {
            let sacred = genesis
                .universe
                .fragments()
                .iter()
                .filter(|f| f.tier == EnergyTier::Sacred && f.location_world.as_str() == world)
                .count();
            assert_eq!(sacred, 12);
        }
    }

    #[test]
    fn exactly_one_absolute_fragment_and_it_is_depleted() {
        let genesis = seeded();
        let absolute: Vec<_> = genesis
            .universe
            .fragments()
            .iter()
            .filter(|f| f.tier == EnergyTier::Absolute)
            .collect();
        assert_eq!(absolute.len(), 1);
        assert!(absolute.iter().all(|f| f.is_collected()));
        assert_eq!(genesis.universe.uncollected(EnergyTier::Absolute).count(), 0);
    }

    #[test]
    fn clue_ids_are_mirrored_in_ledger() {
        let genesis = seeded();
        assert_eq!(genesis.key_clues.len(), 8);
        for clue in &genesis.key_clues {
            assert!(genesis.universe.has_key_fragment(&clue.fragment_id));
            assert!(!clue.is_discovered());
        }
    }

    #[test]
    fn seeded_catalog_passes_audit() {
        let genesis = seeded();
        assert_eq!(genesis.universe.audit(), Ok(()));
        assert_eq!(genesis.universe.virtual_worlds_active, 2);
        assert_eq!(genesis.universe.total_allocated(), 1_000_000);
    }

    #[test]
    fn same_seed_same_catalog() {
        let a = seeded();
        let b = seeded();
        let ids_a: Vec<_> = a.universe.fragments().iter().map(|f| f.id.clone()).collect();
        let ids_b: Vec<_> = b.universe.fragments().iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        let coords_a: Vec<_> = a.universe.fragments().iter().map(|f| f.location_coordinates).collect();
        let coords_b: Vec<_> = b.universe.fragments().iter().map(|f| f.location_coordinates).collect();
        assert_eq!(coords_a, coords_b);
    }

    #[test]
    fn config_defaults_apply_to_missing_keys() {
        let config: GenesisConfig = serde_json::from_str(r#"{"sacred_per_world": 9}"#).unwrap();
        assert_eq!(config.sacred_per_world, 9);
        assert_eq!(config.key_clues_per_world, 4);
        assert_eq!(config.energy_allocated, 1_000_000);
    }
}
