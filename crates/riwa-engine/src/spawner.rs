//! Seeker spawner for a new universe cycle.
//!
//! At the start of a fresh cycle the spawner creates N seekers with
//! unique names, all placed in the configured starting world.

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use riwa_core::tick::Seeker;
use riwa_types::{EntityId, WorldId};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the seeker spawner, read from the `seekers` section
/// of `riwa-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpawnerConfig {
    /// Number of seekers to spawn at the start of a cycle.
    #[serde(default = "default_count")]
    pub count: u32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
        }
    }
}

const fn default_count() -> u32 {
    3
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of seeker names. The spawner picks randomly without
/// replacement from this list to ensure uniqueness.
const NAME_POOL: &[&str] = &[
    "Lin", "Mara", "Quill", "Soren", "Ilya", "Nadia", "Teo", "Wren",
    "Kasimir", "Yuki", "Odile", "Faris", "Juno", "Rhea", "Basil", "Cyra",
    "Dov", "Esme", "Hale", "Ines", "Jaro", "Kaia", "Lior", "Mina",
];

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// Spawn the seekers for a new cycle, all starting in `world`.
///
/// Seekers get ids `seeker-1`, `seeker-2`, ... in acting order.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if more seekers are requested than the
/// name pool holds.
pub fn spawn_seekers<R: Rng>(
    config: &SpawnerConfig,
    world: &WorldId,
    rng: &mut R,
) -> Result<Vec<Seeker>, EngineError> {
    let names = pick_unique_names(rng, config.count)?;

    let seekers: Vec<Seeker> = names
        .into_iter()
        .zip(1_u32..)
        .map(|(name, n)| Seeker {
            id: EntityId::new(format!("seeker-{n}")),
            name,
            world: world.clone(),
        })
        .collect();

    info!(
        count = seekers.len(),
        world = %world,
        "Seekers spawned"
    );
    Ok(seekers)
}

/// Pick `count` unique names from the pool.
fn pick_unique_names<R: Rng>(rng: &mut R, count: u32) -> Result<Vec<String>, EngineError> {
    let pool_len = NAME_POOL.len();
    let count_usize = usize::try_from(count).map_err(|_conversion_err| EngineError::Spawner {
        message: format!("seeker count {count} exceeds usize range"),
    })?;

    if count_usize > pool_len {
        return Err(EngineError::Spawner {
            message: format!("requested {count} seekers but the name pool only has {pool_len}"),
        });
    }

    // Partial Fisher-Yates: only the first `count` slots are shuffled.
    let mut indices: Vec<usize> = (0..pool_len).collect();
    for i in 0..count_usize {
        let j = rng.random_range(i..pool_len);
        indices.swap(i, j);
    }

    indices
        .iter()
        .take(count_usize)
        .map(|&idx| {
            NAME_POOL
                .get(idx)
                .map(|s| String::from(*s))
                .ok_or_else(|| EngineError::Spawner {
                    message: format!("name pool index {idx} out of bounds"),
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn world() -> WorldId {
        WorldId::from("cyberpunk_city")
    }

    #[test]
    fn spawns_correct_count() {
        let mut rng = SmallRng::seed_from_u64(1);
        let seekers = spawn_seekers(&SpawnerConfig { count: 5 }, &world(), &mut rng).unwrap();
        assert_eq!(seekers.len(), 5);
        assert!(seekers.iter().all(|s| s.world == world()));
    }

    #[test]
    fn ids_follow_spawn_order() {
        let mut rng = SmallRng::seed_from_u64(1);
        let seekers = spawn_seekers(&SpawnerConfig::default(), &world(), &mut rng).unwrap();
        let ids: Vec<&str> = seekers.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["seeker-1", "seeker-2", "seeker-3"]);
    }

    #[test]
    fn all_unique_names() {
        let mut rng = SmallRng::seed_from_u64(9);
        let count = u32::try_from(NAME_POOL.len()).unwrap();
        let seekers = spawn_seekers(&SpawnerConfig { count }, &world(), &mut rng).unwrap();

        let names: BTreeSet<&String> = seekers.iter().map(|s| &s.name).collect();
        assert_eq!(names.len(), NAME_POOL.len(), "all names must be unique");
    }

    #[test]
    fn same_seed_same_names() {
        let a = spawn_seekers(
            &SpawnerConfig::default(),
            &world(),
            &mut SmallRng::seed_from_u64(4),
        )
        .unwrap();
        let b = spawn_seekers(
            &SpawnerConfig::default(),
            &world(),
            &mut SmallRng::seed_from_u64(4),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_many_seekers_returns_error() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = spawn_seekers(&SpawnerConfig { count: 100 }, &world(), &mut rng);
        assert!(matches!(result, Err(EngineError::Spawner { .. })));
    }

    #[test]
    fn zero_seekers_returns_empty() {
        let mut rng = SmallRng::seed_from_u64(1);
        let seekers = spawn_seekers(&SpawnerConfig { count: 0 }, &world(), &mut rng).unwrap();
        assert!(seekers.is_empty());
    }

    #[test]
    fn config_section_parses() {
        let config: SpawnerConfig = serde_yml::from_str("count: 7\n").unwrap();
        assert_eq!(config.count, 7);
        let config: SpawnerConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config, SpawnerConfig::default());
    }
}
