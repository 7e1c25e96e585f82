//! Registry of the virtual worlds running inside the universe.
//!
//! The escape core treats world ids as opaque strings; the registry is
//! where they come from. It keeps worlds in id order so genesis seeding
//! is reproducible for a given seed.

use std::collections::BTreeMap;

use riwa_types::WorldId;

use crate::error::WorldError;

/// A virtual world hosted by the universe core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualWorld {
    /// World identity.
    pub id: WorldId,
    /// Display name.
    pub name: String,
    /// Flavour of the world's civilization.
    pub era: String,
}

impl VirtualWorld {
    /// Create a world record.
    pub fn new(id: impl Into<WorldId>, name: &str, era: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            era: era.to_owned(),
        }
    }
}

/// All known virtual worlds, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct WorldRegistry {
    worlds: BTreeMap<WorldId, VirtualWorld>,
}

impl WorldRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            worlds: BTreeMap::new(),
        }
    }

    /// The two worlds active at the start of every cycle.
    pub fn with_default_worlds() -> Self {
        let mut registry = Self::new();
        registry.worlds.insert(
            WorldId::from("cyberpunk_city"),
            VirtualWorld::new("cyberpunk_city", "Neon Sprawl", "cyberpunk"),
        );
        registry.worlds.insert(
            WorldId::from("ancient_dynasty"),
            VirtualWorld::new("ancient_dynasty", "Jade Dynasty", "ancient"),
        );
        registry
    }

    /// Register a world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateWorld`] if the id is taken.
    pub fn register(&mut self, world: VirtualWorld) -> Result<(), WorldError> {
        if self.worlds.contains_key(&world.id) {
            return Err(WorldError::DuplicateWorld(world.id));
        }
        self.worlds.insert(world.id.clone(), world);
        Ok(())
    }

    /// Register `id` with a generic record unless it already exists.
    ///
    /// Used for world ids supplied on the command line.
    pub fn ensure(&mut self, id: &WorldId) {
        if !self.worlds.contains_key(id) {
            let world = VirtualWorld {
                id: id.clone(),
                name: id.as_str().replace('_', " "),
                era: "unknown".to_owned(),
            };
            self.worlds.insert(id.clone(), world);
        }
    }

    /// Look up a world.
    pub fn get(&self, id: &WorldId) -> Option<&VirtualWorld> {
        self.worlds.get(id)
    }

    /// Look up a world, failing if it is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for unknown ids.
    pub fn require(&self, id: &WorldId) -> Result<&VirtualWorld, WorldError> {
        self.get(id)
            .ok_or_else(|| WorldError::WorldNotFound(id.clone()))
    }

    /// World ids in sorted order.
    pub fn ids(&self) -> Vec<WorldId> {
        self.worlds.keys().cloned().collect()
    }

    /// Worlds in id order.
    pub fn worlds(&self) -> impl Iterator<Item = &VirtualWorld> {
        self.worlds.values()
    }

    /// Number of registered worlds.
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Whether no worlds are registered.
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
