//! Shared type definitions for the RIWA2 escape simulation.
//!
//! Every crate in the workspace takes its records from here, so the
//! persisted JSON shape is defined in exactly one place.
//!
//! # Modules
//!
//! - [`ids`] -- UUID and string identity wrappers
//! - [`enums`] -- Energy tiers, escape stages, clue types, dispositions
//! - [`structs`] -- Fragments, key clues, stars and the migration plan
//! - [`escape`] -- Terminal gateway, escape attempts, progress snapshots

pub mod enums;
pub mod escape;
pub mod ids;
pub mod structs;

pub use enums::{ClueType, EnergyTier, EscapeStatus, PostEscapeAction};
pub use escape::{
    DEFAULT_GATEWAY_ENERGY_COST, EscapeAttempt, EscapeProgress, GATEWAY_WORLD,
    SACRED_FRAGMENTS_REQUIRED, TerminalGateway,
};
pub use ids::{AttemptId, EntityId, FragmentId, GatewayId, KeyFragmentId, WorldId};
pub use structs::{
    CoordinateKeyFragment, Coordinates, EnergyFragment, GatewayLocation, StarData,
    UniverseMigrationPlan,
};
