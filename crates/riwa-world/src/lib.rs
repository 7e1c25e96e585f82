//! World registry and universe genesis for the RIWA2 simulation.
//!
//! # Modules
//!
//! - [`registry`] -- [`WorldRegistry`] of the virtual worlds in the universe.
//! - [`genesis`] -- [`seed_genesis`] builds the fragment catalog and the
//!   coordinate key clues for a new cycle.
//! - [`error`] -- Error types for registry and genesis operations.

pub mod error;
pub mod genesis;
pub mod registry;

pub use error::WorldError;
pub use genesis::{GENESIS_COLLECTOR, Genesis, GenesisConfig, seed_genesis};
pub use registry::{VirtualWorld, WorldRegistry};
