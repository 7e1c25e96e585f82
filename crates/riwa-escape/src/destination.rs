//! Real-universe destinations for printed entities.
//!
//! Labels have the shape `RealUniverse_Coordinates_Alpha_Centauri_NNNN`
//! with `NNNN` in `1000..=9999`. The numeric suffix is random, so the
//! source is injectable: production uses [`RandomDestination`], tests can
//! seed it or substitute a fixed source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Prefix shared by every destination label.
pub const DESTINATION_PREFIX: &str = "RealUniverse_Coordinates_Alpha_Centauri_";

/// Smallest destination suffix.
pub const MIN_SUFFIX: u16 = 1000;

/// Largest destination suffix.
pub const MAX_SUFFIX: u16 = 9999;

/// Produces destination labels for entities that begin printing.
pub trait DestinationSource: Send + core::fmt::Debug {
    /// Produce the next label.
    fn next_destination(&mut self) -> String;
}

/// Destination labels with a random numeric suffix.
#[derive(Debug)]
pub struct RandomDestination {
    rng: StdRng,
}

impl RandomDestination {
    /// Seed from operating system entropy.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seed deterministically.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DestinationSource for RandomDestination {
    fn next_destination(&mut self) -> String {
        let suffix = self.rng.random_range(MIN_SUFFIX..=MAX_SUFFIX);
        label(suffix)
    }
}

/// Always returns the same suffix.
#[derive(Debug, Clone, Copy)]
pub struct FixedDestination(pub u16);

impl DestinationSource for FixedDestination {
    fn next_destination(&mut self) -> String {
        label(self.0)
    }
}

/// Build a label from a suffix.
pub fn label(suffix: u16) -> String {
    format!("{DESTINATION_PREFIX}{suffix}")
}

/// Whether `value` has the shape of a destination label.
pub fn is_destination_label(value: &str) -> bool {
    value
        .strip_prefix(DESTINATION_PREFIX)
        .and_then(|suffix| suffix.parse::<u16>().ok())
        .is_some_and(|n| (MIN_SUFFIX..=MAX_SUFFIX).contains(&n))
}
