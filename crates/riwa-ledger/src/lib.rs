//! Source energy ledger and fragment catalog for the RIWA2 simulation.
//!
//! [`UniverseState`] is the resource ledger of one universe cycle. It owns
//! the energy counters, the fragment catalog and the flat list of
//! coordinate key clue identities. Nothing outside this crate writes to
//! those fields directly: the escape coordinator goes through
//! [`UniverseState::mark_collected`] and [`UniverseState::consume_energy`].
//!
//! # Energy Accounting
//!
//! ```text
//! available = total_allocated - consumed
//! ```
//!
//! `consumed` never decreases and never exceeds `total_allocated`. A debit
//! that does not fit is refused whole; there is no partial consumption.
//!
//! # Usage
//!
//! ```
//! use riwa_ledger::UniverseState;
//!
//! let mut universe = UniverseState::with_allocation(10);
//! assert!(universe.consume_energy(7));
//! assert!(!universe.consume_energy(7));
//! assert_eq!(universe.available_energy(), 3);
//! ```

pub mod audit;
pub mod ledger;

pub use ledger::{EscapeReadiness, UniverseState};

use riwa_types::FragmentId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Integrity violations found in a ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// More energy was consumed than was ever allocated.
    #[error("ledger overdrawn: consumed {consumed} of {allocated} allocated")]
    Overdrawn {
        /// Recorded consumption.
        consumed: u64,
        /// Recorded allocation.
        allocated: u64,
    },

    /// Two catalog entries share an identity.
    #[error("duplicate fragment id: {0}")]
    DuplicateFragment(FragmentId),

    /// A fragment names a collector but no collection time.
    #[error("fragment {0} is collected but has no collection timestamp")]
    MissingCollectionTimestamp(FragmentId),
}
