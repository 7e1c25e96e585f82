//! Error types for the `riwa-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`].

use riwa_ledger::LedgerError;
use riwa_types::WorldId;

/// Errors that can occur during registry and genesis operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A world was not found in the registry.
    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    /// A world was registered twice.
    #[error("duplicate world id: {0}")]
    DuplicateWorld(WorldId),

    /// Genesis needs at least one world to scatter fragments across.
    #[error("world registry is empty")]
    EmptyRegistry,

    /// The ledger refused a genesis fragment.
    #[error("ledger error during genesis: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}
