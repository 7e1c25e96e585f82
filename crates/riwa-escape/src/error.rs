//! Error types for the escape coordinator.
//!
//! Every failure is local and recoverable: the operation that returned it
//! changed nothing, and the caller may retry with corrected input. The
//! `Display` text of each variant is the human-readable reason reported
//! to the simulation driver.

use riwa_types::{EntityId, EscapeStatus, FragmentId, KeyFragmentId};

/// Broad category of an [`EscapeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The targeted entity, fragment or attempt does not exist.
    NotFound,
    /// A precondition such as stage, fragment count or energy was not met.
    PreconditionFailed,
    /// The coordinate key did not match.
    VerificationFailed,
}

/// Errors returned by [`EscapeCoordinator`](crate::EscapeCoordinator)
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscapeError {
    /// The entity has no escape attempt.
    #[error("No escape attempt found for entity {0}")]
    AttemptNotFound(EntityId),

    /// The fragment id is not in the ledger catalog.
    #[error("unknown energy fragment: {0}")]
    FragmentNotFound(FragmentId),

    /// The clue id is not in the ledger's key fragment list.
    #[error("unknown coordinate key fragment: {0}")]
    KeyFragmentNotFound(KeyFragmentId),

    /// The entity already has an attempt that has not finished.
    #[error("entity {entity} already has an attempt in stage {status}")]
    AttemptInProgress {
        /// The entity.
        entity: EntityId,
        /// Stage of the open attempt.
        status: EscapeStatus,
    },

    /// The entity already left the universe this cycle.
    #[error("entity {0} has already escaped")]
    AlreadyEscaped(EntityId),

    /// The entity's current attempt has already finished.
    #[error("attempt for entity {entity} is closed ({status})")]
    AttemptClosed {
        /// The entity.
        entity: EntityId,
        /// Terminal stage of the attempt.
        status: EscapeStatus,
    },

    /// The operation needs the attempt in a different stage.
    #[error("entity {entity} is in stage {actual}, expected {expected}")]
    WrongStage {
        /// The entity.
        entity: EntityId,
        /// Stage the operation requires.
        expected: EscapeStatus,
        /// Stage the attempt is in.
        actual: EscapeStatus,
    },

    /// The terminal gateway has already been opened this cycle.
    #[error("Gateway already active")]
    GatewayAlreadyActive,

    /// Not enough Sacred-tier fragments to open the gateway.
    #[error("Missing: {missing} fragments")]
    InsufficientFragments {
        /// Sacred fragments still missing.
        missing: usize,
        /// Sacred fragments required.
        needed: usize,
    },

    /// The ledger cannot cover the gateway's energy cost.
    #[error("insufficient source energy: need {needed}, {available} available")]
    InsufficientEnergy {
        /// Energy the gateway costs.
        needed: u64,
        /// Energy left in the ledger.
        available: u64,
    },

    /// The gateway is closed or another entity holds the printing slot.
    #[error("Gateway not ready or entity not in printing slot")]
    NotInPrintingSlot(EntityId),

    /// Printing progress was reported before printing began.
    #[error("printing has not started for entity {0}")]
    PrintingNotStarted(EntityId),

    /// A post-escape choice was made before escaping.
    #[error("entity {0} has not escaped")]
    NotEscaped(EntityId),

    /// The provided coordinate key does not match the master formula.
    #[error("coordinate key rejected for entity {0}")]
    KeyMismatch(EntityId),
}

impl EscapeError {
    /// Category of this failure.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AttemptNotFound(_) | Self::FragmentNotFound(_) | Self::KeyFragmentNotFound(_) => {
                FailureKind::NotFound
            }
            Self::KeyMismatch(_) => FailureKind::VerificationFailed,
            Self::AttemptInProgress { .. }
            | Self::AlreadyEscaped(_)
            | Self::AttemptClosed { .. }
            | Self::WrongStage { .. }
            | Self::GatewayAlreadyActive
            | Self::InsufficientFragments { .. }
            | Self::InsufficientEnergy { .. }
            | Self::NotInPrintingSlot(_)
            | Self::PrintingNotStarted(_)
            | Self::NotEscaped(_) => FailureKind::PreconditionFailed,
        }
    }
}
