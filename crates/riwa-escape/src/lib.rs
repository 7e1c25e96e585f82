//! Escape protocol for the RIWA2 simulation.
//!
//! An entity escapes the universe by collecting seven Sacred-tier energy
//! fragments, decrypting the coordinate key, opening the terminal gateway
//! and being printed into the real universe. [`EscapeCoordinator`] owns
//! every attempt and the gateway; the energy ledger lives in
//! [`riwa_ledger::UniverseState`] and is passed in by the caller.
//!
//! # Modules
//!
//! - [`coordinator`] -- The attempt state machine and gateway scheduling
//! - [`key`] -- SHA-256 coordinate key verification
//! - [`destination`] -- Real-universe destination labels
//! - [`error`] -- [`EscapeError`] and its [`FailureKind`]

pub mod coordinator;
pub mod destination;
pub mod error;
pub mod key;

pub use coordinator::{EscapeCoordinator, EscapeSnapshot, FormData};
pub use destination::{DestinationSource, FixedDestination, RandomDestination};
pub use error::{EscapeError, FailureKind};
pub use key::{KeyVerifier, MASTER_KEY_FORMULA};
