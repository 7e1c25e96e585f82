//! Tick driver, persistence and run loop for the RIWA2 simulation.
//!
//! This crate moves seekers through the escape storyline one tick at a
//! time, narrates what happens and saves the universe between runs.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic tick counter.
//! - [`config`] -- Configuration loading from `riwa-config.yaml` into
//!   strongly-typed structs.
//! - [`persist`] -- JSON snapshots of the whole simulation, written
//!   atomically and audited on load.
//! - [`runner`] -- The async run loop with tick pacing, auto-save and
//!   stop control.
//! - [`story`] -- [`StoryLog`] narration of tick events.
//! - [`tick`] -- The per-tick seeker state machine.
//!
//! [`StoryLog`]: story::StoryLog

pub mod clock;
pub mod config;
pub mod persist;
pub mod runner;
pub mod story;
pub mod tick;
