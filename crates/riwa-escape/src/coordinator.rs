//! The escape coordinator: per-entity attempts and the terminal gateway.
//!
//! Attempts move through a fixed sequence of stages:
//!
//! ```text
//! NotStarted -> FragmentsCollecting -> KeyDecrypting -> GatewayOpening
//!            -> Printing -> Escaped
//! ```
//!
//! with `Failed` reachable from any open stage via
//! [`EscapeCoordinator::abandon_attempt`]. No operation moves an attempt
//! backwards.
//!
//! # Attempt History
//!
//! Each entity owns an ordered history of attempts; the last one is
//! current. A new attempt can only start once the current one has
//! `Failed`, so an entity never has two open attempts and an escaped
//! entity's successful attempt stays current.
//!
//! # Ledger Access
//!
//! The coordinator does not own the ledger. Operations that read or
//! spend energy take `&mut UniverseState`, and fragment attribution is
//! written through [`UniverseState::mark_collected`].
//!
//! # Failure
//!
//! All precondition checks run before any mutation, so an `Err` always
//! means nothing changed, in the coordinator or in the ledger.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use riwa_ledger::UniverseState;
use riwa_types::{
    EnergyTier, EntityId, EscapeAttempt, EscapeProgress, EscapeStatus, FragmentId,
    KeyFragmentId, PostEscapeAction, SACRED_FRAGMENTS_REQUIRED, TerminalGateway,
};

use crate::destination::{DestinationSource, RandomDestination};
use crate::error::EscapeError;
use crate::key::KeyVerifier;

/// Free-form description of a post-escape form.
pub type FormData = BTreeMap<String, serde_json::Value>;

/// Persisted state of an [`EscapeCoordinator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscapeSnapshot {
    /// The universe's terminal gateway.
    #[serde(default)]
    pub gateway: TerminalGateway,
    /// Every attempt, each entity's history in order.
    #[serde(default)]
    pub attempts: Vec<EscapeAttempt>,
}

/// Drives escape attempts and owns the terminal gateway.
#[derive(Debug)]
pub struct EscapeCoordinator {
    attempts: BTreeMap<EntityId, Vec<EscapeAttempt>>,
    gateway: TerminalGateway,
    verifier: KeyVerifier,
    destinations: Box<dyn DestinationSource>,
}

impl Default for EscapeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// The current attempt of `entity`, if any.
fn latest_mut<'a>(
    attempts: &'a mut BTreeMap<EntityId, Vec<EscapeAttempt>>,
    entity: &EntityId,
) -> Option<&'a mut EscapeAttempt> {
    attempts.get_mut(entity).and_then(|history| history.last_mut())
}

/// Fail with [`EscapeError::WrongStage`] unless `attempt` is in `expected`.
fn require_stage(attempt: &EscapeAttempt, expected: EscapeStatus) -> Result<(), EscapeError> {
    if attempt.status == expected {
        Ok(())
    } else {
        Err(EscapeError::WrongStage {
            entity: attempt.entity_id.clone(),
            expected,
            actual: attempt.status,
        })
    }
}

impl EscapeCoordinator {
    /// Create a coordinator with a closed gateway and random destinations.
    pub fn new() -> Self {
        Self::with_destinations(Box::new(RandomDestination::from_os_rng()))
    }

    /// Create a coordinator that draws destinations from `destinations`.
    pub fn with_destinations(destinations: Box<dyn DestinationSource>) -> Self {
        Self {
            attempts: BTreeMap::new(),
            gateway: TerminalGateway::default(),
            verifier: KeyVerifier::master(),
            destinations,
        }
    }

    /// Rebuild a coordinator from persisted state.
    pub fn from_snapshot(
        snapshot: EscapeSnapshot,
        destinations: Box<dyn DestinationSource>,
    ) -> Self {
        let mut attempts: BTreeMap<EntityId, Vec<EscapeAttempt>> = BTreeMap::new();
        for attempt in snapshot.attempts {
            attempts
                .entry(attempt.entity_id.clone())
                .or_default()
                .push(attempt);
        }
        Self {
            attempts,
            gateway: snapshot.gateway,
            verifier: KeyVerifier::master(),
            destinations,
        }
    }

    /// Capture the persisted state.
    pub fn snapshot(&self) -> EscapeSnapshot {
        EscapeSnapshot {
            gateway: self.gateway.clone(),
            attempts: self.attempts.values().flatten().cloned().collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The terminal gateway.
    pub const fn gateway(&self) -> &TerminalGateway {
        &self.gateway
    }

    /// The current attempt of `entity`.
    pub fn attempt(&self, entity: &EntityId) -> Option<&EscapeAttempt> {
        self.attempts.get(entity).and_then(|history| history.last())
    }

    /// Every attempt `entity` has made, oldest first.
    pub fn history(&self, entity: &EntityId) -> &[EscapeAttempt] {
        self.attempts.get(entity).map_or(&[], Vec::as_slice)
    }

    /// Current attempts of all entities, in entity order.
    pub fn current_attempts(&self) -> impl Iterator<Item = &EscapeAttempt> {
        self.attempts.values().filter_map(|history| history.last())
    }

    /// Read-only progress of `entity`'s current attempt.
    pub fn progress(&self, entity: &EntityId) -> Option<EscapeProgress> {
        let attempt = self.attempt(entity)?;
        Some(EscapeProgress {
            status: attempt.status,
            fragments_collected: attempt.sacred_count(),
            fragments_needed: SACRED_FRAGMENTS_REQUIRED,
            key_fragments_discovered: attempt.discovered_key_fragments.len(),
            has_coordinate_key: attempt.final_coordinate_key.is_some(),
            gateway_active: self.gateway.is_active
                && self.gateway.activated_by_entity.as_ref() == Some(entity),
            success: attempt.success,
        })
    }

    // -----------------------------------------------------------------------
    // Stage transitions
    // -----------------------------------------------------------------------

    /// Open a new attempt for `entity` and move it to
    /// [`EscapeStatus::FragmentsCollecting`].
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::AttemptInProgress`] if the entity's current
    /// attempt is still open, or [`EscapeError::AlreadyEscaped`] if it
    /// succeeded.
    pub fn start_attempt(
        &mut self,
        entity: &EntityId,
        entity_name: &str,
    ) -> Result<EscapeAttempt, EscapeError> {
        if let Some(current) = self.attempt(entity) {
            if current.status == EscapeStatus::Escaped {
                return Err(EscapeError::AlreadyEscaped(entity.clone()));
            }
            if current.is_open() {
                return Err(EscapeError::AttemptInProgress {
                    entity: entity.clone(),
                    status: current.status,
                });
            }
        }

        let mut attempt = EscapeAttempt::new(entity.clone(), entity_name);
        attempt.advance_to(EscapeStatus::FragmentsCollecting);
        info!(
            entity = %entity,
            name = entity_name,
            attempt = %attempt.attempt_id,
            "Escape attempt started"
        );

        self.attempts
            .entry(entity.clone())
            .or_default()
            .push(attempt.clone());
        Ok(attempt)
    }

    /// Record that `entity` collected a fragment.
    ///
    /// The ledger stamps the collector and time. A Sacred-tier fragment is
    /// also added to the entity's open attempt, once per fragment id.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::FragmentNotFound`] for ids missing from the
    /// ledger catalog.
    pub fn collect_fragment(
        &mut self,
        ledger: &mut UniverseState,
        entity: &EntityId,
        fragment: &FragmentId,
    ) -> Result<(), EscapeError> {
        let tier = ledger
            .mark_collected(fragment, entity, Utc::now())
            .ok_or_else(|| EscapeError::FragmentNotFound(fragment.clone()))?;

        if tier != EnergyTier::Sacred {
            debug!(entity = %entity, fragment = %fragment, %tier, "non-sacred fragment collected");
            return Ok(());
        }

        if let Some(attempt) = latest_mut(&mut self.attempts, entity).filter(|a| a.is_open()) {
            if !attempt.collected_sacred_fragments.contains(fragment) {
                attempt.collected_sacred_fragments.push(fragment.clone());
                info!(
                    entity = %entity,
                    fragment = %fragment,
                    held = attempt.sacred_count(),
                    "Sacred fragment collected"
                );
            }
        }
        Ok(())
    }

    /// Record that `entity` found a coordinate key clue and move its attempt
    /// to [`EscapeStatus::KeyDecrypting`] if it is not already further.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::KeyFragmentNotFound`] if the clue id is not in
    /// the ledger, [`EscapeError::AttemptNotFound`] if the entity has no
    /// attempt, or [`EscapeError::AttemptClosed`] if it already finished.
    pub fn discover_key_fragment(
        &mut self,
        ledger: &UniverseState,
        entity: &EntityId,
        clue: &KeyFragmentId,
    ) -> Result<(), EscapeError> {
        if !ledger.has_key_fragment(clue) {
            return Err(EscapeError::KeyFragmentNotFound(clue.clone()));
        }
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        if !attempt.is_open() {
            return Err(EscapeError::AttemptClosed {
                entity: entity.clone(),
                status: attempt.status,
            });
        }

        if !attempt.discovered_key_fragments.contains(clue) {
            attempt.discovered_key_fragments.push(clue.clone());
        }
        if attempt.advance_to(EscapeStatus::KeyDecrypting) {
            info!(entity = %entity, clue = %clue, "Decrypting coordinate key");
        }
        Ok(())
    }

    /// Check `provided_key` against the master formula and, on a match,
    /// move the attempt to [`EscapeStatus::GatewayOpening`].
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::AttemptNotFound`],
    /// [`EscapeError::WrongStage`] unless the attempt is decrypting, or
    /// [`EscapeError::KeyMismatch`] for a wrong key.
    pub fn decrypt_coordinate_key(
        &mut self,
        entity: &EntityId,
        provided_key: &str,
    ) -> Result<(), EscapeError> {
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        require_stage(attempt, EscapeStatus::KeyDecrypting)?;

        if !self.verifier.verify(provided_key) {
            debug!(entity = %entity, "coordinate key rejected");
            return Err(EscapeError::KeyMismatch(entity.clone()));
        }

        attempt.final_coordinate_key = Some(provided_key.to_owned());
        attempt.advance_to(EscapeStatus::GatewayOpening);
        info!(entity = %entity, "Coordinate key verified");
        Ok(())
    }

    /// Open the terminal gateway for `entity`.
    ///
    /// Requires a closed gateway, an attempt in
    /// [`EscapeStatus::GatewayOpening`] holding enough Sacred fragments, and
    /// enough ledger energy for the gateway's cost. On success the entity is
    /// queued for printing and its attempt moves to
    /// [`EscapeStatus::Printing`]. The gateway stays active for the rest of
    /// the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::GatewayAlreadyActive`],
    /// [`EscapeError::AttemptNotFound`], [`EscapeError::WrongStage`],
    /// [`EscapeError::InsufficientFragments`] or
    /// [`EscapeError::InsufficientEnergy`].
    pub fn activate_gateway(
        &mut self,
        ledger: &mut UniverseState,
        entity: &EntityId,
    ) -> Result<(), EscapeError> {
        if self.gateway.is_active {
            return Err(EscapeError::GatewayAlreadyActive);
        }
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        require_stage(attempt, EscapeStatus::GatewayOpening)?;

        let held = attempt.sacred_count();
        if held < SACRED_FRAGMENTS_REQUIRED {
            return Err(EscapeError::InsufficientFragments {
                missing: SACRED_FRAGMENTS_REQUIRED.saturating_sub(held),
                needed: SACRED_FRAGMENTS_REQUIRED,
            });
        }

        let cost = self.gateway.source_energy_cost;
        if !ledger.consume_energy(cost) {
            return Err(EscapeError::InsufficientEnergy {
                needed: cost,
                available: ledger.available_energy(),
            });
        }

        let now = Utc::now();
        self.gateway.is_active = true;
        self.gateway.activation_time = Some(now);
        self.gateway.activated_by_entity = Some(entity.clone());
        self.gateway.entities_in_queue.push_back(entity.clone());

        attempt.gateway_id = Some(self.gateway.gateway_id);
        attempt.gateway_activation_time = Some(now);
        attempt.advance_to(EscapeStatus::Printing);

        info!(
            entity = %entity,
            gateway = %self.gateway.gateway_id,
            energy_cost = cost,
            energy_left = ledger.available_energy(),
            "Terminal gateway activated"
        );
        Ok(())
    }

    /// Move the next queued entity into the empty printing slot.
    ///
    /// Returns the promoted entity, or `None` when there is nothing to do.
    pub fn promote_next_printing(&mut self) -> Option<EntityId> {
        let promoted = self.gateway.promote_next()?;
        info!(entity = %promoted, "Entity entered the printing slot");
        Some(promoted)
    }

    /// Begin printing `entity` into the real universe.
    ///
    /// The entity must already hold the printing slot (see
    /// [`promote_next_printing`](Self::promote_next_printing)). Assigns a
    /// destination label from the coordinator's destination source.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::NotInPrintingSlot`],
    /// [`EscapeError::AttemptNotFound`] or [`EscapeError::WrongStage`].
    pub fn begin_printing(&mut self, entity: &EntityId) -> Result<String, EscapeError> {
        if !self.gateway.is_active || !self.gateway.is_printing(entity) {
            return Err(EscapeError::NotInPrintingSlot(entity.clone()));
        }
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        require_stage(attempt, EscapeStatus::Printing)?;

        let destination = self.destinations.next_destination();
        attempt.printing_start_time = Some(Utc::now());
        attempt.printing_destination = Some(destination.clone());
        info!(entity = %entity, destination = %destination, "Printing initiated");
        Ok("Printing initiated".to_owned())
    }

    /// Add `step` to the printing progress of `entity`, clamped to 1.0.
    ///
    /// Returns the new progress.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::NotInPrintingSlot`],
    /// [`EscapeError::AttemptNotFound`] or
    /// [`EscapeError::PrintingNotStarted`].
    pub fn advance_printing(&mut self, entity: &EntityId, step: f64) -> Result<f64, EscapeError> {
        if !self.gateway.is_active || !self.gateway.is_printing(entity) {
            return Err(EscapeError::NotInPrintingSlot(entity.clone()));
        }
        let started = self
            .attempt(entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?
            .printing_start_time
            .is_some();
        if !started {
            return Err(EscapeError::PrintingNotStarted(entity.clone()));
        }

        let progress = (self.gateway.printing_progress + step.max(0.0)).min(1.0);
        self.gateway.printing_progress = progress;
        debug!(entity = %entity, progress, "printing progressed");
        Ok(progress)
    }

    /// Finish printing `entity`: mark the attempt escaped, free the
    /// printing slot and record the escape in the ledger.
    ///
    /// The gateway is left active.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::AttemptNotFound`] or
    /// [`EscapeError::WrongStage`] unless the attempt is printing.
    pub fn complete_escape(
        &mut self,
        ledger: &mut UniverseState,
        entity: &EntityId,
    ) -> Result<String, EscapeError> {
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        require_stage(attempt, EscapeStatus::Printing)?;

        let destination = attempt
            .printing_destination
            .as_deref()
            .unwrap_or("an unrecorded destination");
        let message = format!("Successfully transcended to real universe at {destination}");

        attempt.printing_complete_time = Some(Utc::now());
        attempt.success = true;
        attempt.advance_to(EscapeStatus::Escaped);
        attempt.result_message.clone_from(&message);

        if let Some(other) = self
            .gateway
            .current_printing_entity
            .as_ref()
            .filter(|holder| *holder != entity)
        {
            warn!(entity = %entity, holder = %other, "escape completed while another entity held the printing slot");
        }
        self.gateway.dequeue(entity);
        self.gateway.clear_printing_slot();
        ledger.record_escape(entity.clone());

        info!(entity = %entity, escaped_total = ledger.entities_escaped().len(), "Entity escaped");
        Ok(message)
    }

    /// Close `entity`'s open attempt as [`EscapeStatus::Failed`].
    ///
    /// The entity leaves the gateway queue and printing slot if it held
    /// either. A new attempt may be started afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::AttemptNotFound`] or
    /// [`EscapeError::AttemptClosed`].
    pub fn abandon_attempt(&mut self, entity: &EntityId, reason: &str) -> Result<(), EscapeError> {
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        if !attempt.advance_to(EscapeStatus::Failed) {
            return Err(EscapeError::AttemptClosed {
                entity: entity.clone(),
                status: attempt.status,
            });
        }
        reason.clone_into(&mut attempt.result_message);

        self.gateway.dequeue(entity);
        if self.gateway.is_printing(entity) {
            self.gateway.clear_printing_slot();
        }
        info!(entity = %entity, reason, "Escape attempt abandoned");
        Ok(())
    }

    /// Record what an escaped entity does next.
    ///
    /// The current attempt must have succeeded. A `None` form leaves any
    /// earlier form description in place.
    ///
    /// # Errors
    ///
    /// Returns [`EscapeError::AttemptNotFound`] if the entity never made an
    /// attempt, or [`EscapeError::NotEscaped`] if the current one did not
    /// succeed.
    pub fn choose_return_form(
        &mut self,
        entity: &EntityId,
        action: PostEscapeAction,
        form: Option<FormData>,
    ) -> Result<(), EscapeError> {
        let attempt = latest_mut(&mut self.attempts, entity)
            .ok_or_else(|| EscapeError::AttemptNotFound(entity.clone()))?;
        if !attempt.success {
            return Err(EscapeError::NotEscaped(entity.clone()));
        }

        attempt.post_escape_action = Some(action);
        if form.is_some() {
            attempt.new_form_chosen = form;
        }
        info!(entity = %entity, %action, "Post-escape form chosen");
        Ok(())
    }
}
