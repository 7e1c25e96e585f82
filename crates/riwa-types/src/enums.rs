//! Enumeration types for the RIWA2 simulation.
//!
//! Every enum persists as a string tag. Deserialization rejects tags that
//! are not listed here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source energy tiers
// ---------------------------------------------------------------------------

/// Scarcity tier of a source energy fragment.
///
/// Variants are declared in scarcity order, so the derived [`Ord`] gives
/// `Common < Rare < Precious < Legendary < Sacred < Absolute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergyTier {
    /// Daily consumption, renewable.
    #[serde(rename = "E_Common")]
    Common,
    /// Cross-world travel and ability enhancement.
    #[serde(rename = "D_Rare")]
    Rare,
    /// History rewrites and world repair.
    #[serde(rename = "C_Precious")]
    Precious,
    /// Cross-dimensional communication and life transfer.
    #[serde(rename = "B_Legendary")]
    Legendary,
    /// Terminal gateway keys. Seven are required for one escape.
    #[serde(rename = "A_Sacred")]
    Sacred,
    /// Exists only from universe genesis and is fully depleted.
    ///
    /// Only genesis seeding produces fragments of this tier.
    #[serde(rename = "Omega_Absolute")]
    Absolute,
}

impl EnergyTier {
    /// All tiers in scarcity order.
    pub const ALL: [Self; 6] = [
        Self::Common,
        Self::Rare,
        Self::Precious,
        Self::Legendary,
        Self::Sacred,
        Self::Absolute,
    ];

    /// Persisted tag of this tier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "E_Common",
            Self::Rare => "D_Rare",
            Self::Precious => "C_Precious",
            Self::Legendary => "B_Legendary",
            Self::Sacred => "A_Sacred",
            Self::Absolute => "Omega_Absolute",
        }
    }

    /// Whether fragments of this tier can only come from universe genesis.
    pub const fn is_genesis_only(self) -> bool {
        matches!(self, Self::Absolute)
    }
}

impl core::fmt::Display for EnergyTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Escape status
// ---------------------------------------------------------------------------

/// Stage of an escape attempt.
///
/// The happy path is strictly ordered:
/// `NotStarted -> FragmentsCollecting -> KeyDecrypting -> GatewayOpening
/// -> Printing -> Escaped`. `Failed` is a terminal state reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscapeStatus {
    /// Attempt record exists but has not begun.
    #[default]
    #[serde(rename = "not_started")]
    NotStarted,
    /// Gathering Sacred-tier fragments.
    #[serde(rename = "collecting_fragments")]
    FragmentsCollecting,
    /// At least one key clue found; working on the coordinate key.
    #[serde(rename = "decrypting_key")]
    KeyDecrypting,
    /// Coordinate key verified; gateway may be activated.
    #[serde(rename = "opening_gateway")]
    GatewayOpening,
    /// Gateway activated; waiting for or undergoing printing.
    #[serde(rename = "printing_to_real_universe")]
    Printing,
    /// Printed into the real universe.
    #[serde(rename = "escaped")]
    Escaped,
    /// Abandoned.
    #[serde(rename = "failed")]
    Failed,
}

impl EscapeStatus {
    /// Position on the happy path. `Failed` sorts after every other stage.
    pub const fn stage(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::FragmentsCollecting => 1,
            Self::KeyDecrypting => 2,
            Self::GatewayOpening => 3,
            Self::Printing => 4,
            Self::Escaped => 5,
            Self::Failed => 6,
        }
    }

    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Escaped | Self::Failed)
    }

    /// Whether moving from `self` to `next` keeps the status monotonic.
    ///
    /// Terminal stages never move. `Failed` is reachable from any
    /// non-terminal stage; every other target must be strictly later on
    /// the happy path.
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            _ => next.stage() > self.stage(),
        }
    }

    /// Persisted tag of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::FragmentsCollecting => "collecting_fragments",
            Self::KeyDecrypting => "decrypting_key",
            Self::GatewayOpening => "opening_gateway",
            Self::Printing => "printing_to_real_universe",
            Self::Escaped => "escaped",
            Self::Failed => "failed",
        }
    }
}

impl core::fmt::Display for EscapeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Coordinate key clues
// ---------------------------------------------------------------------------

/// Where a coordinate key clue is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueType {
    /// Encoded in a physical constant of a world.
    PhysicalConstant,
    /// Spoken in a prophecy.
    Prophecy,
    /// Written in the genome of early life.
    Genetic,
    /// Built into the dimensions of a structure.
    Architectural,
}

impl ClueType {
    /// All clue types.
    pub const ALL: [Self; 4] = [
        Self::PhysicalConstant,
        Self::Prophecy,
        Self::Genetic,
        Self::Architectural,
    ];
}

// ---------------------------------------------------------------------------
// Post-escape disposition
// ---------------------------------------------------------------------------

/// What an escaped entity chooses to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostEscapeAction {
    /// Return with full control over the universe.
    ReturnAsGod,
    /// Return in a custom form described by the form payload.
    ReturnWithNewForm,
    /// Remain in the real universe.
    StayOutside,
}

impl PostEscapeAction {
    /// Every disposition.
    pub const ALL: [Self; 3] = [Self::ReturnAsGod, Self::ReturnWithNewForm, Self::StayOutside];

    /// Persisted tag of this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReturnAsGod => "return_as_god",
            Self::ReturnWithNewForm => "return_with_new_form",
            Self::StayOutside => "stay_outside",
        }
    }
}

impl core::fmt::Display for PostEscapeAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_by_scarcity() {
        assert!(EnergyTier::Common < EnergyTier::Rare);
        assert!(EnergyTier::Legendary < EnergyTier::Sacred);
        assert!(EnergyTier::Sacred < EnergyTier::Absolute);
        assert!(EnergyTier::Absolute.is_genesis_only());
        assert!(!EnergyTier::Sacred.is_genesis_only());
    }

    #[test]
    fn tier_tags_match_serde() {
        for tier in EnergyTier::ALL {
            let json = serde_json::to_string(&tier).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn status_serializes_as_tag() {
        let json = serde_json::to_string(&EscapeStatus::FragmentsCollecting).unwrap_or_default();
        assert_eq!(json, "\"collecting_fragments\"");
    }

    #[test]
    fn unknown_status_tag_is_rejected() {
        let parsed: Result<EscapeStatus, _> = serde_json::from_str("\"teleporting\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn status_only_advances_forward() {
        use EscapeStatus::*;
        assert!(NotStarted.can_advance_to(FragmentsCollecting));
        assert!(FragmentsCollecting.can_advance_to(GatewayOpening));
        assert!(!GatewayOpening.can_advance_to(KeyDecrypting));
        assert!(!Printing.can_advance_to(Printing));
        assert!(KeyDecrypting.can_advance_to(Failed));
        assert!(!Escaped.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Escaped));
    }

    #[test]
    fn clue_and_action_tags_are_snake_case() {
        let clue = serde_json::to_string(&ClueType::PhysicalConstant).unwrap_or_default();
        assert_eq!(clue, "\"physical_constant\"");

        let action = serde_json::to_string(&PostEscapeAction::ReturnAsGod).unwrap_or_default();
        assert_eq!(action, format!("\"{}\"", PostEscapeAction::ReturnAsGod));
    }
}
