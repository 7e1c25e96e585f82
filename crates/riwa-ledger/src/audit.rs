//! Integrity audit for a loaded ledger.
//!
//! A ledger built only through [`UniverseState`] methods satisfies these
//! checks by construction. A ledger read back from disk may not, so the
//! persistence layer runs the audit before handing state to the
//! simulation.
//!
//! Checks, in order:
//!
//! ```text
//! consumed <= allocated
//! every fragment id is unique
//! collected_by is set  =>  collection_timestamp is set
//! ```
//!
//! [`UniverseState`]: crate::UniverseState

use std::collections::BTreeSet;

use riwa_types::EnergyFragment;

use crate::LedgerError;

/// Run every integrity check over the raw ledger fields.
///
/// # Errors
///
/// Returns the first [`LedgerError`] found.
pub fn audit(
    allocated: u64,
    consumed: u64,
    fragments: &[EnergyFragment],
) -> Result<(), LedgerError> {
    if consumed > allocated {
        return Err(LedgerError::Overdrawn {
            consumed,
            allocated,
        });
    }

    let mut seen = BTreeSet::new();
    for fragment in fragments {
        if !seen.insert(&fragment.id) {
            return Err(LedgerError::DuplicateFragment(fragment.id.clone()));
        }
        if fragment.collected_by.is_some() && fragment.collected_at.is_none() {
            return Err(LedgerError::MissingCollectionTimestamp(
                fragment.id.clone(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riwa_types::{Coordinates, EnergyTier, EntityId, FragmentId, WorldId};

    fn fragment(id: &str) -> EnergyFragment {
        EnergyFragment::new(
            FragmentId::from(id),
            EnergyTier::Precious,
            WorldId::from("ancient_dynasty"),
            Coordinates::ORIGIN,
        )
    }

    #[test]
    fn clean_ledger_passes() {
        assert_eq!(audit(10, 7, &[fragment("a"), fragment("b")]), Ok(()));
    }

    #[test]
    fn overdrawn_ledger_fails() {
        assert_eq!(
            audit(5, 6, &[]),
            Err(LedgerError::Overdrawn {
                consumed: 6,
                allocated: 5
            }),
        );
    }

    #[test]
    fn duplicate_ids_fail() {
        let result = audit(10, 0, &[fragment("a"), fragment("a")]);
        assert_eq!(result, Err(LedgerError::DuplicateFragment(FragmentId::from("a"))));
    }

    #[test]
    fn collector_without_timestamp_fails() {
        let mut broken = fragment("a");
        broken.collected_by = Some(EntityId::from("E1"));
        let result = audit(10, 0, &[broken]);
        assert_eq!(
            result,
            Err(LedgerError::MissingCollectionTimestamp(FragmentId::from("a"))),
        );
    }
}
