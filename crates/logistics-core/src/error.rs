use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentSlot;
use crate::types::ItemId;

/// Convenience alias used by every engine crate.
pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

/// Kind of entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Container,
    Location,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Container => write!(f, "container"),
            Self::Location => write!(f, "location"),
        }
    }
}

/// Why a placement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// The rectangle leaves `[0, width) x [0, height)`.
    OutOfBounds,
    /// The rectangle covers a cell already held by another item.
    Overlap { with: Option<ItemId> },
    /// The equipment slot is held by a different item.
    SlotOccupied { slot: EquipmentSlot, holder: ItemId },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "placement is out of bounds"),
            Self::Overlap { with: Some(id) } => write!(f, "placement overlaps item {id}"),
            Self::Overlap { with: None } => write!(f, "placement overlaps an occupied cell"),
            Self::SlotOccupied { slot, holder } => {
                write!(f, "slot {} already occupied by item {holder}", slot.key())
            }
        }
    }
}

/// Errors surfaced by inventory operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("placement conflict: {0}")]
    PlacementConflict(Conflict),

    #[error("containment data integrity violated: {0}")]
    DataIntegrity(String),
}

impl InventoryError {
    pub fn item_not_found(id: ItemId) -> Self {
        Self::NotFound {
            kind: EntityKind::Item,
            id: id.0,
        }
    }

    /// Whether the caller can recover by trying a different cell or slot
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PlacementConflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_recoverable() {
        assert!(InventoryError::PlacementConflict(Conflict::OutOfBounds).is_recoverable());
        assert!(!InventoryError::Validation("bad".into()).is_recoverable());
        assert!(!InventoryError::DataIntegrity("bad".into()).is_recoverable());
        assert!(!InventoryError::item_not_found(ItemId(3)).is_recoverable());
    }

    #[test]
    fn messages_name_the_entity() {
        let err = InventoryError::item_not_found(ItemId(42));
        assert_eq!(err.to_string(), "item 42 not found");

        let err = InventoryError::PlacementConflict(Conflict::SlotOccupied {
            slot: EquipmentSlot::MainHand,
            holder: ItemId(5),
        });
        assert_eq!(
            err.to_string(),
            "placement conflict: slot main_hand already occupied by item 5"
        );
    }
}
