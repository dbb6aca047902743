//! Equipment slots
//!
//! A closed set of body-mount positions. At most one item may hold a given
//! slot across the whole universe; equipping is mutually exclusive with
//! grid placement.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// The seven equipment slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    #[serde(rename = "main_hand")]
    MainHand,
    #[serde(rename = "off_hand")]
    OffHand,
    #[serde(rename = "back")]
    Back,
    #[serde(rename = "torso")]
    Torso,
    #[serde(rename = "belt")]
    Belt,
    #[serde(rename = "quick_1")]
    Quick1,
    #[serde(rename = "quick_2")]
    Quick2,
}

impl EquipmentSlot {
    /// All equipment slot variants
    pub fn all() -> &'static [EquipmentSlot] {
        &[
            Self::MainHand,
            Self::OffHand,
            Self::Back,
            Self::Torso,
            Self::Belt,
            Self::Quick1,
            Self::Quick2,
        ]
    }

    /// Stable key used in requests and storage
    pub fn key(self) -> &'static str {
        match self {
            Self::MainHand => "main_hand",
            Self::OffHand => "off_hand",
            Self::Back => "back",
            Self::Torso => "torso",
            Self::Belt => "belt",
            Self::Quick1 => "quick_1",
            Self::Quick2 => "quick_2",
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::MainHand => "Main Hand",
            Self::OffHand => "Off Hand",
            Self::Back => "Back",
            Self::Torso => "Torso",
            Self::Belt => "Belt",
            Self::Quick1 => "Quick 1",
            Self::Quick2 => "Quick 2",
        }
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EquipmentSlot {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|slot| slot.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::all().iter().map(|s| s.key()).collect();
                InventoryError::Validation(format!(
                    "unknown equipment slot '{s}', expected one of: {}",
                    keys.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_count() {
        assert_eq!(EquipmentSlot::all().len(), 7);
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for &slot in EquipmentSlot::all() {
            assert_eq!(slot.key().parse::<EquipmentSlot>().unwrap(), slot);
        }
    }

    #[test]
    fn unknown_key_is_validation_error() {
        let err = "left_sock".parse::<EquipmentSlot>().unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(err.to_string().contains("main_hand"));
    }

    #[test]
    fn serde_uses_keys() {
        let json = serde_json::to_string(&EquipmentSlot::Quick1).unwrap();
        assert_eq!(json, "\"quick_1\"");
        let slot: EquipmentSlot = serde_json::from_str("\"off_hand\"").unwrap();
        assert_eq!(slot, EquipmentSlot::OffHand);
    }
}
