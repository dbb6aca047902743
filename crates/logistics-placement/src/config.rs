use serde::{Deserialize, Serialize};

use logistics_core::{ContainerId, EquipmentSlot, InventoryError, Result};

/// Placement rules supplied by the host. Maps to the `[placement]` section
/// of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Slots that may be equipped; any other key is rejected.
    pub equipment_slots: Vec<EquipmentSlot>,
    /// Container new items are stowed in when the request names none.
    pub default_container: ContainerId,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            equipment_slots: EquipmentSlot::all().to_vec(),
            default_container: ContainerId(1),
        }
    }
}

impl PlacementConfig {
    pub fn slot_enabled(&self, slot: EquipmentSlot) -> bool {
        self.equipment_slots.contains(&slot)
    }

    /// Parse a slot key and check it is enabled.
    pub fn resolve_slot(&self, key: &str) -> Result<EquipmentSlot> {
        let slot: EquipmentSlot = key.parse()?;
        if !self.slot_enabled(slot) {
            return Err(InventoryError::Validation(format!(
                "equipment slot '{key}' is not enabled"
            )));
        }
        Ok(slot)
    }
}
