//! Named loadout presets
//!
//! A preset remembers where each item of a container sat so the layout can
//! be restored later.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use logistics_core::{InventoryError, ItemId, Result};

use crate::pack::Packed;

/// One remembered grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetEntry {
    pub id: ItemId,
    pub row: u32,
    pub col: u32,
    #[serde(default)]
    pub rotated: bool,
}

impl From<Packed> for PresetEntry {
    fn from(packed: Packed) -> Self {
        Self {
            id: packed.id,
            row: packed.row,
            col: packed.col,
            rotated: false,
        }
    }
}

/// Presets keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadoutBook {
    presets: BTreeMap<String, Vec<PresetEntry>>,
}

impl LoadoutBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entries` under `name`, replacing any previous preset
    pub fn save_preset(&mut self, name: &str, entries: Vec<PresetEntry>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InventoryError::Validation(
                "preset name must not be empty".into(),
            ));
        }
        self.presets.insert(name.to_string(), entries);
        Ok(())
    }

    /// Entries of a preset; empty when the name is unknown
    pub fn load_preset(&self, name: &str) -> Vec<PresetEntry> {
        self.presets.get(name.trim()).cloned().unwrap_or_default()
    }

    pub fn remove_preset(&mut self, name: &str) -> Option<Vec<PresetEntry>> {
        self.presets.remove(name.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name.trim())
    }

    /// Preset names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, row: u32, col: u32) -> PresetEntry {
        PresetEntry {
            id: ItemId(id),
            row,
            col,
            rotated: false,
        }
    }

    #[test]
    fn save_and_load() {
        let mut book = LoadoutBook::new();
        book.save_preset("raid", vec![entry(1, 0, 0), entry(2, 0, 2)])
            .unwrap();
        assert_eq!(book.load_preset("raid").len(), 2);
        assert!(book.contains("raid"));

        book.save_preset("raid", vec![entry(3, 1, 1)]).unwrap();
        assert_eq!(book.load_preset("raid"), vec![entry(3, 1, 1)]);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn unknown_preset_loads_empty() {
        let book = LoadoutBook::new();
        assert!(book.load_preset("nothing").is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut book = LoadoutBook::new();
        let err = book.save_preset("  ", Vec::new()).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(book.is_empty());
    }

    #[test]
    fn names_are_sorted_and_removable() {
        let mut book = LoadoutBook::new();
        book.save_preset("stealth", Vec::new()).unwrap();
        book.save_preset("assault", Vec::new()).unwrap();
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["assault", "stealth"]);

        assert!(book.remove_preset("assault").is_some());
        assert!(book.remove_preset("assault").is_none());
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["stealth"]);
    }

    #[test]
    fn book_serializes_as_a_map() {
        let mut book = LoadoutBook::new();
        book.save_preset("raid", vec![entry(1, 2, 3)]).unwrap();
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["raid"][0]["id"], 1);
        assert_eq!(json["raid"][0]["col"], 3);
        let back: LoadoutBook = serde_json::from_value(json).unwrap();
        assert_eq!(back, book);
    }
}
