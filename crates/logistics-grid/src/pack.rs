//! Deterministic greedy auto-packing

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::debug;

use logistics_core::{Footprint, Item, ItemId};

use crate::engine::GridEngine;

/// Input to the packer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackItem {
    pub id: ItemId,
    #[serde(flatten)]
    pub footprint: Footprint,
}

impl PackItem {
    pub fn new(id: ItemId, footprint: Footprint) -> Self {
        Self { id, footprint }
    }
}

impl From<&Item> for PackItem {
    fn from(item: &Item) -> Self {
        Self::new(item.id, item.footprint)
    }
}

/// A packed item's origin, never rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packed {
    pub id: ItemId,
    pub row: u32,
    pub col: u32,
}

impl GridEngine {
    /// Reset the grid and pack `items` greedily.
    ///
    /// Items are taken tallest first, then widest, keeping input order for
    /// ties. Each one goes to the first row-major origin where it fits
    /// unrotated. Packing stops at the first item that fits nowhere; the
    /// rest stay unplaced. Returns the placed origins in processing order.
    pub fn auto_pack(&mut self, items: &[PackItem]) -> Vec<Packed> {
        self.clear();

        let mut order: Vec<&PackItem> = items.iter().collect();
        // Stable sort keeps input order among equal footprints
        order.sort_by_key(|item| Reverse((item.footprint.height, item.footprint.width)));

        let mut packed = Vec::with_capacity(order.len());
        for item in order {
            let Some((row, col)) = self.first_fit(item.footprint, false) else {
                debug!(
                    "Auto-pack stopped at item {} ({}): no free position",
                    item.id, item.footprint
                );
                break;
            };
            if let Err(e) = self.place(item.id, item.footprint, i64::from(row), i64::from(col), false) {
                debug!("Auto-pack stopped at item {}: {}", item.id, e);
                break;
            }
            packed.push(Packed { id: item.id, row, col });
        }

        debug!("Auto-packed {}/{} items", packed.len(), items.len());
        packed
    }
}
