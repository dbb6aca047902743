//! Per-container occupancy engine
//!
//! One engine tracks exactly one container grid. Engines are cheap to build
//! and are normally rebuilt from the container's current occupants right
//! before a placement is validated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use logistics_core::{Conflict, Container, Footprint, InventoryError, Item, ItemId, Result};

/// Rectangle recorded for a placed item, already rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedRect {
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacedRect {
    /// Whether two rectangles share at least one cell
    pub fn overlaps(&self, other: &PlacedRect) -> bool {
        let (a_row, a_col) = (u64::from(self.row), u64::from(self.col));
        let (b_row, b_col) = (u64::from(other.row), u64::from(other.col));
        a_row < b_row + u64::from(other.height)
            && b_row < a_row + u64::from(self.height)
            && a_col < b_col + u64::from(other.width)
            && b_col < a_col + u64::from(self.width)
    }
}

/// Occupancy tracker for a single container grid.
///
/// Each cell remembers which item covers it, so conflicts can name the
/// blocking item. `place` fails with `PlacementConflict` rather than
/// silently ignoring a rejected request.
#[derive(Debug, Clone)]
pub struct GridEngine {
    width: u32,
    height: u32,
    /// Row-major, `height * width` cells
    cells: Vec<Option<ItemId>>,
    placed: HashMap<ItemId, PlacedRect>,
}

impl GridEngine {
    /// Create an empty grid. Zero-sized grids are allowed; nothing fits in them.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![None; len],
            placed: HashMap::new(),
        }
    }

    /// Rebuild the engine for `container` by replaying every occupant that
    /// holds a grid cell in it. Occupants that no longer fit are skipped.
    pub fn from_occupants<'a, I>(container: &Container, items: I) -> Self
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let mut engine = Self::new(container.grid_width, container.grid_height);
        for item in items {
            let Some(pos) = item.grid_position() else {
                continue;
            };
            if pos.container != container.id {
                continue;
            }
            if let Err(e) = engine.place(
                item.id,
                item.footprint,
                i64::from(pos.row),
                i64::from(pos.col),
                pos.rotated,
            ) {
                warn!(
                    "Skipping occupant {} of container {} at ({}, {}): {}",
                    item.id, container.id, pos.row, pos.col, e
                );
            }
        }
        debug!(
            "Rebuilt grid {} ({}x{}) with {} occupants",
            container.id,
            engine.width,
            engine.height,
            engine.placed.len()
        );
        engine
    }

    /// Like `from_occupants`, but the first occupant that does not fit is a
    /// `DataIntegrity` error instead of being skipped.
    pub fn try_from_occupants<'a, I>(container: &Container, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let mut engine = Self::new(container.grid_width, container.grid_height);
        for item in items {
            let Some(pos) = item.grid_position().filter(|pos| pos.container == container.id) else {
                continue;
            };
            engine
                .place(
                    item.id,
                    item.footprint,
                    i64::from(pos.row),
                    i64::from(pos.col),
                    pos.rotated,
                )
                .map_err(|e| {
                    InventoryError::DataIntegrity(format!(
                        "occupant {} of container {} at ({}, {}): {}",
                        item.id, container.id, pos.row, pos.col, e
                    ))
                })?;
        }
        Ok(engine)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Footprint actually occupied for the given rotation state
    pub fn effective_footprint(footprint: Footprint, rotated: bool) -> Footprint {
        footprint.oriented(rotated)
    }

    /// 90 degree swap of a footprint
    pub fn rotate(footprint: Footprint) -> Footprint {
        footprint.rotated()
    }

    /// Explain why `footprint` cannot sit with its top-left corner at
    /// (`row`, `col`), or `Ok(())` when it can.
    pub fn check_place(
        &self,
        footprint: Footprint,
        row: i64,
        col: i64,
        rotated: bool,
    ) -> std::result::Result<(), Conflict> {
        let fp = Self::effective_footprint(footprint, rotated);
        let (w, h) = (i64::from(fp.width), i64::from(fp.height));
        if row < 0
            || col < 0
            || row > i64::from(self.height) - h
            || col > i64::from(self.width) - w
        {
            return Err(Conflict::OutOfBounds);
        }

        // Bounds hold, so the casts below are lossless
        let (row, col) = (row as u32, col as u32);
        for r in row..row + fp.height {
            for c in col..col + fp.width {
                if let Some(holder) = self.cells[self.index(r, c)] {
                    return Err(Conflict::Overlap { with: Some(holder) });
                }
            }
        }
        Ok(())
    }

    /// Pure query: does the footprint fit at (`row`, `col`)?
    pub fn can_place(&self, footprint: Footprint, row: i64, col: i64, rotated: bool) -> bool {
        self.check_place(footprint, row, col, rotated).is_ok()
    }

    /// Mark the rectangle as held by `id`.
    ///
    /// Fails with `PlacementConflict` when the rectangle does not fit and with
    /// `Validation` when `id` is already placed in this engine; nothing is
    /// changed in either case.
    pub fn place(
        &mut self,
        id: ItemId,
        footprint: Footprint,
        row: i64,
        col: i64,
        rotated: bool,
    ) -> Result<PlacedRect> {
        if self.placed.contains_key(&id) {
            return Err(InventoryError::Validation(format!(
                "item {id} is already placed in this grid; remove it first"
            )));
        }
        self.check_place(footprint, row, col, rotated)
            .map_err(InventoryError::PlacementConflict)?;

        let fp = Self::effective_footprint(footprint, rotated);
        let rect = PlacedRect {
            row: row as u32,
            col: col as u32,
            width: fp.width,
            height: fp.height,
        };
        self.fill(&rect, Some(id));
        self.placed.insert(id, rect);
        Ok(rect)
    }

    /// Clear the rectangle recorded for `id`. No-op when it was never placed.
    pub fn remove(&mut self, id: ItemId) -> Option<PlacedRect> {
        let rect = self.placed.remove(&id)?;
        self.fill(&rect, None);
        Some(rect)
    }

    /// Rectangle recorded for `id`
    pub fn placement_of(&self, id: ItemId) -> Option<PlacedRect> {
        self.placed.get(&id).copied()
    }

    /// Every placed item with its rectangle, in no particular order
    pub fn placements(&self) -> impl Iterator<Item = (ItemId, PlacedRect)> + '_ {
        self.placed.iter().map(|(id, rect)| (*id, *rect))
    }

    /// Item covering a cell, `None` when free or out of bounds
    pub fn occupant(&self, row: u32, col: u32) -> Option<ItemId> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells[self.index(row, col)]
    }

    pub fn is_occupied(&self, row: u32, col: u32) -> bool {
        self.occupant(row, col).is_some()
    }

    /// Boolean occupancy matrix, `height` rows of `width` cells
    pub fn occupancy(&self) -> Vec<Vec<bool>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height as usize];
        }
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(Option::is_some).collect())
            .collect()
    }

    pub fn free_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    /// First free origin in row-major scan order
    pub fn first_fit(&self, footprint: Footprint, rotated: bool) -> Option<(u32, u32)> {
        let fp = Self::effective_footprint(footprint, rotated);
        if fp.width > self.width || fp.height > self.height {
            return None;
        }
        for row in 0..=self.height - fp.height {
            for col in 0..=self.width - fp.width {
                if self.can_place(footprint, i64::from(row), i64::from(col), rotated) {
                    return Some((row, col));
                }
            }
        }
        None
    }

    /// Drop every placement
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
        self.placed.clear();
    }

    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    fn fill(&mut self, rect: &PlacedRect, value: Option<ItemId>) {
        for r in rect.row..rect.row + rect.height {
            for c in rect.col..rect.col + rect.width {
                let idx = self.index(r, c);
                self.cells[idx] = value;
            }
        }
    }
}
