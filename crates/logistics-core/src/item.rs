//! Item, container, and location data model
//!
//! Items live inside containers on a discrete grid, containers live inside
//! locations, and items may alternatively hold one equipment slot.

use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentSlot;
use crate::types::{ContainerId, Footprint, Interval, ItemId, LocationId};

/// A concrete cell assignment inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub container: ContainerId,
    pub row: u32,
    pub col: u32,
    /// When set the occupied footprint is height x width
    #[serde(default)]
    pub rotated: bool,
}

/// Where an item currently sits.
///
/// Grid placement and equipment are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Placement {
    /// Stowed without a grid cell, optionally inside a container
    Unplaced { container: Option<ContainerId> },
    /// Occupies a rectangle of a container grid
    InGrid(GridPosition),
    /// Held in an equipment slot
    Equipped { slot: EquipmentSlot },
}

impl Default for Placement {
    fn default() -> Self {
        Self::Unplaced { container: None }
    }
}

impl Placement {
    /// Container the item is stowed in, whether or not it has a cell
    pub fn container(&self) -> Option<ContainerId> {
        match self {
            Self::Unplaced { container } => *container,
            Self::InGrid(pos) => Some(pos.container),
            Self::Equipped { .. } => None,
        }
    }
}

/// The atomic owned object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(flatten)]
    pub footprint: Footprint,
    #[serde(flatten)]
    pub interval: Interval,
    /// Direct parent, redundant with the interval ancestry
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub placement: Placement,
    /// Weight of a single unit
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl Item {
    /// Create an unplaced 1-unit item with the given footprint and interval
    pub fn new(id: ItemId, name: impl Into<String>, footprint: Footprint, interval: Interval) -> Self {
        Self {
            id,
            name: name.into(),
            footprint,
            interval,
            parent_id: None,
            placement: Placement::default(),
            weight: 0.0,
            quantity: 1,
        }
    }

    /// Container the item is stowed in, if any
    pub fn container_id(&self) -> Option<ContainerId> {
        self.placement.container()
    }

    /// Grid cell assignment, if placed on a grid
    pub fn grid_position(&self) -> Option<GridPosition> {
        match self.placement {
            Placement::InGrid(pos) => Some(pos),
            _ => None,
        }
    }

    /// Equipment slot held, if equipped
    pub fn equipment_slot(&self) -> Option<EquipmentSlot> {
        match self.placement {
            Placement::Equipped { slot } => Some(slot),
            _ => None,
        }
    }

    pub fn rotated(&self) -> bool {
        self.grid_position().map_or(false, |pos| pos.rotated)
    }

    /// Whether the item sits inside another item
    pub fn is_nested(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Weight of the whole stack (`weight * quantity`)
    pub fn stack_weight(&self) -> f64 {
        self.weight * f64::from(self.quantity)
    }
}

/// Location type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Person,
    Cabin,
    Apartment,
    #[default]
    Other,
}

/// A named grouping of containers with no spatial model of its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
}

/// Container type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Backpack,
    Rig,
    Pocket,
    Locker,
    AlchemistCase,
    #[default]
    Other,
}

/// A rectangular grid surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub location_id: LocationId,
    pub name: String,
    pub grid_width: u32,
    pub grid_height: u32,
    #[serde(default)]
    pub kind: ContainerKind,
    /// Optional volume/weight capacity limit
    #[serde(default)]
    pub volume_limit: Option<f64>,
}

impl Container {
    /// Number of grid cells
    pub fn cell_count(&self) -> u64 {
        u64::from(self.grid_width) * u64::from(self.grid_height)
    }
}
