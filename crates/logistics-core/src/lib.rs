//! Logistics Core - Core types for the TTRPG Logistics inventory engine
//!
//! This crate provides the foundational types shared by every other crate:
//! - Identifiers for items, containers, and locations
//! - Item footprints and nested-set containment intervals
//! - Placement state (grid cell, equipment slot, or unplaced)
//! - The fixed set of equipment slots
//! - The error taxonomy surfaced by every engine operation

pub mod equipment;
pub mod error;
pub mod item;
pub mod types;

pub use equipment::EquipmentSlot;
pub use error::{Conflict, EntityKind, InventoryError, Result};
pub use item::{
    Container, ContainerKind, GridPosition, Item, Location, LocationKind, Placement,
};
pub use types::{ContainerId, Footprint, Interval, IntervalRelation, ItemId, LocationId};
