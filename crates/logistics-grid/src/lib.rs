//! Logistics Grid - Spatial placement for container grids
//!
//! Provides the per-container occupancy engine, rotation, deterministic
//! auto-packing, named loadout presets, and strap attachment for vests.

mod engine;
mod pack;
mod preset;
mod strap;

pub use engine::{GridEngine, PlacedRect};
pub use pack::{PackItem, Packed};
pub use preset::{LoadoutBook, PresetEntry};
pub use strap::{attach_pouch, PouchAttachment, StrapPoint, MIN_SECURE_STRAPS};
