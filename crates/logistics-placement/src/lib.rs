//! Logistics Placement - Transactional inventory mutations
//!
//! `PlacementCoordinator` is the single writer of item position fields. It
//! validates against the containment model and a freshly rebuilt grid,
//! commits through an `InventoryStore`, then dispatches extension hooks and
//! change notifications.

pub mod config;
pub mod coordinator;
pub mod hooks;
pub mod notify;
pub mod snapshot;
pub mod store;

pub use config::PlacementConfig;
pub use coordinator::{PackReport, PlacementCoordinator};
pub use hooks::{HookEvent, HookHandler, HookPayload, HookRegistry};
pub use notify::{ChangeNotifier, SnapshotSource, WatchNotifier};
pub use snapshot::{ContainerNode, InventorySnapshot, LocationNode};
pub use store::{InventoryStore, MemoryStore, NewContainer, NewItem, NewLocation};
