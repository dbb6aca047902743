//! Storage seam
//!
//! The coordinator talks to persistence only through `InventoryStore`.
//! `MemoryStore` keeps everything in process on top of `ContainmentModel`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use logistics_containment::ContainmentModel;
use logistics_core::{
    Container, ContainerId, ContainerKind, EntityKind, EquipmentSlot, Footprint, Interval,
    InventoryError, Item, ItemId, Location, LocationId, LocationKind, Placement, Result,
};
use logistics_grid::GridEngine;

/// Request to create a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
}

/// Request to create a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContainer {
    pub location_id: LocationId,
    pub name: String,
    pub grid_width: u32,
    pub grid_height: u32,
    #[serde(default)]
    pub kind: ContainerKind,
    #[serde(default)]
    pub volume_limit: Option<f64>,
}

/// Request to create an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(flatten)]
    pub footprint: Footprint,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Container to stow the item in; the configured default when absent
    #[serde(default)]
    pub container: Option<ContainerId>,
    /// Item to nest the new item under
    #[serde(default)]
    pub parent: Option<ItemId>,
}

fn default_quantity() -> u32 {
    1
}

impl NewItem {
    pub fn new(name: impl Into<String>, footprint: Footprint) -> Self {
        Self {
            name: name.into(),
            footprint,
            weight: 0.0,
            quantity: 1,
            container: None,
            parent: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn in_container(mut self, container: ContainerId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn nested_in(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Row-level persistence the coordinator depends on.
///
/// Reads hand out owned rows so implementations are free to sit behind a
/// connection or a cache. Items are always returned in `left` order.
pub trait InventoryStore: Send + Sync {
    fn locations(&self) -> Vec<Location>;
    fn location(&self, id: LocationId) -> Option<Location>;
    fn containers(&self) -> Vec<Container>;
    fn container(&self, id: ContainerId) -> Option<Container>;
    fn items(&self) -> Vec<Item>;
    fn item(&self, id: ItemId) -> Option<Item>;

    /// Items stowed in a container, placed on its grid or not
    fn items_in_container(&self, id: ContainerId) -> Vec<Item> {
        self.items()
            .into_iter()
            .filter(|item| item.container_id() == Some(id))
            .collect()
    }

    fn insert_location(&mut self, location: NewLocation) -> Result<LocationId>;
    fn insert_container(&mut self, container: NewContainer) -> Result<ContainerId>;

    /// Insert an item as a new top-level leaf, `Unplaced` in `container`.
    /// `NewItem::parent` is ignored; nesting is a separate `move_subtree`.
    fn insert_item(&mut self, item: NewItem, container: Option<ContainerId>) -> Result<Item>;

    /// Overwrite an item's position fields
    fn update_placement(&mut self, id: ItemId, placement: Placement) -> Result<()>;

    fn move_subtree(&mut self, id: ItemId, new_parent: Option<ItemId>) -> Result<()>;
    fn remove_subtree(&mut self, id: ItemId) -> Result<Vec<Item>>;

    /// Transitive contents of an item, empty for a leaf or missing id
    fn descendants(&self, id: ItemId) -> Vec<Item>;

    /// `weight * quantity` summed over every transitive descendant, 0 when
    /// there are none
    fn subtree_weight(&self, id: ItemId) -> f64;
}

/// In-process store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    locations: BTreeMap<LocationId, Location>,
    containers: BTreeMap<ContainerId, Container>,
    model: ContainmentModel,
    next_item: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            containers: BTreeMap::new(),
            model: ContainmentModel::new(),
            next_item: 1,
        }
    }

    /// Load previously persisted rows, checking every reference and the
    /// containment invariants.
    pub fn from_parts(locations: Vec<Location>, containers: Vec<Container>, items: Vec<Item>) -> Result<Self> {
        let locations: BTreeMap<LocationId, Location> =
            locations.into_iter().map(|l| (l.id, l)).collect();

        let mut by_id = BTreeMap::new();
        for container in containers {
            if !locations.contains_key(&container.location_id) {
                return Err(InventoryError::DataIntegrity(format!(
                    "container {} references missing location {}",
                    container.id, container.location_id
                )));
            }
            by_id.insert(container.id, container);
        }

        if let Some(item) = items
            .iter()
            .find(|item| item.container_id().map_or(false, |c| !by_id.contains_key(&c)))
        {
            return Err(InventoryError::DataIntegrity(format!(
                "item {} references a missing container",
                item.id
            )));
        }

        let mut slot_holders: BTreeMap<EquipmentSlot, ItemId> = BTreeMap::new();
        for item in &items {
            let Some(slot) = item.equipment_slot() else {
                continue;
            };
            if let Some(holder) = slot_holders.insert(slot, item.id) {
                return Err(InventoryError::DataIntegrity(format!(
                    "items {holder} and {} both hold slot {slot}",
                    item.id
                )));
            }
        }

        for container in by_id.values() {
            GridEngine::try_from_occupants(container, &items)?;
        }

        let next_item = items.iter().map(|item| item.id.0).max().unwrap_or(0) + 1;
        let model = ContainmentModel::from_items(items)?;
        debug!(
            "Loaded store: {} locations, {} containers, {} items",
            locations.len(),
            by_id.len(),
            model.len()
        );

        Ok(Self {
            locations,
            containers: by_id,
            model,
            next_item,
        })
    }

    /// Split into persistable rows, items in `left` order
    pub fn into_parts(self) -> (Vec<Location>, Vec<Container>, Vec<Item>) {
        (
            self.locations.into_values().collect(),
            self.containers.into_values().collect(),
            self.model.into_items(),
        )
    }

    /// Id the next inserted item will receive
    pub fn next_item_id(&self) -> u64 {
        self.next_item
    }

    /// Continue id allocation at `next` so ids of deleted items are not
    /// handed out again. Never moves below the ids already in use.
    pub fn resume_item_ids(mut self, next: u64) -> Self {
        self.next_item = self.next_item.max(next);
        self
    }

    pub fn model(&self) -> &ContainmentModel {
        &self.model
    }

    fn require_container(&self, id: ContainerId) -> Result<()> {
        if self.containers.contains_key(&id) {
            Ok(())
        } else {
            Err(InventoryError::NotFound {
                kind: EntityKind::Container,
                id: id.0,
            })
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore for MemoryStore {
    fn locations(&self) -> Vec<Location> {
        self.locations.values().cloned().collect()
    }

    fn location(&self, id: LocationId) -> Option<Location> {
        self.locations.get(&id).cloned()
    }

    fn containers(&self) -> Vec<Container> {
        self.containers.values().cloned().collect()
    }

    fn container(&self, id: ContainerId) -> Option<Container> {
        self.containers.get(&id).cloned()
    }

    fn items(&self) -> Vec<Item> {
        self.model.iter().cloned().collect()
    }

    fn item(&self, id: ItemId) -> Option<Item> {
        self.model.get(id).cloned()
    }

    fn insert_location(&mut self, location: NewLocation) -> Result<LocationId> {
        if location.name.trim().is_empty() {
            return Err(InventoryError::Validation("location name is required".into()));
        }
        let id = LocationId(self.locations.keys().next_back().map_or(1, |last| last.0 + 1));
        self.locations.insert(
            id,
            Location {
                id,
                name: location.name,
                kind: location.kind,
            },
        );
        Ok(id)
    }

    fn insert_container(&mut self, container: NewContainer) -> Result<ContainerId> {
        if container.name.trim().is_empty() {
            return Err(InventoryError::Validation("container name is required".into()));
        }
        if !self.locations.contains_key(&container.location_id) {
            return Err(InventoryError::NotFound {
                kind: EntityKind::Location,
                id: container.location_id.0,
            });
        }
        if container.volume_limit.map_or(false, |limit| limit < 0.0) {
            return Err(InventoryError::Validation(
                "volume limit must not be negative".into(),
            ));
        }

        let id = ContainerId(self.containers.keys().next_back().map_or(1, |last| last.0 + 1));
        self.containers.insert(
            id,
            Container {
                id,
                location_id: container.location_id,
                name: container.name,
                grid_width: container.grid_width,
                grid_height: container.grid_height,
                kind: container.kind,
                volume_limit: container.volume_limit,
            },
        );
        Ok(id)
    }

    fn insert_item(&mut self, new: NewItem, container: Option<ContainerId>) -> Result<Item> {
        if new.name.trim().is_empty() {
            return Err(InventoryError::Validation("item name is required".into()));
        }
        if !new.weight.is_finite() || new.weight < 0.0 {
            return Err(InventoryError::Validation(format!(
                "item weight must be a non-negative number, got {}",
                new.weight
            )));
        }
        if new.quantity == 0 {
            return Err(InventoryError::Validation("item quantity must be at least 1".into()));
        }
        // Re-check positivity for rows deserialized without going through Footprint::new
        let footprint = Footprint::new(new.footprint.width, new.footprint.height)?;
        if let Some(container) = container {
            self.require_container(container)?;
        }

        let id = ItemId(self.next_item);
        let mut item = Item::new(id, new.name, footprint, Interval::leaf_after(0));
        item.weight = new.weight;
        item.quantity = new.quantity;
        item.placement = Placement::Unplaced { container };

        let inserted = self.model.insert_leaf(item)?.clone();
        self.next_item += 1;
        Ok(inserted)
    }

    fn update_placement(&mut self, id: ItemId, placement: Placement) -> Result<()> {
        if let Some(container) = placement.container() {
            self.require_container(container)?;
        }
        self.model.set_placement(id, placement)?;
        Ok(())
    }

    fn move_subtree(&mut self, id: ItemId, new_parent: Option<ItemId>) -> Result<()> {
        self.model.move_subtree(id, new_parent)
    }

    fn remove_subtree(&mut self, id: ItemId) -> Result<Vec<Item>> {
        self.model.remove_subtree(id)
    }

    fn descendants(&self, id: ItemId) -> Vec<Item> {
        self.model.descendants_of(id).into_iter().cloned().collect()
    }

    fn subtree_weight(&self, id: ItemId) -> f64 {
        self.model.adjacency_aggregate(id, Item::stack_weight)
    }
}
