//! Placement coordinator
//!
//! The only component that writes item position fields. Every placement
//! follows the same pattern: rebuild a grid from the container's current
//! occupants, validate, then commit under the store's write lock.
//!
//! Writes that can grow a container's occupancy are serialized per
//! container, and writes that can take an equipment slot are serialized on a
//! single equipment lock. Every other write only frees space, so a
//! validation made under those locks still holds at commit time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use logistics_core::{
    Conflict, ContainerId, EntityKind, EquipmentSlot, GridPosition, InventoryError, Item, ItemId,
    LocationId, Placement, Result,
};
use logistics_grid::{GridEngine, LoadoutBook, PackItem, Packed, PresetEntry};

use crate::config::PlacementConfig;
use crate::hooks::{HookEvent, HookPayload, HookRegistry};
use crate::notify::{ChangeNotifier, SnapshotSource};
use crate::snapshot::InventorySnapshot;
use crate::store::{InventoryStore, MemoryStore, NewContainer, NewItem, NewLocation};

/// Outcome of packing a container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackReport {
    pub container: ContainerId,
    /// Placed origins in processing order
    pub packed: Vec<Packed>,
    /// Items that stayed stowed without a cell
    pub leftover: Vec<ItemId>,
}

/// Transactional entry point for every inventory mutation
pub struct PlacementCoordinator<S: InventoryStore = MemoryStore> {
    store: RwLock<S>,
    container_locks: Mutex<HashMap<ContainerId, Arc<Mutex<()>>>>,
    equipment_lock: Mutex<()>,
    hooks: HookRegistry,
    notifiers: RwLock<Vec<Arc<dyn ChangeNotifier>>>,
    loadouts: RwLock<BTreeMap<ContainerId, LoadoutBook>>,
    config: PlacementConfig,
}

impl<S: InventoryStore> PlacementCoordinator<S> {
    pub fn new(store: S, config: PlacementConfig) -> Self {
        Self {
            store: RwLock::new(store),
            container_locks: Mutex::new(HashMap::new()),
            equipment_lock: Mutex::new(()),
            hooks: HookRegistry::new(),
            notifiers: RwLock::new(Vec::new()),
            loadouts: RwLock::new(BTreeMap::new()),
            config,
        }
    }

    /// Start with previously saved loadout presets
    pub fn with_loadouts(self, loadouts: BTreeMap<ContainerId, LoadoutBook>) -> Self {
        *self.loadouts.write() = loadouts;
        self
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Register extension handlers here
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn add_notifier(&self, notifier: Arc<dyn ChangeNotifier>) {
        self.notifiers.write().push(notifier);
    }

    /// Run a read-only query against the store
    pub fn read_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.store.read())
    }

    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.store.read().item(id)
    }

    pub fn loadouts(&self) -> BTreeMap<ContainerId, LoadoutBook> {
        self.loadouts.read().clone()
    }

    /// Hand back the store and loadouts, for persisting
    pub fn into_parts(self) -> (S, BTreeMap<ContainerId, LoadoutBook>) {
        (self.store.into_inner(), self.loadouts.into_inner())
    }

    pub fn add_location(&self, location: NewLocation) -> Result<LocationId> {
        let id = self.store.write().insert_location(location)?;
        info!("Created location {}", id);
        self.after_commit(Vec::new());
        Ok(id)
    }

    pub fn add_container(&self, container: NewContainer) -> Result<ContainerId> {
        let id = self.store.write().insert_container(container)?;
        info!("Created container {}", id);
        self.after_commit(Vec::new());
        Ok(id)
    }

    /// Create an item stowed without a cell.
    ///
    /// The item lands in the requested container, the configured default, or
    /// nowhere when the default container does not exist. With a parent it is
    /// nested and stowed wherever the parent's outermost ancestor lives.
    pub fn create_item(&self, new: NewItem) -> Result<Item> {
        let parent = new.parent;
        let explicit = new.container;

        let created = {
            let mut store = self.store.write();
            let container = match parent {
                Some(parent) => {
                    let root = outermost(&*store, parent)
                        .ok_or_else(|| InventoryError::item_not_found(parent))?;
                    let home = root.container_id();
                    if explicit.is_some() && explicit != home {
                        return Err(InventoryError::Validation(format!(
                            "item cannot be stowed in container {:?} while nested in item {}",
                            explicit, parent
                        )));
                    }
                    home
                }
                None => self.home_for_new(&*store, explicit)?,
            };

            let item = store.insert_item(new, container)?;
            if let Some(parent) = parent {
                store.move_subtree(item.id, Some(parent))?;
            }
            store
                .item(item.id)
                .ok_or_else(|| InventoryError::item_not_found(item.id))?
        };
        info!(
            "Created item {} '{}' in {:?}",
            created.id,
            created.name,
            created.container_id()
        );

        let events = {
            let store = self.store.read();
            let mut events = vec![HookPayload {
                event: HookEvent::ItemCreate,
                total_weight: created.stack_weight(),
                item: created.clone(),
            }];
            events.extend(outermost(&*store, created.id).map(|root| weight_payload(&*store, root)));
            events
        };
        self.after_commit(events);
        Ok(created)
    }

    /// Put a top-level item on a container grid at (`row`, `col`).
    ///
    /// The item leaves any slot or cell it held. Repeating a successful call
    /// is a no-op that succeeds again.
    pub fn place_in_container(
        &self,
        id: ItemId,
        container: ContainerId,
        row: i64,
        col: i64,
        rotated: bool,
    ) -> Result<Item> {
        let lock = self.container_lock(container);
        let _serial = lock.lock();

        let (target, item, occupants) = {
            let store = self.store.read();
            let target = store
                .container(container)
                .ok_or_else(|| container_not_found(container))?;
            let item = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            (target, item, store.items_in_container(container))
        };
        ensure_top_level(&item, "placed on a grid")?;

        let mut grid = GridEngine::from_occupants(&target, occupants.iter().filter(|o| o.id != id));
        let rect = grid.place(id, item.footprint, row, col, rotated)?;
        let placement = Placement::InGrid(GridPosition {
            container,
            row: rect.row,
            col: rect.col,
            rotated,
        });

        let committed = {
            let mut store = self.store.write();
            let current = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            ensure_top_level(&current, "placed on a grid")?;
            store.update_placement(id, placement)?;
            rehome_contents(&mut *store, id, Some(container))?;
            store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?
        };
        info!(
            "Placed item {} in container {} at ({}, {}){}",
            id,
            container,
            rect.row,
            rect.col,
            if rotated { " rotated" } else { "" }
        );
        self.after_commit(Vec::new());
        Ok(committed)
    }

    /// Equip a top-level item by slot key. Unknown or disabled keys are
    /// validation errors; a slot held by another item is a conflict.
    pub fn equip(&self, id: ItemId, slot: &str) -> Result<Item> {
        let slot = self.config.resolve_slot(slot)?;
        self.equip_slot(id, slot)
    }

    pub fn equip_slot(&self, id: ItemId, slot: EquipmentSlot) -> Result<Item> {
        if !self.config.slot_enabled(slot) {
            return Err(InventoryError::Validation(format!(
                "equipment slot '{slot}' is not enabled"
            )));
        }
        let _serial = self.equipment_lock.lock();

        {
            let store = self.store.read();
            let item = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            ensure_top_level(&item, "equipped")?;
            if let Some(holder) = store
                .items()
                .into_iter()
                .find(|other| other.id != id && other.equipment_slot() == Some(slot))
            {
                return Err(InventoryError::PlacementConflict(Conflict::SlotOccupied {
                    slot,
                    holder: holder.id,
                }));
            }
        }

        let committed = {
            let mut store = self.store.write();
            let current = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            ensure_top_level(&current, "equipped")?;
            store.update_placement(id, Placement::Equipped { slot })?;
            rehome_contents(&mut *store, id, None)?;
            store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?
        };
        info!("Equipped item {} to {}", id, slot);
        self.after_commit(Vec::new());
        Ok(committed)
    }

    /// Take an item out of its slot and stow it, without a cell, in the
    /// default container
    pub fn unequip(&self, id: ItemId) -> Result<Item> {
        let committed = {
            let mut store = self.store.write();
            let item = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            let Some(slot) = item.equipment_slot() else {
                return Err(InventoryError::Validation(format!("item {id} is not equipped")));
            };
            let home = self.home_for_new(&*store, None)?;
            store.update_placement(id, Placement::Unplaced { container: home })?;
            rehome_contents(&mut *store, id, home)?;
            debug!("Freed slot {}", slot);
            store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?
        };
        info!("Unequipped item {} into {:?}", id, committed.container_id());
        self.after_commit(Vec::new());
        Ok(committed)
    }

    /// Re-parent an item under `parent`. The moved subtree gives up any cell
    /// or slot and is stowed with the parent's outermost ancestor.
    pub fn nest_item(&self, id: ItemId, parent: ItemId) -> Result<Item> {
        let (committed, roots) = {
            let mut store = self.store.write();
            let old_root = outermost(&*store, id).ok_or_else(|| InventoryError::item_not_found(id))?;
            let new_root =
                outermost(&*store, parent).ok_or_else(|| InventoryError::item_not_found(parent))?;
            let home = new_root.container_id();

            store.move_subtree(id, Some(parent))?;
            store.update_placement(id, Placement::Unplaced { container: home })?;
            rehome_contents(&mut *store, id, home)?;

            let committed = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            (committed, distinct_roots(old_root.id, new_root.id))
        };
        info!("Nested item {} inside item {}", id, parent);
        self.after_commit(self.weight_events(&roots));
        Ok(committed)
    }

    /// Lift a nested item out to the top level, stowed without a cell where
    /// its old outermost ancestor lives
    pub fn unnest_item(&self, id: ItemId) -> Result<Item> {
        let (committed, old_root) = {
            let mut store = self.store.write();
            let item = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            if !item.is_nested() {
                return Err(InventoryError::Validation(format!(
                    "item {id} is not inside another item"
                )));
            }
            let old_root = outermost(&*store, id).ok_or_else(|| InventoryError::item_not_found(id))?;
            let home = old_root.container_id();

            store.move_subtree(id, None)?;
            store.update_placement(id, Placement::Unplaced { container: home })?;
            rehome_contents(&mut *store, id, home)?;

            let committed = store.item(id).ok_or_else(|| InventoryError::item_not_found(id))?;
            (committed, old_root.id)
        };
        info!("Took item {} out of item {}", id, old_root);
        self.after_commit(self.weight_events(&[old_root, id]));
        Ok(committed)
    }

    /// Delete an item with everything inside it. Returns the removed items.
    pub fn delete_item(&self, id: ItemId) -> Result<Vec<Item>> {
        let (removed, old_root) = {
            let mut store = self.store.write();
            let old_root = outermost(&*store, id).ok_or_else(|| InventoryError::item_not_found(id))?;
            (store.remove_subtree(id)?, old_root)
        };
        info!("Deleted item {} ({} items removed)", id, removed.len());

        let events = if old_root.id == id {
            // The whole carried stack is gone
            vec![HookPayload {
                event: HookEvent::WeightChange,
                item: old_root,
                total_weight: 0.0,
            }]
        } else {
            self.weight_events(&[old_root.id])
        };
        self.after_commit(events);
        Ok(removed)
    }

    /// Repack every top-level item stowed in a container.
    ///
    /// Items keep their footprint unrotated. Whatever does not fit stays
    /// stowed in the container without a cell.
    pub fn auto_pack_container(&self, container: ContainerId) -> Result<PackReport> {
        let lock = self.container_lock(container);
        let _serial = lock.lock();

        let (target, candidates) = {
            let store = self.store.read();
            let target = store
                .container(container)
                .ok_or_else(|| container_not_found(container))?;
            let candidates: Vec<Item> = store
                .items_in_container(container)
                .into_iter()
                .filter(|item| !item.is_nested())
                .collect();
            (target, candidates)
        };

        let pack_items: Vec<PackItem> = candidates.iter().map(PackItem::from).collect();
        let mut grid = GridEngine::new(target.grid_width, target.grid_height);
        let packed = grid.auto_pack(&pack_items);
        let positions: HashMap<ItemId, &Packed> = packed.iter().map(|p| (p.id, p)).collect();

        let mut leftover = Vec::new();
        {
            let mut store = self.store.write();
            for candidate in &candidates {
                let still_here = store.item(candidate.id).map_or(false, |current| {
                    !current.is_nested() && current.container_id() == Some(container)
                });
                if !still_here {
                    debug!("Item {} left container {} during packing", candidate.id, container);
                    continue;
                }
                let placement = match positions.get(&candidate.id) {
                    Some(p) => Placement::InGrid(GridPosition {
                        container,
                        row: p.row,
                        col: p.col,
                        rotated: false,
                    }),
                    None => {
                        leftover.push(candidate.id);
                        Placement::Unplaced {
                            container: Some(container),
                        }
                    }
                };
                store.update_placement(candidate.id, placement)?;
            }
        }
        info!(
            "Packed container {}: {} placed, {} left over",
            container,
            packed.len(),
            leftover.len()
        );
        self.after_commit(Vec::new());

        Ok(PackReport {
            container,
            packed,
            leftover,
        })
    }

    /// Remember the current grid layout of a container under `name`
    pub fn save_loadout(&self, container: ContainerId, name: &str) -> Result<Vec<PresetEntry>> {
        let entries: Vec<PresetEntry> = {
            let store = self.store.read();
            if store.container(container).is_none() {
                return Err(container_not_found(container));
            }
            store
                .items_in_container(container)
                .iter()
                .filter_map(|item| item.grid_position().map(|pos| (item.id, pos)))
                .map(|(id, pos)| PresetEntry {
                    id,
                    row: pos.row,
                    col: pos.col,
                    rotated: pos.rotated,
                })
                .collect()
        };
        self.loadouts
            .write()
            .entry(container)
            .or_default()
            .save_preset(name, entries.clone())?;
        info!(
            "Saved loadout '{}' for container {} ({} items)",
            name.trim(),
            container,
            entries.len()
        );
        Ok(entries)
    }

    /// Restore a saved layout, all or nothing.
    ///
    /// Entries for items no longer stowed top-level in the container are
    /// skipped. Items not named by the preset keep their cells. Any conflict
    /// aborts without changing anything.
    pub fn apply_loadout(&self, container: ContainerId, name: &str) -> Result<Vec<Item>> {
        let lock = self.container_lock(container);
        let _serial = lock.lock();

        let entries = {
            let loadouts = self.loadouts.read();
            let book = loadouts.get(&container);
            if !book.map_or(false, |book| book.contains(name)) {
                return Err(InventoryError::Validation(format!(
                    "container {container} has no loadout named '{}'",
                    name.trim()
                )));
            }
            book.map(|book| book.load_preset(name)).unwrap_or_default()
        };

        let (target, stowed) = {
            let store = self.store.read();
            let target = store
                .container(container)
                .ok_or_else(|| container_not_found(container))?;
            (target, store.items_in_container(container))
        };

        let applicable: Vec<(&PresetEntry, &Item)> = entries
            .iter()
            .filter_map(|entry| {
                let item = stowed.iter().find(|item| item.id == entry.id && !item.is_nested());
                if item.is_none() {
                    debug!("Loadout '{}' skips item {}", name.trim(), entry.id);
                }
                item.map(|item| (entry, item))
            })
            .collect();

        let mut grid = GridEngine::from_occupants(
            &target,
            stowed
                .iter()
                .filter(|item| applicable.iter().all(|(entry, _)| entry.id != item.id)),
        );
        for (entry, item) in &applicable {
            grid.place(
                item.id,
                item.footprint,
                i64::from(entry.row),
                i64::from(entry.col),
                entry.rotated,
            )?;
        }

        let committed = {
            let mut store = self.store.write();
            let mut committed = Vec::with_capacity(applicable.len());
            for (entry, item) in &applicable {
                let still_here = store.item(item.id).map_or(false, |current| {
                    !current.is_nested() && current.container_id() == Some(container)
                });
                if !still_here {
                    continue;
                }
                store.update_placement(
                    item.id,
                    Placement::InGrid(GridPosition {
                        container,
                        row: entry.row,
                        col: entry.col,
                        rotated: entry.rotated,
                    }),
                )?;
                committed.extend(store.item(item.id));
            }
            committed
        };
        info!(
            "Applied loadout '{}' to container {} ({} items)",
            name.trim(),
            container,
            committed.len()
        );
        self.after_commit(Vec::new());
        Ok(committed)
    }

    /// Sum of `weight * quantity` over everything inside an item; 0 for a
    /// leaf or missing id
    pub fn subtree_weight(&self, id: ItemId) -> f64 {
        self.store.read().subtree_weight(id)
    }

    /// Weight of every item stowed in a location's containers, contents
    /// included; 0 for an unknown location
    pub fn carried_weight(&self, location: LocationId) -> f64 {
        let store = self.store.read();
        let containers: Vec<ContainerId> = store
            .containers()
            .into_iter()
            .filter(|c| c.location_id == location)
            .map(|c| c.id)
            .collect();
        store
            .items()
            .iter()
            .filter(|item| item.container_id().map_or(false, |c| containers.contains(&c)))
            .map(Item::stack_weight)
            .sum()
    }

    /// Weight of every equipped item, contents included
    pub fn equipped_weight(&self) -> f64 {
        let store = self.store.read();
        store
            .items()
            .iter()
            .filter(|item| item.equipment_slot().is_some())
            .map(|item| item.stack_weight() + store.subtree_weight(item.id))
            .sum()
    }

    fn container_lock(&self, id: ContainerId) -> Arc<Mutex<()>> {
        self.container_locks.lock().entry(id).or_default().clone()
    }

    /// Container a new top-level item is stowed in
    fn home_for_new(&self, store: &S, requested: Option<ContainerId>) -> Result<Option<ContainerId>> {
        match requested {
            Some(container) => {
                if store.container(container).is_none() {
                    return Err(container_not_found(container));
                }
                Ok(Some(container))
            }
            None => {
                let fallback = self.config.default_container;
                if store.container(fallback).is_some() {
                    Ok(Some(fallback))
                } else {
                    debug!("Default container {} does not exist, item stays loose", fallback);
                    Ok(None)
                }
            }
        }
    }

    fn weight_events(&self, ids: &[ItemId]) -> Vec<HookPayload> {
        let store = self.store.read();
        ids.iter()
            .filter_map(|&id| store.item(id))
            .map(|item| weight_payload(&*store, item))
            .collect()
    }

    /// Dispatch hooks, then tell every notifier. Called with no lock held.
    fn after_commit(&self, events: Vec<HookPayload>) {
        for payload in &events {
            self.hooks.emit(payload);
        }
        let notifiers = self.notifiers.read().clone();
        for notifier in notifiers {
            notifier.notify_changed(self);
        }
    }
}

impl<S: InventoryStore> SnapshotSource for PlacementCoordinator<S> {
    fn snapshot(&self) -> Result<InventorySnapshot> {
        let store = self.store.read();
        InventorySnapshot::build(&store.locations(), &store.containers(), &store.items())
    }
}

impl<S: InventoryStore> PlacementCoordinator<S> {
    /// Location -> container -> item tree, with equipped items listed
    /// separately together with their contents
    pub fn snapshot(&self) -> Result<InventorySnapshot> {
        SnapshotSource::snapshot(self)
    }
}

fn container_not_found(id: ContainerId) -> InventoryError {
    InventoryError::NotFound {
        kind: EntityKind::Container,
        id: id.0,
    }
}

fn ensure_top_level(item: &Item, action: &str) -> Result<()> {
    match item.parent_id {
        Some(parent) => Err(InventoryError::Validation(format!(
            "item {} is inside item {} and cannot be {action}",
            item.id, parent
        ))),
        None => Ok(()),
    }
}

/// Follow `parent_id` up to the top-level item
fn outermost<S: InventoryStore + ?Sized>(store: &S, id: ItemId) -> Option<Item> {
    let mut current = store.item(id)?;
    while let Some(parent) = current.parent_id {
        current = store.item(parent)?;
    }
    Some(current)
}

/// Stow every descendant of `id` without a cell in `home`
fn rehome_contents<S: InventoryStore + ?Sized>(
    store: &mut S,
    id: ItemId,
    home: Option<ContainerId>,
) -> Result<()> {
    for child in store.descendants(id) {
        store.update_placement(child.id, Placement::Unplaced { container: home })?;
    }
    Ok(())
}

fn weight_payload<S: InventoryStore + ?Sized>(store: &S, item: Item) -> HookPayload {
    HookPayload {
        event: HookEvent::WeightChange,
        total_weight: item.stack_weight() + store.subtree_weight(item.id),
        item,
    }
}

fn distinct_roots(a: ItemId, b: ItemId) -> Vec<ItemId> {
    if a == b {
        vec![a]
    } else {
        vec![a, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::WatchNotifier;
    use logistics_core::{ContainerKind, Footprint, LocationKind};

    const BACKPACK: ContainerId = ContainerId(1);
    const RIG: ContainerId = ContainerId(2);

    fn coordinator() -> PlacementCoordinator {
        let coordinator = PlacementCoordinator::new(MemoryStore::new(), PlacementConfig::default());
        let person = coordinator
            .add_location(NewLocation {
                name: "Mara".into(),
                kind: LocationKind::Person,
            })
            .unwrap();
        let backpack = coordinator
            .add_container(NewContainer {
                location_id: person,
                name: "Backpack".into(),
                grid_width: 10,
                grid_height: 12,
                kind: ContainerKind::Backpack,
                volume_limit: None,
            })
            .unwrap();
        let rig = coordinator
            .add_container(NewContainer {
                location_id: person,
                name: "Belt rig".into(),
                grid_width: 4,
                grid_height: 2,
                kind: ContainerKind::Rig,
                volume_limit: None,
            })
            .unwrap();
        assert_eq!((backpack, rig), (BACKPACK, RIG));
        coordinator
    }

    fn create(coordinator: &PlacementCoordinator, name: &str, w: u32, h: u32) -> ItemId {
        coordinator
            .create_item(NewItem::new(name, Footprint::new(w, h).unwrap()))
            .unwrap()
            .id
    }

    #[test]
    fn created_items_are_stowed_in_default_container() {
        let c = coordinator();
        let rope = c.create_item(NewItem::new("Rope", Footprint::new(1, 2).unwrap())).unwrap();
        assert_eq!(rope.placement, Placement::Unplaced { container: Some(BACKPACK) });

        let flare = c
            .create_item(NewItem::new("Flare", Footprint::default()).in_container(RIG))
            .unwrap();
        assert_eq!(flare.container_id(), Some(RIG));

        let err = c
            .create_item(NewItem::new("Lost", Footprint::default()).in_container(ContainerId(9)))
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { kind: EntityKind::Container, .. }));
    }

    #[test]
    fn second_equip_of_taken_slot_conflicts() {
        let c = coordinator();
        let ids: Vec<ItemId> = (1..=7).map(|n| create(&c, &format!("item-{n}"), 1, 1)).collect();
        let (five, seven) = (ids[4], ids[6]);
        assert_eq!((five, seven), (ItemId(5), ItemId(7)));

        c.equip(five, "main_hand").unwrap();
        let err = c.equip(seven, "main_hand").unwrap_err();
        assert_eq!(
            err,
            InventoryError::PlacementConflict(Conflict::SlotOccupied {
                slot: EquipmentSlot::MainHand,
                holder: five,
            })
        );
        assert_eq!(c.item(five).unwrap().equipment_slot(), Some(EquipmentSlot::MainHand));
        assert_eq!(c.item(seven).unwrap().placement, Placement::Unplaced { container: Some(BACKPACK) });

        // Re-equipping the holder is fine
        assert!(c.equip(five, "main_hand").is_ok());
    }

    #[test]
    fn equip_rejects_unknown_and_disabled_slots() {
        let store = MemoryStore::new();
        let config = PlacementConfig {
            equipment_slots: vec![EquipmentSlot::Belt],
            ..Default::default()
        };
        let c = PlacementCoordinator::new(store, config);
        let knife = c
            .create_item(NewItem::new("Knife", Footprint::default()))
            .unwrap()
            .id;
        assert!(matches!(c.equip(knife, "tail"), Err(InventoryError::Validation(_))));
        assert!(matches!(c.equip(knife, "back"), Err(InventoryError::Validation(_))));
        assert!(matches!(
            c.equip_slot(knife, EquipmentSlot::Torso),
            Err(InventoryError::Validation(_))
        ));
        assert!(c.equip(knife, "belt").is_ok());
        assert!(matches!(c.equip(ItemId(40), "belt"), Err(InventoryError::NotFound { .. })));
    }

    #[test]
    fn place_is_idempotent() {
        let c = coordinator();
        let medkit = create(&c, "Medkit", 2, 2);
        let first = c.place_in_container(medkit, BACKPACK, 3, 4, false).unwrap();
        let second = c.place_in_container(medkit, BACKPACK, 3, 4, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            second.grid_position(),
            Some(GridPosition { container: BACKPACK, row: 3, col: 4, rotated: false })
        );
    }

    #[test]
    fn overlapping_place_is_rejected_without_mutation() {
        let c = coordinator();
        let tent = create(&c, "Tent", 2, 2);
        let rifle = create(&c, "Rifle", 3, 1);
        c.place_in_container(tent, BACKPACK, 0, 0, false).unwrap();

        let before = c.item(rifle).unwrap();
        let err = c.place_in_container(rifle, BACKPACK, 1, 1, false).unwrap_err();
        assert_eq!(
            err,
            InventoryError::PlacementConflict(Conflict::Overlap { with: Some(tent) })
        );
        assert_eq!(c.item(rifle).unwrap(), before);

        let err = c.place_in_container(rifle, RIG, 0, 2, false).unwrap_err();
        assert_eq!(err, InventoryError::PlacementConflict(Conflict::OutOfBounds));
        // Rotated it would be 1x3, still too tall for a 4x2 rig
        assert!(c.place_in_container(rifle, RIG, 0, 0, true).is_err());
        assert!(c.place_in_container(rifle, RIG, 0, 1, false).is_ok());
    }

    #[test]
    fn extreme_origins_never_commit() {
        let c = coordinator();
        let knife = create(&c, "Knife", 1, 1);
        let before = c.item(knife).unwrap();
        for (row, col) in [(i64::MAX, 0), (0, i64::MAX), (i64::MIN, 0), (0, i64::MIN)] {
            for rotated in [false, true] {
                let err = c.place_in_container(knife, BACKPACK, row, col, rotated).unwrap_err();
                assert_eq!(err, InventoryError::PlacementConflict(Conflict::OutOfBounds));
            }
        }
        assert_eq!(c.item(knife).unwrap(), before);
    }

    #[test]
    fn moving_within_a_container_ignores_own_cells() {
        let c = coordinator();
        let crate_id = create(&c, "Crate", 3, 3);
        c.place_in_container(crate_id, BACKPACK, 0, 0, false).unwrap();
        let moved = c.place_in_container(crate_id, BACKPACK, 1, 1, false).unwrap();
        assert_eq!(moved.grid_position().map(|p| (p.row, p.col)), Some((1, 1)));
    }

    #[test]
    fn placement_and_equipment_are_exclusive() {
        let c = coordinator();
        let axe = create(&c, "Axe", 1, 3);
        c.place_in_container(axe, BACKPACK, 0, 0, false).unwrap();

        let equipped = c.equip(axe, "back").unwrap();
        assert_eq!(equipped.grid_position(), None);
        assert_eq!(equipped.container_id(), None);

        // Its old cells are free again
        let shovel = create(&c, "Shovel", 1, 3);
        c.place_in_container(shovel, BACKPACK, 0, 0, false).unwrap();

        let placed = c.place_in_container(axe, RIG, 0, 0, true).unwrap();
        assert_eq!(placed.equipment_slot(), None);
        let crowbar = create(&c, "Crowbar", 1, 2);
        assert!(c.equip(crowbar, "back").is_ok());
    }

    #[test]
    fn unequip_returns_item_to_default_container() {
        let c = coordinator();
        let shield = create(&c, "Shield", 2, 2);
        assert!(matches!(c.unequip(shield), Err(InventoryError::Validation(_))));

        c.equip(shield, "off_hand").unwrap();
        let back = c.unequip(shield).unwrap();
        assert_eq!(back.placement, Placement::Unplaced { container: Some(BACKPACK) });
        let dagger = create(&c, "Dagger", 1, 1);
        assert!(c.equip(dagger, "off_hand").is_ok());
    }

    #[test]
    fn nested_children_cannot_be_placed_or_equipped() {
        let c = coordinator();
        let pouch = create(&c, "Pouch", 1, 1);
        c.place_in_container(pouch, RIG, 0, 0, false).unwrap();
        let coin = c
            .create_item(NewItem::new("Coin", Footprint::default()).nested_in(pouch))
            .unwrap();
        assert_eq!(coin.parent_id, Some(pouch));
        assert_eq!(coin.placement, Placement::Unplaced { container: Some(RIG) });

        assert!(matches!(
            c.place_in_container(coin.id, BACKPACK, 0, 0, false),
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(c.equip(coin.id, "quick_1"), Err(InventoryError::Validation(_))));
    }

    #[test]
    fn create_nested_in_other_container_is_rejected() {
        let c = coordinator();
        let pouch = create(&c, "Pouch", 1, 1);
        let err = c
            .create_item(
                NewItem::new("Coin", Footprint::default())
                    .nested_in(pouch)
                    .in_container(RIG),
            )
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(c.item(ItemId(2)).is_none());
    }

    #[test]
    fn contents_follow_their_root() {
        let c = coordinator();
        let bag = create(&c, "Bag", 2, 2);
        let flask = c
            .create_item(NewItem::new("Flask", Footprint::default()).nested_in(bag))
            .unwrap()
            .id;

        c.place_in_container(bag, RIG, 0, 0, false).unwrap();
        assert_eq!(c.item(flask).unwrap().placement, Placement::Unplaced { container: Some(RIG) });

        c.equip(bag, "back").unwrap();
        assert_eq!(c.item(flask).unwrap().placement, Placement::Unplaced { container: None });

        let snapshot = c.snapshot().unwrap();
        assert_eq!(snapshot.equipped.len(), 1);
        assert!(snapshot.loose.is_empty());
        assert_eq!(snapshot.equipped[0].id(), bag);
        assert_eq!(snapshot.equipped[0].children[0].id(), flask);
        assert_eq!(snapshot.find_item(flask).map(|item| item.id), Some(flask));
        assert_eq!(snapshot.stowed_count(), 1);
        assert_eq!(snapshot.item_count(), 2);
    }

    #[test]
    fn nest_item_clears_cells_and_rehomes_subtree() {
        let c = coordinator();
        let chest = create(&c, "Chest", 3, 3);
        let box_id = create(&c, "Box", 2, 2);
        let gem = c
            .create_item(NewItem::new("Gem", Footprint::default()).nested_in(box_id))
            .unwrap()
            .id;
        c.place_in_container(chest, RIG, 0, 0, false).unwrap_err();
        c.place_in_container(chest, BACKPACK, 0, 0, false).unwrap();
        c.place_in_container(box_id, BACKPACK, 5, 5, false).unwrap();
        c.equip(gem, "quick_1").unwrap_err();

        let nested = c.nest_item(box_id, chest).unwrap();
        assert_eq!(nested.parent_id, Some(chest));
        assert_eq!(nested.placement, Placement::Unplaced { container: Some(BACKPACK) });
        assert_eq!(c.item(gem).unwrap().parent_id, Some(box_id));

        // Cells of the box are free
        let plank = create(&c, "Plank", 2, 2);
        assert!(c.place_in_container(plank, BACKPACK, 5, 5, false).is_ok());

        assert!(matches!(c.nest_item(chest, gem), Err(InventoryError::Validation(_))));
        assert!(matches!(c.nest_item(chest, chest), Err(InventoryError::Validation(_))));

        let lifted = c.unnest_item(box_id).unwrap();
        assert_eq!(lifted.parent_id, None);
        assert_eq!(lifted.placement, Placement::Unplaced { container: Some(BACKPACK) });
        assert!(matches!(c.unnest_item(box_id), Err(InventoryError::Validation(_))));
    }

    #[test]
    fn weights_roll_up() {
        let c = coordinator();
        let pack = c
            .create_item(NewItem::new("Pack", Footprint::new(2, 3).unwrap()).with_weight(1.5))
            .unwrap()
            .id;
        let rations = c
            .create_item(
                NewItem::new("Rations", Footprint::default())
                    .with_weight(0.5)
                    .with_quantity(4)
                    .nested_in(pack),
            )
            .unwrap()
            .id;
        c.create_item(NewItem::new("Salt", Footprint::default()).with_weight(0.25).nested_in(rations))
            .unwrap();

        assert!((c.subtree_weight(pack) - 2.25).abs() < 1e-9);
        assert!((c.subtree_weight(rations) - 0.25).abs() < 1e-9);
        assert_eq!(c.subtree_weight(ItemId(999)), 0.0);
        assert!((c.carried_weight(LocationId(1)) - 3.75).abs() < 1e-9);
        assert_eq!(c.carried_weight(LocationId(8)), 0.0);

        c.equip(pack, "back").unwrap();
        assert_eq!(c.carried_weight(LocationId(1)), 0.0);
        assert!((c.equipped_weight() - 3.75).abs() < 1e-9);
    }

    #[test]
    fn delete_removes_subtree_and_compacts() {
        let c = coordinator();
        let pack = create(&c, "Pack", 2, 2);
        let inner = c
            .create_item(NewItem::new("Inner", Footprint::default()).nested_in(pack))
            .unwrap()
            .id;
        let torch = create(&c, "Torch", 1, 1);

        let removed = c.delete_item(pack).unwrap();
        let ids: Vec<ItemId> = removed.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![pack, inner]);
        assert!(c.item(inner).is_none());
        assert_eq!(c.item(torch).unwrap().interval.left, 1);
        assert!(matches!(c.delete_item(pack), Err(InventoryError::NotFound { .. })));
    }

    #[test]
    fn hooks_fire_and_failures_do_not_leak() {
        let c = coordinator();
        let events = Arc::new(Mutex::new(Vec::new()));
        c.hooks().register(HookEvent::ItemCreate, |_: &HookPayload| {
            Err(anyhow::anyhow!("plugin crashed"))
        });
        for event in HookEvent::all() {
            let log = events.clone();
            c.hooks().register(*event, move |p: &HookPayload| {
                log.lock().push((p.event, p.item.id, p.total_weight));
                Ok(())
            });
        }

        let lamp = c
            .create_item(NewItem::new("Lamp", Footprint::default()).with_weight(2.0))
            .unwrap()
            .id;
        let oil = c
            .create_item(NewItem::new("Oil", Footprint::default()).with_weight(0.5).nested_in(lamp))
            .unwrap()
            .id;

        let log = events.lock().clone();
        assert_eq!(
            log,
            vec![
                (HookEvent::ItemCreate, lamp, 2.0),
                (HookEvent::WeightChange, lamp, 2.0),
                (HookEvent::ItemCreate, oil, 0.5),
                (HookEvent::WeightChange, lamp, 2.5),
            ]
        );
        assert!(c.item(oil).is_some());
    }

    #[test]
    fn watch_notifier_sees_committed_state() {
        let c = coordinator();
        let notifier = Arc::new(WatchNotifier::new());
        c.add_notifier(notifier.clone());
        let mut rx = notifier.subscribe();

        let map = create(&c, "Map", 1, 1);
        c.place_in_container(map, BACKPACK, 2, 2, false).unwrap();

        assert!(rx.has_changed().unwrap());
        let latest = rx.borrow_and_update().clone().unwrap();
        let seen = latest.find_item(map).unwrap();
        assert_eq!(seen.grid_position().map(|p| (p.row, p.col)), Some((2, 2)));

        // Failed mutations publish nothing
        c.place_in_container(map, BACKPACK, 20, 20, false).unwrap_err();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn auto_pack_commits_positions_and_leftovers() {
        let c = coordinator();
        let big = create(&c, "Big", 2, 2);
        let small = create(&c, "Small", 1, 1);
        let long = create(&c, "Long", 3, 1);
        c.place_in_container(small, BACKPACK, 11, 9, false).unwrap();

        let report = c.auto_pack_container(BACKPACK).unwrap();
        assert_eq!(report.packed[0], Packed { id: big, row: 0, col: 0 });
        assert!(report.leftover.is_empty());
        assert_eq!(c.item(small).unwrap().grid_position().map(|p| (p.row, p.col)), Some((0, 5)));
        assert_eq!(c.item(long).unwrap().grid_position().map(|p| (p.row, p.col)), Some((0, 2)));

        // The rig is 4x2: a 3x3 crate does not fit and stops packing
        let crate_id = c
            .create_item(NewItem::new("Crate", Footprint::new(3, 3).unwrap()).in_container(RIG))
            .unwrap()
            .id;
        let flare = c
            .create_item(NewItem::new("Flare", Footprint::default()).in_container(RIG))
            .unwrap()
            .id;
        let report = c.auto_pack_container(RIG).unwrap();
        assert!(report.packed.is_empty());
        assert_eq!(report.leftover, vec![crate_id, flare]);
        assert_eq!(c.item(flare).unwrap().placement, Placement::Unplaced { container: Some(RIG) });

        assert!(matches!(
            c.auto_pack_container(ContainerId(77)),
            Err(InventoryError::NotFound { .. })
        ));
    }

    #[test]
    fn loadouts_restore_layout_all_or_nothing() {
        let c = coordinator();
        let knife = create(&c, "Knife", 1, 2);
        let torch = create(&c, "Torch", 1, 1);
        c.place_in_container(knife, RIG, 0, 3, false).unwrap();
        c.place_in_container(torch, RIG, 1, 0, false).unwrap();

        let saved = c.save_loadout(RIG, "scout").unwrap();
        assert_eq!(saved.len(), 2);

        c.auto_pack_container(RIG).unwrap();
        assert_eq!(c.item(knife).unwrap().grid_position().map(|p| (p.row, p.col)), Some((0, 0)));

        let applied = c.apply_loadout(RIG, "scout").unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(c.item(knife).unwrap().grid_position().map(|p| (p.row, p.col)), Some((0, 3)));
        assert_eq!(c.item(torch).unwrap().grid_position().map(|p| (p.row, p.col)), Some((1, 0)));

        // A newcomer on the saved cells blocks the whole restore
        c.auto_pack_container(RIG).unwrap();
        let rope = c
            .create_item(NewItem::new("Rope", Footprint::default()).in_container(RIG))
            .unwrap()
            .id;
        c.place_in_container(rope, RIG, 1, 3, false).unwrap();
        let before = c.snapshot().unwrap();
        let err = c.apply_loadout(RIG, "scout").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(c.snapshot().unwrap(), before);

        assert!(matches!(c.apply_loadout(RIG, "missing"), Err(InventoryError::Validation(_))));
        assert_eq!(c.loadouts()[&RIG].load_preset("scout").len(), 2);
    }

    #[test]
    fn concurrent_placements_into_one_cell_admit_exactly_one() {
        let c = coordinator();
        let ids: Vec<ItemId> = (0..8).map(|n| create(&c, &format!("coin-{n}"), 2, 2)).collect();

        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = ids
                .iter()
                .map(|&id| {
                    let c = &c;
                    scope.spawn(move || c.place_in_container(id, BACKPACK, 4, 4, false).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        let placed = c
            .read_store(|store| store.items_in_container(BACKPACK))
            .into_iter()
            .filter(|item| item.grid_position().is_some())
            .count();
        assert_eq!(placed, 1);
    }
}
