//! Containment model
//!
//! Owns the item table of one inventory universe and keeps the nested-set
//! encoding consistent.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use logistics_core::{InventoryError, Interval, Item, ItemId, Placement, Result};

use crate::tree::enclosing_indices;

/// Nested-set item table for one inventory universe
#[derive(Debug, Clone, Default)]
pub struct ContainmentModel {
    items: HashMap<ItemId, Item>,
    /// `left` bound -> item, for interval-ordered scans
    order: BTreeMap<i64, ItemId>,
}

impl ContainmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a universe from flat rows, validating every invariant.
    pub fn from_items<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = Item>,
    {
        let mut model = Self::new();
        for item in items {
            if model.items.contains_key(&item.id) {
                return Err(InventoryError::DataIntegrity(format!(
                    "item {} appears twice",
                    item.id
                )));
            }
            if let Some(other) = model.order.insert(item.interval.left, item.id) {
                return Err(InventoryError::DataIntegrity(format!(
                    "items {other} and {} share left bound {}",
                    item.id, item.interval.left
                )));
            }
            model.items.insert(item.id, item);
        }
        model.validate()?;
        Ok(model)
    }

    /// Check the nesting invariant, `parent_id` consistency, and that nested
    /// children are positionless and stowed with their outermost ancestor.
    pub fn validate(&self) -> Result<()> {
        let sorted: Vec<&Item> = self.iter().collect();
        let parents = enclosing_indices(&sorted)?;

        for (idx, item) in sorted.iter().enumerate() {
            let enclosing = parents[idx].map(|p| sorted[p].id);
            if enclosing != item.parent_id {
                return Err(InventoryError::DataIntegrity(format!(
                    "item {} records parent {:?} but its interval is enclosed by {:?}",
                    item.id, item.parent_id, enclosing
                )));
            }

            if enclosing.is_some() {
                let mut root = idx;
                while let Some(p) = parents[root] {
                    root = p;
                }
                let home = sorted[root].container_id();
                let stowed_with_root = matches!(
                    item.placement,
                    Placement::Unplaced { container } if container == home
                );
                if !stowed_with_root {
                    return Err(InventoryError::DataIntegrity(format!(
                        "nested item {} must be unplaced in its outermost ancestor's container",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// All items in interval (`left`) order
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.order.values().filter_map(|id| self.items.get(id))
    }

    /// Largest `right` bound in the universe, 0 when empty
    pub fn max_right(&self) -> i64 {
        self.items
            .values()
            .map(|item| item.interval.right)
            .max()
            .unwrap_or(0)
    }

    /// Append an item as a new top-level leaf.
    ///
    /// The item receives `left = max(right) + 1`, `right = left + 1` and no
    /// parent. Nesting under an existing item is `move_subtree`.
    pub fn insert_leaf(&mut self, mut item: Item) -> Result<&Item> {
        if self.items.contains_key(&item.id) {
            return Err(InventoryError::Validation(format!(
                "item {} already exists",
                item.id
            )));
        }
        item.interval = Interval::leaf_after(self.max_right());
        item.parent_id = None;

        let id = item.id;
        debug!("Inserted leaf {} at {}", id, item.interval);
        self.order.insert(item.interval.left, id);
        self.items.insert(id, item);
        self.items
            .get(&id)
            .ok_or_else(|| InventoryError::item_not_found(id))
    }

    /// Overwrite an item's position fields. The interval is untouched.
    pub fn set_placement(&mut self, id: ItemId, placement: Placement) -> Result<&Item> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| InventoryError::item_not_found(id))?;
        item.placement = placement;
        Ok(&*item)
    }

    /// Whether `ancestor` strictly contains `descendant`. False when either is missing.
    pub fn is_ancestor(&self, ancestor: ItemId, descendant: ItemId) -> bool {
        match (self.items.get(&ancestor), self.items.get(&descendant)) {
            (Some(a), Some(b)) => a.interval.contains(&b.interval),
            _ => false,
        }
    }

    /// Every item strictly inside the given item's interval, in interval
    /// order. Empty for a leaf or a missing id.
    pub fn descendants_of(&self, id: ItemId) -> Vec<&Item> {
        let Some(item) = self.items.get(&id) else {
            return Vec::new();
        };
        let interval = item.interval;
        if interval.right - interval.left < 2 {
            return Vec::new();
        }
        self.order
            .range(interval.left + 1..interval.right)
            .filter_map(|(_, child)| self.items.get(child))
            .collect()
    }

    /// Direct children, in interval order
    pub fn children_of(&self, id: ItemId) -> Vec<&Item> {
        self.descendants_of(id)
            .into_iter()
            .filter(|item| item.parent_id == Some(id))
            .collect()
    }

    /// Every item strictly containing the given item, outermost first
    pub fn ancestors_of(&self, id: ItemId) -> Vec<&Item> {
        let Some(item) = self.items.get(&id) else {
            return Vec::new();
        };
        let interval = item.interval;
        self.order
            .range(..interval.left)
            .filter_map(|(_, other)| self.items.get(other))
            .filter(|other| other.interval.contains(&interval))
            .collect()
    }

    /// Outermost ancestor, or the item itself when it is top-level
    pub fn root_of(&self, id: ItemId) -> Option<&Item> {
        self.ancestors_of(id)
            .into_iter()
            .next()
            .or_else(|| self.items.get(&id))
    }

    /// Sum `value` over every proper descendant in one interval-range pass.
    ///
    /// Returns 0 for a leaf or a missing id.
    pub fn subtree_aggregate<F>(&self, id: ItemId, value: F) -> f64
    where
        F: Fn(&Item) -> f64,
    {
        let total: f64 = self.descendants_of(id).into_iter().map(value).sum();
        debug!("Subtree aggregate for {}: {}", id, total);
        total
    }

    /// Sum `value` over every transitive descendant reached through
    /// `parent_id` references.
    ///
    /// This is the adjacency-list formulation a relational store answers
    /// with a recursive query; on well-formed data it agrees with
    /// `subtree_aggregate`.
    pub fn adjacency_aggregate<F>(&self, id: ItemId, value: F) -> f64
    where
        F: Fn(&Item) -> f64,
    {
        let mut children: HashMap<ItemId, Vec<&Item>> = HashMap::new();
        for item in self.items.values() {
            if let Some(parent) = item.parent_id {
                children.entry(parent).or_default().push(item);
            }
        }

        let mut total = 0.0;
        let mut visited = HashSet::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            for child in children.get(&current).into_iter().flatten() {
                if visited.insert(child.id) {
                    total += value(child);
                    pending.push(child.id);
                }
            }
        }
        total
    }

    /// Re-parent an item together with its whole subtree.
    ///
    /// The subtree is lifted out of the interval space, the remainder is
    /// compacted, and the subtree is reinserted as the last child of
    /// `new_parent` (or appended at the end of the universe for `None`).
    /// Every affected interval is renumbered. Moving an item under itself
    /// or one of its own descendants is rejected.
    pub fn move_subtree(&mut self, id: ItemId, new_parent: Option<ItemId>) -> Result<()> {
        let origin = self
            .items
            .get(&id)
            .ok_or_else(|| InventoryError::item_not_found(id))?
            .interval;

        if let Some(parent) = new_parent {
            let target = self
                .items
                .get(&parent)
                .ok_or_else(|| InventoryError::item_not_found(parent))?;
            if parent == id || origin.contains(&target.interval) {
                return Err(InventoryError::Validation(format!(
                    "cannot nest item {id} inside itself or its own contents"
                )));
            }
        }

        let subtree = self.subtree_ids(origin);
        let width = origin.span();

        self.shift_outside(&subtree, origin.right + 1, -width);

        let insert_at = match new_parent {
            Some(parent) => self
                .items
                .get(&parent)
                .map(|p| p.interval.right)
                .ok_or_else(|| InventoryError::item_not_found(parent))?,
            None => {
                self.items
                    .values()
                    .filter(|item| !subtree.contains(&item.id))
                    .map(|item| item.interval.right)
                    .max()
                    .unwrap_or(0)
                    + 1
            }
        };

        self.shift_outside(&subtree, insert_at, width);

        let offset = insert_at - origin.left;
        for member in &subtree {
            if let Some(item) = self.items.get_mut(member) {
                item.interval = item.interval.shifted(offset);
            }
        }
        if let Some(item) = self.items.get_mut(&id) {
            item.parent_id = new_parent;
        }

        self.reindex();
        debug!("Moved subtree of {} ({} items) under {:?}", id, subtree.len(), new_parent);
        Ok(())
    }

    /// Delete an item and all its descendants, compacting the interval space.
    ///
    /// Returns the removed items in interval order.
    pub fn remove_subtree(&mut self, id: ItemId) -> Result<Vec<Item>> {
        let origin = self
            .items
            .get(&id)
            .ok_or_else(|| InventoryError::item_not_found(id))?
            .interval;

        let subtree = self.subtree_ids(origin);
        let mut removed: Vec<Item> = subtree
            .iter()
            .filter_map(|member| self.items.remove(member))
            .collect();
        removed.sort_by_key(|item| item.interval.left);

        self.shift_outside(&subtree, origin.right + 1, -origin.span());
        self.reindex();
        debug!("Removed subtree of {} ({} items)", id, removed.len());
        Ok(removed)
    }

    /// Consume the model, yielding items in interval order
    pub fn into_items(mut self) -> Vec<Item> {
        let order = std::mem::take(&mut self.order);
        order
            .into_values()
            .filter_map(|id| self.items.remove(&id))
            .collect()
    }

    fn subtree_ids(&self, root: Interval) -> HashSet<ItemId> {
        self.order
            .range(root.left..=root.right)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Shift every endpoint `>= threshold` of items outside `excluded` by `delta`.
    fn shift_outside(&mut self, excluded: &HashSet<ItemId>, threshold: i64, delta: i64) {
        for item in self.items.values_mut() {
            if excluded.contains(&item.id) {
                continue;
            }
            if item.interval.left >= threshold {
                item.interval.left += delta;
            }
            if item.interval.right >= threshold {
                item.interval.right += delta;
            }
        }
    }

    fn reindex(&mut self) {
        self.order = self
            .items
            .values()
            .map(|item| (item.interval.left, item.id))
            .collect();
    }
}
