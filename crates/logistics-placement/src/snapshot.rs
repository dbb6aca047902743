//! Read model: the location -> container -> item tree

use std::collections::BTreeMap;

use serde::Serialize;

use logistics_containment::{build_forest, ItemNode};
use logistics_core::{Container, ContainerId, Item, ItemId, Location, LocationId, Result};

/// One container with the forest of items stowed in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerNode {
    #[serde(flatten)]
    pub container: Container,
    pub items: Vec<ItemNode>,
}

/// One location with its containers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationNode {
    #[serde(flatten)]
    pub location: Location,
    pub containers: Vec<ContainerNode>,
}

/// Full inventory view handed to presentation and observers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub tree: Vec<LocationNode>,
    /// Equipped items in slot order, each with its contents
    pub equipped: Vec<ItemNode>,
    /// Top-level items stowed nowhere, with their contents
    pub loose: Vec<ItemNode>,
}

impl InventorySnapshot {
    /// Assemble the view from flat rows.
    ///
    /// Contents of equipped items are attached to them and left out of
    /// `loose`. Fails with `DataIntegrity` when the intervals of any
    /// subset do not nest.
    pub fn build(locations: &[Location], containers: &[Container], items: &[Item]) -> Result<Self> {
        let mut by_container: BTreeMap<ContainerId, Vec<&Item>> = BTreeMap::new();
        let mut loose = Vec::new();
        let mut equipped_roots: Vec<&Item> = Vec::new();

        for item in items {
            if item.equipment_slot().is_some() {
                equipped_roots.push(item);
            } else if let Some(container) = item.container_id() {
                by_container.entry(container).or_default().push(item);
            } else {
                loose.push(item);
            }
        }
        equipped_roots.sort_by_key(|item| item.equipment_slot());

        let mut equipped = Vec::with_capacity(equipped_roots.len());
        for root in equipped_roots {
            let span = root.interval;
            let (contents, rest): (Vec<&Item>, Vec<&Item>) =
                loose.into_iter().partition(|item| span.contains(&item.interval));
            loose = rest;
            equipped.extend(build_forest(std::iter::once(root).chain(contents))?);
        }

        let mut by_location: BTreeMap<LocationId, Vec<ContainerNode>> = BTreeMap::new();
        for container in containers {
            let stowed = by_container.remove(&container.id).unwrap_or_default();
            by_location
                .entry(container.location_id)
                .or_default()
                .push(ContainerNode {
                    container: container.clone(),
                    items: build_forest(stowed)?,
                });
        }

        let tree = locations
            .iter()
            .map(|location| LocationNode {
                location: location.clone(),
                containers: by_location.remove(&location.id).unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            tree,
            equipped,
            loose: build_forest(loose)?,
        })
    }

    pub fn container(&self, id: ContainerId) -> Option<&ContainerNode> {
        self.tree
            .iter()
            .flat_map(|location| location.containers.iter())
            .find(|node| node.container.id == id)
    }

    /// Find an item anywhere in the view
    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.tree
            .iter()
            .flat_map(|location| location.containers.iter())
            .find_map(|node| find_in(&node.items, id))
            .or_else(|| find_in(&self.equipped, id))
            .or_else(|| find_in(&self.loose, id))
    }

    /// Number of items in the view that do not hold an equipment slot,
    /// contents of equipped items included
    pub fn stowed_count(&self) -> usize {
        let containers: usize = self
            .tree
            .iter()
            .flat_map(|location| location.containers.iter())
            .flat_map(|node| node.items.iter())
            .map(ItemNode::size)
            .sum();
        let carried: usize = self.equipped.iter().map(|node| node.size() - 1).sum();
        containers + carried + self.loose.iter().map(ItemNode::size).sum::<usize>()
    }

    /// Number of items in the view, equipped ones included
    pub fn item_count(&self) -> usize {
        self.stowed_count() + self.equipped.len()
    }
}

fn find_in(forest: &[ItemNode], id: ItemId) -> Option<&Item> {
    forest
        .iter()
        .find_map(|node| node.find(id))
        .map(|node| &node.item)
}
