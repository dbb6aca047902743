//! World save file
//!
//! Persists locations, containers, items, and loadout presets to a single
//! JSON file. A missing file is replaced by a small demo world.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use logistics_core::{Container, ContainerId, ContainerKind, Footprint, Item, Location, LocationKind};
use logistics_grid::LoadoutBook;
use logistics_placement::{
    MemoryStore, NewContainer, NewItem, NewLocation, PlacementConfig, PlacementCoordinator,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// Top-level save data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSave {
    /// Save format version (for future migration)
    pub version: u32,
    /// Human-readable timestamp
    #[serde(default)]
    pub saved_at: String,
    pub locations: Vec<Location>,
    pub containers: Vec<Container>,
    /// Items in nested-set order
    pub items: Vec<Item>,
    /// Next item id to allocate, so ids of deleted items stay retired
    #[serde(default)]
    pub next_item_id: u64,
    /// Loadout presets per container
    #[serde(default)]
    pub loadouts: BTreeMap<ContainerId, LoadoutBook>,
}

impl WorldSave {
    /// Take everything out of a coordinator for writing
    pub fn capture(coordinator: PlacementCoordinator) -> Self {
        let (store, loadouts) = coordinator.into_parts();
        let next_item_id = store.next_item_id();
        let (locations, containers, items) = store.into_parts();
        Self {
            version: SAVE_VERSION,
            saved_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            locations,
            containers,
            items,
            next_item_id,
            loadouts,
        }
    }

    /// Rebuild a coordinator, validating every reference and interval
    pub fn into_coordinator(self, config: PlacementConfig) -> Result<PlacementCoordinator> {
        if self.version > SAVE_VERSION {
            anyhow::bail!(
                "World save version {} is newer than supported version {}",
                self.version,
                SAVE_VERSION
            );
        }
        let store = MemoryStore::from_parts(self.locations, self.containers, self.items)
            .context("World save failed integrity checks")?
            .resume_item_ids(self.next_item_id);
        Ok(PlacementCoordinator::new(store, config).with_loadouts(self.loadouts))
    }
}

/// Default world file under the user data directory
pub fn default_world_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttrpg-logistics")
        .join("world.json")
}

/// Read a world save; `None` when the file does not exist
pub fn load_world(path: &Path) -> Result<Option<WorldSave>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).context("Failed to read world save")?;
    let world: WorldSave = serde_json::from_str(&json).context("Failed to deserialize world save")?;
    info!("Loaded world from {:?} ({} items)", path, world.items.len());
    Ok(Some(world))
}

/// Write a world save, creating its directory if needed
pub fn write_world(path: &Path, world: &WorldSave) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).context("Failed to create save directory")?;
    }
    let json = serde_json::to_string_pretty(world).context("Failed to serialize world save")?;
    fs::write(path, json).context("Failed to write world save")?;
    info!("Saved world to {:?}", path);
    Ok(())
}

/// A character with a packed backpack, a belt rig, and a few things on them
pub fn demo_world(config: PlacementConfig) -> Result<PlacementCoordinator> {
    let coordinator = PlacementCoordinator::new(MemoryStore::new(), config);
    let fp = |w, h| Footprint::new(w, h).context("Invalid demo footprint");

    let adventurer = coordinator.add_location(NewLocation {
        name: "Adventurer".into(),
        kind: LocationKind::Person,
    })?;
    let backpack = coordinator.add_container(NewContainer {
        location_id: adventurer,
        name: "Backpack".into(),
        grid_width: 10,
        grid_height: 12,
        kind: ContainerKind::Backpack,
        volume_limit: Some(30.0),
    })?;
    let rig = coordinator.add_container(NewContainer {
        location_id: adventurer,
        name: "Belt rig".into(),
        grid_width: 4,
        grid_height: 2,
        kind: ContainerKind::Rig,
        volume_limit: None,
    })?;

    let stowed = [
        ("Bedroll", fp(2, 3)?, 2.0, 1),
        ("Rope (50 ft)", fp(2, 2)?, 5.0, 1),
        ("Lantern", fp(1, 2)?, 1.5, 1),
        ("Waterskin", fp(1, 2)?, 1.0, 1),
        ("Rations", fp(1, 1)?, 0.5, 4),
    ];
    for (name, footprint, weight, quantity) in stowed {
        coordinator.create_item(
            NewItem::new(name, footprint)
                .with_weight(weight)
                .with_quantity(quantity)
                .in_container(backpack),
        )?;
    }
    coordinator.auto_pack_container(backpack)?;

    let pouch = coordinator.create_item(
        NewItem::new("Coin pouch", fp(1, 1)?)
            .with_weight(0.1)
            .in_container(rig),
    )?;
    coordinator.place_in_container(pouch.id, rig, 0, 0, false)?;
    coordinator.create_item(
        NewItem::new("Gold coins", fp(1, 1)?)
            .with_weight(0.02)
            .with_quantity(25)
            .nested_in(pouch.id),
    )?;

    let dagger = coordinator.create_item(NewItem::new("Dagger", fp(1, 2)?).with_weight(1.0))?;
    coordinator.equip(dagger.id, "main_hand")?;

    info!("Seeded demo world");
    Ok(coordinator)
}
