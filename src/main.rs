//! TTRPG Logistics - grid inventory manager
//!
//! Command-line front end over the placement coordinator. Every command
//! loads the world save, runs one operation, prints the result as JSON, and
//! writes the save back when something changed.

mod save;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use logistics_core::{ContainerId, Footprint, ItemId, LocationId};
use logistics_grid::{attach_pouch, StrapPoint};
use logistics_placement::{HookEvent, InventoryStore, NewItem, PlacementConfig, PlacementCoordinator};

use crate::save::{default_world_path, demo_world, load_world, write_world, WorldSave};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "logistics")]
#[command(about = "Grid inventory, containment, and loadout manager", long_about = None)]
struct Cli {
    /// World save file
    #[arg(long, global = true)]
    world: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the location -> container -> item tree
    Snapshot,
    /// Create an item, stowed without a cell
    Create {
        name: String,
        #[arg(long, default_value_t = 1)]
        width: u32,
        #[arg(long, default_value_t = 1)]
        height: u32,
        /// Weight of one unit
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// Container to stow in; the configured default when omitted
        #[arg(long)]
        container: Option<u64>,
        /// Item to nest the new item inside
        #[arg(long)]
        parent: Option<u64>,
    },
    /// Put an item on a container grid
    Place {
        item: u64,
        container: u64,
        #[arg(allow_negative_numbers = true)]
        row: i64,
        #[arg(allow_negative_numbers = true)]
        col: i64,
        #[arg(long)]
        rotated: bool,
    },
    /// Move an item into an equipment slot
    Equip { item: u64, slot: String },
    /// Take an item out of its slot
    Unequip { item: u64 },
    /// Put an item inside another item
    Nest { item: u64, parent: u64 },
    /// Take a nested item out to the top level
    Unnest { item: u64 },
    /// Delete an item and everything inside it
    Delete { item: u64 },
    /// Repack a container, largest items first
    Pack { container: u64 },
    /// Weight of an item's contents
    Weight { item: u64 },
    /// Weight stowed across a location's containers, plus equipped weight
    Carried { location: u64 },
    /// Check where a pouch could be strapped onto a vest
    Strap {
        /// Vest container
        container: u64,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Strap point as `row,col`, repeatable
        #[arg(long = "point", value_parser = parse_point)]
        points: Vec<StrapPoint>,
    },
    /// Named container layouts
    Loadout {
        #[command(subcommand)]
        action: LoadoutAction,
    },
    /// Print the effective settings
    Settings {
        /// Also write them to the settings file in use
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum LoadoutAction {
    /// Remember the current layout of a container
    Save { container: u64, name: String },
    /// Restore a remembered layout
    Apply { container: u64, name: String },
    /// List layouts saved for a container
    List { container: u64 },
}

impl Command {
    /// Whether the command can change the world
    fn mutates(&self) -> bool {
        match self {
            Command::Snapshot
            | Command::Weight { .. }
            | Command::Carried { .. }
            | Command::Strap { .. }
            | Command::Settings { .. } => false,
            Command::Loadout { action } => !matches!(action, LoadoutAction::List { .. }),
            _ => true,
        }
    }
}

fn parse_point(s: &str) -> Result<StrapPoint, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got '{s}'"))?;
    let row = row.trim().parse().map_err(|e| format!("bad row '{row}': {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("bad col '{col}': {e}"))?;
    Ok(StrapPoint::new(row, col))
}

#[derive(Serialize)]
struct WeightReport {
    item: ItemId,
    contents: f64,
}

#[derive(Serialize)]
struct CarriedReport {
    location: LocationId,
    stowed: f64,
    equipped: f64,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

/// Load the world save, seeding the demo world when there is none
fn open_world(path: &Path, config: PlacementConfig) -> Result<(PlacementCoordinator, bool)> {
    match load_world(path)? {
        Some(world) => Ok((world.into_coordinator(config)?, false)),
        None => {
            info!("No world save at {:?}, seeding demo world", path);
            Ok((demo_world(config)?, true))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings decide the log level, so their own warnings go to a
    // temporary stderr subscriber
    let bootstrap = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let settings = tracing::subscriber::with_default(bootstrap, || Settings::load(cli.config.as_deref()));
    init_logging(&settings.logging.level)?;

    if let Command::Settings { write } = cli.command {
        if write {
            settings.save(cli.config.as_deref())?;
        }
        return print_json(&settings);
    }

    let world_path = cli
        .world
        .clone()
        .or_else(|| settings.storage.save_file.clone())
        .unwrap_or_else(default_world_path);
    let (coordinator, seeded) = open_world(&world_path, settings.placement.clone())?;

    coordinator.hooks().register(HookEvent::WeightChange, |payload| {
        debug!(
            "Item {} '{}' now weighs {:.2} with contents",
            payload.item.id, payload.item.name, payload.total_weight
        );
        Ok(())
    });

    let mutates = cli.command.mutates();
    run(&coordinator, cli.command)?;

    if mutates || seeded {
        write_world(&world_path, &WorldSave::capture(coordinator))?;
    }
    Ok(())
}

fn run(coordinator: &PlacementCoordinator, command: Command) -> Result<()> {
    match command {
        Command::Snapshot => print_json(&coordinator.snapshot()?),
        Command::Create {
            name,
            width,
            height,
            weight,
            quantity,
            container,
            parent,
        } => {
            let mut new = NewItem::new(name, Footprint::new(width, height)?)
                .with_weight(weight)
                .with_quantity(quantity);
            new.container = container.map(ContainerId);
            new.parent = parent.map(ItemId);
            print_json(&coordinator.create_item(new)?)
        }
        Command::Place {
            item,
            container,
            row,
            col,
            rotated,
        } => print_json(&coordinator.place_in_container(
            ItemId(item),
            ContainerId(container),
            row,
            col,
            rotated,
        )?),
        Command::Equip { item, slot } => print_json(&coordinator.equip(ItemId(item), &slot)?),
        Command::Unequip { item } => print_json(&coordinator.unequip(ItemId(item))?),
        Command::Nest { item, parent } => {
            print_json(&coordinator.nest_item(ItemId(item), ItemId(parent))?)
        }
        Command::Unnest { item } => print_json(&coordinator.unnest_item(ItemId(item))?),
        Command::Delete { item } => print_json(&coordinator.delete_item(ItemId(item))?),
        Command::Pack { container } => {
            print_json(&coordinator.auto_pack_container(ContainerId(container))?)
        }
        Command::Weight { item } => print_json(&WeightReport {
            item: ItemId(item),
            contents: coordinator.subtree_weight(ItemId(item)),
        }),
        Command::Carried { location } => print_json(&CarriedReport {
            location: LocationId(location),
            stowed: coordinator.carried_weight(LocationId(location)),
            equipped: coordinator.equipped_weight(),
        }),
        Command::Strap {
            container,
            width,
            height,
            points,
        } => {
            let vest = coordinator
                .read_store(|store| store.container(ContainerId(container)))
                .with_context(|| format!("Container {container} not found"))?;
            let attachment = attach_pouch(Footprint::new(width, height)?, &vest, &points)?;
            print_json(&attachment)
        }
        Command::Loadout { action } => match action {
            LoadoutAction::Save { container, name } => {
                print_json(&coordinator.save_loadout(ContainerId(container), &name)?)
            }
            LoadoutAction::Apply { container, name } => {
                print_json(&coordinator.apply_loadout(ContainerId(container), &name)?)
            }
            LoadoutAction::List { container } => {
                let names: Vec<String> = coordinator
                    .loadouts()
                    .get(&ContainerId(container))
                    .map(|book| book.names().map(str::to_string).collect())
                    .unwrap_or_default();
                print_json(&names)
            }
        },
        Command::Settings { .. } => Ok(()),
    }
}
