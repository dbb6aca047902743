//! Extension hooks
//!
//! Named lifecycle events dispatched to registered handlers after a mutation
//! commits. A failing or panicking handler is logged and skipped; it never
//! affects the mutation or the handlers after it.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use logistics_core::{InventoryError, Item};

/// Lifecycle events a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HookEvent {
    #[serde(rename = "onItemCreate")]
    ItemCreate,
    #[serde(rename = "onWeightChange")]
    WeightChange,
}

impl HookEvent {
    pub fn all() -> &'static [HookEvent] {
        &[Self::ItemCreate, Self::WeightChange]
    }

    /// Name handlers register against
    pub fn name(self) -> &'static str {
        match self {
            Self::ItemCreate => "onItemCreate",
            Self::WeightChange => "onWeightChange",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HookEvent {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|event| event.name() == s)
            .ok_or_else(|| InventoryError::Validation(format!("unknown hook event '{s}'")))
    }
}

/// Data handed to a handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookPayload {
    pub event: HookEvent,
    /// The affected item as committed (or as removed, for deletions)
    pub item: Item,
    /// The item's own stack weight plus everything inside it
    pub total_weight: f64,
}

/// A hook handler. Closures taking `&HookPayload` implement this.
pub trait HookHandler: Send + Sync {
    fn handle(&self, payload: &HookPayload) -> anyhow::Result<()>;
}

impl<F> HookHandler for F
where
    F: Fn(&HookPayload) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, payload: &HookPayload) -> anyhow::Result<()> {
        (self)(payload)
    }
}

/// Handlers grouped by event, each list in registration order
#[derive(Default)]
pub struct HookRegistry {
    handlers: RwLock<HashMap<HookEvent, Vec<Arc<dyn HookHandler>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closure handler for `event`
    pub fn register<F>(&self, event: HookEvent, handler: F)
    where
        F: Fn(&HookPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_handler(event, handler);
    }

    /// Append any handler for `event`
    pub fn register_handler<H: HookHandler + 'static>(&self, event: HookEvent, handler: H) {
        self.handlers
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Append a closure handler by event name (`onItemCreate`, `onWeightChange`)
    pub fn register_named<F>(&self, name: &str, handler: F) -> logistics_core::Result<()>
    where
        F: Fn(&HookPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let event: HookEvent = name.parse()?;
        self.register(event, handler);
        Ok(())
    }

    pub fn handler_count(&self, event: HookEvent) -> usize {
        self.handlers.read().get(&event).map_or(0, Vec::len)
    }

    /// Invoke every handler of the payload's event in registration order.
    /// Returns how many handlers succeeded.
    pub fn emit(&self, payload: &HookPayload) -> usize {
        // Snapshot so handlers may register further hooks without deadlocking
        let handlers: Vec<Arc<dyn HookHandler>> = self
            .handlers
            .read()
            .get(&payload.event)
            .cloned()
            .unwrap_or_default();

        let mut succeeded = 0;
        for (idx, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(payload))) {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => warn!(
                    "Hook handler #{} for {} on item {} failed: {:#}",
                    idx, payload.event, payload.item.id, e
                ),
                Err(_) => warn!(
                    "Hook handler #{} for {} on item {} panicked",
                    idx, payload.event, payload.item.id
                ),
            }
        }
        debug!(
            "Dispatched {} to {}/{} handlers",
            payload.event,
            succeeded,
            handlers.len()
        );
        succeeded
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut map = f.debug_map();
        for event in HookEvent::all() {
            map.entry(event, &handlers.get(event).map_or(0, Vec::len));
        }
        map.finish()
    }
}
