//! Strap (PALS/MOLLE) attachment of pouches to vest grids

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use logistics_core::{Container, Footprint, InventoryError, Result};

/// Strap count above which a pouch is fully secured
pub const MIN_SECURE_STRAPS: usize = 3;

const FULL_INTEGRITY: f64 = 1.0;
const PARTIAL_INTEGRITY: f64 = 0.5;

/// A strap loop on the vest grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrapPoint {
    pub row: u32,
    pub col: u32,
}

impl StrapPoint {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Result of weaving a pouch onto a vest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PouchAttachment {
    pub footprint: Footprint,
    /// Distinct strap points holding the pouch
    pub strap_points: Vec<StrapPoint>,
    /// 1.0 when secured by at least `MIN_SECURE_STRAPS` points, 0.5 otherwise
    pub integrity: f64,
}

impl PouchAttachment {
    pub fn is_secure(&self) -> bool {
        self.strap_points.len() >= MIN_SECURE_STRAPS
    }
}

/// Weave a pouch onto `vest` through the given strap points.
///
/// Every point must lie on the vest grid and the pouch must fit the vest in
/// some orientation. Repeated points count once.
pub fn attach_pouch(pouch: Footprint, vest: &Container, points: &[StrapPoint]) -> Result<PouchAttachment> {
    if points.is_empty() {
        return Err(InventoryError::Validation(
            "a pouch needs at least one strap point".into(),
        ));
    }

    let fits = |fp: Footprint| fp.width <= vest.grid_width && fp.height <= vest.grid_height;
    if !fits(pouch) && !fits(pouch.rotated()) {
        return Err(InventoryError::Validation(format!(
            "pouch {pouch} does not fit vest {} ({}x{})",
            vest.id, vest.grid_width, vest.grid_height
        )));
    }

    if let Some(point) = points
        .iter()
        .find(|p| p.row >= vest.grid_height || p.col >= vest.grid_width)
    {
        return Err(InventoryError::Validation(format!(
            "strap point ({}, {}) is outside vest {} ({}x{})",
            point.row, point.col, vest.id, vest.grid_width, vest.grid_height
        )));
    }

    let strap_points: Vec<StrapPoint> = points
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let integrity = if strap_points.len() >= MIN_SECURE_STRAPS {
        FULL_INTEGRITY
    } else {
        PARTIAL_INTEGRITY
    };

    Ok(PouchAttachment {
        footprint: pouch,
        strap_points,
        integrity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use logistics_core::{ContainerId, ContainerKind, LocationId};

    fn vest() -> Container {
        Container {
            id: ContainerId(4),
            location_id: LocationId(1),
            name: "Plate carrier".into(),
            grid_width: 8,
            grid_height: 6,
            kind: ContainerKind::Rig,
            volume_limit: None,
        }
    }

    fn pouch() -> Footprint {
        Footprint::new(2, 1).unwrap()
    }

    #[test]
    fn two_straps_hold_partially() {
        let points = [StrapPoint::new(0, 0), StrapPoint::new(1, 0)];
        let attached = attach_pouch(pouch(), &vest(), &points).unwrap();
        assert_eq!(attached.integrity, 0.5);
        assert!(!attached.is_secure());
    }

    #[test]
    fn three_straps_hold_fully() {
        let points = [StrapPoint::new(0, 0), StrapPoint::new(1, 0), StrapPoint::new(2, 0)];
        let attached = attach_pouch(pouch(), &vest(), &points).unwrap();
        assert_eq!(attached.integrity, 1.0);
        assert!(attached.is_secure());
    }

    #[test]
    fn repeated_points_count_once() {
        let points = [StrapPoint::new(0, 0), StrapPoint::new(0, 0), StrapPoint::new(1, 0)];
        let attached = attach_pouch(pouch(), &vest(), &points).unwrap();
        assert_eq!(attached.strap_points.len(), 2);
        assert_eq!(attached.integrity, 0.5);
    }

    #[test]
    fn no_points_is_rejected() {
        let err = attach_pouch(pouch(), &vest(), &[]).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn point_off_the_vest_is_rejected() {
        let points = [StrapPoint::new(0, 0), StrapPoint::new(6, 0)];
        let err = attach_pouch(pouch(), &vest(), &points).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(err.to_string().contains("(6, 0)"));
    }

    #[test]
    fn oversized_pouch_is_rejected() {
        let huge = Footprint::new(9, 7).unwrap();
        let err = attach_pouch(huge, &vest(), &[StrapPoint::new(0, 0)]).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        // Fits once turned
        let tall = Footprint::new(1, 8).unwrap();
        assert!(attach_pouch(tall, &vest(), &[StrapPoint::new(0, 0)]).is_ok());
    }
}
