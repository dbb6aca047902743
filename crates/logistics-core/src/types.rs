//! Identifier, footprint, and interval types used throughout the engine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Unique identifier for an item within one inventory universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Unique identifier for a grid container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u64);

/// Unique identifier for a location (a character, a cabin, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Width and height of an item in grid cells, before rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    /// Create a footprint. Both sides must be positive.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InventoryError::Validation(format!(
                "footprint must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// The footprint turned 90°: width and height swap
    pub fn rotated(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Footprint actually occupied on the grid for the given rotation state
    pub fn oriented(self, rotated: bool) -> Self {
        if rotated {
            self.rotated()
        } else {
            self
        }
    }

    /// Number of cells covered
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How two nested-set intervals relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalRelation {
    /// No shared range
    Disjoint,
    /// `self` strictly contains the other interval
    Contains,
    /// The other interval strictly contains `self`
    ContainedBy,
    /// Identical bounds
    Same,
    /// The intervals cross without nesting. Never valid in a universe.
    Overlapping,
}

/// Nested-set containment interval. Invariant: `left < right`.
///
/// Item A is an ancestor of item B iff `A.left < B.left && B.right < A.right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub left: i64,
    pub right: i64,
}

impl Interval {
    /// Create an interval, rejecting `left >= right`
    pub fn new(left: i64, right: i64) -> Result<Self> {
        if left >= right {
            return Err(InventoryError::DataIntegrity(format!(
                "interval [{left}, {right}] must have left < right"
            )));
        }
        Ok(Self { left, right })
    }

    /// The interval a freshly appended leaf receives after `max_right`
    pub fn leaf_after(max_right: i64) -> Self {
        Self {
            left: max_right + 1,
            right: max_right + 2,
        }
    }

    /// Whether the bounds satisfy `left < right`
    pub fn is_well_formed(&self) -> bool {
        self.left < self.right
    }

    /// Number of integers spanned, endpoints included
    pub fn span(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Whether `other` lies strictly inside this interval
    pub fn contains(&self, other: &Interval) -> bool {
        self.left < other.left && other.right < self.right
    }

    /// Whether the given endpoint falls strictly between the bounds
    pub fn encloses_point(&self, point: i64) -> bool {
        self.left < point && point < self.right
    }

    /// Classify how `other` relates to this interval
    pub fn relation(&self, other: &Interval) -> IntervalRelation {
        if self == other {
            IntervalRelation::Same
        } else if self.contains(other) {
            IntervalRelation::Contains
        } else if other.contains(self) {
            IntervalRelation::ContainedBy
        } else if self.right < other.left || other.right < self.left {
            IntervalRelation::Disjoint
        } else {
            IntervalRelation::Overlapping
        }
    }

    /// Shift both bounds by `offset`
    pub fn shifted(self, offset: i64) -> Self {
        Self {
            left: self.left + offset,
            right: self.right + offset,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.left, self.right)
    }
}
