#![forbid(unsafe_code)]

//! Placement validator: the single authority for "is this region legal now".
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. [`Rejection::OutOfBounds`] when the grid does not contain the region.
//! 2. [`Rejection::Overlap`] when another occupant intersects the region.
//!
//! Validation has no side effects and is safe to call on every hovered cell
//! during a drag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Region};
use crate::occupancy::{OccupancyIndex, OccupantId};

/// Stable reason code for a rejected placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    OutOfBounds,
    Overlap,
}

impl RejectionCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfBounds => "out_of_bounds",
            Self::Overlap => "overlap",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate region was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Rejection {
    /// The region does not fit inside the grid bounds.
    OutOfBounds {
        region: Region,
        columns: u16,
        rows: Option<u16>,
    },
    /// The region intersects `occupant` (lowest colliding id).
    Overlap {
        region: Region,
        occupant: OccupantId,
    },
}

impl Rejection {
    #[must_use]
    pub const fn code(&self) -> RejectionCode {
        match self {
            Self::OutOfBounds { .. } => RejectionCode::OutOfBounds,
            Self::Overlap { .. } => RejectionCode::Overlap,
        }
    }

    /// The region that was refused.
    #[must_use]
    pub const fn region(&self) -> Region {
        match self {
            Self::OutOfBounds { region, .. } | Self::Overlap { region, .. } => *region,
        }
    }

    /// Colliding occupant for overlap rejections.
    #[must_use]
    pub const fn colliding_occupant(&self) -> Option<OccupantId> {
        match self {
            Self::Overlap { occupant, .. } => Some(*occupant),
            Self::OutOfBounds { .. } => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                region,
                columns,
                rows: Some(rows),
            } => write!(f, "{region} does not fit in a {columns}x{rows} grid"),
            Self::OutOfBounds {
                region,
                columns,
                rows: None,
            } => write!(f, "{region} does not fit in a {columns}-column grid"),
            Self::Overlap { region, occupant } => {
                write!(f, "{region} overlaps occupant {occupant}")
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// Validate `candidate` against the grid bounds and every other occupant.
///
/// `excluding` names the occupant being moved or resized so it does not
/// collide with its own current position.
pub fn validate(
    grid: &Grid,
    index: &OccupancyIndex,
    candidate: &Region,
    excluding: Option<OccupantId>,
) -> Result<(), Rejection> {
    if !grid.contains(candidate) {
        return Err(Rejection::OutOfBounds {
            region: *candidate,
            columns: grid.columns(),
            rows: grid.fixed_rows(),
        });
    }
    if let Some(hit) = index.collides_with_any(candidate, excluding) {
        return Err(Rejection::Overlap {
            region: *candidate,
            occupant: hit.id,
        });
    }
    Ok(())
}
