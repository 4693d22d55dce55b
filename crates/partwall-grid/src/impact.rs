#![forbid(unsafe_code)]

//! Resize/move impact analysis.
//!
//! Shrinking a grid and moving an occupant are deliberately asymmetric. A
//! shrink never evicts or repositions anything: [`impact_of_grid_shrink`]
//! only reports which occupants would fall outside the new bounds and leaves
//! the decision to the caller. An occupant change is checked exactly like a
//! placement, with the occupant excluded from its own collision test.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Region};
use crate::occupancy::{OccupancyIndex, OccupantId};
use crate::placement::{Rejection, validate};

/// Advisory report of occupants invalidated by a proposed grid shrink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkImpact {
    pub affected_ids: BTreeSet<OccupantId>,
    pub count: usize,
}

impl ShrinkImpact {
    /// Return true if no occupant is affected.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.count == 0
    }
}

/// Which occupants would sit outside a grid of `new_columns` × `new_rows`.
///
/// `new_rows = None` means the rows are unbounded (a growable grid), so only
/// the column bound applies.
#[must_use]
pub fn impact_of_grid_shrink(
    new_columns: u16,
    new_rows: Option<u16>,
    index: &OccupancyIndex,
) -> ShrinkImpact {
    let affected_ids: BTreeSet<OccupantId> = index
        .iter()
        .filter(|occupant| {
            let region = occupant.region;
            region.right_edge() > u32::from(new_columns)
                || new_rows.is_some_and(|rows| region.bottom_edge() > u32::from(rows))
        })
        .map(|occupant| occupant.id)
        .collect();
    ShrinkImpact {
        count: affected_ids.len(),
        affected_ids,
    }
}

/// Impact of replacing `grid` with `target` over the same occupants.
#[must_use]
pub fn impact_of_grid_change(target: &Grid, index: &OccupancyIndex) -> ShrinkImpact {
    impact_of_grid_shrink(target.columns(), target.fixed_rows(), index)
}

/// Validate moving or resizing `occupant` to `proposed`.
pub fn impact_of_occupant_change(
    occupant: OccupantId,
    proposed: &Region,
    grid: &Grid,
    index: &OccupancyIndex,
) -> Result<(), Rejection> {
    validate(grid, index, proposed, Some(occupant))
}
