#![forbid(unsafe_code)]

//! Free-slot search.
//!
//! Scans row-major, top-to-bottom then left-to-right, and returns the first
//! top-left cell whose region passes [`validate`]. The order matches the
//! visual reading order of the grid, so repeated calls over the same occupant
//! set always pick the same slot.
//!
//! For growable grids the scan runs one row past the deepest occupant, where
//! any width that fits the columns fits unless the region would run past
//! [`MAX_GROWABLE_ROW`](crate::grid::MAX_GROWABLE_ROW). Bounded grids return
//! `None` once every candidate is exhausted; that is a "no room" outcome, not
//! an error.

use crate::grid::{Grid, Region};
use crate::occupancy::OccupancyIndex;
use crate::placement::validate;

/// First free region of `width`×`height` cells, in reading order.
#[must_use]
pub fn find_first_fit(
    grid: &Grid,
    index: &OccupancyIndex,
    width: u16,
    height: u16,
) -> Option<Region> {
    if width == 0 || height == 0 || width > grid.columns() {
        return None;
    }
    if index.is_empty() {
        let origin = Region::new(1, 1, width, height);
        return grid.contains(&origin).then_some(origin);
    }

    let last_column = grid.columns() - width + 1;
    let last_row = match grid.fixed_rows() {
        Some(rows) if height > rows => return None,
        Some(rows) => u32::from(rows - height + 1),
        None => grid.effective_row_count(index),
    };

    for row in 1..=last_row {
        let Ok(row) = u16::try_from(row) else {
            break;
        };
        for column in 1..=last_column {
            let candidate = Region::new(column, row, width, height);
            if validate(grid, index, &candidate, None).is_ok() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MAX_GROWABLE_ROW;
    use crate::occupancy::{Occupant, OccupantId};

    fn id(raw: u64) -> OccupantId {
        OccupantId::new(raw).unwrap()
    }

    #[test]
    fn empty_growable_grid_starts_at_origin() {
        let grid = Grid::growable(6).unwrap();
        assert_eq!(
            find_first_fit(&grid, &OccupancyIndex::new(), 3, 2),
            Some(Region::new(1, 1, 3, 2))
        );
    }

    #[test]
    fn picks_first_free_cell_in_reading_order() {
        let grid = Grid::bounded(4, 4).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::cell(1, 1)));
        index.add(Occupant::new(id(2), Region::cell(2, 1)));
        assert_eq!(find_first_fit(&grid, &index, 1, 1), Some(Region::cell(3, 1)));
    }

    #[test]
    fn skips_rows_that_cannot_hold_the_width() {
        let grid = Grid::bounded(4, 3).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::cell(2, 1)));
        index.add(Occupant::new(id(2), Region::cell(3, 2)));
        assert_eq!(
            find_first_fit(&grid, &index, 2, 1),
            Some(Region::new(3, 1, 2, 1))
        );
        assert_eq!(
            find_first_fit(&grid, &index, 3, 1),
            Some(Region::new(1, 3, 3, 1))
        );
    }

    #[test]
    fn full_bounded_grid_has_no_slot() {
        let grid = Grid::bounded(3, 2).unwrap();
        let mut index = OccupancyIndex::new();
        let mut next = 1;
        for row in 1..=2 {
            for column in 1..=3 {
                index.add(Occupant::new(id(next), Region::cell(column, row)));
                next += 1;
            }
        }
        assert_eq!(find_first_fit(&grid, &index, 1, 1), None);
    }

    #[test]
    fn growable_grid_extends_past_last_occupant() {
        let grid = Grid::growable(2).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 2, 3)));
        assert_eq!(
            find_first_fit(&grid, &index, 2, 2),
            Some(Region::new(1, 4, 2, 2))
        );
    }

    #[test]
    fn growable_grid_reuses_gaps_before_growing() {
        let grid = Grid::growable(3).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 1, 2)));
        index.add(Occupant::new(id(2), Region::new(1, 3, 3, 1)));
        assert_eq!(
            find_first_fit(&grid, &index, 2, 2),
            Some(Region::new(2, 1, 2, 2))
        );
    }

    #[test]
    fn growable_grid_runs_out_at_the_last_addressable_row() {
        let wall = Grid::growable(1).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 1, MAX_GROWABLE_ROW - 1)));
        assert_eq!(
            find_first_fit(&wall, &index, 1, 1),
            Some(Region::cell(1, MAX_GROWABLE_ROW))
        );
        assert_eq!(find_first_fit(&wall, &index, 1, 2), None);

        index.update(id(1), Region::new(1, 1, 1, MAX_GROWABLE_ROW));
        assert_eq!(find_first_fit(&wall, &index, 1, 1), None);
    }

    #[test]
    fn impossible_sizes_return_none() {
        let grid = Grid::bounded(4, 4).unwrap();
        let index = OccupancyIndex::new();
        assert_eq!(find_first_fit(&grid, &index, 0, 1), None);
        assert_eq!(find_first_fit(&grid, &index, 1, 0), None);
        assert_eq!(find_first_fit(&grid, &index, 5, 1), None);
        assert_eq!(find_first_fit(&grid, &index, 1, 5), None);
        let wall = Grid::growable(4).unwrap();
        assert_eq!(find_first_fit(&wall, &index, 5, 1), None);
    }

    #[test]
    fn repeated_calls_are_stable() {
        let grid = Grid::bounded(5, 5).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 3, 2)));
        let first = find_first_fit(&grid, &index, 2, 2);
        let second = find_first_fit(&grid, &index, 2, 2);
        assert_eq!(first, second);
        assert_eq!(first, Some(Region::new(4, 1, 2, 2)));
    }
}
