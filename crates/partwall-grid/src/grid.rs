#![forbid(unsafe_code)]

//! Grid model: bounded and growable grids plus the [`Region`] placement unit.
//!
//! Coordinates are 1-based. A region's edges are inclusive cell indices, so a
//! region at column 3 with width 2 covers columns 3 and 4.
//!
//! # Invariants
//!
//! 1. Every grid has at least one column; a bounded grid has at least one row.
//! 2. A growable grid never stores a row count. Its effective row count is
//!    derived from its occupants and is never below 2.
//! 3. Edge arithmetic is widened to `u32`, so no `u16` coordinate overflows.
//! 4. A growable grid still ends at row [`MAX_GROWABLE_ROW`]: every cell a
//!    region covers must be addressable as a `u16` row.
//!
//! # Failure Modes
//!
//! - Constructing a grid with a zero dimension returns
//!   [`GridError::InvalidDimension`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::occupancy::OccupancyIndex;

/// Minimum effective row count reported for an empty growable grid.
pub const MIN_GROWABLE_ROWS: u32 = 2;

/// Last row a region may cover in a growable grid.
pub const MAX_GROWABLE_ROW: u16 = u16::MAX;

/// Axis of a grid dimension, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAxis {
    Columns,
    Rows,
}

impl GridAxis {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Rows => "rows",
        }
    }
}

/// Error raised when a grid is built with unusable bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    InvalidDimension { axis: GridAxis, value: u16 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { axis, value } => {
                write!(f, "grid {} must be at least 1 (got {value})", axis.as_str())
            }
        }
    }
}

impl std::error::Error for GridError {}

/// How a grid bounds its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum RowBound {
    /// Fixed row count (a case's internal drawer grid).
    Fixed(u16),
    /// Rows grow to fit occupants (a wall's case grid).
    Growable,
}

/// A 2D integer coordinate space with 1-based indices.
///
/// Only constructible through the checked constructors; snapshots rebuild
/// grids via [`Grid::with_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    columns: u16,
    rows: RowBound,
}

impl Grid {
    /// Grid with a fixed number of columns and rows.
    pub fn bounded(columns: u16, rows: u16) -> Result<Self, GridError> {
        check_dimension(GridAxis::Columns, columns)?;
        check_dimension(GridAxis::Rows, rows)?;
        Ok(Self {
            columns,
            rows: RowBound::Fixed(rows),
        })
    }

    /// Grid with a fixed number of columns whose rows grow with its occupants.
    pub fn growable(columns: u16) -> Result<Self, GridError> {
        check_dimension(GridAxis::Columns, columns)?;
        Ok(Self {
            columns,
            rows: RowBound::Growable,
        })
    }

    /// Build a grid from an optional row bound (`None` means growable).
    pub fn with_rows(columns: u16, rows: Option<u16>) -> Result<Self, GridError> {
        match rows {
            Some(rows) => Self::bounded(columns, rows),
            None => Self::growable(columns),
        }
    }

    #[must_use]
    pub const fn columns(&self) -> u16 {
        self.columns
    }

    #[must_use]
    pub const fn row_bound(&self) -> RowBound {
        self.rows
    }

    /// Fixed row count, or `None` for a growable grid.
    #[must_use]
    pub const fn fixed_rows(&self) -> Option<u16> {
        match self.rows {
            RowBound::Fixed(rows) => Some(rows),
            RowBound::Growable => None,
        }
    }

    #[must_use]
    pub const fn is_growable(&self) -> bool {
        matches!(self.rows, RowBound::Growable)
    }

    /// Row count the grid currently spans.
    ///
    /// Bounded grids report their configured rows. Growable grids report
    /// `max(bottom edge) + 1` so there is always one empty row band below
    /// the last occupant.
    #[must_use]
    pub fn effective_row_count(&self, index: &OccupancyIndex) -> u32 {
        match self.rows {
            RowBound::Fixed(rows) => u32::from(rows),
            RowBound::Growable => {
                let deepest = index
                    .iter()
                    .map(|occupant| occupant.region.bottom_edge())
                    .max()
                    .unwrap_or(0);
                (deepest + 1).max(MIN_GROWABLE_ROWS)
            }
        }
    }

    /// Whether `region` lies entirely inside the grid.
    #[must_use]
    pub fn contains(&self, region: &Region) -> bool {
        if region.column < 1 || region.row < 1 || region.is_empty() {
            return false;
        }
        if region.right_edge() > u32::from(self.columns) {
            return false;
        }
        match self.rows {
            RowBound::Fixed(rows) => region.bottom_edge() <= u32::from(rows),
            RowBound::Growable => region.bottom_edge() <= u32::from(MAX_GROWABLE_ROW),
        }
    }
}

fn check_dimension(axis: GridAxis, value: u16) -> Result<(), GridError> {
    if value == 0 {
        return Err(GridError::InvalidDimension { axis, value });
    }
    Ok(())
}

/// A rectangle of grid cells: top-left cell plus a span in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left edge (1-based, inclusive).
    pub column: u16,
    /// Top edge (1-based, inclusive).
    pub row: u16,
    /// Span in columns.
    #[serde(alias = "widthUnits", alias = "width_units")]
    pub width: u16,
    /// Span in rows.
    #[serde(alias = "heightUnits", alias = "height_units")]
    pub height: u16,
}

impl Region {
    #[inline]
    #[must_use]
    pub const fn new(column: u16, row: u16, width: u16, height: u16) -> Self {
        Self {
            column,
            row,
            width,
            height,
        }
    }

    /// A 1×1 region at the given cell.
    #[inline]
    #[must_use]
    pub const fn cell(column: u16, row: u16) -> Self {
        Self::new(column, row, 1, 1)
    }

    /// Rightmost covered column (inclusive).
    #[inline]
    #[must_use]
    pub const fn right_edge(&self) -> u32 {
        (self.column as u32 + self.width as u32).saturating_sub(1)
    }

    /// Bottom covered row (inclusive).
    #[inline]
    #[must_use]
    pub const fn bottom_edge(&self) -> u32 {
        (self.row as u32 + self.height as u32).saturating_sub(1)
    }

    /// Check if the region spans zero cells.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area in cells.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Whether the cell `(column, row)` is covered by the region.
    #[inline]
    #[must_use]
    pub const fn covers(&self, column: u16, row: u16) -> bool {
        !self.is_empty()
            && column >= self.column
            && (column as u32) <= self.right_edge()
            && row >= self.row
            && (row as u32) <= self.bottom_edge()
    }

    /// Same size, new top-left corner.
    #[inline]
    #[must_use]
    pub const fn moved_to(self, column: u16, row: u16) -> Self {
        Self::new(column, row, self.width, self.height)
    }

    /// Same top-left corner, new size.
    #[inline]
    #[must_use]
    pub const fn resized_to(self, width: u16, height: u16) -> Self {
        Self::new(self.column, self.row, width, height)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.column, self.row
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::{Occupant, OccupantId};

    fn id(raw: u64) -> OccupantId {
        OccupantId::new(raw).unwrap()
    }

    #[test]
    fn bounded_rejects_zero_columns() {
        let err = Grid::bounded(0, 4).unwrap_err();
        assert_eq!(
            err,
            GridError::InvalidDimension {
                axis: GridAxis::Columns,
                value: 0
            }
        );
    }

    #[test]
    fn bounded_rejects_zero_rows() {
        let err = Grid::bounded(4, 0).unwrap_err();
        assert!(matches!(
            err,
            GridError::InvalidDimension {
                axis: GridAxis::Rows,
                ..
            }
        ));
        assert_eq!(err.to_string(), "grid rows must be at least 1 (got 0)");
    }

    #[test]
    fn growable_rejects_zero_columns() {
        assert!(Grid::growable(0).is_err());
    }

    #[test]
    fn with_rows_picks_bound() {
        assert!(Grid::with_rows(3, None).unwrap().is_growable());
        assert_eq!(Grid::with_rows(3, Some(5)).unwrap().fixed_rows(), Some(5));
    }

    #[test]
    fn region_edges_are_inclusive() {
        let region = Region::new(3, 2, 2, 3);
        assert_eq!(region.right_edge(), 4);
        assert_eq!(region.bottom_edge(), 4);
        assert_eq!(region.area(), 6);
        assert!(region.covers(4, 4));
        assert!(!region.covers(5, 4));
        assert!(!region.covers(2, 2));
    }

    #[test]
    fn region_edges_do_not_overflow() {
        let region = Region::new(u16::MAX, u16::MAX, u16::MAX, u16::MAX);
        assert_eq!(region.right_edge(), u32::from(u16::MAX) * 2 - 1);
    }

    #[test]
    fn contains_checks_every_edge() {
        let grid = Grid::bounded(4, 6).unwrap();
        assert!(grid.contains(&Region::new(1, 1, 4, 6)));
        assert!(grid.contains(&Region::new(3, 5, 2, 2)));
        assert!(!grid.contains(&Region::new(3, 6, 2, 2)));
        assert!(!grid.contains(&Region::new(4, 1, 2, 1)));
        assert!(!grid.contains(&Region::new(0, 1, 1, 1)));
        assert!(!grid.contains(&Region::new(1, 0, 1, 1)));
        assert!(!grid.contains(&Region::new(1, 1, 5, 1)));
    }

    #[test]
    fn contains_rejects_empty_regions() {
        let grid = Grid::bounded(4, 4).unwrap();
        assert!(!grid.contains(&Region::new(1, 1, 0, 1)));
        assert!(!grid.contains(&Region::new(1, 1, 1, 0)));
    }

    #[test]
    fn growable_contains_ignores_rows() {
        let grid = Grid::growable(3).unwrap();
        assert!(grid.contains(&Region::new(1, 500, 3, 40)));
        assert!(!grid.contains(&Region::new(2, 1, 3, 1)));
    }

    #[test]
    fn growable_rows_stop_at_the_last_addressable_row() {
        let grid = Grid::growable(1).unwrap();
        assert!(grid.contains(&Region::new(1, 1, 1, u16::MAX)));
        assert!(grid.contains(&Region::cell(1, MAX_GROWABLE_ROW)));
        assert!(!grid.contains(&Region::new(1, 2, 1, u16::MAX)));
        assert!(!grid.contains(&Region::new(1, MAX_GROWABLE_ROW, 1, 2)));
    }

    #[test]
    fn empty_growable_grid_shows_two_rows() {
        let grid = Grid::growable(4).unwrap();
        assert_eq!(grid.effective_row_count(&OccupancyIndex::new()), 2);
    }

    #[test]
    fn growable_rows_follow_deepest_occupant() {
        let grid = Grid::growable(4).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 1, 1)));
        assert_eq!(grid.effective_row_count(&index), 2);
        index.add(Occupant::new(id(2), Region::new(2, 3, 1, 2)));
        assert_eq!(grid.effective_row_count(&index), 5);
    }

    #[test]
    fn bounded_rows_ignore_occupants() {
        let grid = Grid::bounded(4, 6).unwrap();
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 1, 1)));
        assert_eq!(grid.effective_row_count(&index), 6);
    }

    #[test]
    fn row_bound_serializes_with_kind_tag() {
        let grid = Grid::bounded(4, 6).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r#"{"columns":4,"rows":{"kind":"fixed","rows":6}}"#);
        let wall = Grid::growable(8).unwrap();
        let json = serde_json::to_string(&wall).unwrap();
        assert_eq!(json, r#"{"columns":8,"rows":{"kind":"growable"}}"#);
    }

    #[test]
    fn region_accepts_unit_aliases() {
        let region: Region =
            serde_json::from_str(r#"{"column":2,"row":3,"widthUnits":2,"heightUnits":1}"#)
                .unwrap();
        assert_eq!(region, Region::new(2, 3, 2, 1));
    }
}
