#![forbid(unsafe_code)]

//! The two trust roles the engine runs in.
//!
//! - [`SpeculativeValidator`] answers questions against a cached, possibly
//!   stale snapshot. Its verdicts drive drag highlighting and button states
//!   and are never final.
//! - [`AuthoritativeValidator`] owns the committed occupant set. Every
//!   mutation goes through [`AuthoritativeValidator::apply_operation`], which
//!   validates and commits in one synchronous call. On failure the committed
//!   state is untouched.
//!
//! Both roles delegate to the same validator, search, and impact functions,
//! so a verdict can only differ when the speculative snapshot is stale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, GridError, Region};
use crate::impact::{ShrinkImpact, impact_of_grid_change, impact_of_grid_shrink};
use crate::occupancy::{OccupancyIndex, Occupant, OccupantId};
use crate::placement::{Rejection, validate};
use crate::search::find_first_fit;
use crate::snapshot::{GridSnapshot, SnapshotError};

#[cfg(feature = "tracing")]
use crate::logging::{debug, trace};
#[cfg(not(feature = "tracing"))]
use crate::{debug, trace};

// ---------------------------------------------------------------------------
// Speculative role
// ---------------------------------------------------------------------------

/// Client-side validator over a cached snapshot.
#[derive(Debug, Clone)]
pub struct SpeculativeValidator {
    grid: Grid,
    index: OccupancyIndex,
    generation: u64,
}

impl SpeculativeValidator {
    /// Build from an authoritative snapshot taken at `generation`.
    pub fn from_snapshot(snapshot: GridSnapshot, generation: u64) -> Result<Self, SnapshotError> {
        let (grid, index) = snapshot.into_parts()?;
        Ok(Self {
            grid,
            index,
            generation,
        })
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub const fn index(&self) -> &OccupancyIndex {
        &self.index
    }

    /// Whether the cache lags behind the authoritative `generation`.
    #[must_use]
    pub const fn is_stale(&self, authoritative_generation: u64) -> bool {
        self.generation < authoritative_generation
    }

    /// Replace the cache with a newer snapshot.
    ///
    /// Returns `Ok(false)` and keeps the current cache when `generation` is
    /// not newer than the cached one (an out-of-order delivery).
    pub fn resync(
        &mut self,
        snapshot: GridSnapshot,
        generation: u64,
    ) -> Result<bool, SnapshotError> {
        if generation <= self.generation {
            return Ok(false);
        }
        let (grid, index) = snapshot.into_parts()?;
        self.grid = grid;
        self.index = index;
        self.generation = generation;
        Ok(true)
    }

    pub fn validate(
        &self,
        candidate: &Region,
        excluding: Option<OccupantId>,
    ) -> Result<(), Rejection> {
        validate(&self.grid, &self.index, candidate, excluding)
    }

    #[must_use]
    pub fn find_first_fit(&self, width: u16, height: u16) -> Option<Region> {
        find_first_fit(&self.grid, &self.index, width, height)
    }

    #[must_use]
    pub fn impact_of_grid_shrink(&self, new_columns: u16, new_rows: Option<u16>) -> ShrinkImpact {
        impact_of_grid_shrink(new_columns, new_rows, &self.index)
    }

    /// Occupant under the pointer, for hover feedback.
    #[must_use]
    pub fn occupant_at(&self, column: u16, row: u16) -> Option<Occupant> {
        self.index.occupant_at(column, row)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// One mutation request against an authoritative grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlacementOperation {
    /// Place a new occupant at an explicit region.
    Place { occupant: OccupantId, region: Region },
    /// Place a new occupant at the first free slot of the given size.
    PlaceFirstFit {
        occupant: OccupantId,
        width: u16,
        height: u16,
    },
    /// Translate an occupant; its size is unchanged.
    Move {
        occupant: OccupantId,
        column: u16,
        row: u16,
    },
    /// Change an occupant's size; its top-left cell is unchanged.
    Resize {
        occupant: OccupantId,
        width: u16,
        height: u16,
    },
    /// Replace an occupant's region (size and top-left may both change).
    Reshape { occupant: OccupantId, region: Region },
    /// Remove an occupant.
    Remove { occupant: OccupantId },
    /// Change the grid bounds. Refused while any occupant would fall outside.
    ResizeGrid { columns: u16, rows: Option<u16> },
}

impl PlacementOperation {
    #[must_use]
    pub const fn kind(&self) -> PlacementOperationKind {
        match self {
            Self::Place { .. } => PlacementOperationKind::Place,
            Self::PlaceFirstFit { .. } => PlacementOperationKind::PlaceFirstFit,
            Self::Move { .. } => PlacementOperationKind::Move,
            Self::Resize { .. } => PlacementOperationKind::Resize,
            Self::Reshape { .. } => PlacementOperationKind::Reshape,
            Self::Remove { .. } => PlacementOperationKind::Remove,
            Self::ResizeGrid { .. } => PlacementOperationKind::ResizeGrid,
        }
    }

    /// Occupant the operation targets, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<OccupantId> {
        match self {
            Self::Place { occupant, .. }
            | Self::PlaceFirstFit { occupant, .. }
            | Self::Move { occupant, .. }
            | Self::Resize { occupant, .. }
            | Self::Reshape { occupant, .. }
            | Self::Remove { occupant } => Some(*occupant),
            Self::ResizeGrid { .. } => None,
        }
    }
}

/// Stable operation kind for journaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOperationKind {
    Place,
    PlaceFirstFit,
    Move,
    Resize,
    Reshape,
    Remove,
    ResizeGrid,
}

impl PlacementOperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::PlaceFirstFit => "place_first_fit",
            Self::Move => "move",
            Self::Resize => "resize",
            Self::Reshape => "reshape",
            Self::Remove => "remove",
            Self::ResizeGrid => "resize_grid",
        }
    }
}

/// Successful committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    pub operation_id: u64,
    pub kind: PlacementOperationKind,
    pub occupant: Option<OccupantId>,
    /// Region the occupant holds after the operation (`None` for removals
    /// and grid resizes).
    pub region: Option<Region>,
    pub before_hash: u64,
    pub after_hash: u64,
    pub generation: u64,
}

/// Structured reasons for a refused operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementFailure {
    Rejected(Rejection),
    NoFreeSlot { width: u16, height: u16 },
    MissingOccupant { occupant: OccupantId },
    DuplicateOccupant { occupant: OccupantId },
    GridShrinkBlocked(ShrinkImpact),
    InvalidDimension(GridError),
}

impl PlacementFailure {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.code().as_str(),
            Self::NoFreeSlot { .. } => "no_free_slot",
            Self::MissingOccupant { .. } => "missing_occupant",
            Self::DuplicateOccupant { .. } => "duplicate_occupant",
            Self::GridShrinkBlocked(_) => "grid_shrink_blocked",
            Self::InvalidDimension(_) => "invalid_dimension",
        }
    }
}

impl fmt::Display for PlacementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "placement rejected: {rejection}"),
            Self::NoFreeSlot { width, height } => {
                write!(f, "no free {width}x{height} slot")
            }
            Self::MissingOccupant { occupant } => write!(f, "occupant {occupant} not found"),
            Self::DuplicateOccupant { occupant } => {
                write!(f, "occupant {occupant} is already placed")
            }
            Self::GridShrinkBlocked(impact) => write!(
                f,
                "grid resize would leave {} occupant(s) out of bounds",
                impact.count
            ),
            Self::InvalidDimension(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PlacementFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::InvalidDimension(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure payload for [`AuthoritativeValidator::apply_operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementError {
    pub operation_id: u64,
    pub kind: PlacementOperationKind,
    pub occupant: Option<OccupantId>,
    pub state_hash: u64,
    pub reason: PlacementFailure,
}

impl PlacementError {
    /// The placement rejection behind this error, if that is the cause.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match &self.reason {
            PlacementFailure::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operation {} failed: {} (state_hash={:#x})",
            self.kind.as_str(),
            self.operation_id,
            self.reason,
            self.state_hash
        )
    }
}

impl std::error::Error for PlacementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

// ---------------------------------------------------------------------------
// Authoritative role
// ---------------------------------------------------------------------------

/// Server-side owner of one grid's committed occupant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritativeValidator {
    grid: Grid,
    index: OccupancyIndex,
    generation: u64,
}

impl AuthoritativeValidator {
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            index: OccupancyIndex::new(),
            generation: 0,
        }
    }

    /// Load persisted state committed at `generation`, refusing snapshots
    /// that break grid invariants.
    ///
    /// The generation must be the one the state was persisted at. Clients
    /// only resync to strictly newer generations, so restarting from 0 would
    /// leave every cached client stale without knowing it.
    pub fn from_snapshot(snapshot: GridSnapshot, generation: u64) -> Result<Self, SnapshotError> {
        let (grid, index) = snapshot.into_parts()?;
        Ok(Self {
            grid,
            index,
            generation,
        })
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub const fn index(&self) -> &OccupancyIndex {
        &self.index
    }

    /// Number of committed operations.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::capture(&self.grid, &self.index)
    }

    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.snapshot().state_hash()
    }

    /// A speculative copy of the committed state for a client.
    #[must_use]
    pub fn speculative(&self) -> SpeculativeValidator {
        SpeculativeValidator {
            grid: self.grid,
            index: self.index.clone(),
            generation: self.generation,
        }
    }

    /// Dry-run a placement against the committed state.
    pub fn validate(
        &self,
        candidate: &Region,
        excluding: Option<OccupantId>,
    ) -> Result<(), Rejection> {
        validate(&self.grid, &self.index, candidate, excluding)
    }

    /// Advisory shrink report against the committed state.
    #[must_use]
    pub fn impact_of_grid_shrink(&self, new_columns: u16, new_rows: Option<u16>) -> ShrinkImpact {
        impact_of_grid_shrink(new_columns, new_rows, &self.index)
    }

    /// Validate and commit one operation.
    ///
    /// Validation and the write happen in this call with nothing in between,
    /// so a second request always validates against the already-updated
    /// state. On error `self` is unchanged.
    pub fn apply_operation(
        &mut self,
        operation_id: u64,
        operation: PlacementOperation,
    ) -> Result<PlacementOutcome, PlacementError> {
        let kind = operation.kind();
        let before_hash = self.state_hash();
        trace!(operation_id, kind = kind.as_str(), "applying placement operation");

        let region = match self.apply_inner(operation) {
            Ok(region) => region,
            Err(reason) => {
                debug!(
                    operation_id,
                    kind = kind.as_str(),
                    reason = %reason,
                    "placement operation refused"
                );
                return Err(PlacementError {
                    operation_id,
                    kind,
                    occupant: operation.occupant(),
                    state_hash: before_hash,
                    reason,
                });
            }
        };

        self.generation += 1;
        let after_hash = self.state_hash();
        debug!(
            operation_id,
            kind = kind.as_str(),
            generation = self.generation,
            "placement operation committed"
        );
        Ok(PlacementOutcome {
            operation_id,
            kind,
            occupant: operation.occupant(),
            region,
            before_hash,
            after_hash,
            generation: self.generation,
        })
    }

    fn apply_inner(
        &mut self,
        operation: PlacementOperation,
    ) -> Result<Option<Region>, PlacementFailure> {
        match operation {
            PlacementOperation::Place { occupant, region } => {
                self.ensure_absent(occupant)?;
                self.commit_new(occupant, region).map(Some)
            }
            PlacementOperation::PlaceFirstFit {
                occupant,
                width,
                height,
            } => {
                self.ensure_absent(occupant)?;
                let region = find_first_fit(&self.grid, &self.index, width, height)
                    .ok_or(PlacementFailure::NoFreeSlot { width, height })?;
                self.commit_new(occupant, region).map(Some)
            }
            PlacementOperation::Move {
                occupant,
                column,
                row,
            } => {
                let current = self.current(occupant)?;
                self.commit_change(occupant, current.moved_to(column, row))
                    .map(Some)
            }
            PlacementOperation::Resize {
                occupant,
                width,
                height,
            } => {
                let current = self.current(occupant)?;
                self.commit_change(occupant, current.resized_to(width, height))
                    .map(Some)
            }
            PlacementOperation::Reshape { occupant, region } => {
                self.current(occupant)?;
                self.commit_change(occupant, region).map(Some)
            }
            PlacementOperation::Remove { occupant } => {
                self.index
                    .remove(occupant)
                    .ok_or(PlacementFailure::MissingOccupant { occupant })?;
                Ok(None)
            }
            PlacementOperation::ResizeGrid { columns, rows } => {
                let target =
                    Grid::with_rows(columns, rows).map_err(PlacementFailure::InvalidDimension)?;
                let impact = impact_of_grid_change(&target, &self.index);
                if !impact.is_clear() {
                    return Err(PlacementFailure::GridShrinkBlocked(impact));
                }
                self.grid = target;
                Ok(None)
            }
        }
    }

    fn ensure_absent(&self, occupant: OccupantId) -> Result<(), PlacementFailure> {
        if self.index.contains_id(occupant) {
            return Err(PlacementFailure::DuplicateOccupant { occupant });
        }
        Ok(())
    }

    fn current(&self, occupant: OccupantId) -> Result<Region, PlacementFailure> {
        self.index
            .get(occupant)
            .ok_or(PlacementFailure::MissingOccupant { occupant })
    }

    fn commit_new(
        &mut self,
        occupant: OccupantId,
        region: Region,
    ) -> Result<Region, PlacementFailure> {
        validate(&self.grid, &self.index, &region, None).map_err(PlacementFailure::Rejected)?;
        self.index.add(Occupant::new(occupant, region));
        Ok(region)
    }

    fn commit_change(
        &mut self,
        occupant: OccupantId,
        region: Region,
    ) -> Result<Region, PlacementFailure> {
        validate(&self.grid, &self.index, &region, Some(occupant))
            .map_err(PlacementFailure::Rejected)?;
        self.index.update(occupant, region);
        Ok(region)
    }
}
