#![forbid(unsafe_code)]

//! Grid snapshots: the inbound contract between persistence and the engine.
//!
//! A [`GridSnapshot`] carries grid dimensions plus every occupant as plain
//! numbers. Field names follow the persisted shape (`widthUnits` and
//! `heightUnits` are accepted as aliases).
//!
//! # Invariants checked by [`GridSnapshot::invariant_report`]
//!
//! 1. Schema version is supported.
//! 2. Column count (and row count, when bounded) is at least 1.
//! 3. Occupant ids are non-zero and unique.
//! 4. Every occupant lies inside the grid.
//! 5. No two occupants overlap.
//!
//! [`GridSnapshot::into_parts`] refuses any snapshot that reports an error.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, GridError, Region};
use crate::occupancy::{OccupancyIndex, Occupant, OccupantId, overlaps};

/// Current grid snapshot schema version.
pub const GRID_SNAPSHOT_SCHEMA_VERSION: u16 = 1;

fn default_schema_version() -> u16 {
    GRID_SNAPSHOT_SCHEMA_VERSION
}

/// One occupant as stored by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantRecord {
    pub id: u64,
    pub column: u16,
    pub row: u16,
    #[serde(alias = "widthUnits")]
    pub width_units: u16,
    #[serde(alias = "heightUnits")]
    pub height_units: u16,
}

impl OccupantRecord {
    #[must_use]
    pub const fn region(&self) -> Region {
        Region::new(self.column, self.row, self.width_units, self.height_units)
    }
}

impl From<Occupant> for OccupantRecord {
    fn from(occupant: Occupant) -> Self {
        Self {
            id: occupant.id.get(),
            column: occupant.region.column,
            row: occupant.region.row,
            width_units: occupant.region.width,
            height_units: occupant.region.height,
        }
    }
}

/// Serializable view of one grid and its occupants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    #[serde(alias = "columnCount")]
    pub columns: u16,
    /// Fixed row count; absent for a growable grid.
    #[serde(default, alias = "rowCount")]
    pub rows: Option<u16>,
    #[serde(default)]
    pub occupants: Vec<OccupantRecord>,
}

impl GridSnapshot {
    /// Capture the current state of a grid.
    #[must_use]
    pub fn capture(grid: &Grid, index: &OccupancyIndex) -> Self {
        Self {
            schema_version: GRID_SNAPSHOT_SCHEMA_VERSION,
            columns: grid.columns(),
            rows: grid.fixed_rows(),
            occupants: index.iter().map(OccupantRecord::from).collect(),
        }
    }

    /// Canonicalize occupant order for deterministic hashing and output.
    pub fn canonicalize(&mut self) {
        self.occupants.sort_by_key(|record| record.id);
    }

    /// Deterministic structural hash of the canonical snapshot.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut canonical = self.clone();
        canonical.canonicalize();
        snapshot_state_hash(&canonical)
    }

    /// Collect every invariant violation in the snapshot.
    #[must_use]
    pub fn invariant_report(&self) -> GridInvariantReport {
        let mut issues = Vec::new();

        if self.schema_version != GRID_SNAPSHOT_SCHEMA_VERSION {
            issues.push(GridInvariantIssue {
                code: GridInvariantCode::UnsupportedSchemaVersion,
                occupant: None,
                related_occupant: None,
                message: format!(
                    "unsupported schema version {} (expected {})",
                    self.schema_version, GRID_SNAPSHOT_SCHEMA_VERSION
                ),
            });
        }

        let grid = match Grid::with_rows(self.columns, self.rows) {
            Ok(grid) => Some(grid),
            Err(err) => {
                issues.push(GridInvariantIssue {
                    code: GridInvariantCode::InvalidDimension,
                    occupant: None,
                    related_occupant: None,
                    message: err.to_string(),
                });
                None
            }
        };

        let mut seen = BTreeSet::new();
        let mut placed: Vec<(u64, Region)> = Vec::with_capacity(self.occupants.len());
        for record in &self.occupants {
            if record.id == 0 {
                issues.push(GridInvariantIssue {
                    code: GridInvariantCode::ZeroOccupantId,
                    occupant: Some(record.id),
                    related_occupant: None,
                    message: "occupant id 0 is reserved".to_string(),
                });
                continue;
            }
            if !seen.insert(record.id) {
                issues.push(GridInvariantIssue {
                    code: GridInvariantCode::DuplicateOccupantId,
                    occupant: Some(record.id),
                    related_occupant: None,
                    message: format!("occupant id {} appears more than once", record.id),
                });
                continue;
            }
            let region = record.region();
            if let Some(grid) = grid
                && !grid.contains(&region)
            {
                issues.push(GridInvariantIssue {
                    code: GridInvariantCode::OutOfBounds,
                    occupant: Some(record.id),
                    related_occupant: None,
                    message: format!("occupant {} at {region} lies outside the grid", record.id),
                });
            }
            for (other_id, other) in &placed {
                if overlaps(other, &region) {
                    issues.push(GridInvariantIssue {
                        code: GridInvariantCode::Overlap,
                        occupant: Some(record.id),
                        related_occupant: Some(*other_id),
                        message: format!(
                            "occupant {} at {region} overlaps occupant {other_id} at {other}",
                            record.id
                        ),
                    });
                }
            }
            placed.push((record.id, region));
        }

        GridInvariantReport {
            snapshot_hash: self.state_hash(),
            issues,
        }
    }

    /// Rebuild the grid and occupancy index, refusing invalid snapshots.
    pub fn into_parts(self) -> Result<(Grid, OccupancyIndex), SnapshotError> {
        let report = self.invariant_report();
        if report.has_errors() {
            return Err(SnapshotError::Invalid(report));
        }
        let grid = Grid::with_rows(self.columns, self.rows).map_err(SnapshotError::Grid)?;
        let index = self
            .occupants
            .iter()
            .filter_map(|record| {
                OccupantId::new(record.id).map(|id| Occupant::new(id, record.region()))
            })
            .collect();
        Ok((grid, index))
    }
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridInvariantCode {
    UnsupportedSchemaVersion,
    InvalidDimension,
    ZeroOccupantId,
    DuplicateOccupantId,
    OutOfBounds,
    Overlap,
}

/// One actionable invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridInvariantIssue {
    pub code: GridInvariantCode,
    pub occupant: Option<u64>,
    pub related_occupant: Option<u64>,
    pub message: String,
}

/// Structured invariant report over a grid snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridInvariantReport {
    pub snapshot_hash: u64,
    pub issues: Vec<GridInvariantIssue>,
}

impl GridInvariantReport {
    /// Return true if any finding exists. Every finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Distinct finding codes, ordered.
    #[must_use]
    pub fn codes(&self) -> Vec<GridInvariantCode> {
        self.issues
            .iter()
            .map(|issue| issue.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Failure to turn a snapshot into engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Grid(GridError),
    Invalid(GridInvariantReport),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(err) => write!(f, "invalid grid: {err}"),
            Self::Invalid(report) => write!(
                f,
                "snapshot violates grid invariants: {:?} (hash={:#x}, issues={})",
                report.codes(),
                report.snapshot_hash,
                report.issues.len()
            ),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Grid(err) = self {
            return Some(err);
        }
        None
    }
}

fn snapshot_state_hash(snapshot: &GridSnapshot) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
        for byte in bytes {
            mix(hash, *byte);
        }
    }

    fn mix_u16(hash: &mut u64, value: u16) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    let mut hash = OFFSET_BASIS;
    mix_u16(&mut hash, snapshot.schema_version);
    mix_u16(&mut hash, snapshot.columns);
    match snapshot.rows {
        Some(rows) => {
            mix(&mut hash, 1);
            mix_u16(&mut hash, rows);
        }
        None => mix(&mut hash, 0),
    }
    mix_u64(&mut hash, snapshot.occupants.len() as u64);
    for record in &snapshot.occupants {
        mix_u64(&mut hash, record.id);
        mix_u16(&mut hash, record.column);
        mix_u16(&mut hash, record.row);
        mix_u16(&mut hash, record.width_units);
        mix_u16(&mut hash, record.height_units);
    }
    hash
}
