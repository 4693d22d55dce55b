#![forbid(unsafe_code)]

//! Grid placement and collision engine for walls, cases, and drawers.
//!
//! # Role in partwall
//! `partwall-grid` is the geometry kernel. It knows nothing about walls or
//! drawers as inventory objects; it validates rectangles against a grid and
//! against each other. The same engine governs cases on a wall (growable
//! rows) and drawers inside a case (bounded rows).
//!
//! # Primary responsibilities
//! - **Grid / Region**: 1-based coordinate space and placement rectangles.
//! - **OccupancyIndex**: who occupies what, with collision queries.
//! - **validate**: bounds then overlap, with a typed [`Rejection`].
//! - **find_first_fit**: deterministic row-major free-slot search.
//! - **Impact analysis**: advisory shrink reports and move/resize checks.
//! - **Roles**: a speculative client-side checker and an authoritative
//!   committer that share the same validation code.
//! - **Templates**: named case layouts, and matching labels found in a
//!   photo of a case to the drawers a template plans.
//!
//! # How it fits in the system
//! `partwall-inventory` owns the wall → case → drawer hierarchy and keeps one
//! [`AuthoritativeValidator`] per grid. `partwall-doctor` runs the pure
//! functions here against JSON snapshots.

pub mod grid;
pub mod impact;
pub mod logging;
pub mod occupancy;
pub mod placement;
pub mod roles;
pub mod search;
pub mod snapshot;
pub mod template;

pub use grid::{Grid, GridAxis, GridError, MAX_GROWABLE_ROW, MIN_GROWABLE_ROWS, Region, RowBound};
pub use impact::{
    ShrinkImpact, impact_of_grid_change, impact_of_grid_shrink, impact_of_occupant_change,
};
pub use occupancy::{OccupancyIndex, Occupant, OccupantId, overlaps};
pub use placement::{Rejection, RejectionCode, validate};
pub use roles::{
    AuthoritativeValidator, PlacementError, PlacementFailure, PlacementOperation,
    PlacementOperationKind, PlacementOutcome, SpeculativeValidator,
};
pub use search::find_first_fit;
pub use snapshot::{
    GRID_SNAPSHOT_SCHEMA_VERSION, GridInvariantCode, GridInvariantIssue, GridInvariantReport,
    GridSnapshot, OccupantRecord, SnapshotError,
};
pub use template::{
    DetectedLabel, DrawerSize, DrawerSizeCatalog, LABEL_MARGIN_RATIO, LabelAssignment,
    LayoutTemplate, PixelBounds, TemplateDrawer, TemplateError, TemplatePlan, TemplateSummary,
    find_template_by_name, summarize_templates,
};
