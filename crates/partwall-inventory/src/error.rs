use partwall_grid::{GridError, PlacementError, TemplateError};
use thiserror::Error;

use crate::ids::{CaseId, DrawerId, WallId};

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("wall not found: {0}")]
    UnknownWall(WallId),

    #[error("case not found: {0}")]
    UnknownCase(CaseId),

    #[error("drawer not found: {0}")]
    UnknownDrawer(DrawerId),

    #[error("{wall} still holds {cases} case(s)")]
    WallNotEmpty { wall: WallId, cases: usize },

    #[error("unknown drawer size: {name}")]
    UnknownDrawerSize { name: String },

    #[error("id space exhausted after {last}")]
    IdOverflow { last: u64 },

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl InventoryError {
    /// Stable code for structured logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownWall(_) => "unknown_wall",
            Self::UnknownCase(_) => "unknown_case",
            Self::UnknownDrawer(_) => "unknown_drawer",
            Self::WallNotEmpty { .. } => "wall_not_empty",
            Self::UnknownDrawerSize { .. } => "unknown_drawer_size",
            Self::IdOverflow { .. } => "id_overflow",
            Self::Placement(err) => err.reason.code(),
            Self::Template(_) => "template_rejected",
            Self::Grid(_) => "invalid_dimension",
        }
    }

    /// Whether the refusal came from the grid engine rather than a lookup.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Placement(_) | Self::Template(_) | Self::Grid(_))
    }
}
