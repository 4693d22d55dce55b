#![forbid(unsafe_code)]

//! Identifiers for walls, cases, drawers, and client sessions.
//!
//! Case and drawer ids are also the occupant ids of their parent grid, so
//! they wrap [`OccupantId`] and inherit its non-zero guarantee.

use std::fmt;

use partwall_grid::OccupantId;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

macro_rules! occupant_backed_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(OccupantId);

        impl $name {
            #[must_use]
            pub const fn new(raw: u64) -> Option<Self> {
                match OccupantId::new(raw) {
                    Some(id) => Some(Self(id)),
                    None => None,
                }
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }

            /// Occupant id of this object in its parent grid.
            #[must_use]
            pub const fn occupant(self) -> OccupantId {
                self.0
            }

            #[must_use]
            pub const fn from_occupant(id: OccupantId) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "-{}"), self.0.get())
            }
        }
    };
}

occupant_backed_id!(
    /// A wall: the top of the hierarchy, holding a growable grid of cases.
    WallId,
    "wall"
);
occupant_backed_id!(
    /// A case on a wall; also its occupant id in the wall grid.
    CaseId,
    "case"
);
occupant_backed_id!(
    /// A drawer in a case; also its occupant id in the case grid.
    DrawerId,
    "drawer"
);

/// Client session that originated a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Session used for mutations made by the host itself.
    pub const SYSTEM: Self = Self(0);
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Deterministic monotonic allocator for one id space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: OccupantId,
}

impl IdAllocator {
    /// Peek at the next ID without consuming.
    #[must_use]
    pub const fn peek(&self) -> OccupantId {
        self.next
    }

    /// Allocate the next ID and advance.
    pub fn allocate(&mut self) -> Result<OccupantId> {
        let current = self.next;
        self.next = current
            .checked_next()
            .ok_or(InventoryError::IdOverflow { last: current.get() })?;
        Ok(current)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next: OccupantId::MIN,
        }
    }
}
