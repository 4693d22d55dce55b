#![forbid(unsafe_code)]

//! Wall → case → drawer inventory on top of `partwall-grid`.
//!
//! # Primary responsibilities
//! - **Inventory**: the authoritative hierarchy. Cases live in a wall's
//!   growable grid, drawers in a case's bounded grid, and every mutation is
//!   validated and committed in one step.
//! - **Events**: committed changes are broadcast with their origin session;
//!   [`EchoFilter`] lets a client skip echoes of its own writes.
//! - **Config**: grid defaults and the drawer-size catalog.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod inventory;
pub mod shared;

pub use config::{ConfigError, InventoryConfig};
pub use error::{InventoryError, Result};
pub use events::{EchoFilter, EventBus, InventoryChange, InventoryEvent};
pub use ids::{CaseId, DrawerId, IdAllocator, SessionId, WallId};
pub use inventory::{Case, Drawer, DrawerShape, Inventory, NewCase, Placed, Slot, Wall};
pub use shared::SharedInventory;
