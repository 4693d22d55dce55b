#![forbid(unsafe_code)]

//! Wall → case → drawer hierarchy.
//!
//! Each wall owns an [`AuthoritativeValidator`] over a growable grid whose
//! occupants are its cases; each case owns one over a bounded grid whose
//! occupants are its drawers. Every geometric mutation is a single
//! `apply_operation` call, so it either commits or leaves the inventory as
//! it was.
//!
//! # Invariants
//!
//! 1. A case id is present in exactly one wall grid and in `cases`.
//! 2. A drawer id is present in exactly one case grid and in `drawers`.
//! 3. Events are published only after a commit, one per mutation.
//!
//! # Failure Modes
//!
//! - Lookups of unknown ids fail before anything is touched.
//! - Refused placements surface as [`InventoryError::Placement`] carrying the
//!   engine's reason and the unchanged state hash.
//! - Refused requests may still consume an id; ids are never reused.

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

use partwall_grid::{
    AuthoritativeValidator, Grid, GridSnapshot, LayoutTemplate, OccupantId, PlacementOperation,
    Region, ShrinkImpact, SpeculativeValidator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};
use crate::events::{EventBus, InventoryChange, InventoryEvent};
use crate::ids::{CaseId, DrawerId, IdAllocator, SessionId, WallId};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Where to put a new case or drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Slot {
    /// Explicit top-left cell.
    At { column: u16, row: u16 },
    /// First free region in reading order.
    FirstFit,
}

impl Slot {
    fn operation(self, occupant: OccupantId, width: u16, height: u16) -> PlacementOperation {
        match self {
            Self::At { column, row } => PlacementOperation::Place {
                occupant,
                region: Region::new(column, row, width, height),
            },
            Self::FirstFit => PlacementOperation::PlaceFirstFit {
                occupant,
                width,
                height,
            },
        }
    }
}

/// Drawer footprint: free-form units or a catalog size name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawerShape {
    Units { width: u16, height: u16 },
    Named(String),
}

/// A case to place on a wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    pub name: String,
    /// Footprint on the wall grid.
    pub width: u16,
    pub height: u16,
    /// Internal drawer grid; configured defaults when absent.
    #[serde(default)]
    pub grid_columns: Option<u16>,
    #[serde(default)]
    pub grid_rows: Option<u16>,
}

impl NewCase {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            grid_columns: None,
            grid_rows: None,
        }
    }

    #[must_use]
    pub fn with_grid(mut self, columns: u16, rows: u16) -> Self {
        self.grid_columns = Some(columns);
        self.grid_rows = Some(rows);
        self
    }
}

/// A committed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placed<I> {
    pub id: I,
    pub region: Region,
}

// ---------------------------------------------------------------------------
// Hierarchy nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Wall {
    id: WallId,
    name: String,
    cases: AuthoritativeValidator,
}

impl Wall {
    #[must_use]
    pub const fn id(&self) -> WallId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Committed case grid of this wall.
    #[must_use]
    pub const fn grid(&self) -> &AuthoritativeValidator {
        &self.cases
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.index().len()
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    id: CaseId,
    wall: WallId,
    name: String,
    drawers: AuthoritativeValidator,
}

impl Case {
    #[must_use]
    pub const fn id(&self) -> CaseId {
        self.id
    }

    #[must_use]
    pub const fn wall(&self) -> WallId {
        self.wall
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Committed drawer grid of this case.
    #[must_use]
    pub const fn grid(&self) -> &AuthoritativeValidator {
        &self.drawers
    }

    #[must_use]
    pub fn drawer_count(&self) -> usize {
        self.drawers.index().len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawer {
    id: DrawerId,
    case: CaseId,
    size: Option<String>,
    label: Option<String>,
}

impl Drawer {
    #[must_use]
    pub const fn id(&self) -> DrawerId {
        self.id
    }

    #[must_use]
    pub const fn case(&self) -> CaseId {
        self.case
    }

    /// Catalog size the drawer was placed with, if any.
    #[must_use]
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Authoritative inventory state.
#[derive(Debug)]
pub struct Inventory {
    config: InventoryConfig,
    walls: BTreeMap<WallId, Wall>,
    cases: BTreeMap<CaseId, Case>,
    drawers: BTreeMap<DrawerId, Drawer>,
    wall_ids: IdAllocator,
    case_ids: IdAllocator,
    drawer_ids: IdAllocator,
    operations: u64,
    events: EventBus,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(InventoryConfig::default())
    }
}

impl Inventory {
    #[must_use]
    pub fn new(config: InventoryConfig) -> Self {
        Self {
            config,
            walls: BTreeMap::new(),
            cases: BTreeMap::new(),
            drawers: BTreeMap::new(),
            wall_ids: IdAllocator::default(),
            case_ids: IdAllocator::default(),
            drawer_ids: IdAllocator::default(),
            operations: 0,
            events: EventBus::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Receive every change committed from now on.
    pub fn subscribe(&mut self) -> Receiver<InventoryEvent> {
        self.events.subscribe()
    }

    /// Sequence number of the last published change.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.events.sequence()
    }

    #[must_use]
    pub fn wall(&self, wall: WallId) -> Option<&Wall> {
        self.walls.get(&wall)
    }

    #[must_use]
    pub fn case(&self, case: CaseId) -> Option<&Case> {
        self.cases.get(&case)
    }

    #[must_use]
    pub fn drawer(&self, drawer: DrawerId) -> Option<&Drawer> {
        self.drawers.get(&drawer)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.values()
    }

    /// Cases on `wall` in id order.
    pub fn cases_on(&self, wall: WallId) -> impl Iterator<Item = &Case> {
        self.cases.values().filter(move |case| case.wall == wall)
    }

    /// Drawers in `case` in id order.
    pub fn drawers_in(&self, case: CaseId) -> impl Iterator<Item = &Drawer> {
        self.drawers.values().filter(move |drawer| drawer.case == case)
    }

    /// Region a case holds on its wall.
    #[must_use]
    pub fn case_region(&self, case: CaseId) -> Option<Region> {
        let wall = self.cases.get(&case)?.wall;
        self.walls.get(&wall)?.cases.index().get(case.occupant())
    }

    /// Region a drawer holds in its case.
    #[must_use]
    pub fn drawer_region(&self, drawer: DrawerId) -> Option<Region> {
        let case = self.drawers.get(&drawer)?.case;
        self.cases.get(&case)?.drawers.index().get(drawer.occupant())
    }

    pub fn wall_snapshot(&self, wall: WallId) -> Result<GridSnapshot> {
        Ok(self.wall_ref(wall)?.cases.snapshot())
    }

    pub fn case_snapshot(&self, case: CaseId) -> Result<GridSnapshot> {
        Ok(self.case_ref(case)?.drawers.snapshot())
    }

    /// Speculative copy of a wall grid for a client.
    pub fn wall_validator(&self, wall: WallId) -> Result<SpeculativeValidator> {
        Ok(self.wall_ref(wall)?.cases.speculative())
    }

    /// Speculative copy of a case grid for a client.
    pub fn case_validator(&self, case: CaseId) -> Result<SpeculativeValidator> {
        Ok(self.case_ref(case)?.drawers.speculative())
    }

    // -----------------------------------------------------------------------
    // Walls
    // -----------------------------------------------------------------------

    pub fn create_wall(
        &mut self,
        origin: SessionId,
        name: impl Into<String>,
        columns: Option<u16>,
    ) -> Result<WallId> {
        let columns = columns.unwrap_or(self.config.default_wall_columns);
        let grid = Grid::growable(columns)
            .inspect_err(|err| info!(code = "invalid_dimension", "wall refused: {err}"))?;
        let id = WallId::from_occupant(self.wall_ids.allocate()?);
        self.walls.insert(
            id,
            Wall {
                id,
                name: name.into(),
                cases: AuthoritativeValidator::new(grid),
            },
        );
        debug!(wall = %id, columns, "wall created");
        self.events
            .publish(origin, InventoryChange::WallCreated { wall: id, columns });
        Ok(id)
    }

    /// Remove an empty wall.
    pub fn remove_wall(&mut self, origin: SessionId, wall: WallId) -> Result<()> {
        let cases = self.wall_ref(wall)?.case_count();
        if cases > 0 {
            info!(wall = %wall, cases, code = "wall_not_empty", "wall removal refused");
            return Err(InventoryError::WallNotEmpty { wall, cases });
        }
        self.walls.remove(&wall);
        debug!(wall = %wall, "wall removed");
        self.events
            .publish(origin, InventoryChange::WallRemoved { wall });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cases
    // -----------------------------------------------------------------------

    pub fn place_case(
        &mut self,
        origin: SessionId,
        wall: WallId,
        case: NewCase,
        slot: Slot,
    ) -> Result<Placed<CaseId>> {
        let drawer_grid = Grid::bounded(
            case.grid_columns.unwrap_or(self.config.default_case_columns),
            case.grid_rows.unwrap_or(self.config.default_case_rows),
        )?;
        self.wall_ref(wall)?;
        let id = CaseId::from_occupant(self.case_ids.allocate()?);
        let region = self
            .commit_on_wall(wall, slot.operation(id.occupant(), case.width, case.height))
            .inspect_err(|err| {
                info!(wall = %wall, case = %id, code = err.code(), "case placement refused");
            })?
            .ok_or(InventoryError::UnknownCase(id))?;
        self.cases.insert(
            id,
            Case {
                id,
                wall,
                name: case.name,
                drawers: AuthoritativeValidator::new(drawer_grid),
            },
        );
        debug!(wall = %wall, case = %id, %region, "case placed");
        self.events
            .publish(origin, InventoryChange::CasePlaced { wall, case: id, region });
        Ok(Placed { id, region })
    }

    pub fn move_case(
        &mut self,
        origin: SessionId,
        case: CaseId,
        column: u16,
        row: u16,
    ) -> Result<Region> {
        let wall = self.case_ref(case)?.wall;
        let operation = PlacementOperation::Move {
            occupant: case.occupant(),
            column,
            row,
        };
        let region = self.commit_case_change(wall, case, operation, "case move refused")?;
        debug!(case = %case, %region, "case moved");
        self.events
            .publish(origin, InventoryChange::CaseMoved { case, region });
        Ok(region)
    }

    /// Change a case's footprint on its wall; its drawer grid is untouched.
    pub fn resize_case(
        &mut self,
        origin: SessionId,
        case: CaseId,
        width: u16,
        height: u16,
    ) -> Result<Region> {
        let wall = self.case_ref(case)?.wall;
        let operation = PlacementOperation::Resize {
            occupant: case.occupant(),
            width,
            height,
        };
        let region = self.commit_case_change(wall, case, operation, "case resize refused")?;
        debug!(case = %case, %region, "case resized");
        self.events
            .publish(origin, InventoryChange::CaseResized { case, region });
        Ok(region)
    }

    /// Replace a case's footprint, letting the top-left corner shift as
    /// when a left or top edge is dragged. Its drawer grid is untouched.
    pub fn reshape_case(
        &mut self,
        origin: SessionId,
        case: CaseId,
        region: Region,
    ) -> Result<Region> {
        let wall = self.case_ref(case)?.wall;
        let operation = PlacementOperation::Reshape {
            occupant: case.occupant(),
            region,
        };
        let region = self.commit_case_change(wall, case, operation, "case resize refused")?;
        debug!(case = %case, %region, "case reshaped");
        self.events
            .publish(origin, InventoryChange::CaseResized { case, region });
        Ok(region)
    }

    /// Remove a case and every drawer in it. Returns the drawer count.
    pub fn remove_case(&mut self, origin: SessionId, case: CaseId) -> Result<usize> {
        let wall = self.case_ref(case)?.wall;
        self.commit_on_wall(wall, PlacementOperation::Remove {
            occupant: case.occupant(),
        })?;
        self.cases.remove(&case);
        let before = self.drawers.len();
        self.drawers.retain(|_, drawer| drawer.case != case);
        let drawers = before - self.drawers.len();
        debug!(wall = %wall, case = %case, drawers, "case removed");
        self.events.publish(
            origin,
            InventoryChange::CaseRemoved {
                wall,
                case,
                drawers,
            },
        );
        Ok(drawers)
    }

    /// Which drawers a new drawer grid of `columns` × `rows` would strand.
    pub fn preview_case_grid_resize(
        &self,
        case: CaseId,
        columns: u16,
        rows: u16,
    ) -> Result<ShrinkImpact> {
        Ok(self
            .case_ref(case)?
            .drawers
            .impact_of_grid_shrink(columns, Some(rows)))
    }

    /// Resize a case's drawer grid. Refused while any drawer would fall
    /// outside; nothing is moved or evicted.
    pub fn resize_case_grid(
        &mut self,
        origin: SessionId,
        case: CaseId,
        columns: u16,
        rows: u16,
    ) -> Result<()> {
        let operation_id = self.next_operation();
        let entry = self.case_mut(case)?;
        entry
            .drawers
            .apply_operation(operation_id, PlacementOperation::ResizeGrid {
                columns,
                rows: Some(rows),
            })
            .map_err(InventoryError::from)
            .inspect_err(|err| {
                info!(case = %case, columns, rows, code = err.code(), "case grid resize refused");
            })?;
        debug!(case = %case, columns, rows, "case grid resized");
        self.events.publish(
            origin,
            InventoryChange::CaseGridResized {
                case,
                columns,
                rows,
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drawers
    // -----------------------------------------------------------------------

    pub fn place_drawer(
        &mut self,
        origin: SessionId,
        case: CaseId,
        shape: DrawerShape,
        slot: Slot,
        label: Option<String>,
    ) -> Result<Placed<DrawerId>> {
        let (width, height, size) = self.resolve_shape(shape)?;
        self.case_ref(case)?;
        let id = DrawerId::from_occupant(self.drawer_ids.allocate()?);
        let region = self
            .commit_in_case(case, slot.operation(id.occupant(), width, height))
            .inspect_err(|err| {
                info!(case = %case, drawer = %id, code = err.code(), "drawer placement refused");
            })?
            .ok_or(InventoryError::UnknownDrawer(id))?;
        self.drawers.insert(
            id,
            Drawer {
                id,
                case,
                size,
                label,
            },
        );
        debug!(case = %case, drawer = %id, %region, "drawer placed");
        self.events.publish(
            origin,
            InventoryChange::DrawerPlaced {
                case,
                drawer: id,
                region,
            },
        );
        Ok(Placed { id, region })
    }

    pub fn move_drawer(
        &mut self,
        origin: SessionId,
        drawer: DrawerId,
        column: u16,
        row: u16,
    ) -> Result<Region> {
        let case = self.drawer_ref(drawer)?.case;
        let operation = PlacementOperation::Move {
            occupant: drawer.occupant(),
            column,
            row,
        };
        let region = self.commit_drawer_change(case, drawer, operation, "drawer move refused")?;
        debug!(drawer = %drawer, %region, "drawer moved");
        self.events
            .publish(origin, InventoryChange::DrawerMoved { drawer, region });
        Ok(region)
    }

    /// Resize a drawer in free-form units; any catalog size name is cleared.
    pub fn resize_drawer(
        &mut self,
        origin: SessionId,
        drawer: DrawerId,
        width: u16,
        height: u16,
    ) -> Result<Region> {
        let case = self.drawer_ref(drawer)?.case;
        let operation = PlacementOperation::Resize {
            occupant: drawer.occupant(),
            width,
            height,
        };
        let region =
            self.commit_drawer_change(case, drawer, operation, "drawer resize refused")?;
        if let Some(entry) = self.drawers.get_mut(&drawer) {
            entry.size = None;
        }
        debug!(drawer = %drawer, %region, "drawer resized");
        self.events
            .publish(origin, InventoryChange::DrawerResized { drawer, region });
        Ok(region)
    }

    /// Replace a drawer's region, top-left included. Clears the size name.
    pub fn reshape_drawer(
        &mut self,
        origin: SessionId,
        drawer: DrawerId,
        region: Region,
    ) -> Result<Region> {
        let case = self.drawer_ref(drawer)?.case;
        let operation = PlacementOperation::Reshape {
            occupant: drawer.occupant(),
            region,
        };
        let region =
            self.commit_drawer_change(case, drawer, operation, "drawer resize refused")?;
        if let Some(entry) = self.drawers.get_mut(&drawer) {
            entry.size = None;
        }
        debug!(drawer = %drawer, %region, "drawer reshaped");
        self.events
            .publish(origin, InventoryChange::DrawerResized { drawer, region });
        Ok(region)
    }

    pub fn remove_drawer(&mut self, origin: SessionId, drawer: DrawerId) -> Result<()> {
        let case = self.drawer_ref(drawer)?.case;
        self.commit_in_case(case, PlacementOperation::Remove {
            occupant: drawer.occupant(),
        })?;
        self.drawers.remove(&drawer);
        debug!(case = %case, drawer = %drawer, "drawer removed");
        self.events
            .publish(origin, InventoryChange::DrawerRemoved { case, drawer });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    /// Place a new case populated from `template`.
    ///
    /// The drawer layout is planned and committed into the new case's grid
    /// before the case is placed on the wall, so a refusal at any step
    /// leaves the inventory unchanged.
    pub fn apply_template(
        &mut self,
        origin: SessionId,
        wall: WallId,
        template: &LayoutTemplate,
        footprint: (u16, u16),
        slot: Slot,
    ) -> Result<Placed<CaseId>> {
        let plan = template
            .plan(&self.config.drawer_sizes)
            .inspect_err(|err| {
                info!(wall = %wall, template = %template.name, code = "template_rejected",
                    "template refused: {err}");
            })?;
        self.wall_ref(wall)?;

        let id = CaseId::from_occupant(self.case_ids.allocate()?);
        let mut drawers = AuthoritativeValidator::new(plan.grid);
        let mut records = Vec::with_capacity(plan.drawers.len());
        for (region, size) in plan.drawers {
            let drawer = DrawerId::from_occupant(self.drawer_ids.allocate()?);
            let operation_id = self.next_operation();
            drawers.apply_operation(operation_id, PlacementOperation::Place {
                occupant: drawer.occupant(),
                region,
            })?;
            records.push(Drawer {
                id: drawer,
                case: id,
                size: Some(size),
                label: None,
            });
        }

        let (width, height) = footprint;
        let region = self
            .commit_on_wall(wall, slot.operation(id.occupant(), width, height))
            .inspect_err(|err| {
                info!(wall = %wall, case = %id, code = err.code(), "template case refused");
            })?
            .ok_or(InventoryError::UnknownCase(id))?;

        let count = records.len();
        self.drawers
            .extend(records.into_iter().map(|drawer| (drawer.id, drawer)));
        self.cases.insert(
            id,
            Case {
                id,
                wall,
                name: template.name.clone(),
                drawers,
            },
        );
        debug!(wall = %wall, case = %id, template = %template.name, drawers = count,
            "template applied");
        self.events.publish(
            origin,
            InventoryChange::TemplateApplied {
                wall,
                case: id,
                template: template.name.clone(),
                drawers: count,
            },
        );
        Ok(Placed { id, region })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn next_operation(&mut self) -> u64 {
        self.operations += 1;
        self.operations
    }

    fn wall_ref(&self, wall: WallId) -> Result<&Wall> {
        self.walls.get(&wall).ok_or(InventoryError::UnknownWall(wall))
    }

    fn case_ref(&self, case: CaseId) -> Result<&Case> {
        self.cases.get(&case).ok_or(InventoryError::UnknownCase(case))
    }

    fn case_mut(&mut self, case: CaseId) -> Result<&mut Case> {
        self.cases
            .get_mut(&case)
            .ok_or(InventoryError::UnknownCase(case))
    }

    fn drawer_ref(&self, drawer: DrawerId) -> Result<&Drawer> {
        self.drawers
            .get(&drawer)
            .ok_or(InventoryError::UnknownDrawer(drawer))
    }

    fn resolve_shape(&self, shape: DrawerShape) -> Result<(u16, u16, Option<String>)> {
        match shape {
            DrawerShape::Units { width, height } => Ok((width, height, None)),
            DrawerShape::Named(name) => {
                let size = self.config.drawer_sizes.get(&name).ok_or_else(|| {
                    info!(size = %name, code = "unknown_drawer_size", "drawer size refused");
                    InventoryError::UnknownDrawerSize { name: name.clone() }
                })?;
                Ok((size.width_units, size.height_units, Some(size.name.clone())))
            }
        }
    }

    /// Apply `operation` to a wall grid.
    ///
    /// Returns the region the target occupant holds afterwards, `None` once
    /// it has been removed.
    fn commit_on_wall(
        &mut self,
        wall: WallId,
        operation: PlacementOperation,
    ) -> Result<Option<Region>> {
        let operation_id = self.next_operation();
        let entry = self
            .walls
            .get_mut(&wall)
            .ok_or(InventoryError::UnknownWall(wall))?;
        commit(&mut entry.cases, operation_id, operation)
    }

    /// Apply `operation` to a case grid; same return as [`Self::commit_on_wall`].
    fn commit_in_case(
        &mut self,
        case: CaseId,
        operation: PlacementOperation,
    ) -> Result<Option<Region>> {
        let operation_id = self.next_operation();
        let entry = self.case_mut(case)?;
        commit(&mut entry.drawers, operation_id, operation)
    }

    fn commit_case_change(
        &mut self,
        wall: WallId,
        case: CaseId,
        operation: PlacementOperation,
        refusal: &'static str,
    ) -> Result<Region> {
        let region = self.commit_on_wall(wall, operation).inspect_err(|err| {
            info!(wall = %wall, case = %case, code = err.code(), "{refusal}");
        })?;
        region.ok_or(InventoryError::UnknownCase(case))
    }

    fn commit_drawer_change(
        &mut self,
        case: CaseId,
        drawer: DrawerId,
        operation: PlacementOperation,
        refusal: &'static str,
    ) -> Result<Region> {
        let region = self.commit_in_case(case, operation).inspect_err(|err| {
            info!(case = %case, drawer = %drawer, code = err.code(), "{refusal}");
        })?;
        region.ok_or(InventoryError::UnknownDrawer(drawer))
    }
}

fn commit(
    validator: &mut AuthoritativeValidator,
    operation_id: u64,
    operation: PlacementOperation,
) -> Result<Option<Region>> {
    let outcome = validator.apply_operation(operation_id, operation)?;
    Ok(outcome
        .region
        .or_else(|| operation.occupant().and_then(|id| validator.index().get(id))))
}
