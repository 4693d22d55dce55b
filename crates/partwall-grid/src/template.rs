#![forbid(unsafe_code)]

//! Named drawer sizes and case layout templates.
//!
//! A [`LayoutTemplate`] describes a whole case: its internal grid and the
//! drawers it ships with, each drawer given by a top-left cell and a named
//! [`DrawerSize`]. [`LayoutTemplate::plan`] resolves sizes and runs every
//! drawer through the placement validator in template order, so a template
//! is accepted only if the resulting layout satisfies the grid invariants.
//!
//! [`TemplatePlan::assign_labels`] maps labels detected in a photo of a case
//! onto the planned drawers, so a scan can be matched to drawer slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, GridError, Region};
use crate::occupancy::{OccupancyIndex, Occupant, OccupantId};
use crate::placement::{Rejection, validate};

/// A named drawer footprint in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerSize {
    pub name: String,
    #[serde(alias = "widthUnits")]
    pub width_units: u16,
    #[serde(alias = "heightUnits")]
    pub height_units: u16,
}

impl DrawerSize {
    #[must_use]
    pub fn new(name: impl Into<String>, width_units: u16, height_units: u16) -> Self {
        Self {
            name: name.into(),
            width_units,
            height_units,
        }
    }
}

/// Lookup table of drawer sizes, matched case-insensitively by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawerSizeCatalog {
    sizes: Vec<DrawerSize>,
}

impl DrawerSizeCatalog {
    #[must_use]
    pub fn new(sizes: Vec<DrawerSize>) -> Self {
        Self { sizes }
    }

    /// Sizes found on common small-parts cabinets.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            DrawerSize::new("small", 1, 1),
            DrawerSize::new("medium", 2, 1),
            DrawerSize::new("large", 2, 2),
            DrawerSize::new("wide", 4, 1),
        ])
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DrawerSize> {
        self.sizes
            .iter()
            .find(|size| size.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawerSize> {
        self.sizes.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// One drawer slot in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDrawer {
    pub row: u16,
    #[serde(alias = "column")]
    pub col: u16,
    pub size: String,
}

/// A named case layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    pub name: String,
    pub columns: u16,
    pub rows: u16,
    #[serde(default, alias = "layoutData")]
    pub drawers: Vec<TemplateDrawer>,
}

/// A template resolved into a grid and an ordered list of drawer regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePlan {
    pub grid: Grid,
    /// Regions in template order, paired with the size name they came from.
    pub drawers: Vec<(Region, String)>,
}

/// Why a template could not be planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    InvalidDimension(GridError),
    UnknownSize { index: usize, size: String },
    Rejected { index: usize, rejection: Rejection },
    TooManyDrawers { index: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension(err) => write!(f, "template grid is invalid: {err}"),
            Self::UnknownSize { index, size } => {
                write!(f, "drawer {index} uses unknown size '{size}'")
            }
            Self::Rejected { index, rejection } => {
                write!(f, "drawer {index} cannot be placed: {rejection}")
            }
            Self::TooManyDrawers { index } => {
                write!(f, "drawer {index} exceeds the plan's id space")
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDimension(err) => Some(err),
            Self::Rejected { rejection, .. } => Some(rejection),
            Self::UnknownSize { .. } | Self::TooManyDrawers { .. } => None,
        }
    }
}

impl LayoutTemplate {
    /// Number of drawers the template places.
    #[must_use]
    pub fn drawer_count(&self) -> usize {
        self.drawers.len()
    }

    /// Resolve sizes and validate every drawer in order.
    pub fn plan(&self, catalog: &DrawerSizeCatalog) -> Result<TemplatePlan, TemplateError> {
        let grid = Grid::bounded(self.columns, self.rows).map_err(TemplateError::InvalidDimension)?;
        let mut index = OccupancyIndex::new();
        let mut drawers = Vec::with_capacity(self.drawers.len());

        for (position, drawer) in self.drawers.iter().enumerate() {
            let size = catalog
                .get(&drawer.size)
                .ok_or_else(|| TemplateError::UnknownSize {
                    index: position,
                    size: drawer.size.clone(),
                })?;
            let region = Region::new(drawer.col, drawer.row, size.width_units, size.height_units);
            validate(&grid, &index, &region, None).map_err(|rejection| {
                TemplateError::Rejected {
                    index: position,
                    rejection,
                }
            })?;
            index.add(Occupant::new(local_id(position)?, region));
            drawers.push((region, size.name.clone()));
        }

        Ok(TemplatePlan { grid, drawers })
    }
}

// ---------------------------------------------------------------------------
// Label assignment
// ---------------------------------------------------------------------------

/// Share of a drawer's longer side that a label centre may lie outside it
/// and still be matched to that drawer.
pub const LABEL_MARGIN_RATIO: f64 = 0.3;

/// Axis-aligned rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PixelBounds {
    #[must_use]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    fn contains_within(&self, x: f64, y: f64, margin: f64) -> bool {
        (self.left - margin..=self.right + margin).contains(&x)
            && (self.top - margin..=self.bottom + margin).contains(&y)
    }
}

/// A label rectangle found in a photo of a case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
}

impl DetectedLabel {
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A detected label matched to one planned drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAssignment {
    pub region: Region,
    pub size: String,
    pub bounds: PixelBounds,
    pub label: DetectedLabel,
}

impl TemplatePlan {
    fn row_count(&self) -> u32 {
        self.grid.fixed_rows().map_or_else(
            || {
                self.drawers
                    .iter()
                    .map(|(region, _)| region.bottom_edge())
                    .max()
                    .unwrap_or(1)
            },
            u32::from,
        )
    }

    /// Pixel rectangle of each planned drawer, in plan order, when the case
    /// face spans `case`.
    #[must_use]
    pub fn drawer_bounds(&self, case: PixelBounds) -> Vec<PixelBounds> {
        let unit_width = case.width() / f64::from(self.grid.columns());
        let unit_height = case.height() / f64::from(self.row_count());
        self.drawers
            .iter()
            .map(|(region, _)| {
                let left = case.left + f64::from(region.column.saturating_sub(1)) * unit_width;
                let top = case.top + f64::from(region.row.saturating_sub(1)) * unit_height;
                PixelBounds::new(
                    left,
                    top,
                    left + f64::from(region.width) * unit_width,
                    top + f64::from(region.height) * unit_height,
                )
            })
            .collect()
    }

    /// Match detected labels to planned drawers.
    ///
    /// Each label goes to the drawer whose centre is nearest its own (the
    /// earlier drawer on a tie), and only if its centre lies inside that
    /// drawer grown by [`LABEL_MARGIN_RATIO`] of the drawer's longer side.
    /// When several labels land on one drawer the largest is kept. Results
    /// are in plan order; drawers without a label are omitted.
    #[must_use]
    pub fn assign_labels(
        &self,
        case: PixelBounds,
        labels: &[DetectedLabel],
    ) -> Vec<LabelAssignment> {
        let bounds = self.drawer_bounds(case);
        let mut kept: Vec<Option<DetectedLabel>> = vec![None; bounds.len()];

        for label in labels {
            let (x, y) = label.center();
            let nearest = bounds
                .iter()
                .enumerate()
                .map(|(slot, drawer)| {
                    let (cx, cy) = drawer.center();
                    (slot, (x - cx).powi(2) + (y - cy).powi(2))
                })
                .fold(None, |best: Option<(usize, f64)>, (slot, distance)| {
                    match best {
                        Some((_, nearest)) if nearest <= distance => best,
                        _ => Some((slot, distance)),
                    }
                });
            let Some((slot, _)) = nearest else {
                continue;
            };
            let drawer = &bounds[slot];
            let margin = drawer.width().max(drawer.height()) * LABEL_MARGIN_RATIO;
            if !drawer.contains_within(x, y, margin) {
                continue;
            }
            if kept[slot].is_none_or(|current| label.area() > current.area()) {
                kept[slot] = Some(*label);
            }
        }

        self.drawers
            .iter()
            .zip(bounds)
            .zip(kept)
            .filter_map(|(((region, size), bounds), label)| {
                label.map(|label| LabelAssignment {
                    region: *region,
                    size: size.clone(),
                    bounds,
                    label,
                })
            })
            .collect()
    }
}

/// Plan-local id for the drawer at `position`; callers assign real ids when
/// committing.
fn local_id(position: usize) -> Result<OccupantId, TemplateError> {
    u64::try_from(position)
        .ok()
        .and_then(|raw| raw.checked_add(1))
        .and_then(OccupantId::new)
        .ok_or(TemplateError::TooManyDrawers { index: position })
}

/// One-line listing entry for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub name: String,
    pub columns: u16,
    pub rows: u16,
    pub drawers: usize,
}

impl fmt::Display for TemplateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{}, {} drawers)",
            self.name, self.columns, self.rows, self.drawers
        )
    }
}

impl From<&LayoutTemplate> for TemplateSummary {
    fn from(template: &LayoutTemplate) -> Self {
        Self {
            name: template.name.clone(),
            columns: template.columns,
            rows: template.rows,
            drawers: template.drawer_count(),
        }
    }
}

/// Summaries of every template, in input order.
#[must_use]
pub fn summarize_templates(templates: &[LayoutTemplate]) -> Vec<TemplateSummary> {
    templates.iter().map(TemplateSummary::from).collect()
}

/// First template whose name contains `needle`, ignoring case.
#[must_use]
pub fn find_template_by_name<'a>(
    templates: &'a [LayoutTemplate],
    needle: &str,
) -> Option<&'a LayoutTemplate> {
    let needle = needle.to_lowercase();
    templates
        .iter()
        .find(|template| template.name.to_lowercase().contains(&needle))
}
