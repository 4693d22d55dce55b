#![forbid(unsafe_code)]

//! Occupancy index: the current occupant set of one grid.
//!
//! Occupants are kept in an ordered map keyed by [`OccupantId`], so every
//! query that can report more than one occupant reports the lowest id first.
//! The mutators here never validate; callers run the placement validator
//! before touching the index.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Region;

/// Stable identifier for an occupant within its grid.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccupantId(u64);

impl OccupantId {
    /// Lowest valid occupant ID.
    pub const MIN: Self = Self(1);

    /// Create a new occupant ID, returning `None` for 0.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or `None` on overflow.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An identified region placed in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: OccupantId,
    pub region: Region,
}

impl Occupant {
    #[must_use]
    pub const fn new(id: OccupantId, region: Region) -> Self {
        Self { id, region }
    }
}

/// Axis-aligned overlap test over inclusive integer cell ranges.
///
/// Regions that only share a boundary line do not overlap. Empty regions
/// overlap nothing.
#[must_use]
pub fn overlaps(a: &Region, b: &Region) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    u32::from(a.column) <= b.right_edge()
        && a.right_edge() >= u32::from(b.column)
        && u32::from(a.row) <= b.bottom_edge()
        && a.bottom_edge() >= u32::from(b.row)
}

/// Occupants of one grid, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyIndex {
    occupants: BTreeMap<OccupantId, Region>,
}

impl OccupancyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    #[must_use]
    pub fn contains_id(&self, id: OccupantId) -> bool {
        self.occupants.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: OccupantId) -> Option<Region> {
        self.occupants.get(&id).copied()
    }

    /// Iterate occupants in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Occupant> + '_ {
        self.occupants
            .iter()
            .map(|(&id, &region)| Occupant::new(id, region))
    }

    /// Lowest-id occupant whose region overlaps `region`, skipping `excluding`.
    #[must_use]
    pub fn collides_with_any(
        &self,
        region: &Region,
        excluding: Option<OccupantId>,
    ) -> Option<Occupant> {
        self.iter()
            .filter(|occupant| Some(occupant.id) != excluding)
            .find(|occupant| overlaps(&occupant.region, region))
    }

    /// Every occupant overlapping `region`, in ascending id order.
    #[must_use]
    pub fn colliders(&self, region: &Region, excluding: Option<OccupantId>) -> Vec<OccupantId> {
        self.iter()
            .filter(|occupant| Some(occupant.id) != excluding)
            .filter(|occupant| overlaps(&occupant.region, region))
            .map(|occupant| occupant.id)
            .collect()
    }

    /// Occupant covering the cell `(column, row)`, if any.
    #[must_use]
    pub fn occupant_at(&self, column: u16, row: u16) -> Option<Occupant> {
        self.iter()
            .find(|occupant| occupant.region.covers(column, row))
    }

    /// Insert an occupant, returning the region it replaced.
    pub fn add(&mut self, occupant: Occupant) -> Option<Region> {
        self.occupants.insert(occupant.id, occupant.region)
    }

    /// Remove an occupant, returning its last region.
    pub fn remove(&mut self, id: OccupantId) -> Option<Region> {
        self.occupants.remove(&id)
    }

    /// Replace the region of an existing occupant.
    ///
    /// Returns the previous region, or `None` (and leaves the index
    /// unchanged) when `id` is unknown.
    pub fn update(&mut self, id: OccupantId, region: Region) -> Option<Region> {
        let slot = self.occupants.get_mut(&id)?;
        Some(std::mem::replace(slot, region))
    }
}

impl FromIterator<Occupant> for OccupancyIndex {
    fn from_iter<I: IntoIterator<Item = Occupant>>(iter: I) -> Self {
        Self {
            occupants: iter
                .into_iter()
                .map(|occupant| (occupant.id, occupant.region))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> OccupantId {
        OccupantId::new(raw).unwrap()
    }

    #[test]
    fn zero_id_is_rejected() {
        assert_eq!(OccupantId::new(0), None);
        assert_eq!(OccupantId::new(7).map(OccupantId::get), Some(7));
    }

    #[test]
    fn checked_next_stops_at_overflow() {
        assert_eq!(OccupantId::MIN.checked_next(), Some(id(2)));
        assert_eq!(id(u64::MAX).checked_next(), None);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Region::new(1, 1, 2, 1);
        let b = Region::new(3, 1, 2, 1);
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));

        let above = Region::new(1, 1, 2, 2);
        let below = Region::new(1, 3, 2, 2);
        assert!(!overlaps(&above, &below));
    }

    #[test]
    fn shared_cell_overlaps() {
        let a = Region::new(1, 1, 2, 2);
        let b = Region::new(2, 2, 2, 2);
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn containment_overlaps() {
        let outer = Region::new(1, 1, 4, 4);
        let inner = Region::new(2, 2, 1, 1);
        assert!(overlaps(&outer, &inner));
        assert!(overlaps(&inner, &outer));
    }

    #[test]
    fn cross_shape_overlaps() {
        let wide = Region::new(1, 2, 5, 1);
        let tall = Region::new(3, 1, 1, 5);
        assert!(overlaps(&wide, &tall));
    }

    #[test]
    fn empty_regions_never_overlap() {
        let a = Region::new(1, 1, 0, 3);
        let b = Region::new(1, 1, 3, 3);
        assert!(!overlaps(&a, &b));
    }

    #[test]
    fn collides_reports_lowest_id() {
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(9), Region::new(1, 1, 2, 1)));
        index.add(Occupant::new(id(4), Region::new(2, 1, 2, 1)));
        let hit = index
            .collides_with_any(&Region::new(1, 1, 4, 1), None)
            .unwrap();
        assert_eq!(hit.id, id(4));
        assert_eq!(
            index.colliders(&Region::new(1, 1, 4, 1), None),
            vec![id(4), id(9)]
        );
    }

    #[test]
    fn collides_skips_excluded_occupant() {
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(1), Region::new(1, 1, 2, 2)));
        let region = Region::new(1, 1, 2, 2);
        assert!(index.collides_with_any(&region, Some(id(1))).is_none());
        assert_eq!(index.collides_with_any(&region, None).unwrap().id, id(1));
    }

    #[test]
    fn occupant_at_hits_multi_cell_region() {
        let mut index = OccupancyIndex::new();
        index.add(Occupant::new(id(3), Region::new(2, 2, 2, 3)));
        assert_eq!(index.occupant_at(3, 4).map(|o| o.id), Some(id(3)));
        assert!(index.occupant_at(1, 1).is_none());
        assert!(index.occupant_at(4, 2).is_none());
    }

    #[test]
    fn update_ignores_unknown_id() {
        let mut index = OccupancyIndex::new();
        assert_eq!(index.update(id(5), Region::cell(1, 1)), None);
        assert!(index.is_empty());

        index.add(Occupant::new(id(5), Region::cell(1, 1)));
        let previous = index.update(id(5), Region::cell(2, 2));
        assert_eq!(previous, Some(Region::cell(1, 1)));
        assert_eq!(index.get(id(5)), Some(Region::cell(2, 2)));
    }

    #[test]
    fn remove_returns_last_region() {
        let mut index: OccupancyIndex = [Occupant::new(id(2), Region::cell(1, 1))]
            .into_iter()
            .collect();
        assert_eq!(index.remove(id(2)), Some(Region::cell(1, 1)));
        assert_eq!(index.remove(id(2)), None);
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn iter_is_id_ordered() {
        let index: OccupancyIndex = [
            Occupant::new(id(3), Region::cell(1, 1)),
            Occupant::new(id(1), Region::cell(2, 1)),
            Occupant::new(id(2), Region::cell(3, 1)),
        ]
        .into_iter()
        .collect();
        let ids: Vec<u64> = index.iter().map(|o| o.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
