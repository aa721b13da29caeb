//! Spatial primitives and the zonal registry.
//!
//! This module provides:
//!
//! - **Coord / Location**: planar coordinates (metres) and network-anchored locations
//! - **ZoneKey**: square grid cell addressing with lazy ring enumeration
//! - **ZonalRegistry**: grid-bucketed occupant index answering approximate k-nearest queries
//!
//! The registry is a coarse pre-filter. It bounds the number of candidates handed to the
//! dispatch evaluator by the density around the query point rather than by fleet size.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;

/// A point on the simulation plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in metres.
    pub fn distance(&self, other: &Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Road network node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A place a task can happen at: a network node and its planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub node: NodeId,
    pub coord: Coord,
}

impl Location {
    pub fn new(node: NodeId, coord: Coord) -> Self {
        Self { node, coord }
    }

    pub fn at(node: u32, x: f64, y: f64) -> Self {
        Self::new(NodeId(node), Coord::new(x, y))
    }
}

/// Square zone address: `(floor(x / edge), floor(y / edge))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneKey {
    pub col: i64,
    pub row: i64,
}

impl ZoneKey {
    pub fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    /// Ring index of `other` around `self` (Chebyshev distance in zones).
    pub fn ring_distance(&self, other: &ZoneKey) -> u64 {
        self.col
            .abs_diff(other.col)
            .max(self.row.abs_diff(other.row))
    }

    /// Lazily enumerate the zones forming the square ring at `radius` around `self`.
    /// Radius 0 yields only `self`; radius r > 0 yields exactly 8r zones.
    pub fn ring(self, radius: u64) -> impl Iterator<Item = ZoneKey> {
        let r = radius as i64;
        let ZoneKey { col, row } = self;
        let horizontal = (-r..=r).flat_map(move |dc| {
            let top = ZoneKey::new(col + dc, row - r);
            let bottom = (r > 0).then(|| ZoneKey::new(col + dc, row + r));
            std::iter::once(top).chain(bottom)
        });
        let vertical = (-r + 1..r)
            .flat_map(move |dr| [ZoneKey::new(col - r, row + dr), ZoneKey::new(col + r, row + dr)]);
        horizontal.chain(vertical)
    }
}

fn ring_zone_count(radius: u64) -> usize {
    if radius == 0 {
        1
    } else {
        (8 * radius) as usize
    }
}

/// Grid-bucketed registry of located occupants (idle vehicles or unplanned requests).
///
/// Each zone holds the ids of its occupants; a reverse index maps an occupant to its zone
/// and coordinate so removal never scans. The edge length is fixed for the registry's
/// lifetime. One registry is built per optimizer and discarded with it.
#[derive(Debug, Clone)]
pub struct ZonalRegistry<K> {
    edge_length: f64,
    zones: HashMap<ZoneKey, BTreeSet<K>>,
    occupants: HashMap<K, (ZoneKey, Coord)>,
}

impl<K> ZonalRegistry<K>
where
    K: Copy + Eq + Hash + Ord + Debug,
{
    /// Create an empty registry. The caller validates `edge_length` (see `DispatchConfig`).
    pub fn new(edge_length: f64) -> Self {
        debug_assert!(
            edge_length.is_finite() && edge_length > 0.0,
            "zone edge length must be positive"
        );
        Self {
            edge_length,
            zones: HashMap::new(),
            occupants: HashMap::new(),
        }
    }

    pub fn edge_length(&self) -> f64 {
        self.edge_length
    }

    pub fn zone_key(&self, coord: Coord) -> ZoneKey {
        ZoneKey::new(
            (coord.x / self.edge_length).floor() as i64,
            (coord.y / self.edge_length).floor() as i64,
        )
    }

    /// Add an occupant at `coord`. Registering the same occupant twice is a bookkeeping bug.
    pub fn insert(&mut self, occupant: K, coord: Coord) -> Result<(), InvariantViolation> {
        if self.occupants.contains_key(&occupant) {
            return Err(InvariantViolation::DuplicateOccupant(format!("{occupant:?}")));
        }
        let key = self.zone_key(coord);
        self.zones.entry(key).or_default().insert(occupant);
        self.occupants.insert(occupant, (key, coord));
        Ok(())
    }

    /// Remove an occupant. Removing an unknown occupant is a bookkeeping bug.
    pub fn remove(&mut self, occupant: K) -> Result<Coord, InvariantViolation> {
        let Some((key, coord)) = self.occupants.remove(&occupant) else {
            return Err(InvariantViolation::AbsentOccupant(format!("{occupant:?}")));
        };
        if let Some(zone) = self.zones.get_mut(&key) {
            zone.remove(&occupant);
            if zone.is_empty() {
                self.zones.remove(&key);
            }
        }
        Ok(coord)
    }

    pub fn contains(&self, occupant: K) -> bool {
        self.occupants.contains_key(&occupant)
    }

    pub fn coord_of(&self, occupant: K) -> Option<Coord> {
        self.occupants.get(&occupant).map(|(_, coord)| *coord)
    }

    pub fn count(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// All occupants in ascending id order.
    pub fn occupants(&self) -> Vec<K> {
        let mut ids: Vec<K> = self.occupants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Up to `k` occupants near `origin`.
    ///
    /// Rings of zones are scanned outward from the origin zone until at least `k` occupants
    /// are collected or every occupant has been seen. The ring that crosses the threshold is
    /// collected in full, then the collected set is ranked by straight-line distance (ties
    /// by id) and cut to `k`. Occupants beyond that ring are never considered, so the result
    /// is approximate. The search runs to completion before this returns; the iterator only
    /// hands out the ranked ids.
    pub fn find_nearest(&self, origin: Coord, k: usize) -> impl Iterator<Item = K> {
        let mut found: Vec<(K, Coord)> = Vec::new();
        if k > 0 && !self.is_empty() {
            let center = self.zone_key(origin);
            let mut radius = 0;
            while found.len() < k && found.len() < self.count() {
                if ring_zone_count(radius) > self.zones.len() {
                    // More ring slots than occupied zones: walk the occupied zones instead.
                    self.collect_sparse(center, radius, k, &mut found);
                    break;
                }
                for key in center.ring(radius) {
                    self.collect_zone(&key, &mut found);
                }
                radius += 1;
            }
        }

        found.sort_by(|(a_id, a), (b_id, b)| {
            a.distance(&origin)
                .total_cmp(&b.distance(&origin))
                .then_with(|| a_id.cmp(b_id))
        });
        found.truncate(k);
        found.into_iter().map(|(id, _)| id)
    }

    fn collect_zone(&self, key: &ZoneKey, found: &mut Vec<(K, Coord)>) {
        if let Some(zone) = self.zones.get(key) {
            found.extend(
                zone.iter()
                    .filter_map(|id| self.occupants.get(id).map(|(_, coord)| (*id, *coord))),
            );
        }
    }

    fn collect_sparse(
        &self,
        center: ZoneKey,
        first_radius: u64,
        k: usize,
        found: &mut Vec<(K, Coord)>,
    ) {
        let mut remaining: Vec<(u64, ZoneKey)> = self
            .zones
            .keys()
            .map(|key| (center.ring_distance(key), *key))
            .filter(|(ring, _)| *ring >= first_radius)
            .collect();
        remaining.sort_unstable();

        let mut idx = 0;
        while idx < remaining.len() && found.len() < k {
            let ring = remaining[idx].0;
            while idx < remaining.len() && remaining[idx].0 == ring {
                self.collect_zone(&remaining[idx].1, found);
                idx += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_sizes_follow_square_perimeter() {
        let center = ZoneKey::new(3, -2);
        assert_eq!(center.ring(0).collect::<Vec<_>>(), vec![center]);
        for radius in 1..5 {
            let ring: BTreeSet<ZoneKey> = center.ring(radius).collect();
            assert_eq!(ring.len(), ring_zone_count(radius));
            assert!(ring.iter().all(|z| center.ring_distance(z) == radius));
        }
    }

    #[test]
    fn zone_key_floors_negative_coordinates() {
        let registry: ZonalRegistry<u32> = ZonalRegistry::new(1000.0);
        assert_eq!(registry.zone_key(Coord::new(999.0, 0.0)), ZoneKey::new(0, 0));
        assert_eq!(registry.zone_key(Coord::new(-1.0, 1000.0)), ZoneKey::new(-1, 1));
    }

    #[test]
    fn duplicate_insert_and_absent_remove_are_violations() {
        let mut registry = ZonalRegistry::new(100.0);
        registry.insert(1u32, Coord::new(0.0, 0.0)).expect("insert");
        assert!(matches!(
            registry.insert(1, Coord::new(5.0, 5.0)),
            Err(InvariantViolation::DuplicateOccupant(_))
        ));
        registry.remove(1).expect("remove");
        assert!(matches!(
            registry.remove(1),
            Err(InvariantViolation::AbsentOccupant(_))
        ));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn nearest_stops_at_ring_reaching_k() {
        let mut registry = ZonalRegistry::new(1000.0);
        // Same zone as the query point, but far inside it.
        registry.insert(1u32, Coord::new(10.0, 500.0)).expect("insert");
        // Adjacent zone, much closer to the query point.
        registry.insert(2u32, Coord::new(1010.0, 500.0)).expect("insert");

        let found: Vec<u32> = registry.find_nearest(Coord::new(990.0, 500.0), 1).collect();
        assert_eq!(found, vec![1]);

        let found: Vec<u32> = registry.find_nearest(Coord::new(990.0, 500.0), 2).collect();
        assert_eq!(found, vec![2, 1]);
    }

    #[test]
    fn nearest_never_exceeds_k_or_registry_contents() {
        let mut registry = ZonalRegistry::new(50.0);
        for id in 0..40u32 {
            let coord = Coord::new((id % 7) as f64 * 31.0, (id / 7) as f64 * 29.0);
            registry.insert(id, coord).expect("insert");
        }
        for k in [0, 1, 3, 10, 40, 100] {
            let found: Vec<u32> = registry.find_nearest(Coord::new(60.0, 60.0), k).collect();
            assert!(found.len() <= k);
            assert_eq!(found.len(), k.min(registry.count()));
            assert!(found.iter().all(|id| registry.contains(*id)));
            let unique: BTreeSet<u32> = found.iter().copied().collect();
            assert_eq!(unique.len(), found.len());
        }
    }

    #[test]
    fn sparse_far_occupants_are_still_found() {
        let mut registry = ZonalRegistry::new(10.0);
        registry.insert(7u32, Coord::new(50_000.0, -40_000.0)).expect("insert");
        registry.insert(8u32, Coord::new(-90_000.0, 10.0)).expect("insert");

        let found: Vec<u32> = registry.find_nearest(Coord::new(0.0, 0.0), 1).collect();
        assert_eq!(found, vec![7]);
        let found: Vec<u32> = registry.find_nearest(Coord::new(0.0, 0.0), 5).collect();
        assert_eq!(found, vec![7, 8]);
    }

    #[test]
    fn removal_clears_empty_zone() {
        let mut registry = ZonalRegistry::new(100.0);
        registry.insert(1u32, Coord::new(10.0, 10.0)).expect("insert");
        registry.insert(2u32, Coord::new(20.0, 20.0)).expect("insert");
        registry.remove(1).expect("remove");
        assert_eq!(registry.zones.len(), 1);
        registry.remove(2).expect("remove");
        assert!(registry.zones.is_empty());
        assert_eq!(registry.find_nearest(Coord::new(0.0, 0.0), 3).count(), 0);
    }
}
