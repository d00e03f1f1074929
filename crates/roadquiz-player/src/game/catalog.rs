//! Path catalog: the fixed lanes vehicles drive along.
//!
//! Each vehicle group owns an ordered list of lanes; lane `n` of a group is
//! the path of that group's `n`-th spawned vehicle. Paths are immutable and
//! shared by reference; the "current waypoint" cursor lives in the
//! vehicle's steering state (see `steering.rs`).

use std::collections::BTreeMap;
use std::sync::Arc;

use roadquiz_common::{Vec3, VehicleGroup};

/// An ordered, non-empty sequence of waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    points: Arc<[Vec3]>,
}

impl Path {
    /// Build a path. Returns `None` for an empty point list.
    pub fn new(points: Vec<Vec3>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self { points: points.into() })
    }

    /// The spawn point
    pub fn first(&self) -> Vec3 {
        self.points[0]
    }

    pub fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Total length of all segments
    pub fn length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(w[1]))
            .sum()
    }

    /// Whether two handles share the same point storage
    #[cfg(test)]
    pub fn shares_storage(&self, other: &Path) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

/// All lanes, grouped by vehicle colour
#[derive(Debug, Clone, Default)]
pub struct PathCatalog {
    lanes: BTreeMap<VehicleGroup, Vec<Path>>,
}

impl PathCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lane to a group; returns its lane index
    pub fn push(&mut self, group: VehicleGroup, path: Path) -> usize {
        let lanes = self.lanes.entry(group).or_default();
        lanes.push(path);
        lanes.len() - 1
    }

    pub fn get(&self, group: VehicleGroup, lane: usize) -> Option<&Path> {
        self.lanes.get(&group).and_then(|l| l.get(lane))
    }

    pub fn lane_count(&self, group: VehicleGroup) -> usize {
        self.lanes.get(&group).map_or(0, |l| l.len())
    }

    /// Iterate every lane as `(group, lane index, path)`
    pub fn iter(&self) -> impl Iterator<Item = (VehicleGroup, usize, &Path)> {
        self.lanes
            .iter()
            .flat_map(|(g, lanes)| lanes.iter().enumerate().map(move |(i, p)| (*g, i, p)))
    }

    /// Axis-aligned x/z bounds of all waypoints: `(min_x, min_z, max_x, max_z)`
    pub fn bounds_xz(&self) -> Option<(f32, f32, f32, f32)> {
        let mut points = self.iter().flat_map(|(_, _, p)| p.points().iter());
        let first = points.next()?;
        let init = (first.x, first.z, first.x, first.z);
        Some(points.fold(init, |(x0, z0, x1, z1), p| {
            (x0.min(p.x), z0.min(p.z), x1.max(p.x), z1.max(p.z))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(z0: f32, z1: f32) -> Path {
        Path::new(vec![Vec3::new(0.0, 0.0, z0), Vec3::new(0.0, 0.0, z1)]).unwrap()
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(Path::new(Vec::new()).is_none());
    }

    #[test]
    fn path_length_sums_segments() {
        let p = Path::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(5.0, 0.0, -10.0),
        ])
        .unwrap();
        assert!((p.length() - 15.0).abs() < 1e-5);
        assert_eq!(p.last_index(), 2);
    }

    #[test]
    fn clones_share_points() {
        let p = straight(10.0, 0.0);
        let q = p.clone();
        assert!(p.shares_storage(&q));
    }

    #[test]
    fn lanes_are_indexed_per_group() {
        let mut cat = PathCatalog::new();
        assert_eq!(cat.push(VehicleGroup::Red, straight(0.0, -5.0)), 0);
        assert_eq!(cat.push(VehicleGroup::Red, straight(5.0, -5.0)), 1);
        assert_eq!(cat.push(VehicleGroup::Blue, straight(1.0, -5.0)), 0);
        assert_eq!(cat.lane_count(VehicleGroup::Red), 2);
        assert_eq!(cat.lane_count(VehicleGroup::Yellow), 0);
        assert!(cat.get(VehicleGroup::Red, 2).is_none());
        assert_eq!(cat.get(VehicleGroup::Red, 1).unwrap().first().z, 5.0);
    }

    #[test]
    fn bounds_cover_all_points() {
        let mut cat = PathCatalog::new();
        cat.push(VehicleGroup::Red, straight(3.0, -7.0));
        cat.push(
            VehicleGroup::Blue,
            Path::new(vec![Vec3::new(-4.0, 0.0, 0.0), Vec3::new(9.0, 0.0, 1.0)]).unwrap(),
        );
        assert_eq!(cat.bounds_xz(), Some((-4.0, -7.0, 9.0, 3.0)));
    }
}
