//! Steering simulation: vehicles following their lanes.
//!
//! Each `SteeringVehicle` owns a cursor into its (shared) path. With path
//! following switched on it seeks the current waypoint at `max_speed`,
//! moves on to the next waypoint once inside `NEXT_WAYPOINT_DISTANCE`, and
//! comes to rest on the final point. Heading follows the velocity.
//!
//! Path following is a named capability (`set_path_following`); a vehicle
//! that never gets switched on stays parked at its spawn point.

use roadquiz_common::Vec3;

use crate::game::catalog::Path;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Cruise speed for every quiz vehicle (units/s)
pub const DEFAULT_MAX_SPEED: f32 = 5.0;
/// Switch to the next waypoint within this distance
pub const NEXT_WAYPOINT_DISTANCE: f32 = 2.0;
/// Snap onto the final waypoint within this distance
pub const ARRIVE_RADIUS: f32 = 0.1;

// ---------------------------------------------------------------------------
// SteeringVehicle
// ---------------------------------------------------------------------------

pub struct SteeringVehicle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading about the y axis (radians; 0 faces +z)
    pub yaw: f32,
    pub max_speed: f32,
    path: Path,
    cursor: usize,
    path_following: bool,
    arrived: bool,
}

/// Result of one simulation step for a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerEvent {
    /// Parked or already at the end
    Idle,
    Moving,
    /// Reached the last waypoint during this step
    Arrived,
}

impl SteeringVehicle {
    /// Place a vehicle at the first point of `path`, facing `yaw`
    pub fn new(path: Path, yaw: f32) -> Self {
        Self {
            position: path.first(),
            velocity: Vec3::ZERO,
            yaw,
            max_speed: DEFAULT_MAX_SPEED,
            path,
            cursor: 0,
            path_following: false,
            arrived: false,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path_following(&mut self, enabled: bool) {
        self.path_following = enabled;
    }

    pub fn is_path_following(&self) -> bool {
        self.path_following
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Advance by `dt` seconds
    pub fn update(&mut self, dt: f32) -> SteerEvent {
        if !self.path_following || self.arrived || dt <= 0.0 {
            self.velocity = Vec3::ZERO;
            return SteerEvent::Idle;
        }

        let last = self.path.last_index();
        let mut budget = self.max_speed * dt;
        let mut heading = Vec3::ZERO;

        // A long frame may pass several waypoints
        while budget > 0.0 {
            let Some(target) = self.path.point(self.cursor) else {
                break;
            };
            let to_target = target - self.position;
            let dist = to_target.length();

            if self.cursor < last && dist <= NEXT_WAYPOINT_DISTANCE {
                self.cursor += 1;
                if dist > 0.0 {
                    heading = to_target.normalized();
                }
                continue;
            }

            if self.cursor == last && dist <= budget.max(ARRIVE_RADIUS) {
                if dist > 0.0 {
                    heading = to_target.normalized();
                }
                self.position = target;
                self.velocity = Vec3::ZERO;
                self.arrived = true;
                self.face(heading);
                return SteerEvent::Arrived;
            }

            heading = to_target.normalized();
            let step = budget.min(dist);
            self.position = self.position + heading * step;
            budget -= step;
        }

        self.velocity = heading * self.max_speed;
        self.face(heading);
        SteerEvent::Moving
    }

    fn face(&mut self, heading: Vec3) {
        if heading.x != 0.0 || heading.z != 0.0 {
            self.yaw = heading.x.atan2(heading.z);
        }
    }
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Handle to a vehicle inside the `EntityManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(usize);

/// Owns every simulated vehicle and steps them together
#[derive(Default)]
pub struct EntityManager {
    vehicles: Vec<SteeringVehicle>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vehicle: SteeringVehicle) -> EntityHandle {
        self.vehicles.push(vehicle);
        EntityHandle(self.vehicles.len() - 1)
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&SteeringVehicle> {
        self.vehicles.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut SteeringVehicle> {
        self.vehicles.get_mut(handle.0)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Step every vehicle by `dt` seconds; returns the ones that arrived
    pub fn update(&mut self, dt: f32) -> Vec<EntityHandle> {
        let mut arrived = Vec::new();
        for (i, v) in self.vehicles.iter_mut().enumerate() {
            if v.update(dt) == SteerEvent::Arrived {
                arrived.push(EntityHandle(i));
            }
        }
        arrived
    }

    /// Number of vehicles currently driving
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.is_path_following() && !v.has_arrived())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn l_path() -> Path {
        Path::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
        ])
        .unwrap()
    }

    #[test]
    fn parked_until_enabled() {
        let mut v = SteeringVehicle::new(l_path(), 0.0);
        assert_eq!(v.update(1.0), SteerEvent::Idle);
        assert_eq!(v.position, Vec3::ZERO);
        assert!(!v.is_path_following());
    }

    #[test]
    fn moves_at_max_speed() {
        let mut v = SteeringVehicle::new(l_path(), 0.0);
        v.set_path_following(true);
        assert_eq!(v.update(1.0), SteerEvent::Moving);
        assert!((v.position.z + 5.0).abs() < 1e-4, "z = {}", v.position.z);
        assert!((v.velocity.length() - DEFAULT_MAX_SPEED).abs() < 1e-4);
    }

    #[test]
    fn heading_follows_motion() {
        let mut v = SteeringVehicle::new(l_path(), 1.0);
        v.set_path_following(true);
        v.update(0.5);
        // Driving towards -z
        assert!((v.yaw.abs() - std::f32::consts::PI).abs() < 1e-4, "yaw = {}", v.yaw);
    }

    #[test]
    fn cuts_to_next_waypoint_near_corner() {
        let mut v = SteeringVehicle::new(l_path(), 0.0);
        v.set_path_following(true);
        // 8.5 units down the first leg: inside the 2-unit switch distance
        v.update(1.7);
        assert_eq!(v.cursor, 1);
        v.update(0.1);
        assert_eq!(v.cursor, 2);
    }

    #[test]
    fn arrives_and_stops_on_last_point() {
        let mut v = SteeringVehicle::new(l_path(), 0.0);
        v.set_path_following(true);
        let mut events = Vec::new();
        for _ in 0..100 {
            events.push(v.update(0.1));
        }
        assert_eq!(events.iter().filter(|e| **e == SteerEvent::Arrived).count(), 1);
        assert_eq!(v.position, Vec3::new(10.0, 0.0, -10.0));
        assert!(v.has_arrived());
        assert_eq!(v.velocity, Vec3::ZERO);
    }

    #[test]
    fn single_point_path_arrives_immediately() {
        let mut v = SteeringVehicle::new(Path::new(vec![Vec3::new(1.0, 0.0, 1.0)]).unwrap(), 0.0);
        v.set_path_following(true);
        assert_eq!(v.update(0.016), SteerEvent::Arrived);
    }

    #[test]
    fn manager_steps_only_enabled_vehicles() {
        let mut em = EntityManager::new();
        let a = em.add(SteeringVehicle::new(l_path(), 0.0));
        let b = em.add(SteeringVehicle::new(l_path(), 0.0));
        em.get_mut(b).unwrap().set_path_following(true);
        em.update(1.0);
        assert_eq!(em.get(a).unwrap().position, Vec3::ZERO);
        assert!(em.get(b).unwrap().position.z < 0.0);
        assert_eq!(em.active_count(), 1);
    }
}
