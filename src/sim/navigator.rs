//! Per-unit movement controller (Component J).
//!
//! Ground: `navigator.hpp`, `navigator.cpp`.

use crate::config::SimConfig;
use crate::map::{Pathfinder, Terrain};
use crate::types::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    Idle,
    Moving,
}

/// Consumes pathfinder output and advances a unit's position one tick at a
/// time, snapping onto waypoints and switching to the arrival tolerance on
/// the final leg.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    status_moving: bool,
    waypoints: Vec<Vector3>,
    index: usize,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            status_moving: false,
            waypoints: Vec::new(),
            index: 0,
        }
    }

    pub fn status(&self) -> NavStatus {
        if self.status_moving {
            NavStatus::Moving
        } else {
            NavStatus::Idle
        }
    }

    pub fn is_moving(&self) -> bool {
        self.status_moving
    }

    /// Sets a new movement goal. `Air` units (and units with no pathfinder
    /// available) move in a straight line; everyone else routes through
    /// the pathfinder, falling back to a straight line if no path is
    /// found.
    pub fn set_goal(&mut self, goal: Vector3, pathfinder: Option<&Pathfinder>, current: Vector3, layer: &str) {
        self.waypoints = match (layer, pathfinder) {
            ("Air", _) | (_, None) => vec![goal],
            (_, Some(pf)) => {
                let result = pf.find_path(current.x, current.z, goal.x, goal.z, layer);
                if result.found {
                    result.waypoints
                } else {
                    vec![goal]
                }
            }
        };
        self.index = 0;
        self.status_moving = true;
    }

    pub fn abort(&mut self) {
        self.status_moving = false;
        self.waypoints.clear();
        self.index = 0;
    }

    /// Advances `position` by up to `max_speed * dt`, possibly crossing
    /// several waypoints in one tick. Returns whether the unit is still
    /// moving after this update.
    pub fn update(&mut self, position: &mut Vector3, max_speed: f32, dt: f32, terrain: Option<&Terrain>, config: &SimConfig) -> bool {
        if !self.status_moving || self.waypoints.is_empty() {
            self.status_moving = false;
            return false;
        }

        let mut remaining = max_speed * dt;

        loop {
            if self.index >= self.waypoints.len() {
                self.status_moving = false;
                self.waypoints.clear();
                break;
            }

            let target = self.waypoints[self.index];
            let is_final = self.index + 1 == self.waypoints.len();
            let tolerance = if is_final {
                config.arrival_tolerance
            } else {
                config.waypoint_tolerance
            };

            let dx = target.x - position.x;
            let dz = target.z - position.z;
            let dist = (dx * dx + dz * dz).sqrt();

            if dist <= tolerance {
                position.x = target.x;
                position.z = target.z;
                if is_final {
                    self.status_moving = false;
                    self.waypoints.clear();
                    break;
                }
                self.index += 1;
                if remaining <= 0.0 {
                    break;
                }
                continue;
            }

            if remaining >= dist {
                position.x = target.x;
                position.z = target.z;
                remaining -= dist;
                if is_final {
                    self.status_moving = false;
                    self.waypoints.clear();
                    break;
                }
                self.index += 1;
                if remaining <= 0.0 {
                    break;
                }
                continue;
            }

            let step = remaining / dist;
            position.x += dx * step;
            position.z += dz * step;
            break;
        }

        if let Some(t) = terrain {
            position.y = t.get_surface_height(position.x, position.z);
        }

        self.status_moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_goal_for_air_layer() {
        let mut nav = Navigator::new();
        nav.set_goal(Vector3::new(10.0, 0.0, 0.0), None, Vector3::ZERO, "Air");
        assert!(nav.is_moving());
        let config = SimConfig::default();
        let mut pos = Vector3::ZERO;
        for _ in 0..200 {
            if !nav.update(&mut pos, 5.0, 0.1, None, &config) {
                break;
            }
        }
        assert!(!nav.is_moving());
        assert!((pos.x - 10.0).abs() <= config.arrival_tolerance);
    }

    #[test]
    fn arrives_within_tolerance_and_stops() {
        let mut nav = Navigator::new();
        let config = SimConfig::default();
        nav.set_goal(Vector3::new(1.0, 0.0, 0.0), None, Vector3::ZERO, "Land");
        let mut pos = Vector3::ZERO;
        let moved = nav.update(&mut pos, 10.0, 0.1, None, &config);
        assert!(!moved);
        assert_eq!(pos.x, 1.0);
    }

    #[test]
    fn abort_clears_waypoints_and_status() {
        let mut nav = Navigator::new();
        nav.set_goal(Vector3::new(50.0, 0.0, 0.0), None, Vector3::ZERO, "Land");
        nav.abort();
        assert!(!nav.is_moving());
    }
}
