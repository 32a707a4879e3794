//! A* pathfinder over a [`PathfindingGrid`] (Component E).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::Vector3;

use super::pathfinding_grid::PathfindingGrid;

const SQRT2: f32 = 1.414_213_6;
const MAX_NODES_EXPLORED: u32 = 50_000;

#[derive(Debug, Clone, Default)]
pub struct PathResult {
    pub found: bool,
    /// World-space positions, smoothed.
    pub waypoints: Vec<Vector3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f_cost: f32,
    node: u32,
}

impl Eq for OpenEntry {}

// Reversed ordering so `BinaryHeap` (a max-heap) behaves as a min-heap on
// `f_cost`.
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Pathfinder<'a> {
    grid: &'a PathfindingGrid,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a PathfindingGrid) -> Self {
        Self { grid }
    }

    /// Finds a path from `(start_x, start_z)` to `(goal_x, goal_z)` for the
    /// given movement layer. Returns smoothed waypoints in world
    /// coordinates.
    pub fn find_path(
        &self,
        start_x: f32,
        start_z: f32,
        goal_x: f32,
        goal_z: f32,
        layer: &str,
    ) -> PathResult {
        let mut result = PathResult::default();

        let (sx, sz) = self.grid.world_to_grid(start_x, start_z);
        let (mut gx, mut gz) = self.grid.world_to_grid(goal_x, goal_z);
        let mut goal_x = goal_x;
        let mut goal_z = goal_z;

        if sx == gx && sz == gz {
            result.found = true;
            result.waypoints.push(Vector3::new(goal_x, 0.0, goal_z));
            return result;
        }

        if !self.grid.is_passable_for(gx, gz, layer) {
            let Some((snapped_x, snapped_z)) = self.snap_to_passable(gx, gz, layer) else {
                tracing::debug!(goal_x, goal_z, "pathfinder: no passable cell near goal");
                return result;
            };
            gx = snapped_x;
            gz = snapped_z;
            let (wx, wz) = self.grid.grid_to_world(gx, gz);
            goal_x = wx;
            goal_z = wz;
        }

        let grid_path = self.astar(sx, sz, gx, gz, layer);
        if grid_path.is_empty() {
            tracing::debug!(sx, sz, gx, gz, "pathfinder: a* found no path");
            return result;
        }

        let smoothed = self.smooth_path(&grid_path, layer);

        result.found = true;
        for &(x, z) in &smoothed {
            let (wx, wz) = self.grid.grid_to_world(x, z);
            result.waypoints.push(Vector3::new(wx, 0.0, wz));
        }

        if let Some(last) = result.waypoints.last_mut() {
            last.x = goal_x;
            last.z = goal_z;
        }

        result
    }

    /// Spirals outward from an impassable goal cell (perimeter rings,
    /// Chebyshev radius 1..=20) looking for the nearest passable cell.
    fn snap_to_passable(&self, gx: u32, gz: u32, layer: &str) -> Option<(u32, u32)> {
        let igx = gx as i32;
        let igz = gz as i32;

        for radius in 1..=20i32 {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dz.abs() != radius {
                        continue; // perimeter only
                    }
                    let nx = igx + dx;
                    let nz = igz + dz;
                    if nx < 0 || nz < 0 {
                        continue;
                    }
                    let (ux, uz) = (nx as u32, nz as u32);
                    if self.grid.is_passable_for(ux, uz, layer) {
                        return Some((ux, uz));
                    }
                }
            }
        }
        None
    }

    /// Raw A* over grid cells. Returns the cell path start→goal, empty if
    /// none was found (including when the node-expansion cap is hit).
    fn astar(&self, sx: u32, sz: u32, gx: u32, gz: u32, layer: &str) -> Vec<(u32, u32)> {
        let w = self.grid.grid_width();
        let h = self.grid.grid_height();
        let total = (w * h) as usize;
        let cs = self.grid.cell_size() as f32;

        let idx = |x: u32, z: u32| -> usize { (z * w + x) as usize };

        let mut g_cost = vec![f32::MAX; total];
        let mut parent = vec![u32::MAX; total];
        let mut closed = vec![false; total];

        let mut open = BinaryHeap::new();

        let heuristic = |x: u32, z: u32| -> f32 {
            let dx = if x > gx { x - gx } else { gx - x } as f32;
            let dz = if z > gz { z - gz } else { gz - z } as f32;
            let mn = dx.min(dz);
            let mx = dx.max(dz);
            (mx + (SQRT2 - 1.0) * mn) * cs
        };

        let start_idx = idx(sx, sz);
        g_cost[start_idx] = 0.0;
        open.push(OpenEntry {
            f_cost: heuristic(sx, sz),
            node: start_idx as u32,
        });

        const DIRS: [(i32, i32); 8] = [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ];

        let mut nodes_explored = 0u32;
        let goal_idx = idx(gx, gz) as u32;

        while let Some(OpenEntry { node: cur_idx, .. }) = open.pop() {
            if cur_idx == goal_idx {
                break;
            }
            if closed[cur_idx as usize] {
                continue;
            }
            closed[cur_idx as usize] = true;

            nodes_explored += 1;
            if nodes_explored > MAX_NODES_EXPLORED {
                tracing::debug!(MAX_NODES_EXPLORED, "pathfinder: a* hit search limit");
                return Vec::new();
            }

            let cx = cur_idx % w;
            let cz = cur_idx / w;

            for &(dx, dz) in &DIRS {
                let nx = cx as i32 + dx;
                let nz = cz as i32 + dz;
                if nx < 0 || nz < 0 || nx as u32 >= w || nz as u32 >= h {
                    continue;
                }
                let (unx, unz) = (nx as u32, nz as u32);
                let n_idx = idx(unx, unz);

                if closed[n_idx] {
                    continue;
                }
                if !self.grid.is_passable_for(unx, unz, layer) {
                    continue;
                }

                let diagonal = dx != 0 && dz != 0;
                if diagonal {
                    // Prevent cutting corners through walls: both cardinal
                    // neighbors of the *original* current cell must also be
                    // passable.
                    let card_x = (cx as i32 + dx) as u32;
                    let card_z = (cz as i32 + dz) as u32;
                    if !self.grid.is_passable_for(card_x, cz, layer)
                        || !self.grid.is_passable_for(cx, card_z, layer)
                    {
                        continue;
                    }
                }

                let move_cost = if diagonal { SQRT2 * cs } else { cs };
                let new_g = g_cost[cur_idx as usize] + move_cost;

                if new_g < g_cost[n_idx] {
                    g_cost[n_idx] = new_g;
                    parent[n_idx] = cur_idx;
                    let f_new = new_g + heuristic(unx, unz);
                    open.push(OpenEntry {
                        f_cost: f_new,
                        node: n_idx as u32,
                    });
                }
            }
        }

        if g_cost[goal_idx as usize] == f32::MAX {
            return Vec::new();
        }

        let mut path = Vec::new();
        let mut cur = goal_idx;
        while cur != u32::MAX {
            path.push((cur % w, cur / w));
            cur = parent[cur as usize];
        }
        path.reverse();
        path
    }

    /// Removes redundant waypoints by greedily jumping to the farthest
    /// visible waypoint from the current one.
    fn smooth_path(&self, path: &[(u32, u32)], layer: &str) -> Vec<(u32, u32)> {
        if path.len() <= 2 {
            return path.to_vec();
        }

        let mut smoothed = vec![path[0]];
        let mut current = 0usize;

        while current < path.len() - 1 {
            let mut farthest = current + 1;
            for i in (current + 2)..path.len() {
                if self.has_line_of_sight(path[current].0, path[current].1, path[i].0, path[i].1, layer) {
                    farthest = i;
                }
            }
            smoothed.push(path[farthest]);
            current = farthest;
        }

        smoothed
    }

    /// Bresenham line-of-sight check on the passability grid.
    fn has_line_of_sight(&self, x0: u32, z0: u32, x1: u32, z1: u32, layer: &str) -> bool {
        let mut dx = x1 as i32 - x0 as i32;
        let mut dz = z1 as i32 - z0 as i32;
        let sx: i32 = if dx > 0 { 1 } else if dx < 0 { -1 } else { 0 };
        let sz: i32 = if dz > 0 { 1 } else if dz < 0 { -1 } else { 0 };
        dx = dx.abs();
        dz = dz.abs();

        let mut x = x0 as i32;
        let mut z = z0 as i32;

        if dx >= dz {
            let mut err = dx / 2;
            for _ in 0..=dx {
                if !self.grid.is_passable_for(x as u32, z as u32, layer) {
                    return false;
                }
                err -= dz;
                if err < 0 {
                    z += sz;
                    err += dx;
                }
                x += sx;
            }
        } else {
            let mut err = dz / 2;
            for _ in 0..=dz {
                if !self.grid.is_passable_for(x as u32, z as u32, layer) {
                    return false;
                }
                err -= dx;
                if err < 0 {
                    x += sx;
                    err += dz;
                }
                z += sz;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::heightmap::Heightmap;

    fn flat_grid(width: u32, height: u32) -> PathfindingGrid {
        let grid_w = width + 1;
        let grid_h = height + 1;
        let hm = Heightmap::new(width, height, 1.0, vec![0; (grid_w * grid_h) as usize]);
        PathfindingGrid::new(&hm, 0.0, false, 2, 0.75)
    }

    #[test]
    fn trivial_path_when_start_equals_goal_cell() {
        let grid = flat_grid(8, 8);
        let pf = Pathfinder::new(&grid);
        let result = pf.find_path(1.0, 1.0, 1.5, 1.5, "Land");
        assert!(result.found);
        assert_eq!(result.waypoints.len(), 1);
    }

    #[test]
    fn finds_path_across_open_terrain() {
        let grid = flat_grid(20, 20);
        let pf = Pathfinder::new(&grid);
        let result = pf.find_path(1.0, 1.0, 38.0, 38.0, "Land");
        assert!(result.found);
        assert!(!result.waypoints.is_empty());
        let last = *result.waypoints.last().unwrap();
        assert_eq!(last.x, 38.0);
        assert_eq!(last.z, 38.0);
    }

    #[test]
    fn routes_around_obstacle_wall() {
        let hm = Heightmap::new(20, 20, 1.0, vec![0; 441]);
        let mut grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        // Wall across the middle, leaving a gap near one edge.
        for gx in 2..10u32 {
            let (wx, wz) = grid.grid_to_world(gx, 5);
            grid.mark_obstacle(wx, wz, 1.0, 1.0);
        }
        let pf = Pathfinder::new(&grid);
        let result = pf.find_path(4.0, 2.0, 4.0, 30.0, "Land");
        assert!(result.found);
    }

    #[test]
    fn unreachable_goal_reports_not_found() {
        let hm = Heightmap::new(10, 10, 1.0, vec![0; 121]);
        let mut grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        // Surround cell (4,4) entirely with obstacles, sealing it off.
        for &(dx, dz) in &[(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
            let gx = (4i32 + dx) as u32;
            let gz = (4i32 + dz) as u32;
            let (wx, wz) = grid.grid_to_world(gx, gz);
            grid.mark_obstacle(wx, wz, 1.0, 1.0);
        }
        let pf = Pathfinder::new(&grid);
        let (start_x, start_z) = grid.grid_to_world(0, 0);
        let (goal_x, goal_z) = grid.grid_to_world(4, 4);
        let result = pf.find_path(start_x, start_z, goal_x, goal_z, "Land");
        assert!(!result.found);
    }
}
