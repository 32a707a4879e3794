//! Passability grid derived from terrain (Component D).

use super::heightmap::Heightmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPassability {
    /// Open terrain — land units can traverse.
    Passable,
    /// Cliff or steep slope — blocks all ground units.
    Impassable,
    /// Submerged — blocks land, allows naval.
    Water,
    /// Dynamic building footprint — blocks all ground.
    Obstacle,
}

/// Grid-quantized passability derived from a heightmap's slope and water
/// level. Cell size and slope threshold are baked in at construction and
/// cannot be changed afterward, since the `base_cells` snapshot used by
/// [`PathfindingGrid::clear_obstacle`] is built against them.
#[derive(Debug, Clone)]
pub struct PathfindingGrid {
    grid_width: u32,
    grid_height: u32,
    cell_size: u32,
    cells: Vec<CellPassability>,
    /// Terrain-only passability, snapshotted at construction, used to
    /// restore cells after [`PathfindingGrid::clear_obstacle`].
    base_cells: Vec<CellPassability>,
}

impl PathfindingGrid {
    /// Builds a passability grid from heightmap + water data. `cell_size` is
    /// world units per grid cell; `slope_threshold` is the max height delta
    /// per world unit that remains passable.
    pub fn new(
        heightmap: &Heightmap,
        water_elevation: f32,
        has_water: bool,
        cell_size: u32,
        slope_threshold: f32,
    ) -> Self {
        let map_width = heightmap.map_width();
        let map_height = heightmap.map_height();

        let grid_width = (map_width + cell_size - 1) / cell_size;
        let grid_height = (map_height + cell_size - 1) / cell_size;
        let grid_width = grid_width.max(1);
        let grid_height = grid_height.max(1);

        let max_diff = slope_threshold * cell_size as f32;
        let mut cells = vec![CellPassability::Passable; (grid_width * grid_height) as usize];

        for gz in 0..grid_height {
            for gx in 0..grid_width {
                let hx0 = gx * cell_size;
                let hz0 = gz * cell_size;
                let hx1 = (hx0 + cell_size).min(map_width);
                let hz1 = (hz0 + cell_size).min(map_height);

                let h00 = heightmap.get_height_at_grid(hx0, hz0);
                let h10 = heightmap.get_height_at_grid(hx1, hz0);
                let h01 = heightmap.get_height_at_grid(hx0, hz1);
                let h11 = heightmap.get_height_at_grid(hx1, hz1);

                let d1 = (h10 - h00).abs();
                let d2 = (h01 - h00).abs();
                let d3 = (h11 - h10).abs();
                let d4 = (h11 - h01).abs();
                let max_slope = d1.max(d2).max(d3).max(d4);

                let pass = if max_slope > max_diff {
                    CellPassability::Impassable
                } else if has_water {
                    let avg_h = (h00 + h10 + h01 + h11) * 0.25;
                    if avg_h < water_elevation {
                        CellPassability::Water
                    } else {
                        CellPassability::Passable
                    }
                } else {
                    CellPassability::Passable
                };

                cells[(gz * grid_width + gx) as usize] = pass;
            }
        }

        let base_cells = cells.clone();
        Self {
            grid_width,
            grid_height,
            cell_size,
            cells,
            base_cells,
        }
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }
    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn get(&self, gx: u32, gz: u32) -> CellPassability {
        if gx >= self.grid_width || gz >= self.grid_height {
            return CellPassability::Impassable;
        }
        self.cells[(gz * self.grid_width + gx) as usize]
    }

    /// Checks whether a cell is passable for a given movement layer
    /// (`"Air"`, `"Water"`/`"Seabed"`/`"Sub"`, or land by default).
    pub fn is_passable_for(&self, gx: u32, gz: u32, layer: &str) -> bool {
        if gx >= self.grid_width || gz >= self.grid_height {
            return false;
        }
        let cell = self.cells[(gz * self.grid_width + gx) as usize];

        match layer {
            "Air" => true,
            "Water" | "Seabed" | "Sub" => cell == CellPassability::Water,
            _ => cell == CellPassability::Passable,
        }
    }

    pub fn world_to_grid(&self, wx: f32, wz: f32) -> (u32, u32) {
        let fx = wx / self.cell_size as f32;
        let fz = wz / self.cell_size as f32;
        let gx = fx.max(0.0).min((self.grid_width - 1) as f32) as u32;
        let gz = fz.max(0.0).min((self.grid_height - 1) as f32) as u32;
        (gx, gz)
    }

    /// Grid coordinates to world position (cell center).
    pub fn grid_to_world(&self, gx: u32, gz: u32) -> (f32, f32) {
        let wx = (gx as f32 + 0.5) * self.cell_size as f32;
        let wz = (gz as f32 + 0.5) * self.cell_size as f32;
        (wx, wz)
    }

    fn footprint_bounds(&self, wx: f32, wz: f32, size_x: f32, size_z: f32) -> (u32, u32, u32, u32) {
        let half_x = size_x * 0.5;
        let half_z = size_z * 0.5;
        let (gx0, gz0) = self.world_to_grid(wx - half_x, wz - half_z);
        let (gx1, gz1) = self.world_to_grid(wx + half_x, wz + half_z);
        (gx0, gz0, gx1, gz1)
    }

    /// Marks a rectangular footprint (center `(wx, wz)`, world-unit size
    /// `size_x` by `size_z`) as [`CellPassability::Obstacle`].
    pub fn mark_obstacle(&mut self, wx: f32, wz: f32, size_x: f32, size_z: f32) {
        let (gx0, gz0, gx1, gz1) = self.footprint_bounds(wx, wz, size_x, size_z);
        for z in gz0..=gz1 {
            for x in gx0..=gx1 {
                self.cells[(z * self.grid_width + x) as usize] = CellPassability::Obstacle;
            }
        }
    }

    /// Restores a footprint to its original terrain passability.
    pub fn clear_obstacle(&mut self, wx: f32, wz: f32, size_x: f32, size_z: f32) {
        let (gx0, gz0, gx1, gz1) = self.footprint_bounds(wx, wz, size_x, size_z);
        for z in gz0..=gz1 {
            for x in gx0..=gx1 {
                let idx = (z * self.grid_width + x) as usize;
                self.cells[idx] = self.base_cells[idx];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_dry_terrain_is_all_passable() {
        let hm = Heightmap::new(8, 8, 1.0, vec![0; 81]);
        let grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        assert_eq!(grid.get(0, 0), CellPassability::Passable);
        assert!(grid.is_passable_for(0, 0, "Land"));
        assert!(!grid.is_passable_for(0, 0, "Water"));
        assert!(grid.is_passable_for(0, 0, "Air"));
    }

    #[test]
    fn steep_slope_is_impassable() {
        let mut raw = vec![0i16; 81];
        // Grid width 9 (map_width 8). Make one corner much taller.
        raw[1] = 1000;
        let hm = Heightmap::new(8, 8, 1.0, raw);
        let grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        assert_eq!(grid.get(0, 0), CellPassability::Impassable);
    }

    #[test]
    fn mark_and_clear_obstacle_round_trips() {
        let hm = Heightmap::new(8, 8, 1.0, vec![0; 81]);
        let mut grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        grid.mark_obstacle(4.0, 4.0, 2.0, 2.0);
        assert_eq!(grid.get(2, 2), CellPassability::Obstacle);
        grid.clear_obstacle(4.0, 4.0, 2.0, 2.0);
        assert_eq!(grid.get(2, 2), CellPassability::Passable);
    }

    #[test]
    fn out_of_bounds_is_impassable() {
        let hm = Heightmap::new(8, 8, 1.0, vec![0; 81]);
        let grid = PathfindingGrid::new(&hm, 0.0, false, 2, 0.75);
        assert_eq!(grid.get(9999, 9999), CellPassability::Impassable);
        assert!(!grid.is_passable_for(9999, 9999, "Air"));
    }
}
