//! Per-army visibility grid (Component F). Pure data structure with no
//! simulation dependencies beyond [`Terrain`] for line-of-sight sampling.

use super::terrain::Terrain;

pub const CELL_SIZE: u32 = 16;
pub const MAX_ARMIES: u32 = 16;
pub const EYE_OFFSET: f32 = 2.0;

/// Bit flags for per-army per-cell visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisFlag(u8);

impl VisFlag {
    pub const NONE: VisFlag = VisFlag(0);
    /// Direct line-of-sight.
    pub const VISION: VisFlag = VisFlag(1 << 0);
    pub const RADAR: VisFlag = VisFlag(1 << 1);
    pub const SONAR: VisFlag = VisFlag(1 << 2);
    pub const OMNI: VisFlag = VisFlag(1 << 3);
    /// Sticky — never cleared once set.
    pub const EVER_SEEN: VisFlag = VisFlag(1 << 4);

    pub fn contains(self, test: VisFlag) -> bool {
        (self.0 & test.0) != 0
    }
}

impl std::ops::BitOr for VisFlag {
    type Output = VisFlag;
    fn bitor(self, rhs: VisFlag) -> VisFlag {
        VisFlag(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for VisFlag {
    fn bitor_assign(&mut self, rhs: VisFlag) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for VisFlag {
    type Output = VisFlag;
    fn bitand(self, rhs: VisFlag) -> VisFlag {
        VisFlag(self.0 & rhs.0)
    }
}

/// Per-army visibility grid tracking Vision/Radar/Sonar/Omni/EverSeen per
/// cell per army, up to [`MAX_ARMIES`] armies.
pub struct VisibilityGrid {
    grid_width: u32,
    grid_height: u32,
    /// `cells[army][gz * grid_width + gx]`.
    cells: Vec<Vec<VisFlag>>,
    /// Pre-sampled terrain height at each cell center, built once via
    /// [`VisibilityGrid::build_height_grid`] before any `paint_circle_los`
    /// call.
    height_grid: Vec<f32>,
}

impl VisibilityGrid {
    pub fn new(map_width: u32, map_height: u32) -> Self {
        let mut grid_width = map_width / CELL_SIZE;
        let mut grid_height = map_height / CELL_SIZE;
        if grid_width == 0 {
            grid_width = 1;
        }
        if grid_height == 0 {
            grid_height = 1;
        }
        let total = (grid_width * grid_height) as usize;
        Self {
            grid_width,
            grid_height,
            cells: (0..MAX_ARMIES).map(|_| vec![VisFlag::NONE; total]).collect(),
            height_grid: Vec::new(),
        }
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }
    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }
    pub fn cell_size(&self) -> u32 {
        CELL_SIZE
    }

    pub fn world_to_grid(&self, wx: f32, wz: f32) -> (u32, u32) {
        let fx = wx / CELL_SIZE as f32;
        let fz = wz / CELL_SIZE as f32;
        let gx = fx.max(0.0).min((self.grid_width - 1) as f32) as u32;
        let gz = fz.max(0.0).min((self.grid_height - 1) as f32) as u32;
        (gx, gz)
    }

    /// Clears transient flags (Vision/Radar/Sonar/Omni) but keeps EverSeen.
    pub fn clear_transient(&mut self) {
        for army_cells in &mut self.cells {
            for cell in army_cells {
                *cell = *cell & VisFlag::EVER_SEEN;
            }
        }
    }

    fn cell_center(&self, gx: u32, gz: u32) -> (f32, f32) {
        (
            (gx as f32 + 0.5) * CELL_SIZE as f32,
            (gz as f32 + 0.5) * CELL_SIZE as f32,
        )
    }

    /// Paints a circle of the given flag for the given army. If `flag`
    /// includes Vision, affected cells also get EverSeen.
    pub fn paint_circle(&mut self, army: u32, wx: f32, wz: f32, radius: f32, flag: VisFlag) {
        if army >= MAX_ARMIES || radius <= 0.0 {
            return;
        }

        let (gx_min, gz_min) = self.world_to_grid(wx - radius, wz - radius);
        let (gx_max, gz_max) = self.world_to_grid(wx + radius, wz + radius);
        let r_sq = radius * radius;

        for gz in gz_min..=gz_max {
            for gx in gx_min..=gx_max {
                let (cx, cz) = self.cell_center(gx, gz);
                let (dx, dz) = (cx - wx, cz - wz);
                if dx * dx + dz * dz <= r_sq {
                    let idx = (gz * self.grid_width + gx) as usize;
                    self.cells[army as usize][idx] |= flag;
                    if flag.contains(VisFlag::VISION) {
                        self.cells[army as usize][idx] |= VisFlag::EVER_SEEN;
                    }
                }
            }
        }
    }

    /// ORs all flags from army `src` into army `dst` (alliance sharing).
    pub fn merge_armies(&mut self, dst: u32, src: u32) {
        if dst >= MAX_ARMIES || src >= MAX_ARMIES {
            return;
        }
        let total = (self.grid_width * self.grid_height) as usize;
        for i in 0..total {
            let src_flag = self.cells[src as usize][i];
            self.cells[dst as usize][i] |= src_flag;
        }
    }

    pub fn get(&self, gx: u32, gz: u32, army: u32) -> VisFlag {
        if army >= MAX_ARMIES || gx >= self.grid_width || gz >= self.grid_height {
            return VisFlag::NONE;
        }
        self.cells[army as usize][(gz * self.grid_width + gx) as usize]
    }

    fn query(&self, wx: f32, wz: f32, army: u32, flag: VisFlag) -> bool {
        let (gx, gz) = self.world_to_grid(wx, wz);
        self.get(gx, gz, army).contains(flag)
    }

    pub fn has_vision(&self, wx: f32, wz: f32, army: u32) -> bool {
        self.query(wx, wz, army, VisFlag::VISION)
    }
    pub fn has_radar(&self, wx: f32, wz: f32, army: u32) -> bool {
        self.query(wx, wz, army, VisFlag::RADAR)
    }
    pub fn has_sonar(&self, wx: f32, wz: f32, army: u32) -> bool {
        self.query(wx, wz, army, VisFlag::SONAR)
    }
    pub fn has_omni(&self, wx: f32, wz: f32, army: u32) -> bool {
        self.query(wx, wz, army, VisFlag::OMNI)
    }
    pub fn ever_seen(&self, wx: f32, wz: f32, army: u32) -> bool {
        self.query(wx, wz, army, VisFlag::EVER_SEEN)
    }

    /// Pre-computes terrain height at each grid cell center. Must be called
    /// once after construction, before any `paint_circle_los` call.
    pub fn build_height_grid(&mut self, terrain: &Terrain) {
        let total = (self.grid_width * self.grid_height) as usize;
        self.height_grid = vec![0.0; total];
        for gz in 0..self.grid_height {
            for gx in 0..self.grid_width {
                let (cx, cz) = self.cell_center(gx, gz);
                self.height_grid[(gz * self.grid_width + gx) as usize] =
                    terrain.get_terrain_height(cx, cz);
            }
        }
    }

    /// Bresenham LOS check: true if the target cell is visible from the
    /// source, given the source's eye height. Tracks the running maximum of
    /// a signed-squared slope along the ray to avoid `sqrt` while preserving
    /// the ordering a real slope comparison would give.
    fn check_los(&self, src_gx: u32, src_gz: u32, tgt_gx: u32, tgt_gz: u32, eye_height: f32) -> bool {
        if src_gx == tgt_gx && src_gz == tgt_gz {
            return true;
        }

        let cell_f = CELL_SIZE as f32;
        let src_wx = (src_gx as f32 + 0.5) * cell_f;
        let src_wz = (src_gz as f32 + 0.5) * cell_f;

        let mut dx = tgt_gx as i32 - src_gx as i32;
        let mut dz = tgt_gz as i32 - src_gz as i32;
        let sx: i32 = if dx > 0 { 1 } else if dx < 0 { -1 } else { 0 };
        let sz: i32 = if dz > 0 { 1 } else if dz < 0 { -1 } else { 0 };
        dx = dx.abs();
        dz = dz.abs();

        let mut x = src_gx as i32;
        let mut z = src_gz as i32;

        let mut max_ssq = -1e30f32;
        let signed_slope_sq = |h_diff: f32, dist_sq: f32| h_diff * h_diff.abs() / dist_sq;

        let steps = dx.max(dz);
        let mut err = steps / 2;

        for _ in 0..=steps {
            if !(x as u32 == src_gx && z as u32 == src_gz) {
                let (cwx, cwz) = self.cell_center(x as u32, z as u32);
                let ddx = cwx - src_wx;
                let ddz = cwz - src_wz;
                let dist_sq = ddx * ddx + ddz * ddz;
                let h = self.height_grid[(z as u32 * self.grid_width + x as u32) as usize];
                let ssq = signed_slope_sq(h - eye_height, dist_sq);

                if x as u32 == tgt_gx && z as u32 == tgt_gz {
                    return ssq >= max_ssq;
                }
                max_ssq = max_ssq.max(ssq);
            }

            if dx >= dz {
                err -= dz;
                if err < 0 {
                    z += sz;
                    err += dx;
                }
                x += sx;
            } else {
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

    /// Paints Vision with terrain line-of-sight occlusion. `eye_height` is
    /// `terrain_height(unit_pos) + EYE_OFFSET`.
    pub fn paint_circle_los(&mut self, army: u32, wx: f32, wz: f32, radius: f32, eye_height: f32) {
        if army >= MAX_ARMIES || radius <= 0.0 || self.height_grid.is_empty() {
            return;
        }

        let (src_gx, src_gz) = self.world_to_grid(wx, wz);
        let (gx_min, gz_min) = self.world_to_grid(wx - radius, wz - radius);
        let (gx_max, gz_max) = self.world_to_grid(wx + radius, wz + radius);
        let r_sq = radius * radius;

        for gz in gz_min..=gz_max {
            for gx in gx_min..=gx_max {
                let (cx, cz) = self.cell_center(gx, gz);
                let (ddx, ddz) = (cx - wx, cz - wz);
                if ddx * ddx + ddz * ddz > r_sq {
                    continue;
                }

                if gx == src_gx && gz == src_gz {
                    let idx = (gz * self.grid_width + gx) as usize;
                    self.cells[army as usize][idx] |= VisFlag::VISION | VisFlag::EVER_SEEN;
                    continue;
                }

                if self.check_los(src_gx, src_gz, gx, gz, eye_height) {
                    let idx = (gz * self.grid_width + gx) as usize;
                    self.cells[army as usize][idx] |= VisFlag::VISION | VisFlag::EVER_SEEN;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::heightmap::Heightmap;

    #[test]
    fn paint_circle_sets_vision_and_ever_seen() {
        let mut grid = VisibilityGrid::new(64, 64);
        grid.paint_circle(0, 32.0, 32.0, 20.0, VisFlag::VISION);
        assert!(grid.has_vision(32.0, 32.0, 0));
        assert!(grid.ever_seen(32.0, 32.0, 0));
    }

    #[test]
    fn clear_transient_keeps_ever_seen_only() {
        let mut grid = VisibilityGrid::new(64, 64);
        grid.paint_circle(0, 32.0, 32.0, 20.0, VisFlag::VISION);
        grid.clear_transient();
        assert!(!grid.has_vision(32.0, 32.0, 0));
        assert!(grid.ever_seen(32.0, 32.0, 0));
    }

    #[test]
    fn merge_armies_ors_flags() {
        let mut grid = VisibilityGrid::new(64, 64);
        grid.paint_circle(1, 32.0, 32.0, 10.0, VisFlag::VISION);
        grid.merge_armies(0, 1);
        assert!(grid.has_vision(32.0, 32.0, 0));
    }

    #[test]
    fn los_source_cell_always_visible() {
        let hm = Heightmap::new(64, 64, 1.0, vec![0; 65 * 65]);
        let terrain = Terrain::new(hm, 0.0, false);
        let mut grid = VisibilityGrid::new(64, 64);
        grid.build_height_grid(&terrain);
        grid.paint_circle_los(0, 32.0, 32.0, 20.0, EYE_OFFSET);
        assert!(grid.has_vision(32.0, 32.0, 0));
    }

    #[test]
    fn los_blocked_by_intervening_ridge() {
        let width = 64;
        let height = 64;
        let grid_w = width + 1;
        let grid_h = height + 1;
        let mut raw = vec![0i16; (grid_w * grid_h) as usize];
        // Tall ridge directly between source and a target further along x.
        for gz in 0..grid_h {
            raw[(gz * grid_w + 32) as usize] = 500;
        }
        let hm = Heightmap::new(width, height, 1.0, raw);
        let terrain = Terrain::new(hm, 0.0, false);
        let mut grid = VisibilityGrid::new(width, height);
        grid.build_height_grid(&terrain);
        grid.paint_circle_los(0, 8.0, 32.0, 60.0, EYE_OFFSET);
        assert!(!grid.has_vision(56.0, 32.0, 0));
    }
}
