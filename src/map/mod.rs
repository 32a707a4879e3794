//! Map loading and the terrain-derived query structures built from it:
//! heightmap (B), passability grid (D), pathfinder (E), and visibility
//! grid (F).

pub mod heightmap;
pub mod pathfinder;
pub mod pathfinding_grid;
pub mod scmap;
pub mod terrain;
pub mod visibility;

pub use heightmap::Heightmap;
pub use pathfinder::{PathResult, Pathfinder};
pub use pathfinding_grid::{CellPassability, PathfindingGrid};
pub use scmap::{parse_scmap, ScmapData};
pub use terrain::Terrain;
pub use visibility::{VisFlag, VisibilityGrid};

use crate::config::SimConfig;

/// Parses a `.scmap` buffer and assembles the derived [`Terrain`],
/// [`PathfindingGrid`], and [`VisibilityGrid`] in one call, using the given
/// configuration's cell size and slope threshold. Mirrors
/// `scenario_loader.cpp`'s boot sequence, which calls
/// `build_pathfinding_grid()` followed immediately by
/// `build_visibility_grid()` once the heightmap is in hand.
pub fn load_map(file_data: &[u8], config: &SimConfig) -> crate::error::SimResult<(Terrain, PathfindingGrid, VisibilityGrid)> {
    let data = parse_scmap(file_data)?;
    let heightmap = Heightmap::new(data.map_width, data.map_height, data.height_scale, data.heightmap);
    let grid = PathfindingGrid::new(
        &heightmap,
        data.water_elevation,
        data.has_water,
        config.pathfinding_cell_size,
        config.pathfinding_slope_threshold,
    );
    let terrain = Terrain::new(heightmap, data.water_elevation, data.has_water);
    let mut vis = VisibilityGrid::new(terrain.map_width(), terrain.map_height());
    vis.build_height_grid(&terrain);
    Ok((terrain, grid, vis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_map_assembles_terrain_and_grid() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"Map\x1a");
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&256.0f32.to_le_bytes());
        buf.extend_from_slice(&256.0f32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&[0u8; 2]);
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&56i32.to_le_bytes());
        buf.extend_from_slice(&8i32.to_le_bytes());
        buf.extend_from_slice(&8i32.to_le_bytes());
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        for _ in 0..(9 * 9) {
            buf.extend_from_slice(&0i16.to_le_bytes());
        }
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 92]);
        buf.push(0);

        let config = SimConfig::default();
        let (terrain, grid, vis) = load_map(&buf, &config).unwrap();
        assert_eq!(terrain.map_width(), 8);
        assert_eq!(grid.grid_width(), 4);
        assert_eq!(vis.grid_width(), 1);
    }
}
