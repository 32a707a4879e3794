//! Terrain: heightmap plus water level, and the height queries simulation
//! code actually calls.

use super::heightmap::Heightmap;

/// Combines a heightmap with water data, exposing the surface-height query
/// unit movement and weapon impacts use.
#[derive(Debug, Clone)]
pub struct Terrain {
    heightmap: Heightmap,
    water_elevation: f32,
    has_water: bool,
}

impl Terrain {
    pub fn new(heightmap: Heightmap, water_elevation: f32, has_water: bool) -> Self {
        Self {
            heightmap,
            water_elevation,
            has_water,
        }
    }

    /// Raw terrain height at world position (may be below water).
    pub fn get_terrain_height(&self, x: f32, z: f32) -> f32 {
        self.heightmap.get_height(x, z)
    }

    /// Surface height: `max(terrain_height, water_elevation)` when water is
    /// present; otherwise just the terrain height.
    pub fn get_surface_height(&self, x: f32, z: f32) -> f32 {
        let h = self.heightmap.get_height(x, z);
        if self.has_water {
            h.max(self.water_elevation)
        } else {
            h
        }
    }

    pub fn water_elevation(&self) -> f32 {
        self.water_elevation
    }
    pub fn has_water(&self) -> bool {
        self.has_water
    }
    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }
    pub fn map_width(&self) -> u32 {
        self.heightmap.map_width()
    }
    pub fn map_height(&self) -> u32 {
        self.heightmap.map_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_height_clamps_to_water_level() {
        let hm = Heightmap::new(2, 2, 1.0, vec![-5; 9]);
        let terrain = Terrain::new(hm, 2.0, true);
        assert_eq!(terrain.get_terrain_height(1.0, 1.0), -5.0);
        assert_eq!(terrain.get_surface_height(1.0, 1.0), 2.0);
    }

    #[test]
    fn surface_height_ignores_water_elevation_when_no_water() {
        let hm = Heightmap::new(2, 2, 1.0, vec![-5; 9]);
        let terrain = Terrain::new(hm, 2.0, false);
        assert_eq!(terrain.get_surface_height(1.0, 1.0), -5.0);
    }
}
