//! Binary `.scmap` parser (Component B).
//!
//! Reads only the header, heightmap, and water sections; textures, decals,
//! and props are skipped entirely since nothing downstream needs them.

use crate::error::{SimError, SimResult};

/// Data extracted from a `.scmap` file.
#[derive(Debug, Clone)]
pub struct ScmapData {
    pub map_width: u32,
    pub map_height: u32,
    pub height_scale: f32,
    /// `(map_width+1)*(map_height+1)` samples.
    pub heightmap: Vec<i16>,
    pub has_water: bool,
    pub water_elevation: f32,
    pub water_deep_elevation: f32,
    pub water_abyss_elevation: f32,
    pub version_minor: i32,
}

/// Tracks an offset into a byte buffer as fields are consumed in order.
struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn has_remaining(&self, bytes: usize) -> bool {
        self.pos + bytes <= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_i32(&mut self) -> i32 {
        let val = i32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        val
    }

    fn read_f32(&mut self) -> f32 {
        let val = f32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        val
    }

    fn read_u8(&mut self) -> u8 {
        let val = self.data[self.pos];
        self.pos += 1;
        val
    }

    fn skip(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    /// Reads a null-terminated string, advancing past the null byte.
    fn read_cstring(&mut self) {
        while self.pos < self.data.len() && self.data[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    /// Reads `count` little-endian `i16` samples.
    fn read_i16_array(&mut self, count: usize) -> Vec<i16> {
        let mut result = Vec::with_capacity(count);
        for i in 0..count {
            let off = self.pos + i * 2;
            result.push(i16::from_le_bytes(self.data[off..off + 2].try_into().unwrap()));
        }
        self.pos += count * 2;
        result
    }
}

/// Parses a `.scmap` file and extracts heightmap + water data.
pub fn parse_scmap(file_data: &[u8]) -> SimResult<ScmapData> {
    if file_data.len() < 30 {
        return Err(SimError::MapParse("SCMAP file too small".to_string()));
    }

    let mut r = BinaryReader::new(file_data);

    // --- Header ---
    let magic = [r.read_u8(), r.read_u8(), r.read_u8(), r.read_u8()];
    if magic != [b'M', b'a', b'p', 0x1a] {
        return Err(SimError::MapParse(
            "invalid SCMAP magic (expected 'Map\\x1a')".to_string(),
        ));
    }

    let _version_major = r.read_i32();
    r.skip(4); // unknown
    r.skip(4); // unknown
    let _scaled_width = r.read_f32();
    let _scaled_height = r.read_f32();
    r.skip(4); // unknown
    r.skip(2); // unknown (int16)

    // --- Preview image ---
    if !r.has_remaining(4) {
        return Err(SimError::MapParse("truncated before preview length".to_string()));
    }
    let preview_length = r.read_i32();
    if preview_length < 0 || !r.has_remaining(preview_length as usize) {
        return Err(SimError::MapParse("invalid preview image length".to_string()));
    }
    r.skip(preview_length as usize);

    // --- Version + dimensions ---
    if !r.has_remaining(16) {
        return Err(SimError::MapParse("truncated before dimensions".to_string()));
    }
    let version_minor = r.read_i32();
    let map_width = r.read_i32() as u32;
    let map_height = r.read_i32() as u32;

    if map_width == 0 || map_height == 0 || map_width > 4096 || map_height > 4096 {
        return Err(SimError::MapParse(format!(
            "invalid dimensions: {map_width}x{map_height}"
        )));
    }

    // --- Heightmap ---
    let height_scale = r.read_f32();
    let grid_w = map_width as usize + 1;
    let grid_h = map_height as usize + 1;
    let heightmap_count = grid_w * grid_h;
    let heightmap_bytes = heightmap_count * 2;

    if !r.has_remaining(heightmap_bytes) {
        return Err(SimError::MapParse(format!(
            "truncated in heightmap data (need {heightmap_bytes} bytes, have {})",
            r.remaining()
        )));
    }
    let heightmap = r.read_i16_array(heightmap_count);

    // --- Skip shader/environment strings to reach water data ---
    // Format: flag byte + shader(cstr) + background(cstr) + sky(cstr)
    //         + int32 env_count + (name_cstr, file_cstr) * env_count
    if !r.has_remaining(1) {
        return Err(SimError::MapParse("truncated before shader section".to_string()));
    }
    r.skip(1); // unknown flag byte before shader strings

    r.read_cstring(); // terrain shader
    r.read_cstring(); // background texture
    r.read_cstring(); // sky cubemap

    if !r.has_remaining(4) {
        return Err(SimError::MapParse("truncated before env cubemap count".to_string()));
    }
    let env_cubemap_count = r.read_i32();
    if !(0..=128).contains(&env_cubemap_count) {
        return Err(SimError::MapParse(format!(
            "invalid env cubemap count: {env_cubemap_count}"
        )));
    }
    for _ in 0..env_cubemap_count {
        r.read_cstring(); // cubemap name
        r.read_cstring(); // cubemap file
    }

    // Lighting data: 23 floats = 92 bytes.
    if !r.has_remaining(92) {
        return Err(SimError::MapParse("truncated before lighting data".to_string()));
    }
    r.skip(92);

    // --- Water ---
    let mut has_water = false;
    let mut water_elevation = 0.0;
    let mut water_deep_elevation = 0.0;
    let mut water_abyss_elevation = 0.0;

    if r.has_remaining(1) {
        has_water = r.read_u8() != 0;
    }
    if has_water && r.has_remaining(12) {
        water_elevation = r.read_f32();
        water_deep_elevation = r.read_f32();
        water_abyss_elevation = r.read_f32();
    }

    // --- Done: rest of the file (textures, decals, props) is ignored. ---

    Ok(ScmapData {
        map_width,
        map_height,
        height_scale,
        heightmap,
        has_water,
        water_elevation,
        water_deep_elevation,
        water_abyss_elevation,
        version_minor,
    })
}
