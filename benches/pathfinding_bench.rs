//! Benchmarks for the hot paths of the map/pathfinding/visibility stack:
//! grid construction from a heightmap, A* search across open terrain, and
//! Bresenham line-of-sight painting.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use supcom_core::map::{Heightmap, Pathfinder, PathfindingGrid, Terrain, VisibilityGrid};

fn flat_heightmap(size: u32) -> Heightmap {
    let grid_side = (size + 1) as usize;
    Heightmap::new(size, size, 1.0, vec![0i16; grid_side * grid_side])
}

fn bench_grid_construction(c: &mut Criterion) {
    let heightmap = flat_heightmap(256);
    c.bench_function("pathfinding_grid_construction_256", |b| {
        b.iter(|| PathfindingGrid::new(black_box(&heightmap), 0.0, false, 2, 0.75))
    });
}

fn bench_astar_open_terrain(c: &mut Criterion) {
    let heightmap = flat_heightmap(256);
    let grid = PathfindingGrid::new(&heightmap, 0.0, false, 2, 0.75);
    let pathfinder = Pathfinder::new(&grid);

    c.bench_function("astar_corner_to_corner_256", |b| {
        b.iter(|| pathfinder.find_path(black_box(4.0), black_box(4.0), black_box(250.0), black_box(250.0), "Land"))
    });
}

fn bench_visibility_los(c: &mut Criterion) {
    let heightmap = flat_heightmap(256);
    let terrain = Terrain::new(heightmap, 0.0, false);
    let mut vis = VisibilityGrid::new(256, 256);
    vis.build_height_grid(&terrain);

    c.bench_function("visibility_paint_circle_los_radius_40", |b| {
        b.iter(|| vis.paint_circle_los(0, black_box(128.0), black_box(128.0), black_box(40.0), black_box(12.0)))
    });
}

criterion_group!(benches, bench_grid_construction, bench_astar_open_terrain, bench_visibility_los);
criterion_main!(benches);
