//! Simulation-wide tunables.
//!
//! Generalizes the teacher's `SimConfig` resource pattern (see the original
//! `systems/performance.rs`) into the set of constants this engine's
//! components are specified against. Every magic number named in the
//! component specs lives here rather than scattered across modules, so a
//! host can retune the simulation without touching algorithm code.

/// Configuration for simulation tuning. Defaults match the reference
/// engine's constants exactly; changing them changes simulation behavior,
/// not just performance, so do so deliberately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Fixed timestep in seconds. Game time is `tick_count * fixed_timestep`.
    pub fixed_timestep: f32,
    /// World units per pathfinding-grid cell.
    pub pathfinding_cell_size: u32,
    /// Maximum passable height delta per world unit before a cell is
    /// classified impassable.
    pub pathfinding_slope_threshold: f32,
    /// World units per visibility-grid cell.
    pub visibility_cell_size: u32,
    /// Upper bound on simultaneously tracked armies (fixed-size arrays are
    /// preferred over maps in the hot path for determinism).
    pub max_armies: usize,
    /// A* node-expansion cap before giving up on a path.
    pub astar_node_cap: u32,
    /// Scripted-thread instruction budget per resume (0 disables the
    /// watchdog).
    pub instruction_budget: i64,
    /// Arrival tolerance at intermediate waypoints.
    pub waypoint_tolerance: f32,
    /// Arrival tolerance at the final waypoint.
    pub arrival_tolerance: f32,
    /// Intrinsic per-army storage before any unit contributions.
    pub base_storage: f64,
    /// 2D collision radius added to a projectile's per-tick travel distance
    /// when testing for impact.
    pub projectile_hit_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 0.1,
            pathfinding_cell_size: 2,
            pathfinding_slope_threshold: 0.75,
            visibility_cell_size: 16,
            max_armies: 16,
            astar_node_cap: 50_000,
            instruction_budget: 1_000_000,
            waypoint_tolerance: 2.0,
            arrival_tolerance: 0.5,
            base_storage: 200.0,
            projectile_hit_radius: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.fixed_timestep, 0.1);
        assert_eq!(cfg.max_armies, 16);
        assert_eq!(cfg.astar_node_cap, 50_000);
        assert_eq!(cfg.instruction_budget, 1_000_000);
    }
}
