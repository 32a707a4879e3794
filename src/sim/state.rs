//! Simulation tick (Component N).
//!
//! Ground: `sim_state.hpp`, `sim_state.cpp`.

use crate::blueprint::BlueprintStore;
use crate::config::SimConfig;
use crate::map::{PathfindingGrid, Terrain, VisibilityGrid};
use crate::script::ScriptHost;

use super::army::ArmyBrain;
use super::entity::{Entity, EntityRegistry};
use super::unit::UnitCtx;

/// Owns everything a tick touches: terrain, the pathfinding grid, the
/// visibility grid, the entity registry, the blueprint store, the
/// scripted-thread scheduler, and one [`ArmyBrain`] per army. Assembled by
/// session setup (Component O) and driven one tick at a time by the host
/// loop.
pub struct SimState {
    pub terrain: Terrain,
    pub grid: PathfindingGrid,
    pub visibility: VisibilityGrid,
    pub registry: EntityRegistry,
    pub blueprints: BlueprintStore,
    pub scheduler: super::scheduler::Scheduler,
    pub armies: Vec<ArmyBrain>,
    pub tick_count: i64,
    pub game_time: f64,
}

impl SimState {
    pub fn new(terrain: Terrain, grid: PathfindingGrid, visibility: VisibilityGrid, config: &SimConfig) -> Self {
        Self {
            terrain,
            grid,
            visibility,
            registry: EntityRegistry::new(),
            blueprints: BlueprintStore::new(),
            scheduler: super::scheduler::Scheduler::new(config.instruction_budget),
            armies: Vec::new(),
            tick_count: 0,
            game_time: 0.0,
        }
    }

    /// Advances the simulation by one fixed timestep (spec.md §4.N):
    ///
    /// 1. `tick_count += 1`, `game_time = tick_count * DT`.
    /// 2. Resume all eligible scripted threads.
    /// 3. Update every army's economy (uses *this* tick's unit production/
    ///    consumption flags, but the resulting efficiency isn't read by
    ///    units until step 4 of the *next* tick — see spec.md §4.K point 3).
    /// 4. Snapshot entity ids and dispatch `Unit`/`Projectile` updates by
    ///    id, so spawns/destroys mid-tick never invalidate the iteration.
    pub fn tick(&mut self, config: &SimConfig, host: &mut dyn ScriptHost) {
        self.tick_count += 1;
        self.game_time = self.tick_count as f64 * config.fixed_timestep as f64;

        self.scheduler.resume_all(self.tick_count);

        for army in &mut self.armies {
            army.update_economy(&self.registry, config.fixed_timestep, config);
        }

        let snapshot = self.registry.ids_snapshot();
        for id in snapshot {
            let Some(mut entity) = self.registry.take(id) else {
                continue;
            };
            if entity.destroyed() {
                continue;
            }

            match &mut entity {
                Entity::Unit(unit) => {
                    let army_idx = unit.base.army;
                    let (mass_efficiency, energy_efficiency) = self
                        .armies
                        .iter()
                        .find(|a| a.index() == army_idx)
                        .map(|a| (a.mass_efficiency(), a.energy_efficiency()))
                        .unwrap_or((1.0, 1.0));

                    let mut ctx = UnitCtx {
                        registry: &mut self.registry,
                        grid: &mut self.grid,
                        terrain: Some(&self.terrain),
                        host,
                        config,
                        mass_efficiency,
                        energy_efficiency,
                    };
                    unit.update(config.fixed_timestep, &mut ctx);
                }
                Entity::Projectile(projectile) => {
                    projectile.update(config.fixed_timestep, &mut self.registry, host, config);
                }
                Entity::Prop(..) | Entity::Shield(..) => {}
            }

            if !entity.destroyed() {
                self.registry.put_back(entity);
            }
        }
    }

    pub fn army(&self, index: i32) -> Option<&ArmyBrain> {
        self.armies.iter().find(|a| a.index() == index)
    }
    pub fn army_mut(&mut self, index: i32) -> Option<&mut ArmyBrain> {
        self.armies.iter_mut().find(|a| a.index() == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Heightmap;
    use crate::script::NullScriptHost;
    use crate::sim::unit::Unit;
    use crate::types::Vector3;

    fn fresh_state(config: &SimConfig) -> SimState {
        let heightmap = Heightmap::new(8, 8, 1.0, vec![0; 81]);
        let grid = PathfindingGrid::new(&heightmap, 0.0, false, config.pathfinding_cell_size, config.pathfinding_slope_threshold);
        let terrain = Terrain::new(heightmap, 0.0, false);
        let mut visibility = VisibilityGrid::new(terrain.map_width(), terrain.map_height());
        visibility.build_height_grid(&terrain);
        SimState::new(terrain, grid, visibility, config)
    }

    #[test]
    fn tick_advances_counters() {
        let config = SimConfig::default();
        let mut state = fresh_state(&config);
        let mut host = NullScriptHost;
        state.tick(&config, &mut host);
        assert_eq!(state.tick_count, 1);
        assert!((state.game_time - config.fixed_timestep as f64).abs() < 1e-9);
    }

    #[test]
    fn tick_moves_units_toward_their_goal() {
        let config = SimConfig::default();
        let mut state = fresh_state(&config);
        state.armies.push(ArmyBrain::new(0, "brain0"));

        let mut unit = Unit::new(0, Vector3::ZERO, "test_unit");
        unit.max_speed = 10.0;
        unit.push_command(
            super::super::unit::UnitCommand {
                command_type: super::super::unit::CommandType::Move,
                target_position: Vector3::new(5.0, 0.0, 0.0),
                target_id: 0,
                blueprint_id: String::new(),
            },
            true,
        );
        state.registry.register(Entity::Unit(Box::new(unit)));

        let mut host = NullScriptHost;
        for _ in 0..20 {
            state.tick(&config, &mut host);
        }

        let id = state.registry.ids_snapshot()[0];
        let pos = state.registry.find(id).unwrap().position();
        assert!((pos.x - 5.0).abs() <= config.arrival_tolerance);
    }
}
