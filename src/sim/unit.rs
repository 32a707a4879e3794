//! Unit command state machines (Component L) — the bulk of the simulation
//! core. Every command follows the uniform *move-into-range, then perform
//! work, then finish* template described in the component design; work
//! rates are scaled every tick by the owning army's economy efficiency
//! (computed by the *previous* tick's `update_economy`, see Component M).
//!
//! Ground: `unit.hpp`, `unit.cpp`, `unit_command.hpp`.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::SimConfig;
use crate::map::{Pathfinder, PathfindingGrid, Terrain};
use crate::script::ScriptHost;
use crate::types::Vector3;

use super::entity::{Entity, EntityBase, EntityRegistry};
use super::navigator::Navigator;
use super::weapon::Weapon;

const BUILD_RANGE: f32 = 6.0;
const RECLAIM_RANGE: f32 = 5.0;
const REPAIR_RANGE: f32 = 6.0;
const CAPTURE_RANGE: f32 = 6.0;
const GUARD_RANGE: f32 = 10.0;
const LOAD_RANGE: f32 = 5.0;
const UNLOAD_RANGE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    ReturnFire = 0,
    HoldFire = 1,
    HoldGround = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Stop,
    Move,
    Attack,
    Patrol,
    BuildMobile,
    BuildFactory,
    Upgrade,
    Reclaim,
    Repair,
    Capture,
    Guard,
    Dive,
    Enhance,
    TransportLoad,
    TransportUnload,
}

#[derive(Debug, Clone)]
pub struct UnitCommand {
    pub command_type: CommandType,
    pub target_position: Vector3,
    pub target_id: u32,
    pub blueprint_id: String,
}

impl UnitCommand {
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            target_position: Vector3::ZERO,
            target_id: 0,
            blueprint_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitEconomy {
    pub production_mass: f64,
    pub production_energy: f64,
    pub consumption_mass: f64,
    pub consumption_energy: f64,
    pub production_active: bool,
    pub consumption_active: bool,
    pub maintenance_active: bool,
    pub storage_mass: f64,
    pub storage_energy: f64,
}

/// Per-tick execution context for [`Unit::update`]. `registry` never
/// contains the unit being updated — the tick loop removes it before
/// calling `update` and reinserts it afterward.
pub struct UnitCtx<'a> {
    pub registry: &'a mut EntityRegistry,
    pub grid: &'a mut PathfindingGrid,
    pub terrain: Option<&'a Terrain>,
    pub host: &'a mut dyn ScriptHost,
    pub config: &'a SimConfig,
    pub mass_efficiency: f64,
    pub energy_efficiency: f64,
}

impl<'a> UnitCtx<'a> {
    fn efficiency(&self) -> f64 {
        self.mass_efficiency.min(self.energy_efficiency)
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub base: EntityBase,
    pub unit_id: String,
    pub build_rate: f32,
    pub layer: String,
    pub is_being_built: bool,
    pub max_speed: f32,
    pub navigator: Navigator,
    pub economy: UnitEconomy,
    pub categories: HashSet<String>,
    pub footprint_size: (u32, u32),
    pub command_queue: VecDeque<UnitCommand>,
    pub weapons: Vec<Weapon>,
    pub rally_point: Option<Vector3>,

    pub build_target_id: u32,
    pub build_time: f64,
    pub build_cost_mass: f64,
    pub build_cost_energy: f64,
    pub work_progress: f32,

    pub reclaim_target_id: u32,
    pub reclaim_rate: f32,

    pub repair_target_id: u32,
    pub repair_build_time: f64,

    pub capture_target_id: u32,
    pub capture_time: f64,
    pub capture_energy_cost: f64,

    pub enhancing: bool,
    pub enhance_name: String,
    pub enhance_build_time: f64,
    pub enhancements: HashMap<String, String>,

    pub transport_id: u32,
    pub cargo_ids: Vec<u32>,
    pub transport_capacity: i32,

    pub intel_states: HashMap<String, (f32, bool)>,

    pub busy: bool,
    pub block_command_queue: bool,
    pub fire_state: FireState,
}

impl Unit {
    pub fn new(army: i32, position: Vector3, blueprint_id: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(army, position, blueprint_id),
            unit_id: String::new(),
            build_rate: 1.0,
            layer: "Land".to_string(),
            is_being_built: false,
            max_speed: 0.0,
            navigator: Navigator::new(),
            economy: UnitEconomy::default(),
            categories: HashSet::new(),
            footprint_size: (0, 0),
            command_queue: VecDeque::new(),
            weapons: Vec::new(),
            rally_point: None,
            build_target_id: 0,
            build_time: 0.0,
            build_cost_mass: 0.0,
            build_cost_energy: 0.0,
            work_progress: 0.0,
            reclaim_target_id: 0,
            reclaim_rate: 0.0,
            repair_target_id: 0,
            repair_build_time: 0.0,
            capture_target_id: 0,
            capture_time: 0.0,
            capture_energy_cost: 0.0,
            enhancing: false,
            enhance_name: String::new(),
            enhance_build_time: 0.0,
            enhancements: HashMap::new(),
            transport_id: 0,
            cargo_ids: Vec::new(),
            transport_capacity: 0,
            intel_states: HashMap::new(),
            busy: false,
            block_command_queue: false,
            fire_state: FireState::ReturnFire,
        }
    }

    pub fn has_category(&self, cat: &str) -> bool {
        self.categories.contains(cat)
    }

    /// Evaluate a (possibly compound) category expression against this
    /// unit's category set — see [`crate::category::CategoryExpr`].
    pub fn matches_category(&self, expr: &crate::category::CategoryExpr) -> bool {
        expr.matches(&self.categories)
    }

    pub fn is_building(&self) -> bool {
        self.build_target_id != 0
    }
    pub fn is_reclaiming(&self) -> bool {
        self.reclaim_target_id != 0
    }
    pub fn is_repairing(&self) -> bool {
        self.repair_target_id != 0
    }
    pub fn is_capturing(&self) -> bool {
        self.capture_target_id != 0
    }

    /// Replaces the queue with a singleton when `clear_existing`; otherwise
    /// appends to the tail.
    pub fn push_command(&mut self, cmd: UnitCommand, clear_existing: bool) {
        if clear_existing {
            self.command_queue.clear();
            self.navigator.abort();
        }
        self.command_queue.push_back(cmd);
    }

    pub fn clear_commands(&mut self) {
        self.command_queue.clear();
    }

    fn zero_build_state(&mut self) {
        self.build_target_id = 0;
        self.build_time = 0.0;
        self.build_cost_mass = 0.0;
        self.build_cost_energy = 0.0;
        self.work_progress = 0.0;
        self.economy.consumption_mass = 0.0;
        self.economy.consumption_energy = 0.0;
        self.economy.consumption_active = false;
    }

    fn zero_reclaim_state(&mut self) {
        self.reclaim_target_id = 0;
        self.reclaim_rate = 0.0;
        self.economy.production_mass = 0.0;
        self.economy.production_energy = 0.0;
        self.economy.production_active = false;
    }

    fn zero_repair_state(&mut self) {
        self.repair_target_id = 0;
        self.repair_build_time = 0.0;
        self.economy.consumption_mass = 0.0;
        self.economy.consumption_energy = 0.0;
        self.economy.consumption_active = false;
    }

    fn zero_capture_state(&mut self) {
        self.capture_target_id = 0;
        self.capture_time = 0.0;
        self.capture_energy_cost = 0.0;
        self.economy.consumption_energy = 0.0;
        self.economy.consumption_active = false;
    }

    /// Per-tick update: cargo-follow, head-of-queue command processing,
    /// weapon targeting/firing.
    pub fn update(&mut self, dt: f32, ctx: &mut UnitCtx) {
        if self.transport_id != 0 {
            if let Some(transport) = ctx.registry.find(self.transport_id) {
                self.base.position = transport.position();
            }
        }

        if let Some(cmd) = self.command_queue.front().cloned() {
            let done = self.process_command(&cmd, dt, ctx);
            if done {
                self.command_queue.pop_front();
            }
        }

        for weapon in &mut self.weapons {
            if let Some(projectile) = weapon.update(
                self.base.entity_id,
                self.base.army,
                self.base.position,
                self.fire_state,
                ctx.registry,
                dt,
            ) {
                ctx.registry.register(Entity::Projectile(Box::new(projectile)));
            }
        }
    }

    /// Returns `true` when the command is finished and should be popped.
    fn process_command(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        match cmd.command_type {
            CommandType::Stop => {
                self.navigator.abort();
                true
            }
            CommandType::Move => self.process_move(cmd, dt, ctx),
            CommandType::Attack => self.process_attack(cmd, dt, ctx),
            CommandType::Patrol => self.process_patrol(cmd, dt, ctx),
            CommandType::BuildMobile => self.process_build(cmd, dt, ctx, true),
            CommandType::BuildFactory | CommandType::Upgrade => self.process_build(cmd, dt, ctx, false),
            CommandType::Reclaim => self.process_reclaim(cmd, dt, ctx),
            CommandType::Repair => self.process_repair(cmd, dt, ctx),
            CommandType::Capture => self.process_capture(cmd, dt, ctx),
            CommandType::Guard => self.process_guard(cmd, dt, ctx),
            CommandType::Dive => self.process_dive(ctx),
            CommandType::Enhance => self.process_enhance(cmd, dt, ctx),
            CommandType::TransportLoad => self.process_transport_load(cmd, dt, ctx),
            CommandType::TransportUnload => self.process_transport_unload(cmd, dt, ctx),
        }
    }

    fn process_move(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if !self.navigator.is_moving() {
            let pf = Pathfinder::new(ctx.grid);
            self.navigator
                .set_goal(cmd.target_position, Some(&pf), self.base.position, &self.layer);
        }
        let still_moving = self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
        !still_moving
    }

    fn process_patrol(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        let arrived = self.process_move(cmd, dt, ctx);
        if arrived {
            // Sticky patrol: requeue at the tail so it keeps cycling.
            self.command_queue.push_back(cmd.clone());
        }
        arrived
    }

    fn process_attack(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if cmd.target_id == 0 {
            return true;
        }
        let Some(target) = ctx.registry.find(cmd.target_id) else {
            return true;
        };
        if target.destroyed() {
            return true;
        }
        let target_pos = target.position();
        let best_range = self.weapons.iter().map(|w| w.max_range).fold(0.0f32, f32::max);
        if best_range <= 0.0 {
            return true;
        }
        let dx = target_pos.x - self.base.position.x;
        let dz = target_pos.z - self.base.position.z;
        if dx * dx + dz * dz > best_range * best_range {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(target_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
        } else {
            self.navigator.abort();
        }
        // sticky until target dead/invalid; weapon firing happens in update()
        false
    }

    fn process_build(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx, needs_range: bool) -> bool {
        if needs_range {
            let dx = cmd.target_position.x - self.base.position.x;
            let dz = cmd.target_position.z - self.base.position.z;
            if dx * dx + dz * dz > BUILD_RANGE * BUILD_RANGE {
                if !self.navigator.is_moving() {
                    let pf = Pathfinder::new(ctx.grid);
                    self.navigator
                        .set_goal(cmd.target_position, Some(&pf), self.base.position, &self.layer);
                }
                self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
                return false;
            }
            self.navigator.abort();
        }

        if self.build_target_id == 0 && !self.start_build(cmd, ctx) {
            return true;
        }
        !self.progress_build(dt, ctx)
    }

    fn start_build(&mut self, cmd: &UnitCommand, ctx: &mut UnitCtx) -> bool {
        let target = Unit::new(self.base.army, cmd.target_position, cmd.blueprint_id.clone());
        let target_id = ctx.registry.register(Entity::Unit(Box::new(target)));
        if let Some(Entity::Unit(u)) = ctx.registry.find_mut(target_id) {
            u.is_being_built = true;
            u.base.fraction_complete = 0.0;
        }

        let (build_time, cost_mass, cost_energy) = self.read_build_costs(target_id, ctx);
        if build_time <= 0.0 || self.build_rate <= 0.0 {
            ctx.registry.unregister(target_id);
            return false;
        }

        self.build_target_id = target_id;
        self.build_time = build_time;
        self.build_cost_mass = cost_mass;
        self.build_cost_energy = cost_energy;
        self.work_progress = 0.0;
        self.economy.consumption_mass = cost_mass * self.build_rate as f64 / build_time;
        self.economy.consumption_energy = cost_energy * self.build_rate as f64 / build_time;
        self.economy.consumption_active = true;

        if let Some(handle) = self.base.script_handle {
            if let Some(Entity::Unit(target)) = ctx.registry.find(target_id) {
                if let Some(th) = target.base.script_handle {
                    ctx.host.on_start_build(handle, th);
                    ctx.host.on_start_being_built(th, &target.layer.clone());
                }
            }
        }
        true
    }

    fn read_build_costs(&self, target_id: u32, ctx: &UnitCtx) -> (f64, f64, f64) {
        let Some(Entity::Unit(target)) = ctx.registry.find(target_id) else {
            return (0.0, 0.0, 0.0);
        };
        let Some(handle) = target.base.script_handle else {
            return (0.0, 0.0, 0.0);
        };
        let build_time = ctx.host.get_number_field(handle, "Economy.BuildTime").unwrap_or(0.0);
        let cost_mass = ctx.host.get_number_field(handle, "Economy.BuildCostMass").unwrap_or(0.0);
        let cost_energy = ctx.host.get_number_field(handle, "Economy.BuildCostEnergy").unwrap_or(0.0);
        (build_time, cost_mass, cost_energy)
    }

    /// Returns `true` while still building.
    fn progress_build(&mut self, dt: f32, ctx: &mut UnitCtx) -> bool {
        let eff = ctx.efficiency();
        if self.build_time <= 0.0 {
            self.finish_build(ctx, false);
            return false;
        }
        let delta = (self.build_rate as f64 / self.build_time) * dt as f64 * eff;
        self.work_progress = (self.work_progress as f64 + delta).min(1.0) as f32;

        if let Some(Entity::Unit(target)) = ctx.registry.find_mut(self.build_target_id) {
            target.base.fraction_complete = self.work_progress;
            let max_health = target.base.max_health;
            target.base.set_health(self.work_progress * max_health);
        } else {
            // Target vanished mid-build.
            self.zero_build_state();
            return false;
        }

        if self.work_progress >= 1.0 {
            self.finish_build(ctx, true);
            return false;
        }
        true
    }

    fn finish_build(&mut self, ctx: &mut UnitCtx, success: bool) {
        let target_id = self.build_target_id;
        let builder_handle = self.base.script_handle;
        self.zero_build_state();

        if !success {
            if let Some(handle) = builder_handle {
                ctx.host.on_failed_to_build(handle);
            }
            return;
        }

        let target_info = if let Some(Entity::Unit(target)) = ctx.registry.find_mut(target_id) {
            target.is_being_built = false;
            target.base.fraction_complete = 1.0;
            let mh = target.base.max_health;
            target.base.set_health(mh);
            Some((target.layer.clone(), target.base.script_handle))
        } else {
            None
        };

        if let Some((layer, Some(target_handle))) = target_info.clone() {
            ctx.host.on_stop_being_built(target_handle, &layer);
        }

        // Re-validate after the callback: it may have destroyed the target.
        if let Some(Entity::Unit(target)) = ctx.registry.find(target_id) {
            let is_structure = target.has_category("STRUCTURE");
            let (fx, fz) = target.footprint_size;
            if is_structure && fx > 0 && fz > 0 {
                let pos = target.base.position;
                ctx.grid.mark_obstacle(pos.x, pos.z, fx as f32, fz as f32);
            }
            if let Some(th) = target.base.script_handle {
                ctx.host.on_stop_build(th);
            }
        }
    }

    fn process_reclaim(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if cmd.target_id == 0 {
            self.zero_reclaim_state();
            return true;
        }
        let Some(target) = ctx.registry.find(cmd.target_id) else {
            self.zero_reclaim_state();
            return true;
        };
        if target.destroyed() {
            self.zero_reclaim_state();
            return true;
        }
        let target_pos = target.position();

        let dx = target_pos.x - self.base.position.x;
        let dz = target_pos.z - self.base.position.z;
        if dx * dx + dz * dz > RECLAIM_RANGE * RECLAIM_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(target_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
            return false;
        }
        self.navigator.abort();

        if self.reclaim_target_id != cmd.target_id {
            self.zero_reclaim_state();
            let Some(handle) = target.base().script_handle else {
                return true;
            };
            let max_mass = ctx.host.get_number_field(handle, "MaxMassReclaim").unwrap_or(0.0);
            let max_energy = ctx.host.get_number_field(handle, "MaxEnergyReclaim").unwrap_or(0.0);
            let time_mult = ctx.host.get_number_field(handle, "TimeReclaim").unwrap_or(1.0);
            let max_value = max_mass.max(max_energy);
            if max_value <= 0.0 || self.build_rate <= 0.0 {
                return true;
            }
            let mut reclaim_time = time_mult * max_value / self.build_rate as f64 / 10.0;
            if reclaim_time <= 0.0 {
                reclaim_time = 0.01;
            }
            self.reclaim_target_id = cmd.target_id;
            self.reclaim_rate = (1.0 / reclaim_time) as f32;
            self.economy.production_mass = max_mass * self.reclaim_rate as f64;
            self.economy.production_energy = max_energy * self.reclaim_rate as f64;
            self.economy.production_active = true;
        }

        self.progress_reclaim(dt, ctx)
    }

    /// Drains the target's `fraction_complete` toward zero at `reclaim_rate`
    /// per second (scaled by economy efficiency); unregisters and fires
    /// `on_reclaimed` once it bottoms out. Returns whether the command is
    /// finished.
    fn progress_reclaim(&mut self, dt: f32, ctx: &mut UnitCtx) -> bool {
        let target_id = self.reclaim_target_id;
        let eff = ctx.efficiency();
        let delta = self.reclaim_rate as f64 * dt as f64 * eff;

        let (finished, target_handle) = match ctx.registry.find_mut(target_id) {
            Some(target) => {
                let base = target.base_mut();
                base.fraction_complete = (base.fraction_complete as f64 - delta).max(0.0) as f32;
                (base.fraction_complete <= 0.0, base.script_handle)
            }
            None => {
                self.zero_reclaim_state();
                return true;
            }
        };

        if finished {
            ctx.registry.unregister(target_id);
            if let Some(th) = target_handle {
                ctx.host.on_reclaimed(th);
                ctx.host.release(th);
            }
            self.zero_reclaim_state();
            return true;
        }
        false
    }

    fn process_repair(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if cmd.target_id == 0 {
            self.zero_repair_state();
            return true;
        }
        let Some(Entity::Unit(target)) = ctx.registry.find(cmd.target_id) else {
            self.zero_repair_state();
            return true;
        };
        if target.base.destroyed || target.base.health >= target.base.max_health {
            self.zero_repair_state();
            return true;
        }
        let target_pos = target.base.position;

        let dx = target_pos.x - self.base.position.x;
        let dz = target_pos.z - self.base.position.z;
        if dx * dx + dz * dz > REPAIR_RANGE * REPAIR_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(target_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
            return false;
        }
        self.navigator.abort();

        if self.repair_target_id != cmd.target_id {
            self.zero_repair_state();
            let build_time = self.read_build_costs(cmd.target_id, ctx).0;
            if build_time <= 0.0 {
                return true;
            }
            self.repair_target_id = cmd.target_id;
            self.repair_build_time = build_time;
        }

        let eff = ctx.efficiency();
        let heal_rate = self.build_rate as f64 / self.repair_build_time;
        if let Some(Entity::Unit(target)) = ctx.registry.find_mut(self.repair_target_id) {
            let heal_amount = (heal_rate * dt as f64 * eff) as f32 * target.base.max_health;
            let new_health = (target.base.health + heal_amount).min(target.base.max_health);
            target.base.set_health(new_health);
            if target.base.health >= target.base.max_health {
                self.zero_repair_state();
                return true;
            }
        } else {
            self.zero_repair_state();
            return true;
        }
        false
    }

    fn process_capture(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if cmd.target_id == 0 {
            self.zero_capture_state();
            return true;
        }
        let Some(Entity::Unit(target)) = ctx.registry.find(cmd.target_id) else {
            self.zero_capture_state();
            return true;
        };
        if target.base.destroyed {
            self.zero_capture_state();
            return true;
        }
        if target.base.army == self.base.army {
            self.zero_capture_state();
            return true;
        }
        let target_pos = target.base.position;

        let dx = target_pos.x - self.base.position.x;
        let dz = target_pos.z - self.base.position.z;
        if dx * dx + dz * dz > CAPTURE_RANGE * CAPTURE_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(target_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
            return false;
        }
        self.navigator.abort();

        if self.capture_target_id != cmd.target_id {
            self.zero_capture_state();
            let (build_time, _cost_mass, cost_energy) = self.read_build_costs(cmd.target_id, ctx);
            let mut capture_time = (build_time / self.build_rate as f64) / 2.0;
            if capture_time <= 0.0 {
                capture_time = 0.01;
            }
            self.capture_target_id = cmd.target_id;
            self.capture_time = capture_time;
            self.capture_energy_cost = cost_energy;
            self.economy.consumption_energy = cost_energy / capture_time;
            self.economy.consumption_active = true;
        }

        let eff = ctx.efficiency();
        let progress_per_tick = (dt as f64 / self.capture_time) * eff;
        self.work_progress = (self.work_progress as f64 + progress_per_tick).min(1.0) as f32;

        if self.work_progress >= 1.0 {
            let capturer_handle = self.base.script_handle;
            let target_id = self.capture_target_id;
            let new_army = self.base.army;
            self.zero_capture_state();
            self.work_progress = 0.0;

            if let Some(Entity::Unit(target)) = ctx.registry.find(target_id) {
                if let Some(th) = target.base.script_handle {
                    if let Some(ch) = capturer_handle {
                        ctx.host.on_stop_capture(ch, th);
                    }
                    ctx.host.on_captured(th, new_army);
                }
            }
            // Fallback: if the callback didn't already reassign ownership,
            // transfer army directly.
            if let Some(Entity::Unit(target)) = ctx.registry.find_mut(target_id) {
                target.base.army = new_army;
            }
            return true;
        }
        false
    }

    fn process_guard(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if cmd.target_id == 0 {
            if self.is_building() {
                self.zero_build_state();
            }
            return true;
        }
        let Some(target) = ctx.registry.find(cmd.target_id) else {
            if self.is_building() {
                self.zero_build_state();
            }
            return true;
        };
        if target.destroyed() || !target.is_unit() {
            if self.is_building() {
                self.zero_build_state();
            }
            return true;
        }
        let target_pos = target.position();

        let dx = target_pos.x - self.base.position.x;
        let dz = target_pos.z - self.base.position.z;
        if dx * dx + dz * dz > GUARD_RANGE * GUARD_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(target_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
        } else {
            self.navigator.abort();
        }

        if let Some(Entity::Unit(target_unit)) = ctx.registry.find(cmd.target_id) {
            if target_unit.is_building() && self.build_target_id != target_unit.build_target_id {
                let target_build_id = target_unit.build_target_id;
                let build_time = target_unit.build_time;
                let build_cost_mass = target_unit.build_cost_mass;
                let build_cost_energy = target_unit.build_cost_energy;
                if let Some(build_target) = ctx.registry.find(target_build_id) {
                    let progress = build_target.base().fraction_complete;
                    if !build_target.destroyed() {
                        self.build_target_id = target_build_id;
                        self.build_time = build_time;
                        self.build_cost_mass = build_cost_mass;
                        self.build_cost_energy = build_cost_energy;
                        self.work_progress = progress;
                        if build_time > 0.0 && self.build_rate > 0.0 {
                            self.economy.consumption_mass = build_cost_mass * self.build_rate as f64 / build_time;
                            self.economy.consumption_energy = build_cost_energy * self.build_rate as f64 / build_time;
                            self.economy.consumption_active = true;
                        }
                    }
                }
            }
        }
        false
    }

    fn process_dive(&mut self, ctx: &mut UnitCtx) -> bool {
        let old_layer = self.layer.clone();
        self.layer = match old_layer.as_str() {
            "Water" => "Sub".to_string(),
            "Sub" | "Seabed" => "Water".to_string(),
            other => other.to_string(),
        };
        if let Some(handle) = self.base.script_handle {
            ctx.host.on_layer_change(handle, &self.layer, &old_layer);
        }
        true
    }

    fn process_enhance(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        if !self.enhancing {
            let Some(handle) = self.base.script_handle else {
                return true;
            };
            let field = format!("Enhancements.{}.BuildTime", cmd.blueprint_id);
            let build_time = ctx.host.get_number_field(handle, &field).unwrap_or(0.0);
            if build_time <= 0.0 || self.build_rate <= 0.0 {
                return true;
            }
            self.enhancing = true;
            self.enhance_name = cmd.blueprint_id.clone();
            self.enhance_build_time = build_time;
            self.work_progress = 0.0;
            ctx.host.on_work_begin(handle);
        }

        let eff = ctx.efficiency();
        let delta = (self.build_rate as f64 / self.enhance_build_time) * dt as f64 * eff;
        self.work_progress = (self.work_progress as f64 + delta).min(1.0) as f32;

        if self.work_progress >= 1.0 {
            if let Some(handle) = self.base.script_handle {
                ctx.host.on_work_end(handle);
            }
            self.enhancements.insert(self.enhance_name.clone(), self.enhance_name.clone());
            self.enhancing = false;
            self.enhance_name.clear();
            self.enhance_build_time = 0.0;
            self.work_progress = 0.0;
            return true;
        }
        false
    }

    fn process_transport_load(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        let Some(transport) = ctx.registry.find(cmd.target_id) else {
            return true;
        };
        if transport.destroyed() {
            return true;
        }
        let transport_pos = transport.position();
        let dx = transport_pos.x - self.base.position.x;
        let dz = transport_pos.z - self.base.position.z;
        if dx * dx + dz * dz > LOAD_RANGE * LOAD_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator
                    .set_goal(transport_pos, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
            return false;
        }
        self.navigator.abort();

        let cargo_handle = self.base.script_handle;
        let my_id = self.base.entity_id;
        if let Some(Entity::Unit(t)) = ctx.registry.find_mut(cmd.target_id) {
            if t.transport_capacity > 0 && (t.cargo_ids.len() as i32) >= t.transport_capacity {
                return true;
            }
            t.cargo_ids.push(my_id);
            let transport_handle = t.base.script_handle;
            if let (Some(th), Some(ch)) = (transport_handle, cargo_handle) {
                ctx.host.on_transport_attach(th, ch);
            }
        }
        self.transport_id = cmd.target_id;
        true
    }

    fn process_transport_unload(&mut self, cmd: &UnitCommand, dt: f32, ctx: &mut UnitCtx) -> bool {
        let drop_point = cmd.target_position;
        let dx = drop_point.x - self.base.position.x;
        let dz = drop_point.z - self.base.position.z;
        if dx * dx + dz * dz > UNLOAD_RANGE * UNLOAD_RANGE {
            if !self.navigator.is_moving() {
                let pf = Pathfinder::new(ctx.grid);
                self.navigator.set_goal(drop_point, Some(&pf), self.base.position, &self.layer);
            }
            self.navigator.update(&mut self.base.position, self.max_speed, dt, ctx.terrain, ctx.config);
            return false;
        }
        self.navigator.abort();

        let transport_handle = self.base.script_handle;
        let cargo_ids = std::mem::take(&mut self.cargo_ids);
        let transport_pos = self.base.position;
        for cargo_id in cargo_ids {
            if let Some(Entity::Unit(cargo)) = ctx.registry.find_mut(cargo_id) {
                cargo.transport_id = 0;
                cargo.base.position = transport_pos;
                let cargo_handle = cargo.base.script_handle;
                if let (Some(th), Some(ch)) = (transport_handle, cargo_handle) {
                    ctx.host.on_transport_detach(th, ch);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Heightmap, PathfindingGrid};
    use crate::script::NullScriptHost;

    fn grid() -> PathfindingGrid {
        let hm = Heightmap::new(8, 8, 1.0, vec![0; 81]);
        PathfindingGrid::new(&hm, 0.0, false, 2, 0.75)
    }

    #[test]
    fn matches_category_evaluates_compound_expression() {
        use crate::category::CategoryExpr;
        let mut unit = Unit::new(0, Vector3::ZERO, "uel0001");
        unit.categories.insert("LAND".to_string());
        unit.categories.insert("MOBILE".to_string());
        let expr = CategoryExpr::intersection(
            CategoryExpr::name("MOBILE"),
            CategoryExpr::name("LAND"),
        );
        assert!(unit.matches_category(&expr));
        assert!(unit.matches_category(&CategoryExpr::name("ALLUNITS")));
        assert!(!unit.matches_category(&CategoryExpr::name("AIR")));
    }

    #[test]
    fn stop_command_finishes_immediately() {
        let mut unit = Unit::new(0, Vector3::ZERO, "uel0001");
        unit.push_command(UnitCommand::new(CommandType::Stop), false);
        let mut registry = EntityRegistry::new();
        let mut g = grid();
        let mut host = NullScriptHost;
        let config = SimConfig::default();
        let mut ctx = UnitCtx {
            registry: &mut registry,
            grid: &mut g,
            terrain: None,
            host: &mut host,
            config: &config,
            mass_efficiency: 1.0,
            energy_efficiency: 1.0,
        };
        unit.update(0.1, &mut ctx);
        assert!(unit.command_queue.is_empty());
    }

    #[test]
    fn move_command_advances_toward_goal() {
        let mut unit = Unit::new(0, Vector3::ZERO, "uel0001");
        unit.max_speed = 5.0;
        unit.layer = "Air".to_string();
        let mut cmd = UnitCommand::new(CommandType::Move);
        cmd.target_position = Vector3::new(1.0, 0.0, 0.0);
        unit.push_command(cmd, false);

        let mut registry = EntityRegistry::new();
        let mut g = grid();
        let mut host = NullScriptHost;
        let config = SimConfig::default();
        let mut ctx = UnitCtx {
            registry: &mut registry,
            grid: &mut g,
            terrain: None,
            host: &mut host,
            config: &config,
            mass_efficiency: 1.0,
            energy_efficiency: 1.0,
        };
        unit.update(0.1, &mut ctx);
        assert_eq!(unit.base.position.x, 1.0);
        assert!(unit.command_queue.is_empty());
    }
}
