//! Weapon targeting and firing (half of Component K).
//!
//! Ground: `weapon.hpp`, `weapon.cpp`.

use crate::script::DamageType;
use crate::types::Vector3;

use super::entity::EntityRegistry;
use super::projectile::Projectile;
use super::unit::FireState;

#[derive(Debug, Clone)]
pub struct Weapon {
    pub label: String,
    pub max_range: f32,
    pub min_range: f32,
    pub rate_of_fire: f32,
    pub damage: f32,
    pub damage_radius: f32,
    pub damage_type: DamageType,
    pub muzzle_velocity: f32,
    pub fire_on_death: bool,
    pub manual_fire: bool,
    pub enabled: bool,
    pub current_target_id: u32,
    pub cooldown: f32,
}

impl Weapon {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            max_range: 0.0,
            min_range: 0.0,
            rate_of_fire: 1.0,
            damage: 0.0,
            damage_radius: 0.0,
            damage_type: "Normal".to_string(),
            muzzle_velocity: 25.0,
            fire_on_death: false,
            manual_fire: false,
            enabled: true,
            current_target_id: 0,
            cooldown: 0.0,
        }
    }

    /// Runs one tick of targeting/firing for a weapon owned by `owner_id`.
    /// Returns a spawned [`Projectile`] if this tick's cooldown expiry
    /// fired a shot.
    pub fn update(
        &mut self,
        owner_id: u32,
        owner_army: i32,
        owner_pos: Vector3,
        owner_fire_state: FireState,
        registry: &EntityRegistry,
        dt: f32,
    ) -> Option<Projectile> {
        self.cooldown -= dt;

        if !self.enabled
            || self.fire_on_death
            || self.manual_fire
            || self.max_range <= 0.0
            || self.damage <= 0.0
            || owner_fire_state == FireState::HoldFire
        {
            return None;
        }

        if !self.current_target_still_valid(owner_army, owner_pos, registry) {
            self.current_target_id = registry
                .nearest_enemy(owner_pos.x, owner_pos.z, owner_army, self.min_range, self.max_range)
                .unwrap_or(0);
        }

        if self.cooldown > 0.0 || self.current_target_id == 0 {
            return None;
        }

        let target = registry.find(self.current_target_id)?;
        let tp = target.position();
        let dx = tp.x - owner_pos.x;
        let dz = tp.z - owner_pos.z;
        let dist = (dx * dx + dz * dz).sqrt();
        let (dirx, dirz) = if dist > 1e-6 { (dx / dist, dz / dist) } else { (0.0, 0.0) };
        let velocity = Vector3::new(dirx * self.muzzle_velocity, 0.0, dirz * self.muzzle_velocity);
        let speed = self.muzzle_velocity.max(1e-6);

        self.cooldown = if self.rate_of_fire > 0.0 { 1.0 / self.rate_of_fire } else { 1.0 };

        Some(Projectile::new(
            owner_id,
            owner_army,
            owner_pos,
            velocity,
            self.current_target_id,
            tp,
            self.damage,
            self.damage_radius,
            self.damage_type.clone(),
            dist / speed + 2.0,
        ))
    }

    fn current_target_still_valid(&self, owner_army: i32, owner_pos: Vector3, registry: &EntityRegistry) -> bool {
        if self.current_target_id == 0 {
            return false;
        }
        let Some(target) = registry.find(self.current_target_id) else {
            return false;
        };
        if target.destroyed() || target.army() == owner_army || target.army() < 0 {
            return false;
        }
        let p = target.position();
        let dx = p.x - owner_pos.x;
        let dz = p.z - owner_pos.z;
        let d2 = dx * dx + dz * dz;
        d2 >= self.min_range * self.min_range && d2 <= self.max_range * self.max_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::entity::{Entity, EntityBase, Prop};

    fn spawn_prop(registry: &mut EntityRegistry, army: i32, x: f32, z: f32) -> u32 {
        registry.register(Entity::Prop(
            Box::new(EntityBase::new(army, Vector3::new(x, 0.0, z), "test")),
            Prop,
        ))
    }

    #[test]
    fn bails_when_disabled() {
        let mut w = Weapon::new("main");
        w.enabled = false;
        w.max_range = 10.0;
        w.damage = 5.0;
        let registry = EntityRegistry::new();
        let out = w.update(1, 0, Vector3::ZERO, FireState::ReturnFire, &registry, 0.1);
        assert!(out.is_none());
    }

    #[test]
    fn fires_at_nearest_enemy_after_cooldown() {
        let mut registry = EntityRegistry::new();
        let target = spawn_prop(&mut registry, 1, 5.0, 0.0);
        let mut w = Weapon::new("main");
        w.max_range = 20.0;
        w.damage = 10.0;
        w.rate_of_fire = 1.0;

        let shot = w.update(99, 0, Vector3::ZERO, FireState::ReturnFire, &registry, 0.1);
        assert!(shot.is_some());
        assert_eq!(w.current_target_id, target);
        assert!(w.cooldown > 0.0);
    }

    #[test]
    fn hold_fire_suppresses_shots() {
        let mut registry = EntityRegistry::new();
        spawn_prop(&mut registry, 1, 5.0, 0.0);
        let mut w = Weapon::new("main");
        w.max_range = 20.0;
        w.damage = 10.0;
        let out = w.update(99, 0, Vector3::ZERO, FireState::HoldFire, &registry, 0.1);
        assert!(out.is_none());
    }
}
