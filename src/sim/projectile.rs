//! Projectile ballistics and impact (half of Component K).
//!
//! Ground: `projectile.hpp`, `projectile.cpp`.

use crate::config::SimConfig;
use crate::script::{DamageType, ScriptHost};
use crate::types::Vector3;

use super::entity::{EntityBase, EntityRegistry};

#[derive(Debug, Clone)]
pub struct Projectile {
    pub base: EntityBase,
    pub velocity: Vector3,
    pub target_entity_id: u32,
    pub target_position: Vector3,
    pub launcher_id: u32,
    pub damage_amount: f32,
    pub damage_radius: f32,
    pub damage_type: DamageType,
    pub lifetime: f32,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        launcher_id: u32,
        army: i32,
        position: Vector3,
        velocity: Vector3,
        target_entity_id: u32,
        target_position: Vector3,
        damage_amount: f32,
        damage_radius: f32,
        damage_type: DamageType,
        lifetime: f32,
    ) -> Self {
        Self {
            base: EntityBase::new(army, position, String::new()),
            velocity,
            target_entity_id,
            target_position,
            launcher_id,
            damage_amount,
            damage_radius,
            damage_type,
            lifetime,
        }
    }

    /// Advances the projectile one tick. `registry` does not contain `self`
    /// (it was removed by the caller for the duration of this update) but
    /// does contain every other live entity, including the bound target
    /// and the launcher (for the launcher's script handle).
    pub fn update(&mut self, dt: f32, registry: &mut EntityRegistry, host: &mut dyn ScriptHost, config: &SimConfig) {
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.base.destroyed = true;
            return;
        }

        self.base.position = self.base.position + self.velocity * dt;
        let step = (self.velocity.x * self.velocity.x + self.velocity.z * self.velocity.z).sqrt() * dt;
        let hit_radius = config.projectile_hit_radius;

        let mut impacted = false;
        if self.target_entity_id != 0 {
            if let Some(target) = registry.find(self.target_entity_id) {
                if !target.destroyed() {
                    let p = target.position();
                    let dx = p.x - self.base.position.x;
                    let dz = p.z - self.base.position.z;
                    impacted = (dx * dx + dz * dz).sqrt() < step + hit_radius;
                }
            }
        }
        if !impacted {
            let dx = self.target_position.x - self.base.position.x;
            let dz = self.target_position.z - self.base.position.z;
            impacted = (dx * dx + dz * dz).sqrt() < step + hit_radius;
        }

        if impacted {
            self.on_impact(registry, host);
        }
    }

    fn on_impact(&mut self, registry: &mut EntityRegistry, host: &mut dyn ScriptHost) {
        let instigator = registry.find(self.launcher_id).and_then(|e| e.base().script_handle);

        if self.damage_radius > 0.0 {
            let pos = (self.base.position.x, self.base.position.y, self.base.position.z);
            host.damage_area(
                instigator,
                pos,
                self.damage_radius,
                self.damage_amount,
                &self.damage_type,
                false,
            );
        } else if let Some(target) = registry.find(self.target_entity_id).filter(|t| !t.destroyed()) {
            if let Some(handle) = target.base().script_handle {
                host.damage(instigator, handle, self.damage_amount, &self.damage_type);
            }
        }

        self.base.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::NullScriptHost;

    #[test]
    fn lifetime_expiry_destroys_without_impact() {
        let mut p = Projectile::new(
            1,
            0,
            Vector3::ZERO,
            Vector3::new(1.0, 0.0, 0.0),
            0,
            Vector3::new(1000.0, 0.0, 0.0),
            10.0,
            0.0,
            "Normal".to_string(),
            0.05,
        );
        let mut registry = EntityRegistry::new();
        let mut host = NullScriptHost;
        let config = SimConfig::default();
        p.update(0.1, &mut registry, &mut host, &config);
        assert!(p.base.destroyed);
    }

    #[test]
    fn reaches_ground_target_and_destroys() {
        let mut p = Projectile::new(
            1,
            0,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            0,
            Vector3::new(1.0, 0.0, 0.0),
            5.0,
            2.0,
            "Normal".to_string(),
            10.0,
        );
        let mut registry = EntityRegistry::new();
        let mut host = NullScriptHost;
        let config = SimConfig::default();
        p.update(0.1, &mut registry, &mut host, &config);
        assert!(p.base.destroyed);
    }
}
