//! Platoon: a named, scripted group of units (Component M).
//!
//! Ground: `platoon.hpp`, `platoon.cpp`.
//!
//! Destruction is a tombstone flag, never a removal from storage (design
//! note: "stable pointers for platoons after destruction") — external
//! handles (script-side lightuserdata) keep referencing the same index.

use std::collections::HashMap;

use crate::types::Vector3;

use super::entity::EntityRegistry;

#[derive(Debug, Clone)]
pub struct Platoon {
    platoon_id: u32,
    army_index: i32,
    name: String,
    plan_name: String,
    destroyed: bool,
    unit_ids: Vec<u32>,
    squad_map: HashMap<u32, String>,
}

impl Platoon {
    pub fn new(platoon_id: u32, army_index: i32, name: String) -> Self {
        Self {
            platoon_id,
            army_index,
            name,
            plan_name: String::new(),
            destroyed: false,
            unit_ids: Vec::new(),
            squad_map: HashMap::new(),
        }
    }

    pub fn platoon_id(&self) -> u32 {
        self.platoon_id
    }
    pub fn army_index(&self) -> i32 {
        self.army_index
    }
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan_name(&self) -> &str {
        &self.plan_name
    }
    pub fn set_plan_name(&mut self, plan_name: impl Into<String>) {
        self.plan_name = plan_name.into();
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed
    }
    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    pub fn add_unit(&mut self, entity_id: u32) {
        if !self.has_unit(entity_id) {
            self.unit_ids.push(entity_id);
        }
    }

    pub fn remove_unit(&mut self, entity_id: u32) {
        self.unit_ids.retain(|&id| id != entity_id);
        self.squad_map.remove(&entity_id);
    }

    pub fn has_unit(&self, entity_id: u32) -> bool {
        self.unit_ids.contains(&entity_id)
    }

    pub fn unit_ids(&self) -> &[u32] {
        &self.unit_ids
    }

    /// Centroid of living member units; zero vector if none remain.
    pub fn position(&self, registry: &EntityRegistry) -> Vector3 {
        let mut sum = Vector3::ZERO;
        let mut count = 0;
        for &id in &self.unit_ids {
            if let Some(e) = registry.find(id) {
                if !e.destroyed() {
                    sum = sum + e.position();
                    count += 1;
                }
            }
        }
        if count == 0 {
            Vector3::ZERO
        } else {
            sum * (1.0 / count as f32)
        }
    }

    pub fn set_unit_squad(&mut self, entity_id: u32, squad: impl Into<String>) {
        self.squad_map.insert(entity_id, squad.into());
    }

    pub fn get_unit_squad(&self, entity_id: u32) -> &str {
        self.squad_map.get(&entity_id).map(|s| s.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, EntityBase};

    fn prop_at(registry: &mut EntityRegistry, x: f32, z: f32) -> u32 {
        registry.register(Entity::Prop(
            Box::new(EntityBase::new(0, Vector3::new(x, 0.0, z), "test")),
            crate::sim::entity::Prop,
        ))
    }

    #[test]
    fn position_is_centroid_of_living_units() {
        let mut registry = EntityRegistry::new();
        let a = prop_at(&mut registry, 0.0, 0.0);
        let b = prop_at(&mut registry, 10.0, 0.0);
        let mut platoon = Platoon::new(1, 0, "alpha".to_string());
        platoon.add_unit(a);
        platoon.add_unit(b);
        let pos = platoon.position(&registry);
        assert_eq!(pos.x, 5.0);
    }

    #[test]
    fn position_ignores_destroyed_units() {
        let mut registry = EntityRegistry::new();
        let a = prop_at(&mut registry, 0.0, 0.0);
        let b = prop_at(&mut registry, 10.0, 0.0);
        registry.find_mut(b).unwrap().mark_destroyed();
        let mut platoon = Platoon::new(1, 0, "alpha".to_string());
        platoon.add_unit(a);
        platoon.add_unit(b);
        let pos = platoon.position(&registry);
        assert_eq!(pos.x, 0.0);
    }

    #[test]
    fn position_is_zero_when_empty() {
        let registry = EntityRegistry::new();
        let platoon = Platoon::new(1, 0, "alpha".to_string());
        assert_eq!(platoon.position(&registry), Vector3::ZERO);
    }

    #[test]
    fn destroy_is_a_tombstone_not_a_removal() {
        let mut platoon = Platoon::new(1, 0, "alpha".to_string());
        platoon.add_unit(7);
        platoon.mark_destroyed();
        assert!(platoon.destroyed());
        assert!(platoon.has_unit(7));
    }

    #[test]
    fn add_unit_is_idempotent() {
        let mut platoon = Platoon::new(1, 0, "alpha".to_string());
        platoon.add_unit(7);
        platoon.add_unit(7);
        assert_eq!(platoon.unit_ids().len(), 1);
    }
}
