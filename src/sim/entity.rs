//! Entity registry (Component H): a tagged sum of the four entity variants
//! plus an id-assigning container with radius/rectangle spatial queries.
//!
//! Ground: `entity.hpp`, `entity_registry.hpp/.cpp`.

use std::collections::HashMap;

use crate::script::ScriptHandle;
use crate::types::{Quaternion, Vector3};

use super::army::Alliance;
use super::projectile::Projectile;
use super::unit::Unit;

/// Fields shared by every entity variant, matching the original's `Entity`
/// base class field-for-field.
#[derive(Debug, Clone)]
pub struct EntityBase {
    pub entity_id: u32,
    pub army: i32,
    pub position: Vector3,
    pub orientation: Quaternion,
    pub health: f32,
    pub max_health: f32,
    pub fraction_complete: f32,
    pub destroyed: bool,
    pub blueprint_id: String,
    pub script_handle: Option<ScriptHandle>,
}

impl EntityBase {
    pub fn new(army: i32, position: Vector3, blueprint_id: impl Into<String>) -> Self {
        Self {
            entity_id: 0,
            army,
            position,
            orientation: Quaternion::default(),
            health: 0.0,
            max_health: 0.0,
            fraction_complete: 1.0,
            destroyed: false,
            blueprint_id: blueprint_id.into(),
            script_handle: None,
        }
    }

    /// Clamps only the lower bound — the original never clamps the upper
    /// bound here, leaving that to callers that know `max_health`.
    pub fn set_health(&mut self, h: f32) {
        self.health = h.max(0.0);
    }
}

/// A prop has no behavior of its own beyond the base fields — it never
/// receives a per-tick update.
#[derive(Debug, Clone, Default)]
pub struct Prop;

/// Shields carry a handful of extra fields but, like props, have no
/// per-tick core-side update: `IsOn`/size/type are read and written by the
/// scripting VM directly through field accessors.
#[derive(Debug, Clone, Default)]
pub struct Shield {
    pub owner_id: u32,
    pub is_on: bool,
    pub size: f32,
    pub shield_type: String,
}

/// Tagged sum over the four entity kinds (design note: "pervasive dynamic
/// dispatch on entity variant" is expressed as a tagged sum, not a vtable).
#[derive(Debug, Clone)]
pub enum Entity {
    Unit(Box<Unit>),
    Projectile(Box<Projectile>),
    Prop(Box<EntityBase>, Prop),
    Shield(Box<EntityBase>, Shield),
}

impl Entity {
    pub fn base(&self) -> &EntityBase {
        match self {
            Entity::Unit(u) => &u.base,
            Entity::Projectile(p) => &p.base,
            Entity::Prop(b, _) => b,
            Entity::Shield(b, _) => b,
        }
    }

    pub fn base_mut(&mut self) -> &mut EntityBase {
        match self {
            Entity::Unit(u) => &mut u.base,
            Entity::Projectile(p) => &mut p.base,
            Entity::Prop(b, _) => b,
            Entity::Shield(b, _) => b,
        }
    }

    pub fn entity_id(&self) -> u32 {
        self.base().entity_id
    }

    pub fn army(&self) -> i32 {
        self.base().army
    }

    pub fn position(&self) -> Vector3 {
        self.base().position
    }

    pub fn destroyed(&self) -> bool {
        self.base().destroyed
    }

    pub fn mark_destroyed(&mut self) {
        self.base_mut().destroyed = true;
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Entity::Unit(_))
    }
    pub fn is_projectile(&self) -> bool {
        matches!(self, Entity::Projectile(_))
    }
    pub fn is_prop(&self) -> bool {
        matches!(self, Entity::Prop(..))
    }
    pub fn is_shield(&self) -> bool {
        matches!(self, Entity::Shield(..))
    }

    pub fn as_unit(&self) -> Option<&Unit> {
        match self {
            Entity::Unit(u) => Some(u),
            _ => None,
        }
    }
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match self {
            Entity::Unit(u) => Some(u),
            _ => None,
        }
    }
    pub fn as_projectile_mut(&mut self) -> Option<&mut Projectile> {
        match self {
            Entity::Projectile(p) => Some(p),
            _ => None,
        }
    }
}

/// Id-assigning container of entities. Ids are monotonic and never reused
/// within a session, matching invariant 6 of the data model.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<u32, Entity>,
    next_id: u32,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Assigns the next monotonic id to `entity` and inserts it, returning
    /// the id.
    pub fn register(&mut self, mut entity: Entity) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        entity.base_mut().entity_id = id;
        self.entities.insert(id, entity);
        id
    }

    pub fn unregister(&mut self, id: u32) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Removes an entity from the map for the duration of its own update,
    /// so the update can borrow the rest of the registry freely. Callers
    /// must reinsert via [`Self::put_back`] unless the entity is meant to
    /// be destroyed.
    pub fn take(&mut self, id: u32) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn put_back(&mut self, entity: Entity) {
        self.entities.insert(entity.entity_id(), entity);
    }

    pub fn find(&self, id: u32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Snapshot of every currently registered id, in no particular order —
    /// callers that need determinism sort it (the tick loop sorts
    /// ascending, matching monotonic allocation order).
    pub fn ids_snapshot(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn for_each(&self, mut f: impl FnMut(&Entity)) {
        for e in self.entities.values() {
            f(e);
        }
    }

    /// Entities within `radius` of `(x, z)` on the ground plane, skipping
    /// destroyed entities.
    pub fn collect_in_radius(&self, x: f32, z: f32, radius: f32) -> Vec<u32> {
        let r2 = radius * radius;
        let mut out: Vec<u32> = self
            .entities
            .values()
            .filter(|e| !e.destroyed())
            .filter(|e| {
                let p = e.position();
                let dx = p.x - x;
                let dz = p.z - z;
                dx * dx + dz * dz <= r2
            })
            .map(|e| e.entity_id())
            .collect();
        out.sort_unstable();
        out
    }

    /// Entities within the axis-aligned rectangle `[x0,x1] x [z0,z1]`
    /// (bounds normalized), skipping destroyed entities.
    pub fn collect_in_rect(&self, x0: f32, z0: f32, x1: f32, z1: f32) -> Vec<u32> {
        let (xlo, xhi) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (zlo, zhi) = if z0 <= z1 { (z0, z1) } else { (z1, z0) };
        let mut out: Vec<u32> = self
            .entities
            .values()
            .filter(|e| !e.destroyed())
            .filter(|e| {
                let p = e.position();
                p.x >= xlo && p.x <= xhi && p.z >= zlo && p.z <= zhi
            })
            .map(|e| e.entity_id())
            .collect();
        out.sort_unstable();
        out
    }

    /// Nearest living enemy of `army` within `max_range` (inclusive, by
    /// squared distance), honoring `[min_range, max_range]` banding and
    /// excluding unassigned armies (`army < 0`). Deterministic tie-break:
    /// lowest entity id wins.
    pub fn nearest_enemy(
        &self,
        x: f32,
        z: f32,
        army: i32,
        min_range: f32,
        max_range: f32,
    ) -> Option<u32> {
        let min2 = min_range * min_range;
        let max2 = max_range * max_range;
        let mut best: Option<(u32, f32)> = None;
        for e in self.entities.values() {
            if e.destroyed() || e.army() == army || e.army() < 0 {
                continue;
            }
            let p = e.position();
            let dx = p.x - x;
            let dz = p.z - z;
            let d2 = dx * dx + dz * dz;
            if d2 < min2 || d2 > max2 {
                continue;
            }
            match best {
                Some((_, bd)) if d2 >= bd => {}
                _ => best = Some((e.entity_id(), d2)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Whether `a` and `b` are on opposing sides per `alliances` — used by
    /// weapon retargeting and threat queries.
    pub fn is_enemy_of(&self, a: i32, b: i32, alliance: Alliance) -> bool {
        a != b && a >= 0 && b >= 0 && alliance == Alliance::Enemy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(army: i32, x: f32, z: f32) -> EntityBase {
        EntityBase::new(army, Vector3::new(x, 0.0, z), "test")
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = EntityRegistry::new();
        let id1 = reg.register(Entity::Prop(Box::new(base(0, 0.0, 0.0)), Prop));
        let id2 = reg.register(Entity::Prop(Box::new(base(0, 1.0, 0.0)), Prop));
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        reg.unregister(id1);
        let id3 = reg.register(Entity::Prop(Box::new(base(0, 2.0, 0.0)), Prop));
        assert_eq!(id3, 3);
    }

    #[test]
    fn collect_in_radius_skips_destroyed_and_far() {
        let mut reg = EntityRegistry::new();
        let near = reg.register(Entity::Prop(Box::new(base(0, 1.0, 0.0)), Prop));
        let far = reg.register(Entity::Prop(Box::new(base(0, 100.0, 0.0)), Prop));
        let dead = reg.register(Entity::Prop(Box::new(base(0, 1.0, 1.0)), Prop));
        reg.find_mut(dead).unwrap().mark_destroyed();

        let found = reg.collect_in_radius(0.0, 0.0, 5.0);
        assert!(found.contains(&near));
        assert!(!found.contains(&far));
        assert!(!found.contains(&dead));
    }

    #[test]
    fn nearest_enemy_respects_range_band_and_alliance() {
        let mut reg = EntityRegistry::new();
        let enemy_far = reg.register(Entity::Prop(Box::new(base(1, 50.0, 0.0)), Prop));
        let enemy_near = reg.register(Entity::Prop(Box::new(base(1, 5.0, 0.0)), Prop));
        let _friendly = reg.register(Entity::Prop(Box::new(base(0, 1.0, 0.0)), Prop));
        let _unassigned = reg.register(Entity::Prop(Box::new(base(-1, 2.0, 0.0)), Prop));

        let found = reg.nearest_enemy(0.0, 0.0, 0, 0.0, 20.0);
        assert_eq!(found, Some(enemy_near));
        let _ = enemy_far;
    }

    #[test]
    fn collect_in_rect_normalizes_bounds() {
        let mut reg = EntityRegistry::new();
        let inside = reg.register(Entity::Prop(Box::new(base(0, 5.0, 5.0)), Prop));
        let outside = reg.register(Entity::Prop(Box::new(base(0, 50.0, 50.0)), Prop));
        let found = reg.collect_in_rect(10.0, 10.0, 0.0, 0.0);
        assert!(found.contains(&inside));
        assert!(!found.contains(&outside));
    }
}
