//! Simulation core: entities, army brains, and the tick loop.

pub mod army;
pub mod entity;
pub mod navigator;
pub mod platoon;
pub mod projectile;
pub mod scheduler;
pub mod state;
pub mod unit;
pub mod weapon;

pub use army::{Alliance, ArmyBrain, BrainState, EconomyState, ResourceState};
pub use entity::{Entity, EntityBase, EntityRegistry, Prop, Shield};
pub use navigator::{NavStatus, Navigator};
pub use platoon::Platoon;
pub use projectile::Projectile;
pub use scheduler::{ForkOutbox, Scheduler, ScriptedTask, ThreadHandle, ThreadStep};
pub use state::SimState;
pub use unit::{CommandType, FireState, Unit, UnitCommand, UnitCtx, UnitEconomy};
pub use weapon::Weapon;
