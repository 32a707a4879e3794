//! Headless Supreme Commander: Forged Alliance-compatible simulation core.
//!
//! A deterministic, fixed-timestep simulation engine: overlay virtual
//! filesystem, map/terrain/pathfinding/visibility, blueprint store, entity
//! registry, cooperative scripted-thread scheduler, unit command state
//! machines, army economy, and the tick loop tying it together. The
//! embedded scripting VM is an external collaborator — this crate is built
//! against the shape of that boundary (see [`script::ScriptHost`]), not a
//! particular VM implementation.

pub mod blueprint;
pub mod category;
pub mod config;
pub mod error;
pub mod map;
pub mod script;
pub mod session;
pub mod sim;
pub mod types;
pub mod vfs;

#[cfg(feature = "profile")]
pub mod profiler;

pub use blueprint::{BlueprintEntry, BlueprintStore, BlueprintType};
pub use category::CategoryExpr;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use script::{DamageType, NullScriptHost, ScriptHandle, ScriptHost};
pub use session::{begin_session, boot_session, ArmySlot, DataSource, SessionConfig};
pub use sim::{Alliance, ArmyBrain, Entity, EntityRegistry, Platoon, SimState};
pub use types::{Quaternion, Vector3};
pub use vfs::VirtualFileSystem;
