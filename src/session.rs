//! Session/scenario orchestration (Component O).
//!
//! Ground: `main.cpp`, `session_manager.cpp`. Dropped entirely by the
//! distillation but load-bearing for anything that exercises the rest of
//! the crate end to end: this module owns no new algorithms, it just
//! sequences mount discovery, blueprint loading, map loading, and army
//! setup in the right order and hands the assembled [`SimState`] to the
//! caller.

use std::path::Path;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::map::load_map;
use crate::script::ScriptHost;
use crate::sim::{ArmyBrain, SimState};
use crate::types::Vector3;
use crate::vfs::{ArchiveMount, DirectoryMount, VirtualFileSystem};

const BLUEPRINT_SUFFIXES: [&str; 5] = ["*.bp", "*_unit.bp", "*_prop.bp", "*_weapon.bp", "*_projectile.bp"];

/// One configured player/AI slot for [`boot_session`].
pub struct ArmySlot {
    pub name: String,
    pub is_human: bool,
    pub faction: i32,
    pub start_position: Vector3,
}

/// Extra content to layer over the base game install, in mount priority
/// order (earlier entries shadow later ones — mount mods/patches first).
pub enum DataSource {
    Directory(std::path::PathBuf),
    Archive(std::path::PathBuf),
}

/// Everything needed to boot a session: base game path, any extra mod/FAF
/// data mounts, the map to load, and the armies to set up.
pub struct SessionConfig {
    pub fa_path: std::path::PathBuf,
    pub extra_mounts: Vec<DataSource>,
    pub map_vfs_path: String,
    pub armies: Vec<ArmySlot>,
}

/// Discovers and mounts the virtual filesystem: extra data sources first
/// (highest priority, so patches/mods shadow base content), then the base
/// game install last.
fn discover_mounts(config: &SessionConfig) -> SimResult<VirtualFileSystem> {
    let mut vfs = VirtualFileSystem::new();

    for source in &config.extra_mounts {
        match source {
            DataSource::Directory(path) => {
                vfs.mount("/", Box::new(DirectoryMount::new(path.clone())));
            }
            DataSource::Archive(path) => match ArchiveMount::open(path) {
                Ok(mount) => vfs.mount("/", Box::new(mount)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable archive mount");
                }
            },
        }
    }

    if !config.fa_path.is_dir() {
        return Err(SimError::Config(format!(
            "fa_path does not exist or is not a directory: {}",
            config.fa_path.display()
        )));
    }
    vfs.mount("/", Box::new(DirectoryMount::new(config.fa_path.clone())));

    Ok(vfs)
}

/// Walks the mounted VFS for blueprint files and registers each one the
/// host VM accepts. Files the VM can't parse into a table are skipped
/// (logged at debug level), matching "resource-not-found is soft".
fn load_blueprints(vfs: &VirtualFileSystem, host: &mut dyn ScriptHost) -> crate::blueprint::BlueprintStore {
    let mut store = crate::blueprint::BlueprintStore::new();
    let mut seen = std::collections::HashSet::new();

    for suffix in BLUEPRINT_SUFFIXES {
        for path in vfs.find_files("/", suffix) {
            if !seen.insert(path.clone()) {
                continue;
            }
            let Some(data) = vfs.read_file(&path) else {
                continue;
            };
            let Some((blueprint_type, id, handle)) = host.load_blueprint(&path, &data) else {
                tracing::debug!(path = %path, "blueprint file rejected by host, skipping");
                continue;
            };
            store.register(host, blueprint_type, &id, &path, handle);
        }
    }

    store.log_statistics();
    store
}

/// Constructs one [`ArmyBrain`] per configured slot. Alliances default to
/// self-Ally/otherwise-Enemy (spec.md §4.K); this function does not apply
/// any overrides — callers set those explicitly via `ArmyBrain::set_alliance`
/// after setup if the scenario calls for them.
fn setup_armies(config: &SessionConfig, host: &mut dyn ScriptHost) -> Vec<ArmyBrain> {
    config
        .armies
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let index = i as i32;
            let mut brain = ArmyBrain::new(index, slot.name.clone());
            brain.set_human(slot.is_human);
            brain.set_faction(slot.faction);
            brain.set_start_position(slot.start_position);
            host.on_create_army_brain(index);
            brain
        })
        .collect()
}

/// Two-phase boot (spec.md §4.O): discover mounts, load blueprints, load
/// the map, set up armies, spawn start-position ACUs, and hand off the
/// assembled [`SimState`] ready for `tick()`.
///
/// Sequences A (VFS) -> B/C/D (map/terrain/pathfinding grid) -> F
/// (visibility grid, sized to the same map) -> G (blueprints) -> M
/// (armies), surfacing configuration/parse failures per §7 rather than
/// panicking.
pub fn boot_session(session: &SessionConfig, sim_config: &SimConfig, host: &mut dyn ScriptHost) -> SimResult<SimState> {
    let vfs = discover_mounts(session)?;

    let map_data = vfs
        .read_file(&session.map_vfs_path)
        .ok_or_else(|| SimError::VfsRequired(Path::new(&session.map_vfs_path).to_path_buf()))?;
    let (terrain, grid, visibility) = load_map(&map_data, sim_config)?;

    let blueprints = load_blueprints(&vfs, host);

    let armies = setup_armies(session, host);

    let mut state = SimState::new(terrain, grid, visibility, sim_config);
    state.blueprints = blueprints;
    state.armies = armies;

    host.setup_session();

    Ok(state)
}

/// Session begin (spec.md §4.O): spawns each army's ACU at its configured
/// start position. `acu_blueprint_id` is the blueprint id to spawn for
/// every army — scenarios with per-army starting units should spawn them
/// directly via `state.registry` instead of calling this helper.
pub fn begin_session(state: &mut SimState, acu_blueprint_id: &str, host: &mut dyn ScriptHost) {
    let armies: Vec<(i32, Vector3)> = state.armies.iter().map(|a| (a.index(), a.start_position())).collect();
    for (army_index, start_position) in armies {
        let mut acu = crate::sim::Unit::new(army_index, start_position, acu_blueprint_id);
        acu.base.max_health = 1.0;
        acu.base.health = 1.0;
        state.registry.register(crate::sim::Entity::Unit(Box::new(acu)));
    }
    host.begin_session();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::NullScriptHost;

    fn minimal_scmap() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"Map\x1a");
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&256.0f32.to_le_bytes());
        buf.extend_from_slice(&256.0f32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&[0u8; 2]);
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&56i32.to_le_bytes());
        buf.extend_from_slice(&8i32.to_le_bytes());
        buf.extend_from_slice(&8i32.to_le_bytes());
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        for _ in 0..(9 * 9) {
            buf.extend_from_slice(&0i16.to_le_bytes());
        }
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 92]);
        buf.push(0);
        buf
    }

    fn write_temp_dir(name: &str) -> std::path::PathBuf {
        let tmp = std::env::temp_dir().join(format!("supcom_core_session_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    #[test]
    fn boot_fails_when_fa_path_missing() {
        let session = SessionConfig {
            fa_path: std::path::PathBuf::from("/nonexistent/path/does/not/exist"),
            extra_mounts: Vec::new(),
            map_vfs_path: "/maps/test.scmap".to_string(),
            armies: Vec::new(),
        };
        let sim_config = SimConfig::default();
        let mut host = NullScriptHost;
        let result = boot_session(&session, &sim_config, &mut host);
        assert!(result.is_err());
    }

    #[test]
    fn boot_fails_when_map_missing_from_vfs() {
        let fa_path = write_temp_dir("fa");
        let session = SessionConfig {
            fa_path: fa_path.clone(),
            extra_mounts: Vec::new(),
            map_vfs_path: "/maps/missing.scmap".to_string(),
            armies: Vec::new(),
        };
        let sim_config = SimConfig::default();
        let mut host = NullScriptHost;
        let result = boot_session(&session, &sim_config, &mut host);
        assert!(result.is_err());
        std::fs::remove_dir_all(&fa_path).ok();
    }

    #[test]
    fn boot_succeeds_and_spawns_acus() {
        let fa_path = write_temp_dir("fa_ok");
        std::fs::create_dir_all(fa_path.join("maps")).unwrap();
        std::fs::write(fa_path.join("maps").join("test.scmap"), minimal_scmap()).unwrap();

        let session = SessionConfig {
            fa_path: fa_path.clone(),
            extra_mounts: Vec::new(),
            map_vfs_path: "/maps/test.scmap".to_string(),
            armies: vec![
                ArmySlot {
                    name: "Player1".to_string(),
                    is_human: true,
                    faction: 1,
                    start_position: Vector3::new(10.0, 0.0, 10.0),
                },
                ArmySlot {
                    name: "AI1".to_string(),
                    is_human: false,
                    faction: 2,
                    start_position: Vector3::new(50.0, 0.0, 50.0),
                },
            ],
        };
        let sim_config = SimConfig::default();
        let mut host = NullScriptHost;
        let mut state = boot_session(&session, &sim_config, &mut host).unwrap();
        assert_eq!(state.armies.len(), 2);
        assert!(state.armies[0].is_ally(0));
        assert!(state.armies[0].is_enemy(1));

        begin_session(&mut state, "ueasl0401", &mut host);
        assert_eq!(state.registry.count(), 2);

        std::fs::remove_dir_all(&fa_path).ok();
    }
}
