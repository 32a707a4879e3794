//! Minimal end-to-end demonstration of the simulation core: boot a session
//! against a temp-directory VFS mount, spawn two armies, issue a move order
//! directly to the first army's spawned ACU, and step the tick loop.
//!
//! Run with: cargo run --example basic_demo

use std::fs;
use std::io::Write;

use supcom_core::sim::{CommandType, Entity, UnitCommand};
use supcom_core::{begin_session, boot_session, ArmySlot, NullScriptHost, SessionConfig, SimConfig, Vector3};

fn write_minimal_scmap(path: &std::path::Path) {
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
    buf.extend_from_slice(&128i32.to_le_bytes());
    buf.extend_from_slice(&128i32.to_le_bytes());
    buf.extend_from_slice(&1.0f32.to_le_bytes());
    for _ in 0..(129 * 129) {
        buf.extend_from_slice(&0i16.to_le_bytes());
    }
    buf.push(0);
    buf.push(0);
    buf.push(0);
    buf.push(0);
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&[0u8; 92]);
    buf.push(0);

    let mut file = fs::File::create(path).expect("create demo map file");
    file.write_all(&buf).expect("write demo map file");
}

fn main() {
    println!("=== Supreme Commander Core - Headless Demo ===\n");

    let fa_path = std::env::temp_dir().join(format!("supcom_core_demo_{}", std::process::id()));
    fs::create_dir_all(fa_path.join("maps")).expect("create demo fa_path");
    write_minimal_scmap(&fa_path.join("maps").join("demo.scmap"));

    let session = SessionConfig {
        fa_path: fa_path.clone(),
        extra_mounts: Vec::new(),
        map_vfs_path: "/maps/demo.scmap".to_string(),
        armies: vec![
            ArmySlot {
                name: "Player".to_string(),
                is_human: true,
                faction: 1,
                start_position: Vector3::new(20.0, 0.0, 20.0),
            },
            ArmySlot {
                name: "Enemy AI".to_string(),
                is_human: false,
                faction: 2,
                start_position: Vector3::new(200.0, 0.0, 200.0),
            },
        ],
    };

    let config = SimConfig::default();
    let mut host = NullScriptHost;

    let mut state = boot_session(&session, &config, &mut host).expect("boot session");
    println!("Session booted: {} armies, map {}x{}", state.armies.len(), state.terrain.map_width(), state.terrain.map_height());

    begin_session(&mut state, "demo_acu", &mut host);
    println!("Spawned {} entities", state.registry.count());

    let player_acu_id = state.registry.ids_snapshot()[0];
    if let Some(Entity::Unit(unit)) = state.registry.find_mut(player_acu_id) {
        unit.max_speed = 4.0;
        unit.push_command(
            UnitCommand {
                command_type: CommandType::Move,
                target_position: Vector3::new(60.0, 0.0, 60.0),
                target_id: 0,
                blueprint_id: String::new(),
            },
            true,
        );
    }

    println!("\nRunning 100 ticks...\n");
    for tick in 0..100 {
        state.tick(&config, &mut host);
        if (tick + 1) % 25 == 0 {
            let pos = state.registry.find(player_acu_id).map(|e| e.position());
            println!("tick {:>4} (t={:.1}s): player ACU at {:?}", state.tick_count, state.game_time, pos);
        }
    }

    fs::remove_dir_all(&fa_path).ok();
    println!("\nDone.");
}
