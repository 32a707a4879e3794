//! Scripting VM boundary.
//!
//! The embedded scripting VM is an external collaborator (see crate docs);
//! this module only models the *shape* of the boundary the core is built
//! against: an opaque per-entity handle, and the named entry points the
//! core invokes during a tick. A host embeds a real VM by implementing
//! [`ScriptHost`]; [`NullScriptHost`] satisfies "missing means no-op" for
//! headless use without any scripting layer at all (used throughout this
//! crate's own tests).

use std::num::NonZeroU64;

/// Opaque handle to a VM-side object paired with an entity. The core never
/// dereferences this — it is a weak back-reference, released by calling
/// [`ScriptHost::release`] when the owning entity is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHandle(pub NonZeroU64);

/// Damage type tag passed through to `Damage`/`DamageArea`. Kept as a
/// string on the wire (matching the scripting surface) rather than a closed
/// enum, since blueprints define their own damage type vocabulary.
pub type DamageType = String;

/// Named entry points the simulation core invokes on the scripting VM.
/// Every method is optional in spirit — [`NullScriptHost`] no-ops all of
/// them — so a partially-scripted mod never breaks the tick loop.
pub trait ScriptHost {
    fn on_start_build(&mut self, _builder: ScriptHandle, _target: ScriptHandle) {}
    fn on_stop_build(&mut self, _target: ScriptHandle) {}
    fn on_start_being_built(&mut self, _builder: ScriptHandle, _layer: &str) {}
    fn on_stop_being_built(&mut self, _builder: ScriptHandle, _layer: &str) {}
    fn on_failed_to_build(&mut self, _builder: ScriptHandle) {}
    fn on_reclaimed(&mut self, _target: ScriptHandle) {}
    fn on_start_capture(&mut self, _capturer: ScriptHandle, _target: ScriptHandle) {}
    fn on_stop_capture(&mut self, _capturer: ScriptHandle, _target: ScriptHandle) {}
    fn on_failed_capture(&mut self, _capturer: ScriptHandle) {}
    fn on_start_being_captured(&mut self, _target: ScriptHandle) {}
    fn on_stop_being_captured(&mut self, _target: ScriptHandle) {}
    fn on_failed_being_captured(&mut self, _target: ScriptHandle) {}
    fn on_captured(&mut self, _target: ScriptHandle, _new_army: i32) {}
    fn on_transport_attach(&mut self, _transport: ScriptHandle, _cargo: ScriptHandle) {}
    fn on_transport_detach(&mut self, _transport: ScriptHandle, _cargo: ScriptHandle) {}
    fn on_layer_change(&mut self, _unit: ScriptHandle, _new_layer: &str, _old_layer: &str) {}
    fn on_work_begin(&mut self, _unit: ScriptHandle) {}
    fn on_work_end(&mut self, _unit: ScriptHandle) {}
    fn on_work_fail(&mut self, _unit: ScriptHandle) {}

    fn damage(
        &mut self,
        _instigator: Option<ScriptHandle>,
        _target: ScriptHandle,
        _amount: f32,
        _damage_type: &DamageType,
    ) {
    }
    fn damage_area(
        &mut self,
        _instigator: Option<ScriptHandle>,
        _center: (f32, f32, f32),
        _radius: f32,
        _amount: f32,
        _damage_type: &DamageType,
        _damage_friendly: bool,
    ) {
    }

    /// Release the VM-side reference paired with an entity. Called exactly
    /// once, when the entity is destroyed or unregistered.
    fn release(&mut self, _handle: ScriptHandle) {}

    /// Reads a string field from a blueprint (or other VM-side) table.
    fn get_string_field(&self, _handle: ScriptHandle, _field: &str) -> Option<String> {
        None
    }

    /// Reads a numeric field from a blueprint (or other VM-side) table.
    fn get_number_field(&self, _handle: ScriptHandle, _field: &str) -> Option<f64> {
        None
    }

    /// Parses one blueprint file's raw bytes into a VM-side table and
    /// returns the descriptor the core needs to index it: blueprint type,
    /// id, fallback source path, and a handle for later field reads.
    /// `None` means the VM rejected the file (not a recognized table).
    fn load_blueprint(
        &mut self,
        _vfs_path: &str,
        _raw_data: &[u8],
    ) -> Option<(crate::blueprint::BlueprintType, String, ScriptHandle)> {
        None
    }

    /// Invoked once per army during session setup, after its `ArmyBrain` is
    /// constructed.
    fn on_create_army_brain(&mut self, _army_index: i32) {}

    /// Invoked once, after all armies and blueprints are set up but before
    /// the first tick.
    fn setup_session(&mut self) {}

    /// Invoked once, immediately before the tick loop starts.
    fn begin_session(&mut self) {}
}

/// No-op [`ScriptHost`] — every entry point is a no-op, matching "missing
/// means no-op" from the scripting boundary contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScriptHost;

impl ScriptHost for NullScriptHost {}
