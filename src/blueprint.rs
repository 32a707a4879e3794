//! Blueprint store (Component G): a central registry of asset descriptors,
//! identified by lowercase id, backed by opaque handles into the scripting
//! VM. This crate never parses blueprint data itself — field access goes
//! through [`ScriptHost::get_string_field`]/[`get_number_field`].

use std::collections::HashMap;

use crate::script::{ScriptHandle, ScriptHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlueprintType {
    Unit,
    Projectile,
    Prop,
    Mesh,
    Beam,
    Emitter,
    TrailEmitter,
}

impl BlueprintType {
    pub fn name(self) -> &'static str {
        match self {
            BlueprintType::Unit => "Unit",
            BlueprintType::Projectile => "Projectile",
            BlueprintType::Prop => "Prop",
            BlueprintType::Mesh => "Mesh",
            BlueprintType::Beam => "Beam",
            BlueprintType::Emitter => "Emitter",
            BlueprintType::TrailEmitter => "TrailEmitter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlueprintEntry {
    pub blueprint_type: BlueprintType,
    /// Lowercase blueprint id, e.g. `"uel0001"`.
    pub id: String,
    pub source: String,
    pub handle: ScriptHandle,
}

/// Central registry of all loaded blueprints, keyed by lowercase id.
#[derive(Default)]
pub struct BlueprintStore {
    blueprints: HashMap<String, BlueprintEntry>,
}

impl BlueprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blueprint. `blueprint_id` is the table's `BlueprintId`
    /// field; if empty, `source` (the `Source` field) is used as a
    /// fallback id. A blueprint with neither is skipped. Duplicate
    /// registration releases the old handle before the new entry replaces
    /// it.
    pub fn register(
        &mut self,
        host: &mut dyn ScriptHost,
        blueprint_type: BlueprintType,
        blueprint_id: &str,
        source: &str,
        handle: ScriptHandle,
    ) {
        let id = if !blueprint_id.is_empty() {
            blueprint_id
        } else {
            source
        };
        if id.is_empty() {
            tracing::debug!("blueprint with no BlueprintId or Source, skipping");
            return;
        }
        let id = id.to_lowercase();

        if let Some(old) = self.blueprints.remove(&id) {
            host.release(old.handle);
        }

        self.blueprints.insert(
            id.clone(),
            BlueprintEntry {
                blueprint_type,
                id,
                source: source.to_string(),
                handle,
            },
        );
    }

    pub fn find(&self, id: &str) -> Option<&BlueprintEntry> {
        self.blueprints.get(&id.to_lowercase())
    }

    pub fn get_all(&self, blueprint_type: BlueprintType) -> Vec<&BlueprintEntry> {
        self.blueprints
            .values()
            .filter(|e| e.blueprint_type == blueprint_type)
            .collect()
    }

    pub fn count(&self, blueprint_type: BlueprintType) -> usize {
        self.blueprints
            .values()
            .filter(|e| e.blueprint_type == blueprint_type)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.blueprints.len()
    }

    pub fn log_statistics(&self) {
        tracing::info!("blueprint loading complete:");
        tracing::info!(count = self.count(BlueprintType::Unit), "  units");
        tracing::info!(count = self.count(BlueprintType::Projectile), "  projectiles");
        tracing::info!(count = self.count(BlueprintType::Mesh), "  meshes");
        tracing::info!(count = self.count(BlueprintType::Prop), "  props");
        tracing::info!(count = self.count(BlueprintType::Emitter), "  emitters");
        tracing::info!(count = self.count(BlueprintType::Beam), "  beams");
        tracing::info!(count = self.count(BlueprintType::TrailEmitter), "  trails");
        tracing::info!(count = self.total_count(), "  total");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::NullScriptHost;
    use std::num::NonZeroU64;

    fn handle(n: u64) -> ScriptHandle {
        ScriptHandle(NonZeroU64::new(n).unwrap())
    }

    #[test]
    fn registers_and_finds_by_lowercase_id() {
        let mut host = NullScriptHost;
        let mut store = BlueprintStore::new();
        store.register(&mut host, BlueprintType::Unit, "UEL0001", "/units/uel0001.bp", handle(1));
        assert!(store.find("uel0001").is_some());
        assert!(store.find("UEL0001").is_some());
        assert_eq!(store.count(BlueprintType::Unit), 1);
    }

    #[test]
    fn falls_back_to_source_when_id_empty() {
        let mut host = NullScriptHost;
        let mut store = BlueprintStore::new();
        store.register(&mut host, BlueprintType::Prop, "", "/props/Rock01.bp", handle(2));
        assert!(store.find("/props/rock01.bp").is_some());
    }

    #[test]
    fn skips_blueprint_with_no_id_or_source() {
        let mut host = NullScriptHost;
        let mut store = BlueprintStore::new();
        store.register(&mut host, BlueprintType::Prop, "", "", handle(3));
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn duplicate_registration_replaces_entry() {
        let mut host = NullScriptHost;
        let mut store = BlueprintStore::new();
        store.register(&mut host, BlueprintType::Unit, "uel0001", "a", handle(1));
        store.register(&mut host, BlueprintType::Unit, "uel0001", "b", handle(2));
        assert_eq!(store.total_count(), 1);
        assert_eq!(store.find("uel0001").unwrap().handle, handle(2));
    }
}
