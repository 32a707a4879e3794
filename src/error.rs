//! Error taxonomy for the simulation core.
//!
//! Mirrors the failure classes the core actually surfaces to a caller:
//! boot-time configuration problems, map parse failures, and scripting-call
//! failures raised at the VM boundary. Resource-not-found (VFS misses) is
//! deliberately *not* a variant here — callers model it as `Option<T>` per
//! the soft-failure policy described in the crate docs.

use std::path::PathBuf;

/// Top-level error type for fallible boot/parse/script operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Missing or malformed boot configuration (init file, FA path, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// A map (SCMAP) failed to parse.
    #[error("map parse error: {0}")]
    MapParse(String),

    /// A VFS path was required to exist (a boot-critical mount or asset)
    /// but did not. Distinct from the soft `Option`-returning lookups used
    /// elsewhere — this variant is for call sites that have decided a miss
    /// is fatal.
    #[error("required path not found in VFS: {0}")]
    VfsRequired(PathBuf),

    /// A named scripting VM entry point failed when invoked.
    #[error("script call to `{entry_point}` failed: {detail}")]
    ScriptCallFailed {
        entry_point: &'static str,
        detail: String,
    },
}

pub type SimResult<T> = Result<T, SimError>;
