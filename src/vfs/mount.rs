//! The [`MountPoint`] trait: a single mount source backing a region of the
//! virtual filesystem, plus the [`FileInfo`] it reports.

/// Metadata about a file or folder as reported by a mount source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub size_bytes: u64,
    pub is_folder: bool,
}

/// A single source backing a region of the virtual filesystem: either a real
/// directory on disk or an indexed archive. All paths passed to a
/// `MountPoint` are already relative to the mount's root and have had their
/// mountpoint prefix stripped — a mount never sees the virtual path it was
/// mounted under.
pub trait MountPoint: Send + Sync {
    /// Read a file's entire contents. Returns `None` if not found.
    fn read_file(&self, relative_path: &str) -> Option<Vec<u8>>;

    /// Check whether a file exists at the given path.
    fn file_exists(&self, relative_path: &str) -> bool;

    /// Find all files under `directory` whose name matches `pattern`
    /// (a `*suffix` glob, case-insensitive on the filename). Returned paths
    /// are mount-relative, rooted at `/`.
    fn find_files(&self, directory: &str, pattern: &str) -> Vec<String>;

    /// Get file info, or `None` if not found.
    fn get_file_info(&self, relative_path: &str) -> Option<FileInfo>;
}

/// Extracts the suffix half of a `*suffix` glob pattern, lowercased. Only the
/// `*suffix` shape is recognized; a pattern with no leading `*` yields an
/// empty suffix, which matches everything (this quirk is inherited as-is).
pub(crate) fn glob_suffix(pattern: &str) -> String {
    let pat = pattern.to_lowercase();
    pat.strip_prefix('*').unwrap_or("").to_string()
}

pub(crate) fn filename_matches_suffix(filename_lower: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return true;
    }
    filename_lower.ends_with(suffix)
}
