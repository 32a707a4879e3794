//! Overlay virtual filesystem (Component A).
//!
//! An ordered stack of [`MountPoint`]s is searched first-mounted-wins, the
//! same policy FAF uses to let patch mounts shadow base-game content without
//! actually overwriting it on disk. All paths are normalized through a
//! single pure function before lookup or mount registration, so two
//! differently-spelled paths to the same file always resolve identically.

mod archive;
mod directory;
mod mount;

pub use archive::ArchiveMount;
pub use directory::DirectoryMount;
pub use mount::{FileInfo, MountPoint};

struct MountEntry {
    mountpoint: String,
    source: Box<dyn MountPoint>,
}

/// Ordered overlay of mount points, queried as a single logical filesystem.
#[derive(Default)]
pub struct VirtualFileSystem {
    mounts: Vec<MountEntry>,
}

impl VirtualFileSystem {
    pub fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Normalizes a virtual path: backslashes to slashes, lowercased,
    /// `//`/`/./`/`/../` collapsed, a leading slash ensured, and no trailing
    /// slash except for the root `/` itself.
    pub fn normalize(path: &str) -> String {
        let forward = path.replace('\\', "/").to_lowercase();

        let mut collapsed = String::with_capacity(forward.len());
        for c in forward.chars() {
            if c == '/' && collapsed.ends_with('/') {
                continue;
            }
            collapsed.push(c);
        }

        let mut result = collapsed;
        while let Some(pos) = result.find("/./") {
            result.replace_range(pos..pos + 2, "");
        }

        loop {
            let Some(pos) = result.find("/../") else {
                break;
            };
            if pos == 0 {
                result.replace_range(0..3, "");
                continue;
            }
            match result[..pos].rfind('/') {
                None => {
                    result.replace_range(0..pos + 4, "");
                }
                Some(parent) => {
                    result.replace_range(parent..pos + 4, "");
                }
            }
        }

        if !result.starts_with('/') {
            result.insert(0, '/');
        }
        if result.len() > 1 && result.ends_with('/') {
            result.pop();
        }
        result
    }

    /// Strips `mountpoint` from the front of an already-normalized `path`,
    /// returning the mount-relative remainder if `path` lies under it. The
    /// root mount (`/`) matches every path.
    fn strip_mountpoint(path: &str, mountpoint: &str) -> Option<String> {
        if mountpoint == "/" {
            return Some(path.to_string());
        }
        let rest = path.strip_prefix(mountpoint)?;
        if rest.is_empty() {
            return Some("/".to_string());
        }
        rest.starts_with('/').then(|| rest.to_string())
    }

    /// Mounts `source` at `mountpoint`, normalizing the mountpoint path.
    /// Later mounts are searched after earlier ones — mount higher-priority
    /// overlays (patches, mods) first.
    pub fn mount(&mut self, mountpoint: &str, source: Box<dyn MountPoint>) {
        let mp = Self::normalize(mountpoint);
        tracing::debug!(mountpoint = %mp, "vfs: mounting");
        self.mounts.push(MountEntry { mountpoint: mp, source });
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let norm = Self::normalize(path);
        for entry in &self.mounts {
            if let Some(remainder) = Self::strip_mountpoint(&norm, &entry.mountpoint) {
                if let Some(data) = entry.source.read_file(&remainder) {
                    return Some(data);
                }
            }
        }
        None
    }

    pub fn file_exists(&self, path: &str) -> bool {
        let norm = Self::normalize(path);
        self.mounts.iter().any(|entry| {
            Self::strip_mountpoint(&norm, &entry.mountpoint)
                .is_some_and(|remainder| entry.source.file_exists(&remainder))
        })
    }

    /// Finds files under `directory` across every mount, deduplicating by
    /// reconstructed virtual path (first-mounted entry wins for priority,
    /// but all are searched so overlays can contribute files the base mount
    /// lacks).
    pub fn find_files(&self, directory: &str, pattern: &str) -> Vec<String> {
        let norm_dir = Self::normalize(directory);
        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();

        for entry in &self.mounts {
            let Some(remainder) = Self::strip_mountpoint(&norm_dir, &entry.mountpoint) else {
                continue;
            };
            for found in entry.source.find_files(&remainder, pattern) {
                let full_path = if entry.mountpoint == "/" {
                    found
                } else {
                    Self::normalize(&format!("{}{}", entry.mountpoint, found))
                };
                if seen.insert(full_path.clone()) {
                    results.push(full_path);
                }
            }
        }
        results
    }

    pub fn get_file_info(&self, path: &str) -> Option<FileInfo> {
        let norm = Self::normalize(path);
        for entry in &self.mounts {
            if let Some(remainder) = Self::strip_mountpoint(&norm, &entry.mountpoint) {
                if let Some(info) = entry.source.get_file_info(&remainder) {
                    return Some(info);
                }
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.mounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(VirtualFileSystem::normalize("Units\\Tank.bp"), "/units/tank.bp");
        assert_eq!(VirtualFileSystem::normalize("/a//b/./c/../d"), "/a/b/d");
        assert_eq!(VirtualFileSystem::normalize("/"), "/");
        assert_eq!(VirtualFileSystem::normalize(""), "/");
        assert_eq!(VirtualFileSystem::normalize("/a/"), "/a");
    }

    #[test]
    fn normalize_leading_dotdot_has_no_parent_to_pop() {
        assert_eq!(VirtualFileSystem::normalize("/../a"), "/a");
    }

    struct FakeMount {
        files: std::collections::HashMap<String, Vec<u8>>,
    }

    impl MountPoint for FakeMount {
        fn read_file(&self, relative_path: &str) -> Option<Vec<u8>> {
            self.files.get(relative_path).cloned()
        }
        fn file_exists(&self, relative_path: &str) -> bool {
            self.files.contains_key(relative_path)
        }
        fn find_files(&self, directory: &str, _pattern: &str) -> Vec<String> {
            self.files
                .keys()
                .filter(|k| k.starts_with(directory))
                .cloned()
                .collect()
        }
        fn get_file_info(&self, relative_path: &str) -> Option<FileInfo> {
            self.files.get(relative_path).map(|data| FileInfo {
                size_bytes: data.len() as u64,
                is_folder: false,
            })
        }
    }

    #[test]
    fn first_mounted_wins() {
        let mut vfs = VirtualFileSystem::new();
        let mut base = std::collections::HashMap::new();
        base.insert("/units/tank.bp".to_string(), b"base".to_vec());
        let mut patch = std::collections::HashMap::new();
        patch.insert("/units/tank.bp".to_string(), b"patched".to_vec());

        vfs.mount("/", Box::new(FakeMount { files: patch }));
        vfs.mount("/", Box::new(FakeMount { files: base }));

        assert_eq!(vfs.read_file("/units/tank.bp").unwrap(), b"patched".to_vec());
    }

    #[test]
    fn mount_prefix_reconstructs_virtual_path() {
        let mut vfs = VirtualFileSystem::new();
        let mut files = std::collections::HashMap::new();
        files.insert("/tank.bp".to_string(), b"x".to_vec());
        vfs.mount("/units", Box::new(FakeMount { files }));

        assert!(vfs.file_exists("/units/tank.bp"));
        assert!(!vfs.file_exists("/tank.bp"));
    }
}
