//! A [`MountPoint`] backed by a real filesystem directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::mount::{filename_matches_suffix, glob_suffix, FileInfo, MountPoint};

/// Mounts a directory on disk as a region of the virtual filesystem.
pub struct DirectoryMount {
    root: PathBuf,
}

impl DirectoryMount {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative_path: &str) -> PathBuf {
        let trimmed = relative_path.strip_prefix('/').unwrap_or(relative_path);
        self.root.join(trimmed)
    }

    /// Walks `dir` recursively, invoking `visit` on each regular file found.
    /// `resolve`/`find_files` only ever need a listing, not an iterator, so
    /// this collects directly rather than exposing an intermediate type.
    fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                Self::walk(&path, visit);
            } else if file_type.is_file() {
                visit(&path);
            }
        }
    }
}

impl MountPoint for DirectoryMount {
    fn read_file(&self, relative_path: &str) -> Option<Vec<u8>> {
        fs::read(self.resolve(relative_path)).ok()
    }

    fn file_exists(&self, relative_path: &str) -> bool {
        self.resolve(relative_path).exists()
    }

    fn find_files(&self, directory: &str, pattern: &str) -> Vec<String> {
        let dir_path = self.resolve(directory);
        if !dir_path.is_dir() {
            return Vec::new();
        }

        let suffix = glob_suffix(pattern);
        let mut results = Vec::new();
        Self::walk(&dir_path, &mut |path| {
            let filename_lower = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !filename_matches_suffix(&filename_lower, &suffix) {
                return;
            }
            if let Ok(rel) = path.strip_prefix(&self.root) {
                let virtual_path = format!("/{}", rel.to_string_lossy().replace('\\', "/"));
                results.push(virtual_path.to_lowercase());
            }
        });
        results
    }

    fn get_file_info(&self, relative_path: &str) -> Option<FileInfo> {
        let full_path = self.resolve(relative_path);
        let meta = fs::metadata(&full_path).ok()?;
        Some(FileInfo {
            is_folder: meta.is_dir(),
            size_bytes: if meta.is_dir() { 0 } else { meta.len() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, rel: &str, contents: &[u8]) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::File::create(path).unwrap().write_all(contents).unwrap();
    }

    #[test]
    fn reads_and_lists_files() {
        let tmp = std::env::temp_dir().join(format!("supcom_core_vfs_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        write_temp(&tmp, "units/tank.bp", b"hello");
        write_temp(&tmp, "units/nested/turret.bp", b"world");
        write_temp(&tmp, "readme.txt", b"ignore me");

        let mount = DirectoryMount::new(&tmp);
        assert_eq!(mount.read_file("/units/tank.bp").as_deref(), Some(&b"hello"[..]));
        assert!(mount.file_exists("units/tank.bp"));
        assert!(!mount.file_exists("units/missing.bp"));

        let mut found = mount.find_files("/units", "*.bp");
        found.sort();
        assert_eq!(found, vec!["/units/nested/turret.bp", "/units/tank.bp"]);

        let info = mount.get_file_info("units/tank.bp").unwrap();
        assert!(!info.is_folder);
        assert_eq!(info.size_bytes, 5);

        fs::remove_dir_all(&tmp).ok();
    }
}
