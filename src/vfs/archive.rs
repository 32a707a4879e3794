//! A [`MountPoint`] backed by a ZIP archive (`.scd`, `.nx2`, `.zip`).
//!
//! The original engine shells out to `minizip`; this port uses the `zip`
//! crate for the same job. The central directory is read once at mount time
//! and indexed by normalized key, matching `ZipMount`'s constructor.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use super::mount::{filename_matches_suffix, glob_suffix, FileInfo, MountPoint};

struct ArchiveEntry {
    original_name: String,
    uncompressed_size: u64,
}

/// Mounts a ZIP archive as a region of the virtual filesystem. The archive
/// handle is reopened per read (via a `Mutex`-guarded `ZipArchive`) since
/// `zip::ZipArchive::by_name` requires `&mut self`.
pub struct ArchiveMount {
    archive: Mutex<zip::ZipArchive<File>>,
    entries: HashMap<String, ArchiveEntry>,
}

impl ArchiveMount {
    pub fn open(archive_path: &Path) -> std::io::Result<Self> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut entries = HashMap::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                continue;
            }
            entries.insert(
                Self::normalize_key(&name),
                ArchiveEntry {
                    original_name: name,
                    uncompressed_size: entry.size(),
                },
            );
        }

        Ok(Self {
            archive: Mutex::new(archive),
            entries,
        })
    }

    /// Normalize a path for lookup (lowercase, forward slashes, strip leading `/`).
    fn normalize_key(path: &str) -> String {
        let forward = path.replace('\\', "/");
        let lower = forward.to_lowercase();
        lower.strip_prefix('/').unwrap_or(&lower).to_string()
    }
}

impl MountPoint for ArchiveMount {
    fn read_file(&self, relative_path: &str) -> Option<Vec<u8>> {
        let key = Self::normalize_key(relative_path);
        let entry = self.entries.get(&key)?;

        let mut archive = self.archive.lock().ok()?;
        let mut zip_entry = archive.by_name(&entry.original_name).ok()?;
        let mut buffer = Vec::with_capacity(entry.uncompressed_size as usize);
        zip_entry.read_to_end(&mut buffer).ok()?;
        if buffer.len() as u64 != entry.uncompressed_size {
            return None;
        }
        Some(buffer)
    }

    fn file_exists(&self, relative_path: &str) -> bool {
        self.entries.contains_key(&Self::normalize_key(relative_path))
    }

    fn find_files(&self, directory: &str, pattern: &str) -> Vec<String> {
        let mut dir_key = Self::normalize_key(directory);
        if !dir_key.is_empty() && !dir_key.ends_with('/') {
            dir_key.push('/');
        }
        let suffix = glob_suffix(pattern);

        let mut results = Vec::new();
        for key in self.entries.keys() {
            if !dir_key.is_empty() && !key.starts_with(&dir_key) {
                continue;
            }
            if filename_matches_suffix(key, &suffix) {
                results.push(format!("/{key}"));
            }
        }
        results
    }

    fn get_file_info(&self, relative_path: &str) -> Option<FileInfo> {
        let entry = self.entries.get(&Self::normalize_key(relative_path))?;
        Some(FileInfo {
            size_bytes: entry.uncompressed_size,
            is_folder: false,
        })
    }
}
