use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MontageError, Result};

/// Allocate a unique file path under `dir`, creating the directory if needed.
///
/// Names follow the `{prefix}{12-hex}{extension}` convention so concurrent
/// operations never collide.
pub fn scratch_path(dir: &Path, prefix: &str, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let unique = &Uuid::new_v4().simple().to_string()[..12];
    Ok(dir.join(format!("{}{}{}", prefix, unique, extension)))
}

/// Allocate a unique directory under `dir` and create it.
pub fn scratch_dir(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let unique = &Uuid::new_v4().simple().to_string()[..8];
    let path = dir.join(format!("{}{}", prefix, unique));
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Remove a file if it exists. Best-effort; failures are logged, never raised.
pub fn cleanup_file<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(_) => debug!("Cleaned up: {}", path.display()),
            Err(e) => warn!("Failed to cleanup {}: {}", path.display(), e),
        }
    }
}

/// Validate a file extension against an allowed list.
///
/// Returns the lowercase extension (with dot) on success.
pub fn validate_extension(path: &Path, allowed: &[String]) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .ok_or_else(|| MontageError::Validation("File has no extension".to_string()))?;

    if !allowed.iter().any(|a| a == &ext) {
        return Err(MontageError::UnsupportedFormat(format!(
            "File type '{}' not allowed. Allowed types: {}",
            ext,
            allowed.join(", ")
        )));
    }

    Ok(ext)
}

/// Set of intermediate files owned by one multi-step operation.
///
/// Every registered path is removed when the set is dropped, so cleanup
/// happens on success, failure and early-return paths alike.
#[derive(Debug, Default)]
pub struct ScratchSet {
    paths: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl ScratchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file for cleanup and hand the path back.
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Register a directory for recursive cleanup.
    pub fn track_dir(&mut self, path: PathBuf) -> PathBuf {
        self.dirs.push(path.clone());
        path
    }

    /// Stop tracking a path, keeping it past the drop. For intermediates
    /// that become the operation's deliverable on success.
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
        self.dirs.retain(|p| p != path);
    }
}

impl Drop for ScratchSet {
    fn drop(&mut self) {
        for path in &self.paths {
            cleanup_file(path);
        }
        for dir in &self.dirs {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!("Failed to cleanup directory {}: {}", dir.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scratch_path_is_unique() {
        let dir = tempdir().unwrap();
        let a = scratch_path(dir.path(), "seg_", ".mp4").unwrap();
        let b = scratch_path(dir.path(), "seg_", ".mp4").unwrap();
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("seg_"));
        assert!(a.extension().unwrap() == "mp4");
    }

    #[test]
    fn test_validate_extension() {
        let allowed = vec![".mp4".to_string(), ".mov".to_string()];
        let ext = validate_extension(Path::new("clip.MP4"), &allowed).unwrap();
        assert_eq!(ext, ".mp4");

        assert!(matches!(
            validate_extension(Path::new("clip.txt"), &allowed),
            Err(MontageError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            validate_extension(Path::new("noext"), &allowed),
            Err(MontageError::Validation(_))
        ));
    }

    #[test]
    fn test_scratch_set_removes_tracked_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("intermediate.mp4");
        std::fs::write(&file, b"data").unwrap();

        {
            let mut scratch = ScratchSet::new();
            scratch.track(file.clone());
        }

        assert!(!file.exists());
    }

    #[test]
    fn test_scratch_set_release_keeps_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("kept.mp4");
        let sub = dir.path().join("kept_dir");
        std::fs::write(&file, b"data").unwrap();
        std::fs::create_dir(&sub).unwrap();

        {
            let mut scratch = ScratchSet::new();
            scratch.track(file.clone());
            scratch.track_dir(sub.clone());
            scratch.release(&file);
            scratch.release(&sub);
        }

        assert!(file.exists());
        assert!(sub.exists());
    }

    #[test]
    fn test_cleanup_file_missing_is_silent() {
        cleanup_file(Path::new("/nonexistent/never-there.mp4"));
    }
}
