/*
 * This module provides utility functions for locating the application's
 * on-device directories. The configuration directory holds view preferences
 * and the log file; the data directory holds the persisted list collection.
 * Both are derived from `directories::ProjectDirs` and created on demand.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/*
 * Ensures that `path` exists as a directory, creating it (and its parents)
 * if necessary. Returns the path on success, `None` if creation failed.
 */
pub fn ensure_dir(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        if let Err(e) = fs::create_dir_all(path) {
            log::error!("PathUtils: Failed to create directory {path:?}: {e}");
            return None;
        }
        log::debug!("PathUtils: Created directory: {path:?}");
    } else {
        log::trace!("PathUtils: Directory already exists: {path:?}");
    }
    Some(path.to_path_buf())
}

/*
 * Retrieves the application's local configuration directory.
 * The path is derived without an organization qualifier, placing it directly
 * under the user's local configuration area (e.g. `~/.config/<app_name>` on
 * Linux, `AppData/Local/<app_name>/config` on Windows).
 *
 * Returns `None` if the platform has no home directory or the directory
 * could not be created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| ensure_dir(proj_dirs.config_local_dir()))
}

/*
 * Retrieves the application's local data directory, where the serialized
 * list collection is stored.
 */
pub fn get_base_app_data_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app data local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| ensure_dir(proj_dirs.data_local_dir()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_creates_nested_directories() {
        // Arrange
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b").join("c");
        assert!(!nested.exists());

        // Act
        let result = ensure_dir(&nested);

        // Assert
        assert_eq!(result.as_deref(), Some(nested.as_path()));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_returns_existing_directory() {
        let root = tempdir().unwrap();
        let first = ensure_dir(root.path()).expect("existing dir should be accepted");
        let second = ensure_dir(root.path()).expect("second call should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_dir_fails_when_path_is_a_file() {
        let root = tempdir().unwrap();
        let file_path = root.path().join("not_a_dir");
        fs::write(&file_path, b"x").unwrap();

        assert!(ensure_dir(&file_path.join("child")).is_none());
    }

    #[test]
    fn test_get_base_app_config_local_dir_contains_app_name() {
        // ProjectDirs depends on the environment; only verify when a home is available.
        let unique_app_name = format!("TestApp_PathUtils_{}", rand::random::<u64>());
        if let Some(path) = get_base_app_config_local_dir(&unique_app_name) {
            assert!(path.is_dir());
            assert!(
                path.to_string_lossy()
                    .to_lowercase()
                    .contains(&unique_app_name.to_lowercase()),
                "Path should contain the app name. Path: {path:?}"
            );
            if let Some(proj_dirs) = ProjectDirs::from("", "", &unique_app_name) {
                let _ = fs::remove_dir_all(proj_dirs.config_local_dir());
            }
        }
    }
}
