/*
 * Manages application-specific configuration settings: the view preferences
 * (sort keys and sort orders for the list overview and the product view)
 * that persist between sessions. This module defines how these settings are
 * persisted and retrieved, abstracting the underlying storage mechanism
 * (a JSON file in the user's local configuration directory).
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) to allow for
 * different storage backends or mock implementations for testing. The primary
 * concrete implementation (`CoreConfigManager`) resolves its directory through
 * `path_utils`, or uses an explicit base directory when one is given.
 */
use crate::core::path_utils;
use crate::core::query::{ListQuery, ListSortKey, ProductQuery, ProductSortKey, SortOrder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

const VIEW_PREFERENCES_FILENAME: &str = "view_preferences.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoProjectDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration file format error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine directory for configuration")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/*
 * Sort preferences remembered across sessions. Defaults match a fresh
 * install: lists newest first, products by name A-Z.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPreferences {
    pub list_sort_by: ListSortKey,
    pub list_sort_order: SortOrder,
    pub product_sort_by: ProductSortKey,
    pub product_sort_order: SortOrder,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        ViewPreferences {
            list_sort_by: ListSortKey::CreatedAt,
            list_sort_order: SortOrder::Descending,
            product_sort_by: ProductSortKey::Name,
            product_sort_order: SortOrder::Ascending,
        }
    }
}

impl ViewPreferences {
    pub fn list_query(&self, search: &str) -> ListQuery {
        ListQuery {
            search: search.to_string(),
            sort_by: self.list_sort_by,
            order: self.list_sort_order,
        }
    }

    pub fn product_query(&self, search: &str, category: Option<String>) -> ProductQuery {
        ProductQuery {
            search: search.to_string(),
            category,
            sort_by: self.product_sort_by,
            order: self.product_sort_order,
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_view_preferences(&self, app_name: &str) -> Result<ViewPreferences>;
    fn save_view_preferences(&self, app_name: &str, preferences: &ViewPreferences) -> Result<()>;
}

pub struct CoreConfigManager {
    base_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            base_dir_override: None,
        }
    }

    /* Stores configuration under `dir` instead of the platform config directory. */
    pub fn with_base_dir(dir: PathBuf) -> Self {
        CoreConfigManager {
            base_dir_override: Some(dir),
        }
    }

    fn config_dir(&self, app_name: &str) -> Result<PathBuf> {
        let dir = match &self.base_dir_override {
            Some(dir) => path_utils::ensure_dir(dir),
            None => path_utils::get_base_app_config_local_dir(app_name),
        };
        dir.ok_or(ConfigError::NoProjectDirectory)
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the view preferences for a given application. A missing file
     * yields the defaults; unknown or missing keys inside the file fall back
     * to their default values individually.
     */
    fn load_view_preferences(&self, app_name: &str) -> Result<ViewPreferences> {
        log::trace!("CoreConfigManager: Loading view preferences for app '{app_name}'");
        let file_path = self.config_dir(app_name)?.join(VIEW_PREFERENCES_FILENAME);

        if !file_path.exists() {
            log::debug!("CoreConfigManager: Preferences file {file_path:?} does not exist.");
            return Ok(ViewPreferences::default());
        }

        let file = File::open(&file_path)?;
        let preferences: ViewPreferences = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("CoreConfigManager: Loaded view preferences {preferences:?} from {file_path:?}.");
        Ok(preferences)
    }

    fn save_view_preferences(&self, app_name: &str, preferences: &ViewPreferences) -> Result<()> {
        log::trace!("CoreConfigManager: Saving view preferences for app '{app_name}'");
        let file_path = self.config_dir(app_name)?.join(VIEW_PREFERENCES_FILENAME);

        let file = File::create(&file_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), preferences)?;
        log::debug!("CoreConfigManager: Saved view preferences to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const APP_NAME: &str = "AnyApp";

    #[test]
    fn test_load_view_preferences_defaults_when_missing() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_base_dir(dir.path().to_path_buf());

        // Act
        let preferences = manager.load_view_preferences(APP_NAME).unwrap();

        // Assert
        assert_eq!(preferences, ViewPreferences::default());
        assert_eq!(preferences.list_sort_by, ListSortKey::CreatedAt);
        assert_eq!(preferences.list_sort_order, SortOrder::Descending);
    }

    #[test]
    fn test_save_and_load_view_preferences() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_base_dir(dir.path().join("config"));
        let preferences = ViewPreferences {
            list_sort_by: ListSortKey::Name,
            list_sort_order: SortOrder::Ascending,
            product_sort_by: ProductSortKey::Category,
            product_sort_order: SortOrder::Descending,
        };

        // Act
        manager.save_view_preferences(APP_NAME, &preferences).unwrap();
        let loaded = manager.load_view_preferences(APP_NAME).unwrap();

        // Assert
        assert_eq!(loaded, preferences);
    }

    #[test]
    fn test_partial_preferences_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(VIEW_PREFERENCES_FILENAME),
            r#"{"product_sort_by":"quantity"}"#,
        )
        .unwrap();
        let manager = CoreConfigManager::with_base_dir(dir.path().to_path_buf());

        let loaded = manager.load_view_preferences(APP_NAME).unwrap();

        assert_eq!(loaded.product_sort_by, ProductSortKey::Quantity);
        assert_eq!(loaded.list_sort_by, ListSortKey::CreatedAt);
        assert_eq!(loaded.product_sort_order, SortOrder::Ascending);
    }

    #[test]
    fn test_malformed_preferences_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(VIEW_PREFERENCES_FILENAME), "not json").unwrap();
        let manager = CoreConfigManager::with_base_dir(dir.path().to_path_buf());

        match manager.load_view_preferences(APP_NAME) {
            Err(ConfigError::Serde(_)) => {}
            other => panic!("Expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn test_preferences_build_queries() {
        let preferences = ViewPreferences {
            product_sort_by: ProductSortKey::Stock,
            ..ViewPreferences::default()
        };
        let list_query = preferences.list_query("dairy");
        assert_eq!(list_query.search, "dairy");
        assert_eq!(list_query.sort_by, ListSortKey::CreatedAt);

        let product_query = preferences.product_query("milk", Some("Dairy".to_string()));
        assert_eq!(product_query.sort_by, ProductSortKey::Stock);
        assert_eq!(product_query.category.as_deref(), Some("Dairy"));
    }
}
