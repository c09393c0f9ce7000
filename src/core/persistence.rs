/*
 * This module is responsible for persisting the full list collection. The
 * storage model is a single serialized blob under one fixed key; callers load
 * it once at startup and overwrite it after every change.
 *
 * It includes a trait for blob operations (`ListPersistenceOperations`) to
 * facilitate testing and dependency injection, a concrete file-backed
 * implementation (`FileBlobStore`) and the (de)serialization helpers that turn
 * the blob into `RestockList` values and back. Timestamps travel as RFC 3339
 * text inside the blob and are reconstituted on load.
 */
use super::models::RestockList;
use super::path_utils;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const STORAGE_KEY: &str = "gulu-lists";
const BLOB_FILE_EXTENSION: &str = "json";

#[derive(Debug)]
pub enum PersistenceError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoDataDirectory,
}

impl From<io::Error> for PersistenceError {
    fn from(err: io::Error) -> Self {
        PersistenceError::Io(err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serde(err)
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "Storage I/O error: {e}"),
            PersistenceError::Serde(e) => write!(f, "Stored list data is malformed: {e}"),
            PersistenceError::NoDataDirectory => {
                write!(f, "Could not determine a data directory for list storage")
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            PersistenceError::Serde(e) => Some(e),
            PersistenceError::NoDataDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/*
 * Key-value blob storage for the serialized list collection. `load` returns
 * `Ok(None)` when nothing has been stored yet.
 */
pub trait ListPersistenceOperations: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, blob: &str) -> Result<()>;
}

pub fn serialize_lists(lists: &[RestockList]) -> Result<String> {
    Ok(serde_json::to_string(lists)?)
}

pub fn deserialize_lists(blob: &str) -> Result<Vec<RestockList>> {
    Ok(serde_json::from_str(blob)?)
}

/*
 * Stores the blob as `<dir>/<key>.json`. Saves write a sibling temp file and
 * rename it over the target so a crash mid-write never leaves a truncated blob.
 */
pub struct FileBlobStore {
    dir: PathBuf,
    key: String,
}

impl FileBlobStore {
    pub fn new(dir: PathBuf, key: &str) -> Self {
        FileBlobStore {
            dir,
            key: key.to_string(),
        }
    }

    /* Uses the platform data directory for `app_name` and the fixed storage key. */
    pub fn in_app_data_dir(app_name: &str) -> Result<Self> {
        let dir = path_utils::get_base_app_data_local_dir(app_name)
            .ok_or(PersistenceError::NoDataDirectory)?;
        Ok(FileBlobStore::new(dir, STORAGE_KEY))
    }

    pub fn blob_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{BLOB_FILE_EXTENSION}", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{BLOB_FILE_EXTENSION}.tmp", self.key))
    }

    fn ensure_dir(dir: &Path) -> Result<()> {
        path_utils::ensure_dir(dir)
            .map(|_| ())
            .ok_or(PersistenceError::NoDataDirectory)
    }
}

impl ListPersistenceOperations for FileBlobStore {
    fn load(&self) -> Result<Option<String>> {
        let file_path = self.blob_path();
        log::trace!("FileBlobStore: Loading blob from {file_path:?}");
        if !file_path.exists() {
            log::debug!("FileBlobStore: No stored blob at {file_path:?}.");
            return Ok(None);
        }

        let mut file = File::open(&file_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            log::debug!("FileBlobStore: Stored blob at {file_path:?} is empty.");
            return Ok(None);
        }
        log::debug!(
            "FileBlobStore: Loaded {} bytes from {file_path:?}.",
            contents.len()
        );
        Ok(Some(contents))
    }

    fn save(&self, blob: &str) -> Result<()> {
        Self::ensure_dir(&self.dir)?;
        let temp_path = self.temp_path();
        let file_path = self.blob_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(blob.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &file_path)?;
        log::trace!(
            "FileBlobStore: Saved {} bytes to {file_path:?}.",
            blob.len()
        );
        Ok(())
    }
}

/*
 * In-memory blob store used by unit tests throughout the crate. Counts saves
 * so tests can observe the write-through behaviour and can be switched into a
 * failing mode.
 */
#[cfg(test)]
pub struct InMemoryBlobStore {
    blob: std::sync::Mutex<Option<String>>,
    save_count: std::sync::Mutex<usize>,
    fail_saves: std::sync::Mutex<bool>,
}

#[cfg(test)]
impl InMemoryBlobStore {
    pub fn new() -> Self {
        InMemoryBlobStore {
            blob: std::sync::Mutex::new(None),
            save_count: std::sync::Mutex::new(0),
            fail_saves: std::sync::Mutex::new(false),
        }
    }

    pub fn with_blob(blob: &str) -> Self {
        let store = Self::new();
        *store.blob.lock().unwrap() = Some(blob.to_string());
        store
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }
}

#[cfg(test)]
impl ListPersistenceOperations for InMemoryBlobStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.blob.lock().unwrap().clone())
    }

    fn save(&self, blob: &str) -> Result<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(PersistenceError::Io(io::Error::other("mocked save failure")));
        }
        *self.blob.lock().unwrap() = Some(blob.to_string());
        *self.save_count.lock().unwrap() += 1;
        Ok(())
    }
}
