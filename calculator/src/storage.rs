/*
 * Copyright (c) 2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

//! Key-value persistence of history, memory and theme.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::data_dir;
use crate::keypad::{Theme, HISTORY_LIMIT};

pub const THEME_KEY: &str = "calculator-theme";
pub const HISTORY_KEY: &str = "calculatorHistory";
pub const MEMORY_KEY: &str = "calculatorMemory";

const STORAGE_DIR_NAME: &str = "storage";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not access storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode value: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("There is no data directory on this platform")]
    NoDataDir,
}

/// A string key-value store. Values are opaque serialized strings.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Keeps values for the lifetime of the process only
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage(HashMap<String, String>);

impl MemoryStorage {
    pub fn new() -> MemoryStorage { MemoryStorage::default() }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.0.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Stores every key in its own file inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> FileStorage {
        FileStorage { dir: dir.into() }
    }

    /// `<data dir>/tricalc/storage`
    pub fn open_default() -> Result<FileStorage, StorageError> {
        let dir = data_dir().ok_or(StorageError::NoDataDir)?;
        Ok(FileStorage::new(dir.join(STORAGE_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path(&self, key: &str) -> PathBuf { self.dir.join(key) }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// Values read from storage at startup
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Persisted {
    /// `None` if no theme was ever stored
    pub theme: Option<Theme>,
    pub history: Vec<String>,
    pub memory: f64,
}

fn read<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let value = match storage.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read \"{key}\" from storage: {e}");
            return None;
        }
    };

    match serde_json::from_str(&value) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse \"{key}\" from storage: {e}");
            None
        }
    }
}

pub fn write<T: Serialize + ?Sized>(storage: &mut dyn Storage, key: &str, value: &T) -> Result<(), StorageError> {
    let value = serde_json::to_string(value)?;
    storage.set(key, &value)?;
    debug!("Stored \"{key}\"");
    Ok(())
}

/// Reads all persisted values. Missing or corrupt values fall back to their defaults.
pub fn load(storage: &dyn Storage) -> Persisted {
    let mut history: Vec<String> = read(storage, HISTORY_KEY).unwrap_or_default();
    history.truncate(HISTORY_LIMIT);

    Persisted {
        theme: read(storage, THEME_KEY),
        history,
        memory: read::<f64>(storage, MEMORY_KEY).filter(|m| m.is_finite()).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_storage() {
        assert_eq!(load(&MemoryStorage::new()), Persisted::default());
    }

    #[test]
    fn values_are_json() -> Result<(), StorageError> {
        let mut storage = MemoryStorage::new();
        write(&mut storage, THEME_KEY, &Theme::Dark)?;
        write(&mut storage, MEMORY_KEY, &12.5)?;
        write(&mut storage, HISTORY_KEY, &["1 + 1 = 2"])?;

        assert_eq!(storage.get(THEME_KEY)?.as_deref(), Some("\"dark\""));
        assert_eq!(storage.get(MEMORY_KEY)?.as_deref(), Some("12.5"));
        assert_eq!(storage.get(HISTORY_KEY)?.as_deref(), Some("[\"1 + 1 = 2\"]"));

        assert_eq!(load(&storage), Persisted {
            theme: Some(Theme::Dark),
            history: vec!["1 + 1 = 2".to_owned()],
            memory: 12.5,
        });
        Ok(())
    }

    #[test]
    fn corrupt_values_are_ignored() -> Result<(), StorageError> {
        let mut storage = MemoryStorage::new();
        storage.set(THEME_KEY, "\"sepia\"")?;
        storage.set(MEMORY_KEY, "{")?;
        storage.set(HISTORY_KEY, "42")?;

        assert_eq!(load(&storage), Persisted::default());
        Ok(())
    }

    #[test]
    fn history_is_bounded_on_load() -> Result<(), StorageError> {
        let mut storage = MemoryStorage::new();
        let history = (0..30).map(|i| format!("{i} + 0 = {i}")).collect::<Vec<_>>();
        write(&mut storage, HISTORY_KEY, &history)?;

        let persisted = load(&storage);
        assert_eq!(persisted.history.len(), HISTORY_LIMIT);
        assert_eq!(persisted.history[0], "0 + 0 = 0");
        Ok(())
    }

    #[test]
    fn file_storage() -> Result<(), StorageError> {
        let dir = std::env::temp_dir().join(format!("tricalc-storage-{}", std::process::id()));
        let mut storage = FileStorage::new(&dir);

        assert_eq!(storage.get(MEMORY_KEY)?, None);
        write(&mut storage, MEMORY_KEY, &-3.0)?;
        write(&mut storage, MEMORY_KEY, &4.0)?;

        let reopened = FileStorage::new(&dir);
        assert_eq!(load(&reopened).memory, 4.0);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }
}
