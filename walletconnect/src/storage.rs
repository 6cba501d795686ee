//! Key-value store backing the persisted hardware-tx error flag
use crate::constants::LEDGER_STORAGE_ID;
use crate::errors::{AppError, AppResult};
use mockall::automock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[automock]
pub trait KeyValueStore {
    fn get_bool(&self, key: &str) -> AppResult<Option<bool>>;
    fn set_bool(&mut self, key: &str, value: bool) -> AppResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_bool(&self, key: &str) -> AppResult<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn set_bool(&mut self, key: &str, value: bool) -> AppResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON object file, one file per store id.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file for the ledger store id inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{LEDGER_STORAGE_ID}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> AppResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_bool(&self, key: &str) -> AppResult<Option<bool>> {
        Ok(self.load()?.get(key).and_then(Value::as_bool))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> AppResult<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::Bool(value));

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&Value::Object(map))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
