//! Key-value backends for the result cache: a local-storage equivalent with a
//! byte quota. `MemoryStore` lives for the process; `FileStore` persists to one
//! JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Browsers typically allow ~5 MiB per origin.
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage quota exceeded: need {needed} bytes, capacity {capacity}")]
    QuotaExceeded { needed: usize, capacity: usize },

    #[error("storage io: {0}")]
    Io(#[from] io::Error),
}

/// String-keyed storage. Single logical writer; implementations only need to be
/// safe to share, not to order concurrent writers.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}

/// Insert into `map` if the result fits in `capacity`; the map is untouched on error.
fn checked_insert(
    map: &mut BTreeMap<String, String>,
    key: &str,
    value: String,
    capacity: usize,
) -> Result<(), StoreError> {
    let current: usize = map.iter().map(|(k, v)| entry_size(k, v)).sum();
    let replaced = map.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
    let needed = current - replaced + entry_size(key, &value);
    if needed > capacity {
        return Err(StoreError::QuotaExceeded { needed, capacity });
    }
    map.insert(key.to_string(), value);
    Ok(())
}

#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_BYTES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        checked_insert(&mut lock(&self.entries), key, value, self.capacity)
    }

    fn remove(&self, key: &str) {
        lock(&self.entries).remove(key);
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }
}

/// Whole store kept as one JSON object on disk. Loaded on first access; every
/// mutation rewrites the file via temp file + rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    capacity: usize,
    entries: OnceCell<Mutex<BTreeMap<String, String>>>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, capacity: usize) -> Self {
        Self {
            path: dir.as_ref().join("store.json"),
            capacity,
            entries: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> &Mutex<BTreeMap<String, String>> {
        self.entries.get_or_init(|| Mutex::new(load_entries(&self.path)))
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec(map).map_err(io::Error::other)?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&json)?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(target: "cache", error = %e, path = %path.display(), "store unreadable, starting empty");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(target: "cache", error = %e, path = %path.display(), "store corrupt, starting empty");
        BTreeMap::new()
    })
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(self.entries()).get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut map = lock(self.entries());
        let previous = map.get(key).cloned();
        checked_insert(&mut map, key, value, self.capacity)?;
        if let Err(e) = self.persist(&map) {
            // Memory never holds what the disk does not.
            match previous {
                Some(v) => map.insert(key.to_string(), v),
                None => map.remove(key),
            };
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        let mut map = lock(self.entries());
        if map.remove(key).is_some() {
            if let Err(e) = self.persist(&map) {
                tracing::warn!(target: "cache", error = %e, "failed to persist removal");
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        lock(self.entries()).keys().cloned().collect()
    }
}
