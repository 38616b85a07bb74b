//! Key-value store trait and the in-memory implementation

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Ordered byte-keyed storage
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// All entries whose key starts with `prefix`, in ascending key order
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// In-memory ordered store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// One snapshot line: hex key and hex value
#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    value: String,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write every entry as a JSON line to `path`, replacing the file
    pub fn write_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        for (key, value) in &self.data {
            let entry = SnapshotEntry {
                key: hex::encode(key),
                value: hex::encode(value),
            };
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }

        writer.flush()?;
        tracing::debug!(entries = self.data.len(), path = %path.as_ref().display(), "store snapshot written");
        Ok(())
    }

    /// Rebuild a store from a snapshot written by `write_snapshot`
    pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut store = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SnapshotEntry = serde_json::from_str(&line)?;
            let decode = |field: &str| {
                hex::decode(field).map_err(|e| StoreError::InvalidSnapshot {
                    line: idx + 1,
                    reason: e.to_string(),
                })
            };
            store.data.insert(decode(&entry.key)?, decode(&entry.value)?);
        }

        Ok(store)
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.data.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
