//! Execution context handed to keepers

use crate::error::StoreError;
use crate::kv::KvStore;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ssusd_core::Event;

/// Height and time of the block being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockHeader {
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }

    /// UTC calendar day of the block, `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.time.format("%Y-%m-%d").to_string()
    }
}

/// Store access, block header and event sink for one unit of execution
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    header: BlockHeader,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            header,
            events: Vec::new(),
        }
    }

    pub fn header(&self) -> BlockHeader {
        self.header
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn block_time(&self) -> DateTime<Utc> {
        self.header.time
    }

    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        self.store
            .get(key)
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(StoreError::from)
    }

    pub fn set<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key, bytes);
        Ok(())
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.store.delete(key);
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.store.has(key)
    }

    /// Decode every value under `prefix`, in key order
    pub fn scan<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>, StoreError> {
        self.store
            .prefix_scan(prefix)
            .into_iter()
            .map(|(key, bytes)| -> Result<(Vec<u8>, T), StoreError> {
                Ok((key, serde_json::from_slice(&bytes)?))
            })
            .collect()
    }

    /// Decode every value under `prefix`, dropping keys
    pub fn scan_values<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>, StoreError> {
        Ok(self.scan(prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn emit(&mut self, event: Event) {
        tracing::trace!(event = event.kind(), height = self.header.height, "event emitted");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
