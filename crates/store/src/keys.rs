//! Key layout helpers
//!
//! `<namespace>/<prefix byte><suffix>` where the suffix is a big-endian `u64`
//! for numeric ids (so prefix scans iterate in id order) or raw UTF-8.

use crate::error::StoreError;

/// Module namespace inside the shared store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreKey(&'static str);

impl StoreKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    /// Key of a singleton entry, also the scan prefix for a collection
    pub fn key(&self, prefix: u8) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.0.len() + 2);
        key.extend_from_slice(self.0.as_bytes());
        key.push(b'/');
        key.push(prefix);
        key
    }

    pub fn id_key(&self, prefix: u8, id: u64) -> Vec<u8> {
        let mut key = self.key(prefix);
        key.extend_from_slice(&id.to_be_bytes());
        key
    }

    pub fn str_key(&self, prefix: u8, suffix: &str) -> Vec<u8> {
        let mut key = self.key(prefix);
        key.extend_from_slice(suffix.as_bytes());
        key
    }

    /// Recover the numeric id from a key built by `id_key`
    pub fn parse_id(&self, prefix: u8, key: &[u8]) -> Result<u64, StoreError> {
        let head = self.key(prefix);
        let tail = key
            .strip_prefix(head.as_slice())
            .ok_or_else(|| StoreError::CorruptKey(hex::encode(key)))?;
        let bytes: [u8; 8] = tail
            .try_into()
            .map_err(|_| StoreError::CorruptKey(hex::encode(key)))?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Recover the string suffix from a key built by `str_key`
    pub fn parse_str(&self, prefix: u8, key: &[u8]) -> Result<String, StoreError> {
        let head = self.key(prefix);
        let tail = key
            .strip_prefix(head.as_slice())
            .ok_or_else(|| StoreError::CorruptKey(hex::encode(key)))?;
        String::from_utf8(tail.to_vec()).map_err(|_| StoreError::CorruptKey(hex::encode(key)))
    }
}
