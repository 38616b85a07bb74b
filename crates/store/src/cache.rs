//! Cache branch over a parent store
//!
//! Writes are buffered and only reach the parent on `commit`. Dropping the
//! branch discards them.

use crate::kv::KvStore;
use std::collections::BTreeMap;

pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    /// `None` marks a buffered delete
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flush buffered writes into the parent
    pub fn commit(self) {
        for (key, value) in self.writes {
            match value {
                Some(value) => self.parent.set(&key, value),
                None => self.parent.delete(&key),
            }
        }
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix).into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;

    #[test]
    fn test_reads_see_buffered_writes() {
        let mut parent = MemStore::new();
        parent.set(b"k1", b"old".to_vec());

        let mut cache = CacheStore::new(&mut parent);
        cache.set(b"k1", b"new".to_vec());
        cache.set(b"k2", b"added".to_vec());

        assert_eq!(cache.get(b"k1"), Some(b"new".to_vec()));
        assert_eq!(cache.get(b"k2"), Some(b"added".to_vec()));
        assert_eq!(cache.pending(), 2);
    }

    #[test]
    fn test_drop_discards() {
        let mut parent = MemStore::new();
        parent.set(b"k1", b"old".to_vec());
        {
            let mut cache = CacheStore::new(&mut parent);
            cache.set(b"k1", b"new".to_vec());
            cache.delete(b"k1");
        }
        assert_eq!(parent.get(b"k1"), Some(b"old".to_vec()));
    }

    #[test]
    fn test_commit_applies_writes_and_deletes() {
        let mut parent = MemStore::new();
        parent.set(b"gone", b"x".to_vec());

        let mut cache = CacheStore::new(&mut parent);
        cache.delete(b"gone");
        cache.set(b"kept", b"y".to_vec());
        cache.commit();

        assert!(parent.get(b"gone").is_none());
        assert_eq!(parent.get(b"kept"), Some(b"y".to_vec()));
    }

    #[test]
    fn test_prefix_scan_merges_overlay() {
        let mut parent = MemStore::new();
        parent.set(b"p/1", b"a".to_vec());
        parent.set(b"p/2", b"b".to_vec());

        let mut cache = CacheStore::new(&mut parent);
        cache.delete(b"p/1");
        cache.set(b"p/3", b"c".to_vec());
        cache.set(b"q/1", b"z".to_vec());

        let keys: Vec<Vec<u8>> = cache.prefix_scan(b"p/").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"p/2".to_vec(), b"p/3".to_vec()]);
    }
}
