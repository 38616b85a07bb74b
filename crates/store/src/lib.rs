//! ssUSD Store - state access for module keepers
//!
//! Modules keep all state in a byte-keyed `KvStore`. Each module owns a
//! `StoreKey` namespace; entity keys are a one-byte type prefix followed by a
//! big-endian numeric id or a raw string. Values are JSON.
//!
//! A `Context` bundles the store with the current block header and collects
//! emitted events. Message execution runs against a `CacheStore` branch that
//! is committed only when the message succeeds.

pub mod cache;
pub mod context;
pub mod error;
pub mod keys;
pub mod kv;

pub use cache::CacheStore;
pub use context::{BlockHeader, Context};
pub use error::StoreError;
pub use keys::StoreKey;
pub use kv::{KvStore, MemStore};
