// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process keyed store used by tests and the `memory` backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};

use super::keyed_store::{KeyedStore, ReadView, StoreError, StoreResult, WriteTxn};

/// Keyed store kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadView for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(key).cloned().unwrap_or_default())
    }
}

impl KeyedStore for InMemoryStore {
    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>> {
        let guard = self.records.write().map_err(|_| StoreError::Poisoned)?;
        Ok(Box::new(MemoryTxn {
            guard,
            staged: HashMap::new(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Holds the write lock for its whole lifetime; staged writes are applied on
/// commit and discarded on drop.
struct MemoryTxn<'a> {
    guard: RwLockWriteGuard<'a, HashMap<String, Vec<u8>>>,
    staged: HashMap<String, Vec<u8>>,
}

impl ReadView for MemoryTxn<'_> {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        if let Some(value) = self.staged.get(key) {
            return Ok(value.clone());
        }
        Ok(self.guard.get(key).cloned().unwrap_or_default())
    }
}

impl WriteTxn for MemoryTxn<'_> {
    fn put(&mut self, key: &str, payload: &[u8]) -> StoreResult<()> {
        self.staged.insert(key.to_string(), payload.to_vec());
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTxn { mut guard, staged } = *self;
        guard.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_empty() {
        let store = InMemoryStore::new();
        assert!(store.get("missing").unwrap().is_empty());
    }

    #[test]
    fn put_overwrites() {
        let store = InMemoryStore::new();
        KeyedStore::put(&store, "k", b"one").unwrap();
        KeyedStore::put(&store, "k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        {
            let mut txn = store.begin_write().unwrap();
            txn.put("entity", b"payload").unwrap();
            assert_eq!(txn.get("entity").unwrap(), b"payload");
        }
        assert!(store.get("entity").unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn committed_transaction_applies_all_writes() {
        let store = InMemoryStore::new();
        let mut txn = store.begin_write().unwrap();
        txn.put("a", b"1").unwrap();
        txn.put("b", b"2").unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get("a").unwrap(), b"1");
        assert_eq!(store.get("b").unwrap(), b"2");
    }
}
