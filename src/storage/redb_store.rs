// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded keyed store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `records`: key → payload bytes
//!
//! Namespace indexes, counters and correlation slots are ordinary records in
//! the same table under reserved `__` keys, so they commit in the same redb
//! write transaction as the entity they describe.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::keyed_store::{KeyedStore, ReadView, StoreResult, WriteTxn};

/// The single table holding every record.
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Keyed store persisted to a redb database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened redb record store");
        Ok(Self { db })
    }
}

impl ReadView for RedbStore {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(key)? {
            Some(value) => Ok(value.value().to_vec()),
            None => Ok(Vec::new()),
        }
    }
}

impl KeyedStore for RedbStore {
    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>> {
        let txn = self.db.begin_write()?;
        Ok(Box::new(RedbTxn { txn }))
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}

/// redb aborts a `WriteTransaction` that is dropped without commit.
struct RedbTxn {
    txn: WriteTransaction,
}

impl ReadView for RedbTxn {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let table = self.txn.open_table(RECORDS)?;
        let value = match table.get(key)? {
            Some(value) => value.value().to_vec(),
            None => Vec::new(),
        };
        Ok(value)
    }
}

impl WriteTxn for RedbTxn {
    fn put(&mut self, key: &str, payload: &[u8]) -> StoreResult<()> {
        let mut table = self.txn.open_table(RECORDS)?;
        table.insert(key, payload)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("records.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn put_and_get() {
        let (store, _dir) = temp_store();
        KeyedStore::put(&store, "report_1", b"{}").unwrap();
        assert_eq!(store.get("report_1").unwrap(), b"{}");
        assert!(store.get("report_2").unwrap().is_empty());
    }

    #[test]
    fn uncommitted_transaction_is_discarded() {
        let (store, _dir) = temp_store();
        {
            let mut txn = store.begin_write().unwrap();
            txn.put("report_1", b"payload").unwrap();
            assert_eq!(txn.get("report_1").unwrap(), b"payload");
        }
        assert!(store.get("report_1").unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            let mut txn = store.begin_write().unwrap();
            txn.put("__index_report", b"[\"report_1\"]").unwrap();
            txn.put("report_1", b"{}").unwrap();
            txn.commit().unwrap();
        }

        let reopened = RedbStore::open(&path).unwrap();
        assert_eq!(reopened.get("report_1").unwrap(), b"{}");
        assert_eq!(reopened.get("__index_report").unwrap(), b"[\"report_1\"]");
    }
}
