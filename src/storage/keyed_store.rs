// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opaque key → payload storage contract.
//!
//! Every record in the service is a `(key, payload)` pair. Keys are plain
//! strings, payloads are opaque bytes whose encoding belongs to the caller.
//! A key that was never written reads back as an empty payload; telling
//! "empty" apart from "absent" is the caller's job.
//!
//! Mutations go through a scoped [`WriteTxn`]. A transaction that is dropped
//! without [`WriteTxn::commit`] leaves the store untouched, so an entity write
//! and the index update that accompanies it either both land or neither does.
//!
//! There is no delete: keys are overwritten, never reclaimed.

/// Error type for keyed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access shared by the store itself and by open write transactions.
pub trait ReadView {
    /// Read the payload stored under `key`, or an empty payload if the key
    /// was never written.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
}

/// A scoped write transaction.
///
/// Reads observe the transaction's own uncommitted writes.
pub trait WriteTxn: ReadView {
    /// Stage an unconditional overwrite of `key`.
    fn put(&mut self, key: &str, payload: &[u8]) -> StoreResult<()>;

    /// Make every staged write durable.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Persistent mapping from string keys to byte payloads.
pub trait KeyedStore: ReadView + Send + Sync {
    /// Open a write transaction. Writers are serialized: a second caller
    /// blocks until the first transaction commits or is dropped.
    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>>;

    /// Write a single key in its own transaction.
    fn put(&self, key: &str, payload: &[u8]) -> StoreResult<()> {
        let mut txn = self.begin_write()?;
        txn.put(key, payload)?;
        txn.commit()
    }

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}
