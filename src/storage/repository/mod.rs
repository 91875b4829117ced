// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the keyed store.
//!
//! [`RecordRepository`] maintains one logical collection per entity kind:
//! JSON-encoded records under `{kind}_{id}` keys plus an ordered namespace
//! index under `__index_{kind}`. The `*_in` functions operate inside a caller's
//! write transaction so several repositories can change together.

use std::fmt::Display;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use super::keyed_store::{KeyedStore, ReadView, StoreError, WriteTxn};
use super::keys::{counter_key, index_key, record_key};

pub mod analysis;
pub mod industries;
pub mod reports;
pub mod requests;

pub use analysis::AnalysisResult;
pub use industries::IndustryRiskBucket;
pub use reports::{DecryptedReport, FinancialReport, ReportStatus, RiskClassification};
pub use requests::{DecryptionRequest, RequestState, Subject};

/// A persisted entity kind.
pub trait Record: Serialize + DeserializeOwned {
    /// Key prefix and index namespace for this kind.
    const KIND: &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored payload does not match the expected schema.
    #[error("failed to decode record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Decode a JSON payload; an empty payload means the key is absent.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, payload: &[u8]) -> RepoResult<Option<T>> {
    if payload.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(payload)
        .map(Some)
        .map_err(|source| RepoError::Decode {
            key: key.to_string(),
            source,
        })
}

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> RepoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|source| RepoError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Read a JSON value stored under a reserved or auxiliary key.
pub(crate) fn load_value<T: DeserializeOwned, R: ReadView + ?Sized>(
    view: &R,
    key: &str,
) -> RepoResult<Option<T>> {
    decode(key, &view.get(key)?)
}

pub(crate) fn store_value<T: Serialize, W: WriteTxn + ?Sized>(
    txn: &mut W,
    key: &str,
    value: &T,
) -> RepoResult<()> {
    txn.put(key, &encode(key, value)?)?;
    Ok(())
}

/// Typed collection of one entity kind.
pub struct RecordRepository<'a, T> {
    store: &'a dyn KeyedStore,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Record> RecordRepository<'a, T> {
    /// Create a new repository view over `store`.
    pub fn new(store: &'a dyn KeyedStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Key of the record with the given id.
    pub fn key(id: impl Display) -> String {
        record_key(T::KIND, id)
    }

    /// Allocate the next id, build the entity, write it and index it, all in
    /// one transaction.
    pub fn append(&self, build: impl FnOnce(u64) -> T) -> RepoResult<(String, T)> {
        let mut txn = self.store.begin_write()?;
        let appended = Self::append_in(txn.as_mut(), build)?;
        txn.commit()?;
        Ok(appended)
    }

    /// [`append`](Self::append) inside an existing transaction.
    ///
    /// The entity record is written before the index, so the index never
    /// names a key that does not exist.
    pub fn append_in<W: WriteTxn + ?Sized>(
        txn: &mut W,
        build: impl FnOnce(u64) -> T,
    ) -> RepoResult<(String, T)> {
        let id = Self::next_id_in(txn)?;
        let entity = build(id);
        let key = Self::key(id);
        Self::write_and_index(txn, &key, &entity)?;
        Ok((key, entity))
    }

    /// Write an entity under a caller-chosen key suffix and index it.
    /// Indexing is idempotent: a key already in the index is not added again.
    pub fn insert_in<W: WriteTxn + ?Sized>(
        txn: &mut W,
        suffix: impl Display,
        entity: &T,
    ) -> RepoResult<String> {
        let key = Self::key(suffix);
        Self::write_and_index(txn, &key, entity)?;
        Ok(key)
    }

    /// Overwrite a record without touching the index.
    pub fn put_in<W: WriteTxn + ?Sized>(txn: &mut W, key: &str, entity: &T) -> RepoResult<()> {
        store_value(txn, key, entity)
    }

    /// Read a record through any view (store or open transaction).
    pub fn load<R: ReadView + ?Sized>(view: &R, key: &str) -> RepoResult<Option<T>> {
        load_value(view, key)
    }

    /// Get a record by key. `Ok(None)` if absent, `Err(Decode)` if corrupted.
    pub fn get(&self, key: &str) -> RepoResult<Option<T>> {
        Self::load(self.store, key)
    }

    /// Get a record by id.
    pub fn get_id(&self, id: impl Display) -> RepoResult<Option<T>> {
        self.get(&Self::key(id))
    }

    /// All indexed keys in insertion order.
    pub fn list_keys(&self) -> RepoResult<Vec<String>> {
        Self::keys_in(self.store)
    }

    pub fn keys_in<R: ReadView + ?Sized>(view: &R) -> RepoResult<Vec<String>> {
        Ok(load_value(view, &index_key(T::KIND))?.unwrap_or_default())
    }

    /// All indexed records in insertion order.
    ///
    /// Best effort: keys that no longer resolve or fail to decode are logged
    /// and skipped.
    pub fn list_all(&self) -> RepoResult<Vec<T>> {
        let keys = self.list_keys()?;
        let mut records = Vec::with_capacity(keys.len());

        for key in &keys {
            match self.get(key) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    tracing::warn!(kind = T::KIND, key = %key, "Indexed record is missing, skipping");
                }
                Err(e) => {
                    tracing::warn!(kind = T::KIND, key = %key, error = %e, "Skipping undecodable record");
                }
            }
        }

        Ok(records)
    }

    fn next_id_in<W: WriteTxn + ?Sized>(txn: &mut W) -> RepoResult<u64> {
        let key = counter_key(T::KIND);
        let next = load_value::<u64, _>(&*txn, &key)?.unwrap_or(0) + 1;
        store_value(txn, &key, &next)?;
        Ok(next)
    }

    fn write_and_index<W: WriteTxn + ?Sized>(txn: &mut W, key: &str, entity: &T) -> RepoResult<()> {
        store_value(txn, key, entity)?;

        let index = index_key(T::KIND);
        let mut keys: Vec<String> = load_value(&*txn, &index)?.unwrap_or_default();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            store_value(txn, &index, &keys)?;
        }
        Ok(())
    }
}
