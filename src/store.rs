//! Persistence boundary for transactions.
//!
//! The ledger consumes a document store through [`TransactionStore`]. Records
//! carry the serialized bytes plus the mutable spend-tracking state.
//! [`MemoryStore`] is an in-process implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conversions::bytes_to_hex;
use crate::error::StoreError;
use crate::types::TransactionId;

/// Persisted form of a saved transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub uid: TransactionId,
    pub blob: Vec<u8>,
    pub published: bool,
    /// output index -> uid of the transaction that spent it
    pub released_outputs: BTreeMap<u16, TransactionId>,
}

impl TransactionRecord {
    pub fn is_released(&self, index: u16) -> bool {
        self.released_outputs.contains_key(&index)
    }
}

pub trait TransactionStore {
    /// Create the record, or replace the one stored under the same uid.
    ///
    /// An existing record keeps its `released_outputs`; only
    /// [`mark_output_spent`](Self::mark_output_spent) writes them.
    fn insert(&mut self, record: TransactionRecord) -> Result<(), StoreError>;

    fn find_by_uid(&self, uid: &TransactionId) -> Result<Option<TransactionRecord>, StoreError>;

    fn find_by_uids(&self, uids: &[TransactionId]) -> Result<Vec<TransactionRecord>, StoreError>;

    fn find_all(&self) -> Result<Vec<TransactionRecord>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Record `spender` as the consumer of output `index` of transaction `uid`.
    ///
    /// This bypasses validation and overwrites any earlier spender at that index.
    fn mark_output_spent(&mut self, uid: &TransactionId, index: u16, spender: TransactionId) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<TransactionId, TransactionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryStore {
    fn insert(&mut self, mut record: TransactionRecord) -> Result<(), StoreError> {
        if let Some(existing) = self.records.get_mut(&record.uid) {
            record.released_outputs = std::mem::take(&mut existing.released_outputs);
        }
        self.records.insert(record.uid, record);
        Ok(())
    }

    fn find_by_uid(&self, uid: &TransactionId) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.records.get(uid).cloned())
    }

    fn find_by_uids(&self, uids: &[TransactionId]) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .records
            .values()
            .filter(|record| uids.contains(&record.uid))
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }

    fn mark_output_spent(&mut self, uid: &TransactionId, index: u16, spender: TransactionId) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(uid)
            .ok_or_else(|| StoreError::NotFound(bytes_to_hex(uid)))?;
        if let Some(previous) = record.released_outputs.insert(index, spender) {
            if previous != spender {
                tracing::warn!(
                    transaction = %bytes_to_hex(uid),
                    index,
                    previous = %bytes_to_hex(&previous),
                    spender = %bytes_to_hex(&spender),
                    "overwriting spent output"
                );
            }
        }
        Ok(())
    }
}
