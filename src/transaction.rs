//! Transactions: validation, identity, persistence and publication
//!
//! Wire layout:
//!
//! ```text
//! u16 input count | inputs | u16 output count | outputs
//! ```
//!
//! A transaction's uid is RIPEMD-160 of its serialized bytes, recomputed on
//! every save. Publishing marks every output the inputs reference
//! as spent by this transaction.

use std::collections::BTreeMap;

use crate::conversions::{bytes_to_hex, ripemd160};
use crate::error::{InputError, Result, StoreError, TransactionError};
use crate::input::Input;
use crate::output::Output;
use crate::store::{TransactionRecord, TransactionStore};
use crate::types::TransactionId;
use crate::validator::TransactionValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Validation {
    #[default]
    Pending,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    published: bool,
    released_outputs: BTreeMap<u16, TransactionId>,
    uid: Option<TransactionId>,
    blob: Option<Vec<u8>>,
    validation: Validation,
}

fn count_prefix(kind: &'static str, count: usize) -> std::result::Result<[u8; 2], TransactionError> {
    u16::try_from(count)
        .map(u16::to_be_bytes)
        .map_err(|_| TransactionError::TooMany { kind, count })
}

fn read_count(data: &[u8], offset: usize) -> std::result::Result<usize, TransactionError> {
    match data.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as usize),
        None => Err(TransactionError::Truncated {
            expected: offset + 2,
            found: data.len(),
        }),
    }
}

impl Transaction {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        Self {
            inputs,
            outputs,
            ..Self::default()
        }
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Appending invalidates any earlier validation result and saved identity
    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
        self.reset();
    }

    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
        self.reset();
    }

    fn reset(&mut self) {
        self.validation = Validation::Pending;
        self.uid = None;
        self.blob = None;
        self.released_outputs.clear();
    }

    /// Set once the transaction has been saved
    pub fn uid(&self) -> Option<TransactionId> {
        self.uid
    }

    pub fn uid_hex(&self) -> Option<String> {
        self.uid.map(|uid| bytes_to_hex(&uid))
    }

    /// Serialized bytes as of the last save
    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Output index -> uid of the transaction that spent it
    pub fn released_outputs(&self) -> &BTreeMap<u16, TransactionId> {
        &self.released_outputs
    }

    pub fn is_output_spent(&self, index: u16) -> bool {
        self.released_outputs.contains_key(&index)
    }

    pub fn serialize(&self) -> std::result::Result<Vec<u8>, TransactionError> {
        let mut out = count_prefix("inputs", self.inputs.len())?.to_vec();
        for input in &self.inputs {
            out.extend_from_slice(&input.serialize()?);
        }
        out.extend_from_slice(&count_prefix("outputs", self.outputs.len())?);
        for output in &self.outputs {
            out.extend_from_slice(&output.serialize()?);
        }
        Ok(out)
    }

    /// Decode a complete transaction. The result is unvalidated and unsaved.
    pub fn deserialize(data: &[u8]) -> std::result::Result<Transaction, TransactionError> {
        let mut offset = 0;

        let input_count = read_count(data, offset)?;
        offset += 2;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let (input, consumed) = Input::deserialize(&data[offset..])?;
            inputs.push(input);
            offset += consumed;
        }

        let output_count = read_count(data, offset)?;
        offset += 2;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let (output, consumed) = Output::deserialize(&data[offset..])?;
            outputs.push(output);
            offset += consumed;
        }

        if offset != data.len() {
            return Err(TransactionError::TrailingBytes(data.len() - offset));
        }

        Ok(Transaction::new(inputs, outputs))
    }

    pub fn calculate_uid(bytes: &[u8]) -> TransactionId {
        ripemd160(bytes)
    }

    /// Run structural validation and record the outcome.
    ///
    /// Errors propagate after the transaction is marked invalid.
    pub fn validate(&mut self) -> std::result::Result<(), TransactionError> {
        let outcome = TransactionValidator::new(self).validate();
        match outcome {
            Ok(()) => {
                self.validation = Validation::Valid;
                Ok(())
            }
            Err(e) => {
                self.validation = Validation::Invalid;
                tracing::debug!(error = %e, "transaction failed validation");
                Err(e)
            }
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validation != Validation::Pending
    }

    pub fn is_valid(&self) -> std::result::Result<bool, TransactionError> {
        match self.validation {
            Validation::Pending => Err(TransactionError::NotValidated),
            Validation::Valid => Ok(true),
            Validation::Invalid => Ok(false),
        }
    }

    /// Persist a validated transaction under the hash of its current bytes.
    ///
    /// Released outputs are owned by the store: a re-save picks up the
    /// stored spend marks and never writes its own. A stored publication
    /// is never withdrawn.
    pub fn save<S: TransactionStore + ?Sized>(&mut self, store: &mut S) -> Result<TransactionId> {
        if !self.is_valid()? {
            return Err(TransactionError::Invalid.into());
        }

        let blob = self.serialize()?;
        let uid = Self::calculate_uid(&blob);
        let (published, released_outputs) = match store.find_by_uid(&uid)? {
            Some(existing) => (existing.published || self.published, existing.released_outputs),
            None => (self.published, BTreeMap::new()),
        };

        store.insert(TransactionRecord {
            uid,
            blob: blob.clone(),
            published,
            released_outputs: released_outputs.clone(),
        })?;
        self.published = published;
        self.uid = Some(uid);
        self.blob = Some(blob);
        self.released_outputs = released_outputs;

        tracing::info!(
            uid = %bytes_to_hex(&uid),
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            published = self.published,
            "transaction saved"
        );
        Ok(uid)
    }

    /// Save as published, then release every output this transaction's
    /// inputs reference.
    ///
    /// Every referenced transaction is resolved first; a missing one fails
    /// with `NotFound` before anything is written.
    pub fn publish<S: TransactionStore + ?Sized>(&mut self, store: &mut S) -> Result<TransactionId> {
        if !self.is_valid()? {
            return Err(TransactionError::Invalid.into());
        }

        let mut releases = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let previous = input.transaction_id().ok_or(InputError::InvalidUtxo(
                input.referenced_transaction_id.len(),
            ))?;
            if store.find_by_uid(&previous)?.is_none() {
                return Err(StoreError::NotFound(bytes_to_hex(&previous)).into());
            }
            releases.push((previous, input.referenced_output_index));
        }

        let was_published = self.published;
        self.published = true;
        let uid = match self.save(store) {
            Ok(uid) => uid,
            Err(e) => {
                self.published = was_published;
                return Err(e);
            }
        };

        for (previous, index) in releases {
            store.mark_output_spent(&previous, index, uid)?;
            tracing::debug!(
                previous = %bytes_to_hex(&previous),
                index,
                spender = %bytes_to_hex(&uid),
                "output released"
            );
        }

        tracing::info!(uid = %bytes_to_hex(&uid), "transaction published");
        Ok(uid)
    }

    /// Persisted form; `None` until the transaction has been saved
    pub fn to_record(&self) -> Option<TransactionRecord> {
        Some(TransactionRecord {
            uid: self.uid?,
            blob: self.blob.clone()?,
            published: self.published,
            released_outputs: self.released_outputs.clone(),
        })
    }

    /// Restore a saved transaction. Outputs are stamped with the owning
    /// uid and, where released, the spending uid.
    pub fn from_record(record: &TransactionRecord) -> std::result::Result<Transaction, TransactionError> {
        let mut transaction = Transaction::deserialize(&record.blob)?;
        for (index, output) in transaction.outputs.iter_mut().enumerate() {
            output.set_owning_transaction_id(Some(record.uid));
            let spender = u16::try_from(index)
                .ok()
                .and_then(|index| record.released_outputs.get(&index).copied());
            output.set_spending_transaction_id(spender);
        }
        transaction.uid = Some(record.uid);
        transaction.blob = Some(record.blob.clone());
        transaction.published = record.published;
        transaction.released_outputs = record.released_outputs.clone();
        transaction.validation = Validation::Valid;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::hex_to_bytes;
    use crate::error::LedgerError;
    use crate::opcode::Opcode;
    use crate::script::{Script, Step};
    use crate::store::MemoryStore;

    fn verify_script() -> Script {
        Script::new(vec![Step::Op(Opcode::Verify)])
    }

    fn value_output(value: u64) -> Output {
        Output::with_value(value, verify_script()).unwrap()
    }

    fn saved(store: &mut MemoryStore, value: u64) -> Transaction {
        let mut tx = Transaction::new(vec![], vec![value_output(value)]);
        tx.validate().unwrap();
        tx.save(store).unwrap();
        tx
    }

    #[test]
    fn test_empty_transaction() {
        let mut tx = Transaction::default();
        assert_eq!(bytes_to_hex(&tx.serialize().unwrap()), "00000000");
        assert!(!tx.is_validated());
        assert_eq!(tx.is_valid(), Err(TransactionError::NotValidated));

        assert_eq!(tx.validate(), Err(TransactionError::MissingOutput));
        assert!(tx.is_validated());
        assert_eq!(tx.is_valid(), Ok(false));
    }

    #[test]
    fn test_serialize_output_only() {
        let tx = Transaction::new(vec![], vec![value_output(14)]);
        assert_eq!(bytes_to_hex(&tx.serialize().unwrap()), "000000010000000e000169");
    }

    #[test]
    fn test_serialize_with_input() {
        let id = ripemd160(b"fake_id");
        let input = Input::new(id.to_vec(), 0, Script::new(vec![Step::Push(b"xyz".to_vec())]));
        let output = Output::with_value(1, Script::new(vec![Step::Push(b"ZYX".to_vec())])).unwrap();
        let tx = Transaction::new(vec![input], vec![output]);

        let expected = format!(
            "0001{}0000000403{}000100000001000403{}",
            bytes_to_hex(&id),
            bytes_to_hex(b"xyz"),
            bytes_to_hex(b"ZYX")
        );
        assert_eq!(bytes_to_hex(&tx.serialize().unwrap()), expected);
    }

    #[test]
    fn test_deserialize() {
        let bytes = hex_to_bytes("000000010000000e000169").unwrap();
        let tx = Transaction::deserialize(&bytes).unwrap();
        assert!(tx.inputs().is_empty());
        assert_eq!(tx.outputs(), &[value_output(14)]);
        assert!(!tx.is_validated());
        assert_eq!(tx.uid(), None);
    }

    #[test]
    fn test_deserialize_trailing_bytes() {
        let bytes = hex_to_bytes("000000010000000e00016900").unwrap();
        assert_eq!(Transaction::deserialize(&bytes), Err(TransactionError::TrailingBytes(1)));
    }

    #[test]
    fn test_deserialize_truncated() {
        assert!(matches!(
            Transaction::deserialize(&[0x00]),
            Err(TransactionError::Truncated { .. })
        ));
        assert!(Transaction::deserialize(&hex_to_bytes("000000010000000e00").unwrap()).is_err());
    }

    #[test]
    fn test_mutation_resets_validation() {
        let mut tx = Transaction::new(vec![], vec![value_output(1)]);
        tx.validate().unwrap();
        tx.add_output(value_output(2));
        assert!(!tx.is_validated());
    }

    #[test]
    fn test_save_requires_validation() {
        let mut store = MemoryStore::new();
        let mut tx = Transaction::new(vec![], vec![value_output(1)]);
        assert_eq!(
            tx.save(&mut store),
            Err(LedgerError::Transaction(TransactionError::NotValidated))
        );

        let mut empty = Transaction::default();
        let _ = empty.validate();
        assert_eq!(
            empty.save(&mut store),
            Err(LedgerError::Transaction(TransactionError::Invalid))
        );
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_save_sets_uid() {
        let mut store = MemoryStore::new();
        let tx = saved(&mut store, 14);
        let expected = ripemd160(&hex_to_bytes("000000010000000e000169").unwrap());
        assert_eq!(tx.uid(), Some(expected));
        assert_eq!(tx.blob(), Some(&hex_to_bytes("000000010000000e000169").unwrap()[..]));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_resave_after_mutation() {
        let mut store = MemoryStore::new();
        let mut tx = saved(&mut store, 14);
        let first_uid = tx.uid().unwrap();

        tx.add_output(value_output(15));
        assert_eq!(tx.uid(), None);
        tx.validate().unwrap();
        let second_uid = tx.save(&mut store).unwrap();

        let bytes = tx.serialize().unwrap();
        assert_ne!(second_uid, first_uid);
        assert_eq!(second_uid, Transaction::calculate_uid(&bytes));
        assert_eq!(tx.blob(), Some(bytes.as_slice()));

        let record = store.find_by_uid(&second_uid).unwrap().unwrap();
        assert_eq!(Transaction::from_record(&record).unwrap().outputs().len(), 2);
    }

    #[test]
    fn test_uid_is_deterministic() {
        let mut first = MemoryStore::new();
        let mut second = MemoryStore::new();
        assert_eq!(saved(&mut first, 5).uid(), saved(&mut second, 5).uid());
        assert_ne!(saved(&mut first, 5).uid(), saved(&mut first, 6).uid());
    }

    #[test]
    fn test_publish_releases_outputs() {
        let mut store = MemoryStore::new();
        let funding = saved(&mut store, 10);
        let funding_uid = funding.uid().unwrap();

        let input = Input::new(funding_uid.to_vec(), 0, Script::default());
        let mut spend = Transaction::new(vec![input], vec![value_output(10)]);
        spend.validate().unwrap();
        let spend_uid = spend.publish(&mut store).unwrap();

        assert!(spend.is_published());
        let record = store.find_by_uid(&funding_uid).unwrap().unwrap();
        assert_eq!(record.released_outputs.get(&0), Some(&spend_uid));
        assert!(store.find_by_uid(&spend_uid).unwrap().unwrap().published);
    }

    #[test]
    fn test_publish_missing_previous() {
        let mut store = MemoryStore::new();
        let input = Input::new(ripemd160(b"nowhere").to_vec(), 0, Script::default());
        let mut tx = Transaction::new(vec![input], vec![value_output(1)]);
        tx.validate().unwrap();
        assert!(matches!(
            tx.publish(&mut store),
            Err(LedgerError::Store(StoreError::NotFound(_)))
        ));
        assert!(!tx.is_published());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_publish_dangling_input_writes_nothing() {
        let mut store = MemoryStore::new();
        let funding = saved(&mut store, 10);
        let funding_uid = funding.uid().unwrap();

        let good = Input::new(funding_uid.to_vec(), 0, Script::default());
        let dangling = Input::new(ripemd160(b"nowhere").to_vec(), 0, Script::default());
        let mut spend = Transaction::new(vec![good, dangling], vec![value_output(10)]);
        spend.validate().unwrap();

        assert!(matches!(
            spend.publish(&mut store),
            Err(LedgerError::Store(StoreError::NotFound(_)))
        ));
        assert!(!spend.is_published());
        assert_eq!(spend.uid(), None);
        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.find_by_uid(&funding_uid).unwrap().unwrap().is_released(0));
    }

    #[test]
    fn test_republish_keeps_spend_marks() {
        let mut store = MemoryStore::new();
        let mut funding = saved(&mut store, 10);
        let funding_uid = funding.uid().unwrap();

        let input = Input::new(funding_uid.to_vec(), 0, Script::default());
        let mut spend = Transaction::new(vec![input], vec![value_output(10)]);
        spend.validate().unwrap();
        let spend_uid = spend.publish(&mut store).unwrap();

        // the in-memory funding transaction has not seen the spend
        assert!(!funding.is_output_spent(0));
        assert_eq!(funding.publish(&mut store).unwrap(), funding_uid);

        let record = store.find_by_uid(&funding_uid).unwrap().unwrap();
        assert!(record.published);
        assert_eq!(record.released_outputs.get(&0), Some(&spend_uid));
        assert_eq!(funding.released_outputs().get(&0), Some(&spend_uid));
    }

    #[test]
    fn test_save_never_withdraws_publication() {
        let mut store = MemoryStore::new();
        let mut published = Transaction::new(vec![], vec![value_output(3)]);
        published.validate().unwrap();
        let uid = published.publish(&mut store).unwrap();

        let mut copy = Transaction::new(vec![], vec![value_output(3)]);
        copy.validate().unwrap();
        assert_eq!(copy.save(&mut store).unwrap(), uid);
        assert!(copy.is_published());
        assert!(store.find_by_uid(&uid).unwrap().unwrap().published);
    }

    #[test]
    fn test_record_round_trip() {
        let mut store = MemoryStore::new();
        let funding = saved(&mut store, 10);
        let funding_uid = funding.uid().unwrap();
        store.mark_output_spent(&funding_uid, 0, [3; 20]).unwrap();

        let record = store.find_by_uid(&funding_uid).unwrap().unwrap();
        let restored = Transaction::from_record(&record).unwrap();
        assert_eq!(restored.uid(), Some(funding_uid));
        assert_eq!(restored.is_valid(), Ok(true));
        assert!(restored.is_output_spent(0));
        assert_eq!(restored.outputs()[0].owning_transaction_id(), Some(&funding_uid));
        assert_eq!(restored.outputs()[0].spending_transaction_id(), Some(&[3; 20]));
        assert_eq!(restored.to_record(), Some(record));
    }

    #[test]
    fn test_unsaved_has_no_record() {
        assert_eq!(Transaction::new(vec![], vec![value_output(1)]).to_record(), None);
    }
}
