//! # Thread Ledger
//!
//! Content-addressed transactions, a small stack-based script language and
//! the virtual machine that evaluates it.
//!
//! Beyond plain value transfer, outputs can carry hashed assets and the
//! identity root/head pattern: an immutable root id anchoring a sequence of
//! head records, each committing to the root and its current script.
//!
//! ## Architecture
//!
//! - conversions, address: codecs, hashing and secp256k1 keys
//! - opcode, script, vm: the script language and its evaluator
//! - output, input, transaction, validator: the ledger records and their rules
//! - store, query: persistence boundary and output queries
//!
//! ## Usage
//!
//! ```rust
//! use thread_ledger::{Ledger, MemoryStore, Output, Script, Transaction};
//!
//! let mut ledger = Ledger::new(MemoryStore::new());
//! let output = Output::with_value(1000, Script::default()).unwrap();
//! let mut transaction = Transaction::new(vec![], vec![output]);
//! let uid = ledger.submit(&mut transaction).unwrap();
//! assert_eq!(transaction.uid(), Some(uid));
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod conversions;
pub mod address;
pub mod opcode;
pub mod script;
pub mod vm;
pub mod output;
pub mod input;
pub mod transaction;
pub mod validator;
pub mod store;
pub mod query;
pub mod config;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{LedgerError, Result};
pub use address::Address;
pub use config::LedgerConfig;
pub use input::Input;
pub use opcode::Opcode;
pub use output::{Output, OutputType, Payload};
pub use query::OutputFilter;
pub use script::{Script, Step};
pub use store::{MemoryStore, TransactionRecord, TransactionStore};
pub use transaction::Transaction;
pub use vm::VirtualMachine;

use error::{InputError, ScriptError, StoreError};

/// A store plus the configuration that governs it
///
/// # Examples
///
/// ```
/// use thread_ledger::{Address, Input, Ledger, MemoryStore, Output, Script, Transaction};
///
/// let mut ledger = Ledger::new(MemoryStore::new());
/// let owner = Address::generate();
///
/// // Fund the owner
/// let lock = Script::pay_to_public_key_hash(&owner.public_key_hash());
/// let mut funding = Transaction::new(vec![], vec![Output::with_value(50, lock).unwrap()]);
/// let funding_uid = ledger.publish(&mut funding).unwrap();
///
/// // Spend it with a signature over the funding uid
/// let signature = owner.sign(&funding_uid).unwrap();
/// let unlock = Script::new(vec![signature.into(), owner.public_key().to_vec().into()]);
/// let input = Input::new(funding_uid.to_vec(), 0, unlock);
/// let mut spend = Transaction::new(vec![input], vec![Output::with_value(50, Script::default()).unwrap()]);
///
/// assert!(ledger.verify_input(&spend, 0).unwrap());
/// ledger.publish(&mut spend).unwrap();
/// assert_eq!(ledger.unspent_outputs().unwrap().len(), 1);
/// ```
pub struct Ledger<S: TransactionStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: TransactionStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Base58 address of `address` on the configured network
    pub fn address_for(&self, address: &Address) -> String {
        conversions::encode_base58_bytes(&address.public_address(self.config.network_id))
    }

    /// Validate and save
    pub fn submit(&mut self, transaction: &mut Transaction) -> Result<TransactionId> {
        self.check_policy(transaction)?;
        transaction.validate()?;
        transaction.save(&mut self.store)
    }

    /// Validate, save and release the outputs the inputs reference
    pub fn publish(&mut self, transaction: &mut Transaction) -> Result<TransactionId> {
        self.check_policy(transaction)?;
        transaction.validate()?;
        transaction.publish(&mut self.store)
    }

    pub fn transaction(&self, uid: &TransactionId) -> Result<Option<Transaction>> {
        match self.store.find_by_uid(uid)? {
            Some(record) => Ok(Some(Transaction::from_record(&record)?)),
            None => Ok(None),
        }
    }

    pub fn transaction_count(&self) -> Result<usize> {
        Ok(self.store.count()?)
    }

    pub fn outputs(&self, filter: &OutputFilter) -> Result<Vec<Output>> {
        query::filter_outputs(&self.store, filter)
    }

    pub fn unspent_outputs(&self) -> Result<Vec<Output>> {
        query::unspent_outputs(&self.store)
    }

    /// Run input `index`'s unlocking script followed by the locking script
    /// of the output it references.
    ///
    /// The machine is bound to the referenced transaction and output, so
    /// signatures are checked against the referenced transaction's uid.
    pub fn verify_input(&self, transaction: &Transaction, index: usize) -> Result<bool> {
        let input = transaction
            .inputs()
            .get(index)
            .ok_or(InputError::MissingUtxo)?;
        let previous_uid = input
            .transaction_id()
            .ok_or(InputError::InvalidUtxo(input.referenced_transaction_id.len()))?;
        let previous = self
            .transaction(&previous_uid)?
            .ok_or_else(|| StoreError::NotFound(conversions::bytes_to_hex(&previous_uid)))?;
        let output = match previous.outputs().get(usize::from(input.referenced_output_index)) {
            Some(output) => output,
            None => return Ok(false),
        };

        let mut vm = VirtualMachine::with_transaction(previous_uid, input.referenced_output_index);
        if !input.script.run(&mut vm)? {
            return Ok(false);
        }
        Ok(output.script().run(&mut vm)?)
    }

    fn check_policy(&self, transaction: &Transaction) -> Result<()> {
        let scripts = transaction
            .inputs()
            .iter()
            .map(|input| &input.script)
            .chain(transaction.outputs().iter().map(Output::script));
        for script in scripts {
            let length = script.serialize_body()?.len();
            if length > self.config.max_script_length {
                return Err(ScriptError::ScriptTooLong(length).into());
            }
        }
        Ok(())
    }
}
