//! Output queries over stored transactions.
//!
//! Every query decodes the stored records and scans the resulting outputs.
//! Returned outputs carry their owning transaction id and, when released,
//! the id of the transaction that spent them.

use crate::conversions::decode_base58_bytes;
use crate::error::{ConversionError, Result};
use crate::output::{Output, OutputType};
use crate::store::TransactionStore;
use crate::transaction::Transaction;
use crate::types::ByteString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Value,
    Asset,
}

/// Conjunctive output filter; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFilter {
    unspent_only: bool,
    output_type: Option<OutputType>,
    kind: Option<OutputKind>,
    addresses: Vec<ByteString>,
}

impl OutputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unspent(mut self) -> Self {
        self.unspent_only = true;
        self
    }

    pub fn with_type(mut self, output_type: OutputType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    pub fn values(mut self) -> Self {
        self.kind = Some(OutputKind::Value);
        self
    }

    pub fn assets(mut self) -> Self {
        self.kind = Some(OutputKind::Asset);
        self
    }

    /// Match outputs whose script pushes the decoded address.
    /// Repeated calls widen the address set.
    pub fn with_address(mut self, address: &str) -> std::result::Result<Self, ConversionError> {
        self.addresses.push(decode_base58_bytes(address)?);
        Ok(self)
    }

    pub fn matches(&self, output: &Output) -> bool {
        if self.unspent_only && output.is_spent() {
            return false;
        }
        if let Some(output_type) = self.output_type {
            if output.output_type() != output_type {
                return false;
            }
        }
        match self.kind {
            Some(OutputKind::Value) if !output.is_value() => return false,
            Some(OutputKind::Asset) if !output.is_asset() => return false,
            _ => {}
        }
        self.addresses.is_empty()
            || self
                .addresses
                .iter()
                .any(|address| output.script().contains_push(address))
    }
}

/// Every output of every stored transaction
pub fn all_outputs<S: TransactionStore + ?Sized>(store: &S) -> Result<Vec<Output>> {
    let mut outputs = Vec::new();
    for record in store.find_all()? {
        let transaction = Transaction::from_record(&record)?;
        outputs.extend_from_slice(transaction.outputs());
    }
    Ok(outputs)
}

pub fn unspent_outputs<S: TransactionStore + ?Sized>(store: &S) -> Result<Vec<Output>> {
    filter_outputs(store, &OutputFilter::new().unspent())
}

pub fn filter_outputs<S: TransactionStore + ?Sized>(store: &S, filter: &OutputFilter) -> Result<Vec<Output>> {
    let outputs: Vec<Output> = all_outputs(store)?
        .into_iter()
        .filter(|output| filter.matches(output))
        .collect();
    tracing::debug!(matched = outputs.len(), "output query");
    Ok(outputs)
}
