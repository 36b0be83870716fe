//! Structural validation of a transaction's inputs and outputs

use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Counts are written as u16 on the wire
const MAX_ENTRIES: usize = u16::MAX as usize;

/// Stateless; holds only the transaction under inspection
pub struct TransactionValidator<'a> {
    transaction: &'a Transaction,
}

impl<'a> TransactionValidator<'a> {
    pub fn new(transaction: &'a Transaction) -> Self {
        Self { transaction }
    }

    /// CheckTransaction:
    /// 1. every input has a well-formed reference and script
    /// 2. at least one output
    /// 3. every output satisfies its type's rules
    /// 4. input and output counts fit the wire format
    pub fn validate(&self) -> Result<(), TransactionError> {
        let inputs = self.transaction.inputs();
        let outputs = self.transaction.outputs();

        for input in inputs {
            input.validate()?;
        }

        if outputs.is_empty() {
            return Err(TransactionError::MissingOutput);
        }
        for output in outputs {
            output.validate()?;
        }

        if inputs.len() > MAX_ENTRIES {
            return Err(TransactionError::TooMany {
                kind: "inputs",
                count: inputs.len(),
            });
        }
        if outputs.len() > MAX_ENTRIES {
            return Err(TransactionError::TooMany {
                kind: "outputs",
                count: outputs.len(),
            });
        }

        Ok(())
    }
}
