//! Inputs: a pointer to a prior output plus the script that unlocks it

use crate::constants::TRANSACTION_ID_LENGTH;
use crate::conversions::bytes_to_int;
use crate::error::InputError;
use crate::script::Script;
use crate::types::{ByteString, TransactionId};

/// Wire layout: 20-byte transaction id, u16 output index, length-prefixed script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    /// uid of the transaction that created the output; empty when unset
    pub referenced_transaction_id: ByteString,
    pub referenced_output_index: u16,
    pub script: Script,
}

impl Input {
    pub fn new(referenced_transaction_id: impl Into<ByteString>, referenced_output_index: u16, script: Script) -> Self {
        Self {
            referenced_transaction_id: referenced_transaction_id.into(),
            referenced_output_index,
            script,
        }
    }

    /// The referenced id as a fixed array, if it is well formed
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.referenced_transaction_id.as_slice().try_into().ok()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, InputError> {
        self.check_reference()?;
        let mut out = self.referenced_transaction_id.clone();
        out.extend_from_slice(&self.referenced_output_index.to_be_bytes());
        out.extend_from_slice(&self.script.serialize()?);
        Ok(out)
    }

    /// Decode one input, returning it with the number of bytes consumed
    pub fn deserialize(data: &[u8]) -> Result<(Input, usize), InputError> {
        let header = TRANSACTION_ID_LENGTH + 2;
        if data.len() < header {
            return Err(InputError::Truncated {
                expected: header,
                found: data.len(),
            });
        }
        let referenced_transaction_id = data[..TRANSACTION_ID_LENGTH].to_vec();
        let referenced_output_index = bytes_to_int(&data[TRANSACTION_ID_LENGTH..header]) as u16;
        let (script, script_len) = Script::deserialize(&data[header..])?;
        Ok((
            Input {
                referenced_transaction_id,
                referenced_output_index,
                script,
            },
            header + script_len,
        ))
    }

    pub fn validate(&self) -> Result<(), InputError> {
        self.check_reference()?;
        self.script.validate()?;
        Ok(())
    }

    fn check_reference(&self) -> Result<(), InputError> {
        if self.referenced_transaction_id.is_empty() {
            return Err(InputError::MissingUtxo);
        }
        if self.referenced_transaction_id.len() != TRANSACTION_ID_LENGTH {
            return Err(InputError::InvalidUtxo(self.referenced_transaction_id.len()));
        }
        Ok(())
    }
}
