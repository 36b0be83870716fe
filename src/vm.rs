//! Stack machine that executes script opcodes

use crate::address::Address;
use crate::conversions::hash160;
use crate::error::{ExecutionError, VmError};
use crate::opcode::Opcode;
use crate::transaction::Transaction;
use crate::types::{StackValue, TransactionId};

/// Evaluation state for one script run.
///
/// The transaction id and output index are only consulted by the
/// signature opcodes; everything else runs on a bare stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualMachine {
    stack: Vec<StackValue>,
    transaction_id: Option<TransactionId>,
    output_index: Option<u16>,
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// VM that checks signatures against `transaction_id`
    pub fn with_transaction(transaction_id: TransactionId, output_index: u16) -> Self {
        Self {
            stack: Vec::new(),
            transaction_id: Some(transaction_id),
            output_index: Some(output_index),
        }
    }

    /// VM bound to a saved transaction. An unsaved transaction has no uid,
    /// so signature opcodes will report a missing transaction input.
    pub fn for_transaction(transaction: &Transaction, output_index: u16) -> Self {
        Self {
            stack: Vec::new(),
            transaction_id: transaction.uid(),
            output_index: Some(output_index),
        }
    }

    pub fn with_stack(mut self, stack: Vec<StackValue>) -> Self {
        self.stack = stack;
        self
    }

    pub fn stack(&self) -> &[StackValue] {
        &self.stack
    }

    pub fn set_stack(&mut self, stack: Vec<StackValue>) {
        self.stack = stack;
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn output_index(&self) -> Option<u16> {
        self.output_index
    }

    /// Truthiness of the top of the stack; an empty stack is not valid
    pub fn is_valid(&self) -> bool {
        self.stack.last().map_or(false, StackValue::is_truthy)
    }

    pub fn push(&mut self, value: impl Into<StackValue>) {
        self.stack.push(value.into());
    }

    /// Execute a single opcode
    pub fn execute(&mut self, op: Opcode) -> Result<(), VmError> {
        tracing::trace!(op = %op, depth = self.stack.len(), "vm execute");
        match op {
            Opcode::Dup => self.op_dup(),
            Opcode::Equal => self.op_equal(),
            Opcode::Verify => self.op_verify(),
            Opcode::EqualVerify => {
                self.op_equal()?;
                self.op_verify()
            }
            Opcode::Add => self.op_add(),
            Opcode::Hash160 => self.op_hash160(),
            Opcode::CheckSig => self.op_checksig(),
            Opcode::CheckSigVerify => {
                self.op_checksig()?;
                self.op_verify()
            }
        }
    }

    fn min_stack(&self, op: Opcode, height: usize) -> Result<(), ExecutionError> {
        if self.stack.len() < height {
            return Err(ExecutionError::StackUnderflow {
                op: op.name(),
                needed: height,
                found: self.stack.len(),
            });
        }
        Ok(())
    }

    fn pop2(&mut self, op: Opcode) -> Result<(StackValue, StackValue), ExecutionError> {
        self.min_stack(op, 2)?;
        let (Some(top), Some(second)) = (self.stack.pop(), self.stack.pop()) else {
            return Err(ExecutionError::StackUnderflow {
                op: op.name(),
                needed: 2,
                found: self.stack.len(),
            });
        };
        Ok((top, second))
    }

    fn op_dup(&mut self) -> Result<(), VmError> {
        self.min_stack(Opcode::Dup, 1)?;
        if let Some(top) = self.stack.last().cloned() {
            self.stack.push(top);
        }
        Ok(())
    }

    fn op_equal(&mut self) -> Result<(), VmError> {
        let (top, second) = self.pop2(Opcode::Equal)?;
        self.stack.push(StackValue::Bool(top == second));
        Ok(())
    }

    // Leaves the stack untouched on failure
    fn op_verify(&mut self) -> Result<(), VmError> {
        if !self.is_valid() {
            return Err(ExecutionError::VerificationFailure.into());
        }
        self.stack.pop();
        Ok(())
    }

    fn op_add(&mut self) -> Result<(), VmError> {
        self.min_stack(Opcode::Add, 2)?;
        let len = self.stack.len();
        let sum = match (&self.stack[len - 1], &self.stack[len - 2]) {
            (StackValue::Integer(a), StackValue::Integer(b)) => a
                .checked_add(*b)
                .map(StackValue::Integer)
                .ok_or(VmError::ArithmeticOverflow(Opcode::Add.name()))?,
            (StackValue::Integer(a), StackValue::Float(b)) => StackValue::Float(*a as f64 + b),
            (StackValue::Float(a), StackValue::Integer(b)) => StackValue::Float(a + *b as f64),
            (StackValue::Float(a), StackValue::Float(b)) => StackValue::Float(a + b),
            (left, right) => {
                return Err(VmError::OperandType {
                    op: Opcode::Add.name(),
                    left: left.kind(),
                    right: right.kind(),
                })
            }
        };
        self.stack.truncate(len - 2);
        self.stack.push(sum);
        Ok(())
    }

    fn op_hash160(&mut self) -> Result<(), VmError> {
        self.min_stack(Opcode::Hash160, 1)?;
        let digest = match self.stack.last() {
            Some(StackValue::Bytes(bytes)) => hash160(bytes),
            Some(other) => {
                return Err(VmError::ExpectedBytes {
                    op: Opcode::Hash160.name(),
                    found: other.kind(),
                })
            }
            None => {
                return Err(ExecutionError::StackUnderflow {
                    op: Opcode::Hash160.name(),
                    needed: 1,
                    found: 0,
                }
                .into())
            }
        };
        self.stack.pop();
        self.stack.push(StackValue::Bytes(digest.to_vec()));
        Ok(())
    }

    /// Pops the public key (top) then the signature, and checks the
    /// signature over the transaction id
    fn op_checksig(&mut self) -> Result<(), VmError> {
        self.min_stack(Opcode::CheckSig, 2)?;
        let transaction_id = match (self.transaction_id, self.output_index) {
            (Some(id), Some(_)) => id,
            _ => return Err(ExecutionError::MissingTransactionInput(Opcode::CheckSig.name()).into()),
        };

        let len = self.stack.len();
        for value in &self.stack[len - 2..] {
            if value.as_bytes().is_none() {
                return Err(VmError::ExpectedBytes {
                    op: Opcode::CheckSig.name(),
                    found: value.kind(),
                });
            }
        }

        let (public_key, signature) = self.pop2(Opcode::CheckSig)?;
        let valid = match (public_key.as_bytes(), signature.as_bytes()) {
            (Some(public_key), Some(signature)) => Address::from_public_key_bytes(public_key)
                .map(|address| address.verify(&transaction_id, signature))
                .unwrap_or(false),
            _ => false,
        };
        self.stack.push(StackValue::Bool(valid));
        Ok(())
    }
}
