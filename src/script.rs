//! Script bytecode, human-readable form and execution
//!
//! Binary layout: an optional 2-byte big-endian length prefix, then one
//! entry per step. Opcodes take their single reserved byte; data pushes
//! take a length byte in 1..=75 followed by the raw bytes.

use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::conversions::{bytes_to_hex, bytes_to_int, hex_to_bytes, int_to_bytes};
use crate::error::{ScriptError, VmError};
use crate::opcode::Opcode;
use crate::types::{ByteString, Hash160};
use crate::vm::VirtualMachine;

/// One program step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Op(Opcode),
    Push(ByteString),
}

impl From<Opcode> for Step {
    fn from(op: Opcode) -> Self {
        Step::Op(op)
    }
}

impl From<ByteString> for Step {
    fn from(data: ByteString) -> Self {
        Step::Push(data)
    }
}

impl From<&[u8]> for Step {
    fn from(data: &[u8]) -> Self {
        Step::Push(data.to_vec())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn pay_to_public_key_hash(public_key_hash: &Hash160) -> Self {
        Self::new(vec![
            Step::Op(Opcode::Dup),
            Step::Op(Opcode::Hash160),
            Step::Push(public_key_hash.to_vec()),
            Step::Op(Opcode::EqualVerify),
            Step::Op(Opcode::CheckSig),
        ])
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push_step(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// True when any data push equals `data` exactly
    pub fn contains_push(&self, data: &[u8]) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Step::Push(pushed) if pushed.as_slice() == data))
    }

    /// Length-prefixed encoding
    pub fn serialize(&self) -> Result<Vec<u8>, ScriptError> {
        let body = self.serialize_body()?;
        let mut out = int_to_bytes(body.len() as u64, 2)
            .map_err(|_| ScriptError::ScriptTooLong(body.len()))?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Encoding without the length prefix
    pub fn serialize_body(&self) -> Result<Vec<u8>, ScriptError> {
        let mut body = Vec::new();
        for step in &self.steps {
            match step {
                Step::Op(op) => body.push(op.byte()),
                Step::Push(data) => {
                    if data.is_empty() || data.len() > MAX_PUSH_LENGTH {
                        return Err(ScriptError::InvalidPushLength(data.len()));
                    }
                    body.push(data.len() as u8);
                    body.extend_from_slice(data);
                }
            }
        }
        if body.len() > MAX_SCRIPT_LENGTH {
            return Err(ScriptError::ScriptTooLong(body.len()));
        }
        Ok(body)
    }

    /// Decode a length-prefixed script, returning it with the number of bytes consumed
    pub fn deserialize(data: &[u8]) -> Result<(Script, usize), ScriptError> {
        if data.len() < 2 {
            return Err(ScriptError::Truncated {
                expected: 2,
                found: data.len(),
            });
        }
        let body_len = bytes_to_int(&data[..2]) as usize;
        let consumed = 2 + body_len;
        if data.len() < consumed {
            return Err(ScriptError::Truncated {
                expected: consumed,
                found: data.len(),
            });
        }
        let script = Self::deserialize_body(&data[2..consumed])?;
        Ok((script, consumed))
    }

    /// Decode an unprefixed body; every byte must belong to a step
    pub fn deserialize_body(body: &[u8]) -> Result<Script, ScriptError> {
        let mut steps = Vec::new();
        let mut pos = 0;
        while pos < body.len() {
            let code = body[pos];
            pos += 1;
            if code >= 1 && code as usize <= MAX_PUSH_LENGTH {
                let end = pos + code as usize;
                if end > body.len() {
                    return Err(ScriptError::Truncated {
                        expected: end,
                        found: body.len(),
                    });
                }
                steps.push(Step::Push(body[pos..end].to_vec()));
                pos = end;
            } else {
                let op = Opcode::from_byte(code).ok_or(ScriptError::InvalidInstruction(code))?;
                steps.push(Step::Op(op));
            }
        }
        Ok(Script { steps })
    }

    /// Uppercase opcode names and uppercase hex pushes, space separated
    pub fn humanize(&self) -> String {
        self.to_string()
    }

    /// Run every step against `vm` and report the final top-of-stack truthiness.
    ///
    /// Execution errors (underflow, failed verify, missing transaction)
    /// mean the script failed and yield `Ok(false)`. Any other VM error
    /// is returned to the caller.
    pub fn run(&self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        match self.execute(vm) {
            Ok(()) => Ok(vm.is_valid()),
            Err(VmError::Execution(err)) => {
                tracing::debug!(error = %err, "script execution failed");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn execute(&self, vm: &mut VirtualMachine) -> Result<(), VmError> {
        for step in &self.steps {
            match step {
                Step::Op(op) => vm.execute(*op)?,
                Step::Push(data) => vm.push(data.clone()),
            }
        }
        Ok(())
    }

    /// Static checks hook; every script is currently accepted
    pub fn validate(&self) -> Result<(), ScriptError> {
        Ok(())
    }
}

impl From<Vec<Step>> for Script {
    fn from(steps: Vec<Step>) -> Self {
        Script::new(steps)
    }
}

impl FromIterator<Step> for Script {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Script::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Op(op) => write!(f, "{op}"),
            Step::Push(data) => f.write_str(&bytes_to_hex(data).to_uppercase()),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for Step {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(op) = s.parse::<Opcode>() {
            return Ok(Step::Op(op));
        }
        hex_to_bytes(s)
            .map(Step::Push)
            .map_err(|_| ScriptError::UnknownInstruction(s.to_string()))
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().map(str::parse).collect::<Result<Vec<Step>, _>>().map(Script::new)
    }
}
