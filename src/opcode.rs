//! Opcode table shared by the script codec and the virtual machine

use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Dup = 0x76,
    Equal = 0x87,
    Verify = 0x69,
    EqualVerify = 0x88,
    Add = 0x93,
    Hash160 = 0xa9,
    CheckSig = 0xac,
    CheckSigVerify = 0xad,
}

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Opcode::Dup,
        Opcode::Equal,
        Opcode::Verify,
        Opcode::EqualVerify,
        Opcode::Add,
        Opcode::Hash160,
        Opcode::CheckSig,
        Opcode::CheckSigVerify,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            0x76 => Some(Opcode::Dup),
            0x87 => Some(Opcode::Equal),
            0x69 => Some(Opcode::Verify),
            0x88 => Some(Opcode::EqualVerify),
            0x93 => Some(Opcode::Add),
            0xa9 => Some(Opcode::Hash160),
            0xac => Some(Opcode::CheckSig),
            0xad => Some(Opcode::CheckSigVerify),
            _ => None,
        }
    }

    /// Uppercase name used by the human-readable script form
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Dup => "OP_DUP",
            Opcode::Equal => "OP_EQUAL",
            Opcode::Verify => "OP_VERIFY",
            Opcode::EqualVerify => "OP_EQUALVERIFY",
            Opcode::Add => "OP_ADD",
            Opcode::Hash160 => "OP_HASH160",
            Opcode::CheckSig => "OP_CHECKSIG",
            Opcode::CheckSigVerify => "OP_CHECKSIGVERIFY",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScriptError::UnknownInstruction(s.to_string()))
    }
}
