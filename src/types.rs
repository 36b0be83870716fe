//! Core ledger types shared across modules

/// SHA-256 digest
pub type Sha256Hash = [u8; 32];

/// RIPEMD-160 or hash160 digest
pub type Hash160 = [u8; 20];

/// Transaction uid: RIPEMD-160 of the serialized transaction
pub type TransactionId = Hash160;

/// Byte string type
pub type ByteString = Vec<u8>;

/// Value held on the virtual machine stack
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Bytes(ByteString),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl StackValue {
    /// Falsy values are `false`, integer zero and float zero; everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            StackValue::Bool(b) => *b,
            StackValue::Integer(n) => *n != 0,
            StackValue::Float(f) => *f != 0.0,
            StackValue::Bytes(_) => true,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StackValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            StackValue::Bytes(_) => "bytes",
            StackValue::Bool(_) => "bool",
            StackValue::Integer(_) => "integer",
            StackValue::Float(_) => "float",
        }
    }
}

impl From<ByteString> for StackValue {
    fn from(bytes: ByteString) -> Self {
        StackValue::Bytes(bytes)
    }
}

impl From<&[u8]> for StackValue {
    fn from(bytes: &[u8]) -> Self {
        StackValue::Bytes(bytes.to_vec())
    }
}

impl From<bool> for StackValue {
    fn from(b: bool) -> Self {
        StackValue::Bool(b)
    }
}

impl From<i64> for StackValue {
    fn from(n: i64) -> Self {
        StackValue::Integer(n)
    }
}

impl From<f64> for StackValue {
    fn from(f: f64) -> Self {
        StackValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(StackValue::Bool(true).is_truthy());
        assert!(StackValue::Integer(-3).is_truthy());
        assert!(StackValue::Bytes(vec![]).is_truthy());
        assert!(StackValue::Bytes(vec![0]).is_truthy());
        assert!(!StackValue::Bool(false).is_truthy());
        assert!(!StackValue::Integer(0).is_truthy());
        assert!(!StackValue::Float(0.0).is_truthy());
    }
}
