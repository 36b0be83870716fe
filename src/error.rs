//! Error types for ledger encoding, validation and script execution

use thiserror::Error;

/// Codec failures: hex, fixed-width integers, Base58
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("field overflow: {value} does not fit in {width} bytes")]
    FieldOverflow { value: u64, width: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid base58 character: {0}")]
    InvalidCharacter(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("private key required for signing")]
    MissingPrivateKey,
}

/// Structural script errors: encoding and decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("data push of {0} bytes is outside 1..=75")]
    InvalidPushLength(usize),

    #[error("script body of {0} bytes exceeds the 2-byte length prefix")]
    ScriptTooLong(usize),

    #[error("invalid instruction data: 0x{0:02x}")]
    InvalidInstruction(u8),

    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("script truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}

/// Recoverable VM failures, folded into `false` by `Script::run`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("stack underflow: {op} needs {needed} items, stack has {found}")]
    StackUnderflow { op: &'static str, needed: usize, found: usize },

    #[error("verification failure")]
    VerificationFailure,

    #[error("missing transaction input for {0}")]
    MissingTransactionInput(&'static str),
}

/// Everything the VM can raise; only `Execution` is caught at the script boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("{op} cannot operate on {left} and {right}")]
    OperandType {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("{op} expects bytes, found {found}")]
    ExpectedBytes { op: &'static str, found: &'static str },

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("invalid output type: 0")]
    InvalidType,

    #[error("unsupported output type: 0x{0:08x}")]
    UnsupportedType(u32),

    #[error("missing value")]
    MissingValue,

    #[error("value {0} exceeds the value range")]
    ValueOverflow(u64),

    #[error("missing asset")]
    MissingAsset,

    #[error("missing root")]
    MissingRoot,

    #[error("{0} output must not carry a value")]
    UnexpectedValue(&'static str),

    #[error("{0} output must not carry an asset")]
    UnexpectedAsset(&'static str),

    #[error("{0} output must not carry a root")]
    UnexpectedRoot(&'static str),

    #[error("invalid asset length: expected {expected}, found {found}")]
    InvalidAssetLength { expected: usize, found: usize },

    #[error("invalid root length: expected {expected}, found {found}")]
    InvalidRootLength { expected: usize, found: usize },

    #[error("root does not match its derivation")]
    InvalidRoot,

    #[error("root output must have root equal to asset")]
    RootAssetMismatch,

    #[error("head output must not have root equal to asset")]
    HeadEqualsRoot,

    #[error("output truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("missing referenced transaction")]
    MissingUtxo,

    #[error("referenced transaction id must be 20 bytes, found {0}")]
    InvalidUtxo(usize),

    #[error("input truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has not been validated")]
    NotValidated,

    #[error("transaction is invalid")]
    Invalid,

    #[error("transaction has no outputs")]
    MissingOutput,

    #[error("too many {kind}: {count}")]
    TooMany { kind: &'static str, count: usize },

    #[error("transaction truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Crate-level error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Script execution failed: {0}")]
    Vm(#[from] VmError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
