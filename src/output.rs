//! Typed outputs: value transfers, hashed assets and root/head records
//!
//! Wire layout: a 32-bit big-endian field `T`. When `1 <= T <= 0x7fffffff`
//! it is the amount of a value output. Otherwise it is a type tag and the
//! type-dependent root/asset bytes follow. A length-prefixed script ends
//! every output.

use std::fmt;

use crate::constants::*;
use crate::conversions::{bytes_to_int, hash160, int_to_bytes};
use crate::error::OutputError;
use crate::script::Script;
use crate::types::{Hash160, Sha256Hash, TransactionId};

/// One variant per wire tag, plus plain value outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Value,
    IdentityRoot,
    IdentityHead,
    Sha256Asset,
    Sha256Root,
    Sha256Head,
    Ripemd160Asset,
    Ripemd160Root,
    Ripemd160Head,
    Hash160Asset,
    Hash160Root,
    Hash160Head,
}

impl OutputType {
    pub const TAGGED: [OutputType; 11] = [
        OutputType::IdentityRoot,
        OutputType::IdentityHead,
        OutputType::Sha256Asset,
        OutputType::Sha256Root,
        OutputType::Sha256Head,
        OutputType::Ripemd160Asset,
        OutputType::Ripemd160Root,
        OutputType::Ripemd160Head,
        OutputType::Hash160Asset,
        OutputType::Hash160Root,
        OutputType::Hash160Head,
    ];

    /// Wire tag; value outputs carry their amount instead
    pub fn tag(self) -> Option<u32> {
        match self {
            OutputType::Value => None,
            OutputType::IdentityRoot => Some(IDENTITY_ROOT),
            OutputType::IdentityHead => Some(IDENTITY_HEAD),
            OutputType::Sha256Asset => Some(SHA256_ASSET),
            OutputType::Sha256Root => Some(SHA256_ROOT),
            OutputType::Sha256Head => Some(SHA256_HEAD),
            OutputType::Ripemd160Asset => Some(RIPEMD160_ASSET),
            OutputType::Ripemd160Root => Some(RIPEMD160_ROOT),
            OutputType::Ripemd160Head => Some(RIPEMD160_HEAD),
            OutputType::Hash160Asset => Some(HASH160_ASSET),
            OutputType::Hash160Root => Some(HASH160_ROOT),
            OutputType::Hash160Head => Some(HASH160_HEAD),
        }
    }

    /// Classify the leading 32-bit field
    pub fn from_tag(tag: u32) -> Result<OutputType, OutputError> {
        match tag {
            0 => Err(OutputError::InvalidType),
            1..=VALUE_UPPER_BOUND => Ok(OutputType::Value),
            IDENTITY_ROOT => Ok(OutputType::IdentityRoot),
            IDENTITY_HEAD => Ok(OutputType::IdentityHead),
            SHA256_ASSET => Ok(OutputType::Sha256Asset),
            SHA256_ROOT => Ok(OutputType::Sha256Root),
            SHA256_HEAD => Ok(OutputType::Sha256Head),
            RIPEMD160_ASSET => Ok(OutputType::Ripemd160Asset),
            RIPEMD160_ROOT => Ok(OutputType::Ripemd160Root),
            RIPEMD160_HEAD => Ok(OutputType::Ripemd160Head),
            HASH160_ASSET => Ok(OutputType::Hash160Asset),
            HASH160_ROOT => Ok(OutputType::Hash160Root),
            HASH160_HEAD => Ok(OutputType::Hash160Head),
            other => Err(OutputError::UnsupportedType(other)),
        }
    }

    /// Digest length of the asset/root fields
    pub fn hash_length(self) -> Option<usize> {
        match self {
            OutputType::Value => None,
            OutputType::Sha256Asset | OutputType::Sha256Root | OutputType::Sha256Head => Some(SHA256_LENGTH),
            _ => Some(HASH160_LENGTH),
        }
    }

    pub fn is_root(self) -> bool {
        matches!(
            self,
            OutputType::IdentityRoot | OutputType::Sha256Root | OutputType::Ripemd160Root | OutputType::Hash160Root
        )
    }

    pub fn is_head(self) -> bool {
        matches!(
            self,
            OutputType::IdentityHead | OutputType::Sha256Head | OutputType::Ripemd160Head | OutputType::Hash160Head
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputType::Value => "value",
            OutputType::IdentityRoot => "identity root",
            OutputType::IdentityHead => "identity head",
            OutputType::Sha256Asset => "sha256 asset",
            OutputType::Sha256Root => "sha256 root",
            OutputType::Sha256Head => "sha256 head",
            OutputType::Ripemd160Asset => "ripemd160 asset",
            OutputType::Ripemd160Root => "ripemd160 root",
            OutputType::Ripemd160Head => "ripemd160 head",
            OutputType::Hash160Asset => "hash160 asset",
            OutputType::Hash160Root => "hash160 root",
            OutputType::Hash160Head => "hash160 head",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type-specific fields of an output. Root types hold a single
/// digest that serves as both root and asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    Value(u32),
    /// root = hash160(serialized script)
    IdentityRoot { root: Hash160 },
    /// asset = hash160(root || serialized script)
    IdentityHead { root: Hash160, asset: Hash160 },
    Sha256Asset { asset: Sha256Hash },
    Sha256Root { root: Sha256Hash },
    Sha256Head { root: Sha256Hash, asset: Sha256Hash },
    Ripemd160Asset { asset: Hash160 },
    Ripemd160Root { root: Hash160 },
    Ripemd160Head { root: Hash160, asset: Hash160 },
    Hash160Asset { asset: Hash160 },
    Hash160Root { root: Hash160 },
    Hash160Head { root: Hash160, asset: Hash160 },
}

impl Payload {
    pub fn output_type(&self) -> OutputType {
        match self {
            Payload::Value(_) => OutputType::Value,
            Payload::IdentityRoot { .. } => OutputType::IdentityRoot,
            Payload::IdentityHead { .. } => OutputType::IdentityHead,
            Payload::Sha256Asset { .. } => OutputType::Sha256Asset,
            Payload::Sha256Root { .. } => OutputType::Sha256Root,
            Payload::Sha256Head { .. } => OutputType::Sha256Head,
            Payload::Ripemd160Asset { .. } => OutputType::Ripemd160Asset,
            Payload::Ripemd160Root { .. } => OutputType::Ripemd160Root,
            Payload::Ripemd160Head { .. } => OutputType::Ripemd160Head,
            Payload::Hash160Asset { .. } => OutputType::Hash160Asset,
            Payload::Hash160Root { .. } => OutputType::Hash160Root,
            Payload::Hash160Head { .. } => OutputType::Hash160Head,
        }
    }

    fn value(&self) -> Option<u32> {
        match self {
            Payload::Value(value) => Some(*value),
            _ => None,
        }
    }

    fn root(&self) -> Option<&[u8]> {
        match self {
            Payload::Value(_) | Payload::Sha256Asset { .. } | Payload::Ripemd160Asset { .. } | Payload::Hash160Asset { .. } => None,
            Payload::IdentityRoot { root } | Payload::IdentityHead { root, .. } => Some(root),
            Payload::Sha256Root { root } | Payload::Sha256Head { root, .. } => Some(root),
            Payload::Ripemd160Root { root } | Payload::Ripemd160Head { root, .. } => Some(root),
            Payload::Hash160Root { root } | Payload::Hash160Head { root, .. } => Some(root),
        }
    }

    fn asset(&self) -> Option<&[u8]> {
        match self {
            Payload::Value(_) | Payload::IdentityRoot { .. } => None,
            Payload::IdentityHead { asset, .. } => Some(asset),
            Payload::Sha256Asset { asset } | Payload::Sha256Head { asset, .. } => Some(asset),
            Payload::Sha256Root { root } => Some(root),
            Payload::Ripemd160Asset { asset } | Payload::Ripemd160Head { asset, .. } => Some(asset),
            Payload::Ripemd160Root { root } => Some(root),
            Payload::Hash160Asset { asset } | Payload::Hash160Head { asset, .. } => Some(asset),
            Payload::Hash160Root { root } => Some(root),
        }
    }

    /// Bytes written between the tag and the script
    fn wire_fields(&self) -> Vec<u8> {
        match self {
            Payload::Value(_) | Payload::IdentityRoot { .. } => Vec::new(),
            Payload::IdentityHead { root, .. } => root.to_vec(),
            Payload::Sha256Asset { asset } => asset.to_vec(),
            Payload::Sha256Root { root } => root.to_vec(),
            Payload::Sha256Head { root, asset } => [root.as_slice(), asset.as_slice()].concat(),
            Payload::Ripemd160Asset { asset } | Payload::Hash160Asset { asset } => asset.to_vec(),
            Payload::Ripemd160Root { root } | Payload::Hash160Root { root } => root.to_vec(),
            Payload::Ripemd160Head { root, asset } | Payload::Hash160Head { root, asset } => {
                [root.as_slice(), asset.as_slice()].concat()
            }
        }
    }
}

/// A spendable unit encumbered by a script.
///
/// `owning_transaction_id` and `spending_transaction_id` are filled in by
/// queries and never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    payload: Payload,
    script: Script,
    owning_transaction_id: Option<TransactionId>,
    spending_transaction_id: Option<TransactionId>,
}

fn fixed<const N: usize>(bytes: &[u8], root: bool) -> Result<[u8; N], OutputError> {
    bytes.try_into().map_err(|_| {
        if root {
            OutputError::InvalidRootLength {
                expected: N,
                found: bytes.len(),
            }
        } else {
            OutputError::InvalidAssetLength {
                expected: N,
                found: bytes.len(),
            }
        }
    })
}

/// Root-type outputs take the digest from either field; both must agree
fn single_digest<'a>(asset: Option<&'a [u8]>, root: Option<&'a [u8]>) -> Result<&'a [u8], OutputError> {
    match (asset, root) {
        (Some(asset), Some(root)) if asset != root => Err(OutputError::RootAssetMismatch),
        (Some(digest), _) | (None, Some(digest)) => Ok(digest),
        (None, None) => Err(OutputError::MissingAsset),
    }
}

fn head_digests<const N: usize>(
    asset: Option<&[u8]>,
    root: Option<&[u8]>,
) -> Result<([u8; N], [u8; N]), OutputError> {
    let asset = fixed::<N>(asset.ok_or(OutputError::MissingAsset)?, false)?;
    let root = fixed::<N>(root.ok_or(OutputError::MissingRoot)?, true)?;
    if root == asset {
        return Err(OutputError::HeadEqualsRoot);
    }
    Ok((root, asset))
}

fn identity_root_of(script: &Script) -> Result<Hash160, OutputError> {
    Ok(hash160(&script.serialize()?))
}

fn identity_head_of(root: &Hash160, script: &Script) -> Result<Hash160, OutputError> {
    let mut preimage = root.to_vec();
    preimage.extend_from_slice(&script.serialize()?);
    Ok(hash160(&preimage))
}

impl Output {
    /// Build an output of any type from loose parts, enforcing which
    /// fields each type allows and deriving identity roots and heads.
    pub fn from_parts(
        output_type: OutputType,
        value: Option<u64>,
        asset: Option<&[u8]>,
        root: Option<&[u8]>,
        script: Script,
    ) -> Result<Output, OutputError> {
        let name = output_type.name();
        if output_type != OutputType::Value && value.is_some() {
            return Err(OutputError::UnexpectedValue(name));
        }

        let payload = match output_type {
            OutputType::Value => {
                if asset.is_some() {
                    return Err(OutputError::UnexpectedAsset(name));
                }
                if root.is_some() {
                    return Err(OutputError::UnexpectedRoot(name));
                }
                match value {
                    None | Some(0) => return Err(OutputError::MissingValue),
                    Some(v) if v > u64::from(VALUE_UPPER_BOUND) => return Err(OutputError::ValueOverflow(v)),
                    Some(v) => Payload::Value(v as u32),
                }
            }
            OutputType::IdentityRoot => {
                if asset.is_some() {
                    return Err(OutputError::UnexpectedAsset(name));
                }
                let derived = identity_root_of(&script)?;
                if let Some(claimed) = root {
                    if claimed != derived.as_slice() {
                        return Err(OutputError::InvalidRoot);
                    }
                }
                Payload::IdentityRoot { root: derived }
            }
            OutputType::IdentityHead => {
                // a supplied asset is ignored; it is always recomputed
                let root = fixed::<HASH160_LENGTH>(root.ok_or(OutputError::MissingRoot)?, true)?;
                let asset = identity_head_of(&root, &script)?;
                Payload::IdentityHead { root, asset }
            }
            OutputType::Sha256Asset | OutputType::Ripemd160Asset | OutputType::Hash160Asset => {
                if root.is_some() {
                    return Err(OutputError::UnexpectedRoot(name));
                }
                let asset = asset.ok_or(OutputError::MissingAsset)?;
                match output_type {
                    OutputType::Sha256Asset => Payload::Sha256Asset { asset: fixed(asset, false)? },
                    OutputType::Ripemd160Asset => Payload::Ripemd160Asset { asset: fixed(asset, false)? },
                    _ => Payload::Hash160Asset { asset: fixed(asset, false)? },
                }
            }
            OutputType::Sha256Root | OutputType::Ripemd160Root | OutputType::Hash160Root => {
                let digest = single_digest(asset, root)?;
                match output_type {
                    OutputType::Sha256Root => Payload::Sha256Root { root: fixed(digest, true)? },
                    OutputType::Ripemd160Root => Payload::Ripemd160Root { root: fixed(digest, true)? },
                    _ => Payload::Hash160Root { root: fixed(digest, true)? },
                }
            }
            OutputType::Sha256Head => {
                let (root, asset) = head_digests::<SHA256_LENGTH>(asset, root)?;
                Payload::Sha256Head { root, asset }
            }
            OutputType::Ripemd160Head => {
                let (root, asset) = head_digests::<HASH160_LENGTH>(asset, root)?;
                Payload::Ripemd160Head { root, asset }
            }
            OutputType::Hash160Head => {
                let (root, asset) = head_digests::<HASH160_LENGTH>(asset, root)?;
                Payload::Hash160Head { root, asset }
            }
        };

        Ok(Output {
            payload,
            script,
            owning_transaction_id: None,
            spending_transaction_id: None,
        })
    }

    pub fn with_value(value: u64, script: Script) -> Result<Output, OutputError> {
        Self::from_parts(OutputType::Value, Some(value), None, None, script)
    }

    /// Identity root whose root is derived from `script`
    pub fn identity_root(script: Script) -> Result<Output, OutputError> {
        Self::from_parts(OutputType::IdentityRoot, None, None, None, script)
    }

    /// Identity head for the identity rooted at `root`
    pub fn identity_head(root: &[u8], script: Script) -> Result<Output, OutputError> {
        Self::from_parts(OutputType::IdentityHead, None, None, Some(root), script)
    }

    pub fn with_asset(output_type: OutputType, asset: &[u8], script: Script) -> Result<Output, OutputError> {
        Self::from_parts(output_type, None, Some(asset), None, script)
    }

    pub fn with_root(output_type: OutputType, root: &[u8], script: Script) -> Result<Output, OutputError> {
        Self::from_parts(output_type, None, None, Some(root), script)
    }

    pub fn with_head(output_type: OutputType, root: &[u8], asset: &[u8], script: Script) -> Result<Output, OutputError> {
        Self::from_parts(output_type, None, Some(asset), Some(root), script)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn output_type(&self) -> OutputType {
        self.payload.output_type()
    }

    /// The leading 32-bit wire field: the amount or the type tag
    pub fn tag(&self) -> u32 {
        match self.payload {
            Payload::Value(value) => value,
            _ => self.output_type().tag().unwrap_or_default(),
        }
    }

    pub fn value(&self) -> Option<u32> {
        self.payload.value()
    }

    pub fn asset(&self) -> Option<&[u8]> {
        self.payload.asset()
    }

    pub fn root(&self) -> Option<&[u8]> {
        self.payload.root()
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn is_value(&self) -> bool {
        self.value().is_some()
    }

    pub fn is_asset(&self) -> bool {
        self.asset().is_some()
    }

    pub fn owning_transaction_id(&self) -> Option<&TransactionId> {
        self.owning_transaction_id.as_ref()
    }

    pub fn set_owning_transaction_id(&mut self, id: Option<TransactionId>) {
        self.owning_transaction_id = id;
    }

    pub fn spending_transaction_id(&self) -> Option<&TransactionId> {
        self.spending_transaction_id.as_ref()
    }

    pub fn set_spending_transaction_id(&mut self, id: Option<TransactionId>) {
        self.spending_transaction_id = id;
    }

    pub fn is_spent(&self) -> bool {
        self.spending_transaction_id.is_some()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, OutputError> {
        let mut out = int_to_bytes(u64::from(self.tag()), 4)
            .map_err(|_| OutputError::ValueOverflow(u64::from(self.tag())))?;
        out.extend_from_slice(&self.payload.wire_fields());
        out.extend_from_slice(&self.script.serialize()?);
        Ok(out)
    }

    /// Decode one output, returning it with the number of bytes consumed.
    /// Identity roots and head assets are recomputed rather than read.
    pub fn deserialize(data: &[u8]) -> Result<(Output, usize), OutputError> {
        if data.len() < 4 {
            return Err(OutputError::Truncated {
                expected: 4,
                found: data.len(),
            });
        }
        let tag = bytes_to_int(&data[..4]) as u32;
        let output_type = OutputType::from_tag(tag)?;

        let field_len = match output_type {
            OutputType::Value | OutputType::IdentityRoot => 0,
            OutputType::IdentityHead => HASH160_LENGTH,
            t if t.is_head() => 2 * t.hash_length().unwrap_or_default(),
            t => t.hash_length().unwrap_or_default(),
        };
        let script_offset = 4 + field_len;
        if data.len() < script_offset {
            return Err(OutputError::Truncated {
                expected: script_offset,
                found: data.len(),
            });
        }
        let fields = &data[4..script_offset];
        let (script, script_len) = Script::deserialize(&data[script_offset..])?;

        let output = match output_type {
            OutputType::Value => Self::with_value(u64::from(tag), script)?,
            OutputType::IdentityRoot => Self::identity_root(script)?,
            OutputType::IdentityHead => Self::identity_head(fields, script)?,
            t if t.is_head() => {
                let (root, asset) = fields.split_at(field_len / 2);
                Self::with_head(t, root, asset, script)?
            }
            t if t.is_root() => Self::with_root(t, fields, script)?,
            t => Self::with_asset(t, fields, script)?,
        };
        Ok((output, script_offset + script_len))
    }

    /// Re-check the invariants of this output and run the script's own checks
    pub fn validate(&self) -> Result<(), OutputError> {
        match &self.payload {
            Payload::Value(value) => {
                if *value == 0 {
                    return Err(OutputError::MissingValue);
                }
                if *value > VALUE_UPPER_BOUND {
                    return Err(OutputError::ValueOverflow(u64::from(*value)));
                }
            }
            Payload::IdentityRoot { root } => {
                if *root != identity_root_of(&self.script)? {
                    return Err(OutputError::InvalidRoot);
                }
            }
            Payload::IdentityHead { .. } => {}
            Payload::Sha256Head { root, asset } => {
                if root == asset {
                    return Err(OutputError::HeadEqualsRoot);
                }
            }
            Payload::Ripemd160Head { root, asset } | Payload::Hash160Head { root, asset } => {
                if root == asset {
                    return Err(OutputError::HeadEqualsRoot);
                }
            }
            Payload::Sha256Asset { .. }
            | Payload::Sha256Root { .. }
            | Payload::Ripemd160Asset { .. }
            | Payload::Ripemd160Root { .. }
            | Payload::Hash160Asset { .. }
            | Payload::Hash160Root { .. } => {}
        }
        self.script.validate()?;
        Ok(())
    }
}
