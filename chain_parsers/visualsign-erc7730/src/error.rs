//! Error types for signature parsing, decoding, descriptor resolution and rendering
//!
//! Every failure that aborts a call is one of the enums below, wrapped by [`Error`].
//! Non-fatal conditions never surface here; they are collected as [`RenderWarning`]s
//! on the returned display model.

use alloy_primitives::Address;
use serde::{Serialize, Serializer};

/// Category of a signature or type-string syntax failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unbalanced parenthesis or bracket")]
    UnbalancedParenthesis,
    #[error("unknown type")]
    UnknownType,
    #[error("invalid width suffix")]
    InvalidWidth,
    #[error("invalid array length")]
    InvalidArrayLength,
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("type nesting too deep")]
    NestingTooDeep,
    #[error("trailing input")]
    TrailingInput,
}

/// Malformed signature syntax, located by byte position in the input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at position {position} near `{fragment}`")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The offending piece of input (possibly empty at end of input)
    pub fragment: String,
    pub position: usize,
}

/// Ways an ABI encoding can be malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    #[error("data truncated")]
    Truncated,
    #[error("offset points outside the buffer")]
    OffsetOutOfRange,
    #[error("declared length exceeds the remaining data")]
    LengthOverflow,
    #[error("non-zero padding bits")]
    DirtyPadding,
    #[error("boolean word is neither 0 nor 1")]
    InvalidBool,
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("offsets share tails and decode to more values than the buffer holds")]
    Aliased,
}

/// Errors raised while decoding calldata or typed data against a schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("calldata too short: expected at least {expected} bytes, got {actual}")]
    CalldataTooShort { expected: usize, actual: usize },

    #[error("no display format matches selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error(
        "selector mismatch: expected 0x{}, got 0x{}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    SelectorMismatch { expected: [u8; 4], actual: [u8; 4] },

    #[error("corrupt encoding in parameter {param} at byte offset {offset}: {kind}")]
    Corrupt {
        /// Index of the top-level parameter being decoded
        param: usize,
        /// Absolute byte offset into the decoded buffer
        offset: usize,
        kind: Corruption,
    },

    #[error("unknown typed data type `{0}`")]
    UnknownType(String),

    #[error("typed data type `{0}` references itself")]
    RecursiveType(String),

    #[error("type nesting exceeds {0} levels")]
    DepthExceeded(usize),

    #[error("typed data schema expands to more than {0} fields")]
    TooComplex(usize),

    #[error("invalid typed data value at `{path}`: {reason}")]
    TypedData { path: String, reason: String },

    #[error(transparent)]
    Type(#[from] ParseError),
}

/// Errors from descriptor and token lookup collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no descriptor for contract {address} on chain {chain_id}")]
    NotFound { chain_id: u64, address: Address },

    #[error("no descriptor for typed data `{primary_type}` on chain {chain_id}")]
    TypedNotFound { chain_id: u64, primary_type: String },

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("lookup failed: {0}")]
    Source(String),
}

/// Fatal rendering failures; the whole render call is aborted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("path `{0}` does not resolve against the decoded value")]
    PathNotFound(String),

    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("format `{format}` cannot render a {found} value at `{path}`")]
    IncompatibleValue {
        path: String,
        format: String,
        found: &'static str,
    },

    #[error("field `{label}` has no path")]
    MissingPath { label: String },

    #[error("undefined definition `{0}`")]
    UndefinedReference(String),

    #[error("undefined visibility rule `{0}`")]
    UndefinedVisibilityRule(String),

    #[error("reference cycle through `{0}`")]
    ReferenceCycle(String),

    #[error("reference depth exceeds {limit} while resolving `{name}`")]
    ReferenceDepthExceeded { name: String, limit: usize },

    #[error("no display format for `{0}`")]
    MissingFormat(String),
}

/// Non-fatal conditions recorded while rendering
///
/// Each warning corresponds to a field rendered with a fallback value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderWarning {
    #[error("no token metadata for {address} on chain {chain_id}; showing raw amount")]
    TokenUnavailable { chain_id: u64, address: Address },

    #[error("token lookup for {address} on chain {chain_id} failed: {reason}")]
    TokenLookupFailed {
        chain_id: u64,
        address: Address,
        reason: String,
    },

    #[error("no token address for `{path}`; showing raw amount")]
    TokenAddressUnavailable { path: String },

    #[error("format `{format}` at `{path}` is not supported; showing raw value")]
    UnsupportedFormat { format: String, path: String },

    #[error("no `{enum_name}` entry for value {value}")]
    EnumValueMissing { enum_name: String, value: String },

    #[error("timestamp {0} cannot be rendered as a date")]
    DateOutOfRange(String),

    #[error("amount {value} cannot be scaled by {decimals} decimals")]
    InvalidDecimals { value: String, decimals: u8 },

    #[error("intent interpolation failed: {0}")]
    IntentInterpolation(String),
}

impl Serialize for RenderWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Umbrella error returned by the public entry points
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
