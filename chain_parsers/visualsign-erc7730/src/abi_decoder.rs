//! ABI decoder for function calldata
//!
//! Decodes the standard head/tail ABI layout into an [`ArgumentValue`] tree that
//! mirrors the parameter schema. Static values sit inline in the head of their
//! scope; dynamic values are reached through a 32-byte offset that is relative to
//! the start of the enclosing scope (the argument block, a tuple, or an array
//! body).
//!
//! Decoding is strict: every read is bounds-checked, array lengths are checked
//! against the remaining bytes before anything is allocated, and words with
//! non-canonical padding are rejected instead of being silently truncated.

use std::fmt;
use std::iter;

use alloy_primitives::{Address, I256, U256};
use tracing::trace;

use crate::error::{Corruption, DecodeError};
use crate::signature::{Param, ParamType, Signature};

const WORD: usize = 32;

/// Values any buffer may decode to beyond its byte length
const BASE_DECODE_BUDGET: usize = 64;

/// A decoded value, shaped exactly like the [`ParamType`] it was decoded against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    Address(Address),
    /// Value and declared bit width
    Uint(U256, usize),
    /// Value and declared bit width
    Int(I256, usize),
    Bool(bool),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    String(String),
    Array(Vec<ArgumentValue>),
    Tuple(Vec<ArgumentValue>),
}

impl ArgumentValue {
    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ArgumentValue::Address(_) => "address",
            ArgumentValue::Uint(..) => "uint",
            ArgumentValue::Int(..) => "int",
            ArgumentValue::Bool(_) => "bool",
            ArgumentValue::Bytes(_) => "bytes",
            ArgumentValue::FixedBytes(_) => "fixed bytes",
            ArgumentValue::String(_) => "string",
            ArgumentValue::Array(_) => "array",
            ArgumentValue::Tuple(_) => "tuple",
        }
    }

    /// The value as an unsigned integer, if it is a non-negative integer
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            ArgumentValue::Uint(value, _) => Some(*value),
            ArgumentValue::Int(value, _) if !value.is_negative() => Some(value.into_raw()),
            _ => None,
        }
    }
}

/// Raw canonical text: decimal integers, lowercase `0x` hex for addresses and
/// bytes, `[a, b]` for arrays and `(a, b)` for tuples.
impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Address(address) => write!(f, "0x{}", hex::encode(address)),
            ArgumentValue::Uint(value, _) => write!(f, "{value}"),
            ArgumentValue::Int(value, _) => write!(f, "{value}"),
            ArgumentValue::Bool(value) => write!(f, "{value}"),
            ArgumentValue::Bytes(bytes) | ArgumentValue::FixedBytes(bytes) => {
                write!(f, "0x{}", hex::encode(bytes))
            }
            ArgumentValue::String(value) => f.write_str(value),
            ArgumentValue::Array(items) => write_list(f, "[", items, "]"),
            ArgumentValue::Tuple(items) => write_list(f, "(", items, ")"),
        }
    }
}

fn write_list(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: &[ArgumentValue],
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// Root of a decoded call or typed-data message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArguments {
    /// Function name or EIP-712 primary type
    pub name: String,
    /// Present for calldata, absent for typed data
    pub selector: Option<[u8; 4]>,
    /// Parameter schema, including member names
    pub params: Vec<Param>,
    /// Always an [`ArgumentValue::Tuple`] with one entry per parameter
    pub values: ArgumentValue,
}

impl DecodedArguments {
    /// Decoded value of the top-level parameter at `index`
    pub fn get(&self, index: usize) -> Option<&ArgumentValue> {
        match &self.values {
            ArgumentValue::Tuple(values) => values.get(index),
            _ => None,
        }
    }

    /// Decoded value of the top-level parameter called `name`
    pub fn get_named(&self, name: &str) -> Option<&ArgumentValue> {
        let index = self
            .params
            .iter()
            .position(|p| p.name.as_deref() == Some(name))?;
        self.get(index)
    }
}

/// Decodes full calldata (selector included) against a parsed signature
///
/// # Arguments
/// * `signature` - Signature whose selector must match the first four bytes
/// * `calldata` - Selector followed by the ABI-encoded arguments
///
/// # Returns
/// * `Ok(DecodedArguments)` on success
/// * `Err(DecodeError)` if there is no selector, the selector differs or the
///   encoding is corrupt. Arguments cut short are reported as
///   [`Corruption::Truncated`] at the first parameter that does not fit.
///   Trailing bytes after the arguments are ignored.
pub fn decode_calldata(signature: &Signature, calldata: &[u8]) -> Result<DecodedArguments, DecodeError> {
    if calldata.len() < 4 {
        return Err(DecodeError::CalldataTooShort {
            expected: 4,
            actual: calldata.len(),
        });
    }
    let mut actual = [0u8; 4];
    actual.copy_from_slice(&calldata[..4]);
    if actual != signature.selector() {
        return Err(DecodeError::SelectorMismatch {
            expected: signature.selector(),
            actual,
        });
    }

    let values = Decoder::new(&calldata[4..], 4).decode_params(signature.params())?;
    Ok(DecodedArguments {
        name: signature.name().to_string(),
        selector: Some(actual),
        params: signature.params().to_vec(),
        values,
    })
}

/// Decodes an ABI-encoded argument block (no selector) into a tuple value
pub fn decode_params(params: &[Param], data: &[u8]) -> Result<ArgumentValue, DecodeError> {
    Decoder::new(data, 0).decode_params(params)
}

struct Decoder<'a> {
    data: &'a [u8],
    /// Added to every reported offset so errors point into the caller's buffer
    base: usize,
    param: usize,
    /// Values left to decode. Offsets may point at shared tails, so without a
    /// cap a small buffer could expand into an arbitrarily large tree.
    budget: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            base,
            param: 0,
            budget: data.len().saturating_add(BASE_DECODE_BUDGET),
        }
    }

    /// Charges `cost` values against the budget
    fn charge(&mut self, at: usize, cost: usize) -> Result<(), DecodeError> {
        match self.budget.checked_sub(cost) {
            Some(left) => {
                self.budget = left;
                Ok(())
            }
            None => Err(self.corrupt(at, Corruption::Aliased)),
        }
    }

    fn corrupt(&self, at: usize, kind: Corruption) -> DecodeError {
        DecodeError::Corrupt {
            param: self.param,
            offset: self.base.saturating_add(at),
            kind,
        }
    }

    fn word(&self, at: usize) -> Result<&'a [u8; WORD], DecodeError> {
        at.checked_add(WORD)
            .and_then(|end| self.data.get(at..end))
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| self.corrupt(at, Corruption::Truncated))
    }

    /// Reads a word that must fit a `usize`, reporting `kind` otherwise
    fn read_usize(&self, at: usize, kind: Corruption) -> Result<usize, DecodeError> {
        let value = U256::from_be_bytes(*self.word(at)?);
        usize::try_from(value).map_err(|_| self.corrupt(at, kind))
    }

    fn decode_params(&mut self, params: &[Param]) -> Result<ArgumentValue, DecodeError> {
        let mut head = 0usize;
        let mut values = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            self.param = index;
            trace!(index, ty = %param.ty, head, "decoding parameter");
            values.push(self.decode_slot(&param.ty, 0, head)?);
            head = head.saturating_add(param.ty.head_size());
        }
        Ok(ArgumentValue::Tuple(values))
    }

    /// Decodes a sequence of values laid out as one scope starting at `start`
    fn decode_sequence<'t>(
        &mut self,
        types: impl Iterator<Item = &'t ParamType>,
        start: usize,
    ) -> Result<Vec<ArgumentValue>, DecodeError> {
        let mut head = start;
        let mut values = Vec::new();
        for ty in types {
            values.push(self.decode_slot(ty, start, head)?);
            head = head.saturating_add(ty.head_size());
        }
        Ok(values)
    }

    /// Decodes the value whose head slot is at `head` inside the scope at `scope`
    fn decode_slot(&mut self, ty: &ParamType, scope: usize, head: usize) -> Result<ArgumentValue, DecodeError> {
        if !ty.is_dynamic() {
            return self.decode_value(ty, head);
        }
        let offset = self.read_usize(head, Corruption::OffsetOutOfRange)?;
        let target = scope
            .checked_add(offset)
            .filter(|target| *target < self.data.len())
            .ok_or_else(|| self.corrupt(head, Corruption::OffsetOutOfRange))?;
        self.decode_value(ty, target)
    }

    fn decode_value(&mut self, ty: &ParamType, at: usize) -> Result<ArgumentValue, DecodeError> {
        self.charge(at, 1)?;
        match ty {
            ParamType::Address => {
                let word = self.word(at)?;
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(self.corrupt(at, Corruption::DirtyPadding));
                }
                Ok(ArgumentValue::Address(Address::from_slice(&word[12..])))
            }
            ParamType::Uint(bits) => {
                let value = U256::from_be_bytes(*self.word(at)?);
                if value.bit_len() > *bits {
                    return Err(self.corrupt(at, Corruption::DirtyPadding));
                }
                Ok(ArgumentValue::Uint(value, *bits))
            }
            ParamType::Int(bits) => {
                let raw = U256::from_be_bytes(*self.word(at)?);
                if raw != sign_extend(raw, *bits) {
                    return Err(self.corrupt(at, Corruption::DirtyPadding));
                }
                Ok(ArgumentValue::Int(I256::from_raw(raw), *bits))
            }
            ParamType::Bool => {
                let word = self.word(at)?;
                if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                    return Err(self.corrupt(at, Corruption::InvalidBool));
                }
                Ok(ArgumentValue::Bool(word[31] == 1))
            }
            ParamType::FixedBytes(size) => {
                let word = self.word(at)?;
                if word[*size..].iter().any(|b| *b != 0) {
                    return Err(self.corrupt(at, Corruption::DirtyPadding));
                }
                Ok(ArgumentValue::FixedBytes(word[..*size].to_vec()))
            }
            ParamType::Bytes => Ok(ArgumentValue::Bytes(self.read_bytes(at)?.to_vec())),
            ParamType::String => {
                let bytes = self.read_bytes(at)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| self.corrupt(at + WORD, Corruption::InvalidUtf8))?;
                Ok(ArgumentValue::String(text.to_string()))
            }
            ParamType::Array(inner) => {
                let len = self.read_usize(at, Corruption::LengthOverflow)?;
                let body = at + WORD;
                self.check_capacity(at, body, inner, len)?;
                let items = self.decode_sequence(iter::repeat_n(inner.as_ref(), len), body)?;
                Ok(ArgumentValue::Array(items))
            }
            ParamType::FixedArray(inner, len) => {
                self.check_capacity(at, at, inner, *len)?;
                let items = self.decode_sequence(iter::repeat_n(inner.as_ref(), *len), at)?;
                Ok(ArgumentValue::Array(items))
            }
            ParamType::Tuple(members) => {
                let items = self.decode_sequence(members.iter(), at)?;
                Ok(ArgumentValue::Tuple(items))
            }
        }
    }

    /// Length-prefixed byte payload starting at `at`, charged one value per word
    fn read_bytes(&mut self, at: usize) -> Result<&'a [u8], DecodeError> {
        let len = self.read_usize(at, Corruption::LengthOverflow)?;
        let start = at + WORD;
        let bytes = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| self.corrupt(at, Corruption::LengthOverflow))?;
        self.charge(at, len / WORD)?;
        Ok(bytes)
    }

    /// Rejects element counts whose heads cannot fit in the remaining bytes
    fn check_capacity(&self, at: usize, body: usize, inner: &ParamType, len: usize) -> Result<(), DecodeError> {
        let remaining = self.data.len().saturating_sub(body);
        let needed = len.checked_mul(inner.head_size().max(1));
        match needed {
            Some(needed) if needed <= remaining => Ok(()),
            _ => Err(self.corrupt(at, Corruption::LengthOverflow)),
        }
    }
}

/// Sign-extends the low `bits` of `raw` to the full 256-bit word
fn sign_extend(raw: U256, bits: usize) -> U256 {
    if bits >= 256 {
        return raw;
    }
    let mask = (U256::from(1u8) << bits) - U256::from(1u8);
    let low = raw & mask;
    if low.bit(bits - 1) { low | !mask } else { low }
}
