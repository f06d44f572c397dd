//! EIP-712 typed data decoding
//!
//! Typed data arrives as JSON (`types`, `primaryType`, `domain`, `message`).
//! The primary type is expanded into the same [`Param`] schema used for calldata
//! and the message is converted into an [`ArgumentValue`] tree, so the rendering
//! pipeline treats both inputs identically.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::{Address, I256, Sign, U256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::abi_decoder::{ArgumentValue, DecodedArguments};
use crate::error::{DecodeError, ParseErrorKind};
use crate::signature::{MAX_TYPE_DEPTH, Param, ParamType, elementary_type, split_array_suffixes};

/// A field declaration inside an EIP-712 struct type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// The EIP-712 signing domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_chain_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// An EIP-712 typed data document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    #[serde(default)]
    pub domain: TypedDomain,
    pub message: Value,
}

impl TypedData {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Chain ids show up as JSON numbers, decimal strings or hex strings
fn deserialize_chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid chain id {n}"))),
        Some(Value::String(s)) => parse_u256(&s)
            .and_then(|v| u64::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid chain id {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("invalid chain id {other}"))),
    }
}

/// Expands the primary type and converts the message
///
/// # Returns
/// * `Ok(DecodedArguments)` named after the primary type, without a selector
/// * `Err(DecodeError)` for unknown or self-referencing types, excessive
///   nesting, or message values that do not match their declared type
pub fn decode_typed_data(data: &TypedData) -> Result<DecodedArguments, DecodeError> {
    let mut expander = TypeExpander {
        types: &data.types,
        stack: Vec::new(),
        remaining: MAX_TYPED_FIELDS,
    };
    let params = expander.struct_fields(&data.primary_type)?;
    debug!(
        primary_type = %data.primary_type,
        fields = params.len(),
        "expanded typed data schema"
    );
    let values = convert_struct(&params, &data.message, "message")?;
    Ok(DecodedArguments {
        name: data.primary_type.clone(),
        selector: None,
        params,
        values,
    })
}

/// Upper bound on fields in an expanded schema. Struct types may be shared
/// by several fields, so a handful of declarations can expand exponentially.
pub const MAX_TYPED_FIELDS: usize = 1024;

struct TypeExpander<'a> {
    types: &'a BTreeMap<String, Vec<TypedField>>,
    stack: Vec<&'a str>,
    /// Fields left before the schema counts as too complex
    remaining: usize,
}

impl<'a> TypeExpander<'a> {
    fn struct_fields(&mut self, name: &'a str) -> Result<Vec<Param>, DecodeError> {
        if self.stack.contains(&name) {
            return Err(DecodeError::RecursiveType(name.to_string()));
        }
        if self.stack.len() >= MAX_TYPE_DEPTH {
            return Err(DecodeError::DepthExceeded(MAX_TYPE_DEPTH));
        }
        let types = self.types;
        let fields = types
            .get(name)
            .ok_or_else(|| DecodeError::UnknownType(name.to_string()))?;

        self.stack.push(name);
        let params = fields
            .iter()
            .map(|field| self.field(field))
            .collect::<Result<Vec<_>, _>>();
        self.stack.pop();
        params
    }

    fn field(&mut self, field: &'a TypedField) -> Result<Param, DecodeError> {
        self.remaining = self
            .remaining
            .checked_sub(1)
            .ok_or(DecodeError::TooComplex(MAX_TYPED_FIELDS))?;
        let types = self.types;
        let (base, dims) = split_array_suffixes(&field.ty)?;
        let mut param = if let Some((key, _)) = types.get_key_value(base) {
            Param::tuple(self.struct_fields(key)?)
        } else {
            match elementary_type(base) {
                Some(ty) => Param::new(ty),
                None => return Err(DecodeError::UnknownType(base.to_string())),
            }
        };
        if self.stack.len() + dims.len() > MAX_TYPE_DEPTH {
            return Err(DecodeError::Type(crate::error::ParseError {
                kind: ParseErrorKind::NestingTooDeep,
                fragment: field.ty.clone(),
                position: base.len(),
            }));
        }
        for dim in dims {
            param = param.into_array(dim);
        }
        Ok(param.with_name(field.name.clone()))
    }
}

fn invalid(path: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::TypedData {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn convert_struct(fields: &[Param], value: &Value, path: &str) -> Result<ArgumentValue, DecodeError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(path, "expected an object"))?;
    let values = fields
        .iter()
        .map(|field| {
            let name = field.name.as_deref().unwrap_or_default();
            let field_path = format!("{path}.{name}");
            let member = object
                .get(name)
                .ok_or_else(|| invalid(&field_path, "missing field"))?;
            convert(field, member, &field_path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ArgumentValue::Tuple(values))
}

fn convert(param: &Param, value: &Value, path: &str) -> Result<ArgumentValue, DecodeError> {
    convert_type(&param.ty, &param.components, value, path)
}

fn convert_type(ty: &ParamType, components: &[Param], value: &Value, path: &str) -> Result<ArgumentValue, DecodeError> {
    match ty {
        ParamType::Address => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid(path, "expected an address string"))?;
            Address::from_str(text)
                .map(ArgumentValue::Address)
                .map_err(|_| invalid(path, format!("invalid address {text:?}")))
        }
        ParamType::Uint(bits) => {
            let parsed = match value {
                Value::Number(n) => n.as_u64().map(U256::from),
                Value::String(s) => parse_u256(s),
                _ => None,
            }
            .ok_or_else(|| invalid(path, "expected an unsigned integer"))?;
            if parsed.bit_len() > *bits {
                return Err(invalid(path, format!("value does not fit in uint{bits}")));
            }
            Ok(ArgumentValue::Uint(parsed, *bits))
        }
        ParamType::Int(bits) => {
            let (sign, abs) = match value {
                Value::Number(n) => n.as_i64().map(|v| {
                    let sign = if v < 0 { Sign::Negative } else { Sign::Positive };
                    (sign, U256::from(v.unsigned_abs()))
                }),
                Value::String(s) => parse_signed(s),
                _ => None,
            }
            .ok_or_else(|| invalid(path, "expected an integer"))?;
            // |min| = 2^(bits-1), |max| = 2^(bits-1) - 1
            let limit = U256::from(1u8) << (bits - 1);
            let fits = match sign {
                Sign::Negative => abs <= limit,
                Sign::Positive => abs < limit,
            };
            let parsed = I256::checked_from_sign_and_abs(sign, abs)
                .filter(|_| fits)
                .ok_or_else(|| invalid(path, format!("value does not fit in int{bits}")))?;
            Ok(ArgumentValue::Int(parsed, *bits))
        }
        ParamType::Bool => value
            .as_bool()
            .map(ArgumentValue::Bool)
            .ok_or_else(|| invalid(path, "expected a boolean")),
        ParamType::String => value
            .as_str()
            .map(|s| ArgumentValue::String(s.to_string()))
            .ok_or_else(|| invalid(path, "expected a string")),
        ParamType::Bytes => decode_hex(value, path).map(ArgumentValue::Bytes),
        ParamType::FixedBytes(size) => {
            let mut bytes = decode_hex(value, path)?;
            if bytes.len() > *size {
                return Err(invalid(path, format!("more than {size} bytes")));
            }
            bytes.resize(*size, 0);
            Ok(ArgumentValue::FixedBytes(bytes))
        }
        ParamType::Array(inner) => convert_array(inner, None, components, value, path),
        ParamType::FixedArray(inner, len) => convert_array(inner, Some(*len), components, value, path),
        ParamType::Tuple(_) => convert_struct(components, value, path),
    }
}

fn convert_array(
    inner: &ParamType,
    len: Option<usize>,
    components: &[Param],
    value: &Value,
    path: &str,
) -> Result<ArgumentValue, DecodeError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(path, "expected an array"))?;
    if let Some(len) = len {
        if items.len() != len {
            return Err(invalid(path, format!("expected {len} elements, found {}", items.len())));
        }
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert_type(inner, components, item, &format!("{path}[{i}]")))
        .collect::<Result<Vec<_>, _>>()
        .map(ArgumentValue::Array)
}

fn decode_hex(value: &Value, path: &str) -> Result<Vec<u8>, DecodeError> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(path, "expected a hex string"))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| invalid(path, format!("invalid hex: {e}")))
}

/// Decimal or `0x`-prefixed hexadecimal unsigned integer
pub(crate) fn parse_u256(text: &str) -> Option<U256> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16).ok(),
        Some(_) => None,
        None if !text.is_empty() && text.bytes().all(|c| c.is_ascii_digit()) => {
            U256::from_str_radix(text, 10).ok()
        }
        None => None,
    }
}

/// Optionally negative integer, as sign and magnitude
pub(crate) fn parse_signed(text: &str) -> Option<(Sign, U256)> {
    let text = text.trim();
    match text.strip_prefix('-') {
        Some(rest) => parse_u256(rest).map(|abs| (Sign::Negative, abs)),
        None => parse_u256(text).map(|abs| (Sign::Positive, abs)),
    }
}
