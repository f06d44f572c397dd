//! Function signature parsing
//!
//! Turns human-written signature strings such as
//! `swap((address tokenIn, uint24 fee) calldata params, uint256[] amounts)` into a
//! structured parameter schema, its canonical text and 4-byte selector.
//!
//! # Canonical form
//!
//! Parameter names, data locations and whitespace are dropped, tuples print as
//! `(..)`, and the bare `uint` / `int` aliases are always written with their
//! explicit `256` width. The selector is the first four bytes of the keccak-256
//! hash of that canonical text.
//!
//! # Example
//!
//! ```ignore
//! use visualsign_erc7730::signature::parse_signature;
//!
//! let sig = parse_signature("transfer(address to, uint amount)")?;
//! assert_eq!(sig.canonical(), "transfer(address,uint256)");
//! assert_eq!(sig.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
//! ```

use std::fmt;
use std::str::FromStr;

use alloy_primitives::keccak256;

use crate::error::{ParseError, ParseErrorKind};

/// Maximum nesting of tuples and array suffixes accepted by the parsers
pub const MAX_TYPE_DEPTH: usize = 32;

const DATA_LOCATIONS: [&str; 3] = ["memory", "calldata", "storage"];

/// Structured ABI type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    /// Unsigned integer with its bit width (8..=256, multiple of 8)
    Uint(usize),
    /// Signed integer with its bit width (8..=256, multiple of 8)
    Int(usize),
    Bool,
    /// Dynamic `bytes`
    Bytes,
    /// `bytesN` with N in 1..=32
    FixedBytes(usize),
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Whether the encoding of this type lives in the tail section
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(members) => members.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Number of bytes this type occupies in the head of its enclosing scope
    ///
    /// Dynamic types take a single 32-byte offset word. Static tuples and static
    /// fixed arrays are laid out inline.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            ParamType::FixedArray(inner, len) => inner.head_size().saturating_mul(*len),
            ParamType::Tuple(members) => members
                .iter()
                .fold(0usize, |acc, member| acc.saturating_add(member.head_size())),
            _ => 32,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Uint(bits) => write!(f, "uint{bits}"),
            ParamType::Int(bits) => write!(f, "int{bits}"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{size}"),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{inner}[]"),
            ParamType::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
            ParamType::Tuple(members) => {
                f.write_str("(")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A parameter: its type plus the names needed to address it from descriptor paths
///
/// For tuples, and arrays whose elements are tuples, `components` lists the tuple
/// members in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: ParamType,
    pub components: Vec<Param>,
}

impl Param {
    /// Creates an unnamed parameter of an elementary type
    pub fn new(ty: ParamType) -> Self {
        Self {
            name: None,
            ty,
            components: Vec::new(),
        }
    }

    /// Creates an unnamed tuple parameter from its members
    pub fn tuple(components: Vec<Param>) -> Self {
        let ty = ParamType::Tuple(components.iter().map(|c| c.ty.clone()).collect());
        Self {
            name: None,
            ty,
            components,
        }
    }

    /// Wraps this parameter in an array suffix, keeping its name and components
    pub fn into_array(self, len: Option<usize>) -> Self {
        let ty = match len {
            Some(len) => ParamType::FixedArray(Box::new(self.ty), len),
            None => ParamType::Array(Box::new(self.ty)),
        };
        Self {
            name: self.name,
            ty,
            components: self.components,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A parsed function signature
///
/// Immutable once parsed; cheap to share between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
    canonical: String,
    selector: [u8; 4],
}

impl Signature {
    fn new(name: String, params: Vec<Param>) -> Self {
        let types = params
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let canonical = format!("{name}({types})");
        let hash = keccak256(canonical.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        Self {
            name,
            params,
            canonical,
            selector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Canonical `name(type,...)` text the selector is derived from
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Parameter types as a single tuple type
    pub fn as_tuple(&self) -> ParamType {
        ParamType::Tuple(self.params.iter().map(|p| p.ty.clone()).collect())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_signature(s)
    }
}

/// Parses a full function signature
pub fn parse_signature(input: &str) -> Result<Signature, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_ws();
    let start = parser.pos;
    let name = parser.identifier();
    if name.is_empty() || name.as_bytes()[0].is_ascii_digit() {
        return Err(parser.unexpected_at(start));
    }
    parser.skip_ws();
    match parser.peek() {
        Some(b'(') => parser.pos += 1,
        Some(_) => return Err(parser.unexpected()),
        None => return Err(parser.error(ParseErrorKind::UnexpectedEnd)),
    }
    let params = parser.param_list()?;
    parser.finish()?;
    Ok(Signature::new(name.to_string(), params))
}

/// Parses a single type string such as `(uint256,address)[]` or `bytes32`
pub fn parse_type(input: &str) -> Result<Param, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_ws();
    let param = parser.typed()?;
    parser.finish()?;
    Ok(param)
}

/// Resolves an elementary type name such as `uint96` or `bytes4`
pub fn elementary_type(name: &str) -> Option<ParamType> {
    elementary(name).ok()
}

/// Splits trailing array suffixes off a type string
///
/// Returns the base type text and the array dimensions ordered from the
/// innermost to the outermost, `None` marking a dynamic dimension. So
/// `Person[2][]` yields `("Person", [Some(2), None])`.
pub fn split_array_suffixes(input: &str) -> Result<(&str, Vec<Option<usize>>), ParseError> {
    let mut rest = input.trim_end();
    let mut dims = Vec::new();
    while let Some(inner) = rest.strip_suffix(']') {
        let open = inner.rfind('[').ok_or_else(|| ParseError {
            kind: ParseErrorKind::UnbalancedParenthesis,
            fragment: input.to_string(),
            position: inner.len(),
        })?;
        let digits = inner[open + 1..].trim();
        let dim = if digits.is_empty() {
            None
        } else {
            Some(array_length(digits).map_err(|kind| ParseError {
                kind,
                fragment: digits.to_string(),
                position: open + 1,
            })?)
        };
        dims.push(dim);
        if dims.len() > MAX_TYPE_DEPTH {
            return Err(ParseError {
                kind: ParseErrorKind::NestingTooDeep,
                fragment: input.to_string(),
                position: open,
            });
        }
        rest = inner[..open].trim_end();
    }
    dims.reverse();
    Ok((rest.trim_start(), dims))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
        {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(kind, self.pos, self.pos + 1)
    }

    fn error_at(&self, kind: ParseErrorKind, start: usize, end: usize) -> ParseError {
        let end = end.min(self.input.len());
        let start = start.min(end);
        ParseError {
            kind,
            fragment: self.input.get(start..end).unwrap_or_default().to_string(),
            position: start,
        }
    }

    fn unexpected(&self) -> ParseError {
        self.unexpected_at(self.pos)
    }

    fn unexpected_at(&self, position: usize) -> ParseError {
        if position >= self.input.len() {
            self.error_at(ParseErrorKind::UnexpectedEnd, position, position)
        } else {
            // Report the whole UTF-8 character, not a lone byte
            let len = self.input[position..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.error_at(
                ParseErrorKind::UnexpectedCharacter,
                position,
                position + len,
            )
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos < self.input.len() {
            let kind = match self.peek() {
                Some(b')') | Some(b']') => ParseErrorKind::UnbalancedParenthesis,
                _ => ParseErrorKind::TrailingInput,
            };
            return Err(self.error_at(kind, self.pos, self.input.len()));
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_TYPE_DEPTH {
            return Err(self.error(ParseErrorKind::NestingTooDeep));
        }
        Ok(())
    }

    /// Parses parameters up to and including the closing parenthesis
    fn param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        self.enter()?;
        let mut params = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(params);
        }
        loop {
            params.push(self.param()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.error(ParseErrorKind::UnbalancedParenthesis)),
            }
        }
        self.depth -= 1;
        Ok(params)
    }

    /// A type followed by an optional data location and an optional name
    fn param(&mut self) -> Result<Param, ParseError> {
        self.skip_ws();
        let mut param = self.typed()?;
        loop {
            self.skip_ws();
            let start = self.pos;
            let word = self.identifier();
            if word.is_empty() {
                break;
            }
            if DATA_LOCATIONS.contains(&word) && param.name.is_none() {
                continue;
            }
            if param.name.is_some() || word.as_bytes()[0].is_ascii_digit() {
                return Err(self.unexpected_at(start));
            }
            param.name = Some(word.to_string());
        }
        Ok(param)
    }

    /// A base type followed by any number of array suffixes
    fn typed(&mut self) -> Result<Param, ParseError> {
        let start = self.pos;
        let mut param = match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                Param::tuple(self.param_list()?)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.identifier();
                if word == "tuple" {
                    self.skip_ws();
                    if self.peek() != Some(b'(') {
                        return Err(self.unexpected());
                    }
                    self.pos += 1;
                    Param::tuple(self.param_list()?)
                } else {
                    let ty = elementary(word)
                        .map_err(|kind| self.error_at(kind, start, self.pos))?;
                    Param::new(ty)
                }
            }
            Some(_) => return Err(self.unexpected()),
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
        };

        let mut suffixes = 0;
        loop {
            let before = self.pos;
            self.skip_ws();
            if self.peek() != Some(b'[') {
                self.pos = before;
                break;
            }
            let open = self.pos;
            self.pos += 1;
            suffixes += 1;
            if self.depth + suffixes > MAX_TYPE_DEPTH {
                return Err(self.error_at(ParseErrorKind::NestingTooDeep, open, open + 1));
            }
            self.skip_ws();
            let digits = self.digits();
            let digits_at = self.pos - digits.len();
            self.skip_ws();
            match self.peek() {
                Some(b']') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.error_at(ParseErrorKind::UnbalancedParenthesis, open, open + 1)),
            }
            let len = if digits.is_empty() {
                None
            } else {
                Some(
                    array_length(digits)
                        .map_err(|kind| self.error_at(kind, digits_at, digits_at + digits.len()))?,
                )
            };
            param = param.into_array(len);
        }
        Ok(param)
    }
}

fn elementary(word: &str) -> Result<ParamType, ParseErrorKind> {
    match word {
        "address" => Ok(ParamType::Address),
        "bool" => Ok(ParamType::Bool),
        "string" => Ok(ParamType::String),
        "bytes" => Ok(ParamType::Bytes),
        "uint" => Ok(ParamType::Uint(256)),
        "int" => Ok(ParamType::Int(256)),
        _ => {
            if let Some(width) = word.strip_prefix("uint") {
                integer_width(width).map(ParamType::Uint)
            } else if let Some(width) = word.strip_prefix("int") {
                integer_width(width).map(ParamType::Int)
            } else if let Some(size) = word.strip_prefix("bytes") {
                match suffix_number(size)? {
                    size @ 1..=32 => Ok(ParamType::FixedBytes(size)),
                    _ => Err(ParseErrorKind::InvalidWidth),
                }
            } else {
                Err(ParseErrorKind::UnknownType)
            }
        }
    }
}

fn integer_width(suffix: &str) -> Result<usize, ParseErrorKind> {
    match suffix_number(suffix)? {
        bits @ 8..=256 if bits % 8 == 0 => Ok(bits),
        _ => Err(ParseErrorKind::InvalidWidth),
    }
}

fn suffix_number(suffix: &str) -> Result<usize, ParseErrorKind> {
    if suffix.is_empty() || !suffix.bytes().all(|c| c.is_ascii_digit()) {
        return Err(ParseErrorKind::UnknownType);
    }
    if suffix.len() > 1 && suffix.starts_with('0') {
        return Err(ParseErrorKind::InvalidWidth);
    }
    suffix.parse().map_err(|_| ParseErrorKind::InvalidWidth)
}

fn array_length(digits: &str) -> Result<usize, ParseErrorKind> {
    if !digits.bytes().all(|c| c.is_ascii_digit()) {
        return Err(ParseErrorKind::InvalidArrayLength);
    }
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => Err(ParseErrorKind::InvalidArrayLength),
        Ok(len) => Ok(len),
    }
}
