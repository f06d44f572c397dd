//! Field paths
//!
//! Paths address either the decoded data or the transaction container:
//!
//! - `amount`, `#.amount`: a top-level parameter by name
//! - `params.recipient`, `orders.[0].maker`, `orders[-1]`: nested members and
//!   array elements; negative indexes count from the end
//! - `0.1`: positional access into tuples
//! - `@.to`, `@.from`, `@.value`, `@.chainId`: the container

use std::borrow::Cow;
use std::str::FromStr;

use alloy_primitives::{Address, U256};

use crate::abi_decoder::{ArgumentValue, DecodedArguments};
use crate::error::RenderError;
use crate::signature::Param;

/// What the data being rendered was sent with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Container {
    pub chain_id: u64,
    /// Called contract, or the EIP-712 verifying contract
    pub to: Option<Address>,
    pub from: Option<Address>,
    /// Native value attached to the call
    pub value: Option<U256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Data,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub root: PathRoot,
    pub segments: Vec<Segment>,
}

impl FromStr for FieldPath {
    type Err = RenderError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim();
        let invalid = |reason| RenderError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        let (root, rest) = if let Some(rest) = trimmed.strip_prefix("@.") {
            (PathRoot::Container, rest)
        } else if let Some(rest) = trimmed.strip_prefix("#.") {
            (PathRoot::Data, rest)
        } else if trimmed == "#" {
            (PathRoot::Data, "")
        } else if trimmed.starts_with('$') {
            return Err(invalid("descriptor paths are not supported"));
        } else {
            (PathRoot::Data, trimmed)
        };

        let mut segments = Vec::new();
        if rest.is_empty() {
            return Ok(Self { root, segments });
        }
        for part in rest.split('.') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (name, mut brackets) = part.split_at(part.find('[').unwrap_or(part.len()));
            if !name.is_empty() {
                segments.push(match name.parse::<i64>() {
                    Ok(index) => Segment::Index(index),
                    Err(_) => Segment::Field(name.to_string()),
                });
            }
            while !brackets.is_empty() {
                let inner = brackets
                    .strip_prefix('[')
                    .and_then(|b| b.split_once(']'))
                    .ok_or_else(|| invalid("unbalanced brackets"))?;
                let index = inner
                    .0
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| invalid("only single integer indexes are supported"))?;
                segments.push(Segment::Index(index));
                brackets = inner.1;
            }
        }
        Ok(Self { root, segments })
    }
}

/// Resolves a path against decoded data and its container
///
/// Fails with [`RenderError::PathNotFound`] when the path does not match the
/// actual shape of the decoded tree.
pub fn resolve<'v>(
    path: &str,
    data: &'v DecodedArguments,
    container: &Container,
) -> Result<Cow<'v, ArgumentValue>, RenderError> {
    let parsed: FieldPath = path.parse()?;
    let not_found = || RenderError::PathNotFound(path.to_string());

    if parsed.root == PathRoot::Container {
        let [Segment::Field(name)] = parsed.segments.as_slice() else {
            return Err(not_found());
        };
        let value = match name.as_str() {
            "to" => container.to.map(ArgumentValue::Address),
            "from" => container.from.map(ArgumentValue::Address),
            "value" => Some(ArgumentValue::Uint(container.value.unwrap_or_default(), 256)),
            "chainId" => Some(ArgumentValue::Uint(U256::from(container.chain_id), 256)),
            _ => None,
        };
        return value.map(Cow::Owned).ok_or_else(not_found);
    }

    let mut value = &data.values;
    let mut components: &[Param] = &data.params;
    for segment in &parsed.segments {
        match (value, segment) {
            (ArgumentValue::Tuple(items), Segment::Field(name)) => {
                let index = components
                    .iter()
                    .position(|p| p.name.as_deref() == Some(name.as_str()))
                    .ok_or_else(not_found)?;
                value = items.get(index).ok_or_else(not_found)?;
                components = &components[index].components;
            }
            (ArgumentValue::Tuple(items), Segment::Index(index)) => {
                let index = position(*index, items.len()).ok_or_else(not_found)?;
                value = &items[index];
                components = components.get(index).map_or(&[][..], |p| p.components.as_slice());
            }
            (ArgumentValue::Array(items), Segment::Index(index)) => {
                let index = position(*index, items.len()).ok_or_else(not_found)?;
                value = &items[index];
            }
            _ => return Err(not_found()),
        }
    }
    Ok(Cow::Borrowed(value))
}

fn position(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(index).ok()?
    };
    (resolved < len).then_some(resolved)
}

/// Normalized form used to match intent placeholders against rendered fields
pub(crate) fn path_key(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed.strip_prefix("#.").unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::parse_signature;
    use alloy_primitives::address;

    fn decoded() -> DecodedArguments {
        let sig = parse_signature(
            "fill((address maker, uint256[] amounts)[] orders, address recipient)",
        )
        .unwrap();
        let maker = ArgumentValue::Address(address!("1111111111111111111111111111111111111111"));
        let other = ArgumentValue::Address(address!("2222222222222222222222222222222222222222"));
        let amounts = |v: &[u64]| {
            ArgumentValue::Array(v.iter().map(|n| ArgumentValue::Uint(U256::from(*n), 256)).collect())
        };
        DecodedArguments {
            name: sig.name().to_string(),
            selector: Some(sig.selector()),
            params: sig.params().to_vec(),
            values: ArgumentValue::Tuple(vec![
                ArgumentValue::Array(vec![
                    ArgumentValue::Tuple(vec![maker, amounts(&[1, 2])]),
                    ArgumentValue::Tuple(vec![other, amounts(&[3])]),
                ]),
                ArgumentValue::Address(address!("3333333333333333333333333333333333333333")),
            ]),
        }
    }

    fn container() -> Container {
        Container {
            chain_id: 10,
            to: Some(address!("4444444444444444444444444444444444444444")),
            from: None,
            value: None,
        }
    }

    fn text(path: &str) -> String {
        resolve(path, &decoded(), &container()).unwrap().to_string()
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(
            "#.orders.[0].amounts[-1]".parse::<FieldPath>().unwrap(),
            FieldPath {
                root: PathRoot::Data,
                segments: vec![
                    Segment::Field("orders".into()),
                    Segment::Index(0),
                    Segment::Field("amounts".into()),
                    Segment::Index(-1),
                ],
            }
        );
        assert_eq!("@.to".parse::<FieldPath>().unwrap().root, PathRoot::Container);
        assert!("orders..maker".parse::<FieldPath>().is_err());
        assert!("orders.[0:2]".parse::<FieldPath>().is_err());
        assert!("orders[0".parse::<FieldPath>().is_err());
        assert!("$.metadata.token".parse::<FieldPath>().is_err());
    }

    #[test]
    fn test_resolve_named_and_indexed() {
        assert_eq!(text("recipient"), "0x3333333333333333333333333333333333333333");
        assert_eq!(text("#.orders.[1].maker"), "0x2222222222222222222222222222222222222222");
        assert_eq!(text("orders[0].amounts.[1]"), "2");
        assert_eq!(text("orders.[-1].amounts[-1]"), "3");
        assert_eq!(text("0.0.1"), "[1, 2]");
        assert_eq!(text("orders[0].1.0"), "1");
    }

    #[test]
    fn test_resolve_container() {
        assert_eq!(text("@.to"), "0x4444444444444444444444444444444444444444");
        assert_eq!(text("@.chainId"), "10");
        assert_eq!(text("@.value"), "0");
        assert!(resolve("@.from", &decoded(), &container()).is_err());
    }

    #[test]
    fn test_shape_mismatch_is_path_not_found() {
        for path in ["amount", "orders.maker", "orders[2]", "recipient.0", "@.to.0", "orders[-3]"] {
            assert_eq!(
                resolve(path, &decoded(), &container()).unwrap_err(),
                RenderError::PathNotFound(path.to_string()),
                "{path}"
            );
        }
    }

    #[test]
    fn test_path_key() {
        assert_eq!(path_key(" #.amount "), "amount");
        assert_eq!(path_key("@.to"), "@.to");
    }
}
