//! Visibility rule evaluation
//!
//! Rules resolve values with the same path semantics as display fields.
//! Literals in conditions are compared according to the kind of the resolved
//! value: integers by numeric value, addresses and bytes by their bytes,
//! strings and booleans exactly.

use std::cmp::Ordering;

use alloy_primitives::{Address, Sign, U256};
use serde_json::Value;

use crate::abi_decoder::ArgumentValue;
use crate::eip712::parse_signed;
use crate::engine::RenderContext;
use crate::error::RenderError;
use crate::types::{VisibleCondition, VisibleRule};

const RULE_PREFIX: &str = "#/visibilityRules/";

/// Whether a field with `rule` at `field_path` is shown
///
/// A missing rule means visible. Undefined or cyclic named rules are fatal.
pub(crate) fn is_visible(
    ctx: &RenderContext<'_>,
    rule: Option<&VisibleRule>,
    field_path: Option<&str>,
) -> Result<bool, RenderError> {
    match rule {
        None => Ok(true),
        Some(rule) => evaluate(ctx, rule, field_path, &mut Vec::new()),
    }
}

fn evaluate<'r>(
    ctx: &RenderContext<'r>,
    rule: &VisibleRule,
    field_path: Option<&str>,
    chain: &mut Vec<String>,
) -> Result<bool, RenderError> {
    match rule {
        VisibleRule::Bool(visible) => Ok(*visible),
        VisibleRule::Named(name) => match name.as_str() {
            "always" | "optional" => Ok(true),
            "never" => Ok(false),
            reference => {
                let key = reference.strip_prefix(RULE_PREFIX).unwrap_or(reference);
                if chain.iter().any(|seen| seen == key) {
                    return Err(RenderError::ReferenceCycle(key.to_string()));
                }
                let limit = ctx.options.max_reference_depth;
                if chain.len() >= limit {
                    return Err(RenderError::ReferenceDepthExceeded {
                        name: key.to_string(),
                        limit,
                    });
                }
                let target = ctx
                    .descriptor
                    .display
                    .visibility_rules
                    .get(key)
                    .ok_or_else(|| RenderError::UndefinedVisibilityRule(reference.to_string()))?;
                chain.push(key.to_string());
                let visible = evaluate(ctx, target, field_path, chain);
                chain.pop();
                visible
            }
        },
        VisibleRule::Condition(condition) => evaluate_condition(ctx, condition, field_path),
    }
}

fn evaluate_condition(
    ctx: &RenderContext<'_>,
    condition: &VisibleCondition,
    field_path: Option<&str>,
) -> Result<bool, RenderError> {
    let path = condition
        .path
        .as_deref()
        .or(field_path)
        .ok_or_else(|| RenderError::MissingPath {
            label: "visibility condition".to_string(),
        })?;
    let value = ctx.resolve(path)?;

    if let Some(excluded) = &condition.if_not_in {
        if excluded.iter().any(|literal| matches_literal(&value, literal)) {
            return Ok(false);
        }
    }
    if let Some(required) = &condition.must_match {
        if !required.iter().any(|literal| matches_literal(&value, literal)) {
            return Ok(false);
        }
    }
    if let Some(bound) = &condition.greater_than {
        if compare_literal(&value, bound) != Some(Ordering::Greater) {
            return Ok(false);
        }
    }
    if let Some(bound) = &condition.less_than {
        if compare_literal(&value, bound) != Some(Ordering::Less) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Type-aware equality between a decoded value and a JSON literal
pub(crate) fn matches_literal(value: &ArgumentValue, literal: &Value) -> bool {
    match value {
        ArgumentValue::Uint(..) | ArgumentValue::Int(..) => {
            compare_literal(value, literal) == Some(Ordering::Equal)
        }
        ArgumentValue::Address(address) => literal
            .as_str()
            .and_then(|s| s.trim().parse::<Address>().ok())
            .is_some_and(|parsed| parsed == *address),
        ArgumentValue::Bool(flag) => match literal {
            Value::Bool(b) => b == flag,
            Value::String(s) => s.trim().parse::<bool>().is_ok_and(|b| b == *flag),
            _ => false,
        },
        ArgumentValue::String(text) => literal.as_str() == Some(text.as_str()),
        ArgumentValue::Bytes(bytes) | ArgumentValue::FixedBytes(bytes) => literal
            .as_str()
            .and_then(|s| {
                let s = s.trim();
                hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
            })
            .is_some_and(|parsed| parsed == *bytes),
        ArgumentValue::Array(_) | ArgumentValue::Tuple(_) => false,
    }
}

/// Numeric ordering of an integer value against a JSON number or numeric string
pub(crate) fn compare_literal(value: &ArgumentValue, literal: &Value) -> Option<Ordering> {
    let lhs = match value {
        ArgumentValue::Uint(v, _) => (Sign::Positive, *v),
        ArgumentValue::Int(v, _) => v.into_sign_and_abs(),
        _ => return None,
    };
    let rhs = match literal {
        Value::Number(n) => n
            .as_u64()
            .map(|v| (Sign::Positive, U256::from(v)))
            .or_else(|| {
                n.as_i64().map(|v| {
                    let sign = if v < 0 { Sign::Negative } else { Sign::Positive };
                    (sign, U256::from(v.unsigned_abs()))
                })
            })?,
        Value::String(s) => parse_signed(s)?,
        _ => return None,
    };
    Some(compare_signed(lhs, rhs))
}

fn compare_signed(lhs: (Sign, U256), rhs: (Sign, U256)) -> Ordering {
    let negative = |(sign, abs): (Sign, U256)| sign == Sign::Negative && !abs.is_zero();
    match (negative(lhs), negative(rhs)) {
        (false, false) => lhs.1.cmp(&rhs.1),
        (true, true) => rhs.1.cmp(&lhs.1),
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{I256, address};
    use serde_json::json;

    fn uint(v: u64) -> ArgumentValue {
        ArgumentValue::Uint(U256::from(v), 256)
    }

    #[test]
    fn test_numeric_literals() {
        assert!(matches_literal(&uint(0), &json!(0)));
        assert!(matches_literal(&uint(0), &json!("0")));
        assert!(matches_literal(&uint(255), &json!("0xff")));
        assert!(!matches_literal(&uint(1), &json!("one")));
        assert!(!matches_literal(&uint(1), &json!(true)));

        let negative = ArgumentValue::Int(I256::try_from(-5i64).unwrap(), 256);
        assert!(matches_literal(&negative, &json!(-5)));
        assert!(matches_literal(&negative, &json!("-5")));
        assert_eq!(compare_literal(&negative, &json!(0)), Some(Ordering::Less));
        assert_eq!(compare_literal(&negative, &json!(-10)), Some(Ordering::Greater));
        assert_eq!(compare_literal(&uint(10), &json!("-0")), Some(Ordering::Greater));
    }

    #[test]
    fn test_address_literals_ignore_case() {
        let value = ArgumentValue::Address(address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(matches_literal(&value, &json!("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")));
        assert!(matches_literal(&value, &json!("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED")));
        assert!(!matches_literal(&value, &json!("0x0000000000000000000000000000000000000000")));
        assert!(!matches_literal(&value, &json!(0)));
    }

    #[test]
    fn test_other_literals() {
        assert!(matches_literal(&ArgumentValue::Bool(true), &json!(true)));
        assert!(matches_literal(&ArgumentValue::Bool(false), &json!("false")));
        assert!(matches_literal(&ArgumentValue::String("a".into()), &json!("a")));
        assert!(matches_literal(&ArgumentValue::Bytes(vec![0xab]), &json!("0xAB")));
        assert!(!matches_literal(&ArgumentValue::Array(vec![]), &json!([])));
    }
}
