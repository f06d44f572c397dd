//! Value formatters, one per ERC-7730 format tag
//!
//! A value whose kind does not fit the requested format is a fatal
//! [`RenderError::IncompatibleValue`]. Missing auxiliary data (token metadata,
//! enum entries, unsupported formats) instead records a [`RenderWarning`] and
//! falls back to the raw canonical text of the value.

use std::fmt::Write as _;

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, Sign, U256};
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::abi_decoder::ArgumentValue;
use crate::eip712::parse_u256;
use crate::engine::RenderContext;
use crate::error::{RenderError, RenderWarning};
use crate::resolver::TokenMeta;
use crate::types::{FieldFormat, FormatParams};
use crate::utils::{chain_name, native_currency};

const ENUMS_PREFIX: &str = "$.metadata.enums.";
const MAPS_PREFIX: &str = "$.metadata.maps.";
const UNLIMITED: &str = "Unlimited";

/// Renders `value`, found at `path`, with the given format and parameters
pub(crate) fn render(
    ctx: &mut RenderContext<'_>,
    value: &ArgumentValue,
    format: Option<&FieldFormat>,
    params: Option<&FormatParams>,
    path: &str,
) -> Result<String, RenderError> {
    let default_params = FormatParams::default();
    let params = params.unwrap_or(&default_params);

    if let Some(label) = params
        .encryption
        .as_ref()
        .and_then(|e| e.fallback_label.as_ref())
    {
        return Ok(label.clone());
    }
    if let Some(mapped) = mapped_value(ctx, value, params) {
        return Ok(mapped);
    }

    let Some(format) = format else {
        return Ok(value.to_string());
    };
    let incompatible = || RenderError::IncompatibleValue {
        path: path.to_string(),
        format: format.as_str().to_string(),
        found: value.kind(),
    };

    match format {
        FieldFormat::Raw => Ok(value.to_string()),
        FieldFormat::Address => match value {
            ArgumentValue::Address(address) => Ok(address.to_checksum(None)),
            _ => Err(incompatible()),
        },
        FieldFormat::AddressName => match value {
            ArgumentValue::Address(address) => Ok(ctx
                .address_book
                .label(address)
                .map(str::to_string)
                .unwrap_or_else(|| address.to_checksum(None))),
            _ => Err(incompatible()),
        },
        FieldFormat::Number => match value {
            ArgumentValue::Uint(..) | ArgumentValue::Int(..) => Ok(value.to_string()),
            _ => Err(incompatible()),
        },
        FieldFormat::Amount => {
            let (sign, abs) = signed_parts(value).ok_or_else(incompatible)?;
            match params.decimals {
                Some(decimals) => Ok(scaled(ctx, sign, abs, decimals).unwrap_or_else(|| value.to_string())),
                None => Ok(value.to_string()),
            }
        }
        FieldFormat::TokenAmount => token_amount(ctx, value, params, path, format),
        FieldFormat::Date => {
            signed_parts(value).ok_or_else(incompatible)?;
            Ok(date(ctx, value))
        }
        FieldFormat::Boolean => match value {
            ArgumentValue::Bool(flag) => Ok(flag.to_string()),
            _ => Err(incompatible()),
        },
        FieldFormat::Enum => {
            signed_parts(value).ok_or_else(incompatible)?;
            Ok(enum_label(ctx, value, params))
        }
        FieldFormat::TokenTicker => match value {
            ArgumentValue::Address(address) => {
                let chain_id = token_chain_id(ctx, params, format)?;
                Ok(lookup_token(ctx, chain_id, *address, params)
                    .map(|meta| meta.symbol)
                    .unwrap_or_else(|| value.to_string()))
            }
            _ => Err(incompatible()),
        },
        FieldFormat::ChainId => match value {
            ArgumentValue::Uint(id, _) => Ok(u64::try_from(*id)
                .map(chain_name)
                .unwrap_or_else(|_| format!("Chain {id}"))),
            _ => Err(incompatible()),
        },
        FieldFormat::Calldata
        | FieldFormat::NftName
        | FieldFormat::Duration
        | FieldFormat::Unit
        | FieldFormat::Unknown(_) => {
            ctx.warn(RenderWarning::UnsupportedFormat {
                format: format.as_str().to_string(),
                path: path.to_string(),
            });
            Ok(value.to_string())
        }
    }
}

fn mapped_value(ctx: &RenderContext<'_>, value: &ArgumentValue, params: &FormatParams) -> Option<String> {
    let reference = params.map_reference.as_deref()?;
    let key = reference.strip_prefix(MAPS_PREFIX).unwrap_or(reference);
    ctx.descriptor
        .metadata
        .maps
        .get(key)?
        .entries
        .get(&value.to_string())
        .cloned()
}

fn signed_parts(value: &ArgumentValue) -> Option<(Sign, U256)> {
    match value {
        ArgumentValue::Uint(v, _) => Some((Sign::Positive, *v)),
        ArgumentValue::Int(v, _) => Some(v.into_sign_and_abs()),
        _ => None,
    }
}

/// `abs / 10^decimals` with exactly `decimals` fractional digits
fn scaled(ctx: &mut RenderContext<'_>, sign: Sign, abs: U256, decimals: u8) -> Option<String> {
    let digits = if decimals == 0 {
        abs.to_string()
    } else {
        match format_units(abs, decimals) {
            Ok(digits) => digits,
            Err(_) => {
                ctx.warn(RenderWarning::InvalidDecimals {
                    value: abs.to_string(),
                    decimals,
                });
                return None;
            }
        }
    };
    let negative = sign == Sign::Negative && !abs.is_zero();
    Some(if negative { format!("-{digits}") } else { digits })
}

fn token_amount(
    ctx: &mut RenderContext<'_>,
    value: &ArgumentValue,
    params: &FormatParams,
    path: &str,
    format: &FieldFormat,
) -> Result<String, RenderError> {
    let (sign, abs) = signed_parts(value).ok_or_else(|| RenderError::IncompatibleValue {
        path: path.to_string(),
        format: format.as_str().to_string(),
        found: value.kind(),
    })?;
    let chain_id = token_chain_id(ctx, params, format)?;

    let token = match params.token_path.as_deref() {
        Some(token_path) => match ctx.resolve(token_path)?.as_ref() {
            ArgumentValue::Address(address) => Some(*address),
            other => {
                return Err(RenderError::IncompatibleValue {
                    path: token_path.to_string(),
                    format: format.as_str().to_string(),
                    found: other.kind(),
                });
            }
        },
        None => params.token.or(ctx.container.to),
    };
    let Some(token) = token else {
        ctx.warn(RenderWarning::TokenAddressUnavailable {
            path: path.to_string(),
        });
        return Ok(value.to_string());
    };
    let Some(meta) = lookup_token(ctx, chain_id, token, params) else {
        return Ok(value.to_string());
    };

    if let Some(threshold) = params.threshold.as_ref().and_then(threshold_value) {
        if sign == Sign::Positive && abs >= threshold {
            let message = params.message.as_deref().unwrap_or(UNLIMITED);
            return Ok(format!("{message} {}", meta.symbol));
        }
    }

    let decimals = params.decimals.unwrap_or(meta.decimals);
    Ok(match scaled(ctx, sign, abs, decimals) {
        Some(amount) => format!("{amount} {}", meta.symbol),
        None => value.to_string(),
    })
}

fn threshold_value(threshold: &Value) -> Option<U256> {
    match threshold {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => parse_u256(s),
        _ => None,
    }
}

/// Chain the token lives on: fixed parameter, then a path, then the transaction's
fn token_chain_id(
    ctx: &RenderContext<'_>,
    params: &FormatParams,
    format: &FieldFormat,
) -> Result<u64, RenderError> {
    if let Some(chain_id) = params.chain_id {
        return Ok(chain_id);
    }
    let Some(chain_path) = params.chain_id_path.as_deref() else {
        return Ok(ctx.container.chain_id);
    };
    let value = ctx.resolve(chain_path)?;
    value
        .as_u256()
        .and_then(|id| u64::try_from(id).ok())
        .ok_or_else(|| RenderError::IncompatibleValue {
            path: chain_path.to_string(),
            format: format.as_str().to_string(),
            found: value.kind(),
        })
}

/// Token metadata from, in order: the native currency list, the descriptor's
/// own token declaration, the token source
///
/// A miss records exactly one warning.
fn lookup_token(
    ctx: &mut RenderContext<'_>,
    chain_id: u64,
    address: Address,
    params: &FormatParams,
) -> Option<TokenMeta> {
    if params.native_currency_address.contains(&address) {
        return Some(native_currency(chain_id));
    }
    if ctx.descriptor.declares_token(chain_id, address) {
        let declared = ctx.descriptor.metadata.token.as_ref().and_then(|token| {
            Some(TokenMeta {
                symbol: token.ticker.clone()?,
                decimals: token.decimals?,
                name: token.name.clone().unwrap_or_default(),
            })
        });
        if declared.is_some() {
            return declared;
        }
    }
    match ctx.tokens.lookup(chain_id, address) {
        Ok(Some(meta)) => Some(meta),
        Ok(None) => {
            ctx.warn(RenderWarning::TokenUnavailable { chain_id, address });
            None
        }
        Err(e) => {
            ctx.warn(RenderWarning::TokenLookupFailed {
                chain_id,
                address,
                reason: e.to_string(),
            });
            None
        }
    }
}

fn date(ctx: &mut RenderContext<'_>, value: &ArgumentValue) -> String {
    let raw = value.to_string();
    let formatted = signed_parts(value)
        .and_then(|(sign, abs)| {
            let secs = i64::try_from(abs).ok()?;
            Some(if sign == Sign::Negative { -secs } else { secs })
        })
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .and_then(|datetime| {
            let mut out = String::new();
            write!(out, "{}", datetime.format(&ctx.options.date_format)).ok()?;
            Some(out)
        });
    match formatted {
        Some(text) => text,
        None => {
            ctx.warn(RenderWarning::DateOutOfRange(raw.clone()));
            raw
        }
    }
}

fn enum_label(ctx: &mut RenderContext<'_>, value: &ArgumentValue, params: &FormatParams) -> String {
    let raw = value.to_string();
    let enum_name = params
        .enum_path
        .as_deref()
        .map(|p| p.strip_prefix(ENUMS_PREFIX).unwrap_or(p))
        .unwrap_or_default();
    let label = ctx
        .descriptor
        .metadata
        .enums
        .get(enum_name)
        .and_then(|entries| entries.get(&raw))
        .cloned();
    match label {
        Some(label) => label,
        None => {
            ctx.warn(RenderWarning::EnumValueMissing {
                enum_name: enum_name.to_string(),
                value: raw.clone(),
            });
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi_decoder::DecodedArguments;
    use crate::address_book::AddressBook;
    use crate::error::ResolveError;
    use crate::options::RenderOptions;
    use crate::path::Container;
    use crate::registry::TokenRegistry;
    use crate::resolver::TokenSource;
    use crate::types::Descriptor;
    use alloy_primitives::{I256, address};
    use serde_json::json;
    use tracing_test::traced_test;

    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const TOKEN_CONTRACT: Address = address!("1111111111111111111111111111111111111111");

    struct FailingSource;

    impl TokenSource for FailingSource {
        fn lookup(&self, _chain_id: u64, _address: Address) -> Result<Option<TokenMeta>, ResolveError> {
            Err(ResolveError::Source("offline".to_string()))
        }
    }

    fn descriptor() -> Descriptor {
        serde_json::from_value(json!({
            "context": { "contract": { "deployments": [
                { "chainId": 1, "address": TOKEN_CONTRACT }
            ] } },
            "metadata": {
                "token": { "name": "Example", "ticker": "EXM", "decimals": 4 },
                "enums": { "mode": { "1": "Stable", "2": "Variable" } },
                "maps": { "pools": { "entries": { "7": "Main pool" } } }
            },
            "display": { "formats": {} }
        }))
        .unwrap()
    }

    fn decoded() -> DecodedArguments {
        DecodedArguments {
            name: "test".to_string(),
            selector: None,
            params: vec![],
            values: ArgumentValue::Tuple(vec![]),
        }
    }

    fn uint(v: u64) -> ArgumentValue {
        ArgumentValue::Uint(U256::from(v), 256)
    }

    fn params(json: serde_json::Value) -> FormatParams {
        serde_json::from_value(json).unwrap()
    }

    /// Renders one value and returns the text with the warnings it produced
    fn run(
        tokens: &dyn TokenSource,
        value: &ArgumentValue,
        format: FieldFormat,
        params: Option<&FormatParams>,
    ) -> (Result<String, RenderError>, Vec<RenderWarning>) {
        let descriptor = descriptor();
        let decoded = decoded();
        let book = AddressBook::from_descriptor(&descriptor);
        let options = RenderOptions::default();
        let container = Container {
            chain_id: 1,
            to: Some(USDC),
            from: None,
            value: None,
        };
        let mut ctx = RenderContext::new(&descriptor, &decoded, container, tokens, &book, &options);
        let text = render(&mut ctx, value, Some(&format), params, "value");
        (text, ctx.into_warnings())
    }

    fn registry() -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        registry.insert(1, USDC, TokenMeta::new("USDC", 6, "USD Coin"));
        registry
    }

    #[test]
    fn test_amount_scaling() {
        let two = params(json!({ "decimals": 2 }));
        let (text, warnings) = run(&(), &uint(1000), FieldFormat::Amount, Some(&two));
        assert_eq!(text.unwrap(), "10.00");
        assert!(warnings.is_empty());

        let zero = params(json!({ "decimals": 0 }));
        assert_eq!(run(&(), &uint(1000), FieldFormat::Amount, Some(&zero)).0.unwrap(), "1000");
        assert_eq!(run(&(), &uint(1000), FieldFormat::Amount, None).0.unwrap(), "1000");

        let negative = ArgumentValue::Int(I256::try_from(-5i64).unwrap(), 256);
        assert_eq!(run(&(), &negative, FieldFormat::Amount, Some(&two)).0.unwrap(), "-0.05");
    }

    #[test]
    fn test_incompatible_value_is_fatal() {
        let (text, _) = run(&(), &ArgumentValue::Bool(true), FieldFormat::Amount, None);
        assert_eq!(
            text.unwrap_err(),
            RenderError::IncompatibleValue {
                path: "value".to_string(),
                format: "amount".to_string(),
                found: "bool",
            }
        );
        assert!(run(&(), &uint(1), FieldFormat::Address, None).0.is_err());
        assert!(run(&(), &uint(1), FieldFormat::Boolean, None).0.is_err());
    }

    #[test]
    fn test_token_amount_from_registry() {
        let (text, warnings) = run(&registry(), &uint(1_500_000), FieldFormat::TokenAmount, None);
        assert_eq!(text.unwrap(), "1.500000 USDC");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_token_amount_miss_warns_once() {
        let (text, warnings) = run(&(), &uint(1_500_000), FieldFormat::TokenAmount, None);
        assert_eq!(text.unwrap(), "1500000");
        assert_eq!(
            warnings,
            vec![RenderWarning::TokenUnavailable {
                chain_id: 1,
                address: USDC
            }]
        );

        let (text, warnings) = run(&FailingSource, &uint(7), FieldFormat::TokenAmount, None);
        assert_eq!(text.unwrap(), "7");
        assert!(matches!(
            warnings.as_slice(),
            [RenderWarning::TokenLookupFailed { reason, .. }] if reason == "lookup failed: offline"
        ));
    }

    #[test]
    #[traced_test]
    fn test_token_miss_is_logged() {
        run(&(), &uint(1), FieldFormat::TokenAmount, None);
        assert!(logs_contain("render warning"));
        assert!(logs_contain("no token metadata"));
    }

    #[test]
    fn test_token_amount_threshold_and_native() {
        let unlimited = params(json!({ "threshold": "0xffffffff" }));
        let (text, _) = run(&registry(), &uint(u64::from(u32::MAX)), FieldFormat::TokenAmount, Some(&unlimited));
        assert_eq!(text.unwrap(), "Unlimited USDC");

        let native = params(json!({
            "token": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            "nativeCurrencyAddress": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
        }));
        let wei = ArgumentValue::Uint(U256::from(10u64).pow(U256::from(18u64)), 256);
        let (text, warnings) = run(&(), &wei, FieldFormat::TokenAmount, Some(&native));
        assert_eq!(text.unwrap(), "1.000000000000000000 ETH");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_token_amount_declared_by_descriptor() {
        let fixed = params(json!({ "token": TOKEN_CONTRACT }));
        let (text, warnings) = run(&(), &uint(12345), FieldFormat::TokenAmount, Some(&fixed));
        assert_eq!(text.unwrap(), "1.2345 EXM");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_date() {
        let (text, _) = run(&(), &uint(1_766_151_741), FieldFormat::Date, None);
        assert_eq!(text.unwrap(), "2025-12-19 13:42:21 UTC");

        let huge = ArgumentValue::Uint(U256::MAX, 256);
        let (text, warnings) = run(&(), &huge, FieldFormat::Date, None);
        assert_eq!(text.unwrap(), U256::MAX.to_string());
        assert_eq!(warnings, vec![RenderWarning::DateOutOfRange(U256::MAX.to_string())]);
    }

    #[test]
    fn test_enum_and_maps() {
        let mode = params(json!({ "enumPath": "$.metadata.enums.mode" }));
        assert_eq!(run(&(), &uint(2), FieldFormat::Enum, Some(&mode)).0.unwrap(), "Variable");

        let (text, warnings) = run(&(), &uint(3), FieldFormat::Enum, Some(&mode));
        assert_eq!(text.unwrap(), "3");
        assert_eq!(warnings.len(), 1);

        let pools = params(json!({ "mapReference": "pools" }));
        assert_eq!(run(&(), &uint(7), FieldFormat::Raw, Some(&pools)).0.unwrap(), "Main pool");
        assert_eq!(run(&(), &uint(8), FieldFormat::Raw, Some(&pools)).0.unwrap(), "8");
    }

    #[test]
    fn test_addresses_and_chains() {
        let value = ArgumentValue::Address(address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert_eq!(
            run(&(), &value, FieldFormat::Address, None).0.unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        let named = ArgumentValue::Address(TOKEN_CONTRACT);
        assert_eq!(run(&(), &named, FieldFormat::AddressName, None).0.unwrap(), "Example");
        assert_eq!(
            run(&registry(), &ArgumentValue::Address(USDC), FieldFormat::TokenTicker, None).0.unwrap(),
            "USDC"
        );
        assert_eq!(run(&(), &uint(8453), FieldFormat::ChainId, None).0.unwrap(), "Base");
        assert_eq!(run(&(), &uint(5), FieldFormat::ChainId, None).0.unwrap(), "Chain 5");
    }

    #[test]
    fn test_unsupported_format_falls_back() {
        let (text, warnings) = run(&(), &uint(3600), FieldFormat::Duration, None);
        assert_eq!(text.unwrap(), "3600");
        assert_eq!(
            warnings,
            vec![RenderWarning::UnsupportedFormat {
                format: "duration".to_string(),
                path: "value".to_string(),
            }]
        );
    }

    #[test]
    fn test_unrecognized_format_is_named_in_warning() {
        let format = FieldFormat::from("interoperableAddressName");
        let (text, warnings) = run(&(), &uint(5), format, None);
        assert_eq!(text.unwrap(), "5");
        assert_eq!(
            warnings,
            vec![RenderWarning::UnsupportedFormat {
                format: "interoperableAddressName".to_string(),
                path: "value".to_string(),
            }]
        );
    }

    #[test]
    fn test_encryption_fallback_label() {
        let encrypted = params(json!({ "encryption": { "fallbackLabel": "Encrypted amount" } }));
        assert_eq!(
            run(&(), &ArgumentValue::Bytes(vec![1, 2]), FieldFormat::Amount, Some(&encrypted)).0.unwrap(),
            "Encrypted amount"
        );
    }
}
