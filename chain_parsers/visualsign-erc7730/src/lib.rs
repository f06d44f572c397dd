//! ERC-7730 clear signing for EVM calldata and EIP-712 typed data
//!
//! Given a descriptor, raw calldata (or a typed-data message) is decoded
//! against the descriptor's function signatures and rendered into a
//! [`DisplayModel`]: labelled, formatted values in declaration order, plus the
//! warnings collected on the way.
//!
//! The crate performs no I/O. Descriptors come from a [`DescriptorSource`] and
//! token metadata from a [`TokenSource`], both supplied by the caller.

pub mod abi_decoder;
pub mod address_book;
pub mod eip712;
pub mod engine;
pub mod error;
mod formatters;
pub mod options;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod signature;
pub mod types;
pub mod utils;
mod visibility;

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

pub use abi_decoder::{ArgumentValue, DecodedArguments, decode_calldata, decode_params};
pub use address_book::AddressBook;
pub use eip712::{TypedData, TypedDomain, TypedField, decode_typed_data};
pub use engine::{DisplayEntry, DisplayGroup, DisplayItem, DisplayModel, RenderContext};
pub use error::{
    Corruption, DecodeError, Error, ParseError, ParseErrorKind, RenderError, RenderWarning,
    ResolveError,
};
pub use options::RenderOptions;
pub use path::Container;
pub use registry::{ChainMetadata, TokenRegistry};
pub use resolver::{DescriptorSource, ResolvedDescriptor, StaticSource, TokenMeta, TokenSource};
pub use signature::{Param, ParamType, Signature, parse_signature, parse_type};
pub use types::Descriptor;

/// A contract call to render
#[derive(Debug, Clone, Copy)]
pub struct CalldataInput<'a> {
    pub chain_id: u64,
    /// Called contract
    pub to: Address,
    pub from: Option<Address>,
    /// Native value sent with the call
    pub value: Option<U256>,
    /// Selector followed by the ABI-encoded arguments
    pub calldata: &'a [u8],
}

/// Renders calldata with a known descriptor
///
/// The format is chosen by matching the calldata selector against the
/// selectors of the descriptor's signature keys; keys that fail to parse are
/// skipped.
pub fn format_calldata(
    descriptor: &Descriptor,
    input: &CalldataInput<'_>,
    tokens: &dyn TokenSource,
    options: &RenderOptions,
) -> Result<DisplayModel, Error> {
    let calldata = input.calldata;
    let Some(selector) = calldata.first_chunk::<4>().copied() else {
        return Err(DecodeError::CalldataTooShort {
            expected: 4,
            actual: calldata.len(),
        }
        .into());
    };

    let mut matched = None;
    for (key, format) in &descriptor.display.formats {
        if !key.contains('(') {
            continue;
        }
        match key.parse::<Signature>() {
            Ok(signature) if signature.selector() == selector => {
                matched = Some((signature, format));
                break;
            }
            Ok(_) => {}
            Err(e) => warn!(key = %key, error = %e, "skipping malformed format key"),
        }
    }
    let (signature, format) = matched.ok_or(DecodeError::UnknownSelector(selector))?;
    debug!(
        signature = signature.canonical(),
        selector = %hex::encode(selector),
        "matched display format"
    );

    let decoded = decode_calldata(&signature, calldata)?;
    let container = Container {
        chain_id: input.chain_id,
        to: Some(input.to),
        from: input.from,
        value: input.value,
    };
    render(descriptor, format, &decoded, container, tokens, options)
}

/// Renders an EIP-712 message with a known descriptor
pub fn format_typed_data(
    descriptor: &Descriptor,
    data: &TypedData,
    tokens: &dyn TokenSource,
    options: &RenderOptions,
) -> Result<DisplayModel, Error> {
    let format = descriptor
        .format(&data.primary_type)
        .ok_or_else(|| RenderError::MissingFormat(data.primary_type.clone()))?;
    let decoded = decode_typed_data(data)?;
    let container = Container {
        chain_id: data.domain.chain_id.unwrap_or(options.default_chain_id),
        to: data.domain.verifying_contract,
        from: None,
        value: None,
    };
    render(descriptor, format, &decoded, container, tokens, options)
}

/// Resolves the descriptor for the called contract, then renders the call
pub fn format(
    source: &dyn DescriptorSource,
    input: &CalldataInput<'_>,
    tokens: &dyn TokenSource,
    options: &RenderOptions,
) -> Result<DisplayModel, Error> {
    let resolved = source.resolve_calldata(input.chain_id, input.to)?;
    format_calldata(&resolved.descriptor, input, tokens, options)
}

/// Resolves the descriptor for a typed-data message, then renders it
pub fn format_typed(
    source: &dyn DescriptorSource,
    data: &TypedData,
    tokens: &dyn TokenSource,
    options: &RenderOptions,
) -> Result<DisplayModel, Error> {
    let chain_id = data.domain.chain_id.unwrap_or(options.default_chain_id);
    let resolved =
        source.resolve_typed(chain_id, data.domain.verifying_contract, &data.primary_type)?;
    format_typed_data(&resolved.descriptor, data, tokens, options)
}

fn render(
    descriptor: &Descriptor,
    format: &types::DisplayFormat,
    decoded: &DecodedArguments,
    container: Container,
    tokens: &dyn TokenSource,
    options: &RenderOptions,
) -> Result<DisplayModel, Error> {
    let mut book = AddressBook::from_descriptor(descriptor);
    book.merge(&options.address_book);
    let ctx = RenderContext::new(descriptor, decoded, container, tokens, &book, options);
    Ok(ctx.render(format)?)
}
