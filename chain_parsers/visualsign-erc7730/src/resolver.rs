//! Lookup capabilities supplied by the caller
//!
//! The core never performs I/O. Descriptors and token metadata are obtained
//! through the [`DescriptorSource`] and [`TokenSource`] traits; [`StaticSource`]
//! and [`crate::registry::TokenRegistry`] are the in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use serde::Deserialize;
use tracing::debug;

use crate::error::ResolveError;
use crate::types::Descriptor;

/// Metadata for an ERC-20 token, or a chain's native currency
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenMeta {
    /// The token's symbol (e.g., "USDC", "WETH")
    pub symbol: String,
    /// The token's decimal places (e.g., 6 for USDC, 18 for WETH)
    pub decimals: u8,
    /// The token's full name (e.g., "USD Coin")
    #[serde(default)]
    pub name: String,
}

impl TokenMeta {
    pub fn new(symbol: impl Into<String>, decimals: u8, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            name: name.into(),
        }
    }
}

/// Token metadata provider
pub trait TokenSource {
    /// Looks up a token by chain and contract address
    ///
    /// # Returns
    /// * `Ok(Some(meta))` if the token is known
    /// * `Ok(None)` if it is not
    /// * `Err(ResolveError)` if the lookup itself failed
    fn lookup(&self, chain_id: u64, address: Address) -> Result<Option<TokenMeta>, ResolveError>;
}

/// The empty token source
impl TokenSource for () {
    fn lookup(&self, _chain_id: u64, _address: Address) -> Result<Option<TokenMeta>, ResolveError> {
        Ok(None)
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn lookup(&self, chain_id: u64, address: Address) -> Result<Option<TokenMeta>, ResolveError> {
        (**self).lookup(chain_id, address)
    }
}

/// A descriptor selected for one transaction or message
#[derive(Debug, Clone)]
pub struct ResolvedDescriptor {
    pub descriptor: Arc<Descriptor>,
    pub chain_id: u64,
    /// Contract the descriptor was resolved for, if any
    pub address: Option<Address>,
}

/// Descriptor provider
pub trait DescriptorSource {
    /// Descriptor for calldata sent to `address` on `chain_id`
    fn resolve_calldata(&self, chain_id: u64, address: Address) -> Result<ResolvedDescriptor, ResolveError>;

    /// Descriptor for a typed-data message with the given primary type
    fn resolve_typed(
        &self,
        chain_id: u64,
        verifying_contract: Option<Address>,
        primary_type: &str,
    ) -> Result<ResolvedDescriptor, ResolveError>;
}

/// In-memory descriptor source keyed by each descriptor's deployments
#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    calldata: HashMap<(u64, Address), Arc<Descriptor>>,
    typed: HashMap<(u64, Address), Arc<Descriptor>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under every deployment it declares
    ///
    /// Contract descriptors serve calldata, EIP-712 descriptors serve typed data.
    pub fn add(&mut self, descriptor: Descriptor) -> Arc<Descriptor> {
        let descriptor = Arc::new(descriptor);
        let index = if descriptor.context.is_eip712() {
            &mut self.typed
        } else {
            &mut self.calldata
        };
        for deployment in descriptor.context.deployments() {
            index.insert((deployment.chain_id, deployment.address), Arc::clone(&descriptor));
        }
        descriptor
    }

    /// Parses and registers a descriptor document
    pub fn add_json(&mut self, json: &str) -> Result<Arc<Descriptor>, ResolveError> {
        let descriptor =
            Descriptor::from_json(json).map_err(|e| ResolveError::InvalidDescriptor(e.to_string()))?;
        Ok(self.add(descriptor))
    }
}

impl DescriptorSource for StaticSource {
    fn resolve_calldata(&self, chain_id: u64, address: Address) -> Result<ResolvedDescriptor, ResolveError> {
        let descriptor = self
            .calldata
            .get(&(chain_id, address))
            .ok_or(ResolveError::NotFound { chain_id, address })?;
        debug!(chain_id, %address, "resolved calldata descriptor");
        Ok(ResolvedDescriptor {
            descriptor: Arc::clone(descriptor),
            chain_id,
            address: Some(address),
        })
    }

    fn resolve_typed(
        &self,
        chain_id: u64,
        verifying_contract: Option<Address>,
        primary_type: &str,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let found = match verifying_contract {
            Some(address) => self
                .typed
                .get(&(chain_id, address))
                .filter(|d| d.format(primary_type).is_some())
                .map(|d| (address, d)),
            None => self
                .typed
                .iter()
                .filter(|((chain, _), d)| *chain == chain_id && d.format(primary_type).is_some())
                .min_by_key(|((_, address), _)| *address)
                .map(|((_, address), d)| (*address, d)),
        };
        let (address, descriptor) = found.ok_or_else(|| ResolveError::TypedNotFound {
            chain_id,
            primary_type: primary_type.to_string(),
        })?;
        debug!(chain_id, %address, primary_type, "resolved typed data descriptor");
        Ok(ResolvedDescriptor {
            descriptor: Arc::clone(descriptor),
            chain_id,
            address: Some(address),
        })
    }
}
