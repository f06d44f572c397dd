//! In-memory [`TokenSource`] backed by wallet asset lists

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::Deserialize;

use crate::error::ResolveError;
use crate::resolver::{TokenMeta, TokenSource};

/// Token metadata keyed by `(chain_id, address)`
///
/// The same contract address may be a different token on another chain, so
/// entries never leak across chains. Later inserts replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<(u64, Address), TokenMeta>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one token, returning the entry it displaced
    pub fn insert(&mut self, chain_id: u64, address: Address, meta: TokenMeta) -> Option<TokenMeta> {
        self.tokens.insert((chain_id, address), meta)
    }

    /// Adds every asset of one chain's list, replacing tokens already known
    /// at the same addresses
    pub fn load_chain_metadata(&mut self, metadata: &ChainMetadata) {
        for (address, meta) in &metadata.assets {
            self.tokens
                .insert((metadata.network_id, *address), meta.clone());
        }
    }
}

impl FromIterator<ChainMetadata> for TokenRegistry {
    fn from_iter<I: IntoIterator<Item = ChainMetadata>>(lists: I) -> Self {
        let mut registry = Self::new();
        for list in lists {
            registry.load_chain_metadata(&list);
        }
        registry
    }
}

impl TokenSource for TokenRegistry {
    fn lookup(&self, chain_id: u64, address: Address) -> Result<Option<TokenMeta>, ResolveError> {
        Ok(self.tokens.get(&(chain_id, address)).cloned())
    }
}

/// One chain's asset list, as wallets ship it
///
/// ```json
/// { "networkId": 1, "assets": { "0xa0b8…eb48": { "symbol": "USDC", "decimals": 6 } } }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub network_id: u64,
    pub assets: HashMap<Address, TokenMeta>,
}
