//! Chain names and native currencies by EIP-155 chain id
//!
//! # Example
//!
//! ```rust,ignore
//! use visualsign_erc7730::utils::chains::{chain_name, native_currency};
//!
//! assert_eq!(chain_name(8453), "Base");
//! assert_eq!(native_currency(137).symbol, "POL");
//! ```

use crate::resolver::TokenMeta;

/// Display names for well-known chains
pub static CHAIN_NAMES: phf::Map<u64, &str> = phf::phf_map! {
    1u64 => "Ethereum",
    10u64 => "Optimism",
    56u64 => "BNB Chain",
    100u64 => "Gnosis",
    137u64 => "Polygon",
    250u64 => "Fantom",
    324u64 => "zkSync Era",
    8453u64 => "Base",
    42161u64 => "Arbitrum One",
    42170u64 => "Arbitrum Nova",
    43114u64 => "Avalanche",
    59144u64 => "Linea",
    534352u64 => "Scroll",
    7777777u64 => "Zora",
    11155111u64 => "Sepolia",
};

// (symbol, name); every entry uses 18 decimals
static NATIVE_CURRENCIES: phf::Map<u64, (&str, &str)> = phf::phf_map! {
    56u64 => ("BNB", "BNB"),
    97u64 => ("BNB", "BNB"),
    100u64 => ("xDAI", "xDAI"),
    137u64 => ("POL", "Polygon Ecosystem Token"),
    80002u64 => ("POL", "Polygon Ecosystem Token"),
    250u64 => ("FTM", "Fantom"),
    43113u64 => ("AVAX", "Avalanche"),
    43114u64 => ("AVAX", "Avalanche"),
};

/// Human-readable chain name, `Chain <id>` when unknown
pub fn chain_name(chain_id: u64) -> String {
    CHAIN_NAMES
        .get(&chain_id)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Chain {chain_id}"))
}

/// Native currency of a chain; Ether unless the chain is known to differ
pub fn native_currency(chain_id: u64) -> TokenMeta {
    let (symbol, name) = NATIVE_CURRENCIES
        .get(&chain_id)
        .copied()
        .unwrap_or(("ETH", "Ether"));
    TokenMeta {
        symbol: symbol.to_string(),
        decimals: 18,
        name: name.to_string(),
    }
}
