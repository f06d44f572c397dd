use std::collections::HashMap;

use serde::Deserialize;

/// Descriptor metadata: ownership, token declaration and lookup tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub info: Option<MetadataInfo>,

    /// Set when the descriptor describes a token contract itself
    #[serde(default)]
    pub token: Option<TokenInfo>,

    /// Display name for the descriptor's deployments
    #[serde(default)]
    pub contract_name: Option<String>,

    /// Enum name, then raw value, to label
    #[serde(default)]
    pub enums: HashMap<String, HashMap<String, String>>,

    /// Address to label; keys may use any hex casing
    #[serde(default)]
    pub address_book: HashMap<String, String>,

    #[serde(default)]
    pub maps: HashMap<String, MapDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// A named lookup table used by the `mapReference` format parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MapDefinition {
    #[serde(default)]
    pub entries: HashMap<String, String>,
}
