//! Address labels for the `addressName` format
//!
//! Labels come from three places, highest precedence first:
//! 1. the descriptor's explicit `metadata.addressBook`
//! 2. labels derived from metadata: deployments named after `contractName`,
//!    or after the declared token when there is no contract name
//! 3. externally supplied books merged in by the caller

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::types::Descriptor;

/// Lowercase-hex address to label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    entries: HashMap<String, String>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the book for a descriptor
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        let mut book = Self::new();
        let metadata = &descriptor.metadata;

        let derived = metadata.contract_name.as_ref().or_else(|| {
            metadata
                .token
                .as_ref()
                .and_then(|token| token.name.as_ref())
        });
        if let Some(name) = derived {
            for deployment in descriptor.context.deployments() {
                book.insert(&deployment.address.to_string(), name.clone());
            }
        }

        for (address, label) in &metadata.address_book {
            book.insert(address, label.clone());
        }
        book
    }

    /// Adds or replaces a label; the key is normalized to lowercase
    pub fn insert(&mut self, address: &str, label: impl Into<String>) {
        self.entries.insert(normalize(address), label.into());
    }

    /// Adds entries from `other` without overriding labels already present
    pub fn merge(&mut self, other: &AddressBook) {
        for (address, label) in &other.entries {
            self.entries
                .entry(address.clone())
                .or_insert_with(|| label.clone());
        }
    }

    /// Label for a hex address in any casing
    pub fn resolve(&self, address: &str) -> Option<&str> {
        self.entries.get(&normalize(address)).map(String::as_str)
    }

    pub fn label(&self, address: &Address) -> Option<&str> {
        self.entries
            .get(&format!("0x{}", hex::encode(address)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(Address, S)> for AddressBook {
    fn from_iter<I: IntoIterator<Item = (Address, S)>>(iter: I) -> Self {
        let mut book = Self::new();
        for (address, label) in iter {
            book.insert(&address.to_string(), label);
        }
        book
    }
}

fn normalize(address: &str) -> String {
    let trimmed = address.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", digits.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn descriptor(metadata: serde_json::Value) -> Descriptor {
        serde_json::from_value(serde_json::json!({
            "context": {
                "contract": {
                    "deployments": [
                        { "chainId": 1, "address": "0xdAC17F958D2ee523a2206206994597C13D831ec7" },
                        { "chainId": 10, "address": "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58" }
                    ]
                }
            },
            "metadata": metadata,
            "display": { "formats": {} }
        }))
        .unwrap()
    }

    #[test]
    fn test_deployments_labelled_with_contract_name() {
        let book = AddressBook::from_descriptor(&descriptor(serde_json::json!({
            "contractName": "Tether USD"
        })));
        assert_eq!(book.len(), 2);
        assert_eq!(
            book.resolve("0xDAC17F958D2EE523A2206206994597C13D831EC7"),
            Some("Tether USD")
        );
        assert_eq!(
            book.label(&address!("94b008aa00579c1307b0ef2c499ad98a8ce58e58")),
            Some("Tether USD")
        );
    }

    #[test]
    fn test_token_name_used_without_contract_name() {
        let book = AddressBook::from_descriptor(&descriptor(serde_json::json!({
            "token": { "name": "Tether", "ticker": "USDT", "decimals": 6 }
        })));
        assert_eq!(book.resolve("0xdac17f958d2ee523a2206206994597c13d831ec7"), Some("Tether"));
    }

    #[test]
    fn test_explicit_entries_take_precedence() {
        let book = AddressBook::from_descriptor(&descriptor(serde_json::json!({
            "contractName": "Tether USD",
            "addressBook": {
                "0xDAC17F958D2EE523A2206206994597C13D831EC7": "USDT Treasury",
                "0x0000000000000000000000000000000000000001": "Precompile"
            }
        })));
        assert_eq!(book.resolve("0xdac17f958d2ee523a2206206994597c13d831ec7"), Some("USDT Treasury"));
        assert_eq!(book.resolve("0x0000000000000000000000000000000000000001"), Some("Precompile"));
        assert_eq!(book.resolve("0x94b008aa00579c1307b0ef2c499ad98a8ce58e58"), Some("Tether USD"));
    }

    #[test]
    fn test_merge_keeps_existing_labels() {
        let mut book = AddressBook::new();
        book.insert("0xAbC0000000000000000000000000000000000000", "Descriptor label");

        let external: AddressBook = [
            (address!("abc0000000000000000000000000000000000000"), "External label"),
            (address!("def0000000000000000000000000000000000000"), "Other"),
        ]
        .into_iter()
        .collect();
        book.merge(&external);

        assert_eq!(book.resolve("0xabc0000000000000000000000000000000000000"), Some("Descriptor label"));
        assert_eq!(book.resolve("0xdef0000000000000000000000000000000000000"), Some("Other"));
    }

    #[test]
    fn test_empty_book() {
        let book = AddressBook::new();
        assert!(book.is_empty());
        assert_eq!(book.resolve("0x0000000000000000000000000000000000000000"), None);
    }
}
