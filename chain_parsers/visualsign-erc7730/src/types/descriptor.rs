use alloy_primitives::Address;
use serde::Deserialize;

use super::context::DescriptorContext;
use super::display::{DisplayFormat, DisplaySection};
use super::metadata::Metadata;

/// An ERC-7730 clear-signing descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "$schema", default)]
    pub schema: Option<String>,

    pub context: DescriptorContext,

    #[serde(default)]
    pub metadata: Metadata,

    pub display: DisplaySection,
}

impl Descriptor {
    /// Parses a descriptor document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Format registered under an exact key (signature or primary type)
    pub fn format(&self, key: &str) -> Option<&DisplayFormat> {
        self.display.formats.get(key)
    }

    /// Whether the descriptor itself declares the token at `address`
    pub fn declares_token(&self, chain_id: u64, address: Address) -> bool {
        self.metadata.token.is_some() && self.context.is_deployed_at(chain_id, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const USDC: &str = r#"{
        "$schema": "../../specs/erc7730-v1.schema.json",
        "context": {
            "$id": "USDC",
            "contract": {
                "deployments": [
                    { "chainId": 1, "address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48" }
                ]
            }
        },
        "metadata": {
            "owner": "Circle",
            "token": { "name": "USD Coin", "ticker": "USDC", "decimals": 6 }
        },
        "display": {
            "formats": {
                "transfer(address to,uint256 value)": {
                    "intent": "Send",
                    "fields": [
                        { "path": "to", "label": "To", "format": "addressName" },
                        { "path": "value", "label": "Amount", "format": "tokenAmount" }
                    ]
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_contract_descriptor() {
        let descriptor = Descriptor::from_json(USDC).unwrap();
        assert!(descriptor.context.is_contract());
        assert_eq!(descriptor.context.deployments().len(), 1);
        assert_eq!(descriptor.metadata.owner.as_deref(), Some("Circle"));
        assert!(descriptor.format("transfer(address to,uint256 value)").is_some());

        let usdc = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert!(descriptor.declares_token(1, usdc));
        assert!(!descriptor.declares_token(137, usdc));
    }

    #[test]
    fn test_parse_eip712_descriptor() {
        let descriptor = Descriptor::from_json(
            r#"{
                "context": {
                    "eip712": {
                        "deployments": [
                            { "chainId": 1, "address": "0x000000000022d473030f116ddee9f6b43ac78ba3" }
                        ],
                        "domain": { "name": "Permit2" }
                    }
                },
                "display": { "formats": { "PermitSingle": { "fields": [] } } }
            }"#,
        )
        .unwrap();
        assert!(descriptor.context.is_eip712());
        assert_eq!(descriptor.metadata, Metadata::default());
    }

    #[test]
    fn test_missing_context_is_an_error() {
        assert!(Descriptor::from_json(r#"{ "display": { "formats": {} } }"#).is_err());
    }
}
