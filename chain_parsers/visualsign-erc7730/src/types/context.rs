use alloy_primitives::Address;
use serde::Deserialize;

/// Binds a descriptor either to contract calldata or to EIP-712 messages
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DescriptorContext {
    Contract(ContractContext),
    Eip712(Eip712Context),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractContext {
    #[serde(rename = "$id", default)]
    pub id: Option<String>,
    pub contract: ContractInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Eip712Context {
    #[serde(rename = "$id", default)]
    pub id: Option<String>,
    pub eip712: Eip712Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Eip712Info {
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    #[serde(default)]
    pub domain: Option<Eip712Domain>,
}

/// Domain constraints an EIP-712 descriptor applies to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub verifying_contract: Option<Address>,
}

/// A chain id and contract address the descriptor applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub chain_id: u64,
    pub address: Address,
}

impl DescriptorContext {
    pub fn deployments(&self) -> &[Deployment] {
        match self {
            DescriptorContext::Contract(c) => &c.contract.deployments,
            DescriptorContext::Eip712(e) => &e.eip712.deployments,
        }
    }

    /// Whether `address` is one of the deployments on `chain_id`
    pub fn is_deployed_at(&self, chain_id: u64, address: Address) -> bool {
        self.deployments()
            .iter()
            .any(|d| d.chain_id == chain_id && d.address == address)
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, DescriptorContext::Contract(_))
    }

    pub fn is_eip712(&self) -> bool {
        matches!(self, DescriptorContext::Eip712(_))
    }
}
