use serde::Deserialize;

use crate::address_book::AddressBook;

fn default_max_reference_depth() -> usize {
    16
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M:%S UTC".to_string()
}

fn default_chain_id() -> u64 {
    1
}

/// Options controlling how a display model is rendered
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Emit fields hidden by their visibility rule, marked `visible: false`
    #[serde(default)]
    pub include_hidden: bool,
    /// Longest chain of `$ref` / named visibility rule references followed
    #[serde(default = "default_max_reference_depth")]
    pub max_reference_depth: usize,
    /// chrono strftime pattern for the `date` format
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Chain id for typed data whose domain does not carry one
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,
    /// Caller-supplied labels, ranked below the descriptor's own
    #[serde(skip)]
    pub address_book: AddressBook,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            max_reference_depth: default_max_reference_depth(),
            date_format: default_date_format(),
            default_chain_id: default_chain_id(),
            address_book: AddressBook::default(),
        }
    }
}
