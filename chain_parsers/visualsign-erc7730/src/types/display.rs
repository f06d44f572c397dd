//! Display section of a descriptor: formats, fields, definitions and visibility rules

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Address;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `display` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySection {
    /// Reusable fields, referenced as `#/definitions/<name>`
    #[serde(default)]
    pub definitions: HashMap<String, DisplayField>,

    /// Named visibility rules, referenced by name from a field's `visible`
    #[serde(default)]
    pub visibility_rules: HashMap<String, VisibleRule>,

    /// Keyed by function signature (calldata) or primary type name (EIP-712)
    #[serde(default)]
    pub formats: BTreeMap<String, DisplayFormat>,
}

/// How one function or message type is presented
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormat {
    #[serde(default)]
    pub intent: Option<String>,

    /// Intent with `${path}` placeholders
    #[serde(default)]
    pub interpolated_intent: Option<String>,

    #[serde(default)]
    pub fields: Vec<DisplayField>,
}

/// A display field
///
/// The JSON shape is resolved by key, in priority order: an object with `$ref`
/// is a reference, one with `fieldGroup` is a group, anything else is a simple
/// field.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayField {
    Reference(FieldReference),
    Group(FieldGroup),
    Simple(SimpleField),
}

impl<'de> Deserialize<'de> for DisplayField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct GroupWrapper {
            #[serde(rename = "fieldGroup")]
            field_group: FieldGroup,
        }

        let value = Value::deserialize(deserializer)?;
        let Some(object) = value.as_object() else {
            return Err(D::Error::custom("display field must be an object"));
        };
        if object.contains_key("$ref") {
            FieldReference::deserialize(value)
                .map(DisplayField::Reference)
                .map_err(D::Error::custom)
        } else if object.contains_key("fieldGroup") {
            GroupWrapper::deserialize(value)
                .map(|w| DisplayField::Group(w.field_group))
                .map_err(D::Error::custom)
        } else {
            SimpleField::deserialize(value)
                .map(DisplayField::Simple)
                .map_err(D::Error::custom)
        }
    }
}

/// `{ "$ref": "#/definitions/<name>", ... }` with optional overrides
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    #[serde(rename = "$ref")]
    pub reference: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub format: Option<FieldFormat>,
    #[serde(default)]
    pub params: Option<FormatParams>,
    #[serde(default)]
    pub visible: Option<VisibleRule>,
}

impl FieldReference {
    /// Definition name with the `#/definitions/` prefix removed
    pub fn definition_name(&self) -> &str {
        self.reference
            .strip_prefix("#/definitions/")
            .or_else(|| self.reference.strip_prefix("$.display.definitions."))
            .unwrap_or(&self.reference)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldGroup {
    pub label: String,
    #[serde(default)]
    pub iteration: Iteration,
    #[serde(default)]
    pub fields: Vec<DisplayField>,
}

/// How the members of a group relate to each other when shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Iteration {
    #[default]
    Sequential,
    Bundled,
}

/// A labelled value at a path
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimpleField {
    /// Optional only so definitions can leave it to the referencing field
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub format: Option<FieldFormat>,
    #[serde(default)]
    pub params: Option<FormatParams>,
    #[serde(default)]
    pub visible: Option<VisibleRule>,
}

/// Visibility of a field
///
/// Absent rules mean always visible.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VisibleRule {
    Bool(bool),
    /// `always`, `never`, `optional`, or the name of a rule in `visibilityRules`
    Named(String),
    Condition(VisibleCondition),
}

/// Structured condition; every clause present must hold for the field to show
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VisibleCondition {
    /// Value to test; defaults to the field's own path
    #[serde(default)]
    pub path: Option<String>,
    /// Hidden when the value equals any of these
    #[serde(default)]
    pub if_not_in: Option<Vec<Value>>,
    /// Shown only when the value equals one of these
    #[serde(default, alias = "mustBe")]
    pub must_match: Option<Vec<Value>>,
    #[serde(default)]
    pub greater_than: Option<Value>,
    #[serde(default)]
    pub less_than: Option<Value>,
}

/// The `format` of a field; tags this crate does not know are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFormat {
    Raw,
    Address,
    AddressName,
    Number,
    Amount,
    TokenAmount,
    Date,
    Boolean,
    Enum,
    TokenTicker,
    ChainId,
    Calldata,
    NftName,
    Duration,
    Unit,
    Unknown(String),
}

impl FieldFormat {
    pub fn as_str(&self) -> &str {
        match self {
            FieldFormat::Raw => "raw",
            FieldFormat::Address => "address",
            FieldFormat::AddressName => "addressName",
            FieldFormat::Number => "number",
            FieldFormat::Amount => "amount",
            FieldFormat::TokenAmount => "tokenAmount",
            FieldFormat::Date => "date",
            FieldFormat::Boolean => "boolean",
            FieldFormat::Enum => "enum",
            FieldFormat::TokenTicker => "tokenTicker",
            FieldFormat::ChainId => "chainId",
            FieldFormat::Calldata => "calldata",
            FieldFormat::NftName => "nftName",
            FieldFormat::Duration => "duration",
            FieldFormat::Unit => "unit",
            FieldFormat::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for FieldFormat {
    fn from(tag: &str) -> Self {
        match tag {
            "raw" => FieldFormat::Raw,
            "address" => FieldFormat::Address,
            "addressName" => FieldFormat::AddressName,
            "number" => FieldFormat::Number,
            "amount" => FieldFormat::Amount,
            "tokenAmount" => FieldFormat::TokenAmount,
            "date" => FieldFormat::Date,
            "boolean" => FieldFormat::Boolean,
            "enum" => FieldFormat::Enum,
            "tokenTicker" => FieldFormat::TokenTicker,
            "chainId" => FieldFormat::ChainId,
            "calldata" => FieldFormat::Calldata,
            "nftName" => FieldFormat::NftName,
            "duration" => FieldFormat::Duration,
            "unit" => FieldFormat::Unit,
            other => FieldFormat::Unknown(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(FieldFormat::from(tag.as_str()))
    }
}

/// Format parameters; which ones apply depends on the format
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatParams {
    /// Path to the token address for `tokenAmount`
    #[serde(default)]
    pub token_path: Option<String>,

    /// Fixed token address for `tokenAmount`
    #[serde(default)]
    pub token: Option<Address>,

    /// Addresses that stand for the chain's native currency
    #[serde(default, deserialize_with = "one_or_many")]
    pub native_currency_address: Vec<Address>,

    /// Chain to resolve the token on, when it differs from the transaction's
    #[serde(default)]
    pub chain_id: Option<u64>,

    #[serde(default)]
    pub chain_id_path: Option<String>,

    /// Amounts at or above this render as `message`
    #[serde(default)]
    pub threshold: Option<Value>,

    #[serde(default)]
    pub message: Option<String>,

    /// Decimal places for `amount`; overrides token decimals for `tokenAmount`
    #[serde(default)]
    pub decimals: Option<u8>,

    /// Key into `metadata.enums`
    #[serde(default)]
    pub enum_path: Option<String>,

    /// Key into `metadata.maps`
    #[serde(default)]
    pub map_reference: Option<String>,

    #[serde(default)]
    pub encryption: Option<EncryptionParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionParams {
    #[serde(default)]
    pub fallback_label: Option<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Address>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Address),
        Many(Vec<Address>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(address)) => vec![address],
        Some(OneOrMany::Many(addresses)) => addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_shape_priority() {
        let reference: DisplayField = serde_json::from_value(json!({
            "$ref": "#/definitions/amount",
            "path": "value",
            "fieldGroup": { "label": "ignored", "fields": [] }
        }))
        .unwrap();
        match reference {
            DisplayField::Reference(r) => {
                assert_eq!(r.definition_name(), "amount");
                assert_eq!(r.path.as_deref(), Some("value"));
            }
            other => panic!("expected a reference, got {other:?}"),
        }

        let group: DisplayField = serde_json::from_value(json!({
            "fieldGroup": {
                "label": "Order",
                "iteration": "bundled",
                "fields": [{ "path": "amount", "label": "Amount" }]
            }
        }))
        .unwrap();
        match group {
            DisplayField::Group(g) => {
                assert_eq!(g.label, "Order");
                assert_eq!(g.iteration, Iteration::Bundled);
                assert_eq!(g.fields.len(), 1);
            }
            other => panic!("expected a group, got {other:?}"),
        }

        let simple: DisplayField =
            serde_json::from_value(json!({ "path": "to", "label": "To", "format": "addressName" }))
                .unwrap();
        assert_eq!(
            simple,
            DisplayField::Simple(SimpleField {
                path: Some("to".into()),
                label: "To".into(),
                format: Some(FieldFormat::AddressName),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_non_object_field_is_rejected() {
        assert!(serde_json::from_value::<DisplayField>(json!("to")).is_err());
    }

    #[test]
    fn test_visible_rule_shapes() {
        let rules: Vec<VisibleRule> = serde_json::from_value(json!([
            false,
            "never",
            { "ifNotIn": ["0"], "mustBe": ["1"] }
        ]))
        .unwrap();
        assert_eq!(rules[0], VisibleRule::Bool(false));
        assert_eq!(rules[1], VisibleRule::Named("never".into()));
        match &rules[2] {
            VisibleRule::Condition(c) => {
                assert_eq!(c.if_not_in, Some(vec![json!("0")]));
                assert_eq!(c.must_match, Some(vec![json!("1")]));
            }
            other => panic!("expected a condition, got {other:?}"),
        }

        assert!(serde_json::from_value::<VisibleRule>(json!({ "ifNotInn": [] })).is_err());
    }

    #[test]
    fn test_unknown_format_is_kept() {
        let field: SimpleField =
            serde_json::from_value(json!({ "path": "x", "label": "X", "format": "interoperableAddressName" }))
                .unwrap();
        assert_eq!(field.format, Some(FieldFormat::Unknown("interoperableAddressName".into())));
        assert_eq!(field.format.as_ref().map(FieldFormat::as_str), Some("interoperableAddressName"));

        let field: SimpleField =
            serde_json::from_value(json!({ "path": "x", "label": "X", "format": "enum" })).unwrap();
        assert_eq!(field.format, Some(FieldFormat::Enum));
    }

    #[test]
    fn test_native_currency_one_or_many() {
        let params: FormatParams = serde_json::from_value(json!({
            "nativeCurrencyAddress": "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"
        }))
        .unwrap();
        assert_eq!(params.native_currency_address.len(), 1);

        let params: FormatParams = serde_json::from_value(json!({
            "nativeCurrencyAddress": [
                "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
                "0x0000000000000000000000000000000000000000"
            ]
        }))
        .unwrap();
        assert_eq!(params.native_currency_address.len(), 2);
    }
}
