//! ERC-7730 descriptor model
//!
//! Descriptors are loaded once and only read afterwards; every type here is
//! `Send + Sync` so a parsed descriptor can be shared behind an `Arc`.

pub mod context;
pub mod descriptor;
pub mod display;
pub mod metadata;

pub use context::{ContractContext, Deployment, DescriptorContext, Eip712Context, Eip712Domain};
pub use descriptor::Descriptor;
pub use display::{
    DisplayField, DisplayFormat, DisplaySection, EncryptionParams, FieldFormat, FieldGroup,
    FieldReference, FormatParams, Iteration, SimpleField, VisibleCondition, VisibleRule,
};
pub use metadata::{MapDefinition, Metadata, MetadataInfo, TokenInfo};
