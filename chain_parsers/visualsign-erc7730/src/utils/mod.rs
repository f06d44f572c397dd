//! Static per-chain tables shared by the formatters

pub mod chains;

pub use chains::*;
