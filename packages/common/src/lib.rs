//! Common - Shared Types and Utilities for the Gravity Bridge Contracts
//!
//! This package provides the asset and Ethereum address types shared between
//! the bridge contract and its clients.

pub mod asset;
pub mod eth;

pub use asset::AssetInfo;
pub use eth::{EthAddress, EthAddressError};
