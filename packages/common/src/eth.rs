//! Ethereum address type.
//!
//! Addresses are stored in a canonical form: `0x` followed by 40 lowercase hex
//! characters. Ordering on the canonical string equals byte ordering, which the
//! signer-set sort relies on.

use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthAddressError {
    InvalidLength(usize),
    InvalidHex,
}

impl fmt::Display for EthAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EthAddressError::InvalidLength(len) => {
                write!(f, "expected 40 hex characters, got {}", len)
            }
            EthAddressError::InvalidHex => write!(f, "invalid hex character"),
        }
    }
}

impl std::error::Error for EthAddressError {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct EthAddress(String);

impl EthAddress {
    /// Parse an address with or without `0x` prefix, in any letter case.
    pub fn parse(input: &str) -> Result<Self, EthAddressError> {
        let body = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if body.len() != 40 {
            return Err(EthAddressError::InvalidLength(body.len()));
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EthAddressError::InvalidHex);
        }
        Ok(EthAddress(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        EthAddress(format!("0x{}", hex::encode(bytes)))
    }

    /// The zero address.
    pub fn zero() -> Self {
        Self::from_bytes([0u8; 20])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Canonical form is validated on construction.
        if let Ok(decoded) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&decoded);
        }
        out
    }

    /// ABI word: the 20 address bytes left-padded to 32 bytes.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.to_bytes());
        word
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EthAddress {
    type Err = EthAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EthAddress {
    type Error = EthAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EthAddress> for String {
    fn from(addr: EthAddress) -> Self {
        addr.0
    }
}

impl JsonSchema for EthAddress {
    fn schema_name() -> String {
        "EthAddress".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}
