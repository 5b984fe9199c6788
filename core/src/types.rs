//! Shared primitive types used across the client core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix every Stellar account key starts with.
pub const STELLAR_KEY_PREFIX: &str = "G";

/// A free-form address string typed in by the user for a secondary chain.
pub type Address = String;

/// The durable account identifier issued by the wallet extension.
///
/// Only constructed through [`AccountIdentifier::validate`], so a value of this
/// type is always non-empty and carries the expected prefix. Decoding goes
/// through the same check with the Stellar prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountIdentifier(String);

impl AccountIdentifier {
    /// Accept `raw` only if it is a non-empty string starting with `prefix`.
    pub fn validate(raw: &str, prefix: &str) -> Option<Self> {
        if raw.is_empty() || !raw.starts_with(prefix) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dashboard form: `GABCDEFG...WXYZ` (first 8 chars, tail from index 48).
    pub fn short(&self) -> String {
        let key = self.0.as_str();
        match (key.get(..8), key.get(48..)) {
            (Some(head), Some(tail)) => format!("{head}...{tail}"),
            _ => key.to_string(),
        }
    }
}

impl fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountIdentifier {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::validate(&raw, STELLAR_KEY_PREFIX)
            .ok_or_else(|| format!("not a Stellar account key: {raw:?}"))
    }
}

impl From<AccountIdentifier> for String {
    fn from(id: AccountIdentifier) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
