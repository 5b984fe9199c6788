//! Wallet extension boundary.
//!
//! RULE: Nothing outside this module and handshake.rs / probe.rs talks to
//! the extension. The extension is a collaborator we can only probe: it may
//! be uninitialised, may want a permission grant, and may expose the same
//! value under several accessor names depending on its version.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet extension not installed")]
    NotInstalled,

    #[error("wallet accessor '{method}' not supported by this extension version")]
    Unsupported { method: &'static str },

    #[error("wallet request rejected: {message}")]
    Rejected { message: String },

    #[error("wallet extension error: {message}")]
    Extension { message: String },
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Account record returned by the user-info and selected-account accessors.
/// Extension versions disagree on the field name, so both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub key:        Option<String>,
}

impl AccountInfo {
    /// `publicKey` first, then `key`.
    pub fn identifier(&self) -> Option<&str> {
        self.public_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| self.key.as_deref().filter(|k| !k.is_empty()))
    }
}

/// The capability surface of a Stellar wallet extension.
///
/// Only the liveness check, the permission request and the primary accessor
/// are mandatory. The three alternates default to `Unsupported`.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Liveness check. `Err` covers "not installed".
    async fn is_connected(&self) -> WalletResult<bool>;

    /// Ask the user to allow this site. Repeating it is harmless.
    async fn request_permission(&self) -> WalletResult<()>;

    /// Primary accessor. May return `None` or an empty string even after
    /// permission was granted.
    async fn get_public_key(&self) -> WalletResult<Option<String>>;

    /// Direct getter exposed on the injected extension object.
    async fn get_public_key_direct(&self) -> WalletResult<Option<String>> {
        Err(WalletError::Unsupported { method: "getPublicKey (direct)" })
    }

    async fn get_user_info(&self) -> WalletResult<Option<AccountInfo>> {
        Err(WalletError::Unsupported { method: "getUserInfo" })
    }

    async fn get_selected_account(&self) -> WalletResult<Option<AccountInfo>> {
        Err(WalletError::Unsupported { method: "getSelectedAccount" })
    }
}
