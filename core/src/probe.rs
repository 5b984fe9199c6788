//! Wallet availability probe.
//!
//! Advisory only: the result gates the connect affordance, never the
//! acquirer. The extension initialises lazily, so a `false` here can be
//! stale by the time the user clicks connect.

use crate::wallet::WalletExtension;
use std::sync::Arc;

pub struct WalletProbe {
    wallet: Arc<dyn WalletExtension>,
}

impl WalletProbe {
    pub fn new(wallet: Arc<dyn WalletExtension>) -> Self {
        Self { wallet }
    }

    /// One liveness call, no retry. Any error maps to `false`.
    pub async fn is_available(&self) -> bool {
        match self.wallet.is_connected().await {
            Ok(available) => available,
            Err(e) => {
                log::debug!("wallet extension not ready: {e}");
                false
            }
        }
    }
}
