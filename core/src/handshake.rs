//! Handshake acquirer: turns "I want the user's account" into a valid
//! AccountIdentifier or a terminal HandshakeFailed.
//!
//! The extension grants permission and exposes the key asynchronously,
//! so reads race the grant. Each attempt:
//!   1. Request permission (best effort; refusal is logged, not fatal).
//!   2. Wait: escalating settle delay on grant, fixed delay on refusal.
//!   3. Primary accessor, then each fallback in priority order.
//!   4. First value passing validation wins.
//!   5. Otherwise wait the retry delay and go again.
//!
//! RULES:
//!   - Attempts run strictly one after another.
//!   - A failing accessor never aborts the loop; only exhaustion is reported.
//!   - No application state is touched until a valid identifier exists.

use crate::{
    clock::Clock,
    config::HandshakeConfig,
    error::{ClientError, ClientResult},
    types::AccountIdentifier,
    wallet::{WalletExtension, WalletResult},
};
use async_trait::async_trait;
use std::sync::Arc;

/// One way of reading the account identifier from the extension.
#[async_trait]
pub trait IdentifierProbe: Send + Sync {
    /// Stable name, used in logs and in the acquisition receipt.
    fn name(&self) -> &'static str;

    async fn try_get_identifier(
        &self,
        wallet: &dyn WalletExtension,
    ) -> WalletResult<Option<String>>;
}

/// `getPublicKey()` from the extension API module.
pub struct PrimaryAccessor;

#[async_trait]
impl IdentifierProbe for PrimaryAccessor {
    fn name(&self) -> &'static str {
        "get_public_key"
    }

    async fn try_get_identifier(
        &self,
        wallet: &dyn WalletExtension,
    ) -> WalletResult<Option<String>> {
        wallet.get_public_key().await
    }
}

/// `getPublicKey()` on the injected extension object.
pub struct DirectGetter;

#[async_trait]
impl IdentifierProbe for DirectGetter {
    fn name(&self) -> &'static str {
        "get_public_key_direct"
    }

    async fn try_get_identifier(
        &self,
        wallet: &dyn WalletExtension,
    ) -> WalletResult<Option<String>> {
        wallet.get_public_key_direct().await
    }
}

pub struct UserInfoGetter;

#[async_trait]
impl IdentifierProbe for UserInfoGetter {
    fn name(&self) -> &'static str {
        "get_user_info"
    }

    async fn try_get_identifier(
        &self,
        wallet: &dyn WalletExtension,
    ) -> WalletResult<Option<String>> {
        Ok(wallet
            .get_user_info()
            .await?
            .and_then(|info| info.identifier().map(str::to_string)))
    }
}

pub struct SelectedAccountGetter;

#[async_trait]
impl IdentifierProbe for SelectedAccountGetter {
    fn name(&self) -> &'static str {
        "get_selected_account"
    }

    async fn try_get_identifier(
        &self,
        wallet: &dyn WalletExtension,
    ) -> WalletResult<Option<String>> {
        Ok(wallet
            .get_selected_account()
            .await?
            .and_then(|info| info.identifier().map(str::to_string)))
    }
}

/// Fallback accessors in priority order.
pub fn default_fallbacks() -> Vec<Box<dyn IdentifierProbe>> {
    vec![
        Box::new(DirectGetter),
        Box::new(UserInfoGetter),
        Box::new(SelectedAccountGetter),
    ]
}

/// Receipt of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub account:  AccountIdentifier,
    /// 1-based attempt on which the identifier was obtained.
    pub attempts: u32,
    pub accessor: &'static str,
}

pub struct HandshakeAcquirer {
    wallet:    Arc<dyn WalletExtension>,
    clock:     Arc<dyn Clock>,
    config:    HandshakeConfig,
    primary:   Box<dyn IdentifierProbe>,
    fallbacks: Vec<Box<dyn IdentifierProbe>>,
}

impl HandshakeAcquirer {
    pub fn new(
        wallet: Arc<dyn WalletExtension>,
        clock:  Arc<dyn Clock>,
        config: HandshakeConfig,
    ) -> Self {
        Self {
            wallet,
            clock,
            config,
            primary:   Box::new(PrimaryAccessor),
            fallbacks: default_fallbacks(),
        }
    }

    /// Append a fallback accessor after the built-in ones.
    pub fn with_fallback(mut self, probe: Box<dyn IdentifierProbe>) -> Self {
        self.fallbacks.push(probe);
        self
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Run the full retry budget. Runs to completion once started.
    pub async fn acquire(&self) -> ClientResult<Acquisition> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_value: Option<String> = None;

        for attempt in 1..=max_attempts {
            log::debug!("handshake attempt {attempt}/{max_attempts}");

            self.request_permission(attempt).await;

            if let Some((account, accessor)) = self.read_identifier(&mut last_value).await {
                log::info!(
                    "handshake succeeded on attempt {attempt} via {accessor}: {}",
                    account.short()
                );
                return Ok(Acquisition { account, attempts: attempt, accessor });
            }

            if attempt < max_attempts {
                log::debug!("attempt {attempt} yielded no valid key, retrying");
                self.clock.sleep(self.config.retry_delay()).await;
            }
        }

        log::error!(
            "handshake failed after {max_attempts} attempts, last value: {last_value:?}"
        );
        Err(ClientError::HandshakeFailed { attempts: max_attempts, last_value })
    }

    async fn request_permission(&self, attempt: u32) {
        match self.wallet.request_permission().await {
            Ok(()) => {
                self.clock.sleep(self.config.settle_delay(attempt)).await;
            }
            Err(e) => {
                // Often just "already allowed"; keep going but make it visible.
                log::warn!("attempt {attempt}: permission request failed, continuing: {e}");
                self.clock.sleep(self.config.permission_failed_delay()).await;
            }
        }
    }

    async fn read_identifier(
        &self,
        last_value: &mut Option<String>,
    ) -> Option<(AccountIdentifier, &'static str)> {
        let probes = std::iter::once(&self.primary).chain(self.fallbacks.iter());

        for probe in probes {
            match probe.try_get_identifier(self.wallet.as_ref()).await {
                Ok(Some(raw)) => {
                    if let Some(account) =
                        AccountIdentifier::validate(&raw, &self.config.identifier_prefix)
                    {
                        return Some((account, probe.name()));
                    }
                    log::debug!("{} returned unusable value {raw:?}", probe.name());
                    *last_value = Some(raw);
                }
                Ok(None) => log::debug!("{} returned nothing", probe.name()),
                Err(e) => log::debug!("{} failed: {e}", probe.name()),
            }
        }
        None
    }
}
