//! Scope wizard: sequences mode selection and chain collection.
//!
//! STATES:
//!   Disconnected    → SelectingMode   (handshake succeeded)
//!   SelectingMode   → Ready           (stellar-only, scope = {stellar})
//!   SelectingMode   → SelectingChains (cross-chain)
//!   SelectingChains → Ready           (confirm, every chain has an address)
//!   SelectingChains → SelectingMode   (back, selection discarded)
//!   any             → Disconnected    (disconnect, unconditional)
//!
//! RULES:
//!   - An action the current state does not define is refused and
//!     leaves the state untouched.
//!   - Confirm is the only validation gate.
//!   - Ready holds a frozen AnalysisScope; nothing mutates it.

use crate::{
    chain::{AddressMap, AnalysisMode, AnalysisScope, ChainId, ChainSelection},
    error::{ClientError, ClientResult, MISSING_ADDRESSES_MESSAGE},
    types::AccountIdentifier,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WizardState {
    #[default]
    Disconnected,
    SelectingMode {
        account: AccountIdentifier,
    },
    SelectingChains {
        account:   AccountIdentifier,
        selection: ChainSelection,
        addresses: AddressMap,
    },
    Ready {
        scope: AnalysisScope,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Disconnected,
    SelectingMode,
    SelectingChains,
    Ready,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Disconnected    => "disconnected",
            Stage::SelectingMode   => "selecting_mode",
            Stage::SelectingChains => "selecting_chains",
            Stage::Ready           => "ready",
        }
    }
}

impl WizardState {
    pub fn stage(&self) -> Stage {
        match self {
            WizardState::Disconnected            => Stage::Disconnected,
            WizardState::SelectingMode { .. }    => Stage::SelectingMode,
            WizardState::SelectingChains { .. }  => Stage::SelectingChains,
            WizardState::Ready { .. }            => Stage::Ready,
        }
    }

    pub fn account(&self) -> Option<&AccountIdentifier> {
        match self {
            WizardState::Disconnected                  => None,
            WizardState::SelectingMode { account }     => Some(account),
            WizardState::SelectingChains { account, .. } => Some(account),
            WizardState::Ready { scope }               => Some(&scope.account),
        }
    }
}

/// One user's wizard. Disconnect replaces the whole value.
#[derive(Debug, Clone)]
pub struct ScopeWizard {
    state:     WizardState,
    /// Secondary chains the user may pick from.
    available: Vec<ChainId>,
}

impl ScopeWizard {
    pub fn new(available: Vec<ChainId>) -> Self {
        Self { state: WizardState::Disconnected, available }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn available_chains(&self) -> &[ChainId] {
        &self.available
    }

    /// The frozen scope, once Ready.
    pub fn scope(&self) -> Option<&AnalysisScope> {
        match &self.state {
            WizardState::Ready { scope } => Some(scope),
            _ => None,
        }
    }

    /// Chains and addresses as currently visible, in any connected state.
    pub fn selection(&self) -> Option<(&ChainSelection, &AddressMap)> {
        match &self.state {
            WizardState::SelectingChains { selection, addresses, .. } => {
                Some((selection, addresses))
            }
            WizardState::Ready { scope } => Some((&scope.chains, &scope.addresses)),
            _ => None,
        }
    }

    pub fn connected(&mut self, account: AccountIdentifier) -> ClientResult<()> {
        if self.stage() != Stage::Disconnected {
            return Err(self.refuse("connect"));
        }
        log::info!("wallet connected: {}", account.short());
        self.state = WizardState::SelectingMode { account };
        Ok(())
    }

    pub fn select_mode(&mut self, mode: AnalysisMode) -> ClientResult<()> {
        let account = match &self.state {
            WizardState::SelectingMode { account } => account.clone(),
            _ => return Err(self.refuse("select_mode")),
        };

        self.state = match mode {
            AnalysisMode::StellarOnly => WizardState::Ready {
                scope: AnalysisScope::stellar_only(account),
            },
            AnalysisMode::CrossChain => WizardState::SelectingChains {
                addresses: AddressMap::for_account(&account),
                selection: ChainSelection::primary_only(),
                account,
            },
        };
        log::info!("analysis mode {mode:?} -> {}", self.stage().name());
        Ok(())
    }

    /// Flip a secondary chain in or out of the selection.
    /// Returns whether the chain is selected afterwards.
    pub fn toggle_chain(&mut self, chain: ChainId) -> ClientResult<bool> {
        let WizardState::SelectingChains { selection, addresses, .. } = &mut self.state else {
            return Err(self.refuse("toggle_chain"));
        };
        if chain.is_primary() || !self.available.contains(&chain) {
            return Err(ClientError::Validation {
                message: format!("{} cannot be toggled", chain.display_name()),
            });
        }

        if selection.remove(chain) {
            addresses.remove(chain);
            log::debug!("chain {chain} deselected");
            Ok(false)
        } else {
            selection.insert(chain);
            addresses.insert(chain, "");
            log::debug!("chain {chain} selected");
            Ok(true)
        }
    }

    pub fn set_address(&mut self, chain: ChainId, address: &str) -> ClientResult<()> {
        let WizardState::SelectingChains { selection, addresses, .. } = &mut self.state else {
            return Err(self.refuse("set_address"));
        };
        if chain.is_primary() || !selection.contains(chain) {
            return Err(ClientError::Validation {
                message: format!("{} is not selected", chain.display_name()),
            });
        }
        addresses.insert(chain, address);
        Ok(())
    }

    /// Freeze the selection. Refused, with no state change, unless at least
    /// one secondary chain is selected and every selected chain has a
    /// non-blank address.
    pub fn confirm(&mut self) -> ClientResult<&AnalysisScope> {
        let WizardState::SelectingChains { account, selection, addresses } = &self.state else {
            return Err(self.refuse("confirm"));
        };
        if !selection.has_secondary() {
            return Err(ClientError::Validation {
                message: "Please select at least one blockchain".into(),
            });
        }
        let missing = addresses.missing_for(selection);
        if !missing.is_empty() {
            log::debug!("confirm refused, missing addresses for {missing:?}");
            return Err(ClientError::Validation { message: MISSING_ADDRESSES_MESSAGE.into() });
        }

        let mut frozen = addresses.clone();
        for chain in selection.secondary() {
            if let Some(address) = addresses.get(chain) {
                frozen.insert(chain, address.trim());
            }
        }
        let scope = AnalysisScope {
            account:   account.clone(),
            mode:      AnalysisMode::CrossChain,
            chains:    selection.clone(),
            addresses: frozen,
        };
        log::info!("scope confirmed: {}", scope.label());
        self.state = WizardState::Ready { scope };
        self.scope().ok_or_else(|| self.refuse("confirm"))
    }

    /// Back to mode selection, discarding chains and addresses.
    pub fn back(&mut self) -> ClientResult<()> {
        let WizardState::SelectingChains { account, .. } = &self.state else {
            return Err(self.refuse("back"));
        };
        self.state = WizardState::SelectingMode { account: account.clone() };
        Ok(())
    }

    fn refuse(&self, action: &'static str) -> ClientError {
        let state = self.stage().name();
        log::debug!("refused '{action}' while {state}");
        ClientError::InvalidTransition { state, action }
    }
}
