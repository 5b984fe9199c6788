//! The session engine: wires wallet, wizard and score controller.
//!
//! FLOW:
//!   1. Probe        (advisory: is the extension there?)
//!   2. Handshake    (acquire the account identifier)
//!   3. Wizard       (mode, optional chains, confirm)
//!   4. Controller   (load existing on single-chain entry, compute on demand)
//!
//! RULES:
//!   - One connect at a time; a second is refused while the first runs.
//!   - The wizard lock is never held across an await.
//!   - Disconnect replaces the wizard with a fresh one and resets the
//!     controller; nothing from the old session survives, including a
//!     handshake that finishes after the disconnect.
//!   - Every state change is appended to the event log.

use crate::{
    api::{ApiError, HttpScoringClient, ScoringService},
    chain::{AnalysisMode, AnalysisScope, ChainId},
    clock::{Clock, TokioClock},
    command::SessionCommand,
    config::ClientConfig,
    controller::{BusyGuard, ScoreController},
    error::{ClientError, ClientResult},
    event::{EventLogEntry, SessionEvent},
    handshake::HandshakeAcquirer,
    probe::WalletProbe,
    score::ScoreRecord,
    snapshot::SessionSnapshot,
    types::AccountIdentifier,
    wallet::WalletExtension,
    wizard::{ScopeWizard, Stage},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct SessionEngine {
    config:           ClientConfig,
    probe:            WalletProbe,
    acquirer:         HandshakeAcquirer,
    controller:       ScoreController,
    wizard:           Mutex<ScopeWizard>,
    connecting:       AtomicBool,
    wallet_available: Mutex<Option<bool>>,
    events:           Mutex<Vec<EventLogEntry>>,
    next_seq:         AtomicU64,
}

impl SessionEngine {
    pub fn new(
        config:  ClientConfig,
        wallet:  Arc<dyn WalletExtension>,
        service: Arc<dyn ScoringService>,
        clock:   Arc<dyn Clock>,
    ) -> Self {
        Self {
            probe:            WalletProbe::new(wallet.clone()),
            acquirer:         HandshakeAcquirer::new(wallet, clock, config.handshake.clone()),
            controller:       ScoreController::new(service),
            wizard:           Mutex::new(ScopeWizard::new(config.available_chains.clone())),
            connecting:       AtomicBool::new(false),
            wallet_available: Mutex::new(None),
            events:           Mutex::new(Vec::new()),
            next_seq:         AtomicU64::new(0),
            config,
        }
    }

    /// Production wiring: HTTP scoring client and the tokio timer.
    pub fn build(config: ClientConfig, wallet: Arc<dyn WalletExtension>) -> Result<Self, ApiError> {
        let service = Arc::new(HttpScoringClient::from_config(&config)?);
        Ok(Self::new(config, wallet, service, Arc::new(TokioClock)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn controller(&self) -> &ScoreController {
        &self.controller
    }

    pub fn stage(&self) -> Stage {
        self.wizard().stage()
    }

    pub fn account(&self) -> Option<AccountIdentifier> {
        self.wizard().state().account().cloned()
    }

    pub fn scope(&self) -> Option<AnalysisScope> {
        self.wizard().scope().cloned()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    // ── Wallet ─────────────────────────────────────────────────

    /// Probe the extension and remember the answer for snapshots.
    pub async fn check_wallet(&self) -> bool {
        let available = self.probe.is_available().await;
        *self.wallet_available.lock().unwrap_or_else(PoisonError::into_inner) = Some(available);
        available
    }

    /// Run the handshake and enter mode selection.
    pub async fn connect(&self) -> ClientResult<AccountIdentifier> {
        if self.stage() != Stage::Disconnected {
            return Err(ClientError::InvalidTransition {
                state:  self.stage().name(),
                action: "connect",
            });
        }
        let _in_flight =
            BusyGuard::try_acquire(&self.connecting).ok_or(ClientError::HandshakeInProgress)?;

        self.record(SessionEvent::HandshakeStarted);
        let generation = self.controller.generation();
        let acquisition = match self.acquirer.acquire().await {
            Ok(acquisition) => acquisition,
            Err(e) => {
                if let ClientError::HandshakeFailed { attempts, .. } = &e {
                    self.record_for(generation, SessionEvent::HandshakeFailed {
                        attempts: *attempts,
                    });
                }
                return Err(e);
            }
        };

        {
            let mut wizard = self.wizard();
            if self.controller.generation() != generation {
                log::info!(
                    "disconnected during handshake, dropping {}",
                    acquisition.account.short()
                );
                return Err(ClientError::HandshakeAbandoned);
            }
            wizard.connected(acquisition.account.clone())?;
        }
        self.record(SessionEvent::HandshakeSucceeded {
            account:  acquisition.account.to_string(),
            attempts: acquisition.attempts,
            accessor: acquisition.accessor.to_string(),
        });
        Ok(acquisition.account)
    }

    /// Unconditional. Replaces the whole session.
    pub fn disconnect(&self) {
        {
            // Reset under the wizard lock so a finishing connect sees the bump.
            let mut wizard = self.wizard();
            self.controller.reset();
            *wizard = ScopeWizard::new(self.config.available_chains.clone());
        }
        log::info!("session disconnected");
        self.record(SessionEvent::Disconnected);
    }

    // ── Wizard ─────────────────────────────────────────────────

    /// Choose the analysis mode. Entering Ready through the single-chain
    /// path loads any stored score straight away.
    pub async fn select_mode(&self, mode: AnalysisMode) -> ClientResult<()> {
        let ready_account = {
            let mut wizard = self.wizard();
            wizard.select_mode(mode)?;
            wizard.scope().map(|scope| scope.account.clone())
        };
        self.record(SessionEvent::ModeSelected { mode });

        if let Some(account) = ready_account {
            let generation = self.controller.generation();
            match self.controller.load_existing(&account).await {
                Ok(found) => self.record_for(generation, SessionEvent::ScoreLoaded {
                    found: found.is_some(),
                }),
                Err(e) => log::debug!("automatic score load skipped: {e}"),
            }
        }
        Ok(())
    }

    pub fn toggle_chain(&self, chain: ChainId) -> ClientResult<bool> {
        let selected = self.wizard().toggle_chain(chain)?;
        self.record(SessionEvent::ChainToggled { chain, selected });
        Ok(selected)
    }

    pub fn set_address(&self, chain: ChainId, address: &str) -> ClientResult<()> {
        self.wizard().set_address(chain, address)?;
        self.record(SessionEvent::AddressEntered { chain });
        Ok(())
    }

    pub fn confirm(&self) -> ClientResult<AnalysisScope> {
        let result = self.wizard().confirm().cloned();
        match result {
            Ok(scope) => {
                self.record(SessionEvent::ScopeConfirmed { chains: scope.chains.to_vec() });
                Ok(scope)
            }
            Err(e) => {
                if let ClientError::Validation { message } = &e {
                    self.record(SessionEvent::ConfirmRejected { reason: message.clone() });
                }
                Err(e)
            }
        }
    }

    pub fn back(&self) -> ClientResult<()> {
        self.wizard().back()?;
        self.record(SessionEvent::BackToModeSelection);
        Ok(())
    }

    // ── Score ──────────────────────────────────────────────────

    /// The explicit "calculate" action. Only valid once Ready.
    pub async fn calculate(&self) -> ClientResult<ScoreRecord> {
        let scope = self.ready_scope("calculate")?;
        let generation = self.controller.generation();
        match self.controller.compute_new(&scope.addresses).await {
            Ok(record) => {
                self.record_for(generation, SessionEvent::ScoreComputed {
                    total_score: record.total_score,
                    on_chain:    record.on_chain,
                });
                Ok(record)
            }
            Err(e) => {
                if let ClientError::RemoteCall { .. } = &e {
                    self.record_for(generation, SessionEvent::ScoreFailed {
                        message: e.user_message(),
                    });
                }
                Err(e)
            }
        }
    }

    /// Re-fetch the stored score for the connected account.
    pub async fn refresh(&self) -> ClientResult<Option<ScoreRecord>> {
        let scope = self.ready_scope("refresh")?;
        let generation = self.controller.generation();
        let found = self.controller.load_existing(&scope.account).await?;
        self.record_for(generation, SessionEvent::ScoreLoaded { found: found.is_some() });
        Ok(found)
    }

    // ── Commands ───────────────────────────────────────────────

    pub async fn dispatch(&self, command: SessionCommand) -> ClientResult<()> {
        log::debug!("command: {}", command.name());
        match command {
            SessionCommand::Connect => self.connect().await.map(drop),
            SessionCommand::Disconnect => {
                self.disconnect();
                Ok(())
            }
            SessionCommand::SelectMode { mode } => self.select_mode(mode).await,
            SessionCommand::ToggleChain { chain } => self.toggle_chain(chain).map(drop),
            SessionCommand::SetAddress { chain, address } => self.set_address(chain, &address),
            SessionCommand::Confirm => self.confirm().map(drop),
            SessionCommand::Back => self.back(),
            SessionCommand::Calculate => self.calculate().await.map(drop),
            SessionCommand::Refresh => self.refresh().await.map(drop),
        }
    }

    // ── Observation ────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        let wizard = self.wizard();
        let account = wizard.state().account();
        let (chains, addresses) = wizard
            .selection()
            .map(|(c, a)| (c.to_vec(), a.clone()))
            .unwrap_or_default();
        let score = self.controller.score();

        SessionSnapshot {
            stage:            wizard.stage(),
            wallet_available: *self.wallet_available.lock().unwrap_or_else(PoisonError::into_inner),
            connecting:       self.is_connecting(),
            account:          account.map(|a| a.to_string()),
            account_short:    account.map(AccountIdentifier::short),
            mode:             wizard.scope().map(|s| s.mode),
            chains_label:     wizard.selection().map(|(c, _)| c.label()),
            chains,
            addresses,
            available_chains: wizard.available_chains().to_vec(),
            busy:             self.controller.is_busy(),
            score_level:      score.as_ref().map(ScoreRecord::level),
            score,
            error:            self.controller.last_error(),
        }
    }

    pub fn events(&self) -> Vec<EventLogEntry> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Take the events logged since the last drain.
    pub fn drain_events(&self) -> Vec<EventLogEntry> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn ready_scope(&self, action: &'static str) -> ClientResult<AnalysisScope> {
        let wizard = self.wizard();
        wizard.scope().cloned().ok_or(ClientError::InvalidTransition {
            state: wizard.stage().name(),
            action,
        })
    }

    fn record(&self, event: SessionEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
        events.push(EventLogEntry::new(seq, event));
    }

    /// Log a call result only if no disconnect happened while it ran.
    fn record_for(&self, generation: u64, event: SessionEvent) {
        if self.controller.generation() == generation {
            self.record(event);
        }
    }

    fn wizard(&self) -> MutexGuard<'_, ScopeWizard> {
        self.wizard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
