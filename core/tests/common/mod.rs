//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stellarep_core::{
    api::{ApiError, ScoreRequest, ScoringService},
    chain::AddressMap,
    clock::RecordingClock,
    config::ClientConfig,
    engine::SessionEngine,
    score::ScoreRecord,
    types::AccountIdentifier,
    wallet::{AccountInfo, WalletError, WalletExtension, WalletResult},
};
use tokio::sync::Notify;

pub const KEY: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn account() -> AccountIdentifier {
    AccountIdentifier::validate(KEY, "G").unwrap()
}

pub fn stellar_addresses() -> AddressMap {
    AddressMap::for_account(&account())
}

pub fn record(total: u32) -> ScoreRecord {
    serde_json::from_value(serde_json::json!({
        "stellarAddress": KEY,
        "totalScore":     total,
        "stellarScore":   total,
        "onChain":        false,
    }))
    .unwrap()
}

type Script<T> = Mutex<VecDeque<WalletResult<T>>>;

fn next<T>(script: &Script<T>, fallback: WalletResult<T>) -> WalletResult<T> {
    script.lock().unwrap().pop_front().unwrap_or(fallback)
}

/// Wallet whose every accessor answers from a per-call script. Once a
/// script runs out the accessor keeps returning its idle answer.
pub struct ScriptedWallet {
    liveness:   Mutex<WalletResult<bool>>,
    permission: Script<()>,
    primary:    Script<Option<String>>,
    direct:     Option<Script<Option<String>>>,
    user_info:  Option<Script<Option<AccountInfo>>>,
    selected:   Option<Script<Option<AccountInfo>>>,
    calls:      Mutex<Vec<&'static str>>,
}

impl Default for ScriptedWallet {
    fn default() -> Self {
        Self {
            liveness:   Mutex::new(Ok(true)),
            permission: Mutex::new(VecDeque::new()),
            primary:    Mutex::new(VecDeque::new()),
            direct:     None,
            user_info:  None,
            selected:   None,
            calls:      Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary accessor returns a valid key on the first attempt.
    pub fn ready() -> Self {
        Self::new().primary(vec![Ok(Some(KEY.to_string()))])
    }

    pub fn liveness(self, answer: WalletResult<bool>) -> Self {
        *self.liveness.lock().unwrap() = answer;
        self
    }

    pub fn permission(self, script: Vec<WalletResult<()>>) -> Self {
        *self.permission.lock().unwrap() = script.into();
        self
    }

    pub fn primary(self, script: Vec<WalletResult<Option<String>>>) -> Self {
        *self.primary.lock().unwrap() = script.into();
        self
    }

    pub fn direct(mut self, script: Vec<WalletResult<Option<String>>>) -> Self {
        self.direct = Some(Mutex::new(script.into()));
        self
    }

    pub fn user_info(mut self, script: Vec<WalletResult<Option<AccountInfo>>>) -> Self {
        self.user_info = Some(Mutex::new(script.into()));
        self
    }

    pub fn selected(mut self, script: Vec<WalletResult<Option<AccountInfo>>>) -> Self {
        self.selected = Some(Mutex::new(script.into()));
        self
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    fn called(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

#[async_trait]
impl WalletExtension for ScriptedWallet {
    async fn is_connected(&self) -> WalletResult<bool> {
        self.called("is_connected");
        self.liveness.lock().unwrap().clone()
    }

    async fn request_permission(&self) -> WalletResult<()> {
        self.called("request_permission");
        next(&self.permission, Ok(()))
    }

    async fn get_public_key(&self) -> WalletResult<Option<String>> {
        self.called("get_public_key");
        next(&self.primary, Ok(None))
    }

    async fn get_public_key_direct(&self) -> WalletResult<Option<String>> {
        self.called("get_public_key_direct");
        match &self.direct {
            Some(script) => next(script, Ok(None)),
            None => Err(WalletError::Unsupported { method: "getPublicKey (direct)" }),
        }
    }

    async fn get_user_info(&self) -> WalletResult<Option<AccountInfo>> {
        self.called("get_user_info");
        match &self.user_info {
            Some(script) => next(script, Ok(None)),
            None => Err(WalletError::Unsupported { method: "getUserInfo" }),
        }
    }

    async fn get_selected_account(&self) -> WalletResult<Option<AccountInfo>> {
        self.called("get_selected_account");
        match &self.selected {
            Some(script) => next(script, Ok(None)),
            None => Err(WalletError::Unsupported { method: "getSelectedAccount" }),
        }
    }
}

/// Scoring service answering from queued responses. With a gate set,
/// every call parks until the gate is notified.
#[derive(Default)]
pub struct ScriptedService {
    calculate: Mutex<VecDeque<Result<ScoreRecord, ApiError>>>,
    fetch:     Mutex<VecDeque<Result<Option<ScoreRecord>, ApiError>>>,
    gate:      Option<Arc<Notify>>,
    requests:  Mutex<Vec<ScoreRequest>>,
    fetched:   Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn on_calculate(self, response: Result<ScoreRecord, ApiError>) -> Self {
        self.calculate.lock().unwrap().push_back(response);
        self
    }

    pub fn on_fetch(self, response: Result<Option<ScoreRecord>, ApiError>) -> Self {
        self.fetch.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ScoreRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl ScoringService for ScriptedService {
    async fn calculate(&self, request: &ScoreRequest) -> Result<ScoreRecord, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.wait_for_gate().await;
        let response = self.calculate.lock().unwrap().pop_front();
        response.unwrap_or_else(|| Err(ApiError::Request { message: "no scripted response".into() }))
    }

    async fn fetch(&self, stellar_address: &str) -> Result<Option<ScoreRecord>, ApiError> {
        self.fetched.lock().unwrap().push(stellar_address.to_string());
        self.wait_for_gate().await;
        let response = self.fetch.lock().unwrap().pop_front();
        response.unwrap_or(Ok(None))
    }
}

pub struct Harness {
    pub engine:  SessionEngine,
    pub wallet:  Arc<ScriptedWallet>,
    pub service: Arc<ScriptedService>,
    pub clock:   Arc<RecordingClock>,
}

pub fn harness(wallet: ScriptedWallet, service: ScriptedService) -> Harness {
    init_logs();
    let wallet = Arc::new(wallet);
    let service = Arc::new(service);
    let clock = Arc::new(RecordingClock::new());
    let engine = SessionEngine::new(
        ClientConfig::default(),
        wallet.clone(),
        service.clone(),
        clock.clone(),
    );
    Harness { engine, wallet, service, clock }
}
