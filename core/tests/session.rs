mod common;

use common::{harness, record, Harness, ScriptedService, ScriptedWallet, KEY};
use std::sync::Arc;
use stellarep_core::{
    api::ApiError,
    chain::{AnalysisMode, ChainId},
    command::SessionCommand,
    error::{ClientError, MISSING_ADDRESSES_MESSAGE},
    event::SessionEvent,
    wallet::WalletError,
    wizard::Stage,
};
use tokio::sync::Notify;

async fn connected(wallet: ScriptedWallet, service: ScriptedService) -> Harness {
    let h = harness(wallet, service);
    h.engine.connect().await.unwrap();
    h
}

async fn in_chain_selection(service: ScriptedService) -> Harness {
    let h = connected(ScriptedWallet::ready(), service).await;
    h.engine.select_mode(AnalysisMode::CrossChain).await.unwrap();
    h
}

fn event_types(h: &Harness) -> Vec<String> {
    h.engine.events().into_iter().map(|e| e.event_type).collect()
}

// ── Connect ────────────────────────────────────────────────────

#[tokio::test]
async fn connect_moves_to_mode_selection() {
    let h = harness(ScriptedWallet::ready(), ScriptedService::new());
    assert!(h.engine.check_wallet().await);

    let account = h.engine.connect().await.unwrap();
    assert_eq!(account.as_str(), KEY);
    assert_eq!(h.engine.stage(), Stage::SelectingMode);

    let snap = h.engine.snapshot();
    assert_eq!(snap.wallet_available, Some(true));
    assert_eq!(snap.account_short.as_deref(), Some("GBRPYHIL...7QC7OX2H"));
    assert!(!snap.connecting);
    assert_eq!(event_types(&h), vec!["handshake_started", "handshake_succeeded"]);
}

#[tokio::test]
async fn failed_availability_check_does_not_block_connect() {
    let h = harness(
        ScriptedWallet::ready().liveness(Err(WalletError::NotInstalled)),
        ScriptedService::new(),
    );
    assert!(!h.engine.check_wallet().await);
    assert!(h.engine.connect().await.is_ok());
}

#[tokio::test]
async fn failed_handshake_stays_disconnected() {
    let h = harness(ScriptedWallet::new(), ScriptedService::new());

    let err = h.engine.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::HandshakeFailed { attempts: 10, .. }));
    assert_eq!(h.engine.stage(), Stage::Disconnected);
    assert!(!h.engine.is_connecting());
    assert!(h
        .engine
        .events()
        .iter()
        .any(|e| e.event == SessionEvent::HandshakeFailed { attempts: 10 }));
}

#[tokio::test]
async fn second_connect_is_refused_while_the_first_runs() {
    let h = harness(
        ScriptedWallet::new().primary(vec![Ok(None), Ok(Some(KEY.to_string()))]),
        ScriptedService::new(),
    );

    let first = h.engine.connect();
    let second = async {
        tokio::task::yield_now().await;
        assert!(h.engine.is_connecting());
        h.engine.connect().await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().as_str(), KEY);
    assert!(matches!(second, Err(ClientError::HandshakeInProgress)));
    assert_eq!(h.wallet.count("request_permission"), 2);
}

#[tokio::test]
async fn connect_twice_is_an_invalid_transition() {
    let h = connected(ScriptedWallet::ready(), ScriptedService::new()).await;
    let err = h.engine.connect().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidTransition { state: "selecting_mode", action: "connect" }
    ));
}

// ── Single-chain path ──────────────────────────────────────────

#[tokio::test]
async fn stellar_only_is_ready_and_loads_the_stored_score() {
    let h = connected(
        ScriptedWallet::ready(),
        ScriptedService::new().on_fetch(Ok(Some(record(615)))),
    )
    .await;

    h.engine.select_mode(AnalysisMode::StellarOnly).await.unwrap();

    assert_eq!(h.engine.stage(), Stage::Ready);
    let scope = h.engine.scope().unwrap();
    assert_eq!(scope.chains.to_vec(), vec![ChainId::Stellar]);
    assert_eq!(scope.addresses.get(ChainId::Stellar), Some(KEY));
    assert_eq!(scope.addresses.len(), 1);
    assert_eq!(h.service.fetched(), vec![KEY.to_string()]);

    let snap = h.engine.snapshot();
    assert_eq!(snap.score.map(|r| r.total_score), Some(615));
    assert_eq!(snap.score_level.map(|l| l.label()), Some("Great"));
    assert_eq!(snap.chains_label.as_deref(), Some("Stellar"));
}

#[tokio::test]
async fn calculate_is_only_valid_once_ready() {
    let h = in_chain_selection(ScriptedService::new()).await;
    let err = h.engine.calculate().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidTransition { state: "selecting_chains", action: "calculate" }
    ));
    assert!(h.service.requests().is_empty());
}

#[tokio::test]
async fn calculate_failure_surfaces_a_message_and_keeps_the_loaded_score() {
    let h = connected(
        ScriptedWallet::ready(),
        ScriptedService::new()
            .on_fetch(Ok(Some(record(350))))
            .on_calculate(Err(ApiError::Request { message: "timeout".into() })),
    )
    .await;
    h.engine.select_mode(AnalysisMode::StellarOnly).await.unwrap();

    let err = h.engine.calculate().await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to calculate reputation");

    let snap = h.engine.snapshot();
    assert_eq!(snap.score.map(|r| r.total_score), Some(350));
    assert_eq!(snap.error.as_deref(), Some("Failed to calculate reputation"));
    assert!(!snap.busy);
}

// ── Cross-chain path ───────────────────────────────────────────

#[tokio::test]
async fn blank_address_blocks_confirm() {
    let h = in_chain_selection(ScriptedService::new()).await;
    assert!(h.engine.toggle_chain(ChainId::Ethereum).unwrap());

    let err = h.engine.confirm().unwrap_err();
    assert_eq!(err.user_message(), MISSING_ADDRESSES_MESSAGE);
    assert_eq!(h.engine.stage(), Stage::SelectingChains);

    h.engine.set_address(ChainId::Ethereum, "   ").unwrap();
    assert!(h.engine.confirm().is_err());
    assert_eq!(h.engine.stage(), Stage::SelectingChains);
    assert!(h
        .engine
        .events()
        .iter()
        .any(|e| matches!(e.event, SessionEvent::ConfirmRejected { .. })));
}

#[tokio::test]
async fn confirm_needs_a_secondary_chain() {
    let h = in_chain_selection(ScriptedService::new()).await;
    assert!(matches!(h.engine.confirm(), Err(ClientError::Validation { .. })));
}

#[tokio::test]
async fn filled_address_confirms_the_scope() {
    let h = in_chain_selection(ScriptedService::new().on_calculate(Ok(record(720)))).await;
    h.engine.toggle_chain(ChainId::Ethereum).unwrap();
    h.engine.set_address(ChainId::Ethereum, "0xabc").unwrap();

    let scope = h.engine.confirm().unwrap();
    assert_eq!(scope.chains.to_vec(), vec![ChainId::Stellar, ChainId::Ethereum]);
    assert_eq!(scope.addresses.get(ChainId::Ethereum), Some("0xabc"));
    assert_eq!(scope.label(), "Stellar + Ethereum");
    assert_eq!(h.engine.stage(), Stage::Ready);

    // No automatic load on the cross-chain path.
    assert!(h.service.fetched().is_empty());

    let computed = h.engine.calculate().await.unwrap();
    assert_eq!(computed.total_score, 720);
    let sent = h.service.requests().remove(0);
    assert_eq!(sent.stellar_address, KEY);
    assert_eq!(sent.ethereum_address.as_deref(), Some("0xabc"));
}

#[tokio::test]
async fn deselecting_a_chain_drops_its_address() {
    let h = in_chain_selection(ScriptedService::new()).await;
    h.engine.toggle_chain(ChainId::Polygon).unwrap();
    h.engine.set_address(ChainId::Polygon, "0xpoly").unwrap();
    assert!(!h.engine.toggle_chain(ChainId::Polygon).unwrap());

    let snap = h.engine.snapshot();
    assert_eq!(snap.chains, vec![ChainId::Stellar]);
    assert_eq!(snap.addresses.get(ChainId::Polygon), None);
    assert!(h.engine.set_address(ChainId::Polygon, "0xpoly").is_err());
    assert!(h.engine.toggle_chain(ChainId::Stellar).is_err());
}

#[tokio::test]
async fn back_discards_the_selection() {
    let h = in_chain_selection(ScriptedService::new()).await;
    h.engine.toggle_chain(ChainId::Bitcoin).unwrap();
    h.engine.back().unwrap();

    assert_eq!(h.engine.stage(), Stage::SelectingMode);
    h.engine.select_mode(AnalysisMode::CrossChain).await.unwrap();
    assert_eq!(h.engine.snapshot().chains, vec![ChainId::Stellar]);
}

#[tokio::test]
async fn ready_scope_cannot_be_edited() {
    let h = in_chain_selection(ScriptedService::new()).await;
    h.engine.toggle_chain(ChainId::Ethereum).unwrap();
    h.engine.set_address(ChainId::Ethereum, "0xabc").unwrap();
    let scope = h.engine.confirm().unwrap();

    let refused = |r: Result<(), ClientError>| {
        matches!(r, Err(ClientError::InvalidTransition { state: "ready", .. }))
    };
    assert!(refused(h.engine.toggle_chain(ChainId::Bitcoin).map(drop)));
    assert!(refused(h.engine.toggle_chain(ChainId::Ethereum).map(drop)));
    assert!(refused(h.engine.set_address(ChainId::Ethereum, "0xdef")));
    assert!(refused(h.engine.back()));
    assert!(refused(h.engine.confirm().map(drop)));

    assert_eq!(h.engine.stage(), Stage::Ready);
    assert_eq!(h.engine.scope(), Some(scope));
}

// ── Disconnect ─────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_clears_every_trace_of_the_session() {
    let h = connected(
        ScriptedWallet::ready(),
        ScriptedService::new().on_fetch(Ok(Some(record(480)))),
    )
    .await;
    h.engine.select_mode(AnalysisMode::StellarOnly).await.unwrap();
    assert!(h.engine.snapshot().score.is_some());

    h.engine.disconnect();

    let snap = h.engine.snapshot();
    assert_eq!(snap.stage, Stage::Disconnected);
    assert_eq!(snap.account, None);
    assert_eq!(snap.mode, None);
    assert!(snap.chains.is_empty());
    assert!(snap.addresses.is_empty());
    assert!(snap.score.is_none());
    assert_eq!(snap.error, None);
    assert_eq!(h.engine.scope(), None);
}

#[tokio::test]
async fn disconnect_mid_calculation_discards_the_result() {
    let gate = Arc::new(Notify::new());
    let h = connected(
        ScriptedWallet::ready(),
        ScriptedService::new().gated(gate.clone()).on_calculate(Ok(record(999))),
    )
    .await;
    h.engine.select_mode(AnalysisMode::CrossChain).await.unwrap();
    h.engine.toggle_chain(ChainId::Ethereum).unwrap();
    h.engine.set_address(ChainId::Ethereum, "0xabc").unwrap();
    h.engine.confirm().unwrap();

    let calc = h.engine.calculate();
    let leave = async {
        tokio::task::yield_now().await;
        h.engine.disconnect();
        gate.notify_one();
    };
    let (result, ()) = tokio::join!(calc, leave);

    assert!(result.is_ok());
    assert!(h.engine.snapshot().score.is_none());
    assert_eq!(h.engine.stage(), Stage::Disconnected);
    assert_eq!(event_types(&h).last().map(String::as_str), Some("disconnected"));
}

#[tokio::test]
async fn disconnect_mid_handshake_discards_the_account() {
    let h = harness(
        ScriptedWallet::new().primary(vec![
            Ok(None),
            Ok(Some(KEY.to_string())),
            Ok(Some(KEY.to_string())),
        ]),
        ScriptedService::new(),
    );

    let connect = h.engine.connect();
    let leave = async {
        tokio::task::yield_now().await;
        h.engine.disconnect();
    };
    let (result, ()) = tokio::join!(connect, leave);

    assert!(matches!(result, Err(ClientError::HandshakeAbandoned)));
    assert_eq!(h.engine.stage(), Stage::Disconnected);
    assert_eq!(h.engine.account(), None);
    assert!(!h.engine.is_connecting());
    assert!(!event_types(&h).iter().any(|t| t == "handshake_succeeded"));

    // The user can start over.
    assert_eq!(h.engine.connect().await.unwrap().as_str(), KEY);
    assert_eq!(h.engine.stage(), Stage::SelectingMode);
}

#[tokio::test]
async fn disconnect_from_mode_selection() {
    let h = connected(ScriptedWallet::ready(), ScriptedService::new()).await;
    h.engine.disconnect();

    let snap = h.engine.snapshot();
    assert_eq!(snap.stage, Stage::Disconnected);
    assert_eq!(snap.account, None);
    assert_eq!(snap.account_short, None);
    assert!(h.engine.select_mode(AnalysisMode::StellarOnly).await.is_err());
}

#[tokio::test]
async fn disconnect_from_chain_selection_leaves_nothing_behind() {
    let twice = vec![Ok(Some(KEY.to_string())), Ok(Some(KEY.to_string()))];
    let h = connected(ScriptedWallet::new().primary(twice), ScriptedService::new()).await;
    h.engine.select_mode(AnalysisMode::CrossChain).await.unwrap();
    h.engine.toggle_chain(ChainId::Ethereum).unwrap();
    h.engine.toggle_chain(ChainId::Polygon).unwrap();
    h.engine.set_address(ChainId::Ethereum, "0xabc").unwrap();
    h.engine.set_address(ChainId::Polygon, "0xpoly").unwrap();

    h.engine.disconnect();

    let snap = h.engine.snapshot();
    assert_eq!(snap.stage, Stage::Disconnected);
    assert!(snap.chains.is_empty());
    assert!(snap.addresses.is_empty());
    assert_eq!(snap.chains_label, None);

    h.engine.connect().await.unwrap();
    h.engine.select_mode(AnalysisMode::CrossChain).await.unwrap();
    let snap = h.engine.snapshot();
    assert_eq!(snap.chains, vec![ChainId::Stellar]);
    assert_eq!(snap.addresses.len(), 1);
    assert_eq!(snap.addresses.get(ChainId::Stellar), Some(KEY));
}

// ── Commands ───────────────────────────────────────────────────

#[tokio::test]
async fn commands_drive_the_whole_flow() {
    let h = harness(
        ScriptedWallet::ready(),
        ScriptedService::new().on_calculate(Ok(record(810))),
    );
    let script: Vec<SessionCommand> = serde_json::from_str(
        r#"[
            {"cmd":"connect"},
            {"cmd":"select_mode","mode":"cross-chain"},
            {"cmd":"toggle_chain","chain":"ethereum"},
            {"cmd":"set_address","chain":"ethereum","address":"0xabc"},
            {"cmd":"confirm"},
            {"cmd":"calculate"}
        ]"#,
    )
    .unwrap();

    for command in script {
        h.engine.dispatch(command).await.unwrap();
    }

    let snap = h.engine.snapshot();
    assert_eq!(snap.stage, Stage::Ready);
    assert_eq!(snap.mode, Some(AnalysisMode::CrossChain));
    assert_eq!(snap.score.map(|r| r.total_score), Some(810));
    assert_eq!(
        event_types(&h),
        vec![
            "handshake_started",
            "handshake_succeeded",
            "mode_selected",
            "chain_toggled",
            "address_entered",
            "scope_confirmed",
            "score_computed",
        ]
    );

    let drained = h.engine.drain_events();
    assert_eq!(drained.len(), 7);
    assert_eq!(drained.iter().map(|e| e.seq).collect::<Vec<_>>(), (0..7).collect::<Vec<_>>());
    assert!(h.engine.events().is_empty());

    // Sequence numbers keep counting across drains.
    h.engine.dispatch(SessionCommand::Disconnect).await.unwrap();
    let after = h.engine.drain_events();
    assert_eq!(after[0].event, SessionEvent::Disconnected);
    assert_eq!(after[0].seq, 7);
}

#[tokio::test]
async fn snapshot_serializes_for_the_ui() {
    let h = in_chain_selection(ScriptedService::new()).await;
    h.engine.toggle_chain(ChainId::Binance).unwrap();

    let json = serde_json::to_value(h.engine.snapshot()).unwrap();
    assert_eq!(json["stage"], "selecting_chains");
    assert_eq!(json["chains"], serde_json::json!(["stellar", "binance"]));
    assert_eq!(json["addresses"]["binance"], "");
    assert_eq!(json["addresses"]["stellar"], KEY);
    assert_eq!(json["chains_label"], "Stellar + BNB Chain");
}
