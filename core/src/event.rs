//! Session event log.
//!
//! RULE: Every state change the engine makes is recorded here, in the
//! order it happened. Presentation and the IPC runner read the log;
//! nothing in the core branches on it.

use crate::chain::{AnalysisMode, ChainId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Handshake ──────────────────────────────────
    HandshakeStarted,
    HandshakeSucceeded {
        account:  String,
        attempts: u32,
        accessor: String,
    },
    HandshakeFailed {
        attempts: u32,
    },

    // ── Wizard ─────────────────────────────────────
    ModeSelected {
        mode: AnalysisMode,
    },
    ChainToggled {
        chain:    ChainId,
        selected: bool,
    },
    AddressEntered {
        chain: ChainId,
    },
    ConfirmRejected {
        reason: String,
    },
    ScopeConfirmed {
        chains: Vec<ChainId>,
    },
    BackToModeSelection,
    Disconnected,

    // ── Score ──────────────────────────────────────
    ScoreLoaded {
        found: bool,
    },
    ScoreComputed {
        total_score: u32,
        on_chain:    bool,
    },
    ScoreFailed {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub at:         DateTime<Utc>,
    pub event_type: String,
    pub event:      SessionEvent,
}

impl EventLogEntry {
    pub fn new(seq: u64, event: SessionEvent) -> Self {
        Self {
            seq,
            at: Utc::now(),
            event_type: event_type_name(&event).to_string(),
            event,
        }
    }
}

/// Stable string name for a SessionEvent variant.
pub fn event_type_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::HandshakeStarted          => "handshake_started",
        SessionEvent::HandshakeSucceeded { .. } => "handshake_succeeded",
        SessionEvent::HandshakeFailed { .. }    => "handshake_failed",
        SessionEvent::ModeSelected { .. }       => "mode_selected",
        SessionEvent::ChainToggled { .. }       => "chain_toggled",
        SessionEvent::AddressEntered { .. }     => "address_entered",
        SessionEvent::ConfirmRejected { .. }    => "confirm_rejected",
        SessionEvent::ScopeConfirmed { .. }     => "scope_confirmed",
        SessionEvent::BackToModeSelection       => "back_to_mode_selection",
        SessionEvent::Disconnected              => "disconnected",
        SessionEvent::ScoreLoaded { .. }        => "score_loaded",
        SessionEvent::ScoreComputed { .. }      => "score_computed",
        SessionEvent::ScoreFailed { .. }        => "score_failed",
    }
}
