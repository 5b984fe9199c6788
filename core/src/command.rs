use crate::chain::{AnalysisMode, ChainId};
use serde::{Deserialize, Serialize};

/// All user-issued session commands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum SessionCommand {
    // ── Wallet ────────────────────────────────────
    Connect,
    Disconnect,

    // ── Wizard ────────────────────────────────────
    SelectMode { mode: AnalysisMode },
    ToggleChain { chain: ChainId },
    SetAddress {
        chain:   ChainId,
        address: String,
    },
    Confirm,
    Back,

    // ── Score ─────────────────────────────────────
    Calculate,
    Refresh,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Connect            => "connect",
            SessionCommand::Disconnect         => "disconnect",
            SessionCommand::SelectMode { .. }  => "select_mode",
            SessionCommand::ToggleChain { .. } => "toggle_chain",
            SessionCommand::SetAddress { .. }  => "set_address",
            SessionCommand::Confirm            => "confirm",
            SessionCommand::Back               => "back",
            SessionCommand::Calculate          => "calculate",
            SessionCommand::Refresh            => "refresh",
        }
    }
}
