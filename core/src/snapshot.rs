//! Snapshot serialization: the full presentation-facing session state.
//!
//! A snapshot is the only thing the UI (or the IPC runner) reads. It is
//! rebuilt from the engine on demand and never fed back in.

use crate::{
    chain::{AddressMap, AnalysisMode, ChainId},
    score::{ScoreLevel, ScoreRecord},
    wizard::Stage,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub stage:            Stage,
    pub wallet_available: Option<bool>,
    pub connecting:       bool,
    pub account:          Option<String>,
    pub account_short:    Option<String>,
    pub mode:             Option<AnalysisMode>,
    pub chains:           Vec<ChainId>,
    pub chains_label:     Option<String>,
    pub addresses:        AddressMap,
    pub available_chains: Vec<ChainId>,
    pub busy:             bool,
    pub score:            Option<ScoreRecord>,
    pub score_level:      Option<ScoreLevel>,
    pub error:            Option<String>,
}
