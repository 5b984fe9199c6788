//! Chains, chain selection and the per-chain address map.
//!
//! RULE: ChainSelection always holds the primary chain first.
//! AddressMap entries follow selection membership: a chain enters the
//! selection together with an (empty) entry and leaves with it.

use crate::types::{AccountIdentifier, Address};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Stellar,
    Ethereum,
    Bitcoin,
    Polygon,
    Binance,
}

impl ChainId {
    /// The chain whose wallet performs the handshake.
    pub const PRIMARY: ChainId = ChainId::Stellar;

    /// Chains a user can add for cross-chain analysis, in display order.
    pub const SECONDARY: [ChainId; 4] = [
        ChainId::Ethereum,
        ChainId::Bitcoin,
        ChainId::Polygon,
        ChainId::Binance,
    ];

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }

    pub fn id(self) -> &'static str {
        match self {
            ChainId::Stellar  => "stellar",
            ChainId::Ethereum => "ethereum",
            ChainId::Bitcoin  => "bitcoin",
            ChainId::Polygon  => "polygon",
            ChainId::Binance  => "binance",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChainId::Stellar  => "Stellar",
            ChainId::Ethereum => "Ethereum",
            ChainId::Bitcoin  => "Bitcoin",
            ChainId::Polygon  => "Polygon",
            ChainId::Binance  => "BNB Chain",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stellar"  => Ok(ChainId::Stellar),
            "ethereum" => Ok(ChainId::Ethereum),
            "bitcoin"  => Ok(ChainId::Bitcoin),
            "polygon"  => Ok(ChainId::Polygon),
            "binance"  => Ok(ChainId::Binance),
            other      => Err(format!("unknown chain '{other}'")),
        }
    }
}

// ── Analysis mode ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    StellarOnly,
    CrossChain,
}

// ── Chain selection ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChainId>", into = "Vec<ChainId>")]
pub struct ChainSelection {
    chains: Vec<ChainId>,
}

impl ChainSelection {
    pub fn primary_only() -> Self {
        Self { chains: vec![ChainId::PRIMARY] }
    }

    pub fn contains(&self, chain: ChainId) -> bool {
        self.chains.contains(&chain)
    }

    pub fn iter(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.iter().copied()
    }

    pub fn secondary(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.iter().filter(|c| !c.is_primary())
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ChainId> {
        self.chains.clone()
    }

    /// `Stellar + Ethereum`, as shown in the dashboard header.
    pub fn label(&self) -> String {
        self.iter()
            .map(ChainId::display_name)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// Append a secondary chain. Returns false if already present or primary.
    pub(crate) fn insert(&mut self, chain: ChainId) -> bool {
        if chain.is_primary() || self.contains(chain) {
            return false;
        }
        self.chains.push(chain);
        true
    }

    /// Drop a secondary chain. The primary chain cannot be removed.
    pub(crate) fn remove(&mut self, chain: ChainId) -> bool {
        if chain.is_primary() {
            return false;
        }
        let before = self.chains.len();
        self.chains.retain(|c| *c != chain);
        self.chains.len() != before
    }
}

impl TryFrom<Vec<ChainId>> for ChainSelection {
    type Error = String;

    fn try_from(chains: Vec<ChainId>) -> Result<Self, Self::Error> {
        let Some((first, rest)) = chains.split_first() else {
            return Err("chain selection is empty".into());
        };
        if !first.is_primary() {
            return Err(format!("chain selection must start with {}", ChainId::PRIMARY));
        }
        let mut selection = Self::primary_only();
        for chain in rest {
            if !selection.insert(*chain) {
                return Err(format!("{chain} appears more than once"));
            }
        }
        Ok(selection)
    }
}

impl From<ChainSelection> for Vec<ChainId> {
    fn from(selection: ChainSelection) -> Self {
        selection.chains
    }
}

impl Default for ChainSelection {
    fn default() -> Self {
        Self::primary_only()
    }
}

// ── Address map ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressMap {
    entries: BTreeMap<ChainId, Address>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map holding only the primary chain's account.
    pub fn for_account(account: &AccountIdentifier) -> Self {
        let mut map = Self::new();
        map.insert(ChainId::PRIMARY, account.as_str());
        map
    }

    pub fn get(&self, chain: ChainId) -> Option<&str> {
        self.entries.get(&chain).map(String::as_str)
    }

    pub fn contains(&self, chain: ChainId) -> bool {
        self.entries.contains_key(&chain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChainId, &str)> {
        self.entries.iter().map(|(c, a)| (*c, a.as_str()))
    }

    /// Chains of `selection` whose entry is missing or blank.
    pub fn missing_for(&self, selection: &ChainSelection) -> Vec<ChainId> {
        selection
            .iter()
            .filter(|c| self.get(*c).map_or(true, |a| a.trim().is_empty()))
            .collect()
    }

    pub(crate) fn insert(&mut self, chain: ChainId, address: impl Into<Address>) {
        self.entries.insert(chain, address.into());
    }

    pub(crate) fn remove(&mut self, chain: ChainId) {
        self.entries.remove(&chain);
    }
}

// ── Finalized scope ────────────────────────────────────────────────

/// The frozen output of the scope wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisScope {
    pub account:   AccountIdentifier,
    pub mode:      AnalysisMode,
    pub chains:    ChainSelection,
    pub addresses: AddressMap,
}

impl AnalysisScope {
    pub fn stellar_only(account: AccountIdentifier) -> Self {
        let addresses = AddressMap::for_account(&account);
        Self {
            account,
            mode: AnalysisMode::StellarOnly,
            chains: ChainSelection::primary_only(),
            addresses,
        }
    }

    pub fn label(&self) -> String {
        self.chains.label()
    }
}
