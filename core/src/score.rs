//! Score record returned by the remote scoring service.
//!
//! Total is the sum of three components:
//!   - stellar  [0, 400]
//!   - ethereum [0, 400]
//!   - social   [0, 200]
//!
//! The service may omit or null out numbers it could not compute, so every
//! numeric field defaults to zero instead of failing the decode.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    #[serde(default)]
    pub stellar_address:  Option<String>,
    #[serde(default)]
    pub ethereum_address: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score:      u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stellar_score:    u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ethereum_score:   u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub social_score:     u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub breakdown:        ScoreBreakdown,
    #[serde(default)]
    pub calculated_at:    Option<NaiveDateTime>,
    /// Whether the service has committed the score to the Soroban contract.
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_chain:         bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_age_days:           u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transaction_count:          u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stellar_balance:            f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_ethereum_history:       bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ethereum_age_days:          u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ethereum_transaction_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ethereum_balance:           f64,
}

/// The service serialises absent numbers as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScoreRecord {
    pub fn level(&self) -> ScoreLevel {
        ScoreLevel::for_total(self.total_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Excellent, // >= 800
    Great,     // >= 600
    Good,      // >= 400
    Fair,      // >= 200
    Building,
}

impl ScoreLevel {
    pub fn for_total(total: u32) -> Self {
        match total {
            800.. => ScoreLevel::Excellent,
            600.. => ScoreLevel::Great,
            400.. => ScoreLevel::Good,
            200.. => ScoreLevel::Fair,
            _     => ScoreLevel::Building,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreLevel::Excellent => "Excellent",
            ScoreLevel::Great     => "Great",
            ScoreLevel::Good      => "Good",
            ScoreLevel::Fair      => "Fair",
            ScoreLevel::Building  => "Building",
        }
    }
}

impl fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
