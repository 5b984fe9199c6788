//! Remote scoring service client.
//!
//! RULE: Only api.rs talks HTTP. The controller depends on the
//! ScoringService trait, never on reqwest types.

use crate::{
    chain::{AddressMap, ChainId},
    config::ClientConfig,
    score::ScoreRecord,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api_base_url_missing")]
    BaseUrlMissing,
    #[error("api_invalid_path")]
    InvalidPath,
    #[error("api_request_failed:{message}")]
    Request { message: String },
    #[error("api_read_failed:{message}")]
    Read { message: String },
    #[error("api_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("api_json_decode_failed:{message}")]
    Decode { message: String },
}

/// Body of `POST /reputation/calculate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub stellar_address:  String,
    pub ethereum_address: Option<String>,
}

impl ScoreRequest {
    /// Primary address from the Stellar entry, secondary from the Ethereum
    /// entry. Other chains are not scored by the service.
    pub fn from_addresses(addresses: &AddressMap) -> Option<Self> {
        let stellar_address = addresses
            .get(ChainId::Stellar)
            .map(str::trim)
            .filter(|a| !a.is_empty())?
            .to_string();
        let ethereum_address = addresses
            .get(ChainId::Ethereum)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        Some(Self { stellar_address, ethereum_address })
    }
}

#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Compute (and store) a fresh score.
    async fn calculate(&self, request: &ScoreRequest) -> Result<ScoreRecord, ApiError>;

    /// Last computed score, `None` when the service has none.
    async fn fetch(&self, stellar_address: &str) -> Result<Option<ScoreRecord>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpScoringClient {
    base_url: String,
    timeout:  Duration,
    http:     reqwest::Client,
}

impl HttpScoringClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout:  timeout.max(Duration::from_millis(250)),
            http:     reqwest::Client::new(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    pub fn calculate_path() -> &'static str {
        "/reputation/calculate"
    }

    pub fn reputation_path(stellar_address: &str) -> String {
        format!("/reputation/{}", stellar_address.trim())
    }

    fn request_id() -> String {
        format!("req_{}", Uuid::new_v4().simple())
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn calculate(&self, request: &ScoreRequest) -> Result<ScoreRecord, ApiError> {
        let url = self
            .endpoint(Self::calculate_path())
            .ok_or(ApiError::InvalidPath)?;
        log::debug!("POST {url}");

        let response = self
            .http
            .post(url.as_str())
            .header("x-request-id", Self::request_id())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Request { message: e.to_string() })?;

        decode_json_response(response).await
    }

    async fn fetch(&self, stellar_address: &str) -> Result<Option<ScoreRecord>, ApiError> {
        if stellar_address.trim().is_empty() {
            return Err(ApiError::InvalidPath);
        }
        let url = self
            .endpoint(&Self::reputation_path(stellar_address))
            .ok_or(ApiError::InvalidPath)?;
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url.as_str())
            .header("x-request-id", Self::request_id())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Request { message: e.to_string() })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_json_response(response).await.map(Some)
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiError::Http { status, body }
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Read { message: e.to_string() })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|e| ApiError::Decode { message: e.to_string() })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
