use crate::api::ApiError;
use thiserror::Error;

/// Message shown when a confirm is attempted with blank addresses.
pub const MISSING_ADDRESSES_MESSAGE: &str =
    "Please enter wallet addresses for all selected blockchains";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Handshake failed after {attempts} attempts (last value: {last_value:?})")]
    HandshakeFailed {
        attempts:   u32,
        last_value: Option<String>,
    },

    #[error("Handshake already in progress")]
    HandshakeInProgress,

    #[error("Handshake result discarded: session was disconnected while it ran")]
    HandshakeAbandoned,

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("'{action}' is not valid while {state}")]
    InvalidTransition {
        state:  &'static str,
        action: &'static str,
    },

    #[error("Remote call '{operation}' failed: {source}")]
    RemoteCall {
        operation: &'static str,
        #[source]
        source:    ApiError,
    },

    #[error("Remote call already in flight, '{operation}' rejected")]
    Busy { operation: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Plain text for the user. Technical detail stays in the log.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::HandshakeFailed { attempts, .. } => format!(
                "Freighter Connection Failed\n\n\
                 Unable to retrieve public key after {attempts} attempts.\n\n\
                 Please try:\n\
                 1. Close and reopen the Freighter popup\n\
                 2. Make sure you have selected an account in Freighter\n\
                 3. Refresh the page and try again"
            ),
            ClientError::HandshakeInProgress => {
                "Already connecting to your wallet, please wait".into()
            }
            ClientError::HandshakeAbandoned => "Wallet connection cancelled".into(),
            ClientError::Validation { message } => message.clone(),
            ClientError::InvalidTransition { .. } => {
                "That action is not available right now".into()
            }
            ClientError::RemoteCall { operation, .. } => match *operation {
                "calculate" => "Failed to calculate reputation".into(),
                _ => "Failed to load reputation".into(),
            },
            ClientError::Busy { .. } => {
                "Please wait for the current request to finish".into()
            }
            ClientError::Serialization(_) | ClientError::Other(_) => {
                "Something went wrong. Check the logs for details.".into()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
