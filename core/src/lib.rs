//! Client core for the Stellar reputation dashboard.
//!
//! Wallet handshake, analysis-scope wizard and score session control.
//! Rendering lives elsewhere; this crate only exposes state and messages.

pub mod api;
pub mod chain;
pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod handshake;
pub mod probe;
pub mod score;
pub mod snapshot;
pub mod types;
pub mod wallet;
pub mod wizard;
