#![deny(missing_docs)]
//! Core of a streaming brokerage-timeline ingester: two-step login, a multiplexed
//! websocket stream, cursor-driven timeline pagination, and event classification.
//!
//! Most callers only need [`orchestrator::Orchestrator::run`]. The individual pieces
//! ([`auth::AuthClient`], [`mux::StreamMux`], [`pager::TimelinePager`],
//! [`classify::classify`]) are public for callers that need finer-grained control, or
//! that want to drive the stream without a full login cycle (e.g. reusing a token
//! obtained elsewhere).

pub mod auth;
pub mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod mux;
pub mod orchestrator;
pub mod pager;
pub mod token_store;

pub use auth::AuthClient;
pub use classify::{classify, normalize};
pub use config::{Endpoints, HandshakeConfig};
pub use error::OrchestratorError;
pub use mux::{StreamMux, Subscription};
pub use orchestrator::{Orchestrator, OtpPrompt};
pub use pager::TimelinePager;
pub use token_store::TokenStore;
