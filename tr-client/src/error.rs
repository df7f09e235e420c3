//! The error taxonomy for every component boundary.
//!
//! Each enum is a *kind*, not a type hierarchy: component boundaries surface their own
//! error kind, and [`OrchestratorError`] is the only place that translates between them,
//! mirroring how the teacher crate's top-level `distributed_oprf` composes its own
//! `Error` from session, transport and proof failures via `#[from]`.

use thiserror::Error;

/// Failures from the two-step login and refresh HTTP endpoints.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `begin_login` rejected the phone number / PIN pair.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// `complete_login` rejected the OTP.
    #[error("invalid OTP")]
    OtpInvalid,
    /// `complete_login` was called after the OTP challenge window closed.
    #[error("OTP expired")]
    OtpExpired,
    /// `refresh` was called with a refresh token the server no longer honors.
    #[error("refresh token expired")]
    RefreshExpired,
    /// The server throttled this client.
    #[error("rate limited")]
    RateLimited,
    /// A transport-level failure: connect, TLS, DNS, or request timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Failures from the persistent stream connection (mux-level, not per-subscription).
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    /// No `connected` frame arrived within the handshake deadline.
    #[error("handshake timed out")]
    Timeout,
    /// The server rejected the connection's session cookie.
    #[error("authentication rejected by server")]
    AuthRejected,
    /// A websocket-level transport failure (connect, read, or write).
    #[error("transport error: {0}")]
    Transport(String),
    /// The mux was closed, either by the caller or by a prior fatal error.
    #[error("stream closed")]
    Closed,
}

/// A terminal outcome local to one subscription's awaiter.
#[derive(Debug, Error, Clone)]
pub enum TerminalError {
    /// The subscription received an `E` reply; carries the server's payload verbatim.
    #[error("server error: {0}")]
    ServerError(String),
    /// `await_initial`'s deadline elapsed with no `A` or `E` observed.
    #[error("timed out waiting for initial reply")]
    Timeout,
}

/// A malformed inbound frame. Logged and dropped; never propagated to a caller and
/// never fatal to the mux.
#[derive(Debug, Error, Clone)]
#[error("could not decode frame: {0}")]
pub struct DecodeError(pub String);

/// Token-file I/O failures. Non-fatal for an in-memory session; surfaced to logs by the
/// orchestrator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying file I/O failed.
    #[error("token storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The persisted file did not contain a valid token pair.
    #[error("malformed token file: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The atomic rename-into-place step failed.
    #[error("could not persist token file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// The result of `StreamMux::await_initial`: either the subscription's mux shut down
/// entirely, or it reached a subscription-local terminal state.
#[derive(Debug, Error, Clone)]
pub enum AwaitInitialError {
    /// The subscription itself terminated (server `E`, or the deadline elapsed).
    #[error(transparent)]
    Terminal(#[from] TerminalError),
    /// The whole mux tore down while this subscription was pending.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// The orchestrator's own error type: every component error, wrapped with `#[from]` so
/// `?` composes across the whole login → stream → paginate → classify call chain.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A login, OTP or refresh call failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Opening or using the stream failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
    /// A subscription reached a terminal state the pager could not recover from.
    #[error(transparent)]
    AwaitInitial(#[from] AwaitInitialError),
    /// Loading or saving the token file failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// No credentials were supplied and no usable token was on disk.
    #[error("no credentials available and no stored session to restore")]
    NoCredentials,
}
