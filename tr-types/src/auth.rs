//! Types for the two-step phone+PIN login challenge and the resulting session.

use serde::{Deserialize, Serialize};

/// Phone number and PIN supplied by the caller to start a login. Input only: this type
/// is never persisted and should not be logged.
#[derive(Clone)]
pub struct Credentials {
    /// The account's phone number, in the format the brokerage's login endpoint expects.
    pub phone_number: String,
    /// The account PIN.
    pub pin: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("phone_number", &self.phone_number)
            .field("pin", &"<redacted>")
            .finish()
    }
}

/// A login process opened by step 1 (`begin_login`), consumed at most once by step 2
/// (`complete_login`) together with the OTP the user received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginProcess {
    /// Opaque process identifier returned by the login endpoint.
    pub process_id: String,
}

impl LoginProcess {
    /// Wraps a server-issued process id.
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
        }
    }
}

/// The `{session, refresh}` cookie pair that authenticates the stream and, via
/// `refresh`, silently renews `session` once it expires.
///
/// Invariant: if `session` is empty no stream may be opened; if only `refresh` is
/// non-empty a refresh must precede any stream operation.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    /// The `tr_session` cookie value.
    pub session: String,
    /// The `tr_refresh` cookie value.
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("session", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

impl TokenPair {
    /// Returns `true` if `session` is non-empty and a stream may be opened directly.
    pub fn has_session(&self) -> bool {
        !self.session.is_empty()
    }

    /// Returns `true` if `refresh` is non-empty and a refresh may be attempted.
    pub fn has_refresh(&self) -> bool {
        !self.refresh.is_empty()
    }
}
