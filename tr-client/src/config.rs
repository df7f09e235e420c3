//! Connection parameters supplied by the caller: handshake identity and service endpoints.
//!
//! Reading these from the environment or a CLI is explicitly the caller's job, not this
//! crate's; see the orchestrator's module docs.

use serde_json::{json, Value};

/// The handshake payload sent as the `connect` frame's JSON body, plus the protocol
/// version string it is paired with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// The `connect` frame's version token, e.g. `"31"`.
    pub protocol_version: String,
    /// BCP-47 locale, e.g. `"de"`.
    pub locale: String,
    /// Platform identifier, e.g. `"android"`.
    pub platform_id: String,
    /// Platform version string.
    pub platform_version: String,
    /// Client identifier string.
    pub client_id: String,
    /// Client version string.
    pub client_version: String,
}

impl HandshakeConfig {
    /// Renders the handshake as the JSON object the `connect` frame carries.
    pub fn to_json(&self) -> Value {
        json!({
            "locale": self.locale,
            "platformId": self.platform_id,
            "platformVersion": self.platform_version,
            "clientId": self.client_id,
            "clientVersion": self.client_version,
        })
    }
}

impl Default for HandshakeConfig {
    /// Values observed in the original client; protocol version defaults to `31`, the
    /// value used by the more complete of the two conflicting reference clients.
    fn default() -> Self {
        Self {
            protocol_version: "31".to_string(),
            locale: "de".to_string(),
            platform_id: "android".to_string(),
            platform_version: "30".to_string(),
            client_id: "de.traderepublic.app".to_string(),
            client_version: "1.0.0".to_string(),
        }
    }
}

/// The HTTPS and WSS origins the core talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// HTTPS origin for `/auth/web/*` endpoints, no trailing slash.
    pub http_base: String,
    /// WSS URL the stream connects to.
    pub ws_url: String,
    /// The web app's origin, sent as the stream connection's `Origin` header. The
    /// server rejects the websocket upgrade without it.
    pub origin: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            http_base: "https://api.traderepublic.com".to_string(),
            ws_url: "wss://api.traderepublic.com".to_string(),
            origin: "https://app.traderepublic.com".to_string(),
        }
    }
}
