//! The tagged wire-frame union exchanged over the persistent stream.
//!
//! Every frame is one UTF-8 text websocket message. The first one or two
//! space-separated tokens identify the frame; everything after is an opaque
//! payload that the frame's owner (a subscription, or the mux's control
//! handler) decodes against its own expected schema. See `tr-client`'s `codec`
//! module for the actual line-splitting and JSON (de)serialization.

use serde_json::Value;

/// The reply state carried by an inbound `<sub_id> <kind> <payload>` frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    /// Full initial snapshot/payload for a subscription. Canonical only on first arrival.
    Add,
    /// Interim progress notification; carries no payload meaningful to the core.
    Continue,
    /// Incremental update. Timeline pagination discards these.
    Delta,
    /// Terminal error for this subscription.
    Error,
}

impl ReplyKind {
    /// Parses the single-character reply tag used on the wire.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "A" => Some(Self::Add),
            "C" => Some(Self::Continue),
            "D" => Some(Self::Delta),
            "E" => Some(Self::Error),
            _ => None,
        }
    }

    /// Renders the single-character reply tag used on the wire.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Add => "A",
            Self::Continue => "C",
            Self::Delta => "D",
            Self::Error => "E",
        }
    }
}

/// A decoded frame, inbound or outbound.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// `connect <protocol_version> <handshake_json>` — first frame on a connection.
    Connect {
        /// The protocol version the client speaks.
        protocol_version: String,
        /// The handshake payload (locale, platform, client identifiers).
        handshake: Value,
    },
    /// `sub <sub_id> <payload_json>` — opens a subscription.
    Sub {
        /// The subscription id allocated by the mux.
        sub_id: u32,
        /// The subscription payload, including `type` and `token`.
        payload: Value,
    },
    /// `unsub <sub_id>[ <payload_json>]` — closes a subscription.
    Unsub {
        /// The subscription id being closed.
        sub_id: u32,
        /// An optional trailing JSON blob. The mux always sends `None` (the bare form);
        /// the long form is retained here for forward compatibility.
        payload: Option<Value>,
    },
    /// `<sub_id> <kind> <payload?>` — a reply frame targeting one subscription.
    Reply {
        /// The subscription id this reply targets.
        sub_id: u32,
        /// Which of `{A, C, D, E}` this reply carries.
        kind: ReplyKind,
        /// The reply payload. Absent for `C`; present (JSON or bare text) for `A`/`D`/`E`.
        payload: Option<Value>,
    },
    /// `connected[ <json>]` — handshake acknowledgement, out-of-band (no `sub_id`).
    Connected(Option<Value>),
    /// `echo …` — keepalive, silently dropped by the mux.
    Echo(String),
}
