//! Encodes outbound frames and decodes inbound lines against the wire grammar in
//! `tr_types::frame`.
//!
//! The wire is line-delimited UTF-8 text; each websocket message is exactly one frame.
//! Decoding splits on the first one or two ASCII spaces and leaves the remainder
//! unparsed until the frame's owner decodes it against its own expected schema.

use serde_json::Value;
use tr_types::frame::{Frame, ReplyKind};

use crate::error::DecodeError;

/// Renders an outbound [`Frame`] as the exact line to send on the wire.
///
/// Panics only on [`Frame::Connected`] and [`Frame::Echo`], which are inbound-only
/// variants never constructed by this crate's own writer.
pub fn encode(frame: &Frame) -> String {
    match frame {
        Frame::Connect {
            protocol_version,
            handshake,
        } => format!("connect {protocol_version} {handshake}"),
        Frame::Sub { sub_id, payload } => format!("sub {sub_id} {payload}"),
        Frame::Unsub { sub_id, payload } => match payload {
            Some(p) => format!("unsub {sub_id} {p}"),
            None => format!("unsub {sub_id}"),
        },
        Frame::Reply {
            sub_id,
            kind,
            payload,
        } => match payload {
            Some(p) => format!("{sub_id} {} {p}", kind.as_tag()),
            None => format!("{sub_id} {}", kind.as_tag()),
        },
        Frame::Connected(_) | Frame::Echo(_) => {
            unreachable!("outbound writer never emits inbound-only frame kinds")
        }
    }
}

/// Decodes one inbound wire line into a [`Frame`].
///
/// A line whose first token is not a recognized keyword and does not parse as a
/// `sub_id` is a [`DecodeError`]; the caller (the mux's reader task) logs and drops it
/// rather than treating it as fatal.
pub fn decode(line: &str) -> Result<Frame, DecodeError> {
    let line = line.trim();
    let (head, rest) = split_first_token(line);

    match head {
        "connected" => {
            let payload = parse_optional_json(rest)?;
            Ok(Frame::Connected(payload))
        }
        "echo" => Ok(Frame::Echo(rest.to_string())),
        _ => {
            if let Ok(sub_id) = head.parse::<u32>() {
                let (tag, payload_str) = split_first_token(rest);
                let kind = ReplyKind::from_tag(tag)
                    .ok_or_else(|| DecodeError(format!("unknown reply tag {tag:?} in {line:?}")))?;
                let payload = parse_optional_json(payload_str)?;
                Ok(Frame::Reply {
                    sub_id,
                    kind,
                    payload,
                })
            } else {
                Err(DecodeError(format!("unrecognized inbound frame: {line:?}")))
            }
        }
    }
}

fn split_first_token(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (s, ""),
    }
}

fn parse_optional_json(s: &str) -> Result<Option<Value>, DecodeError> {
    if s.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(s)
        .map(Some)
        .map_err(|err| DecodeError(format!("invalid JSON payload {s:?}: {err}")))
}
