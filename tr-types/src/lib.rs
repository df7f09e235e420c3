#![deny(missing_docs)]
//! Wire and domain types shared between the authentication, stream-multiplexing and
//! timeline-classification pieces of the ingester core.
//!
//! This crate holds only data: it has no I/O, no async runtime dependency, and no
//! opinion about how a value came to exist. It provides:
//!
//! * [`auth`] — credentials, the two-step login process handle, and the persisted
//!   `{session, refresh}` token pair.
//! * [`frame`] — the tagged wire-frame union exchanged over the persistent stream.
//! * [`timeline`] — the raw, server-shaped timeline item and its page envelope.
//! * [`txn`] — the normalized transaction record the core emits to its caller.

pub mod auth;
pub mod frame;
pub mod timeline;
pub mod txn;

pub use auth::{Credentials, LoginProcess, TokenPair};
pub use frame::{Frame, ReplyKind};
pub use timeline::{Amount, Cursors, RawItem, TimelinePage};
pub use txn::{Category, NormalizedTxn};
