//! The normalized transaction record the core emits, and the category it is tagged with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed set of categories the classifier assigns to a raw timeline item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A card purchase, refund, failed charge, or card verification.
    Card,
    /// A securities order, savings plan execution, interest, or dividend payout.
    Investment,
    /// Money arriving from outside the account (incoming transfer, SEPA credit).
    TransferIn,
    /// Money leaving the account to an external destination.
    TransferOut,
    /// None of the above rules matched.
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Card => "card",
            Self::Investment => "investment",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// The core's output: one normalized record per raw timeline item.
///
/// Invariant: `category` is assigned deterministically from the source `RawItem` by the
/// rules in `tr-client`'s `classify` module — the same item always yields the same
/// category and the same `amount_signed`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTxn {
    /// The source item's id, if it had one.
    pub id: Option<String>,
    /// The source item's timestamp, passed through unparsed.
    pub timestamp: Option<String>,
    /// The assigned category.
    pub category: Category,
    /// The signed amount, verbatim from the source item (`0` if it had none).
    pub amount_signed: Decimal,
    /// The currency code (`"EUR"` if the source item had none).
    pub currency: String,
    /// The source item's status, passed through verbatim (`None` if absent).
    pub status: Option<String>,
    /// The merchant/counterparty name (`title`, or `"Unknown"` if absent).
    pub merchant: String,
    /// The source item's `subtitle`, kept for downstream analytics.
    pub subtitle_raw: Option<String>,
    /// The source item's `eventType`, kept for downstream analytics.
    pub event_type_raw: Option<String>,
}
