//! The raw, server-shaped timeline item and the page envelope it arrives in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A signed amount as the server represents it: a decimal value plus an ISO currency
/// code. Both fields are optional on the wire — any subset may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    /// The signed decimal value. Outflows are negative, inflows positive.
    #[serde(default)]
    pub value: Option<Decimal>,
    /// The ISO 4217 currency code, e.g. `"EUR"`.
    #[serde(default)]
    pub currency: Option<String>,
}

/// One raw item from a `timelineTransactions` page, exactly as received. Every field is
/// optional: the classifier must tolerate any subset being present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    /// The item's server-assigned id.
    #[serde(default)]
    pub id: Option<String>,
    /// An opaque timestamp string, passed through unparsed.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// The server's event-type code, e.g. `"card_successful_transaction"`.
    #[serde(default)]
    pub event_type: Option<String>,
    /// An icon reference; card transactions carry a `"merchant-"`-prefixed icon.
    #[serde(default)]
    pub icon: Option<String>,
    /// A short secondary line, e.g. `"Buy Order"`.
    #[serde(default)]
    pub subtitle: Option<String>,
    /// The primary line; doubles as the merchant name for card transactions.
    #[serde(default)]
    pub title: Option<String>,
    /// Present for cash-account-settled events (investment side of the ledger).
    #[serde(default)]
    pub cash_account_number: Option<String>,
    /// The signed amount, if the event carries one.
    #[serde(default)]
    pub amount: Option<Amount>,
    /// The server's status string, passed through verbatim.
    #[serde(default)]
    pub status: Option<String>,
}

/// The cursor envelope of a timeline page. Absence of `after` signals end-of-history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursors {
    /// Opaque cursor to pass as `after` on the next page request.
    #[serde(default)]
    pub after: Option<String>,
}

/// The decoded payload of a `timelineTransactions` subscription's first (and only,
/// from the pager's point of view) `A` reply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePage {
    /// The items on this page, in server-provided order.
    #[serde(default)]
    pub items: Vec<RawItem>,
    /// The cursor envelope; `None` and `Some(Cursors{after: None})` are equivalent.
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

impl TimelinePage {
    /// The `after` cursor for the next page, or `None` at end-of-history.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursors.as_ref()?.after.as_deref()
    }
}
