//! Drives a cursor-chained sequence of `timelineTransactions` subscriptions over an
//! open [`StreamMux`], accumulating items until the history is exhausted, a hard limit
//! is reached, or a page fails.

use std::time::Duration;

use serde_json::json;
use tr_types::{RawItem, TimelinePage};

use crate::mux::StreamMux;

const PAGE_DEADLINE: Duration = Duration::from_secs(15);
const MAX_PAGES: u32 = 500;

/// Paginates `timelineTransactions` over `mux` using `token` as the subscription's auth
/// token. `limit` of `0` means unlimited; otherwise pagination stops once at least
/// `limit` items have been accumulated and the result is truncated to exactly `limit`.
pub struct TimelinePager<'a> {
    mux: &'a StreamMux,
    token: String,
    limit: usize,
}

impl<'a> TimelinePager<'a> {
    /// Builds a pager bound to `mux` for the lifetime of one `run` call.
    pub fn new(mux: &'a StreamMux, token: impl Into<String>, limit: usize) -> Self {
        Self {
            mux,
            token: token.into(),
            limit,
        }
    }

    /// Drains the timeline. Never fails: a subscription or decode failure on any page
    /// is logged and ends pagination, returning whatever has been accumulated so far —
    /// matching the pager's own no-recovery contract (the orchestrator decides whether
    /// a partial result is acceptable).
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Vec<RawItem> {
        let mut accumulator = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            page_count += 1;
            let mut payload = json!({"type": "timelineTransactions", "token": self.token});
            if let Some(after) = &cursor {
                payload["after"] = json!(after);
            }

            let sub = match self.mux.subscribe(payload).await {
                Ok(sub) => sub,
                Err(err) => {
                    tracing::warn!(%err, page_count, "could not open page subscription, stopping");
                    break;
                }
            };

            let data = match self.mux.await_initial(sub, PAGE_DEADLINE).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(%err, page_count, "page fetch failed, stopping pagination");
                    break;
                }
            };

            let page: TimelinePage = match serde_json::from_value(data) {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(%err, page_count, "malformed page payload, stopping pagination");
                    break;
                }
            };

            let item_count = page.items.len();
            accumulator.extend(page.items);
            cursor = page.next_cursor().map(str::to_string);
            tracing::debug!(
                page_count,
                item_count,
                total = accumulator.len(),
                has_next = cursor.is_some(),
                "fetched page"
            );

            if cursor.is_none() {
                break;
            }
            if self.limit > 0 && accumulator.len() >= self.limit {
                break;
            }
            if page_count >= MAX_PAGES {
                tracing::warn!(page_count, "hit MAX_PAGES limit, stopping pagination");
                break;
            }
        }

        if self.limit > 0 {
            accumulator.truncate(self.limit);
        }
        accumulator
    }
}
