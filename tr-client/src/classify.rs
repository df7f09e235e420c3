//! Maps one raw timeline item to a category and a normalized transaction record.
//!
//! The decision procedure is a fixed, ordered rule list: first match wins. It depends
//! only on the fields of [`RawItem`] and is therefore deterministic — the same item
//! always yields the same [`Category`].

use rust_decimal::Decimal;
use tr_types::{Category, NormalizedTxn, RawItem};

const CARD_EVENTS: &[&str] = &[
    "card_successful_transaction",
    "card_failed_transaction",
    "card_refund",
    "card_successful_verification",
];

const TRANSFER_IN_EVENTS: &[&str] = &[
    "PAYMENT_INBOUND",
    "PAYMENT_INBOUND_SEPA_DIRECT_DEBIT",
    "INCOMING_TRANSFER",
    "INCOMING_TRANSFER_DELEGATION",
    "CREDIT",
];

const TRANSFER_OUT_EVENTS: &[&str] = &["PAYMENT_OUTBOUND", "OUTGOING_TRANSFER_DELEGATION"];

const INVESTMENT_EVENTS: &[&str] = &[
    "ORDER_EXECUTED",
    "SAVINGS_PLAN_EXECUTED",
    "SAVINGS_PLAN_INVOICE_CREATED",
    "INTEREST_PAYOUT",
    "INTEREST_PAYOUT_CREATED",
    "DIVIDEND_PAYOUT",
    "trading_savingsplan_executed",
    "ssp_corporate_action_invoice_cash",
    "TRADE_INVOICE",
    "benefits_saveback_execution",
    "benefits_spare_change_execution",
    "timeline_legacy_migrated_events",
];

const INVESTMENT_SUBTITLES: &[&str] = &[
    "buy order",
    "sell order",
    "saving executed",
    "saveback",
    "round up",
    "pea",
    "dividend",
    "interest",
    "deposit",
    "withdrawal",
    "transfer",
    "tax",
    "fee",
];

/// Assigns a [`Category`] to `item` by the rules in order, first match wins.
pub fn classify(item: &RawItem) -> Category {
    let event_type = item.event_type.as_deref();
    if matches_any(event_type, CARD_EVENTS) {
        return Category::Card;
    }
    if matches_any(event_type, TRANSFER_IN_EVENTS) {
        return Category::TransferIn;
    }
    if matches_any(event_type, TRANSFER_OUT_EVENTS) {
        return Category::TransferOut;
    }
    if matches_any(event_type, INVESTMENT_EVENTS) {
        return Category::Investment;
    }
    if item
        .icon
        .as_deref()
        .is_some_and(|icon| icon.contains("merchant-"))
    {
        return Category::Card;
    }

    let title_lower = item.title.as_deref().unwrap_or_default().to_lowercase();
    let subtitle_lower = item.subtitle.as_deref().unwrap_or_default().to_lowercase();
    let combined_contains = |needle: &str| title_lower.contains(needle) || subtitle_lower.contains(needle);

    if combined_contains("transfer") {
        return if amount_value(item).is_some_and(|v| v.is_sign_positive() && !v.is_zero()) {
            Category::TransferIn
        } else {
            Category::TransferOut
        };
    }
    if combined_contains("deposit") {
        return Category::TransferIn;
    }
    if combined_contains("withdrawal") {
        return Category::TransferOut;
    }
    if INVESTMENT_SUBTITLES
        .iter()
        .any(|needle| subtitle_lower.contains(needle))
    {
        return Category::Investment;
    }
    if item
        .cash_account_number
        .as_deref()
        .is_some_and(|n| !n.is_empty())
    {
        return Category::Investment;
    }
    if item.subtitle.is_none()
        && item.cash_account_number.is_none()
        && amount_value(item).is_some_and(|v| v.is_sign_negative())
    {
        return Category::Card;
    }
    Category::Other
}

/// Normalizes `item` into the core's output record, assigning its category via
/// [`classify`].
pub fn normalize(item: RawItem) -> NormalizedTxn {
    let category = classify(&item);
    let amount_signed = amount_value(&item).unwrap_or(Decimal::ZERO);
    let currency = item
        .amount
        .as_ref()
        .and_then(|a| a.currency.clone())
        .unwrap_or_else(|| "EUR".to_string());
    let merchant = item.title.clone().unwrap_or_else(|| "Unknown".to_string());

    NormalizedTxn {
        id: item.id,
        timestamp: item.timestamp,
        category,
        amount_signed,
        currency,
        status: item.status,
        merchant,
        subtitle_raw: item.subtitle,
        event_type_raw: item.event_type,
    }
}

fn amount_value(item: &RawItem) -> Option<Decimal> {
    item.amount.as_ref().and_then(|a| a.value)
}

fn matches_any(value: Option<&str>, set: &[&str]) -> bool {
    value.is_some_and(|v| set.contains(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tr_types::Amount;

    fn amount(value: Decimal, currency: &str) -> Amount {
        Amount {
            value: Some(value),
            currency: Some(currency.to_string()),
        }
    }

    #[test]
    fn card_event_type_wins() {
        let item = RawItem {
            event_type: Some("card_successful_transaction".to_string()),
            title: Some("Starbucks".to_string()),
            amount: Some(amount(dec!(-5.50), "EUR")),
            status: Some("EXECUTED".to_string()),
            ..Default::default()
        };
        let txn = normalize(item);
        assert_eq!(txn.category, Category::Card);
        assert_eq!(txn.amount_signed, dec!(-5.50));
        assert_eq!(txn.merchant, "Starbucks");
    }

    #[test]
    fn icon_and_subtitle_drive_investment_classification() {
        let item = RawItem {
            icon: Some("logos/AAPL/v2".to_string()),
            subtitle: Some("Buy Order".to_string()),
            title: Some("Apple Stock".to_string()),
            amount: Some(amount(dec!(-150.00), "EUR")),
            status: Some("EXECUTED".to_string()),
            ..Default::default()
        };
        let txn = normalize(item);
        assert_eq!(txn.category, Category::Investment);
        assert_eq!(txn.amount_signed, dec!(-150.00));
    }

    #[test]
    fn payment_inbound_event_type_is_transfer_in() {
        let item = RawItem {
            event_type: Some("PAYMENT_INBOUND".to_string()),
            title: Some("Deposit".to_string()),
            amount: Some(amount(dec!(1000.00), "EUR")),
            ..Default::default()
        };
        assert_eq!(classify(&item), Category::TransferIn);
    }

    #[test]
    fn explicit_transfer_keyword_uses_amount_sign() {
        let positive = RawItem {
            subtitle: Some("Bank transfer".to_string()),
            amount: Some(amount(dec!(20.00), "EUR")),
            ..Default::default()
        };
        assert_eq!(classify(&positive), Category::TransferIn);

        let negative = RawItem {
            subtitle: Some("Bank transfer".to_string()),
            amount: Some(amount(dec!(-20.00), "EUR")),
            ..Default::default()
        };
        assert_eq!(classify(&negative), Category::TransferOut);
    }

    #[test]
    fn cash_account_number_alone_is_investment() {
        let item = RawItem {
            cash_account_number: Some("DE00".to_string()),
            ..Default::default()
        };
        assert_eq!(classify(&item), Category::Investment);
    }

    #[test]
    fn no_subtitle_no_cash_account_negative_amount_is_card() {
        let item = RawItem {
            amount: Some(amount(dec!(-3.00), "EUR")),
            ..Default::default()
        };
        assert_eq!(classify(&item), Category::Card);
    }

    #[test]
    fn completely_empty_item_is_other() {
        assert_eq!(classify(&RawItem::default()), Category::Other);
    }

    #[test]
    fn missing_amount_normalizes_to_zero_and_eur() {
        let txn = normalize(RawItem::default());
        assert_eq!(txn.amount_signed, Decimal::ZERO);
        assert_eq!(txn.currency, "EUR");
        assert_eq!(txn.merchant, "Unknown");
    }

    #[test]
    fn classification_is_deterministic_under_repeated_calls() {
        let item = RawItem {
            event_type: Some("DIVIDEND_PAYOUT".to_string()),
            amount: Some(amount(dec!(4.20), "EUR")),
            ..Default::default()
        };
        assert_eq!(classify(&item), classify(&item));
    }
}
