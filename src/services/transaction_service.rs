//! Transaction history normalizer
//!
//! Turns the provider's loosely typed transaction lists into `TransactionPage`.
//! Malformed fields fall back to defaults instead of failing the page.

use chrono::{SecondsFormat, TimeZone, Utc};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use super::proxy_service::{ProxyError, SignedProxy};
use crate::models::transaction::{
    Party, SearchParams, Transaction, TransactionPage, TransactionType, CURRENT_USER_WALLET,
    DEFAULT_CURRENCY, UNKNOWN_PARTY,
};
use crate::utils::page::{total_pages, CallerPage};

/// Epoch values below this are seconds, at or above it milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Fetch one page of the current user's history
pub async fn fetch_user_transactions(
    proxy: &SignedProxy,
    page: CallerPage,
) -> Result<TransactionPage, ProxyError> {
    let raw = proxy.forward_list(page.to_upstream()).await?;
    Ok(transform_response(&raw, page))
}

/// Search the user's history with the given filters
pub async fn search_transactions(
    proxy: &SignedProxy,
    params: &SearchParams,
) -> Result<TransactionPage, ProxyError> {
    let raw = proxy.forward_search(&params.to_criteria()).await?;
    Ok(transform_response(&raw, params.page))
}

/// Search when any filter is set, plain listing otherwise
pub async fn load_transactions(
    proxy: &SignedProxy,
    params: &SearchParams,
) -> Result<TransactionPage, ProxyError> {
    if params.has_filters() {
        search_transactions(proxy, params).await
    } else {
        fetch_user_transactions(proxy, params.page).await
    }
}

/// Build a page from a raw provider body
///
/// `currentPage` is always the page the caller asked for.
pub fn transform_response(raw: &Value, page: CallerPage) -> TransactionPage {
    let transactions: Vec<Transaction> = raw
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_item).collect())
        .unwrap_or_default();

    let total_count = raw
        .get("total")
        .and_then(non_negative_count)
        .unwrap_or(transactions.len() as u64);

    if let Some(echoed) = raw.get("page").and_then(Value::as_u64) {
        if echoed != page.get() as u64 {
            warn!(requested = page.get(), echoed, "Response page does not match requested page");
        }
    }

    let total_pages = total_pages(total_count, transactions.len());
    debug!(
        items = transactions.len(),
        total_count,
        current_page = page.get(),
        total_pages,
        "Normalized transaction page"
    );

    TransactionPage {
        transactions,
        total_count,
        current_page: page,
        total_pages,
    }
}

/// Normalize one provider item
pub fn normalize_item(item: &Value) -> Transaction {
    let sender = first_truthy(item, &["sender", "sender_account"]).and_then(Party::from_value);
    let receiver =
        first_truthy(item, &["receiver", "receiver_account"]).and_then(Party::from_value);
    let kind = determine_transaction_type(sender.as_ref(), receiver.as_ref());

    Transaction {
        id: first_truthy(item, &["id", "transaction_id"])
            .map(text_of)
            .unwrap_or_else(synthesize_id),
        sender: display_or_unknown(sender.as_ref()),
        receiver: display_or_unknown(receiver.as_ref()),
        amount: parse_amount(item.get("amount")),
        currency: first_truthy(item, &["currency"])
            .map(text_of)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        cause: first_truthy(item, &["cause", "description", "reason"])
            .map(text_of)
            .unwrap_or_default(),
        created_at: first_truthy(item, &["created_at", "timestamp", "date"])
            .and_then(timestamp_of)
            .unwrap_or_else(now_iso8601),
        kind,
    }
}

/// Direction of a transaction from the current user's point of view
///
/// Same identity on both sides is a top-up and counts as incoming, as does
/// anything received by the current user's wallet.
pub fn determine_transaction_type(
    sender: Option<&Party>,
    receiver: Option<&Party>,
) -> TransactionType {
    let sender_id = sender.and_then(Party::identity);
    let receiver_id = receiver.and_then(Party::identity);

    match (sender_id, receiver_id) {
        (Some(s), Some(r)) if s == r => TransactionType::Incoming,
        (_, Some(CURRENT_USER_WALLET)) => TransactionType::Incoming,
        _ => TransactionType::Outgoing,
    }
}

/// First field whose value is neither null, false, 0 nor an empty string
fn first_truthy<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| item.get(*k)).find(|v| is_truthy(v))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_or_unknown(party: Option<&Party>) -> String {
    party
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| UNKNOWN_PARTY.to_string())
}

fn non_negative_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

/// Numbers pass through; strings are parsed up to the first invalid
/// character. Anything else, or a non-finite result, is 0.
fn parse_amount(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_float_prefix(s),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// `"12.50 ETB"` -> 12.5, `"abc"` -> 0
fn parse_float_prefix(raw: &str) -> f64 {
    let text = raw.trim_start();
    let candidate: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();

    // Longest prefix that still parses
    let mut end = candidate.len();
    while end > 0 {
        if let Ok(value) = candidate[..end].parse::<f64>() {
            return value;
        }
        end -= 1;
    }
    0.0
}

/// Strings pass through; numbers are Unix epoch seconds or milliseconds
fn timestamp_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            let millis = if raw.abs() < EPOCH_MILLIS_THRESHOLD {
                raw * 1000.0
            } else {
                raw
            };
            Utc.timestamp_millis_opt(millis as i64)
                .single()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        _ => None,
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `txn_<millis>_<random>`; not guaranteed unique
fn synthesize_id() -> String {
    let random: u64 = rand::thread_rng().gen();
    format!("txn_{}_{}", Utc::now().timestamp_millis(), random)
}
