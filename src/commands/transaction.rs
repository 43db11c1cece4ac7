use chrono::DateTime;

use crate::models::transaction::{SearchParams, TransactionPage, TransactionType};
use crate::services::proxy_service::{ProxyError, SignedProxy};
use crate::services::transaction_service;
use crate::utils::page::{visible_pages, CallerPage};
use crate::utils::Table;

/// `list [p<N>]`
pub async fn execute_list(proxy: &SignedProxy, page: CallerPage) -> Result<(), String> {
    let result = transaction_service::load_transactions(proxy, &SearchParams::page(page))
        .await
        .map_err(describe_failure)?;
    println!("{}", render_page(&result));
    Ok(())
}

/// `search <text> [p<N>]`
pub async fn execute_search(
    proxy: &SignedProxy,
    query: &str,
    page: CallerPage,
) -> Result<(), String> {
    let params = SearchParams {
        page,
        search: Some(query.to_string()),
        ..Default::default()
    };
    let result = transaction_service::load_transactions(proxy, &params)
        .await
        .map_err(describe_failure)?;
    println!("{}", render_page(&result));
    Ok(())
}

fn describe_failure(err: ProxyError) -> String {
    let body = err.to_error_body();
    format!("{}: {}", body.error, body.details)
}

/// Render a page as a text table with a pagination footer
pub fn render_page(page: &TransactionPage) -> String {
    let mut output = String::from("Transaction History\n\n");

    let mut table = Table::new(vec![
        "Type", "ID", "Sender", "Receiver", "Amount", "Cause", "Date",
    ]);
    for tx in &page.transactions {
        let kind = match (tx.kind, tx.is_top_up()) {
            (_, true) => "top-up",
            (TransactionType::Incoming, false) => "incoming",
            (TransactionType::Outgoing, false) => "outgoing",
        };
        table.add_row(vec![
            kind.to_string(),
            tx.id.clone(),
            tx.sender.clone(),
            tx.receiver.clone(),
            format_amount(tx.amount, &tx.currency, tx.kind),
            tx.cause.clone(),
            format_date(&tx.created_at),
        ]);
    }
    if table.is_empty() {
        output.push_str("No transactions found\n");
        return output;
    }
    output.push_str(&table.render());

    let pages: Vec<String> = visible_pages(page.current_page.get(), page.total_pages)
        .iter()
        .map(|marker| marker.to_string())
        .collect();
    output.push_str(&format!(
        "\nPage {} of {} ({} total)  [{}]\n",
        page.current_page,
        page.total_pages,
        page.total_count,
        pages.join(" ")
    ));
    output
}

/// `+1,234.50 ETB` for incoming, `-1,234.50 ETB` for outgoing
pub fn format_amount(amount: f64, currency: &str, kind: TransactionType) -> String {
    let sign = match kind {
        TransactionType::Incoming => '+',
        TransactionType::Outgoing => '-',
    };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{} {}", sign, grouped, fraction, currency)
}

/// `Mar 05, 2024 14:30`; unparsable values are shown as-is
pub fn format_date(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.format("%b %d, %Y %H:%M").to_string(),
        Err(_) => value.to_string(),
    }
}
