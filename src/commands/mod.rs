pub mod help;
pub mod transaction;

use std::sync::Arc;

use crate::config::Config;
use crate::server::ApiServer;
use crate::services::proxy_service::SignedProxy;
use crate::utils::page::CallerPage;

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    List { page: CallerPage },
    Search { query: String, page: CallerPage },
    Help,
}

impl Command {
    /// Help needs neither configuration nor network access
    pub fn needs_provider(&self) -> bool {
        !matches!(self, Command::Help)
    }
}

/// Parse command line arguments (without the program name)
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(first) = args.first() else {
        return Ok(Command::Serve);
    };

    match first.to_lowercase().as_str() {
        "serve" => Ok(Command::Serve),
        "help" | "--help" | "-h" => Ok(Command::Help),
        "list" => {
            let page = match args.get(1) {
                Some(arg) => parse_page_arg(arg)?,
                None => CallerPage::FIRST,
            };
            Ok(Command::List { page })
        }
        "search" => {
            let mut words: Vec<&str> = args[1..].iter().map(String::as_str).collect();
            let mut page = CallerPage::FIRST;
            if let Some(last) = words.last() {
                if is_page_token(last) {
                    page = parse_page_arg(last)?;
                    words.pop();
                }
            }
            let query = words.join(" ");
            if query.trim().is_empty() {
                return Err("Usage: `search <text> [p<N>]`".to_string());
            }
            Ok(Command::Search { query, page })
        }
        other => Err(format!("Unknown command '{}'. Run `help` for usage.", other)),
    }
}

/// `p<N>` form used for page selection
fn is_page_token(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    lower.len() > 1 && lower.starts_with('p') && lower[1..].chars().all(|c| c.is_ascii_digit())
}

/// Accepts `p2` or `2`
fn parse_page_arg(arg: &str) -> Result<CallerPage, String> {
    let page_arg = arg.to_lowercase();
    let page_str = page_arg.strip_prefix('p').unwrap_or(&page_arg);

    page_str
        .parse::<u32>()
        .ok()
        .and_then(CallerPage::new)
        .ok_or_else(|| "Invalid page number. Use: `list` or `list p2`".to_string())
}

/// Run a parsed command against the provider
pub async fn run(command: Command, config: Arc<Config>, proxy: SignedProxy) -> Result<(), String> {
    match command {
        Command::Serve => ApiServer::new(config, proxy)
            .run()
            .await
            .map_err(|e| format!("Server error: {}", e)),
        Command::List { page } => transaction::execute_list(&proxy, page).await,
        Command::Search { query, page } => {
            transaction::execute_search(&proxy, &query, page).await
        }
        Command::Help => help::execute(),
    }
}
