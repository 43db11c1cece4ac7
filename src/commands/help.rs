pub fn help_text() -> String {
    [
        "wallet-history-proxy - signed proxy for wallet transaction history",
        "",
        "Usage:",
        "  wallet-history-proxy [serve]                 Run the HTTP proxy (default)",
        "  wallet-history-proxy list [p<N>|<N>]         Print one page of your history",
        "  wallet-history-proxy search <text> [p<N>]    Search your history",
        "  wallet-history-proxy help                    Show this help message",
        "",
        "Examples:",
        "  wallet-history-proxy list p2",
        "  wallet-history-proxy search coffee p1",
        "",
        "Environment:",
        "  PROVIDER_API_KEY, PROVIDER_API_SECRET, PROVIDER_BASE_URL   required",
        "  PROVIDER_PATH_PREFIX, PROVIDER_HEADER_PREFIX, PROVIDER_TIMEOUT_SECS",
        "  PROXY_HOST, PROXY_PORT, PROXY_SEARCH_ECHO_PAGE",
        "  RUST_LOG                                                   log filter",
    ]
    .join("\n")
}

pub fn execute() -> Result<(), String> {
    println!("{}", help_text());
    Ok(())
}
