use serde::Serialize;

const LOG_BODY_LIMIT: usize = 200;

/// JSON error body returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            upstream_status: None,
        }
    }
}

/// Shorten an upstream body for log lines
///
/// JSON bodies with a `message` or `error` field are reduced to that field:
/// `{"error":"invalid signature","code":17}` -> `invalid signature`
pub fn shorten_for_log(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(message) = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|v| v.as_str())
        {
            return truncate(message);
        }
    }
    truncate(trimmed)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= LOG_BODY_LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LOG_BODY_LIMIT).collect();
        format!("{}...", head)
    }
}
