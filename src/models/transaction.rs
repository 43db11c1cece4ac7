//! Transaction models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::page::CallerPage;

/// Shown when the provider gives no sender or receiver
pub const UNKNOWN_PARTY: &str = "Unknown";
/// Default currency when the provider omits one
pub const DEFAULT_CURRENCY: &str = "ETB";
/// Receiver identity the provider uses for the signed-in user's own wallet
pub const CURRENT_USER_WALLET: &str = "current_user_wallet";

/// Direction of a transaction relative to the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Incoming,
    Outgoing,
}

/// Sender or receiver as the provider sent it: either a bare string or an
/// object with `account` and/or `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Party {
    Label(String),
    Account {
        account: Option<String>,
        name: Option<String>,
    },
}

impl Party {
    /// Returns `None` for null, empty strings and unsupported shapes
    pub fn from_value(value: &Value) -> Option<Party> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Party::Label(s.clone())),
            Value::Number(n) => Some(Party::Label(n.to_string())),
            Value::Object(map) => {
                let account = scalar_string(map.get("account"));
                let name = scalar_string(map.get("name"));
                Some(Party::Account { account, name })
            }
            _ => None,
        }
    }

    /// Value compared when deciding direction: account first, then name
    pub fn identity(&self) -> Option<&str> {
        match self {
            Party::Label(label) => Some(label.as_str()),
            Party::Account { account, name } => account.as_deref().or(name.as_deref()),
        }
    }

    /// Value shown to users: name first, then account
    pub fn display_name(&self) -> &str {
        match self {
            Party::Label(label) => label.as_str(),
            Party::Account { account, name } => name
                .as_deref()
                .or(account.as_deref())
                .unwrap_or(UNKNOWN_PARTY),
        }
    }
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub currency: String,
    pub cause: String,
    /// ISO-8601 timestamp
    pub created_at: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

impl Transaction {
    /// Sender and receiver are the same wallet
    pub fn is_top_up(&self) -> bool {
        self.sender != UNKNOWN_PARTY && self.sender == self.receiver
    }
}

/// One page of normalized transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_count: u64,
    pub current_page: CallerPage,
    pub total_pages: u32,
}

/// What a caller asks for: a page plus optional filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub page: CallerPage,
    pub search: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub cause: Option<String>,
    pub transaction_id: Option<String>,
}

impl SearchParams {
    pub fn page(page: CallerPage) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Any non-blank filter routes the request to search instead of list
    pub fn has_filters(&self) -> bool {
        [
            &self.search,
            &self.sender,
            &self.receiver,
            &self.cause,
            &self.transaction_id,
        ]
        .iter()
        .any(|f| non_blank(f).is_some())
    }

    /// Body for the provider's search endpoint. `page` stays 1-based.
    pub fn to_criteria(&self) -> Value {
        let mut body = Map::new();
        body.insert("page".to_string(), Value::from(self.page.get()));
        let filters = [
            ("query", &self.search),
            ("sender", &self.sender),
            ("receiver", &self.receiver),
            ("cause", &self.cause),
            ("transaction_id", &self.transaction_id),
        ];
        for (key, value) in filters {
            if let Some(v) = non_blank(value) {
                body.insert(key.to_string(), Value::String(v.to_string()));
            }
        }
        Value::Object(body)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
