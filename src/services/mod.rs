pub mod proxy_service;
pub mod transaction_service;
