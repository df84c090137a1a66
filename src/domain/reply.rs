use chrono::{DateTime, Utc};
use serde::Serialize;

/// A customer's reply text, stored once per processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRecord {
    /// The polled account the reply arrived at.
    pub source_address: String,
    pub customer_address: String,
    pub body: String,
    /// When the poller processed the message, not the Date header.
    pub received_at: DateTime<Utc>,
}
