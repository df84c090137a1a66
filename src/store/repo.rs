use anyhow::Result;

use crate::domain::credential::CredentialRecord;
use crate::domain::reply::ReplyRecord;

/// Read-only view of the accounts to poll.
pub trait CredentialStore: Send + Sync {
    fn list_credentials(&self) -> Result<Vec<CredentialRecord>>;
}

/// Append-only storage for extracted replies.
pub trait ReplyStore: Send + Sync {
    /// Returns the id of the new row.
    fn insert_reply(&self, reply: &ReplyRecord) -> Result<i64>;

    /// Newest first by `received_at`.
    fn replies_for_customer(&self, customer_address: &str) -> Result<Vec<ReplyRecord>>;
}
