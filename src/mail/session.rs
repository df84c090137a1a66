use anyhow::Result;

use crate::domain::credential::CredentialRecord;
use crate::domain::message::RawMessage;

/// Opens authenticated inbox sessions for accounts.
pub trait MailboxConnector: Send + Sync {
    fn open(&self, cred: &CredentialRecord) -> Result<Box<dyn MailboxSession>>;
}

pub trait MailboxSession {
    /// Retrieves every unread message in full. The server marks each one
    /// read as part of the same request, so a second call will not return them.
    fn fetch_unread(&mut self) -> Result<Vec<RawMessage>>;

    /// Releases the server connection. Safe to call more than once.
    fn close(&mut self);
}
