use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::domain::credential::CredentialRecord;
use crate::domain::message::RawMessage;
use crate::domain::reply::ReplyRecord;
use crate::mail::decoders::parse_message;
use crate::mail::extract::{customer_address, reply_body};
use crate::mail::session::MailboxConnector;
use crate::store::repo::ReplyStore;

pub type Clock = dyn Fn() -> DateTime<Utc> + Send + Sync;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountReport {
    pub fetched: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Turn one retrieved message into the reply record to persist.
pub fn build_reply(
    source_address: &str,
    msg: &RawMessage,
    received_at: DateTime<Utc>,
) -> Result<ReplyRecord> {
    let parsed = parse_message(&msg.concat())?;
    Ok(ReplyRecord {
        source_address: source_address.to_string(),
        customer_address: customer_address(&parsed.sender),
        body: reply_body(&parsed.body),
        received_at,
    })
}

/// Fetch one account's unread mail and store a reply per message.
///
/// Session errors are returned; per-message errors are logged and counted.
/// Messages are already marked read on the server when they arrive here, so a
/// message that fails to parse or store is not retried on the next tick.
pub fn ingest_account(
    cred: &CredentialRecord,
    replies: &dyn ReplyStore,
    connector: &dyn MailboxConnector,
    clock: &Clock,
) -> Result<AccountReport> {
    let mut session = connector
        .open(cred)
        .with_context(|| format!("opening mailbox for {}", cred.address))?;

    let fetched = session.fetch_unread();
    session.close();
    let messages = fetched.with_context(|| format!("fetching unread for {}", cred.address))?;

    let mut report = AccountReport {
        fetched: messages.len(),
        ..AccountReport::default()
    };

    for msg in &messages {
        let stored = build_reply(&cred.address, msg, clock())
            .with_context(|| format!("parsing UID {}", msg.uid))
            .and_then(|reply| {
                replies
                    .insert_reply(&reply)
                    .with_context(|| format!("storing reply from UID {}", msg.uid))
                    .map(|id| (id, reply))
            });

        match stored {
            Ok((id, reply)) => {
                debug!(
                    "{}: UID {} -> reply #{id} from {}",
                    cred.address, msg.uid, reply.customer_address
                );
                report.stored += 1;
            }
            Err(e) => {
                error!("{}: {e:#}", cred.address);
                report.failed += 1;
            }
        }
    }

    if report.fetched > 0 {
        info!(
            "{}: {} unread, {} stored, {} failed",
            cred.address, report.fetched, report.stored, report.failed
        );
    }
    Ok(report)
}
