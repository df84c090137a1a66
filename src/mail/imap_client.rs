use anyhow::{Context, Result, anyhow};
use log::debug;
use native_tls::{TlsConnector, TlsStream};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::domain::credential::CredentialRecord;
use crate::domain::message::RawMessage;
use crate::mail::session::{MailboxConnector, MailboxSession};

type ImapSession = imap::Session<TlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ImapSettings {
    pub server: String,
    pub port: u16,
    pub mailbox: String,
    /// Covers connect, TLS handshake, greeting and LOGIN.
    pub auth_timeout: Duration,
    /// Read/write timeout for everything after LOGIN.
    pub socket_timeout: Duration,
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            server: "imap.gmail.com".to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
            auth_timeout: Duration::from_secs(10),
            socket_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ImapConnector {
    settings: ImapSettings,
}

impl ImapConnector {
    pub fn new(settings: ImapSettings) -> Self {
        Self { settings }
    }

    fn connect_and_auth(&self, cred: &CredentialRecord) -> Result<ImapSession> {
        let s = &self.settings;
        let addr = (s.server.as_str(), s.port)
            .to_socket_addrs()
            .with_context(|| format!("resolving {}:{}", s.server, s.port))?
            .next()
            .ok_or_else(|| anyhow!("{}:{} resolved to no address", s.server, s.port))?;

        debug!("{}: connecting to {}:{}", cred.address, s.server, s.port);
        let tcp = TcpStream::connect_timeout(&addr, s.auth_timeout)
            .with_context(|| format!("connecting to {}:{}", s.server, s.port))?;
        tcp.set_read_timeout(Some(s.auth_timeout))?;
        tcp.set_write_timeout(Some(s.auth_timeout))?;
        // Same socket; used to relax the timeouts once logged in.
        let socket = tcp.try_clone()?;

        let tls = TlsConnector::builder().build()?;
        let tls_stream = tls
            .connect(s.server.as_str(), tcp)
            .map_err(|e| anyhow!("TLS handshake with {} failed: {e}", s.server))?;

        let mut client = imap::Client::new(tls_stream);
        client.read_greeting().context("reading IMAP greeting")?;

        debug!("{}: logging in", cred.address);
        let session = client
            .login(&cred.address, &cred.secret)
            .map_err(|(e, _)| anyhow!("IMAP LOGIN failed for {}: {e}", cred.address))?;

        socket.set_read_timeout(Some(s.socket_timeout))?;
        socket.set_write_timeout(Some(s.socket_timeout))?;
        Ok(session)
    }
}

impl MailboxConnector for ImapConnector {
    fn open(&self, cred: &CredentialRecord) -> Result<Box<dyn MailboxSession>> {
        let session = self.connect_and_auth(cred)?;
        Ok(Box::new(ImapMailbox {
            session: Some(session),
            mailbox: self.settings.mailbox.clone(),
            account: cred.address.clone(),
        }))
    }
}

pub struct ImapMailbox {
    session: Option<ImapSession>,
    mailbox: String,
    account: String,
}

impl MailboxSession for ImapMailbox {
    fn fetch_unread(&mut self) -> Result<Vec<RawMessage>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("session for {} already closed", self.account))?;

        session
            .select(&self.mailbox)
            .with_context(|| format!("SELECT {}", self.mailbox))?;

        let mut uids: Vec<u32> = session
            .uid_search("UNSEEN")
            .context("UID SEARCH UNSEEN")?
            .into_iter()
            .collect();
        if uids.is_empty() {
            debug!("{}: no unread messages", self.account);
            return Ok(vec![]);
        }
        uids.sort_unstable();

        let uid_set = uids
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");

        // BODY[] rather than BODY.PEEK[]: the server sets \Seen on these in the same command.
        debug!("{}: fetching UIDs {}", self.account, uid_set);
        let fetches = session
            .uid_fetch(&uid_set, "(UID BODY[])")
            .context("UID FETCH BODY[]")?;

        let mut out: Vec<RawMessage> = fetches
            .iter()
            .filter_map(|f| {
                let uid = f.uid?;
                let body = f.body()?;
                Some(RawMessage::new(uid, body.to_vec()))
            })
            .collect();
        out.sort_by_key(|m| m.uid);

        if out.len() != uids.len() {
            debug!(
                "{}: {} unread but {} bodies returned",
                self.account,
                uids.len(),
                out.len()
            );
        }
        Ok(out)
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.logout()
        {
            debug!("{}: logout failed: {e}", self.account);
        }
    }
}

impl Drop for ImapMailbox {
    fn drop(&mut self) {
        self.close();
    }
}
