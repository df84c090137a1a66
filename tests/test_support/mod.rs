#![allow(dead_code)]

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use reply_poller::domain::credential::{CredentialRecord, TransportSecurity};
use reply_poller::domain::message::RawMessage;
use reply_poller::mail::session::{MailboxConnector, MailboxSession};

pub fn cred(address: &str) -> CredentialRecord {
    CredentialRecord {
        address: address.to_string(),
        secret: "app-password".to_string(),
        server_host: "smtp.gmail.com".to_string(),
        server_port: 465,
        transport_security: TransportSecurity::Ssl,
    }
}

pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn raw(from: &str, body: &str) -> Vec<u8> {
    format!("From: {from}\r\nSubject: Re: offer\r\n\r\n{body}\r\n").into_bytes()
}

#[derive(Default)]
struct Inbox {
    messages: Vec<(u32, Vec<u8>, bool)>,
}

#[derive(Default)]
struct State {
    inboxes: BTreeMap<String, Inbox>,
    failing_open: HashSet<String>,
    failing_fetch: HashSet<String>,
    panicking: HashSet<String>,
    opened: Vec<String>,
    open_sessions: usize,
    closed: usize,
}

/// In-memory server: fetching a message clears its unread flag, like BODY[] on IMAP.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn deliver(&self, account: &str, raw: Vec<u8>) -> u32 {
        let mut st = self.state.lock().unwrap();
        let inbox = st.inboxes.entry(account.to_string()).or_default();
        let uid = inbox.messages.len() as u32 + 1;
        inbox.messages.push((uid, raw, true));
        uid
    }

    pub fn mark_unread(&self, account: &str, uid: u32) {
        let mut st = self.state.lock().unwrap();
        if let Some(m) = st
            .inboxes
            .get_mut(account)
            .and_then(|i| i.messages.iter_mut().find(|m| m.0 == uid))
        {
            m.2 = true;
        }
    }

    pub fn unread_count(&self, account: &str) -> usize {
        let st = self.state.lock().unwrap();
        st.inboxes
            .get(account)
            .map(|i| i.messages.iter().filter(|m| m.2).count())
            .unwrap_or(0)
    }

    pub fn fail_open(&self, account: &str) {
        self.state.lock().unwrap().failing_open.insert(account.to_string());
    }

    pub fn fail_fetch(&self, account: &str) {
        self.state.lock().unwrap().failing_fetch.insert(account.to_string());
    }

    pub fn panic_on_open(&self, account: &str) {
        self.state.lock().unwrap().panicking.insert(account.to_string());
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

impl MailboxConnector for FakeServer {
    fn open(&self, cred: &CredentialRecord) -> Result<Box<dyn MailboxSession>> {
        let panicking = {
            let mut st = self.state.lock().unwrap();
            st.opened.push(cred.address.clone());
            if st.failing_open.contains(&cred.address) {
                return Err(anyhow!("LOGIN rejected for {}", cred.address));
            }
            st.panicking.contains(&cred.address)
        };
        if panicking {
            panic!("connector blew up for {}", cred.address);
        }
        self.state.lock().unwrap().open_sessions += 1;
        Ok(Box::new(FakeSession {
            server: self.clone(),
            account: cred.address.clone(),
            open: true,
        }))
    }
}

struct FakeSession {
    server: FakeServer,
    account: String,
    open: bool,
}

impl MailboxSession for FakeSession {
    fn fetch_unread(&mut self) -> Result<Vec<RawMessage>> {
        let mut st = self.server.state.lock().unwrap();
        if st.failing_fetch.contains(&self.account) {
            return Err(anyhow!("connection reset"));
        }
        let Some(inbox) = st.inboxes.get_mut(&self.account) else {
            return Ok(vec![]);
        };
        let mut out = Vec::new();
        for (uid, body, unread) in inbox.messages.iter_mut() {
            if *unread {
                *unread = false;
                // split in two to exercise fragment joining
                let (a, b) = body.split_at(body.len() / 2);
                out.push(RawMessage {
                    uid: *uid,
                    fragments: vec![a.to_vec(), b.to_vec()],
                });
            }
        }
        Ok(out)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut st = self.server.state.lock().unwrap();
            st.open_sessions -= 1;
            st.closed += 1;
        }
    }
}
