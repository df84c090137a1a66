pub mod ingest;
pub mod scheduler;

use anyhow::Result;
use chrono::Utc;
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::daemon::ingest::{AccountReport, Clock, ingest_account};
use crate::daemon::scheduler::Scheduler;
use crate::domain::credential::CredentialRecord;
use crate::mail::session::MailboxConnector;
use crate::store::repo::{CredentialStore, ReplyStore};

pub struct DaemonConfig {
    pub interval: Duration,
    pub max_concurrent_sessions: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub accounts: usize,
    pub failed_accounts: usize,
    pub ingested: usize,
    pub failed_messages: usize,
}

impl TickReport {
    fn record(&mut self, outcome: Option<AccountReport>) {
        match outcome {
            Some(r) => {
                self.ingested += r.stored;
                self.failed_messages += r.failed;
            }
            None => self.failed_accounts += 1,
        }
    }
}

/// Everything one tick needs, passed in rather than held globally.
pub struct Pipeline<'a> {
    pub credentials: &'a dyn CredentialStore,
    pub replies: &'a dyn ReplyStore,
    pub connector: &'a dyn MailboxConnector,
    pub clock: &'a Clock,
}

impl Pipeline<'_> {
    /// One scheduler tick: every account gets its own ingest run, whatever
    /// happens to the others.
    pub fn poll_tick(&self, max_concurrent_sessions: usize) -> TickReport {
        let creds = match self.credentials.list_credentials() {
            Ok(c) => c,
            Err(e) => {
                error!("listing credentials failed: {e:#}");
                return TickReport::default();
            }
        };

        let mut report = TickReport {
            accounts: creds.len(),
            ..TickReport::default()
        };

        let workers = max_concurrent_sessions.clamp(1, creds.len().max(1));
        if workers == 1 {
            for cred in &creds {
                report.record(self.run_account(cred));
            }
            return report;
        }

        let queue = Mutex::new(creds.iter());
        let shared = Mutex::new(report);
        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    loop {
                        let next = match queue.lock() {
                            Ok(mut q) => q.next(),
                            Err(_) => None,
                        };
                        let Some(cred) = next else { break };
                        let outcome = self.run_account(cred);
                        if let Ok(mut r) = shared.lock() {
                            r.record(outcome);
                        }
                    }
                });
            }
        });
        shared.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    // None means the account's sequence failed as a whole.
    fn run_account(&self, cred: &CredentialRecord) -> Option<AccountReport> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            ingest_account(cred, self.replies, self.connector, self.clock)
        }));
        match result {
            Ok(Ok(r)) => Some(r),
            Ok(Err(e)) => {
                error!("{}: {e:#}", cred.address);
                None
            }
            Err(_) => {
                error!("{}: ingest panicked", cred.address);
                None
            }
        }
    }
}

pub fn system_clock() -> chrono::DateTime<Utc> {
    Utc::now()
}

pub fn run_daemon(pipeline: &Pipeline<'_>, cfg: DaemonConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    let scheduler = Scheduler::new(cfg.interval);
    info!(
        "polling every {:?} with up to {} concurrent session(s)",
        scheduler.period(),
        cfg.max_concurrent_sessions
    );

    let stats = scheduler.run(&running, || {
        let report = pipeline.poll_tick(cfg.max_concurrent_sessions);
        info!(
            "tick: {} account(s), {} failed, {} reply(ies) stored, {} message(s) dropped",
            report.accounts, report.failed_accounts, report.ingested, report.failed_messages
        );
    });

    info!("stopped after {} tick(s), {} skipped", stats.ticks, stats.skipped);
    Ok(())
}
