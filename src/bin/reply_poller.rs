use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::time::Duration;

use reply_poller::auth::secret_store::{self, KeyringCredentials};
use reply_poller::config::{Config, load_config, resolve_db_path};
use reply_poller::daemon::{DaemonConfig, Pipeline, run_daemon, system_clock};
use reply_poller::mail::imap_client::ImapConnector;
use reply_poller::mail::outbound::{OutboundMessage, send_message};
use reply_poller::store::repo::{CredentialStore, ReplyStore};
use reply_poller::store::sqlite::SqliteRepo;

#[derive(Parser)]
#[command(name = "reply_poller")]
#[command(about = "Collects customer replies from campaign mailboxes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every account on a fixed interval until Ctrl-C
    Daemon {
        /// Seconds between ticks (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Run a single poll over every account and exit
    Poll,

    /// Show stored replies from one customer, newest first
    Replies {
        #[arg(long)]
        customer: String,

        #[arg(long)]
        json: bool,
    },

    /// List the accounts that will be polled
    Accounts,

    /// Send one plain-text message from a configured account
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },

    /// Store an account secret in the OS keyring
    SetSecret {
        #[arg(long)]
        address: String,
    },
}

fn open_repo(cfg: &Config) -> Result<SqliteRepo> {
    let db_path = resolve_db_path(cfg)?;
    SqliteRepo::open(&db_path)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    match cli.cmd {
        Command::SetSecret { address } => {
            eprintln!("Paste secret for {address} (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            secret_store::save_secret(&address, secret.trim())?;
            println!("Saved secret for {address}");
            Ok(())
        }

        Command::Accounts => {
            let repo = open_repo(&cfg)?;
            for c in repo.list_credentials()? {
                println!(
                    "{}\t{}:{}\t{}",
                    c.address, c.server_host, c.server_port, c.transport_security
                );
            }
            Ok(())
        }

        Command::Replies { customer, json } => {
            let repo = open_repo(&cfg)?;
            let replies = repo.replies_for_customer(&customer)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&replies)?);
            } else {
                for r in replies {
                    println!("[{}] via {}\n{}\n", r.received_at, r.source_address, r.body);
                }
            }
            Ok(())
        }

        Command::Send {
            from,
            to,
            subject,
            body,
        } => {
            let repo = open_repo(&cfg)?;
            let creds = KeyringCredentials::new(&repo);
            let cred = creds
                .list_credentials()?
                .into_iter()
                .find(|c| c.address == from)
                .ok_or_else(|| anyhow!("no credentials stored for {from}"))?;
            send_message(&cred, &OutboundMessage { to, subject, body })
        }

        Command::Poll => {
            let repo = open_repo(&cfg)?;
            let creds = KeyringCredentials::new(&repo);
            let connector = ImapConnector::new(cfg.imap_settings());
            let pipeline = Pipeline {
                credentials: &creds,
                replies: &repo,
                connector: &connector,
                clock: &system_clock,
            };
            let report = pipeline.poll_tick(cfg.max_concurrent_sessions());
            println!(
                "{} account(s), {} failed, {} reply(ies) stored, {} message(s) dropped",
                report.accounts, report.failed_accounts, report.ingested, report.failed_messages
            );
            Ok(())
        }

        Command::Daemon { interval } => {
            let repo = open_repo(&cfg)?;
            let creds = KeyringCredentials::new(&repo);
            let connector = ImapConnector::new(cfg.imap_settings());
            let pipeline = Pipeline {
                credentials: &creds,
                replies: &repo,
                connector: &connector,
                clock: &system_clock,
            };

            run_daemon(
                &pipeline,
                DaemonConfig {
                    interval: interval
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| cfg.poll_interval()),
                    max_concurrent_sessions: cfg.max_concurrent_sessions(),
                },
            )
        }
    }
}
