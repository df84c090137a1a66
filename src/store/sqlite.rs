use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{Connection, params};
use std::sync::{Mutex, MutexGuard};

use crate::domain::credential::{CredentialRecord, TransportSecurity};
use crate::domain::reply::ReplyRecord;
use crate::store::repo::{CredentialStore, ReplyStore};

pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.migrate()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection mutex poisoned"))
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS credentials (
                id                  INTEGER PRIMARY KEY,
                address             TEXT NOT NULL UNIQUE,
                secret              TEXT NOT NULL DEFAULT '',
                server_host         TEXT NOT NULL,
                server_port         INTEGER NOT NULL,
                transport_security  TEXT NOT NULL DEFAULT 'tls'
            );

            CREATE TABLE IF NOT EXISTS replies (
                id                INTEGER PRIMARY KEY,
                source_address    TEXT NOT NULL,
                customer_address  TEXT NOT NULL,
                body              TEXT NOT NULL,
                received_at       INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS replies_customer
                ON replies (customer_address, received_at);
            "#,
        )?;
        Ok(())
    }

    /// Seeds an account. The campaign tool owns this table in production.
    pub fn add_credential(&self, cred: &CredentialRecord) -> Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO credentials (address, secret, server_host, server_port, transport_security)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(address) DO UPDATE SET
              secret=excluded.secret,
              server_host=excluded.server_host,
              server_port=excluded.server_port,
              transport_security=excluded.transport_security
            "#,
            params![
                cred.address,
                cred.secret,
                cred.server_host,
                cred.server_port,
                cred.transport_security.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn count_replies(&self) -> Result<i64> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM replies", [], |r| r.get(0))?;
        Ok(n)
    }
}

impl CredentialStore for SqliteRepo {
    fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT address, secret, server_host, server_port, transport_security
            FROM credentials
            ORDER BY id
            "#,
        )?;

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();

        while let Some(r) = rows.next()? {
            match credential_from_row(r) {
                Ok(cred) => out.push(cred),
                // one broken row must not hide the other accounts
                Err(e) => warn!("skipping credential row: {e:#}"),
            }
        }
        Ok(out)
    }
}

fn credential_from_row(r: &rusqlite::Row<'_>) -> Result<CredentialRecord> {
    let address: String = r.get(0)?;
    let port: i64 = r.get(3)?;
    let server_port = u16::try_from(port)
        .map_err(|_| anyhow!("credential {address}: port {port} out of range"))?;
    let security: String = r.get(4)?;
    let transport_security = security
        .parse::<TransportSecurity>()
        .with_context(|| format!("credential {address}"))?;
    Ok(CredentialRecord {
        secret: r.get(1)?,
        server_host: r.get(2)?,
        address,
        server_port,
        transport_security,
    })
}

impl ReplyStore for SqliteRepo {
    fn insert_reply(&self, reply: &ReplyRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO replies (source_address, customer_address, body, received_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                reply.source_address,
                reply.customer_address,
                reply.body,
                reply.received_at.timestamp_millis()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn replies_for_customer(&self, customer_address: &str) -> Result<Vec<ReplyRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT source_address, customer_address, body, received_at
            FROM replies
            WHERE customer_address = ?1
            ORDER BY received_at DESC, id DESC
            "#,
        )?;

        let mut rows = stmt.query(params![customer_address])?;
        let mut out = Vec::new();

        while let Some(r) = rows.next()? {
            let millis: i64 = r.get(3)?;
            let received_at = DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| anyhow!("reply timestamp {millis} out of range"))?;
            out.push(ReplyRecord {
                source_address: r.get(0)?,
                customer_address: r.get(1)?,
                body: r.get(2)?,
                received_at,
            });
        }
        Ok(out)
    }
}
