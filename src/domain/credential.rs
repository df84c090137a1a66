use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the outgoing server connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportSecurity {
    /// TLS from the first byte (usually port 465).
    Ssl,
    /// Plain connection upgraded with STARTTLS when the server offers it.
    Tls,
}

impl TransportSecurity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportSecurity::Ssl => "ssl",
            TransportSecurity::Tls => "tls",
        }
    }
}

impl fmt::Display for TransportSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportSecurity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssl" | "true" | "1" => Ok(TransportSecurity::Ssl),
            "tls" | "none" | "false" | "0" | "" => Ok(TransportSecurity::Tls),
            other => Err(anyhow!("unknown transport security {other:?}")),
        }
    }
}

/// One mail account the poller is allowed to use.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub address: String,
    pub secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub transport_security: TransportSecurity,
}

// Hand-written so secrets never end up in logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("transport_security", &self.transport_security)
            .finish()
    }
}
