use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mail::imap_client::ImapSettings;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub imap_server: Option<String>,
    pub imap_port: Option<u16>,
    pub mailbox: Option<String>,
    pub db_path: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub auth_timeout_secs: Option<u64>,
    pub socket_timeout_secs: Option<u64>,
    pub max_concurrent_sessions: Option<usize>,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("reply_poller"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("replies.db");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Reads `path`, writing a template with the defaults spelled out if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config {
            imap_server: Some("imap.gmail.com".to_string()),
            imap_port: Some(993),
            mailbox: Some("INBOX".to_string()),
            db_path: None,
            poll_interval_secs: Some(60),
            auth_timeout_secs: Some(10),
            socket_timeout_secs: Some(30),
            max_concurrent_sessions: Some(1),
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        info!("created template config at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(60))
    }

    pub fn max_concurrent_sessions(&self) -> usize {
        self.max_concurrent_sessions.unwrap_or(1).max(1)
    }

    pub fn imap_settings(&self) -> ImapSettings {
        let d = ImapSettings::default();
        ImapSettings {
            server: self.imap_server.clone().unwrap_or(d.server),
            port: self.imap_port.unwrap_or(d.port),
            mailbox: self.mailbox.clone().unwrap_or(d.mailbox),
            auth_timeout: self
                .auth_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(d.auth_timeout),
            socket_timeout: self
                .socket_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(d.socket_timeout),
        }
    }
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}
