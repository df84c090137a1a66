use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};
use log::warn;

use crate::domain::credential::CredentialRecord;
use crate::store::repo::CredentialStore;

const SERVICE: &str = "reply_poller";

/// Save an account secret into the OS keyring, keyed by address
pub fn save_secret(address: &str, secret: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, address);
    entry?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load an account secret from the keyring
pub fn load_secret(address: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, address);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Fills in secrets that the credential rows leave empty.
pub struct KeyringCredentials<'a, F = fn(&str) -> Result<Option<String>>> {
    inner: &'a dyn CredentialStore,
    lookup: F,
}

impl<'a> KeyringCredentials<'a> {
    pub fn new(inner: &'a dyn CredentialStore) -> Self {
        Self {
            inner,
            lookup: load_secret,
        }
    }
}

impl<'a, F> KeyringCredentials<'a, F>
where
    F: Fn(&str) -> Result<Option<String>> + Send + Sync,
{
    pub fn with_lookup(inner: &'a dyn CredentialStore, lookup: F) -> Self {
        Self { inner, lookup }
    }
}

impl<F> CredentialStore for KeyringCredentials<'_, F>
where
    F: Fn(&str) -> Result<Option<String>> + Send + Sync,
{
    fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        let mut creds = self.inner.list_credentials()?;
        for cred in creds.iter_mut().filter(|c| c.secret.is_empty()) {
            match (self.lookup)(&cred.address) {
                Ok(Some(secret)) => cred.secret = secret,
                Ok(None) => warn!("{}: no secret stored and none in keyring", cred.address),
                Err(e) => warn!("{}: keyring lookup failed: {e}", cred.address),
            }
        }
        Ok(creds)
    }
}
