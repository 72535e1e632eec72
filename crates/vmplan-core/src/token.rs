//! Cluster bootstrap secrets
//!
//! Join tokens and the keepalived auth password are generated once per
//! cluster and reused from their token files on later runs. These are join
//! secrets, so generation goes through the thread-local CSPRNG.

use crate::error::Result;
use crate::sentinel::{self, SentinelMode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::PathBuf;

/// Sentinel-backed store of named random secrets
pub struct TokenStore {
    dir: PathBuf,
    mode: SentinelMode,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>, mode: SentinelMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    /// Return the token named `name`, generating and persisting it on first
    /// use.
    pub async fn get_or_create(&self, name: &str, length: usize) -> Result<String> {
        let path = self.dir.join(name);

        if let Some(existing) = sentinel::read(&path).await? {
            tracing::debug!(token = name, "Token file found, reusing");
            return Ok(existing);
        }

        tracing::info!(token = name, length, "Token file not found, generating");
        let value = generate_token(length);
        sentinel::write(&path, &value, self.mode).await?;
        Ok(value)
    }
}

/// `length` characters from `[A-Za-z0-9]`
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}
