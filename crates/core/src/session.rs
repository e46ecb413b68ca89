//! Shell session state
//!
//! The session is owned by the shell and passed by reference into every
//! command. Connection readiness is derived from it on every line; nothing
//! about the connection is cached here.

use crate::error::{Error, Result};
use crate::timing::TimingMode;
use crate::traits::Credentials;

pub const DEFAULT_HOST: &str = "s3.amazonaws.com";
pub const DEFAULT_PROMPT: &str = "sh3> ";
pub const MAX_THREADS: usize = 20;

/// Mutable parameters of one shell session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub host: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub prompt: String,
    threads: usize,
    pub timing: TimingMode,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            host: Some(DEFAULT_HOST.to_string()),
            access_key: None,
            secret_key: None,
            bucket: None,
            prompt: DEFAULT_PROMPT.to_string(),
            threads: 1,
            timing: TimingMode::default(),
        }
    }
}

impl Session {
    /// A session with every field unset except prompt, threads and timing
    pub fn empty() -> Self {
        Self {
            host: None,
            ..Self::default()
        }
    }

    /// True when host, access key and secret key are all set
    pub fn is_connected(&self) -> bool {
        self.host.is_some() && self.access_key.is_some() && self.secret_key.is_some()
    }

    /// Credentials for the session account, when connected
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            host: self.host.clone()?,
            access_key: self.access_key.clone()?,
            secret_key: self.secret_key.clone()?,
        })
    }

    /// Credentials for a second account on the same host
    pub fn credentials_for(&self, access_key: &str, secret_key: &str) -> Option<Credentials> {
        Some(Credentials {
            host: self.host.clone()?,
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// The active bucket, or [`Error::BucketNotSet`]
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket.as_deref().ok_or(Error::BucketNotSet)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Set the worker count for batch commands; must be within 1..=20
    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        if !(1..=MAX_THREADS).contains(&threads) {
            return Err(Error::InvalidArgument(format!(
                "number of threads must be between 1 and {MAX_THREADS}"
            )));
        }
        self.threads = threads;
        Ok(())
    }
}
