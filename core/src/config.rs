//! Pool configuration and environment loading.

use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_WORKERS: usize = 4;

/// Response bodies larger than this are rejected as decode failures.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Everything needed to start a `Pool` against a live shop.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub endpoint: String,
    pub user: String,
    pub key: String,
    pub workers: usize,
    /// Global per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub raise_on_failure: bool,
    pub max_body_bytes: u64,
}

impl PoolConfig {
    pub fn new(endpoint: impl Into<String>, user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: user.into(),
            key: key.into(),
            workers: DEFAULT_WORKERS,
            timeout: None,
            raise_on_failure: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Read `SHOPWARE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. `SHOPWARE_ENDPOINT`,
    /// `SHOPWARE_USER` and `SHOPWARE_KEY` are required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |name: &str| lookup(name).ok_or_else(|| Error::Config(format!("{name} is not set")));

        let mut config = Self::new(
            required("SHOPWARE_ENDPOINT")?,
            required("SHOPWARE_USER")?,
            required("SHOPWARE_KEY")?,
        );
        if let Some(workers) = lookup("SHOPWARE_WORKERS") {
            config.workers = parse(&workers, "SHOPWARE_WORKERS")?;
        }
        if let Some(secs) = lookup("SHOPWARE_TIMEOUT_SECS") {
            config.timeout = Some(Duration::from_secs(parse(&secs, "SHOPWARE_TIMEOUT_SECS")?));
        }
        if let Some(raise) = lookup("SHOPWARE_RAISE_ON_FAILURE") {
            config.raise_on_failure = parse(&raise, "SHOPWARE_RAISE_ON_FAILURE")?;
        }
        if let Some(limit) = lookup("SHOPWARE_MAX_BODY_BYTES") {
            config.max_body_bytes = parse(&limit, "SHOPWARE_MAX_BODY_BYTES")?;
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} has invalid value {value:?}")))
}
