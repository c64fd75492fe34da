//! Connection and scoping configuration.
//!
//! Loaded with Figment from the `database` section:
//!
//! ```yaml
//! database:
//!   dsn: "postgres://app@localhost/gym"
//!   max_conns: 20
//!   acquire_timeout: 5s
//!   unscoped_policy: fail_closed
//! ```
//!
//! Environment overrides use the `ROWSCOPE_` prefix with `__` as the nesting
//! separator, e.g. `ROWSCOPE_DATABASE__MAX_CONNS=4`.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};

use crate::DbError;
use crate::secure::UnscopedPolicy;

/// Figment section holding [`SecureDbConfig`].
pub const CONFIG_SECTION: &str = "database";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "ROWSCOPE_";

const DEFAULT_MAX_CONNS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecureDbConfig {
    pub dsn: String,
    #[serde(default = "default_max_conns")]
    pub max_conns: u32,
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Behavior for filtered entities touched while a filter is unbound.
    #[serde(default)]
    pub unscoped_policy: UnscopedPolicy,
}

fn default_max_conns() -> u32 {
    DEFAULT_MAX_CONNS
}

fn default_acquire_timeout() -> Duration {
    DEFAULT_ACQUIRE_TIMEOUT
}

impl SecureDbConfig {
    /// Config with defaults for everything but the DSN.
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            max_conns: DEFAULT_MAX_CONNS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            unscoped_policy: UnscopedPolicy::default(),
        }
    }

    /// Extract and validate the `database` section.
    ///
    /// # Errors
    /// `DbError::Config` if the section is missing or malformed,
    /// `DbError::InvalidConfig` if a value is out of range.
    pub fn from_figment(figment: &Figment) -> Result<Self, DbError> {
        let cfg: Self = figment
            .extract_inner(CONFIG_SECTION)
            .map_err(|e| DbError::Config(Box::new(e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a YAML file, then apply `ROWSCOPE_*` environment overrides.
    ///
    /// # Errors
    /// As [`from_figment`](Self::from_figment).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let figment = Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// # Errors
    /// `DbError::InvalidConfig` for an empty DSN, zero pool size or zero timeout.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.dsn.trim().is_empty() {
            return Err(DbError::InvalidConfig("dsn must not be empty".to_owned()));
        }
        if self.max_conns == 0 {
            return Err(DbError::InvalidConfig(
                "max_conns must be greater than zero".to_owned(),
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(DbError::InvalidConfig(
                "acquire_timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}
