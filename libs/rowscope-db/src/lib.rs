#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant and organization row scoping for `SeaORM`.
//!
//! Repository code opens a [`UnitOfWork`](secure::UnitOfWork) per request,
//! enables `tenantFilter` / `organizationFilter` for it, and every
//! select/update/delete issued through the unit carries the matching
//! `column = value` predicates. Inserts are stamped with the bound
//! identifiers.
//!
//! # Example
//! ```rust,no_run
//! use rowscope_db::{SecureDbConfig, connect};
//! use figment::{Figment, providers::Serialized};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
//!     "database": {
//!         "dsn": "sqlite::memory:",
//!         "max_conns": 1,
//!         "unscoped_policy": "fail_closed"
//!     }
//! })));
//!
//! let cfg = SecureDbConfig::from_figment(&figment)?;
//! let db = connect(&cfg).await?;
//!
//! let mut uow = db.unit_of_work();
//! uow.enable("tenantFilter", "tenantId", "0e6f3a52-8d2b-4c1e-b5a9-7f4d3c2b1a09")?;
//! # Ok(())
//! # }
//! ```

// Lets the derive macro refer to `::rowscope_db` from inside this crate.
extern crate self as rowscope_db;

pub mod config;
pub mod secure;

pub use config::SecureDbConfig;
pub use secure::SecureConn;

use sea_orm::{ConnectOptions, Database};
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Connection and configuration failures.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Open the connection pool described by `cfg`.
///
/// # Errors
/// `DbError::InvalidConfig` for an invalid config, `DbError::Sea` if the
/// database cannot be reached.
pub async fn connect(cfg: &SecureDbConfig) -> Result<SecureConn> {
    cfg.validate()?;

    let mut opts = ConnectOptions::new(cfg.dsn.clone());
    opts.max_connections(cfg.max_conns)
        .acquire_timeout(cfg.acquire_timeout)
        .sqlx_logging(false);

    let conn = Database::connect(opts).await?;
    let db = SecureConn::with_policy(conn, cfg.unscoped_policy);
    tracing::info!(
        engine = db.db_engine(),
        max_conns = cfg.max_conns,
        unscoped_policy = ?cfg.unscoped_policy,
        "Secure database connection ready"
    );
    Ok(db)
}
