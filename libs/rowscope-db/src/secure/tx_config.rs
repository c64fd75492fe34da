//! Transaction settings for [`UnitOfWork::in_transaction_with_config`].
//!
//! Callers pick isolation and access mode without importing `SeaORM` types;
//! the conversion happens here.
//!
//! ```ignore
//! use rowscope_db::secure::TxConfig;
//!
//! let total = uow
//!     .in_transaction_with_config(TxConfig::serializable(), |tx| Box::pin(async move {
//!         tx.find::<invoice::Entity>()?.count(tx).await
//!     }))
//!     .await?;
//! ```
//!
//! [`UnitOfWork::in_transaction_with_config`]: crate::secure::UnitOfWork::in_transaction_with_config

use sea_orm::{AccessMode, IsolationLevel};

/// Transaction isolation level.
///
/// `SQLite` only implements `Serializable`; other levels are accepted and
/// mapped to it by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxIsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Transaction access mode. Read-only is a hint on `SQLite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxAccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// Isolation and access mode; `None` leaves the database default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxConfig {
    pub isolation: Option<TxIsolationLevel>,
    pub access_mode: Option<TxAccessMode>,
}

impl TxConfig {
    #[must_use]
    pub fn with_isolation(isolation: TxIsolationLevel) -> Self {
        Self {
            isolation: Some(isolation),
            access_mode: None,
        }
    }

    #[must_use]
    pub fn read_only() -> Self {
        Self {
            isolation: None,
            access_mode: Some(TxAccessMode::ReadOnly),
        }
    }

    #[must_use]
    pub fn serializable() -> Self {
        Self::with_isolation(TxIsolationLevel::Serializable)
    }
}

impl From<TxIsolationLevel> for IsolationLevel {
    fn from(level: TxIsolationLevel) -> Self {
        match level {
            TxIsolationLevel::ReadUncommitted => IsolationLevel::ReadUncommitted,
            TxIsolationLevel::ReadCommitted => IsolationLevel::ReadCommitted,
            TxIsolationLevel::RepeatableRead => IsolationLevel::RepeatableRead,
            TxIsolationLevel::Serializable => IsolationLevel::Serializable,
        }
    }
}

impl From<TxAccessMode> for AccessMode {
    fn from(mode: TxAccessMode) -> Self {
        match mode {
            TxAccessMode::ReadOnly => AccessMode::ReadOnly,
            TxAccessMode::ReadWrite => AccessMode::ReadWrite,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_leaves_database_defaults() {
        let cfg = TxConfig::default();
        assert!(cfg.isolation.is_none());
        assert!(cfg.access_mode.is_none());
    }

    #[test]
    fn shortcuts_set_one_knob() {
        let cfg = TxConfig::serializable();
        assert_eq!(cfg.isolation, Some(TxIsolationLevel::Serializable));
        assert!(cfg.access_mode.is_none());

        let cfg = TxConfig::read_only();
        assert!(cfg.isolation.is_none());
        assert_eq!(cfg.access_mode, Some(TxAccessMode::ReadOnly));
    }

    #[test]
    fn converts_to_sea_orm() {
        assert!(matches!(
            IsolationLevel::from(TxIsolationLevel::RepeatableRead),
            IsolationLevel::RepeatableRead
        ));
        assert!(matches!(
            AccessMode::from(TxAccessMode::ReadOnly),
            AccessMode::ReadOnly
        ));
    }
}
