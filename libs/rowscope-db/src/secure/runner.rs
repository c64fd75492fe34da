//! Hidden database runner capability.
//!
//! Secure query wrappers execute against a [`DbRunner`] instead of a raw
//! `SeaORM` connection. Only [`SecureConn`] and [`UnitOfWork`] implement it,
//! so downstream code cannot hand an arbitrary executor to a scoped query.
//!
//! # Security Model
//!
//! The `DbRunner` trait is **sealed** - it cannot be implemented outside this crate.

use super::secure_conn::SecureConn;
use super::unit_of_work::UnitOfWork;

mod sealed {
    pub trait Sealed {}
}

/// Internal-only bridge to `SeaORM`'s executor types.
#[derive(Clone, Copy)]
pub enum SeaOrmRunner<'a> {
    Conn(&'a sea_orm::DatabaseConnection),
    Tx(&'a sea_orm::DatabaseTransaction),
}

/// Execution target for scoped queries.
///
/// This trait cannot be implemented outside `rowscope-db`.
pub trait DbRunner: sealed::Sealed + Send + Sync {
    #[doc(hidden)]
    fn as_seaorm(&self) -> SeaOrmRunner<'_>;
}

impl sealed::Sealed for SecureConn {}
impl DbRunner for SecureConn {
    fn as_seaorm(&self) -> SeaOrmRunner<'_> {
        SeaOrmRunner::Conn(self.conn())
    }
}

impl sealed::Sealed for UnitOfWork<'_> {}
impl DbRunner for UnitOfWork<'_> {
    fn as_seaorm(&self) -> SeaOrmRunner<'_> {
        self.runner()
    }
}
