//! High-level secure database wrapper.
//!
//! [`SecureConn`] owns the pooled `SeaORM` connection and the configured
//! [`UnscopedPolicy`]. Repository code never touches the raw connection;
//! it opens a [`UnitOfWork`] per request and queries through it.
//!
//! # Example
//!
//! ```ignore
//! use rowscope_db::secure::{SecureConn, SecurityContext};
//!
//! pub struct ClassesRepo<'a> {
//!     db: &'a SecureConn,
//! }
//!
//! impl ClassesRepo<'_> {
//!     pub async fn list(&self, ctx: &SecurityContext) -> Result<Vec<GymClass>, ScopeError> {
//!         let uow = self.db.unit_of_work_for(ctx)?;
//!         let rows = uow.find::<gym_class::Entity>()?.all(&uow).await?;
//!         Ok(rows.into_iter().map(Into::into).collect())
//!     }
//! }
//! ```

use rowscope_security::{FilterScope, SecurityContext};
use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::secure::runner::SeaOrmRunner;
use crate::secure::{ScopeError, UnitOfWork, UnscopedPolicy};

/// Secure database connection wrapper.
///
/// Cheap to clone; every clone shares the same connection pool. Filter
/// bindings live in the [`UnitOfWork`] values it hands out, never here.
#[derive(Clone, Debug)]
pub struct SecureConn {
    conn: DatabaseConnection,
    policy: UnscopedPolicy,
}

impl SecureConn {
    /// Wrap a connection using the default fail-closed policy.
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self::with_policy(conn, UnscopedPolicy::default())
    }

    #[must_use]
    pub fn with_policy(conn: DatabaseConnection, policy: UnscopedPolicy) -> Self {
        Self { conn, policy }
    }

    /// Get a reference to the underlying database connection.
    ///
    /// # Safety
    ///
    /// Direct connection access bypasses scoping. Valid uses are schema
    /// setup and infrastructure code, never repository logic.
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    #[must_use]
    pub fn policy(&self) -> UnscopedPolicy {
        self.policy
    }

    /// Return database engine identifier for tracing / logging.
    #[must_use]
    pub fn db_engine(&self) -> &'static str {
        use sea_orm::DatabaseBackend;

        match self.conn.get_database_backend() {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }

    /// Open a unit of work with every filter unbound.
    ///
    /// Under the fail-closed policy nothing filtered can be queried until a
    /// filter is enabled or explicitly disabled.
    #[must_use]
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        self.unit_of_work_with(FilterScope::new())
    }

    /// Open a unit of work bound to the tenant (and organization, if any) of
    /// an authenticated caller. The root context gets every filter disabled.
    ///
    /// # Errors
    /// Returns `ScopeError::Param` if the context carries a nil tenant.
    pub fn unit_of_work_for(&self, ctx: &SecurityContext) -> Result<UnitOfWork<'_>, ScopeError> {
        let scope = FilterScope::from_context(ctx)?;
        let uow = self.unit_of_work_with(scope);
        tracing::debug!(
            uow_id = %uow.id(),
            subject_id = %ctx.subject_id(),
            root = ctx.is_root(),
            "unit of work opened for security context"
        );
        Ok(uow)
    }

    /// Open a unit of work with prepared bindings.
    #[must_use]
    pub fn unit_of_work_with(&self, scope: FilterScope) -> UnitOfWork<'_> {
        UnitOfWork::new(SeaOrmRunner::Conn(&self.conn), scope, self.policy)
    }
}
