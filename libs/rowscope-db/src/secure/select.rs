use rowscope_security::FilterScope;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::marker::PhantomData;

use crate::secure::cond::build_scope_condition;
use crate::secure::error::ScopeError;
use crate::secure::policy::UnscopedPolicy;
use crate::secure::runner::{DbRunner, SeaOrmRunner};
use crate::secure::ScopableEntity;

/// Typestate marker: query has not yet been scoped.
/// Cannot execute queries in this state.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: the row filters have been applied.
/// Can now execute queries safely.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// A type-safe wrapper around `SeaORM`'s `Select` that enforces scoping.
///
/// Queries cannot be executed until `.scope_with()` has injected the
/// tenant/organization predicates.
///
/// # Example
/// ```rust,ignore
/// use rowscope_db::secure::{FilterScope, SecureEntityExt, UnscopedPolicy};
///
/// let scope = FilterScope::for_tenant(tenant_id);
/// let classes = gym_class::Entity::find()
///     .secure()                                          // SecureSelect<E, Unscoped>
///     .scope_with(&scope, UnscopedPolicy::FailClosed)?   // SecureSelect<E, Scoped>
///     .all(&db)                                          // now can execute
///     .await?;
/// ```
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::Select<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `Select` into a `SecureSelect`.
pub trait SecureEntityExt<E: EntityTrait>: Sized {
    /// Convert this select query into a secure (unscoped) select.
    /// You must call `.scope_with()` before executing the query.
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E> SecureEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            _state: PhantomData,
        }
    }
}

// Methods available only on Unscoped queries
impl<E> SecureSelect<E, Unscoped>
where
    E: ScopableEntity + EntityTrait,
{
    /// Apply the row filters, transitioning to the `Scoped` state.
    ///
    /// # Errors
    /// Returns `ScopeError::MissingScope` if `E` is subject to a filter that is
    /// unbound in `scope` and `policy` fails closed.
    pub fn scope_with(
        self,
        scope: &FilterScope,
        policy: UnscopedPolicy,
    ) -> Result<SecureSelect<E, Scoped>, ScopeError> {
        let cond = build_scope_condition::<E>(scope, policy)?;
        let inner = if cond.is_empty() {
            self.inner
        } else {
            self.inner.filter(cond)
        };
        Ok(SecureSelect {
            inner,
            _state: PhantomData,
        })
    }
}

// Methods available only on Scoped queries
impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// Execute the query and return all matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all<R>(self, runner: &R) -> Result<Vec<E::Model>, ScopeError>
    where
        R: DbRunner + ?Sized,
    {
        let rows = match runner.as_seaorm() {
            SeaOrmRunner::Conn(conn) => self.inner.all(conn).await?,
            SeaOrmRunner::Tx(tx) => self.inner.all(tx).await?,
        };
        Ok(rows)
    }

    /// Execute the query and return at most one result.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one<R>(self, runner: &R) -> Result<Option<E::Model>, ScopeError>
    where
        R: DbRunner + ?Sized,
    {
        let row = match runner.as_seaorm() {
            SeaOrmRunner::Conn(conn) => self.inner.one(conn).await?,
            SeaOrmRunner::Tx(tx) => self.inner.one(tx).await?,
        };
        Ok(row)
    }

    /// Execute the query and return the number of matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count<R>(self, runner: &R) -> Result<u64, ScopeError>
    where
        R: DbRunner + ?Sized,
        E::Model: sea_orm::FromQueryResult + Send + Sync,
    {
        let n = match runner.as_seaorm() {
            SeaOrmRunner::Conn(conn) => self.inner.count(conn).await?,
            SeaOrmRunner::Tx(tx) => self.inner.count(tx).await?,
        };
        Ok(n)
    }

    /// Narrow a scoped query to a single resource.
    ///
    /// # Errors
    /// Returns `ScopeError::Invalid` if the entity doesn't have a resource column.
    pub fn and_id(self, id: uuid::Uuid) -> Result<Self, ScopeError>
    where
        E: ScopableEntity,
    {
        let resource_col = E::resource_col().ok_or(ScopeError::Invalid(
            "Entity must have a resource_col to use and_id()",
        ))?;
        let cond = sea_orm::Condition::all().add(resource_col.eq(id));
        Ok(self.filter(cond))
    }

    /// Add additional filters to the scoped query.
    /// The scope conditions remain in place.
    pub fn filter(mut self, filter: sea_orm::Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Add ordering to the scoped query.
    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    /// Add a limit to the scoped query.
    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    /// Add an offset to the scoped query.
    pub fn offset(mut self, offset: u64) -> Self {
        self.inner = QuerySelect::offset(self.inner, offset);
        self
    }

    /// Apply the row filters of a joined entity.
    ///
    /// The caller adds the join itself; this only appends `J`'s predicates,
    /// qualified by `J`'s table.
    ///
    /// # Example
    /// ```ignore
    /// // Sessions whose class is visible in the current scope as well
    /// session::Entity::find()
    ///     .inner_join(gym_class::Entity)
    ///     .secure()
    ///     .scope_with(&scope, policy)?
    ///     .and_scope_for::<gym_class::Entity>(&scope, policy)?
    ///     .all(&uow)
    ///     .await?
    /// ```
    ///
    /// # Errors
    /// Returns `ScopeError::MissingScope` if `J` needs a filter that is unbound
    /// and `policy` fails closed.
    pub fn and_scope_for<J>(
        mut self,
        scope: &FilterScope,
        policy: UnscopedPolicy,
    ) -> Result<Self, ScopeError>
    where
        J: ScopableEntity + EntityTrait,
    {
        let cond = build_scope_condition::<J>(scope, policy)?;
        if !cond.is_empty() {
            self.inner = QueryFilter::filter(self.inner, cond);
        }
        Ok(self)
    }

    /// Unwrap the inner `SeaORM` `Select` for advanced use cases.
    ///
    /// # Safety
    /// The caller must ensure they don't remove or bypass the security
    /// conditions that were applied during `.scope_with()`.
    #[must_use]
    pub fn into_inner(self) -> sea_orm::Select<E> {
        self.inner
    }
}
