use rowscope_security::{FilterKind, FilterScope, FilterState};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryFilter, Value};
use std::marker::PhantomData;

use crate::secure::cond::{build_scope_condition, check_unbound};
use crate::secure::error::ScopeError;
use crate::secure::policy::UnscopedPolicy;
use crate::secure::runner::{DbRunner, SeaOrmRunner};
use crate::secure::{ScopableEntity, Scoped, Unscoped};

/// Reconciles the filtered columns of an `ActiveModel` with the scope.
///
/// For every filter the entity is subject to:
/// - **Enabled(id)**: an unset column is stamped with `id`; a column set to
///   anything else is refused with `ScopeError::Denied`
/// - **Disabled**: the column must already be set
/// - **Unbound**: `MissingScope` under fail-closed, otherwise the column must
///   already be set
///
/// # Errors
/// See above; `ScopeError::Invalid` when a required column was left unset.
pub fn apply_scope_to_active_model<E>(
    am: &mut E::ActiveModel,
    scope: &FilterScope,
    policy: UnscopedPolicy,
) -> Result<(), ScopeError>
where
    E: ScopableEntity + EntityTrait,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    reconcile::<E>(am, scope, policy, true)
}

/// Checks an `ActiveModel` about to update an existing row.
///
/// Like [`apply_scope_to_active_model`], but unset filtered columns are left
/// alone: an update that does not touch them keeps the stored value.
///
/// # Errors
/// `ScopeError::Denied` if a filtered column is being moved away from the
/// enabled identifier, `ScopeError::MissingScope` for an unbound filter under
/// fail-closed.
pub fn check_scope_on_update<E>(
    am: &E::ActiveModel,
    scope: &FilterScope,
    policy: UnscopedPolicy,
) -> Result<(), ScopeError>
where
    E: ScopableEntity + EntityTrait,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    let mut scratch = am.clone();
    reconcile::<E>(&mut scratch, scope, policy, false)
}

fn reconcile<E>(
    am: &mut E::ActiveModel,
    scope: &FilterScope,
    policy: UnscopedPolicy,
    inserting: bool,
) -> Result<(), ScopeError>
where
    E: ScopableEntity + EntityTrait,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    for kind in FilterKind::ALL {
        let Some(col) = E::filter_col(kind) else {
            continue;
        };
        let current = am.get(col).into_value();

        match scope.state(kind) {
            FilterState::Enabled(id) => {
                let bound = Value::from(id);
                match current {
                    None if inserting => am.set(col, bound),
                    Some(value) if value != bound => {
                        return Err(ScopeError::Denied(
                            "row identifier does not match the enabled filter",
                        ));
                    }
                    _ => {}
                }
            }
            FilterState::Disabled if inserting => require_set(kind, current.as_ref())?,
            FilterState::Disabled => {}
            FilterState::Unbound => {
                check_unbound::<E>(kind, policy)?;
                if inserting {
                    require_set(kind, current.as_ref())?;
                }
            }
        }
    }
    Ok(())
}

fn require_set(kind: FilterKind, current: Option<&Value>) -> Result<(), ScopeError> {
    if current.is_some() {
        return Ok(());
    }
    Err(ScopeError::Invalid(match kind {
        FilterKind::Tenant => "tenant column must be set when tenantFilter is not enabled",
        FilterKind::Organization => {
            "organization column must be set when organizationFilter is not enabled"
        }
    }))
}

/// Scoped insert for Scopable entities.
///
/// Filtered columns are stamped from (or checked against) the scope by
/// [`apply_scope_to_active_model`] before the row is written, so a unit of
/// work bound to one tenant can never create rows for another.
///
/// # Example
///
/// ```ignore
/// let am = gym_class::ActiveModel {
///     id: Set(Uuid::new_v4()),
///     name: Set("Yoga Basics".to_owned()),
///     ..Default::default()   // tenant_id is filled in from the scope
/// };
/// let class = secure_insert::<gym_class::Entity, _>(am, &scope, policy, &uow).await?;
/// ```
///
/// # Errors
///
/// - `ScopeError::Denied` if a filtered column names a foreign tenant/organization
/// - `ScopeError::MissingScope` if a required filter is unbound (fail-closed)
/// - `ScopeError::Invalid` if a filtered column is unset and cannot be stamped
/// - `ScopeError::Db` if the database insert fails
pub async fn secure_insert<E, R>(
    mut am: E::ActiveModel,
    scope: &FilterScope,
    policy: UnscopedPolicy,
    runner: &R,
) -> Result<E::Model, ScopeError>
where
    E: ScopableEntity + EntityTrait,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
    E::Model: sea_orm::IntoActiveModel<E::ActiveModel>,
    R: DbRunner + ?Sized,
{
    apply_scope_to_active_model::<E>(&mut am, scope, policy)?;

    let model = match runner.as_seaorm() {
        SeaOrmRunner::Conn(conn) => am.insert(conn).await?,
        SeaOrmRunner::Tx(tx) => am.insert(tx).await?,
    };
    Ok(model)
}

/// A type-safe wrapper around `SeaORM`'s `UpdateMany` that enforces scoping.
///
/// # Example
/// ```ignore
/// let result = gym_class::Entity::update_many()
///     .col_expr(gym_class::Column::Status, Expr::value("archived"))
///     .secure()                   // SecureUpdateMany<E, Unscoped>
///     .scope_with(&scope, policy)? // SecureUpdateMany<E, Scoped>
///     .exec(&uow)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct SecureUpdateMany<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::UpdateMany<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `UpdateMany` into a `SecureUpdateMany`.
pub trait SecureUpdateExt<E: EntityTrait>: Sized {
    /// Convert this update operation into a secure (unscoped) update.
    /// You must call `.scope_with()` before executing.
    fn secure(self) -> SecureUpdateMany<E, Unscoped>;
}

impl<E> SecureUpdateExt<E> for sea_orm::UpdateMany<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureUpdateMany<E, Unscoped> {
        SecureUpdateMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureUpdateMany<E, Unscoped>
where
    E: ScopableEntity + EntityTrait,
{
    /// Apply the row filters, transitioning to the `Scoped` state.
    ///
    /// # Errors
    /// Returns `ScopeError::MissingScope` if a required filter is unbound and
    /// `policy` fails closed.
    pub fn scope_with(
        self,
        scope: &FilterScope,
        policy: UnscopedPolicy,
    ) -> Result<SecureUpdateMany<E, Scoped>, ScopeError> {
        let cond = build_scope_condition::<E>(scope, policy)?;
        let inner = if cond.is_empty() {
            self.inner
        } else {
            self.inner.filter(cond)
        };
        Ok(SecureUpdateMany {
            inner,
            _state: PhantomData,
        })
    }
}

impl<E> SecureUpdateMany<E, Scoped>
where
    E: EntityTrait,
{
    /// Set a column for every row in scope.
    #[must_use]
    pub fn col_expr<T>(mut self, col: T, expr: sea_orm::sea_query::SimpleExpr) -> Self
    where
        T: sea_orm::sea_query::IntoIden,
    {
        self.inner = self.inner.col_expr(col, expr);
        self
    }

    /// Add additional filters to the scoped update.
    #[must_use]
    pub fn filter(mut self, filter: sea_orm::Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Execute the update operation.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database operation fails.
    pub async fn exec<R>(self, runner: &R) -> Result<sea_orm::UpdateResult, ScopeError>
    where
        R: DbRunner + ?Sized,
    {
        let res = match runner.as_seaorm() {
            SeaOrmRunner::Conn(conn) => self.inner.exec(conn).await?,
            SeaOrmRunner::Tx(tx) => self.inner.exec(tx).await?,
        };
        Ok(res)
    }

    /// Unwrap the inner `SeaORM` `UpdateMany` for advanced use cases.
    ///
    /// # Safety
    /// The caller must ensure they don't remove or bypass the security
    /// conditions that were applied during `.scope_with()`.
    #[must_use]
    pub fn into_inner(self) -> sea_orm::UpdateMany<E> {
        self.inner
    }
}

/// A type-safe wrapper around `SeaORM`'s `DeleteMany` that enforces scoping.
///
/// # Example
/// ```ignore
/// let result = gym_class::Entity::delete_many()
///     .filter(gym_class::Column::Status.eq("archived"))
///     .secure()
///     .scope_with(&scope, policy)?
///     .exec(&uow)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct SecureDeleteMany<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::DeleteMany<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `DeleteMany` into a `SecureDeleteMany`.
pub trait SecureDeleteExt<E: EntityTrait>: Sized {
    /// Convert this delete operation into a secure (unscoped) delete.
    /// You must call `.scope_with()` before executing.
    fn secure(self) -> SecureDeleteMany<E, Unscoped>;
}

impl<E> SecureDeleteExt<E> for sea_orm::DeleteMany<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureDeleteMany<E, Unscoped> {
        SecureDeleteMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureDeleteMany<E, Unscoped>
where
    E: ScopableEntity + EntityTrait,
{
    /// Apply the row filters, transitioning to the `Scoped` state.
    ///
    /// # Errors
    /// Returns `ScopeError::MissingScope` if a required filter is unbound and
    /// `policy` fails closed.
    pub fn scope_with(
        self,
        scope: &FilterScope,
        policy: UnscopedPolicy,
    ) -> Result<SecureDeleteMany<E, Scoped>, ScopeError> {
        let cond = build_scope_condition::<E>(scope, policy)?;
        let inner = if cond.is_empty() {
            self.inner
        } else {
            self.inner.filter(cond)
        };
        Ok(SecureDeleteMany {
            inner,
            _state: PhantomData,
        })
    }
}

impl<E> SecureDeleteMany<E, Scoped>
where
    E: EntityTrait,
{
    /// Add additional filters to the scoped delete.
    /// The scope conditions remain in place.
    #[must_use]
    pub fn filter(mut self, filter: sea_orm::Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Execute the delete operation.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database operation fails.
    pub async fn exec<R>(self, runner: &R) -> Result<sea_orm::DeleteResult, ScopeError>
    where
        R: DbRunner + ?Sized,
    {
        let res = match runner.as_seaorm() {
            SeaOrmRunner::Conn(conn) => self.inner.exec(conn).await?,
            SeaOrmRunner::Tx(tx) => self.inner.exec(tx).await?,
        };
        Ok(res)
    }

    /// Unwrap the inner `SeaORM` `DeleteMany` for advanced use cases.
    ///
    /// # Safety
    /// The caller must ensure they don't remove or bypass the security
    /// conditions that were applied during `.scope_with()`.
    #[must_use]
    pub fn into_inner(self) -> sea_orm::DeleteMany<E> {
        self.inner
    }
}
