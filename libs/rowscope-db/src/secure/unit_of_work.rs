//! Per-request unit of work carrying its own filter bindings.
//!
//! A [`UnitOfWork`] pairs an execution target (pooled connection or open
//! transaction) with the [`FilterScope`] for one request. Bindings never leave
//! the value that owns them, so two units running concurrently on the same
//! [`SecureConn`](crate::secure::SecureConn) cannot observe each other's scope.
//!
//! # Example
//!
//! ```ignore
//! let mut uow = db.unit_of_work();
//! uow.enable("tenantFilter", "tenantId", header_value)?;
//!
//! let classes = uow.find::<gym_class::Entity>()?.all(&uow).await?;
//! ```

use std::{future::Future, pin::Pin};

use rowscope_security::{FilterKind, FilterScope, OrganizationId, ScopeParamError, TenantId};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, EntityTrait, IsolationLevel, QueryFilter,
    TransactionTrait, Value,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::secure::db_ops::{SecureDeleteExt, SecureDeleteMany, SecureUpdateExt, SecureUpdateMany};
use crate::secure::runner::SeaOrmRunner;
use crate::secure::tx_config::TxConfig;
use crate::secure::tx_error::{InfraError, TxError};
use crate::secure::{
    ScopableEntity, ScopeError, Scoped, SecureEntityExt, SecureSelect, UnscopedPolicy,
};

/// Filter bindings plus the executor they apply to.
pub struct UnitOfWork<'a> {
    runner: SeaOrmRunner<'a>,
    scope: FilterScope,
    policy: UnscopedPolicy,
    id: Uuid,
    span: tracing::Span,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(runner: SeaOrmRunner<'a>, scope: FilterScope, policy: UnscopedPolicy) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::debug_span!("unit_of_work", uow_id = %id, policy = ?policy);
        Self {
            runner,
            scope,
            policy,
            id,
            span,
        }
    }

    pub(crate) fn runner(&self) -> SeaOrmRunner<'_> {
        self.runner
    }

    /// Identifier attached to every log line emitted for this unit.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current bindings.
    #[must_use]
    pub fn scope(&self) -> &FilterScope {
        &self.scope
    }

    #[must_use]
    pub fn policy(&self) -> UnscopedPolicy {
        self.policy
    }

    /// Whether this unit runs inside a database transaction.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        matches!(self.runner, SeaOrmRunner::Tx(_))
    }

    // ========================================================================
    // Filter bindings
    // ========================================================================

    /// Activate `filter_name`, binding `value` to `parameter_name`.
    ///
    /// The raw value must be a non-nil UUID. On failure the bindings are left
    /// exactly as they were.
    ///
    /// # Errors
    /// - `ScopeParamError::UnknownFilter` for an undeclared filter name
    /// - `ScopeParamError::InvalidParameter` for a wrong parameter name or a
    ///   missing/malformed identifier
    pub fn enable(
        &mut self,
        filter_name: &str,
        parameter_name: &str,
        value: &str,
    ) -> Result<(), ScopeParamError> {
        let _guard = self.span.enter();
        match self.scope.enable(filter_name, parameter_name, value) {
            Ok(()) => {
                tracing::debug!(
                    filter = filter_name,
                    parameter = parameter_name,
                    value = value.trim(),
                    "filter enabled"
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(filter = filter_name, error = %e, "filter binding rejected");
                Err(e)
            }
        }
    }

    /// Bind `tenantFilter` to an already validated identifier.
    pub fn enable_tenant(&mut self, tenant_id: TenantId) {
        let _guard = self.span.enter();
        self.scope.enable_tenant(tenant_id);
        tracing::debug!(filter = FilterKind::Tenant.name(), value = %tenant_id, "filter enabled");
    }

    /// Bind `organizationFilter` to an already validated identifier.
    pub fn enable_organization(&mut self, organization_id: OrganizationId) {
        let _guard = self.span.enter();
        self.scope.enable_organization(organization_id);
        tracing::debug!(
            filter = FilterKind::Organization.name(),
            value = %organization_id,
            "filter enabled"
        );
    }

    /// Bind a filter by kind.
    ///
    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` for the nil UUID.
    pub fn enable_kind(&mut self, kind: FilterKind, id: Uuid) -> Result<(), ScopeParamError> {
        let _guard = self.span.enter();
        self.scope.enable_kind(kind, id)?;
        tracing::debug!(filter = kind.name(), value = %id, "filter enabled");
        Ok(())
    }

    /// Turn `filter_name` off for the rest of this unit.
    ///
    /// Subsequent queries run without its predicate, so this is logged at
    /// `info` level.
    ///
    /// # Errors
    /// Returns `ScopeParamError::UnknownFilter` for an undeclared filter name.
    pub fn disable(&mut self, filter_name: &str) -> Result<(), ScopeParamError> {
        let _guard = self.span.enter();
        self.scope.disable(filter_name)?;
        tracing::info!(filter = filter_name, "filter disabled");
        Ok(())
    }

    // ========================================================================
    // Scoped queries
    // ========================================================================

    /// Select query carrying the current bindings.
    ///
    /// # Errors
    /// Returns `ScopeError::MissingScope` if `E` needs a filter that is unbound
    /// and the policy fails closed.
    pub fn find<E>(&self) -> Result<SecureSelect<E, Scoped>, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
    {
        let _guard = self.span.enter();
        E::find().secure().scope_with(&self.scope, self.policy)
    }

    /// Select a single resource by its primary identifier.
    ///
    /// # Errors
    /// `ScopeError::Invalid` if `E` has no resource column, otherwise as [`find`](Self::find).
    pub fn find_by_id<E>(&self, id: Uuid) -> Result<SecureSelect<E, Scoped>, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
    {
        self.find::<E>()?.and_id(id)
    }

    /// Update query carrying the current bindings.
    ///
    /// # Errors
    /// As [`find`](Self::find).
    pub fn update_many<E>(&self) -> Result<SecureUpdateMany<E, Scoped>, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
    {
        let _guard = self.span.enter();
        E::update_many().secure().scope_with(&self.scope, self.policy)
    }

    /// Delete query carrying the current bindings.
    ///
    /// # Errors
    /// As [`find`](Self::find).
    pub fn delete_many<E>(&self) -> Result<SecureDeleteMany<E, Scoped>, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
    {
        let _guard = self.span.enter();
        E::delete_many().secure().scope_with(&self.scope, self.policy)
    }

    /// Insert a row, stamping or checking its filtered columns.
    ///
    /// # Errors
    /// See [`secure_insert`](crate::secure::secure_insert).
    pub async fn insert<E>(&self, am: E::ActiveModel) -> Result<E::Model, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
        E::Model: sea_orm::IntoActiveModel<E::ActiveModel>,
    {
        crate::secure::secure_insert::<E, _>(am, &self.scope, self.policy, self)
            .instrument(self.span.clone())
            .await
    }

    /// Update a single row after checking it is visible in the current scope.
    ///
    /// The write is issued as a scoped `UPDATE ... WHERE id = ?`, so only the
    /// row named by `id` can change. The resource column of `am` must be unset
    /// or equal to `id`. Filtered columns left unset keep their stored value;
    /// setting one to an identifier other than the enabled binding is refused,
    /// so a row cannot be moved to another tenant.
    ///
    /// # Errors
    /// - `ScopeError::Denied` if the row does not exist or is outside the
    ///   scope, or `am` names a different row
    /// - `ScopeError::Invalid` if `E` has no resource column
    /// - `ScopeError::MissingScope` under fail-closed with an unbound filter
    /// - `ScopeError::Db` if the database operation fails
    pub async fn update_with_scope<E>(
        &self,
        id: Uuid,
        am: E::ActiveModel,
    ) -> Result<E::Model, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
    {
        async move {
            let resource_col = E::resource_col().ok_or(ScopeError::Invalid(
                "Entity must have a resource_col to use update_with_scope()",
            ))?;
            if let Some(target) = am.get(resource_col).into_value()
                && target != Value::from(id)
            {
                return Err(ScopeError::Denied(
                    "active model id does not match the row being updated",
                ));
            }

            let exists = self.find_by_id::<E>(id)?.one(self).await?.is_some();
            if !exists {
                return Err(ScopeError::Denied(
                    "entity not found or not accessible in current scope",
                ));
            }

            crate::secure::check_scope_on_update::<E>(&am, &self.scope, self.policy)?;
            if am.is_changed() {
                E::update_many()
                    .set(am)
                    .filter(resource_col.eq(id))
                    .secure()
                    .scope_with(&self.scope, self.policy)?
                    .exec(self)
                    .await?;
            }

            self.find_by_id::<E>(id)?
                .one(self)
                .await?
                .ok_or(ScopeError::Denied(
                    "entity not found or not accessible in current scope",
                ))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Delete a single row by id within the current scope.
    ///
    /// Returns `Ok(false)` when no visible row has that id.
    ///
    /// # Errors
    /// `ScopeError::Invalid` if `E` has no resource column, otherwise as
    /// [`delete_many`](Self::delete_many).
    pub async fn delete_by_id<E>(&self, id: Uuid) -> Result<bool, ScopeError>
    where
        E: ScopableEntity + EntityTrait,
    {
        let resource_col = E::resource_col().ok_or(ScopeError::Invalid(
            "Entity must have a resource_col to use delete_by_id()",
        ))?;

        let query = {
            let _guard = self.span.enter();
            E::delete_many()
                .filter(resource_col.eq(id))
                .secure()
                .scope_with(&self.scope, self.policy)?
        };
        let result = query
            .exec(self)
            .instrument(self.span.clone())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Transaction support
    // ========================================================================

    /// Run `f` inside a database transaction.
    ///
    /// The closure receives a transactional unit holding a snapshot of the
    /// current bindings. The transaction commits when `f` returns `Ok` and
    /// rolls back otherwise. Called on a unit that is already transactional,
    /// this opens a nested transaction (savepoint).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let created = uow
    ///     .in_transaction(move |tx| Box::pin(async move {
    ///         if tx.find::<member::Entity>()?.filter(by_email).one(tx).await?.is_some() {
    ///             return Err(DomainError::EmailTaken);
    ///         }
    ///         tx.insert::<member::Entity>(am).await.map_err(DomainError::from)
    ///     }))
    ///     .await
    ///     .map_err(|e| e.into_domain(DomainError::database_infra))?;
    /// ```
    ///
    /// # Errors
    ///
    /// - `TxError::Domain(E)` if the callback fails
    /// - `TxError::Infra(InfraError)` if the transaction cannot be started or committed
    pub async fn in_transaction<T, E, F>(&self, f: F) -> Result<T, TxError<E>>
    where
        T: Send,
        E: std::fmt::Debug + std::fmt::Display + Send,
        F: for<'c> FnOnce(&'c UnitOfWork<'c>) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
    {
        self.in_transaction_with_config(TxConfig::default(), f).await
    }

    /// Same as [`in_transaction`](Self::in_transaction) with an explicit
    /// isolation level and access mode.
    ///
    /// # Errors
    /// As [`in_transaction`](Self::in_transaction).
    pub async fn in_transaction_with_config<T, E, F>(
        &self,
        cfg: TxConfig,
        f: F,
    ) -> Result<T, TxError<E>>
    where
        T: Send,
        E: std::fmt::Debug + std::fmt::Display + Send,
        F: for<'c> FnOnce(&'c UnitOfWork<'c>) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
    {
        let isolation: Option<IsolationLevel> = cfg.isolation.map(Into::into);
        let access_mode: Option<AccessMode> = cfg.access_mode.map(Into::into);

        let txn = match self.runner {
            SeaOrmRunner::Conn(conn) => conn.begin_with_config(isolation, access_mode).await,
            SeaOrmRunner::Tx(tx) => tx.begin_with_config(isolation, access_mode).await,
        }
        .map_err(|e| TxError::Infra(InfraError::new(e.to_string())))?;

        let tx_uow = UnitOfWork::new(SeaOrmRunner::Tx(&txn), self.scope.clone(), self.policy);
        tracing::debug!(parent: &self.span, tx_uow_id = %tx_uow.id, "transaction started");

        let outcome = f(&tx_uow).await;
        drop(tx_uow);

        match outcome {
            Ok(value) => {
                txn.commit()
                    .await
                    .map_err(|e| TxError::Infra(InfraError::new(e.to_string())))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(parent: &self.span, error = %rollback_err, "rollback failed");
                }
                Err(TxError::Domain(e))
            }
        }
    }

    /// [`in_transaction`](Self::in_transaction) with infrastructure errors
    /// mapped into the domain error type.
    ///
    /// # Errors
    /// Returns the callback's error, or `map_infra` applied to a database failure.
    pub async fn in_transaction_mapped<T, E, F, M>(&self, map_infra: M, f: F) -> Result<T, E>
    where
        T: Send,
        E: std::fmt::Debug + std::fmt::Display + Send,
        M: FnOnce(InfraError) -> E + Send,
        F: for<'c> FnOnce(&'c UnitOfWork<'c>) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
    {
        self.in_transaction(f)
            .await
            .map_err(|tx_err| tx_err.into_domain(map_infra))
    }
}

impl std::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("policy", &self.policy)
            .field("transactional", &self.is_transactional())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::secure::tests::{note, setup, tenant_doc};
    use sea_orm::Set;

    fn doc(tenant: Uuid, title: &str) -> tenant_doc::ActiveModel {
        tenant_doc::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant),
            title: Set(title.to_owned()),
        }
    }

    #[tokio::test]
    async fn failed_enable_keeps_previous_binding() {
        let db = setup(UnscopedPolicy::FailClosed).await;
        let tenant = Uuid::new_v4();
        let mut uow = db.unit_of_work();
        uow.enable_kind(FilterKind::Tenant, tenant).unwrap();

        let err = uow.enable("tenantFilter", "tenantId", "not-a-uuid").unwrap_err();
        assert!(err.is_invalid_parameter());
        assert_eq!(uow.scope().binding(FilterKind::Tenant), Some(tenant));
    }

    #[tokio::test]
    async fn transaction_sees_snapshot_and_commits() {
        let db = setup(UnscopedPolicy::FailClosed).await;
        let tenant = Uuid::new_v4();
        let mut uow = db.unit_of_work();
        uow.enable_tenant(TenantId::new(tenant).unwrap());

        let inserted = uow
            .in_transaction(|tx| {
                Box::pin(async move {
                    assert!(tx.is_transactional());
                    assert_eq!(tx.scope().binding(FilterKind::Tenant), Some(tenant));
                    tx.insert::<tenant_doc::Entity>(doc(tenant, "in tx")).await
                })
            })
            .await
            .unwrap();

        let found = uow
            .find_by_id::<tenant_doc::Entity>(inserted.id)
            .unwrap()
            .one(&uow)
            .await
            .unwrap();
        assert_eq!(found, Some(inserted));
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let db = setup(UnscopedPolicy::FailClosed).await;
        let tenant = Uuid::new_v4();
        let mut uow = db.unit_of_work();
        uow.enable_tenant(TenantId::new(tenant).unwrap());

        let res: Result<(), TxError<ScopeError>> = uow
            .in_transaction(|tx| {
                Box::pin(async move {
                    tx.insert::<tenant_doc::Entity>(doc(tenant, "discarded")).await?;
                    Err(ScopeError::Invalid("abort"))
                })
            })
            .await;
        assert!(matches!(res, Err(TxError::Domain(ScopeError::Invalid("abort")))));

        let count = uow
            .find::<tenant_doc::Entity>()
            .unwrap()
            .count(&uow)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_with_scope_denies_foreign_row() {
        let db = setup(UnscopedPolicy::FailClosed).await;
        let owner = Uuid::new_v4();

        let mut owner_uow = db.unit_of_work();
        owner_uow.enable_tenant(TenantId::new(owner).unwrap());
        let row = owner_uow
            .insert::<tenant_doc::Entity>(doc(owner, "mine"))
            .await
            .unwrap();

        let mut other = db.unit_of_work();
        other.enable_tenant(TenantId::new(Uuid::new_v4()).unwrap());
        let mut am = doc(owner, "stolen");
        am.id = Set(row.id);
        let err = other
            .update_with_scope::<tenant_doc::Entity>(row.id, am)
            .await
            .unwrap_err();
        assert!(err.is_denied());

        let mut am = doc(owner, "renamed");
        am.id = Set(row.id);
        let updated = owner_uow
            .update_with_scope::<tenant_doc::Entity>(row.id, am)
            .await
            .unwrap();
        assert_eq!(updated.title, "renamed");
    }

    #[tokio::test]
    async fn delete_by_id_ignores_rows_outside_scope() {
        let db = setup(UnscopedPolicy::FailClosed).await;
        let tenant = Uuid::new_v4();
        let org = Uuid::new_v4();

        let mut uow = db.unit_of_work();
        uow.enable_tenant(TenantId::new(tenant).unwrap());
        uow.enable_organization(OrganizationId::new(org).unwrap());
        let row = uow
            .insert::<note::Entity>(note::ActiveModel {
                id: Set(Uuid::new_v4()),
                body: Set("hello".to_owned()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(row.organization_id, org);

        let mut other_org = db.unit_of_work();
        other_org.enable_tenant(TenantId::new(tenant).unwrap());
        other_org.enable_organization(OrganizationId::new(Uuid::new_v4()).unwrap());
        assert!(!other_org.delete_by_id::<note::Entity>(row.id).await.unwrap());

        assert!(uow.delete_by_id::<note::Entity>(row.id).await.unwrap());
    }
}
