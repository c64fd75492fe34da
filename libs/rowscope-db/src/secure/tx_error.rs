//! Errors returned by [`UnitOfWork::in_transaction`](crate::secure::UnitOfWork::in_transaction).

/// Database-level failure while starting, committing or rolling back.
///
/// Carries the message only, so callers never see `SeaORM` error types.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct InfraError {
    message: String,
}

impl InfraError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a failed transaction: either the callback's own error or an
/// infrastructure failure around it.
///
/// ```ignore
/// let member = uow
///     .in_transaction(|tx| Box::pin(async move { tx.insert::<member::Entity>(am).await }))
///     .await
///     .map_err(|e| e.into_domain(|infra| ScopeError::Db(DbErr::Custom(infra.to_string()))))?;
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum TxError<E> {
    #[error("{0}")]
    Domain(E),
    #[error("infrastructure error: {0}")]
    Infra(InfraError),
}

impl<E> TxError<E> {
    /// Collapse into the domain error, mapping infrastructure failures with `map_infra`.
    pub fn into_domain<F>(self, map_infra: F) -> E
    where
        F: FnOnce(InfraError) -> E,
    {
        match self {
            TxError::Domain(e) => e,
            TxError::Infra(infra) => map_infra(infra),
        }
    }

    #[must_use]
    pub fn is_infra(&self) -> bool {
        matches!(self, TxError::Infra(_))
    }
}
