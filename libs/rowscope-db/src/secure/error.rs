use rowscope_security::ScopeParamError;

/// Errors that can occur during scoped query execution.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// Database error occurred during query execution.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// A filter parameter could not be bound.
    #[error(transparent)]
    Param(#[from] ScopeParamError),

    /// The entity is subject to a filter that was never enabled in this unit of work.
    #[error("filter '{filter}' is not enabled for entity '{entity}'")]
    MissingScope {
        filter: &'static str,
        entity: String,
    },

    /// Invalid scope configuration.
    #[error("invalid scope: {0}")]
    Invalid(&'static str),

    /// Operation denied - entity not accessible in current security scope.
    #[error("access denied: {0}")]
    Denied(&'static str),
}

impl ScopeError {
    #[must_use]
    pub fn is_missing_scope(&self) -> bool {
        matches!(self, Self::MissingScope { .. })
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}
