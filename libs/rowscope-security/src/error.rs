/// Errors raised while binding filter parameters.
///
/// A failing bind never mutates the scope it was attempted on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeParamError {
    /// No filter with this name is defined.
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    /// The supplied parameter name or value is not acceptable for the filter.
    #[error("invalid parameter '{parameter}' for filter '{filter}': {reason}")]
    InvalidParameter {
        filter: &'static str,
        parameter: String,
        reason: String,
    },
}

impl ScopeParamError {
    pub(crate) fn invalid(
        filter: &'static str,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            filter,
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}
