/// What happens when a filtered entity is touched while one of its filters is
/// still unbound.
///
/// An explicitly disabled filter is never affected by this policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscopedPolicy {
    /// Refuse with `ScopeError::MissingScope`.
    #[default]
    FailClosed,
    /// Run without the predicate and log a warning.
    Permissive,
}
