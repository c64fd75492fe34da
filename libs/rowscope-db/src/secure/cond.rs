use rowscope_security::{FilterKind, FilterScope, FilterState};
use sea_orm::{ColumnTrait, Condition, EntityTrait};

use crate::secure::error::ScopeError;
use crate::secure::policy::UnscopedPolicy;
use crate::secure::ScopableEntity;

/// Builds the predicate every query against `E` must carry.
///
/// # Policy Rules
/// For each filter `E` is subject to (non-`None` column):
/// 1. **Enabled(id)** → `column = id`
/// 2. **Disabled** → no predicate
/// 3. **Unbound** → `MissingScope` under [`UnscopedPolicy::FailClosed`],
///    no predicate (with a warning) under [`UnscopedPolicy::Permissive`]
///
/// Filters `E` is not subject to are ignored, and unrestricted entities get an
/// empty (always true) condition. Enabled filters are ANDed together.
///
/// # Errors
/// Returns `ScopeError::MissingScope` when a required filter is unbound and
/// the policy fails closed.
pub fn build_scope_condition<E>(
    scope: &FilterScope,
    policy: UnscopedPolicy,
) -> Result<Condition, ScopeError>
where
    E: ScopableEntity + EntityTrait,
{
    let mut cond = Condition::all();

    for kind in FilterKind::ALL {
        let Some(col) = E::filter_col(kind) else {
            continue;
        };

        match scope.state(kind) {
            FilterState::Enabled(id) => {
                cond = cond.add(col.eq(id));
            }
            FilterState::Disabled => {}
            FilterState::Unbound => check_unbound::<E>(kind, policy)?,
        }
    }

    Ok(cond)
}

/// Applies the unscoped policy to a filter that was never enabled.
///
/// # Errors
/// Returns `ScopeError::MissingScope` under [`UnscopedPolicy::FailClosed`].
pub(crate) fn check_unbound<E>(kind: FilterKind, policy: UnscopedPolicy) -> Result<(), ScopeError>
where
    E: ScopableEntity + EntityTrait,
{
    match policy {
        UnscopedPolicy::FailClosed => Err(ScopeError::MissingScope {
            filter: kind.name(),
            entity: E::entity_label(),
        }),
        UnscopedPolicy::Permissive => {
            tracing::warn!(
                filter = kind.name(),
                entity = %E::entity_label(),
                "running unscoped query: filter not enabled"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::secure::tests::{note, plan, tenant_doc};
    use rowscope_security::{OrganizationId, TenantId};
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};
    use uuid::Uuid;

    fn sql<E: EntityTrait>(cond: Condition) -> String {
        E::find().filter(cond).build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn enabled_tenant_filter_adds_equality() {
        let tenant = Uuid::new_v4();
        let scope = FilterScope::for_tenant(TenantId::new(tenant).unwrap());

        let cond =
            build_scope_condition::<tenant_doc::Entity>(&scope, UnscopedPolicy::FailClosed)
                .unwrap();
        let sql = sql::<tenant_doc::Entity>(cond);
        assert!(
            sql.contains(&format!("\"tenant_docs\".\"tenant_id\" = '{tenant}'")),
            "unexpected sql: {sql}"
        );
    }

    #[test]
    fn unbound_filter_fails_closed() {
        let err = build_scope_condition::<tenant_doc::Entity>(
            &FilterScope::new(),
            UnscopedPolicy::FailClosed,
        )
        .unwrap_err();
        match err {
            ScopeError::MissingScope { filter, entity } => {
                assert_eq!(filter, "tenantFilter");
                assert_eq!(entity, "tenant_docs");
            }
            other => panic!("expected MissingScope, got {other}"),
        }
    }

    #[test]
    fn unbound_filter_is_skipped_when_permissive() {
        let cond = build_scope_condition::<tenant_doc::Entity>(
            &FilterScope::new(),
            UnscopedPolicy::Permissive,
        )
        .unwrap();
        assert!(cond.is_empty());
    }

    #[test]
    fn disabled_filter_adds_nothing() {
        let mut scope = FilterScope::new();
        scope.disable_kind(FilterKind::Tenant);
        let cond =
            build_scope_condition::<tenant_doc::Entity>(&scope, UnscopedPolicy::FailClosed)
                .unwrap();
        assert!(cond.is_empty());
    }

    #[test]
    fn both_filters_are_anded() {
        let tenant = Uuid::new_v4();
        let org = Uuid::new_v4();
        let scope = FilterScope::new()
            .with_tenant(TenantId::new(tenant).unwrap())
            .with_organization(OrganizationId::new(org).unwrap());

        let cond =
            build_scope_condition::<note::Entity>(&scope, UnscopedPolicy::FailClosed).unwrap();
        let sql = sql::<note::Entity>(cond);
        assert!(sql.contains(&format!("\"notes\".\"tenant_id\" = '{tenant}'")), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
        assert!(
            sql.contains(&format!("\"notes\".\"organization_id\" = '{org}'")),
            "{sql}"
        );
    }

    #[test]
    fn organization_filter_ignored_for_tenant_only_entity() {
        let scope = FilterScope::for_tenant(TenantId::new(Uuid::new_v4()).unwrap());
        // organization filter is unbound but tenant_docs has no organization column
        assert!(
            build_scope_condition::<tenant_doc::Entity>(&scope, UnscopedPolicy::FailClosed)
                .is_ok()
        );
    }

    #[test]
    fn unrestricted_entity_needs_no_scope() {
        let cond =
            build_scope_condition::<plan::Entity>(&FilterScope::new(), UnscopedPolicy::FailClosed)
                .unwrap();
        assert!(cond.is_empty());
    }
}
