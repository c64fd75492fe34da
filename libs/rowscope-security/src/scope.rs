use uuid::Uuid;

use crate::context::SecurityContext;
use crate::error::ScopeParamError;
use crate::filter::{FilterDef, FilterKind};
use crate::ids::{OrganizationId, TenantId};

/// Binding state of a single filter within a unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FilterState {
    /// Never enabled in this unit of work.
    #[default]
    Unbound,
    /// Rows must match the bound identifier.
    Enabled(Uuid),
    /// Explicitly switched off; no predicate is applied.
    Disabled,
}

impl FilterState {
    #[inline]
    #[must_use]
    pub fn binding(self) -> Option<Uuid> {
        match self {
            FilterState::Enabled(id) => Some(id),
            FilterState::Unbound | FilterState::Disabled => None,
        }
    }
}

/// Filter bindings for one unit of work (a request or a transaction).
///
/// The default scope has every filter [`FilterState::Unbound`]. Scopes are
/// plain values: they are never shared between units of work and never
/// persisted.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawFilterScope")]
pub struct FilterScope {
    tenant: FilterState,
    organization: FilterState,
}

/// Unchecked wire form of [`FilterScope`]; enabled bindings are validated
/// before a scope is built from it.
#[derive(serde::Deserialize)]
struct RawFilterScope {
    #[serde(default)]
    tenant: FilterState,
    #[serde(default)]
    organization: FilterState,
}

impl TryFrom<RawFilterScope> for FilterScope {
    type Error = ScopeParamError;

    fn try_from(raw: RawFilterScope) -> Result<Self, Self::Error> {
        let mut scope = Self::new();
        for (kind, state) in [
            (FilterKind::Tenant, raw.tenant),
            (FilterKind::Organization, raw.organization),
        ] {
            match state {
                FilterState::Enabled(id) => scope.enable_kind(kind, id)?,
                FilterState::Disabled => scope.disable_kind(kind),
                FilterState::Unbound => {}
            }
        }
        Ok(scope)
    }
}

impl FilterScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope for system-level work: every filter is disabled.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            tenant: FilterState::Disabled,
            organization: FilterState::Disabled,
        }
    }

    /// Scope with only the tenant filter enabled.
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self::new().with_tenant(tenant_id)
    }

    /// Builds the scope an authenticated request runs under.
    ///
    /// The root subject gets [`FilterScope::unrestricted`]. Everyone else gets
    /// the tenant filter enabled and, when the context carries one, the
    /// organization filter as well.
    ///
    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` if the context has no tenant.
    pub fn from_context(ctx: &SecurityContext) -> Result<Self, ScopeParamError> {
        if ctx.is_root() {
            return Ok(Self::unrestricted());
        }

        let mut scope = Self::new();
        scope.enable_kind(FilterKind::Tenant, ctx.tenant_id())?;
        if let Some(org) = ctx.organization_id() {
            scope.enable_kind(FilterKind::Organization, org)?;
        }
        Ok(scope)
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.enable_tenant(tenant_id);
        self
    }

    #[must_use]
    pub fn with_organization(mut self, organization_id: OrganizationId) -> Self {
        self.enable_organization(organization_id);
        self
    }

    /// Activates `filter_name`, binding `value` to `parameter_name`.
    ///
    /// Everything is validated before the scope is touched, so a failed call
    /// leaves the previous binding in place.
    ///
    /// # Errors
    /// - `ScopeParamError::UnknownFilter` if no filter has this name
    /// - `ScopeParamError::InvalidParameter` if the parameter name does not
    ///   belong to the filter or the value is missing or malformed
    pub fn enable(
        &mut self,
        filter_name: &str,
        parameter_name: &str,
        value: &str,
    ) -> Result<(), ScopeParamError> {
        let def = Self::lookup(filter_name)?;
        def.check_param(parameter_name)?;
        let id = def.parse_value(value)?;
        *self.slot_mut(def.kind) = FilterState::Enabled(id);
        Ok(())
    }

    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` for the nil UUID.
    pub fn enable_kind(&mut self, kind: FilterKind, id: Uuid) -> Result<(), ScopeParamError> {
        let id = kind.def().check_value(id)?;
        *self.slot_mut(kind) = FilterState::Enabled(id);
        Ok(())
    }

    pub fn enable_tenant(&mut self, tenant_id: TenantId) {
        self.tenant = FilterState::Enabled(tenant_id.as_uuid());
    }

    pub fn enable_organization(&mut self, organization_id: OrganizationId) {
        self.organization = FilterState::Enabled(organization_id.as_uuid());
    }

    /// Switches `filter_name` off for the rest of the unit of work.
    ///
    /// # Errors
    /// Returns `ScopeParamError::UnknownFilter` if no filter has this name.
    pub fn disable(&mut self, filter_name: &str) -> Result<(), ScopeParamError> {
        let def = Self::lookup(filter_name)?;
        self.disable_kind(def.kind);
        Ok(())
    }

    pub fn disable_kind(&mut self, kind: FilterKind) {
        *self.slot_mut(kind) = FilterState::Disabled;
    }

    #[inline]
    #[must_use]
    pub fn state(&self, kind: FilterKind) -> FilterState {
        match kind {
            FilterKind::Tenant => self.tenant,
            FilterKind::Organization => self.organization,
        }
    }

    #[inline]
    #[must_use]
    pub fn binding(&self, kind: FilterKind) -> Option<Uuid> {
        self.state(kind).binding()
    }

    #[must_use]
    pub fn is_enabled(&self, kind: FilterKind) -> bool {
        matches!(self.state(kind), FilterState::Enabled(_))
    }

    #[must_use]
    pub fn is_disabled(&self, kind: FilterKind) -> bool {
        self.state(kind) == FilterState::Disabled
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant.binding().and_then(|id| TenantId::new(id).ok())
    }

    #[must_use]
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.organization
            .binding()
            .and_then(|id| OrganizationId::new(id).ok())
    }

    /// Every filter definition with its current state, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = (&'static FilterDef, FilterState)> + '_ {
        FilterKind::ALL
            .into_iter()
            .map(|kind| (kind.def(), self.state(kind)))
    }

    fn lookup(filter_name: &str) -> Result<&'static FilterDef, ScopeParamError> {
        FilterKind::from_name(filter_name)
            .map(FilterKind::def)
            .ok_or_else(|| ScopeParamError::UnknownFilter(filter_name.to_owned()))
    }

    fn slot_mut(&mut self, kind: FilterKind) -> &mut FilterState {
        match kind {
            FilterKind::Tenant => &mut self.tenant,
            FilterKind::Organization => &mut self.organization,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_scope_is_unbound() {
        let scope = FilterScope::new();
        for (_, state) in scope.states() {
            assert_eq!(state, FilterState::Unbound);
        }
    }

    #[test]
    fn enable_binds_value() {
        let id = Uuid::new_v4();
        let mut scope = FilterScope::new();
        scope
            .enable("tenantFilter", "tenantId", &id.to_string())
            .unwrap();
        assert_eq!(scope.state(FilterKind::Tenant), FilterState::Enabled(id));
        assert_eq!(scope.tenant_id().map(|t| t.as_uuid()), Some(id));
        assert_eq!(scope.state(FilterKind::Organization), FilterState::Unbound);
    }

    #[test]
    fn failed_enable_keeps_previous_binding() {
        let id = Uuid::new_v4();
        let mut scope = FilterScope::new();
        scope.enable_kind(FilterKind::Tenant, id).unwrap();
        let before = scope.clone();

        assert!(
            scope
                .enable("tenantFilter", "tenantId", "garbage")
                .unwrap_err()
                .is_invalid_parameter()
        );
        assert!(
            scope
                .enable("tenantFilter", "organizationId", &Uuid::new_v4().to_string())
                .unwrap_err()
                .is_invalid_parameter()
        );
        assert_eq!(
            scope.enable("regionFilter", "regionId", &Uuid::new_v4().to_string()),
            Err(ScopeParamError::UnknownFilter("regionFilter".to_owned()))
        );
        assert!(scope.enable_kind(FilterKind::Tenant, Uuid::nil()).is_err());

        assert_eq!(scope, before);
    }

    #[test]
    fn disable_overrides_binding() {
        let mut scope = FilterScope::for_tenant(TenantId::new(Uuid::new_v4()).unwrap());
        scope.disable("tenantFilter").unwrap();
        assert!(scope.is_disabled(FilterKind::Tenant));
        assert_eq!(scope.binding(FilterKind::Tenant), None);
        assert!(scope.disable("nope").is_err());
    }

    #[test]
    fn from_context_enables_tenant_and_organization() {
        let tenant = Uuid::new_v4();
        let org = Uuid::new_v4();
        let ctx = SecurityContext::builder()
            .subject_id(Uuid::new_v4())
            .tenant_id(tenant)
            .organization_id(org)
            .build();

        let scope = FilterScope::from_context(&ctx).unwrap();
        assert_eq!(scope.binding(FilterKind::Tenant), Some(tenant));
        assert_eq!(scope.binding(FilterKind::Organization), Some(org));
    }

    #[test]
    fn from_context_without_tenant_is_rejected() {
        let ctx = SecurityContext::anonymous();
        let err = FilterScope::from_context(&ctx).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn root_context_is_unrestricted() {
        let scope = FilterScope::from_context(&SecurityContext::root()).unwrap();
        assert_eq!(scope, FilterScope::unrestricted());
    }

    #[test]
    fn serializes_states() {
        let id = Uuid::new_v4();
        let mut scope = FilterScope::new();
        scope.enable_kind(FilterKind::Tenant, id).unwrap();
        scope.disable_kind(FilterKind::Organization);

        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tenant": { "state": "enabled", "value": id.to_string() },
                "organization": { "state": "disabled" },
            })
        );
    }

    #[test]
    fn deserialize_round_trips_valid_scope() {
        let id = Uuid::new_v4();
        let scope: FilterScope = serde_json::from_value(serde_json::json!({
            "tenant": { "state": "enabled", "value": id.to_string() },
            "organization": { "state": "disabled" },
        }))
        .unwrap();
        assert_eq!(scope.binding(FilterKind::Tenant), Some(id));
        assert!(scope.is_disabled(FilterKind::Organization));
    }

    #[test]
    fn deserialize_rejects_nil_binding() {
        let err = serde_json::from_value::<FilterScope>(serde_json::json!({
            "tenant": { "state": "enabled", "value": Uuid::nil().to_string() },
            "organization": { "state": "unbound" },
        }))
        .unwrap_err();
        assert!(err.to_string().contains("tenantFilter"), "{err}");
    }
}
