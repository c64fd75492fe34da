pub use crate::{
    FilterKind, FilterScope, FilterState, OrganizationId, ScopeParamError, SecurityContext,
    TenantId,
};
