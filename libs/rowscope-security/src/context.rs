use uuid::Uuid;

use crate::constants::ROOT_SUBJECT_ID;

/// `SecurityContext` carries the authenticated identity of a request.
///
/// It is produced by the authentication collaborator and turned into a
/// [`FilterScope`](crate::FilterScope) at the start of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    subject_id: Uuid,
    tenant_id: Uuid,
    organization_id: Option<Uuid>,
}

impl SecurityContext {
    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext` with no tenant and no subject
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    /// Context for system-level work that spans all tenants.
    #[must_use]
    pub fn root() -> Self {
        Self::builder().subject_id(ROOT_SUBJECT_ID).build()
    }

    #[must_use]
    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    /// Tenant the subject acts in. Nil when unauthenticated.
    #[must_use]
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    #[must_use]
    pub fn organization_id(&self) -> Option<Uuid> {
        self.organization_id
    }

    /// The organization the request acts for, falling back to the tenant
    /// when no organization was selected.
    #[must_use]
    pub fn effective_organization_id(&self) -> Uuid {
        self.organization_id.unwrap_or(self.tenant_id)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.subject_id == ROOT_SUBJECT_ID
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.subject_id.is_nil()
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    subject_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
    organization_id: Option<Uuid>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn subject_id(mut self, subject_id: Uuid) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    #[must_use]
    pub fn tenant_id(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    #[must_use]
    pub fn organization_id(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            subject_id: self.subject_id.unwrap_or_default(),
            tenant_id: self.tenant_id.unwrap_or_default(),
            organization_id: self.organization_id.filter(|id| !id.is_nil()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn builder_full() {
        let tenant_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let subject_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();
        let org_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap();

        let ctx = SecurityContext::builder()
            .subject_id(subject_id)
            .tenant_id(tenant_id)
            .organization_id(org_id)
            .build();

        assert_eq!(ctx.subject_id(), subject_id);
        assert_eq!(ctx.tenant_id(), tenant_id);
        assert_eq!(ctx.organization_id(), Some(org_id));
        assert_eq!(ctx.effective_organization_id(), org_id);
        assert!(!ctx.is_root());
        assert!(!ctx.is_anonymous());
    }

    #[test]
    fn effective_organization_falls_back_to_tenant() {
        let tenant_id = Uuid::new_v4();
        let ctx = SecurityContext::builder()
            .subject_id(Uuid::new_v4())
            .tenant_id(tenant_id)
            .build();
        assert_eq!(ctx.organization_id(), None);
        assert_eq!(ctx.effective_organization_id(), tenant_id);
    }

    #[test]
    fn nil_organization_is_dropped() {
        let ctx = SecurityContext::builder()
            .tenant_id(Uuid::new_v4())
            .organization_id(Uuid::nil())
            .build();
        assert_eq!(ctx.organization_id(), None);
    }

    #[test]
    fn anonymous_and_root() {
        let anon = SecurityContext::anonymous();
        assert!(anon.is_anonymous());
        assert!(anon.tenant_id().is_nil());

        let root = SecurityContext::root();
        assert!(root.is_root());
        assert_eq!(root.subject_id(), ROOT_SUBJECT_ID);
    }

    #[test]
    fn serde_roundtrip_keeps_organization() {
        let ctx = SecurityContext::builder()
            .subject_id(Uuid::new_v4())
            .tenant_id(Uuid::new_v4())
            .organization_id(Uuid::new_v4())
            .build();
        let json = serde_json::to_string(&ctx).unwrap();
        let back: SecurityContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
