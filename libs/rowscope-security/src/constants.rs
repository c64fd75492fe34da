use uuid::Uuid;
use uuid::uuid;

/// Subject used for system-level work that runs outside any tenant.
pub const ROOT_SUBJECT_ID: Uuid = uuid!("11111111-6a88-4768-9dfc-6bcd5187d9ed");

pub const TENANT_FILTER_NAME: &str = "tenantFilter";
pub const TENANT_PARAM_NAME: &str = "tenantId";

pub const ORGANIZATION_FILTER_NAME: &str = "organizationFilter";
pub const ORGANIZATION_PARAM_NAME: &str = "organizationId";
