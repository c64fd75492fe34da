#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Row scoping primitives shared by every data-access layer.
//!
//! Two named filters exist, `tenantFilter` (parameter `tenantId`) and
//! `organizationFilter` (parameter `organizationId`). A [`FilterScope`] holds
//! the bindings for one unit of work; it is a plain value that callers pass
//! explicitly to the secure query layer.
//!
//! ```rust
//! use rowscope_security::{FilterScope, FilterState, FilterKind};
//!
//! let mut scope = FilterScope::new();
//! scope
//!     .enable("tenantFilter", "tenantId", "7b4c2f8e-96a1-4d8b-9d6e-2a1f0c3b5e77")
//!     .unwrap();
//! assert!(scope.is_enabled(FilterKind::Tenant));
//!
//! // A malformed identifier is rejected and leaves the scope untouched.
//! assert!(scope.enable("organizationFilter", "organizationId", "nope").is_err());
//! assert_eq!(scope.state(FilterKind::Organization), FilterState::Unbound);
//! ```
pub mod constants;
pub mod context;
pub mod error;
pub mod filter;
pub mod ids;
pub mod prelude;
pub mod scope;

pub use constants::ROOT_SUBJECT_ID;
pub use context::{SecurityContext, SecurityContextBuilder};
pub use error::ScopeParamError;
pub use filter::{FILTER_DEFS, FilterDef, FilterKind, ORGANIZATION_FILTER, TENANT_FILTER};
pub use ids::{OrganizationId, TenantId};
pub use scope::{FilterScope, FilterState};
