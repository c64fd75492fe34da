//! Secure ORM layer for tenant/organization scoped database access.
//!
//! Every query against a filtered entity carries the predicates of the
//! filters enabled in the current unit of work. The typestate wrappers make
//! it impossible to execute a query that was never scoped.
//!
//! # Basic Example
//!
//! Binding filters for a unit of work:
//!
//! ```rust
//! use rowscope_db::secure::{FilterKind, FilterScope, FilterState};
//!
//! let mut scope = FilterScope::new();
//! scope
//!     .enable("tenantFilter", "tenantId", "2f0c1e9a-1b7d-4d0e-8a55-0e4b1d2c3a4f")
//!     .unwrap();
//! assert!(scope.is_enabled(FilterKind::Tenant));
//!
//! // organizationFilter was never touched
//! assert_eq!(scope.state(FilterKind::Organization), FilterState::Unbound);
//!
//! scope.disable("tenantFilter").unwrap();
//! assert!(scope.is_disabled(FilterKind::Tenant));
//! ```
//!
//! # Quick Start with `SeaORM`
//!
//! ```rust,ignore
//! use rowscope_db::secure::{Scopable, SecureConn};
//! use sea_orm::entity::prelude::*;
//!
//! // 1. Declare which filters the entity is subject to
//! #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Scopable)]
//! #[sea_orm(table_name = "members")]
//! #[secure(tenant_col = "tenant_id", organization_col = "organization_id", resource_col = "id")]
//! pub struct Model {
//!     #[sea_orm(primary_key, auto_increment = false)]
//!     pub id: Uuid,
//!     pub tenant_id: Uuid,
//!     pub organization_id: Uuid,
//!     pub email: String,
//! }
//!
//! // 2. Open a unit of work and bind the filters
//! let mut uow = db.unit_of_work();
//! uow.enable_tenant(tenant_id);
//! uow.enable_organization(organization_id);
//!
//! // 3. Execute scoped queries
//! let members = uow.find::<Entity>()?.all(&uow).await?;
//! ```
//!
//! # Policy
//!
//! | Filter state | Behavior |
//! |-------|----------|
//! | Enabled(id) | `column = id` |
//! | Disabled | no predicate |
//! | Unbound, fail-closed | `ScopeError::MissingScope` |
//! | Unbound, permissive | no predicate, warning logged |
//!
//! Enabled filters are ANDed together. Unrestricted entities never get a
//! predicate.

mod cond;
mod db_ops;
mod entity_traits;
mod error;
mod policy;
mod runner;
mod secure_conn;
mod select;
mod tx_config;
mod tx_error;
mod unit_of_work;

// Core types
pub use entity_traits::ScopableEntity;
pub use error::ScopeError;
pub use policy::UnscopedPolicy;

// Filter bindings from rowscope-security
pub use rowscope_security::{
    FilterKind, FilterScope, FilterState, OrganizationId, ScopeParamError, SecurityContext,
    TenantId,
};

// Condition building
pub use cond::build_scope_condition;

// Execution targets
pub use runner::DbRunner;
pub use secure_conn::SecureConn;
pub use unit_of_work::UnitOfWork;

// Select operations
pub use select::{Scoped, SecureEntityExt, SecureSelect, Unscoped};

// Insert / update / delete operations
pub use db_ops::{
    SecureDeleteExt, SecureDeleteMany, SecureUpdateExt, SecureUpdateMany,
    apply_scope_to_active_model, check_scope_on_update, secure_insert,
};

// Transactions
pub use tx_config::{TxAccessMode, TxConfig, TxIsolationLevel};
pub use tx_error::{InfraError, TxError};

pub use rowscope_db_macros::Scopable;
