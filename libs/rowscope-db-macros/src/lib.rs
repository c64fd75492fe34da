//! # rowscope-db-macros
//!
//! Procedural macros for the `rowscope-db` secure ORM layer.
//!
//! ## `#[derive(Scopable)]`
//!
//! Implements `ScopableEntity` for a `SeaORM` entity, declaring which row
//! filters (`tenantFilter`, `organizationFilter`) it is subject to.
//!
//! **IMPORTANT**: every dimension must be decided explicitly. There are no
//! implicit defaults.
//!
//! ### Example
//!
//! ```ignore
//! use sea_orm::entity::prelude::*;
//! use rowscope_db::secure::Scopable;
//!
//! #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Scopable)]
//! #[sea_orm(table_name = "members")]
//! #[secure(
//!     tenant_col = "tenant_id",
//!     organization_col = "organization_id",
//!     resource_col = "id"
//! )]
//! pub struct Model {
//!     #[sea_orm(primary_key, auto_increment = false)]
//!     pub id: Uuid,
//!     pub tenant_id: Uuid,
//!     pub organization_id: Uuid,
//!     pub email: String,
//! }
//! ```
//!
//! ### Attributes
//!
//! - **Tenant**: `tenant_col = "column_name"` OR `no_tenant`
//! - **Organization**: `organization_col = "column_name"` OR `no_organization`
//! - **Resource**: `resource_col = "column_name"` OR `no_resource`
//! - **Unrestricted**: `unrestricted` (forbids all other attributes)

use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;
use syn::{DeriveInput, parse_macro_input};

mod scopable;

/// Derive macro for implementing `ScopableEntity`.
///
/// Place this on the `SeaORM` `Model` struct together with `#[secure(...)]`.
///
/// # Global Entities
///
/// Lookup tables and platform data that no filter applies to:
///
/// ```ignore
/// #[derive(DeriveEntityModel, Scopable)]
/// #[sea_orm(table_name = "membership_plans")]
/// #[secure(unrestricted)]
/// pub struct Model {
///     #[sea_orm(primary_key, auto_increment = false)]
///     pub id: Uuid,
///     pub name: String,
/// }
/// ```
#[proc_macro_derive(Scopable, attributes(secure))]
#[proc_macro_error]
pub fn derive_scopable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    scopable::expand_derive_scopable(&input).into()
}
