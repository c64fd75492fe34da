use rowscope_security::FilterKind;
use sea_orm::EntityTrait;

/// Declares which row filters an entity is subject to.
///
/// Each entity implementing this trait names the column bound by every
/// filter, or `None` when the filter does not apply:
/// - `tenant_col()`: column matched by `tenantFilter`
/// - `organization_col()`: column matched by `organizationFilter`
/// - `resource_col()`: primary identifier used by `find_by_id` / `delete_by_id`
///
/// **Important**: there are no implicit defaults. Every dimension is spelled
/// out so that forgetting a filter is a compile error, not a data leak.
///
/// # Example (Manual Implementation)
/// ```rust,ignore
/// impl ScopableEntity for gym_class::Entity {
///     fn tenant_col() -> Option<Self::Column> {
///         Some(gym_class::Column::TenantId)
///     }
///     fn organization_col() -> Option<Self::Column> {
///         None
///     }
///     fn resource_col() -> Option<Self::Column> {
///         Some(gym_class::Column::Id)
///     }
/// }
/// ```
///
/// # Example (Using Derive Macro)
/// ```rust,ignore
/// use rowscope_db::secure::Scopable;
///
/// #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Scopable)]
/// #[sea_orm(table_name = "gym_classes")]
/// #[secure(tenant_col = "tenant_id", no_organization, resource_col = "id")]
/// pub struct Model {
///     #[sea_orm(primary_key, auto_increment = false)]
///     pub id: Uuid,
///     pub tenant_id: Uuid,
///     pub name: String,
/// }
/// ```
///
/// # Unrestricted Entities
/// ```rust,ignore
/// #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Scopable)]
/// #[sea_orm(table_name = "plans")]
/// #[secure(unrestricted)]
/// pub struct Model {
///     #[sea_orm(primary_key, auto_increment = false)]
///     pub id: Uuid,
///     pub name: String,
/// }
/// ```
pub trait ScopableEntity: EntityTrait {
    /// Marks global entities (lookup tables, platform data) that no filter
    /// applies to. When `true`, every column method returns `None`.
    const IS_UNRESTRICTED: bool = false;

    /// Column matched against the `tenantId` parameter.
    fn tenant_col() -> Option<Self::Column>;

    /// Column matched against the `organizationId` parameter.
    fn organization_col() -> Option<Self::Column>;

    /// Primary identifier column, typically `Column::Id`.
    fn resource_col() -> Option<Self::Column>;

    /// Column bound by the given filter, if the entity is subject to it.
    #[must_use]
    fn filter_col(kind: FilterKind) -> Option<Self::Column> {
        if Self::IS_UNRESTRICTED {
            return None;
        }
        match kind {
            FilterKind::Tenant => Self::tenant_col(),
            FilterKind::Organization => Self::organization_col(),
        }
    }

    /// Table name used in diagnostics.
    #[must_use]
    fn entity_label() -> String {
        sea_orm::EntityName::table_name(&Self::default()).to_owned()
    }
}
