use uuid::Uuid;

use crate::constants::{
    ORGANIZATION_FILTER_NAME, ORGANIZATION_PARAM_NAME, TENANT_FILTER_NAME, TENANT_PARAM_NAME,
};
use crate::error::ScopeParamError;

/// The scoping dimensions a row can be filtered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Tenant,
    Organization,
}

impl FilterKind {
    pub const ALL: [FilterKind; 2] = [FilterKind::Tenant, FilterKind::Organization];

    #[must_use]
    pub const fn def(self) -> &'static FilterDef {
        match self {
            FilterKind::Tenant => &TENANT_FILTER,
            FilterKind::Organization => &ORGANIZATION_FILTER,
        }
    }

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.def().name
    }

    #[inline]
    #[must_use]
    pub const fn param(self) -> &'static str {
        self.def().param
    }

    /// Looks a filter up by its declared name (`tenantFilter`, `organizationFilter`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of a named row filter and the single UUID parameter it binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterDef {
    pub kind: FilterKind,
    pub name: &'static str,
    pub param: &'static str,
}

pub const TENANT_FILTER: FilterDef = FilterDef {
    kind: FilterKind::Tenant,
    name: TENANT_FILTER_NAME,
    param: TENANT_PARAM_NAME,
};

pub const ORGANIZATION_FILTER: FilterDef = FilterDef {
    kind: FilterKind::Organization,
    name: ORGANIZATION_FILTER_NAME,
    param: ORGANIZATION_PARAM_NAME,
};

pub const FILTER_DEFS: [FilterDef; 2] = [TENANT_FILTER, ORGANIZATION_FILTER];

impl FilterDef {
    /// Checks that `parameter` is the one this filter declares.
    ///
    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` on a name mismatch.
    pub fn check_param(&self, parameter: &str) -> Result<(), ScopeParamError> {
        if parameter == self.param {
            Ok(())
        } else {
            Err(ScopeParamError::invalid(
                self.name,
                parameter,
                format!("filter declares parameter '{}'", self.param),
            ))
        }
    }

    /// Parses a raw identifier for this filter's parameter.
    ///
    /// Blank input and the nil UUID count as a missing identifier.
    ///
    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` for missing or malformed values.
    pub fn parse_value(&self, raw: &str) -> Result<Uuid, ScopeParamError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScopeParamError::invalid(
                self.name,
                self.param,
                "identifier is missing",
            ));
        }
        let id = Uuid::parse_str(trimmed).map_err(|e| {
            ScopeParamError::invalid(self.name, self.param, format!("malformed identifier: {e}"))
        })?;
        self.check_value(id)
    }

    /// # Errors
    /// Returns `ScopeParamError::InvalidParameter` for the nil UUID.
    pub fn check_value(&self, id: Uuid) -> Result<Uuid, ScopeParamError> {
        if id.is_nil() {
            Err(ScopeParamError::invalid(
                self.name,
                self.param,
                "identifier is missing",
            ))
        } else {
            Ok(id)
        }
    }
}
