use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::ScopeParamError;
use crate::filter::{FilterDef, ORGANIZATION_FILTER, TENANT_FILTER};

macro_rules! scope_id {
    ($(#[$meta:meta])* $name:ident, $def:expr) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "Uuid", into = "Uuid")]
        pub struct $name(Uuid);

        impl $name {
            const DEF: &'static FilterDef = &$def;

            /// # Errors
            /// Returns `ScopeParamError::InvalidParameter` for the nil UUID.
            pub fn new(id: Uuid) -> Result<Self, ScopeParamError> {
                Self::DEF.check_value(id).map(Self)
            }

            /// # Errors
            /// Returns `ScopeParamError::InvalidParameter` for blank, nil or malformed input.
            pub fn parse(raw: &str) -> Result<Self, ScopeParamError> {
                Self::DEF.parse_value(raw).map(Self)
            }

            #[inline]
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = ScopeParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<Uuid> for $name {
            type Error = ScopeParamError;

            fn try_from(id: Uuid) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

scope_id!(
    /// Identifier of the tenant owning a row. Never nil.
    TenantId,
    TENANT_FILTER
);

scope_id!(
    /// Identifier of the organization owning a row. Never nil.
    OrganizationId,
    ORGANIZATION_FILTER
);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn rejects_nil() {
        assert!(TenantId::new(Uuid::nil()).is_err());
        assert!(OrganizationId::new(Uuid::nil()).is_err());
    }

    #[test]
    fn parse_reports_owning_filter() {
        let err = OrganizationId::parse("xyz").unwrap_err();
        match err {
            ScopeParamError::InvalidParameter {
                filter, parameter, ..
            } => {
                assert_eq!(filter, "organizationFilter");
                assert_eq!(parameter, "organizationId");
            }
            ScopeParamError::UnknownFilter(_) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn serde_is_transparent_and_validated() {
        let id = Uuid::new_v4();
        let tenant = TenantId::new(id).unwrap();
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<TenantId>(&json).unwrap(), tenant);

        let nil = format!("\"{}\"", Uuid::nil());
        assert!(serde_json::from_str::<TenantId>(&nil).is_err());
    }
}
