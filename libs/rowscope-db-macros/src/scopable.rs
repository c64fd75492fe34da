use heck::ToUpperCamelCase;
use proc_macro_error2::abort;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, spanned::Spanned};

const VALID_ATTRS: &str = "tenant_col, no_tenant, organization_col, no_organization, \
                           resource_col, no_resource, unrestricted";

/// A column the entity must take an explicit position on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dimension {
    Tenant,
    Organization,
    Resource,
}

impl Dimension {
    const ALL: [Self; 3] = [Self::Tenant, Self::Organization, Self::Resource];

    fn name(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Organization => "organization",
            Self::Resource => "resource",
        }
    }

    fn col_key(self) -> String {
        format!("{}_col", self.name())
    }

    fn skip_key(self) -> String {
        format!("no_{}", self.name())
    }
}

/// Either `<dim>_col = "..."` or `no_<dim>`; exactly one must be present.
#[derive(Default)]
struct Decision {
    col: Option<(String, Span)>,
    skipped: Option<Span>,
}

/// Configuration parsed from `#[secure(...)]` attributes
#[derive(Default)]
struct SecureConfig {
    tenant: Decision,
    organization: Decision,
    resource: Decision,
    unrestricted: Option<Span>,
}

impl SecureConfig {
    fn get(&self, dim: Dimension) -> &Decision {
        match dim {
            Dimension::Tenant => &self.tenant,
            Dimension::Organization => &self.organization,
            Dimension::Resource => &self.resource,
        }
    }

    fn get_mut(&mut self, dim: Dimension) -> &mut Decision {
        match dim {
            Dimension::Tenant => &mut self.tenant,
            Dimension::Organization => &mut self.organization,
            Dimension::Resource => &mut self.resource,
        }
    }

    fn validate(&self, struct_span: Span) -> syn::Result<()> {
        if let Some(span) = self.unrestricted {
            let has_other = Dimension::ALL.into_iter().any(|dim| {
                let decision = self.get(dim);
                decision.col.is_some() || decision.skipped.is_some()
            });
            if has_other {
                return Err(syn::Error::new(
                    span,
                    "when using 'unrestricted', no other column attributes are allowed",
                ));
            }
            return Ok(());
        }

        for dim in Dimension::ALL {
            let name = dim.name();
            match self.get(dim) {
                Decision {
                    col: None,
                    skipped: None,
                } => {
                    return Err(syn::Error::new(
                        struct_span,
                        format!(
                            "secure: missing explicit decision for {name}:\n  \
                             use `{name}_col = \"column_name\"` or `no_{name}`"
                        ),
                    ));
                }
                Decision {
                    col: Some((_, span)),
                    skipped: Some(_),
                } => {
                    return Err(syn::Error::new(
                        *span,
                        format!("secure: specify either `{name}_col` or `no_{name}`, not both"),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

pub fn expand_derive_scopable(input: &DeriveInput) -> TokenStream {
    match try_expand(input) {
        Ok(tokens) => tokens,
        Err(err) => abort!(err.span(), "{}", err),
    }
}

fn try_expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !matches!(&input.data, Data::Struct(_)) {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Scopable)] can only be applied to structs",
        ));
    }

    let config = parse_secure_attrs(input)?;
    config.validate(input.ident.span())?;

    let entity_ident = syn::Ident::new("Entity", input.ident.span());
    let is_unrestricted = config.unrestricted.is_some();

    let methods = Dimension::ALL
        .into_iter()
        .map(|dim| generate_col_impl(dim, config.get(dim).col.as_ref()))
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl ::rowscope_db::secure::ScopableEntity for #entity_ident {
            const IS_UNRESTRICTED: bool = #is_unrestricted;

            #(#methods)*
        }
    })
}

/// Generate a column method implementation
fn generate_col_impl(dim: Dimension, col: Option<&(String, Span)>) -> syn::Result<TokenStream> {
    let method_ident = format_ident!("{}", dim.col_key());

    let Some((col_name, span)) = col else {
        return Ok(quote! {
            fn #method_ident() -> ::core::option::Option<Self::Column> {
                ::core::option::Option::None
            }
        });
    };

    let variant = snake_to_upper_camel(col_name);
    let col_ident: syn::Ident = syn::parse_str(&variant).map_err(|_| {
        syn::Error::new(
            *span,
            format!("secure: `{col_name}` is not a valid column name"),
        )
    })?;
    Ok(quote! {
        fn #method_ident() -> ::core::option::Option<Self::Column> {
            ::core::option::Option::Some(Self::Column::#col_ident)
        }
    })
}

/// Parse all `#[secure(...)]` attributes with duplicate detection
fn parse_secure_attrs(input: &DeriveInput) -> syn::Result<SecureConfig> {
    let mut config = SecureConfig::default();

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("secure")) {
        attr.parse_nested_meta(|meta| {
            let span = meta.path.span();
            let Some(key) = meta.path.get_ident().map(ToString::to_string) else {
                return Err(meta.error("expected attribute name"));
            };

            if key == "unrestricted" {
                if config.unrestricted.is_some() {
                    return Err(meta.error("duplicate attribute 'unrestricted'"));
                }
                config.unrestricted = Some(span);
                return Ok(());
            }

            if let Some(dim) = Dimension::ALL.into_iter().find(|d| d.skip_key() == key) {
                let decision = config.get_mut(dim);
                if decision.skipped.is_some() {
                    return Err(meta.error(format!("duplicate attribute '{key}'")));
                }
                decision.skipped = Some(span);
                return Ok(());
            }

            if let Some(dim) = Dimension::ALL.into_iter().find(|d| d.col_key() == key) {
                let lit: syn::LitStr = meta.value()?.parse()?;
                let decision = config.get_mut(dim);
                if decision.col.is_some() {
                    return Err(meta.error(format!("duplicate attribute '{key}'")));
                }
                decision.col = Some((lit.value(), lit.span()));
                return Ok(());
            }

            Err(meta.error(format!(
                "unknown attribute '{key}'. Valid attributes: {VALID_ATTRS}"
            )))
        })?;
    }

    Ok(config)
}

/// Convert `snake_case` to `UpperCamelCase` for enum variant names
fn snake_to_upper_camel(s: &str) -> String {
    s.to_upper_camel_case()
}
