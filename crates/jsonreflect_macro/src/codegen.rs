//! `impl Reflect` generation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;

use crate::attrs::{self, ContainerAttrs};

/// Expand `#[derive(Reflect)]` for `input`
pub fn expand(input: &syn::DeriveInput) -> syn::Result<TokenStream> {
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Reflect cannot be derived for types with lifetime parameters",
        ));
    }

    let container = attrs::parse_container(&input.attrs)?;
    let name = container
        .name
        .clone()
        .unwrap_or_else(|| attrs::strip_raw_prefix(&input.ident.to_string()).to_string());

    let body = match &input.data {
        syn::Data::Struct(data) => struct_descriptor(&name, &container, &data.fields)?,
        syn::Data::Enum(data) => enum_descriptor(&name, &container, data)?,
        syn::Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "Reflect cannot be derived for unions",
            ));
        }
    };

    let type_args: Vec<&syn::Ident> = input.generics.type_params().map(|p| &p.ident).collect();
    let decorated = if matches!(&input.data, syn::Data::Struct(s) if is_newtype(&s.fields)) {
        body
    } else {
        let description = container
            .description
            .as_ref()
            .map(|doc| quote! { .with_description(#doc) });
        quote! {
            #body
                .with_module(::core::module_path!())
                .with_args(::std::vec![#(::jsonreflect::TypeRef::of::<#type_args>()),*])
                #description
        }
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(::jsonreflect::Reflect));
        param.bounds.push(syn::parse_quote!('static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &input.ident;

    Ok(quote! {
        impl #impl_generics ::jsonreflect::Reflect for #ident #ty_generics #where_clause {
            fn descriptor() -> ::jsonreflect::TypeDescriptor {
                #decorated
            }
        }
    })
}

fn is_newtype(fields: &syn::Fields) -> bool {
    matches!(fields, syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1)
}

/// `FieldDescriptor` expressions for named fields
fn field_descriptors(
    fields: &syn::FieldsNamed,
    rename_all: Option<&str>,
) -> syn::Result<Vec<TokenStream>> {
    fields
        .named
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            let declared = attrs::strip_raw_prefix(&ident).to_string();
            let parsed = attrs::parse_field(&field.attrs, &ident, rename_all)?;
            let ty = &field.ty;
            let tags = parsed.tags.iter().map(|(k, v)| quote! { .tag(#k, #v) });
            Ok(quote! {
                ::jsonreflect::FieldDescriptor::new(#declared, ::jsonreflect::TypeRef::of::<#ty>())
                    #(#tags)*
            })
        })
        .collect()
}

fn struct_descriptor(
    name: &str,
    container: &ContainerAttrs,
    fields: &syn::Fields,
) -> syn::Result<TokenStream> {
    Ok(match fields {
        syn::Fields::Named(named) => {
            let fields = field_descriptors(named, container.rename_all.as_deref())?;
            quote! {
                ::jsonreflect::TypeDescriptor::object(#name, ::std::vec![#(#fields),*])
            }
        }
        // Serialized as the inner value
        syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            let ty = &unnamed.unnamed[0].ty;
            quote! {
                ::jsonreflect::TypeDescriptor::indirect(::jsonreflect::TypeRef::of::<#ty>())
            }
        }
        syn::Fields::Unnamed(_) => quote! {
            ::jsonreflect::TypeDescriptor::unsupported(#name, "tuple structs with several fields")
        },
        syn::Fields::Unit => quote! {
            ::jsonreflect::TypeDescriptor::primitive(#name, ::jsonreflect::PrimitiveKind::Null)
        },
    })
}

fn enum_descriptor(
    name: &str,
    container: &ContainerAttrs,
    data: &syn::DataEnum,
) -> syn::Result<TokenStream> {
    let rename_all = container.rename_all.as_deref();

    let mut variants = Vec::new();
    for variant in &data.variants {
        let ident = variant.ident.to_string();
        let parsed = attrs::parse_field(&variant.attrs, &ident, rename_all)?;
        let skipped = parsed
            .tags
            .iter()
            .any(|(k, v)| (k == "skip" && v == "true") || (k == "name" && v == "-"));
        if skipped {
            continue;
        }
        let exposed = parsed
            .tags
            .iter()
            .rev()
            .find(|(k, _)| k == "name")
            .map_or_else(|| attrs::strip_raw_prefix(&ident).to_string(), |(_, v)| v.clone());
        variants.push((variant, exposed));
    }

    if variants
        .iter()
        .all(|(variant, _)| matches!(variant.fields, syn::Fields::Unit))
    {
        let names = variants.iter().map(|(_, exposed)| exposed);
        return Ok(quote! {
            ::jsonreflect::TypeDescriptor::string_enum(#name, &[#(#names),*])
        });
    }

    // Externally tagged: `"Unit"` or `{"Variant": payload}`
    let mut alternatives = Vec::new();
    for (variant, exposed) in variants {
        let alternative = match &variant.fields {
            syn::Fields::Unit => quote! {
                ::jsonreflect::TypeDescriptor::literal(#exposed)
            },
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let ty = &unnamed.unnamed[0].ty;
                quote! {
                    ::jsonreflect::TypeDescriptor::anonymous(::std::vec![
                        ::jsonreflect::FieldDescriptor::new(#exposed, ::jsonreflect::TypeRef::of::<#ty>())
                            .tag("required", "true")
                    ])
                }
            }
            syn::Fields::Named(named) => {
                let fields = field_descriptors(named, None)?;
                quote! {
                    ::jsonreflect::TypeDescriptor::anonymous(::std::vec![
                        ::jsonreflect::FieldDescriptor::new(
                            #exposed,
                            ::jsonreflect::TypeRef::from_fn(|| {
                                ::jsonreflect::TypeDescriptor::anonymous(::std::vec![#(#fields),*])
                            }),
                        )
                        .tag("required", "true")
                    ])
                }
            }
            syn::Fields::Unnamed(_) => {
                let label = format!("{name}::{}", variant.ident);
                quote! {
                    ::jsonreflect::TypeDescriptor::unsupported(#label, "tuple variants with several fields")
                }
            }
        };
        alternatives.push(quote! {
            ::jsonreflect::TypeRef::from_fn(|| #alternative)
        });
    }

    Ok(quote! {
        ::jsonreflect::TypeDescriptor::union(#name, ::std::vec![#(#alternatives),*])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn expand_impl(input: syn::DeriveInput) -> syn::ItemImpl {
        syn::parse2(expand(&input).unwrap()).unwrap()
    }

    fn body(item: &syn::ItemImpl) -> String {
        item.items
            .first()
            .map(|fn_item| quote!(#fn_item).to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_struct_implements_reflect() {
        let item = expand_impl(syn::parse_quote! {
            /// A user
            struct User {
                name: String,
                #[schema(required)]
                age: Option<u32>,
            }
        });
        let trait_path = item.trait_.as_ref().map(|(_, path, _)| quote!(#path).to_string());
        assert_eq!(trait_path.as_deref(), Some(":: jsonreflect :: Reflect"));
        let body = body(&item);
        assert!(body.contains("object"), "{body}");
        assert!(body.contains("\"A user\""), "{body}");
        assert!(body.contains("\"required\""), "{body}");
        assert!(body.contains("module_path"), "{body}");
    }

    #[test]
    fn test_generic_parameters_gain_bounds() {
        let item = expand_impl(syn::parse_quote! {
            struct ApiResponse<T> where T: Clone {
                data: Option<T>,
            }
        });
        let param = item.generics.type_params().next().unwrap();
        let bounds: Vec<String> = param.bounds.iter().map(|b| quote!(#b).to_string()).collect();
        assert_eq!(bounds, vec![":: jsonreflect :: Reflect", "'static"]);
        assert!(item.generics.where_clause.is_some());
        assert!(body(&item).contains("with_args"));
    }

    #[rstest]
    #[case(syn::parse_quote! { struct Id(u64); }, "indirect")]
    #[case(syn::parse_quote! { struct Marker; }, "PrimitiveKind :: Null")]
    #[case(syn::parse_quote! { struct Pair(u8, u8); }, "unsupported")]
    #[case(syn::parse_quote! { enum Status { Active, Retired } }, "string_enum")]
    #[case(syn::parse_quote! { enum Shape { Dot, Circle { r: f64 }, Square(f64) } }, "union")]
    fn test_descriptor_kind(#[case] input: syn::DeriveInput, #[case] expected: &str) {
        let body = body(&expand_impl(input));
        assert!(body.contains(expected), "{body}");
    }

    #[test]
    fn test_newtype_has_no_module() {
        let body = body(&expand_impl(syn::parse_quote! { struct Id(u64); }));
        assert!(!body.contains("module_path"), "{body}");
    }

    #[test]
    fn test_enum_variant_names_follow_serde() {
        let body = body(&expand_impl(syn::parse_quote! {
            #[serde(rename_all = "snake_case")]
            enum Status {
                InProgress,
                #[serde(rename = "done")]
                Finished,
                #[serde(skip)]
                Internal,
            }
        }));
        assert!(body.contains("\"in_progress\""), "{body}");
        assert!(body.contains("\"done\""), "{body}");
        assert!(!body.contains("Internal"), "{body}");
        assert!(!body.contains("internal"), "{body}");
    }

    #[rstest]
    #[case(syn::parse_quote! { struct Borrowed<'a> { name: &'a str } }, "lifetime parameters")]
    #[case(syn::parse_quote! { union Bits { a: u32, b: f32 } }, "unions")]
    #[case(syn::parse_quote! { #[schema(colour = "red")] struct Paint; }, "unknown container attribute")]
    fn test_rejected_inputs(#[case] input: syn::DeriveInput, #[case] message: &str) {
        let err = expand(&input).unwrap_err().to_string();
        assert!(err.contains(message), "{err}");
    }
}
