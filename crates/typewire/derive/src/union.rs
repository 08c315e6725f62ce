//! `#[derive(Record)]` expansion for enums.
//!
//! An enum becomes a transparent record with a single union-typed field;
//! the enum's tagging attributes configure how member identity is encoded.
//! Every variant must be a newtype wrapping a `Describe` type.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Fields, Result};

use crate::attr::ContainerAttrs;
use crate::utils;

pub(crate) fn expand_enum(input: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let ident = &input.ident;
    let container = ContainerAttrs::parse(&input.attrs)?;
    let name = container
        .rename
        .clone()
        .unwrap_or_else(|| ident.to_string());

    let mut variant_idents = Vec::new();
    let mut variant_types = Vec::new();
    for variant in &data.variants {
        let Fields::Unnamed(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "only newtype variants are supported",
            ));
        };
        if fields.unnamed.len() != 1 {
            return Err(syn::Error::new_spanned(
                fields,
                "only newtype variants are supported",
            ));
        }
        variant_idents.push(variant.ident.clone());
        variant_types.push(fields.unnamed[0].ty.clone());
    }
    if variant_idents.is_empty() {
        return Err(syn::Error::new_spanned(ident, "enum has no variants"));
    }

    let container_calls = utils::container_calls(&container);
    let auto_register = utils::auto_register_tokens(input, &container)?;

    let generics = utils::bounded_generics(input);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let param_annotations = utils::param_annotations(input);
    let annotation = if param_annotations.is_empty() {
        quote!(typewire::Annotation::named(#name))
    } else {
        quote! {
            typewire::Annotation::named_with(#name, ::std::vec![#(#param_annotations),*])
        }
    };

    Ok(quote! {
        impl #impl_generics typewire::Describe for #ident #ty_generics #where_clause {
            fn annotation() -> typewire::Annotation {
                #annotation
            }

            fn ensure_decorated(
                registry: &typewire::Registry,
            ) -> ::core::result::Result<(), typewire::DecorateError> {
                typewire::decorate_in::<Self>(registry)
            }
        }

        impl #impl_generics typewire::ToValue for #ident #ty_generics #where_clause {
            fn to_value(&self) -> typewire::Value {
                let inner = match self {
                    #(Self::#variant_idents(v) => typewire::ToValue::to_value(v),)*
                };
                typewire::Value::record(
                    <Self as typewire::Record>::record_key(),
                    ::std::vec![inner],
                )
            }
        }

        impl #impl_generics typewire::FromValue for #ident #ty_generics #where_clause {
            fn from_value(
                value: typewire::Value,
            ) -> ::core::result::Result<Self, typewire::SerdeError> {
                let rv = match value {
                    typewire::Value::Record(rv) => rv,
                    other => {
                        return ::core::result::Result::Err(typewire::SerdeError::from(
                            typewire::SerdeErrorKind::TypeMismatch {
                                expected: "record",
                                found: other.kind_name().to_owned(),
                            },
                        ))
                    }
                };
                let mut values = rv.values.into_iter();
                let inner = match values.next() {
                    ::core::option::Option::Some(v) => v,
                    ::core::option::Option::None => {
                        return ::core::result::Result::Err(typewire::SerdeError::from(
                            typewire::SerdeErrorKind::Length {
                                expected: 1,
                                found: 0,
                            },
                        ))
                    }
                };
                // Declared order, first variant that accepts the value wins.
                #(
                    if let ::core::result::Result::Ok(v) =
                        <#variant_types as typewire::FromValue>::from_value(inner.clone())
                    {
                        return ::core::result::Result::Ok(Self::#variant_idents(v));
                    }
                )*
                ::core::result::Result::Err(typewire::SerdeError::custom(::std::format!(
                    "no variant of `{}` matched the value",
                    #name
                )))
            }
        }

        impl #impl_generics typewire::Record for #ident #ty_generics #where_clause {
            fn definition() -> typewire::RecordDef {
                typewire::RecordDef::new(#name)
                    .transparent()
                    #container_calls
                    .field(typewire::FieldDef::new(
                        "value",
                        typewire::Annotation::union(::std::vec![
                            #(<#variant_types as typewire::Describe>::annotation()),*
                        ]),
                    ))
            }

            fn ensure_dependencies(
                registry: &typewire::Registry,
            ) -> ::core::result::Result<(), typewire::DecorateError> {
                #(<#variant_types as typewire::Describe>::ensure_decorated(registry)?;)*
                ::core::result::Result::Ok(())
            }
        }

        #auto_register
    })
}
