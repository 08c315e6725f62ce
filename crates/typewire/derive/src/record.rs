//! `#[derive(Record)]` expansion for structs with named fields.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, FieldsNamed, Result};

use crate::attr::{ContainerAttrs, DefaultAttr, FieldAttrs};
use crate::utils;

pub(crate) fn expand_struct(input: &DeriveInput, fields: &FieldsNamed) -> Result<TokenStream> {
    let ident = &input.ident;
    let container = ContainerAttrs::parse(&input.attrs)?;
    let name = container
        .rename
        .clone()
        .unwrap_or_else(|| ident.to_string());

    let mut field_idents = Vec::new();
    let mut field_types = Vec::new();
    let mut field_defs = Vec::new();
    for field in &fields.named {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        // Named fields always have an ident.
        let Some(fid) = &field.ident else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let fty = &field.ty;
        let fname = fid.to_string();

        let mut calls = TokenStream::new();
        if let Some(rename) = &attrs.rename {
            calls.extend(quote!(.rename(#rename)));
        }
        for alias in &attrs.aliases {
            calls.extend(quote!(.alias(#alias)));
        }
        if attrs.skip {
            calls.extend(quote!(.skip()));
        }
        if attrs.skip_serializing {
            calls.extend(quote!(.skip_serializing()));
        }
        if attrs.skip_deserializing {
            calls.extend(quote!(.skip_deserializing()));
        }
        if let Some(pred) = &attrs.skip_serializing_if {
            calls.extend(quote!(.skip_if(#pred)));
        }
        if attrs.skip_if_default {
            calls.extend(quote!(.skip_if_default()));
        }
        match &attrs.default {
            DefaultAttr::None => {}
            DefaultAttr::Trait => calls.extend(quote! {
                .default_factory(|| {
                    typewire::ToValue::to_value(&<#fty as ::core::default::Default>::default())
                })
            }),
            DefaultAttr::Path(path) => calls.extend(quote! {
                .default_factory(|| typewire::ToValue::to_value(&#path()))
            }),
        }
        if attrs.flatten {
            calls.extend(quote!(.flatten()));
        }

        field_defs.push(quote! {
            .field(
                typewire::FieldDef::new(#fname, <#fty as typewire::Describe>::annotation())
                    #calls
            )
        });
        field_idents.push(fid.clone());
        field_types.push(fty.clone());
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

    let field_count = field_idents.len();
    let field_indices = 0..field_count;

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
                typewire::Value::record(
                    <Self as typewire::Record>::record_key(),
                    ::std::vec![#(typewire::ToValue::to_value(&self.#field_idents)),*],
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
                let key = <Self as typewire::Record>::record_key();
                if rv.key != key {
                    return ::core::result::Result::Err(typewire::SerdeError::from(
                        typewire::SerdeErrorKind::RecordMismatch {
                            expected: key.to_string(),
                            found: rv.key.to_string(),
                        },
                    ));
                }
                if rv.values.len() != #field_count {
                    return ::core::result::Result::Err(typewire::SerdeError::from(
                        typewire::SerdeErrorKind::Length {
                            expected: #field_count,
                            found: rv.values.len(),
                        },
                    ));
                }
                let mut values = rv.values.into_iter();
                ::core::result::Result::Ok(Self {
                    #(#field_idents: typewire::FromValue::from_value(
                        match values.next() {
                            ::core::option::Option::Some(v) => v,
                            ::core::option::Option::None => {
                                return ::core::result::Result::Err(typewire::SerdeError::from(
                                    typewire::SerdeErrorKind::Length {
                                        expected: #field_count,
                                        found: #field_indices,
                                    },
                                ))
                            }
                        },
                    )?,)*
                })
            }
        }

        impl #impl_generics typewire::Record for #ident #ty_generics #where_clause {
            fn definition() -> typewire::RecordDef {
                typewire::RecordDef::new(#name)
                    #container_calls
                    #(#field_defs)*
            }

            fn ensure_dependencies(
                registry: &typewire::Registry,
            ) -> ::core::result::Result<(), typewire::DecorateError> {
                #(<#field_types as typewire::Describe>::ensure_decorated(registry)?;)*
                ::core::result::Result::Ok(())
            }
        }

        #auto_register
    })
}
