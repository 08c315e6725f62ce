use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, DeriveInput, Generics, Result};

use crate::attr::ContainerAttrs;

/// The input generics with the engine trait bounds added to every type
/// parameter, ready for `split_for_impl`.
pub(crate) fn bounded_generics(input: &DeriveInput) -> Generics {
    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(typewire::Describe));
        param.bounds.push(parse_quote!(typewire::ToValue));
        param.bounds.push(parse_quote!(typewire::FromValue));
    }
    generics
}

/// Annotation expressions for the type parameters, in declaration order.
/// These become the generic arguments of the record's registry key.
pub(crate) fn param_annotations(input: &DeriveInput) -> Vec<TokenStream> {
    input
        .generics
        .type_params()
        .map(|param| {
            let ident = &param.ident;
            quote!(<#ident as typewire::Describe>::annotation())
        })
        .collect()
}

/// Builder calls for the container-level record settings.
pub(crate) fn container_calls(attrs: &ContainerAttrs) -> TokenStream {
    let mut calls = TokenStream::new();
    if let Some(rule) = &attrs.rename_all {
        calls.extend(quote!(.rename_all(typewire::NameRule::#rule)));
    }
    match (&attrs.tag, &attrs.content, attrs.untagged) {
        (Some(tag), Some(content), _) => {
            calls.extend(quote!(.tagging(typewire::Tagging::adjacent(#tag, #content))));
        }
        (Some(tag), None, _) => {
            calls.extend(quote!(.tagging(typewire::Tagging::internal(#tag))));
        }
        (None, _, true) => {
            calls.extend(quote!(.tagging(typewire::Tagging::Untagged)));
        }
        _ => {}
    }
    if attrs.transparent {
        calls.extend(quote!(.transparent()));
    }
    if attrs.deny_unknown_fields {
        calls.extend(quote!(.deny_unknown_fields()));
    }
    if attrs.skip_if_default {
        calls.extend(quote!(.skip_if_default_all()));
    }
    calls
}

/// The inventory submission for `#[record(auto_register)]`. Emitted only
/// when the derive crate is built with the matching feature; generic records
/// have no concrete instantiation to register and are rejected.
pub(crate) fn auto_register_tokens(
    input: &DeriveInput,
    attrs: &ContainerAttrs,
) -> Result<TokenStream> {
    if !attrs.auto_register || !cfg!(feature = "auto_register") {
        return Ok(TokenStream::new());
    }
    if input.generics.type_params().next().is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`auto_register` is not supported on generic records",
        ));
    }
    let ident = &input.ident;
    Ok(quote! {
        typewire::__macro_exports::inventory::submit! {
            typewire::Registration {
                register: |registry: &typewire::Registry| {
                    typewire::decorate_in::<#ident>(registry)
                },
            }
        }
    })
}
