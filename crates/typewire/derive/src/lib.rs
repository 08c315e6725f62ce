//! Derive support for `typewire`.
//!
//! See [`Record`], the only macro this crate exports.

use proc_macro::TokenStream;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

// -----------------------------------------------------------------------------
// Modules

mod attr;
mod record;
mod union;
mod utils;

// -----------------------------------------------------------------------------
// Macros

/// Implements `Describe`, `ToValue`, `FromValue`, and `Record` for a struct
/// with named fields or an enum of newtype variants.
///
/// Container attributes (`#[record(...)]` on the type):
///
/// - `rename = "Name"`: wire/registry name of the record
/// - `rename_all = "camelCase"`: naming convention for field wire names
/// - `tag = "k"`: internal tagging for unions among the fields (for an
///   enum: for its variants)
/// - `tag = "k", content = "c"`: adjacent tagging
/// - `untagged`: no discriminator, declared order decides on input
/// - `transparent`: single-field records serialize as the bare field value
/// - `deny_unknown_fields`: reject unclaimed wire keys
/// - `skip_if_default`: omit any field equal to its default from output
/// - `auto_register`: submit the record for
///   `Registry::register_collected` (requires the `auto_register` feature)
///
/// Field attributes:
///
/// - `rename = "n"`, `alias = "n"` (repeatable)
/// - `skip`, `skip_serializing`, `skip_deserializing`
/// - `skip_serializing_if = "path"`: predicate over the runtime value
/// - `skip_if_default`
/// - `default` (the type's `Default`), `default = "path"` (a factory)
/// - `flatten`: hoist a nested record or mapping into this record's keys
///
/// ```rust
/// use typewire::Record;
///
/// #[derive(Record)]
/// #[record(rename_all = "camelCase")]
/// struct Account {
///     user_name: String,
///     #[record(default)]
///     balance: i64,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => record::expand_struct(input, fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Record requires named fields",
            )),
        },
        Data::Enum(data) => union::expand_enum(input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Record cannot be derived for unions",
        )),
    }
}
