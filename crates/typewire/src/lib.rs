#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Extern Self

// Derive output refers to this crate as `typewire`; the alias makes that
// path valid inside the crate's own tests and doctests too.
extern crate self as typewire;

// -----------------------------------------------------------------------------
// Modules

mod annotation;
mod api;
mod codec;
mod descriptor;
mod impls;
mod registry;
mod rename;
mod render;
mod resolve;
mod schema;
mod tree;
mod value;

pub mod error;

// -----------------------------------------------------------------------------
// Macro support

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}

// -----------------------------------------------------------------------------
// Top-Level exports

pub use annotation::Annotation;
pub use api::{
    decorate, decorate_in, from_generic, from_tuple, to_generic, to_tuple, CallOptions, Describe,
    FromValue, Record, ToValue,
};
pub use descriptor::{
    Binding, Flatten, PrimitiveKind, RecordKey, ResolvedField, ResolvedRecord, TypeDescriptor,
};
pub use error::{
    DecorateError, DefinitionError, SerdeError, SerdeErrorKind, UnresolvedKind,
    UnresolvedTypeError,
};
#[cfg(feature = "auto_register")]
pub use registry::Registration;
pub use registry::{DecorateOptions, Registry};
pub use rename::NameRule;
pub use resolve::lower;
pub use schema::{
    Check, CustomDe, CustomSer, DefaultFactory, DefaultPolicy, DeferredFn, FieldDef, RecordDef,
    SkipPredicate, Tagging, UnknownFields,
};
pub use tree::Tree;
pub use value::{LiteralValue, RecordValue, Value};

pub use typewire_derive::Record;
