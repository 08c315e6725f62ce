//! The typed front door: traits connecting Rust types to the engine, and
//! the free-function conversion API over the global registry.

use crate::annotation::Annotation;
use crate::descriptor::{RecordKey, TypeDescriptor};
use crate::error::{DecorateError, SerdeError};
use crate::registry::Registry;
use crate::resolve;
use crate::schema::{Check, RecordDef, UnknownFields};
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Traits

/// A type with a declared wire shape.
///
/// Implemented for primitives, std containers, and every `#[derive(Record)]`
/// type. Container implementations compose: `Vec<Option<i64>>` describes
/// itself as `list[optional[int]]`.
pub trait Describe {
    /// The declared annotation for this type.
    fn annotation() -> Annotation;

    /// The context-free descriptor, used to build registry keys.
    fn shape() -> TypeDescriptor {
        resolve::lower(&Self::annotation())
    }

    /// Decorates the records this type depends on. Non-record types that
    /// contain no records do nothing.
    fn ensure_decorated(_registry: &Registry) -> Result<(), DecorateError> {
        Ok(())
    }
}

/// Conversion into the runtime [`Value`] model.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion out of the runtime [`Value`] model.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, SerdeError>;
}

/// A decoratable record type. Implemented by `#[derive(Record)]`; the
/// definition is monomorphic, with generic instantiations distinguished by
/// [`Record::record_key`].
pub trait Record: Describe + ToValue + FromValue {
    /// The record definition, field annotations already concrete.
    fn definition() -> RecordDef;

    /// Registry identity of this instantiation.
    fn record_key() -> RecordKey {
        match Self::shape() {
            TypeDescriptor::Record(key) => key,
            other => RecordKey::new(other.to_string()),
        }
    }

    /// Decorates every record referenced by this record's fields.
    fn ensure_dependencies(_registry: &Registry) -> Result<(), DecorateError> {
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Call options

/// Per-call overrides for the generated routines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// Overrides the strictness baked at decoration time.
    pub check: Option<Check>,
    /// Overrides each record's unknown-field policy.
    pub unknown_fields: Option<UnknownFields>,
}

impl CallOptions {
    pub fn check(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = Some(policy);
        self
    }
}

// -----------------------------------------------------------------------------
// Decoration

/// Decorates `T` (and, recursively, its dependencies) in the given registry.
/// Idempotent: an already decorated instantiation is left as is.
pub fn decorate_in<T: Record>(registry: &Registry) -> Result<(), DecorateError> {
    registry.decorate_typed(&T::record_key(), T::definition(), |reg| {
        T::ensure_dependencies(reg)
    })
}

/// Decorates `T` in the global registry.
pub fn decorate<T: Record>() -> Result<(), DecorateError> {
    decorate_in::<T>(Registry::global())
}

fn ensure<T: Record>(registry: &Registry) -> Result<(), SerdeError> {
    if registry.is_decorated(&T::record_key()) {
        return Ok(());
    }
    decorate_in::<T>(registry).map_err(|err| SerdeError::custom(err.to_string()))
}

// -----------------------------------------------------------------------------
// Conversion entry points

/// Serializes a record to the generic tree representation.
///
/// Decorates `T` on first use. Feed the result to any serde format:
///
/// ```no_run
/// # use typewire::{to_generic, Record};
/// # #[derive(Record)]
/// # struct Pri { i: i64 }
/// # let value = Pri { i: 10 };
/// let tree = to_generic(&value)?;
/// let json = serde_json::to_string(&tree)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn to_generic<T: Record>(value: &T) -> Result<Tree, SerdeError> {
    let registry = Registry::global();
    ensure::<T>(registry)?;
    registry.to_tree(&value.to_value(), &CallOptions::default())
}

/// Deserializes a record from the generic tree representation.
pub fn from_generic<T: Record>(tree: &Tree, options: &CallOptions) -> Result<T, SerdeError> {
    let registry = Registry::global();
    ensure::<T>(registry)?;
    let value = registry.from_tree(&T::record_key(), tree, options)?;
    T::from_value(value)
}

/// Serializes a record to the positional (sequence) representation.
pub fn to_tuple<T: Record>(value: &T) -> Result<Tree, SerdeError> {
    let registry = Registry::global();
    ensure::<T>(registry)?;
    registry.to_tuple_tree(&value.to_value(), &CallOptions::default())
}

/// Deserializes a record from the positional (sequence) representation.
pub fn from_tuple<T: Record>(tree: &Tree, options: &CallOptions) -> Result<T, SerdeError> {
    let registry = Registry::global();
    ensure::<T>(registry)?;
    let value = registry.from_tuple_tree(&T::record_key(), tree, options)?;
    T::from_value(value)
}
