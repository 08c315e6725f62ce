use core::fmt;
use std::sync::Arc;

use crate::schema::{Check, CustomDe, CustomSer, DefaultPolicy, DeferredFn, SkipPredicate};
use crate::schema::{Tagging, UnknownFields};
use crate::value::LiteralValue;

// -----------------------------------------------------------------------------
// PrimitiveKind

/// The leaf types a field annotation can bottom out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
}

impl PrimitiveKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unit => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// The normalized, introspectable representation of a declared field type.
///
/// Produced once per field by the [resolver](crate::resolve), immutable
/// afterwards. Unlike the input [`Annotation`](crate::annotation::Annotation),
/// a descriptor contains no unresolved names: record references carry their
/// registry [`RecordKey`] and generic parameters are either substituted or
/// widened to [`Any`](TypeDescriptor::Any).
///
/// `Optional` is sugar for a two-member union with the none type, but it is
/// kept distinct because it has a cheaper presence-check code path and never
/// participates in union tagging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    /// Wildcard: values pass through structurally, no checking.
    Any,
    Optional(Box<TypeDescriptor>),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    FixedTuple(Vec<TypeDescriptor>),
    VariadicTuple(Box<TypeDescriptor>),
    Mapping(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Literal(Vec<LiteralValue>),
    /// Order-preserving; never empty (enforced at resolution).
    Union(Vec<TypeDescriptor>),
    Record(RecordKey),
    /// A record referencing itself; broken at render time by a registry
    /// lookup instead of inlining.
    SelfRef(RecordKey),
    /// An unbound generic parameter of an uninstantiated generic record.
    /// Behaves as [`Any`](TypeDescriptor::Any) when rendered.
    TypeParam(Box<str>),
}

impl TypeDescriptor {
    /// The tag name this descriptor contributes as a union member.
    pub fn member_name(&self) -> String {
        match self {
            Self::Record(key) | Self::SelfRef(key) => key.name.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether a value of this type serializes to a mapping (relevant for
    /// internal tagging).
    pub fn serializes_as_mapping(&self) -> bool {
        matches!(
            self,
            Self::Record(_) | Self::SelfRef(_) | Self::Mapping(..)
        )
    }

    pub const fn as_record_key(&self) -> Option<&RecordKey> {
        match self {
            Self::Record(key) | Self::SelfRef(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Any => f.write_str("any"),
            Self::Optional(inner) => write!(f, "optional[{inner}]"),
            Self::List(elem) => write!(f, "list[{elem}]"),
            Self::Set(elem) => write!(f, "set[{elem}]"),
            Self::FixedTuple(elems) => {
                f.write_str("tuple[")?;
                join(f, elems, ", ")?;
                f.write_str("]")
            }
            Self::VariadicTuple(elem) => write!(f, "tuple[{elem}, ...]"),
            Self::Mapping(k, v) => write!(f, "map[{k}, {v}]"),
            Self::Literal(values) => {
                f.write_str("literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Self::Union(members) => join(f, members, " | "),
            Self::Record(key) | Self::SelfRef(key) => write!(f, "{key}"),
            Self::TypeParam(name) => f.write_str(name),
        }
    }
}

// -----------------------------------------------------------------------------
// RecordKey

/// Registry identity of a record: its name plus the concrete generic
/// arguments of this instantiation (empty for non-generic records).
///
/// Cheap to clone; `Display` renders `Foo` or `Foo[int, str]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub name: Arc<str>,
    pub args: Arc<[TypeDescriptor]>,
}

impl RecordKey {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            args: Arc::from(Vec::new()),
        }
    }

    pub fn with_args(name: impl Into<Arc<str>>, args: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            args: Arc::from(args),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("[")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Resolved records

/// How a field's descriptor was obtained.
#[derive(Clone)]
pub enum Binding {
    /// Resolved eagerly at decoration time.
    Ready(TypeDescriptor),
    /// A deferred annotation whose target was not available at decoration
    /// time; re-resolved transparently on first routine invocation.
    Deferred(DeferredFn),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(desc) => write!(f, "Ready({desc})"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// What a flatten-marked field flattens into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flatten {
    No,
    /// Nested record fields hoisted into the parent namespace.
    Record,
    /// Captures every wire key not claimed by sibling fields.
    Mapping,
}

/// A field after resolution: wire name computed, annotation normalized,
/// behavior flags validated.
#[derive(Clone)]
pub struct ResolvedField {
    pub decl_name: String,
    pub wire_name: String,
    pub aliases: Vec<String>,
    pub binding: Binding,
    pub default: DefaultPolicy,
    pub skip: bool,
    pub skip_serializing: bool,
    pub skip_deserializing: bool,
    pub skip_if: Option<SkipPredicate>,
    pub skip_if_default: bool,
    pub flatten: Flatten,
    pub serializer: Option<CustomSer>,
    pub deserializer: Option<CustomDe>,
}

impl ResolvedField {
    /// Whether the field is unconditionally absent from serialized output.
    #[inline]
    pub fn skip_on_serialize(&self) -> bool {
        self.skip || self.skip_serializing
    }

    /// Whether the field never reads from wire data.
    #[inline]
    pub fn skip_on_deserialize(&self) -> bool {
        self.skip || self.skip_deserializing
    }
}

impl fmt::Debug for ResolvedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedField")
            .field("decl_name", &self.decl_name)
            .field("wire_name", &self.wire_name)
            .field("binding", &self.binding)
            .field("flatten", &self.flatten)
            .finish_non_exhaustive()
    }
}

/// A record after resolution: the unit the render engine compiles.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub key: RecordKey,
    pub fields: Vec<ResolvedField>,
    pub tagging: Tagging,
    pub transparent: bool,
    pub unknown_fields: UnknownFields,
    /// Strictness baked into the generated routines.
    pub check: Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        let key = RecordKey::with_args(
            "Foo",
            vec![
                TypeDescriptor::Primitive(PrimitiveKind::Int),
                TypeDescriptor::Primitive(PrimitiveKind::Str),
            ],
        );
        assert_eq!(key.to_string(), "Foo[int, str]");
        assert_eq!(RecordKey::new("Bar").to_string(), "Bar");
    }

    #[test]
    fn descriptor_display() {
        let desc = TypeDescriptor::Union(vec![
            TypeDescriptor::Primitive(PrimitiveKind::Float),
            TypeDescriptor::List(Box::new(TypeDescriptor::Primitive(PrimitiveKind::Int))),
        ]);
        assert_eq!(desc.to_string(), "float | list[int]");
    }
}
