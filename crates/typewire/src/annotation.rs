use core::fmt;

use crate::descriptor::PrimitiveKind;
use crate::schema::DeferredFn;
use crate::value::LiteralValue;

// -----------------------------------------------------------------------------
// Annotation

/// A declared field type, before resolution.
///
/// This is the AST the [resolver](crate::resolve) normalizes into a
/// [`TypeDescriptor`](crate::descriptor::TypeDescriptor). Annotations are
/// produced by `#[derive(Record)]` (via the [`Describe`](crate::Describe)
/// trait) or built by hand for dynamic record definitions.
///
/// Two kinds of forward reference exist, deliberately distinct:
///
/// - [`Named`](Annotation::Named) refers to a record by name and fails
///   decoration with an `UnresolvedTypeError` if the record is not yet
///   defined (re-decorating later succeeds);
/// - [`Deferred`](Annotation::Deferred) wraps a thunk evaluated lazily; if
///   it cannot be resolved at decoration time, resolution is retried
///   transparently the first time the generated routine runs.
///
/// A [`Quoted`](Annotation::Quoted) annotation, a type name smuggled in as a
/// string literal, is always rejected with a clear diagnostic, never guessed
/// at.
#[derive(Clone)]
pub enum Annotation {
    Primitive(PrimitiveKind),
    /// Wildcard: accept anything, pass it through structurally.
    Any,
    Optional(Box<Annotation>),
    List(Box<Annotation>),
    Set(Box<Annotation>),
    FixedTuple(Vec<Annotation>),
    VariadicTuple(Box<Annotation>),
    Map(Box<Annotation>, Box<Annotation>),
    Literal(Vec<LiteralValue>),
    /// Member order is preserved exactly as declared; it is the tie-break
    /// for untagged deserialization and serialize-direction matching.
    Union(Vec<Annotation>),
    /// Reference to a record by name, with generic arguments.
    Named { name: String, args: Vec<Annotation> },
    /// String-literal forward reference. Unsupported by design; resolution
    /// rejects it with a diagnostic naming the record and field.
    Quoted(String),
    /// Lazily evaluated annotation (deferred-evaluation semantics).
    Deferred(DeferredFn),
    /// A generic parameter of the enclosing record definition.
    TypeParam(String),
}

impl Annotation {
    pub const UNIT: Annotation = Annotation::Primitive(PrimitiveKind::Unit);
    pub const BOOL: Annotation = Annotation::Primitive(PrimitiveKind::Bool);
    pub const INT: Annotation = Annotation::Primitive(PrimitiveKind::Int);
    pub const FLOAT: Annotation = Annotation::Primitive(PrimitiveKind::Float);
    pub const STR: Annotation = Annotation::Primitive(PrimitiveKind::Str);
    pub const BYTES: Annotation = Annotation::Primitive(PrimitiveKind::Bytes);
    pub const ANY: Annotation = Annotation::Any;

    pub fn optional(inner: Annotation) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(elem: Annotation) -> Self {
        Self::List(Box::new(elem))
    }

    pub fn set(elem: Annotation) -> Self {
        Self::Set(Box::new(elem))
    }

    pub fn tuple(elems: Vec<Annotation>) -> Self {
        Self::FixedTuple(elems)
    }

    pub fn variadic_tuple(elem: Annotation) -> Self {
        Self::VariadicTuple(Box::new(elem))
    }

    pub fn map(key: Annotation, value: Annotation) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn literal<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LiteralValue>,
    {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn union(members: Vec<Annotation>) -> Self {
        Self::Union(members)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn named_with(name: impl Into<String>, args: Vec<Annotation>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::TypeParam(name.into())
    }

    pub fn deferred<F>(thunk: F) -> Self
    where
        F: Fn() -> Annotation + Send + Sync + 'static,
    {
        Self::Deferred(std::sync::Arc::new(thunk))
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "Primitive({kind})"),
            Self::Any => f.write_str("Any"),
            Self::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Self::List(elem) => f.debug_tuple("List").field(elem).finish(),
            Self::Set(elem) => f.debug_tuple("Set").field(elem).finish(),
            Self::FixedTuple(elems) => f.debug_tuple("FixedTuple").field(elems).finish(),
            Self::VariadicTuple(elem) => f.debug_tuple("VariadicTuple").field(elem).finish(),
            Self::Map(k, v) => f.debug_tuple("Map").field(k).field(v).finish(),
            Self::Literal(values) => f.debug_tuple("Literal").field(values).finish(),
            Self::Union(members) => f.debug_tuple("Union").field(members).finish(),
            Self::Named { name, args } => f
                .debug_struct("Named")
                .field("name", name)
                .field("args", args)
                .finish(),
            Self::Quoted(name) => f.debug_tuple("Quoted").field(name).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::TypeParam(name) => f.debug_tuple("TypeParam").field(name).finish(),
        }
    }
}
