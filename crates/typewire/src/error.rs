use core::fmt;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Field paths

/// One step of the path from a top-level record down to an offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    /// A record field, by declared name.
    Field(String),
    /// A sequence element.
    Index(usize),
    /// A mapping key, rendered with `Display`.
    Key(String),
}

/// The full path to the value a [`SerdeError`] complains about.
///
/// Rendered as `Foo.bar[3].baz` so the top-level error names the exact
/// location without source access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(pub Vec<PathSeg>);

impl FieldPath {
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                PathSeg::Field(name) => {
                    if i == 0 {
                        write!(f, "{name}")?;
                    } else {
                        write!(f, ".{name}")?;
                    }
                }
                PathSeg::Index(idx) => write!(f, "[{idx}]")?,
                PathSeg::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// SerdeError

/// Runtime conversion failure: type/shape mismatch, missing required field,
/// union tag trouble, coercion failure, literal value not in the allowed set.
///
/// Carries the [`FieldPath`] to the offending value; every enclosing
/// container and record prepends its own segment while the error propagates.
#[derive(Debug)]
pub struct SerdeError {
    path: FieldPath,
    kind: SerdeErrorKind,
}

impl SerdeError {
    #[inline]
    pub fn new(kind: SerdeErrorKind) -> Self {
        Self {
            path: FieldPath::empty(),
            kind,
        }
    }

    /// Free-form failure, mainly for user-supplied callables.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::new(SerdeErrorKind::Custom(msg.into()))
    }

    #[inline]
    pub fn kind(&self) -> &SerdeErrorKind {
        &self.kind
    }

    #[inline]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Prepends a record-field segment.
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.path.0.insert(0, PathSeg::Field(name.into()));
        self
    }

    /// Prepends a sequence-index segment.
    pub fn with_index(mut self, index: usize) -> Self {
        self.path.0.insert(0, PathSeg::Index(index));
        self
    }

    /// Prepends a mapping-key segment.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.path.0.insert(0, PathSeg::Key(key.into()));
        self
    }
}

impl fmt::Display for SerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "at `{}`: {}", self.path, self.kind)
        }
    }
}

impl core::error::Error for SerdeError {}

impl From<SerdeErrorKind> for SerdeError {
    #[inline]
    fn from(kind: SerdeErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The reasons every untagged-union member was rejected, kept together so
/// the final error reports all of them instead of only the last.
#[derive(Debug)]
pub struct UnionAttempts(pub Vec<(String, SerdeError)>);

impl fmt::Display for UnionAttempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (member, reason)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "`{member}`: {reason}")?;
        }
        Ok(())
    }
}

/// What went wrong, without location context (that lives in [`SerdeError`]).
#[derive(Debug, Error)]
pub enum SerdeErrorKind {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("cannot coerce {found} into {expected}")]
    Coerce {
        expected: &'static str,
        found: String,
    },
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("unknown field `{field}`")]
    UnknownField { field: String },
    #[error("expected a sequence of at least {expected} elements, found {found}")]
    Arity { expected: usize, found: usize },
    #[error("expected exactly {expected} elements, found {found}")]
    Length { expected: usize, found: usize },
    #[error("value {value} is not one of the allowed literals [{allowed}]")]
    LiteralMismatch { value: String, allowed: String },
    #[error("unknown union tag `{tag}`, expected one of [{expected}]")]
    UnknownTag { tag: String, expected: String },
    #[error("missing union tag key `{key}`")]
    MissingTag { key: String },
    #[error("missing union content key `{key}`")]
    MissingContent { key: String },
    #[error("expected record `{expected}`, found record `{found}`")]
    RecordMismatch { expected: String, found: String },
    #[error("value {value} of type {found} matches none of the declared union members [{members}]")]
    NoMemberForValue {
        value: String,
        found: &'static str,
        members: String,
    },
    #[error("no union member accepted the value: {0}")]
    UnionNoMatch(UnionAttempts),
    #[error("record `{key}` has not been decorated yet")]
    NotDecorated { key: String },
    #[error("unknown record type `{name}`")]
    UnknownType { name: String },
    #[error("{0}")]
    Custom(String),
}

// -----------------------------------------------------------------------------
// Decoration-time errors

/// A field's declared type annotation could not be normalized.
///
/// Decoration of the record aborts and the record stays unregistered;
/// decorating again after the missing type becomes available succeeds.
#[derive(Debug, Error)]
#[error("record `{record}`, field `{field}`: {kind}")]
pub struct UnresolvedTypeError {
    pub record: String,
    pub field: String,
    pub kind: UnresolvedKind,
}

#[derive(Debug, Error)]
pub enum UnresolvedKind {
    #[error("unknown type `{0}`; decorate it first or use a deferred annotation")]
    Unknown(String),
    #[error("string-literal forward reference {0:?} is not supported; use a deferred annotation")]
    Quoted(String),
    #[error("type parameter `{0}` is not declared by the record")]
    UnknownParam(String),
}

/// A structurally invalid record declaration.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("no definition registered for record `{name}`")]
    UnknownDefinition { name: String },
    #[error("record `{record}`: union type of field `{field}` has no members")]
    EmptyUnion { record: String, field: String },
    #[error("record `{record}`: fields `{first}` and `{second}` are both flatten-mapping fields")]
    DuplicateFlattenMapping {
        record: String,
        first: String,
        second: String,
    },
    #[error("record `{record}`: field `{field}` is marked flatten but is neither a record nor a mapping")]
    FlattenKind { record: String, field: String },
    #[error("record `{record}`: field `{field}` skips deserialization but declares no default")]
    SkipWithoutDefault { record: String, field: String },
    #[error("record `{record}` is transparent but declares {count} fields")]
    TransparentArity { record: String, count: usize },
    #[error("record `{record}`: internal tagging requires every member of the union in field `{field}` to serialize as a mapping, but `{member}` does not")]
    TaggedNonMapping {
        record: String,
        field: String,
        member: String,
    },
    #[error("record `{record}`: {which} tagging requires a non-empty key name")]
    EmptyTagKey { record: String, which: &'static str },
    #[error("record `{record}` declares {expected} type parameters, got {got} arguments")]
    GenericArity {
        record: String,
        expected: usize,
        got: usize,
    },
}

/// Everything that can abort [`decorate`](crate::decorate) synchronously.
#[derive(Debug, Error)]
pub enum DecorateError {
    #[error(transparent)]
    Unresolved(#[from] UnresolvedTypeError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rendering() {
        let err = SerdeError::new(SerdeErrorKind::MissingField {
            field: "c".into(),
        })
        .with_key("k".to_string())
        .with_index(3)
        .with_field("bar")
        .with_field("Foo");

        assert_eq!(
            err.to_string(),
            "at `Foo.bar[3][\"k\"]`: missing required field `c`"
        );
    }

    #[test]
    fn bare_kind_rendering() {
        let err = SerdeError::custom("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
