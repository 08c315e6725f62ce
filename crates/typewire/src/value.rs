use core::fmt;

use crate::descriptor::RecordKey;

// -----------------------------------------------------------------------------
// LiteralValue

/// A value usable inside a `Literal{...}` type annotation.
///
/// Restricted to the hashable primitives so literal sets can participate in
/// descriptor equality and registry keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

// -----------------------------------------------------------------------------
// Value

/// A runtime value on the typed side of the engine.
///
/// Generated serialize routines consume a `Value` and emit a
/// [`Tree`](crate::tree::Tree); deserialize routines do the reverse. Typed
/// Rust data enters and leaves this model through the
/// [`ToValue`](crate::ToValue) / [`FromValue`](crate::FromValue) traits,
/// usually implemented by `#[derive(Record)]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent/none marker. Also the payload of an empty optional.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Order-preserving set; duplicates dropped on first occurrence.
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    /// Ordered key/value pairs.
    Map(Vec<(Value, Value)>),
    Record(RecordValue),
}

/// An instance of a decorated record: its identity plus one value per field
/// in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub key: RecordKey,
    pub values: Vec<Value>,
}

impl Value {
    /// Builds a record value from its registry identity and field values
    /// (declared order).
    pub fn record(key: RecordKey, values: Vec<Value>) -> Self {
        Self::Record(RecordValue { key, values })
    }

    /// A short noun for error messages: the "runtime type" of this value.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    #[inline]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Whether this value equals the given literal.
    pub fn matches_literal(&self, lit: &LiteralValue) -> bool {
        match (self, lit) {
            (Self::Bool(a), LiteralValue::Bool(b)) => a == b,
            (Self::Int(a), LiteralValue::Int(b)) => a == b,
            (Self::Str(a), LiteralValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) | Self::Set(items) | Self::Tuple(items) => {
                let (open, close) = match self {
                    Self::Set(_) => ('{', '}'),
                    Self::Tuple(_) => ('(', ')'),
                    _ => ('[', ']'),
                };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Record(rv) => write!(f, "{}(..)", rv.key),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matching() {
        assert!(Value::Int(10).matches_literal(&LiteralValue::Int(10)));
        assert!(!Value::Int(10).matches_literal(&LiteralValue::Bool(true)));
        assert!(Value::Str("light".into()).matches_literal(&"light".into()));
    }

    #[test]
    fn display_is_compact() {
        let v = Value::Map(vec![(Value::from("a"), Value::List(vec![Value::Int(1)]))]);
        assert_eq!(v.to_string(), "{\"a\": [1]}");
    }
}
