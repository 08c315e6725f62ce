use core::fmt;

// -----------------------------------------------------------------------------
// Tree

/// The intermediate tree-of-primitives the format codecs encode and decode.
///
/// Only primitives and containers appear here: numbers, strings, booleans,
/// the null marker, byte strings, sequences, and ordered-pair mappings.
/// Mapping keys may be arbitrary trees; a format that cannot represent
/// non-string keys coerces or rejects them on its side, never here.
///
/// `Tree` implements [`serde_core::Serialize`] and
/// [`serde_core::Deserialize`] (see the [`codec`](crate::codec) module), so
/// any serde-compatible format can act as a wire codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Tree>),
    Map(Vec<(Tree, Tree)>),
}

impl Tree {
    /// A short noun for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }

    #[inline]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Convenience: builds a map entry key.
    pub fn key(name: impl Into<String>) -> Self {
        Self::Str(name.into())
    }

    /// Looks up a string-keyed entry of a mapping tree.
    pub fn get(&self, name: &str) -> Option<&Tree> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Self::Str(s) if s == name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Tree, Tree)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Tree]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
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
        }
    }
}

impl From<bool> for Tree {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Tree {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Tree {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Tree {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Tree {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
