use core::fmt;
use std::sync::Arc;

use crate::annotation::Annotation;
use crate::error::SerdeError;
use crate::rename::NameRule;
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Callables

/// Per-field skip predicate, evaluated against the runtime value at
/// serialize time.
pub type SkipPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// User-supplied field serializer. Errors returned from it propagate as-is,
/// without gaining path context, so user-code failures keep their identity.
pub type CustomSer = Arc<dyn Fn(&Value) -> Result<Tree, SerdeError> + Send + Sync>;

/// User-supplied field deserializer; same pass-through error contract as
/// [`CustomSer`].
pub type CustomDe = Arc<dyn Fn(&Tree) -> Result<Value, SerdeError> + Send + Sync>;

/// Default-value factory.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Lazily evaluated annotation thunk.
pub type DeferredFn = Arc<dyn Fn() -> Annotation + Send + Sync>;

// -----------------------------------------------------------------------------
// Policies

/// Strictness of primitive conversion, baked into generated routines at
/// decoration time (overridable per call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Check {
    /// Wire types must match the declared types exactly.
    #[default]
    Strict,
    /// Attempt standard conversions: numeric strings, bool-as-int,
    /// int-as-float. Record-to-record coercion is never attempted.
    Coerce,
    /// No checking, no coercion. Fastest, unsafe.
    Disabled,
}

/// How a union member's identity is encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tagging {
    /// `{member_name: value}` for record members, bare for the rest.
    External,
    /// A `{tag: member_name}` entry merged into the member's own mapping.
    Internal { tag: String },
    /// `{tag: member_name, content: value}`.
    Adjacent { tag: String, content: String },
    /// No discriminator; members attempted in declared order on input.
    Untagged,
}

impl Tagging {
    pub fn internal(tag: impl Into<String>) -> Self {
        Self::Internal { tag: tag.into() }
    }

    pub fn adjacent(tag: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Adjacent {
            tag: tag.into(),
            content: content.into(),
        }
    }
}

impl Default for Tagging {
    fn default() -> Self {
        Self::External
    }
}

/// What to do with wire keys no field claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFields {
    #[default]
    Ignore,
    Reject,
}

/// What a field falls back to when absent from wire data.
#[derive(Clone, Default)]
pub enum DefaultPolicy {
    #[default]
    Required,
    Value(Value),
    Factory(DefaultFactory),
}

impl DefaultPolicy {
    #[inline]
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Produces the default, if one is declared.
    pub fn produce(&self) -> Option<Value> {
        match self {
            Self::Required => None,
            Self::Value(v) => Some(v.clone()),
            Self::Factory(f) => Some(f()),
        }
    }
}

impl fmt::Debug for DefaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("Required"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldDef

/// A declared field, before resolution. Construct with [`FieldDef::new`]
/// and chain the builder methods.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub annotation: Annotation,
    pub rename: Option<String>,
    pub aliases: Vec<String>,
    pub default: DefaultPolicy,
    pub skip: bool,
    pub skip_serializing: bool,
    pub skip_deserializing: bool,
    pub skip_if: Option<SkipPredicate>,
    pub skip_if_default: bool,
    pub flatten: bool,
    pub serializer: Option<CustomSer>,
    pub deserializer: Option<CustomDe>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            annotation,
            rename: None,
            aliases: Vec::new(),
            default: DefaultPolicy::Required,
            skip: false,
            skip_serializing: false,
            skip_deserializing: false,
            skip_if: None,
            skip_if_default: false,
            flatten: false,
            serializer: None,
            deserializer: None,
        }
    }

    /// Explicit wire name; takes precedence over the record's rename rule.
    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    /// An alternate accepted wire name on input. Probed after the primary
    /// name, in declaration order, first match wins.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultPolicy::Value(value.into());
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultPolicy::Factory(Arc::new(factory));
        self
    }

    /// Never serialized, never deserialized; requires a default.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn skip_serializing(mut self) -> Self {
        self.skip_serializing = true;
        self
    }

    /// Requires a default.
    pub fn skip_deserializing(mut self) -> Self {
        self.skip_deserializing = true;
        self
    }

    /// Omit from output when the predicate returns true.
    pub fn skip_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.skip_if = Some(Arc::new(predicate));
        self
    }

    /// Omit from output when the value equals the declared default.
    pub fn skip_if_default(mut self) -> Self {
        self.skip_if_default = true;
        self
    }

    /// Hoist this field's record/mapping content into the parent's wire
    /// namespace.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    pub fn serialize_with<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Value) -> Result<Tree, SerdeError> + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn deserialize_with<F>(mut self, deserializer: F) -> Self
    where
        F: Fn(&Tree) -> Result<Value, SerdeError> + Send + Sync + 'static,
    {
        self.deserializer = Some(Arc::new(deserializer));
        self
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("annotation", &self.annotation)
            .field("rename", &self.rename)
            .field("flatten", &self.flatten)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// RecordDef

/// A record definition: the input to decoration.
///
/// Built by `#[derive(Record)]` or by hand for dynamic schemas:
///
/// ```
/// use typewire::{Annotation, FieldDef, RecordDef};
///
/// let def = RecordDef::new("Pri")
///     .field(FieldDef::new("i", Annotation::INT))
///     .field(FieldDef::new("s", Annotation::STR));
/// ```
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: String,
    /// Generic parameter names, in declaration order. Empty for concrete
    /// records (including derive-produced monomorphic instantiations).
    pub type_params: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub rename_all: NameRule,
    /// Governs unions among this record's fields.
    pub tagging: Tagging,
    pub transparent: bool,
    pub unknown_fields: UnknownFields,
    /// Record-level skip-if-default, overridable per field.
    pub skip_if_default_all: bool,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            fields: Vec::new(),
            rename_all: NameRule::Preserve,
            tagging: Tagging::External,
            transparent: false,
            unknown_fields: UnknownFields::Ignore,
            skip_if_default_all: false,
        }
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn rename_all(mut self, rule: NameRule) -> Self {
        self.rename_all = rule;
        self
    }

    pub fn tagging(mut self, tagging: Tagging) -> Self {
        self.tagging = tagging;
        self
    }

    /// Single-field records serialize as their one field's bare value.
    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn deny_unknown_fields(mut self) -> Self {
        self.unknown_fields = UnknownFields::Reject;
        self
    }

    pub fn skip_if_default_all(mut self) -> Self {
        self.skip_if_default_all = true;
        self
    }
}
