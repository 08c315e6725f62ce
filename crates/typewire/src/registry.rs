//! The process registry: record definitions, and the conversion routines
//! generated for each decorated record.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::{HashMap, HashSet};

use crate::api::CallOptions;
use crate::descriptor::{RecordKey, ResolvedRecord, TypeDescriptor};
use crate::error::{DecorateError, DefinitionError, SerdeError, SerdeErrorKind};
use crate::render::{self, CallCtx, DeFn, SerFn};
use crate::resolve::{self, DefNamespace};
use crate::schema::{Check, RecordDef};
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Routines

/// The generated conversion routines for one decorated record, plus the
/// resolved record they were compiled from.
pub(crate) struct Routines {
    pub record: Arc<ResolvedRecord>,
    pub ser: SerFn,
    pub de: DeFn,
    pub ser_tuple: SerFn,
    pub de_tuple: DeFn,
}

// -----------------------------------------------------------------------------
// Options

/// Decoration-time configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecorateOptions {
    /// Strictness baked into the generated routines.
    pub check: Check,
}

impl DecorateOptions {
    pub fn check(mut self, check: Check) -> Self {
        self.check = check;
        self
    }
}

// -----------------------------------------------------------------------------
// Registry

struct Inner {
    /// Definitions by record name; present before routines exist.
    defs: HashMap<String, (RecordDef, Check)>,
    /// Generated routines by instantiation key.
    routines: HashMap<RecordKey, Arc<Routines>>,
    /// Keys currently being decorated; terminates mutual recursion.
    pending: HashSet<RecordKey>,
}

/// Holds every decorated record's definition and generated routines.
///
/// Writes happen only during decoration; conversion calls take short read
/// locks to fetch routines, never holding the lock across a nested call.
/// Registering a key twice overwrites the previous routines (last write
/// wins).
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                defs: HashMap::new(),
                routines: HashMap::new(),
                pending: HashSet::new(),
            }),
        }
    }

    /// The process-wide registry used by the free-function API.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Definitions

    /// Registers a definition without generating routines. Makes the name
    /// resolvable, so mutually referential records can all be defined before
    /// any of them is decorated.
    pub fn define(&self, def: RecordDef) {
        self.define_with(def, Check::default());
    }

    fn define_with(&self, def: RecordDef, check: Check) {
        self.write().defs.insert(def.name.clone(), (def, check));
    }

    pub(crate) fn has_definition(&self, name: &str) -> bool {
        self.read().defs.contains_key(name)
    }

    /// Whether routines exist for this key.
    pub fn is_decorated(&self, key: &RecordKey) -> bool {
        self.read().routines.contains_key(key)
    }

    // -------------------------------------------------------------------------
    // Decoration

    /// Defines and decorates a record, regenerating routines if the name was
    /// decorated before.
    pub fn decorate(&self, def: RecordDef) -> Result<RecordKey, DecorateError> {
        self.decorate_with(def, DecorateOptions::default())
    }

    pub fn decorate_with(
        &self,
        def: RecordDef,
        options: DecorateOptions,
    ) -> Result<RecordKey, DecorateError> {
        let key = RecordKey::new(def.name.clone());
        self.define_with(def, options.check);
        {
            // Drop stale routines for every instantiation of this name.
            let mut inner = self.write();
            inner.routines.retain(|k, _| k.name != key.name);
        }
        self.ensure(&key)?;
        Ok(key)
    }

    /// Decorates one generic instantiation of an already defined record.
    pub fn instantiate(
        &self,
        name: impl Into<Arc<str>>,
        args: Vec<TypeDescriptor>,
    ) -> Result<RecordKey, DecorateError> {
        let key = RecordKey::with_args(name, args);
        self.ensure(&key)?;
        Ok(key)
    }

    /// Generates and registers routines for a key unless they already exist
    /// or the key is being decorated further up the stack. Dependencies are
    /// decorated first.
    pub fn ensure(&self, key: &RecordKey) -> Result<(), DecorateError> {
        {
            let inner = self.read();
            if inner.routines.contains_key(key) || inner.pending.contains(key) {
                return Ok(());
            }
        }
        self.write().pending.insert(key.clone());
        let result = self.render_one(key);
        self.write().pending.remove(key);
        result
    }

    /// The recursion-aware typed decoration path: marks the key pending,
    /// registers the definition, lets the caller decorate dependencies, then
    /// renders.
    pub(crate) fn decorate_typed(
        &self,
        key: &RecordKey,
        def: RecordDef,
        deps: impl FnOnce(&Registry) -> Result<(), DecorateError>,
    ) -> Result<(), DecorateError> {
        {
            let mut inner = self.write();
            // Typed definitions are monomorphic: each generic instantiation
            // supplies its own concrete field annotations, so the stored
            // definition is refreshed before this key renders.
            inner
                .defs
                .insert(def.name.clone(), (def.clone(), Check::default()));
            if inner.routines.contains_key(key) || inner.pending.contains(key) {
                return Ok(());
            }
            inner.pending.insert(key.clone());
        }
        // Render from the definition captured here: decorating a dependency
        // that shares this record's name (a nested instantiation of the same
        // generic) replaces the stored definition.
        let result = deps(self).and_then(|_| self.render_def(key, &def, Check::default()));
        self.write().pending.remove(key);
        result
    }

    fn render_one(&self, key: &RecordKey) -> Result<(), DecorateError> {
        let (def, check) = {
            let inner = self.read();
            match inner.defs.get(&*key.name) {
                Some((def, check)) => (def.clone(), *check),
                None => {
                    return Err(DefinitionError::UnknownDefinition {
                        name: key.name.to_string(),
                    }
                    .into())
                }
            }
        };
        self.render_def(key, &def, check)
    }

    fn render_def(&self, key: &RecordKey, def: &RecordDef, check: Check) -> Result<(), DecorateError> {
        let resolved = resolve::resolve_record(def, &key.args, self, check)?;

        let mut deps = Vec::new();
        for field in &resolved.fields {
            if let crate::descriptor::Binding::Ready(desc) = &field.binding {
                collect_deps(desc, &mut deps);
            }
        }
        for dep in &deps {
            self.ensure(dep)?;
        }

        let routines = render::compile(Arc::new(resolved));
        self.write().routines.insert(key.clone(), Arc::new(routines));
        log::debug!("decorated record `{key}`");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Conversion calls

    pub(crate) fn routines(&self, key: &RecordKey) -> Option<Arc<Routines>> {
        self.read().routines.get(key).cloned()
    }

    fn ctx<'a>(&'a self, options: &CallOptions) -> CallCtx<'a> {
        CallCtx {
            registry: self,
            check: options.check,
            unknown_fields: options.unknown_fields,
        }
    }

    fn call(&self, key: &RecordKey, options: &CallOptions) -> Result<Arc<Routines>, SerdeError> {
        self.ctx(options).routines(key)
    }

    /// Serializes a record value to a generic tree via its routine.
    pub fn to_tree(&self, value: &Value, options: &CallOptions) -> Result<Tree, SerdeError> {
        let rv = expect_record(value)?;
        let routines = self.call(&rv.key, options)?;
        (routines.ser)(&self.ctx(options), value).map_err(|e| e.with_field(rv.key.name.to_string()))
    }

    /// Deserializes a generic tree into a record value.
    pub fn from_tree(
        &self,
        key: &RecordKey,
        tree: &Tree,
        options: &CallOptions,
    ) -> Result<Value, SerdeError> {
        let routines = self.call(key, options)?;
        (routines.de)(&self.ctx(options), tree).map_err(|e| e.with_field(key.name.to_string()))
    }

    /// Serializes a record value to the positional (sequence) shape.
    pub fn to_tuple_tree(&self, value: &Value, options: &CallOptions) -> Result<Tree, SerdeError> {
        let rv = expect_record(value)?;
        let routines = self.call(&rv.key, options)?;
        (routines.ser_tuple)(&self.ctx(options), value)
            .map_err(|e| e.with_field(rv.key.name.to_string()))
    }

    /// Deserializes the positional (sequence) shape into a record value.
    pub fn from_tuple_tree(
        &self,
        key: &RecordKey,
        tree: &Tree,
        options: &CallOptions,
    ) -> Result<Value, SerdeError> {
        let routines = self.call(key, options)?;
        (routines.de_tuple)(&self.ctx(options), tree)
            .map_err(|e| e.with_field(key.name.to_string()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefNamespace for Registry {
    fn has_record(&self, name: &str) -> bool {
        self.has_definition(name)
    }
}

fn expect_record(value: &Value) -> Result<&crate::value::RecordValue, SerdeError> {
    match value {
        Value::Record(rv) => Ok(rv),
        other => Err(SerdeErrorKind::TypeMismatch {
            expected: "record",
            found: other.kind_name().to_owned(),
        }
        .into()),
    }
}

/// Record keys referenced by a descriptor. Self references are excluded:
/// they are by definition already pending or registered.
fn collect_deps(desc: &TypeDescriptor, out: &mut Vec<RecordKey>) {
    match desc {
        TypeDescriptor::Record(key) => {
            if !out.contains(key) {
                out.push(key.clone());
            }
        }
        TypeDescriptor::SelfRef(_)
        | TypeDescriptor::Primitive(_)
        | TypeDescriptor::Any
        | TypeDescriptor::Literal(_)
        | TypeDescriptor::TypeParam(_) => {}
        TypeDescriptor::Optional(inner)
        | TypeDescriptor::List(inner)
        | TypeDescriptor::Set(inner)
        | TypeDescriptor::VariadicTuple(inner) => collect_deps(inner, out),
        TypeDescriptor::FixedTuple(elems) => {
            for elem in elems {
                collect_deps(elem, out);
            }
        }
        TypeDescriptor::Mapping(k, v) => {
            collect_deps(k, out);
            collect_deps(v, out);
        }
        TypeDescriptor::Union(members) => {
            for member in members {
                collect_deps(member, out);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Auto registration

/// A record registration submitted at link time by `#[derive(Record)]` with
/// the `auto_register` attribute.
#[cfg(feature = "auto_register")]
pub struct Registration {
    pub register: fn(&Registry) -> Result<(), DecorateError>,
}

#[cfg(feature = "auto_register")]
inventory::collect!(Registration);

#[cfg(feature = "auto_register")]
impl Registry {
    /// Decorates every record submitted for auto registration.
    pub fn register_collected(&self) -> Result<(), DecorateError> {
        for registration in inventory::iter::<Registration> {
            (registration.register)(self)?;
        }
        Ok(())
    }
}
