//! The render engine: compiles a [`ResolvedRecord`] into dedicated
//! conversion closures, one set per registered record.
//!
//! Rendering happens once, at decoration time. The produced closures do no
//! type dispatch of their own beyond matching the incoming value shape; the
//! declared type structure is baked into the closure tree. Registry lookups
//! remain only where they must: record references and self references are
//! resolved at call time so recursive types terminate.

mod any;
mod de;
mod ser;
mod union;

use std::sync::{Arc, OnceLock};

use crate::descriptor::{Binding, RecordKey, ResolvedField, ResolvedRecord};
use crate::error::{SerdeError, SerdeErrorKind};
use crate::registry::{Registry, Routines};
use crate::resolve;
use crate::schema::{Check, Tagging, UnknownFields};
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Closure types

/// A generated serialize step: runtime value in, wire tree out.
pub(crate) type SerFn = Arc<dyn Fn(&CallCtx<'_>, &Value) -> Result<Tree, SerdeError> + Send + Sync>;

/// A generated deserialize step: wire tree in, runtime value out.
pub(crate) type DeFn = Arc<dyn Fn(&CallCtx<'_>, &Tree) -> Result<Value, SerdeError> + Send + Sync>;

// -----------------------------------------------------------------------------
// Call context

/// Per-call state threaded through every generated closure: the registry to
/// resolve record references against, plus call-level policy overrides.
pub(crate) struct CallCtx<'a> {
    pub registry: &'a Registry,
    /// Overrides the strictness baked into each routine when set.
    pub check: Option<Check>,
    /// Overrides each record's unknown-field policy when set.
    pub unknown_fields: Option<UnknownFields>,
}

impl<'a> CallCtx<'a> {
    #[inline]
    pub(crate) fn effective_check(&self, baked: Check) -> Check {
        self.check.unwrap_or(baked)
    }

    #[inline]
    pub(crate) fn effective_unknown(&self, baked: UnknownFields) -> UnknownFields {
        self.unknown_fields.unwrap_or(baked)
    }

    /// A derived context for rendering a flattened nested record: its keys
    /// share the parent namespace, so unknown siblings must not be rejected
    /// by the nested routine.
    pub(crate) fn ignoring_unknown(&self) -> CallCtx<'a> {
        CallCtx {
            registry: self.registry,
            check: self.check,
            unknown_fields: Some(UnknownFields::Ignore),
        }
    }

    /// Fetches the routines for a record reference. Holds the registry read
    /// lock only for the lookup itself, never across a nested call.
    pub(crate) fn routines(&self, key: &RecordKey) -> Result<Arc<Routines>, SerdeError> {
        match self.registry.routines(key) {
            Some(routines) => Ok(routines),
            None if self.registry.has_definition(&key.name) => {
                Err(SerdeErrorKind::NotDecorated {
                    key: key.to_string(),
                }
                .into())
            }
            None => Err(SerdeErrorKind::UnknownType {
                name: key.to_string(),
            }
            .into()),
        }
    }
}

// -----------------------------------------------------------------------------
// Compilation

/// Compiles all four conversion routines for a resolved record.
pub(crate) fn compile(record: Arc<ResolvedRecord>) -> Routines {
    Routines {
        ser: ser::record_step(&record),
        de: de::record_step(&record),
        ser_tuple: ser::tuple_step(&record),
        de_tuple: de::tuple_step(&record),
        record,
    }
}

// -----------------------------------------------------------------------------
// Field bindings

/// The serialize step for one field's declared type, lazily compiled when
/// the binding is deferred.
pub(crate) fn ser_binding(
    field: &ResolvedField,
    record: &RecordKey,
    check: Check,
    tagging: &Tagging,
) -> SerFn {
    match &field.binding {
        Binding::Ready(desc) => ser::step(desc, check, tagging),
        Binding::Deferred(thunk) => {
            let thunk = thunk.clone();
            let record = record.clone();
            let field_name = field.decl_name.clone();
            let tagging = tagging.clone();
            let cell: OnceLock<SerFn> = OnceLock::new();
            Arc::new(move |ctx, value| {
                if let Some(step) = cell.get() {
                    return step(ctx, value);
                }
                let desc = resolve::resolve_deferred(&thunk, &record, &field_name, ctx.registry)
                    .map_err(|err| SerdeError::custom(err.to_string()))?;
                let step = cell
                    .get_or_init(|| ser::step(&desc, check, &tagging))
                    .clone();
                step(ctx, value)
            })
        }
    }
}

/// The deserialize step for one field's declared type; deferred bindings
/// resolve on first invocation and cache on success.
pub(crate) fn de_binding(
    field: &ResolvedField,
    record: &RecordKey,
    check: Check,
    tagging: &Tagging,
) -> DeFn {
    match &field.binding {
        Binding::Ready(desc) => de::step(desc, check, tagging),
        Binding::Deferred(thunk) => {
            let thunk = thunk.clone();
            let record = record.clone();
            let field_name = field.decl_name.clone();
            let tagging = tagging.clone();
            let cell: OnceLock<DeFn> = OnceLock::new();
            Arc::new(move |ctx, tree| {
                if let Some(step) = cell.get() {
                    return step(ctx, tree);
                }
                let desc = resolve::resolve_deferred(&thunk, &record, &field_name, ctx.registry)
                    .map_err(|err| SerdeError::custom(err.to_string()))?;
                let step = cell
                    .get_or_init(|| de::step(&desc, check, &tagging))
                    .clone();
                step(ctx, tree)
            })
        }
    }
}
