//! Deserialize-direction rendering: [`Tree`] up to [`Value`].

use std::sync::{Arc, OnceLock};

use hashbrown::HashSet;

use crate::descriptor::{
    Binding, Flatten, PrimitiveKind, RecordKey, ResolvedField, ResolvedRecord, TypeDescriptor,
};
use crate::error::{SerdeError, SerdeErrorKind};
use crate::render::{any, union, CallCtx, DeFn};
use crate::resolve;
use crate::schema::{Check, CustomDe, DefaultPolicy, DeferredFn, Tagging, UnknownFields};
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Descriptor steps

/// Compiles the deserialize step for one descriptor.
pub(crate) fn step(desc: &TypeDescriptor, check: Check, tagging: &Tagging) -> DeFn {
    match desc {
        TypeDescriptor::Primitive(kind) => primitive(*kind, check),
        TypeDescriptor::Any | TypeDescriptor::TypeParam(_) => {
            Arc::new(|_ctx, tree| Ok(any::de(tree)))
        }
        TypeDescriptor::Optional(inner) => {
            let inner = step(inner, check, tagging);
            Arc::new(move |ctx, tree| {
                if tree.is_unit() {
                    Ok(Value::Unit)
                } else {
                    inner(ctx, tree)
                }
            })
        }
        TypeDescriptor::List(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, tree| Ok(Value::List(elements(ctx, &elem, tree)?)))
        }
        TypeDescriptor::Set(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, tree| {
                let items = elements(ctx, &elem, tree)?;
                // First occurrence wins, order preserved.
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !out.contains(&item) {
                        out.push(item);
                    }
                }
                Ok(Value::Set(out))
            })
        }
        TypeDescriptor::FixedTuple(elems) => {
            let steps: Vec<DeFn> = elems.iter().map(|e| step(e, check, tagging)).collect();
            Arc::new(move |ctx, tree| {
                let items = expect_seq(tree)?;
                if items.len() < steps.len() {
                    return Err(SerdeErrorKind::Arity {
                        expected: steps.len(),
                        found: items.len(),
                    }
                    .into());
                }
                // Exactly N consumed; trailing elements are ignored.
                let mut out = Vec::with_capacity(steps.len());
                for (i, (s, item)) in steps.iter().zip(items).enumerate() {
                    out.push(s(ctx, item).map_err(|e| e.with_index(i))?);
                }
                Ok(Value::Tuple(out))
            })
        }
        TypeDescriptor::VariadicTuple(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, tree| Ok(Value::Tuple(elements(ctx, &elem, tree)?)))
        }
        TypeDescriptor::Mapping(key, val) => {
            let key = step(key, check, tagging);
            let val = step(val, check, tagging);
            Arc::new(move |ctx, tree| {
                let entries = expect_map(tree)?;
                let mut out = Vec::with_capacity(entries.len());
                for (kt, vt) in entries {
                    let k = key(ctx, kt).map_err(|e| e.with_key(kt.to_string()))?;
                    let v = val(ctx, vt).map_err(|e| e.with_key(kt.to_string()))?;
                    out.push((k, v));
                }
                Ok(Value::Map(out))
            })
        }
        TypeDescriptor::Literal(allowed) => {
            let allowed = allowed.clone();
            Arc::new(move |_ctx, tree| {
                let candidate = match tree {
                    Tree::Bool(b) => Some(Value::Bool(*b)),
                    Tree::Int(i) => Some(Value::Int(*i)),
                    Tree::Str(s) => Some(Value::Str(s.clone())),
                    _ => None,
                };
                match candidate {
                    Some(v) if allowed.iter().any(|lit| v.matches_literal(lit)) => Ok(v),
                    _ => {
                        let allowed = allowed
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ");
                        Err(SerdeErrorKind::LiteralMismatch {
                            value: tree.to_string(),
                            allowed,
                        }
                        .into())
                    }
                }
            })
        }
        TypeDescriptor::Union(members) => union::de_step(members, check, tagging),
        TypeDescriptor::Record(key) | TypeDescriptor::SelfRef(key) => {
            let key = key.clone();
            Arc::new(move |ctx, tree| {
                let routines = ctx.routines(&key)?;
                (routines.de)(ctx, tree)
            })
        }
    }
}

fn elements(ctx: &CallCtx<'_>, elem: &DeFn, tree: &Tree) -> Result<Vec<Value>, SerdeError> {
    let items = expect_seq(tree)?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        out.push(elem(ctx, item).map_err(|e| e.with_index(i))?);
    }
    Ok(out)
}

fn expect_seq(tree: &Tree) -> Result<&[Tree], SerdeError> {
    tree.as_seq().ok_or_else(|| mismatch("sequence", tree))
}

fn expect_map(tree: &Tree) -> Result<&[(Tree, Tree)], SerdeError> {
    tree.as_map().ok_or_else(|| mismatch("mapping", tree))
}

fn mismatch(expected: &'static str, found: &Tree) -> SerdeError {
    SerdeErrorKind::TypeMismatch {
        expected,
        found: found.kind_name().to_owned(),
    }
    .into()
}

// -----------------------------------------------------------------------------
// Primitives

fn primitive(kind: PrimitiveKind, baked: Check) -> DeFn {
    Arc::new(move |ctx, tree| match ctx.effective_check(baked) {
        Check::Strict => strict(kind, tree),
        Check::Coerce => coerce(kind, tree),
        Check::Disabled => Ok(any::de(tree)),
    })
}

fn strict(kind: PrimitiveKind, tree: &Tree) -> Result<Value, SerdeError> {
    match (kind, tree) {
        (PrimitiveKind::Unit, Tree::Unit) => Ok(Value::Unit),
        (PrimitiveKind::Bool, Tree::Bool(b)) => Ok(Value::Bool(*b)),
        (PrimitiveKind::Int, Tree::Int(i)) => Ok(Value::Int(*i)),
        (PrimitiveKind::Float, Tree::Float(x)) => Ok(Value::Float(*x)),
        // Accepted in every mode: formats do not reliably distinguish
        // integral floats from integers.
        (PrimitiveKind::Float, Tree::Int(i)) => Ok(Value::Float(*i as f64)),
        (PrimitiveKind::Str, Tree::Str(s)) => Ok(Value::Str(s.clone())),
        (PrimitiveKind::Bytes, Tree::Bytes(b)) => Ok(Value::Bytes(b.clone())),
        // Byte strings arrive as integer sequences from formats without a
        // native bytes type.
        (PrimitiveKind::Bytes, Tree::Seq(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Tree::Int(b) if (0..=255).contains(b) => out.push(*b as u8),
                    other => return Err(mismatch("byte", other).with_index(i)),
                }
            }
            Ok(Value::Bytes(out))
        }
        (kind, other) => Err(mismatch(kind.name(), other)),
    }
}

fn coerce(kind: PrimitiveKind, tree: &Tree) -> Result<Value, SerdeError> {
    if let Ok(value) = strict(kind, tree) {
        return Ok(value);
    }
    let coerced = match (kind, tree) {
        (PrimitiveKind::Int, Tree::Float(x)) if x.fract() == 0.0 => Some(Value::Int(*x as i64)),
        (PrimitiveKind::Int, Tree::Bool(b)) => Some(Value::Int(i64::from(*b))),
        (PrimitiveKind::Int, Tree::Str(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
        (PrimitiveKind::Float, Tree::Str(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (PrimitiveKind::Bool, Tree::Int(i)) if *i == 0 || *i == 1 => Some(Value::Bool(*i == 1)),
        (PrimitiveKind::Bool, Tree::Str(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (PrimitiveKind::Str, Tree::Bool(b)) => Some(Value::Str(b.to_string())),
        (PrimitiveKind::Str, Tree::Int(i)) => Some(Value::Str(i.to_string())),
        (PrimitiveKind::Str, Tree::Float(x)) => Some(Value::Str(x.to_string())),
        _ => None,
    };
    coerced.ok_or_else(|| {
        SerdeErrorKind::Coerce {
            expected: kind.name(),
            found: tree.to_string(),
        }
        .into()
    })
}

// -----------------------------------------------------------------------------
// Record routines

/// Whether a field treats an absent wire key as the none value. Deferred
/// bindings cannot know until their thunk resolves, which may be after the
/// routine was compiled.
enum Optionality {
    Known(bool),
    Deferred {
        thunk: DeferredFn,
        record: RecordKey,
        cell: OnceLock<bool>,
    },
}

struct FieldDe {
    decl_name: String,
    wire_name: String,
    aliases: Vec<String>,
    skip: bool,
    default: DefaultPolicy,
    /// Optional fields treat an absent wire key as the none value.
    optional: Optionality,
    flatten: Flatten,
    /// Target of a flatten-record field.
    nested: Option<RecordKey>,
    custom: Option<CustomDe>,
    step: DeFn,
}

impl FieldDe {
    fn compile(field: &ResolvedField, record: &ResolvedRecord) -> Self {
        let (optional, nested) = match &field.binding {
            Binding::Ready(desc) => (
                Optionality::Known(matches!(desc, TypeDescriptor::Optional(_))),
                match field.flatten {
                    Flatten::Record => desc.as_record_key().cloned(),
                    _ => None,
                },
            ),
            Binding::Deferred(thunk) => (
                Optionality::Deferred {
                    thunk: thunk.clone(),
                    record: record.key.clone(),
                    cell: OnceLock::new(),
                },
                None,
            ),
        };
        Self {
            decl_name: field.decl_name.clone(),
            wire_name: field.wire_name.clone(),
            aliases: field.aliases.clone(),
            skip: field.skip_on_deserialize(),
            default: field.default.clone(),
            optional,
            flatten: field.flatten,
            nested,
            custom: field.deserializer.clone(),
            step: super::de_binding(field, &record.key, record.check, &record.tagging),
        }
    }

    fn lookup<'t>(&self, entries: &'t [(Tree, Tree)]) -> Option<&'t Tree> {
        let find = |name: &str| {
            entries
                .iter()
                .find(|(k, _)| matches!(k, Tree::Str(s) if s == name))
                .map(|(_, v)| v)
        };
        find(&self.wire_name).or_else(|| self.aliases.iter().find_map(|a| find(a)))
    }

    fn render(&self, ctx: &CallCtx<'_>, tree: &Tree) -> Result<Value, SerdeError> {
        match &self.custom {
            // User-callable failures keep their identity, no path wrapping.
            Some(de) => de(tree),
            None => (self.step)(ctx, tree).map_err(|e| e.with_field(&self.decl_name)),
        }
    }

    /// The value of a field without wire data.
    fn absent(&self, ctx: &CallCtx<'_>) -> Result<Value, SerdeError> {
        if let Some(default) = self.default.produce() {
            return Ok(default);
        }
        if self.is_optional(ctx)? {
            return Ok(Value::Unit);
        }
        Err(SerdeErrorKind::MissingField {
            field: self.wire_name.clone(),
        }
        .into())
    }

    /// Resolves deferred bindings on first use and caches the answer on
    /// success, mirroring how the conversion step itself resolves.
    fn is_optional(&self, ctx: &CallCtx<'_>) -> Result<bool, SerdeError> {
        match &self.optional {
            Optionality::Known(known) => Ok(*known),
            Optionality::Deferred {
                thunk,
                record,
                cell,
            } => {
                if let Some(known) = cell.get() {
                    return Ok(*known);
                }
                let desc =
                    resolve::resolve_deferred(thunk, record, &self.decl_name, ctx.registry)
                        .map_err(|err| SerdeError::custom(err.to_string()))?;
                Ok(*cell.get_or_init(|| matches!(desc, TypeDescriptor::Optional(_))))
            }
        }
    }
}

/// All wire keys claimed by a record's own fields, including those of
/// flattened nested records. Computed at call time since flattened targets
/// are registry lookups.
fn claimed_keys(
    ctx: &CallCtx<'_>,
    fields: &[FieldDe],
    out: &mut HashSet<String>,
) -> Result<(), SerdeError> {
    for field in fields {
        match (&field.flatten, &field.nested) {
            (Flatten::Record, Some(key)) => {
                let routines = ctx.routines(key)?;
                let nested: Vec<FieldDe> = routines
                    .record
                    .fields
                    .iter()
                    .map(|f| FieldDe::compile(f, &routines.record))
                    .collect();
                claimed_keys(ctx, &nested, out)?;
            }
            (Flatten::Mapping, _) => {}
            _ => {
                out.insert(field.wire_name.clone());
                out.extend(field.aliases.iter().cloned());
            }
        }
    }
    Ok(())
}

/// Compiles the named-style deserialize routine for a record.
pub(crate) fn record_step(record: &ResolvedRecord) -> DeFn {
    let key = record.key.clone();
    let fields: Vec<FieldDe> = record
        .fields
        .iter()
        .map(|f| FieldDe::compile(f, record))
        .collect();

    if record.transparent {
        return Arc::new(move |ctx, tree| {
            let value = fields[0].render(ctx, tree)?;
            Ok(Value::record(key.clone(), vec![value]))
        });
    }

    let unknown = record.unknown_fields;
    let has_flatten_mapping = fields.iter().any(|f| f.flatten == Flatten::Mapping);

    Arc::new(move |ctx, tree| {
        let entries = expect_map(tree)?;
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            if field.skip {
                values.push(field.absent(ctx)?);
                continue;
            }
            let value = match (&field.flatten, &field.nested) {
                (Flatten::Record, Some(nested_key)) => {
                    let routines = ctx.routines(nested_key)?;
                    // Sibling keys share this namespace; the nested routine
                    // must not reject them as unknown.
                    (routines.de)(&ctx.ignoring_unknown(), tree)
                        .map_err(|e| e.with_field(&field.decl_name))?
                }
                (Flatten::Mapping, _) => {
                    let mut claimed = HashSet::new();
                    claimed_keys(ctx, &fields, &mut claimed)?;
                    let rest: Vec<(Tree, Tree)> = entries
                        .iter()
                        .filter(|(k, _)| !matches!(k, Tree::Str(s) if claimed.contains(s)))
                        .cloned()
                        .collect();
                    field.render(ctx, &Tree::Map(rest))?
                }
                _ => match field.lookup(entries) {
                    Some(found) => field.render(ctx, found)?,
                    None => field.absent(ctx)?,
                },
            };
            values.push(value);
        }

        if ctx.effective_unknown(unknown) == UnknownFields::Reject && !has_flatten_mapping {
            let mut claimed = HashSet::new();
            claimed_keys(ctx, &fields, &mut claimed)?;
            for (k, _) in entries {
                if let Tree::Str(s) = k {
                    if !claimed.contains(s) {
                        return Err(SerdeErrorKind::UnknownField { field: s.clone() }.into());
                    }
                }
            }
        }

        Ok(Value::record(key.clone(), values))
    })
}

/// Positional element count of a record, flattened records expanded.
fn positional_arity(ctx: &CallCtx<'_>, key: &RecordKey) -> Result<usize, SerdeError> {
    let routines = ctx.routines(key)?;
    let mut n = 0;
    for field in &routines.record.fields {
        if field.skip_on_serialize() {
            continue;
        }
        match (&field.flatten, &field.binding) {
            (Flatten::Record, Binding::Ready(desc)) => {
                if let Some(nested) = desc.as_record_key() {
                    n += positional_arity(ctx, nested)?;
                }
            }
            _ => n += 1,
        }
    }
    Ok(n)
}

/// Compiles the positional-style deserialize routine.
pub(crate) fn tuple_step(record: &ResolvedRecord) -> DeFn {
    let key = record.key.clone();
    let fields: Vec<FieldDe> = record
        .fields
        .iter()
        .map(|f| FieldDe::compile(f, record))
        .collect();
    // Mirrors the serializer's slot layout: statically unserialized fields
    // occupy no position.
    let slotless: Vec<bool> = record
        .fields
        .iter()
        .map(|f| f.skip_on_serialize())
        .collect();

    Arc::new(move |ctx, tree| {
        let items = expect_seq(tree)?;
        let mut values = Vec::with_capacity(fields.len());
        let mut cursor = 0usize;
        for (field, slotless) in fields.iter().zip(&slotless) {
            if *slotless {
                values.push(field.absent(ctx)?);
                continue;
            }
            let value = if let Some(nested_key) = &field.nested {
                let n = positional_arity(ctx, nested_key)?;
                if items.len() < cursor + n {
                    return Err(SerdeErrorKind::Arity {
                        expected: cursor + n,
                        found: items.len(),
                    }
                    .into());
                }
                let slice = Tree::Seq(items[cursor..cursor + n].to_vec());
                cursor += n;
                let routines = ctx.routines(nested_key)?;
                (routines.de_tuple)(ctx, &slice).map_err(|e| e.with_field(&field.decl_name))?
            } else {
                let Some(item) = items.get(cursor) else {
                    return Err(SerdeErrorKind::Arity {
                        expected: cursor + 1,
                        found: items.len(),
                    }
                    .into());
                };
                cursor += 1;
                if field.skip {
                    // Slot present on the wire but the field never reads it.
                    field.absent(ctx)?
                } else {
                    field.render(ctx, item)?
                }
            };
            values.push(value);
        }
        Ok(Value::record(key.clone(), values))
    })
}
