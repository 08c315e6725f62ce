//! Serialize-direction rendering: [`Value`] down to [`Tree`].

use std::sync::Arc;

use crate::descriptor::{
    Flatten, PrimitiveKind, RecordKey, ResolvedField, ResolvedRecord, TypeDescriptor,
};
use crate::error::{SerdeError, SerdeErrorKind};
use crate::render::{any, union, CallCtx, SerFn};
use crate::schema::{Check, CustomSer, DefaultPolicy, SkipPredicate, Tagging};
use crate::tree::Tree;
use crate::value::{RecordValue, Value};

// -----------------------------------------------------------------------------
// Descriptor steps

/// Compiles the serialize step for one descriptor.
pub(crate) fn step(desc: &TypeDescriptor, check: Check, tagging: &Tagging) -> SerFn {
    match desc {
        TypeDescriptor::Primitive(kind) => primitive(*kind, check),
        TypeDescriptor::Any | TypeDescriptor::TypeParam(_) => Arc::new(any::ser),
        TypeDescriptor::Optional(inner) => {
            let inner = step(inner, check, tagging);
            Arc::new(move |ctx, value| {
                if value.is_unit() {
                    Ok(Tree::Unit)
                } else {
                    inner(ctx, value)
                }
            })
        }
        TypeDescriptor::List(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, value| match value {
                Value::List(items) => elements(ctx, &elem, items),
                other => Err(mismatch("list", other)),
            })
        }
        TypeDescriptor::Set(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, value| match value {
                Value::Set(items) | Value::List(items) => {
                    let mut seen: Vec<&Value> = Vec::with_capacity(items.len());
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        if seen.contains(&item) {
                            continue;
                        }
                        seen.push(item);
                        out.push(elem(ctx, item).map_err(|e| e.with_index(i))?);
                    }
                    Ok(Tree::Seq(out))
                }
                other => Err(mismatch("set", other)),
            })
        }
        TypeDescriptor::FixedTuple(elems) => {
            let steps: Vec<SerFn> = elems.iter().map(|e| step(e, check, tagging)).collect();
            Arc::new(move |ctx, value| match value {
                Value::Tuple(items) | Value::List(items) => {
                    if items.len() < steps.len() {
                        return Err(SerdeErrorKind::Arity {
                            expected: steps.len(),
                            found: items.len(),
                        }
                        .into());
                    }
                    // Exactly N consumed; anything beyond is dropped.
                    let mut out = Vec::with_capacity(steps.len());
                    for (i, (s, item)) in steps.iter().zip(items).enumerate() {
                        out.push(s(ctx, item).map_err(|e| e.with_index(i))?);
                    }
                    Ok(Tree::Seq(out))
                }
                other => Err(mismatch("tuple", other)),
            })
        }
        TypeDescriptor::VariadicTuple(elem) => {
            let elem = step(elem, check, tagging);
            Arc::new(move |ctx, value| match value {
                Value::Tuple(items) | Value::List(items) => elements(ctx, &elem, items),
                other => Err(mismatch("tuple", other)),
            })
        }
        TypeDescriptor::Mapping(key, val) => {
            let key = step(key, check, tagging);
            let val = step(val, check, tagging);
            Arc::new(move |ctx, value| match value {
                Value::Map(entries) => {
                    let mut out = Vec::with_capacity(entries.len());
                    for (k, v) in entries {
                        let kt = key(ctx, k).map_err(|e| e.with_key(k.to_string()))?;
                        let vt = val(ctx, v).map_err(|e| e.with_key(k.to_string()))?;
                        out.push((kt, vt));
                    }
                    Ok(Tree::Map(out))
                }
                other => Err(mismatch("map", other)),
            })
        }
        TypeDescriptor::Literal(allowed) => {
            let allowed = allowed.clone();
            Arc::new(move |_ctx, value| {
                if allowed.iter().any(|lit| value.matches_literal(lit)) {
                    match value {
                        Value::Bool(b) => Ok(Tree::Bool(*b)),
                        Value::Int(i) => Ok(Tree::Int(*i)),
                        Value::Str(s) => Ok(Tree::Str(s.clone())),
                        // matches_literal only accepts the three above
                        other => Err(mismatch("literal", other)),
                    }
                } else {
                    Err(literal_mismatch(value, &allowed))
                }
            })
        }
        TypeDescriptor::Union(members) => union::ser_step(members, check, tagging),
        TypeDescriptor::Record(key) | TypeDescriptor::SelfRef(key) => {
            record_ref(key.clone(), check)
        }
    }
}

fn elements(ctx: &CallCtx<'_>, elem: &SerFn, items: &[Value]) -> Result<Tree, SerdeError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        out.push(elem(ctx, item).map_err(|e| e.with_index(i))?);
    }
    Ok(Tree::Seq(out))
}

fn mismatch(expected: &'static str, found: &Value) -> SerdeError {
    SerdeErrorKind::TypeMismatch {
        expected,
        found: found.kind_name().to_owned(),
    }
    .into()
}

fn literal_mismatch(value: &Value, allowed: &[crate::value::LiteralValue]) -> SerdeError {
    let allowed = allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    SerdeErrorKind::LiteralMismatch {
        value: value.to_string(),
        allowed,
    }
    .into()
}

// -----------------------------------------------------------------------------
// Primitives

fn primitive(kind: PrimitiveKind, baked: Check) -> SerFn {
    Arc::new(move |ctx, value| match ctx.effective_check(baked) {
        Check::Strict => strict(kind, value),
        Check::Coerce => coerce(kind, value),
        Check::Disabled => any::ser(ctx, value),
    })
}

fn strict(kind: PrimitiveKind, value: &Value) -> Result<Tree, SerdeError> {
    match (kind, value) {
        (PrimitiveKind::Unit, Value::Unit) => Ok(Tree::Unit),
        (PrimitiveKind::Bool, Value::Bool(b)) => Ok(Tree::Bool(*b)),
        (PrimitiveKind::Int, Value::Int(i)) => Ok(Tree::Int(*i)),
        (PrimitiveKind::Float, Value::Float(x)) => Ok(Tree::Float(*x)),
        // Integral runtime values are valid floats in every mode; several
        // formats cannot even distinguish 100 from 100.0.
        (PrimitiveKind::Float, Value::Int(i)) => Ok(Tree::Float(*i as f64)),
        (PrimitiveKind::Str, Value::Str(s)) => Ok(Tree::Str(s.clone())),
        (PrimitiveKind::Bytes, Value::Bytes(b)) => Ok(Tree::Bytes(b.clone())),
        (kind, other) => Err(mismatch(kind.name(), other)),
    }
}

fn coerce(kind: PrimitiveKind, value: &Value) -> Result<Tree, SerdeError> {
    if let Ok(tree) = strict(kind, value) {
        return Ok(tree);
    }
    let coerced = match (kind, value) {
        (PrimitiveKind::Int, Value::Float(x)) if x.fract() == 0.0 => Some(Tree::Int(*x as i64)),
        (PrimitiveKind::Int, Value::Bool(b)) => Some(Tree::Int(i64::from(*b))),
        (PrimitiveKind::Int, Value::Str(s)) => s.trim().parse::<i64>().ok().map(Tree::Int),
        (PrimitiveKind::Float, Value::Str(s)) => s.trim().parse::<f64>().ok().map(Tree::Float),
        (PrimitiveKind::Bool, Value::Int(i)) if *i == 0 || *i == 1 => Some(Tree::Bool(*i == 1)),
        (PrimitiveKind::Bool, Value::Str(s)) => match s.as_str() {
            "true" => Some(Tree::Bool(true)),
            "false" => Some(Tree::Bool(false)),
            _ => None,
        },
        (PrimitiveKind::Str, Value::Bool(b)) => Some(Tree::Str(b.to_string())),
        (PrimitiveKind::Str, Value::Int(i)) => Some(Tree::Str(i.to_string())),
        (PrimitiveKind::Str, Value::Float(x)) => Some(Tree::Str(x.to_string())),
        _ => None,
    };
    coerced.ok_or_else(|| {
        SerdeErrorKind::Coerce {
            expected: kind.name(),
            found: value.to_string(),
        }
        .into()
    })
}

// -----------------------------------------------------------------------------
// Record references

fn record_ref(key: RecordKey, check: Check) -> SerFn {
    Arc::new(move |ctx, value| {
        let Value::Record(rv) = value else {
            return Err(mismatch("record", value));
        };
        if ctx.effective_check(check) != Check::Disabled && rv.key != key {
            return Err(SerdeErrorKind::RecordMismatch {
                expected: key.to_string(),
                found: rv.key.to_string(),
            }
            .into());
        }
        let routines = ctx.routines(&rv.key)?;
        (routines.ser)(ctx, value)
    })
}

// -----------------------------------------------------------------------------
// Record routines

struct FieldSer {
    decl_name: String,
    wire_name: String,
    skip: bool,
    skip_if: Option<SkipPredicate>,
    skip_if_default: bool,
    default: DefaultPolicy,
    flatten: Flatten,
    custom: Option<CustomSer>,
    step: SerFn,
}

impl FieldSer {
    fn compile(field: &ResolvedField, record: &ResolvedRecord) -> Self {
        Self {
            decl_name: field.decl_name.clone(),
            wire_name: field.wire_name.clone(),
            skip: field.skip_on_serialize(),
            skip_if: field.skip_if.clone(),
            skip_if_default: field.skip_if_default,
            default: field.default.clone(),
            flatten: field.flatten,
            custom: field.serializer.clone(),
            step: super::ser_binding(field, &record.key, record.check, &record.tagging),
        }
    }

    /// Whether the value is omitted from output under the skip policies.
    fn skipped(&self, value: &Value) -> bool {
        if self.skip {
            return true;
        }
        if let Some(pred) = &self.skip_if {
            if pred(value) {
                return true;
            }
        }
        if self.skip_if_default {
            if let Some(default) = self.default.produce() {
                return *value == default;
            }
        }
        false
    }

    fn render(&self, ctx: &CallCtx<'_>, value: &Value) -> Result<Tree, SerdeError> {
        match &self.custom {
            // User-callable failures keep their identity, no path wrapping.
            Some(ser) => ser(value),
            None => (self.step)(ctx, value).map_err(|e| e.with_field(&self.decl_name)),
        }
    }
}

fn expect_record<'v>(
    value: &'v Value,
    key: &RecordKey,
    field_count: usize,
) -> Result<&'v RecordValue, SerdeError> {
    let Value::Record(rv) = value else {
        return Err(mismatch("record", value));
    };
    if rv.key != *key {
        return Err(SerdeErrorKind::RecordMismatch {
            expected: key.to_string(),
            found: rv.key.to_string(),
        }
        .into());
    }
    if rv.values.len() != field_count {
        return Err(SerdeErrorKind::Length {
            expected: field_count,
            found: rv.values.len(),
        }
        .into());
    }
    Ok(rv)
}

/// Compiles the named-style serialize routine for a record.
pub(crate) fn record_step(record: &ResolvedRecord) -> SerFn {
    let key = record.key.clone();
    let fields: Vec<FieldSer> = record
        .fields
        .iter()
        .map(|f| FieldSer::compile(f, record))
        .collect();

    if record.transparent {
        // Resolution guarantees exactly one field.
        return Arc::new(move |ctx, value| {
            let rv = expect_record(value, &key, fields.len())?;
            fields[0].render(ctx, &rv.values[0])
        });
    }

    Arc::new(move |ctx, value| {
        let rv = expect_record(value, &key, fields.len())?;
        let mut entries = Vec::with_capacity(fields.len());
        for (field, v) in fields.iter().zip(&rv.values) {
            if field.skipped(v) {
                continue;
            }
            let rendered = field.render(ctx, v)?;
            match field.flatten {
                Flatten::No => entries.push((Tree::key(&field.wire_name), rendered)),
                Flatten::Record | Flatten::Mapping => match rendered {
                    Tree::Map(nested) => entries.extend(nested),
                    other => {
                        return Err(SerdeErrorKind::TypeMismatch {
                            expected: "mapping",
                            found: other.kind_name().to_owned(),
                        }
                        .into())
                    }
                },
            }
        }
        Ok(Tree::Map(entries))
    })
}

/// Compiles the positional-style serialize routine.
///
/// Only statically skipped fields are omitted; value-dependent skips never
/// apply here, so the output arity is stable for a given record. Flattened
/// records splice their own positional elements in place; a flatten-mapping
/// field contributes a single mapping element.
pub(crate) fn tuple_step(record: &ResolvedRecord) -> SerFn {
    let key = record.key.clone();
    let fields: Vec<FieldSer> = record
        .fields
        .iter()
        .map(|f| FieldSer::compile(f, record))
        .collect();
    let nested_keys: Vec<Option<RecordKey>> = record
        .fields
        .iter()
        .map(|f| match (f.flatten, &f.binding) {
            (Flatten::Record, crate::descriptor::Binding::Ready(desc)) => {
                desc.as_record_key().cloned()
            }
            _ => None,
        })
        .collect();

    Arc::new(move |ctx, value| {
        let rv = expect_record(value, &key, fields.len())?;
        let mut items = Vec::with_capacity(fields.len());
        for ((field, nested), v) in fields.iter().zip(&nested_keys).zip(&rv.values) {
            if field.skip {
                continue;
            }
            if let Some(nested_key) = nested {
                let routines = ctx.routines(nested_key)?;
                let rendered = (routines.ser_tuple)(ctx, v)
                    .map_err(|e| e.with_field(&field.decl_name))?;
                match rendered {
                    Tree::Seq(nested_items) => items.extend(nested_items),
                    other => {
                        return Err(SerdeErrorKind::TypeMismatch {
                            expected: "sequence",
                            found: other.kind_name().to_owned(),
                        }
                        .into())
                    }
                }
            } else {
                items.push(field.render(ctx, v)?);
            }
        }
        Ok(Tree::Seq(items))
    })
}
