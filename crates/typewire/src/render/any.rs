//! The wildcard passthrough: structural conversion with no declared type.

use crate::error::SerdeError;
use crate::render::CallCtx;
use crate::tree::Tree;
use crate::value::Value;

/// Serializes a value structurally. Record values still go through their
/// registered routine so nested typed data inside an `any` field keeps its
/// declared behavior.
pub(crate) fn ser(ctx: &CallCtx<'_>, value: &Value) -> Result<Tree, SerdeError> {
    match value {
        Value::Unit => Ok(Tree::Unit),
        Value::Bool(b) => Ok(Tree::Bool(*b)),
        Value::Int(i) => Ok(Tree::Int(*i)),
        Value::Float(x) => Ok(Tree::Float(*x)),
        Value::Str(s) => Ok(Tree::Str(s.clone())),
        Value::Bytes(b) => Ok(Tree::Bytes(b.clone())),
        Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(ser(ctx, item).map_err(|e| e.with_index(i))?);
            }
            Ok(Tree::Seq(out))
        }
        Value::Map(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let kt = ser(ctx, k).map_err(|e| e.with_key(k.to_string()))?;
                let vt = ser(ctx, v).map_err(|e| e.with_key(k.to_string()))?;
                out.push((kt, vt));
            }
            Ok(Tree::Map(out))
        }
        Value::Record(rv) => {
            let routines = ctx.routines(&rv.key)?;
            (routines.ser)(ctx, value)
        }
    }
}

/// Deserializes a tree structurally: sequences become lists, mappings stay
/// mappings. Never fails.
pub(crate) fn de(tree: &Tree) -> Value {
    match tree {
        Tree::Unit => Value::Unit,
        Tree::Bool(b) => Value::Bool(*b),
        Tree::Int(i) => Value::Int(*i),
        Tree::Float(x) => Value::Float(*x),
        Tree::Str(s) => Value::Str(s.clone()),
        Tree::Bytes(b) => Value::Bytes(b.clone()),
        Tree::Seq(items) => Value::List(items.iter().map(de).collect()),
        Tree::Map(entries) => {
            Value::Map(entries.iter().map(|(k, v)| (de(k), de(v))).collect())
        }
    }
}
