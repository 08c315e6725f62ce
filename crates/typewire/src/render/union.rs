//! Union member selection and tagging.
//!
//! Serialize direction selects a member by exact runtime identity: the value
//! variant kind, and for record values the exact registry key. Structural
//! compatibility is never used to pick a member. Deserialize direction is
//! driven by the tagging policy; the untagged and external fallback paths
//! attempt members in declared order and keep every rejection for the final
//! error.

use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::{SerdeError, SerdeErrorKind, UnionAttempts};
use crate::render::{de, ser, DeFn, SerFn};
use crate::schema::{Check, Tagging};
use crate::tree::Tree;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Identity matching

/// Whether a runtime value *is* a member of the declared type, by identity.
fn member_matches(desc: &TypeDescriptor, value: &Value) -> bool {
    use crate::descriptor::PrimitiveKind as P;
    match desc {
        TypeDescriptor::Primitive(kind) => matches!(
            (kind, value),
            (P::Unit, Value::Unit)
                | (P::Bool, Value::Bool(_))
                | (P::Int, Value::Int(_))
                | (P::Float, Value::Float(_))
                | (P::Str, Value::Str(_))
                | (P::Bytes, Value::Bytes(_))
        ),
        TypeDescriptor::Any | TypeDescriptor::TypeParam(_) => true,
        TypeDescriptor::Optional(inner) => value.is_unit() || member_matches(inner, value),
        TypeDescriptor::List(_) => matches!(value, Value::List(_)),
        TypeDescriptor::Set(_) => matches!(value, Value::Set(_)),
        TypeDescriptor::FixedTuple(_) | TypeDescriptor::VariadicTuple(_) => {
            matches!(value, Value::Tuple(_))
        }
        TypeDescriptor::Mapping(..) => matches!(value, Value::Map(_)),
        TypeDescriptor::Literal(allowed) => allowed.iter().any(|lit| value.matches_literal(lit)),
        TypeDescriptor::Union(members) => members.iter().any(|m| member_matches(m, value)),
        TypeDescriptor::Record(key) | TypeDescriptor::SelfRef(key) => {
            matches!(value, Value::Record(rv) if rv.key == *key)
        }
    }
}

fn member_names(members: &[Member]) -> String {
    members
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

struct Member {
    desc: TypeDescriptor,
    name: String,
    is_record: bool,
    ser: SerFn,
    de: DeFn,
}

fn compile(members: &[TypeDescriptor], check: Check, tagging: &Tagging) -> Vec<Member> {
    members
        .iter()
        .map(|desc| Member {
            name: desc.member_name(),
            is_record: desc.as_record_key().is_some(),
            ser: ser::step(desc, check, tagging),
            de: de::step(desc, check, tagging),
            desc: desc.clone(),
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Serialize

pub(crate) fn ser_step(
    members: &[TypeDescriptor],
    check: Check,
    tagging: &Tagging,
) -> SerFn {
    let members = compile(members, check, tagging);
    let tagging = tagging.clone();

    Arc::new(move |ctx, value| {
        let Some(member) = members.iter().find(|m| member_matches(&m.desc, value)) else {
            return Err(SerdeErrorKind::NoMemberForValue {
                value: value.to_string(),
                found: value.kind_name(),
                members: member_names(&members),
            }
            .into());
        };
        let rendered = (member.ser)(ctx, value)?;
        match &tagging {
            Tagging::External => {
                if member.is_record {
                    Ok(Tree::Map(vec![(Tree::key(&member.name), rendered)]))
                } else {
                    Ok(rendered)
                }
            }
            Tagging::Internal { tag } => match rendered {
                Tree::Map(mut entries) => {
                    entries.insert(0, (Tree::key(tag), Tree::key(&member.name)));
                    Ok(Tree::Map(entries))
                }
                other => Err(SerdeErrorKind::TypeMismatch {
                    expected: "mapping",
                    found: other.kind_name().to_owned(),
                }
                .into()),
            },
            Tagging::Adjacent { tag, content } => Ok(Tree::Map(vec![
                (Tree::key(tag), Tree::key(&member.name)),
                (Tree::key(content), rendered),
            ])),
            Tagging::Untagged => Ok(rendered),
        }
    })
}

// -----------------------------------------------------------------------------
// Deserialize

pub(crate) fn de_step(
    members: &[TypeDescriptor],
    check: Check,
    tagging: &Tagging,
) -> DeFn {
    let members = compile(members, check, tagging);
    let tagging = tagging.clone();

    Arc::new(move |ctx, tree| match &tagging {
        Tagging::External => {
            if let Some(entries) = tree.as_map() {
                if let [(Tree::Str(name), inner)] = entries {
                    if let Some(member) =
                        members.iter().find(|m| m.is_record && m.name == *name)
                    {
                        return (member.de)(ctx, inner);
                    }
                }
            }
            ordered_attempts(ctx, &members, tree, |m| !m.is_record)
        }
        Tagging::Internal { tag } => {
            let entries = tree
                .as_map()
                .ok_or_else(|| expected_mapping(tree))?;
            let member = tagged_member(&members, tree, tag)?;
            // The member's own routine must not see the discriminator.
            let rest: Vec<(Tree, Tree)> = entries
                .iter()
                .filter(|(k, _)| !matches!(k, Tree::Str(s) if s == tag))
                .cloned()
                .collect();
            (member.de)(ctx, &Tree::Map(rest))
        }
        Tagging::Adjacent { tag, content } => {
            tree.as_map().ok_or_else(|| expected_mapping(tree))?;
            let member = tagged_member(&members, tree, tag)?;
            let inner = tree.get(content).ok_or_else(|| {
                SerdeError::from(SerdeErrorKind::MissingContent {
                    key: content.clone(),
                })
            })?;
            (member.de)(ctx, inner)
        }
        Tagging::Untagged => ordered_attempts(ctx, &members, tree, |_| true),
    })
}

fn expected_mapping(tree: &Tree) -> SerdeError {
    SerdeErrorKind::TypeMismatch {
        expected: "mapping",
        found: tree.kind_name().to_owned(),
    }
    .into()
}

fn tagged_member<'m>(
    members: &'m [Member],
    tree: &Tree,
    tag: &str,
) -> Result<&'m Member, SerdeError> {
    let name = match tree.get(tag) {
        Some(Tree::Str(name)) => name,
        _ => {
            return Err(SerdeErrorKind::MissingTag {
                key: tag.to_owned(),
            }
            .into())
        }
    };
    members.iter().find(|m| m.name == *name).ok_or_else(|| {
        SerdeErrorKind::UnknownTag {
            tag: name.clone(),
            expected: member_names(members),
        }
        .into()
    })
}

/// Declared order, first success wins; every rejection is kept so the final
/// error reports all of them.
fn ordered_attempts(
    ctx: &crate::render::CallCtx<'_>,
    members: &[Member],
    tree: &Tree,
    eligible: impl Fn(&Member) -> bool,
) -> Result<Value, SerdeError> {
    let mut attempts = Vec::new();
    for member in members.iter().filter(|m| eligible(m)) {
        match (member.de)(ctx, tree) {
            Ok(value) => return Ok(value),
            Err(err) => attempts.push((member.name.clone(), err)),
        }
    }
    if attempts.is_empty() {
        return Err(SerdeErrorKind::NoMemberForValue {
            value: tree.to_string(),
            found: tree.kind_name(),
            members: member_names(members),
        }
        .into());
    }
    Err(SerdeErrorKind::UnionNoMatch(UnionAttempts(attempts)).into())
}
