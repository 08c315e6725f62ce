//! The type resolver: normalizes declared [`Annotation`]s into
//! [`TypeDescriptor`]s, substitutes generic parameters, detects
//! self-references, and validates record declarations.

use crate::annotation::Annotation;
use crate::descriptor::{Binding, Flatten, RecordKey, ResolvedField, ResolvedRecord};
use crate::descriptor::TypeDescriptor;
use crate::error::{DecorateError, DefinitionError, UnresolvedKind, UnresolvedTypeError};
use crate::schema::{Check, DeferredFn, RecordDef, Tagging};

// -----------------------------------------------------------------------------
// Namespace

/// The set of record names known at resolution time. Implemented by the
/// registry; abstracted so resolution stays a pure function of its inputs.
pub(crate) trait DefNamespace {
    fn has_record(&self, name: &str) -> bool;
}

// -----------------------------------------------------------------------------
// Context

struct Ctx<'a> {
    record: &'a str,
    field: &'a str,
    self_key: &'a RecordKey,
    params: &'a [String],
    bindings: &'a [(String, TypeDescriptor)],
    ns: &'a dyn DefNamespace,
}

impl Ctx<'_> {
    fn unresolved(&self, kind: UnresolvedKind) -> DecorateError {
        UnresolvedTypeError {
            record: self.record.to_owned(),
            field: self.field.to_owned(),
            kind,
        }
        .into()
    }
}

// -----------------------------------------------------------------------------
// Context-free lowering

/// Lowers an annotation into a descriptor without consulting any namespace.
///
/// Used to derive [`RecordKey`]s for typed values: a `Named` reference
/// becomes a `Record` descriptor whether or not the target exists, quoted
/// references and unbound parameters widen to `Any`. The real resolver is
/// the one that diagnoses dangling names; this one must agree with it on
/// every annotation both can handle, since registry keys computed here and
/// there must be identical.
pub fn lower(ann: &Annotation) -> TypeDescriptor {
    match ann {
        Annotation::Primitive(kind) => TypeDescriptor::Primitive(*kind),
        Annotation::Any | Annotation::Quoted(_) => TypeDescriptor::Any,
        Annotation::Optional(inner) => TypeDescriptor::Optional(Box::new(lower(inner))),
        Annotation::List(elem) => TypeDescriptor::List(Box::new(lower(elem))),
        Annotation::Set(elem) => TypeDescriptor::Set(Box::new(lower(elem))),
        Annotation::FixedTuple(elems) => {
            TypeDescriptor::FixedTuple(elems.iter().map(lower).collect())
        }
        Annotation::VariadicTuple(elem) => TypeDescriptor::VariadicTuple(Box::new(lower(elem))),
        Annotation::Map(k, v) => TypeDescriptor::Mapping(Box::new(lower(k)), Box::new(lower(v))),
        Annotation::Literal(values) => TypeDescriptor::Literal(values.clone()),
        Annotation::Union(members) => TypeDescriptor::Union(members.iter().map(lower).collect()),
        Annotation::Named { name, args } => {
            TypeDescriptor::Record(RecordKey::with_args(
                name.clone(),
                args.iter().map(lower).collect(),
            ))
        }
        Annotation::Deferred(thunk) => lower(&thunk()),
        Annotation::TypeParam(name) => TypeDescriptor::TypeParam(name.as_str().into()),
    }
}

// -----------------------------------------------------------------------------
// Resolution

fn resolve_annotation(ann: &Annotation, ctx: &Ctx<'_>) -> Result<TypeDescriptor, DecorateError> {
    match ann {
        Annotation::Primitive(kind) => Ok(TypeDescriptor::Primitive(*kind)),
        Annotation::Any => Ok(TypeDescriptor::Any),
        Annotation::Optional(inner) => Ok(TypeDescriptor::Optional(Box::new(resolve_annotation(
            inner, ctx,
        )?))),
        Annotation::List(elem) => Ok(TypeDescriptor::List(Box::new(resolve_annotation(
            elem, ctx,
        )?))),
        Annotation::Set(elem) => Ok(TypeDescriptor::Set(Box::new(resolve_annotation(
            elem, ctx,
        )?))),
        Annotation::FixedTuple(elems) => Ok(TypeDescriptor::FixedTuple(
            elems
                .iter()
                .map(|e| resolve_annotation(e, ctx))
                .collect::<Result<_, _>>()?,
        )),
        Annotation::VariadicTuple(elem) => Ok(TypeDescriptor::VariadicTuple(Box::new(
            resolve_annotation(elem, ctx)?,
        ))),
        Annotation::Map(k, v) => Ok(TypeDescriptor::Mapping(
            Box::new(resolve_annotation(k, ctx)?),
            Box::new(resolve_annotation(v, ctx)?),
        )),
        Annotation::Literal(values) => Ok(TypeDescriptor::Literal(values.clone())),
        Annotation::Union(members) => {
            if members.is_empty() {
                return Err(DefinitionError::EmptyUnion {
                    record: ctx.record.to_owned(),
                    field: ctx.field.to_owned(),
                }
                .into());
            }
            Ok(TypeDescriptor::Union(
                members
                    .iter()
                    .map(|m| resolve_annotation(m, ctx))
                    .collect::<Result<_, _>>()?,
            ))
        }
        Annotation::Named { name, args } => {
            let args = args
                .iter()
                .map(|a| resolve_annotation(a, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            if name.as_str() == &*ctx.self_key.name && args[..] == ctx.self_key.args[..] {
                return Ok(TypeDescriptor::SelfRef(ctx.self_key.clone()));
            }
            if ctx.ns.has_record(name) {
                Ok(TypeDescriptor::Record(RecordKey::with_args(
                    name.clone(),
                    args,
                )))
            } else {
                Err(ctx.unresolved(UnresolvedKind::Unknown(name.clone())))
            }
        }
        Annotation::Quoted(name) => Err(ctx.unresolved(UnresolvedKind::Quoted(name.clone()))),
        Annotation::Deferred(thunk) => resolve_annotation(&thunk(), ctx),
        Annotation::TypeParam(name) => {
            if let Some((_, desc)) = ctx.bindings.iter().find(|(n, _)| n == name) {
                return Ok(desc.clone());
            }
            if ctx.params.iter().any(|p| p == name) {
                // Uninstantiated generic record: parameters widen to Any.
                return Ok(TypeDescriptor::TypeParam(name.as_str().into()));
            }
            Err(ctx.unresolved(UnresolvedKind::UnknownParam(name.clone())))
        }
    }
}

/// Resolves a record definition (optionally instantiated with concrete
/// generic arguments) into the form the render engine compiles.
///
/// `args` may be non-empty even when `def.type_params` is empty: derive
/// macros monomorphize generic records, so the arguments then only
/// disambiguate the registry key.
pub(crate) fn resolve_record(
    def: &RecordDef,
    args: &[TypeDescriptor],
    ns: &dyn DefNamespace,
    check: Check,
) -> Result<ResolvedRecord, DecorateError> {
    if !def.type_params.is_empty() && !args.is_empty() && args.len() != def.type_params.len() {
        return Err(DefinitionError::GenericArity {
            record: def.name.clone(),
            expected: def.type_params.len(),
            got: args.len(),
        }
        .into());
    }

    let bindings: Vec<(String, TypeDescriptor)> = if def.type_params.is_empty() {
        Vec::new()
    } else {
        def.type_params
            .iter()
            .zip(args.iter())
            .map(|(p, a)| (p.clone(), a.clone()))
            .collect()
    };

    let self_key = RecordKey::with_args(def.name.clone(), args.to_vec());

    validate_tagging(def)?;

    if def.transparent && def.fields.len() != 1 {
        return Err(DefinitionError::TransparentArity {
            record: def.name.clone(),
            count: def.fields.len(),
        }
        .into());
    }

    let mut fields = Vec::with_capacity(def.fields.len());
    let mut flatten_mapping: Option<String> = None;

    for fd in &def.fields {
        let ctx = Ctx {
            record: &def.name,
            field: &fd.name,
            self_key: &self_key,
            params: &def.type_params,
            bindings: &bindings,
            ns,
        };

        let binding = match &fd.annotation {
            // Field-level deferred annotations get the lazy retry path when
            // their target is not available yet.
            Annotation::Deferred(thunk) => match resolve_annotation(&fd.annotation, &ctx) {
                Ok(desc) => Binding::Ready(desc),
                Err(DecorateError::Unresolved(err)) => {
                    log::trace!(
                        "record `{}`, field `{}`: deferring resolution ({err})",
                        def.name,
                        fd.name
                    );
                    Binding::Deferred(thunk.clone())
                }
                Err(err) => return Err(err),
            },
            other => Binding::Ready(resolve_annotation(other, &ctx)?),
        };

        if (fd.skip || fd.skip_deserializing) && fd.default.is_required() {
            return Err(DefinitionError::SkipWithoutDefault {
                record: def.name.clone(),
                field: fd.name.clone(),
            }
            .into());
        }

        let flatten = if fd.flatten {
            match &binding {
                Binding::Ready(TypeDescriptor::Record(_) | TypeDescriptor::SelfRef(_)) => {
                    Flatten::Record
                }
                Binding::Ready(TypeDescriptor::Mapping(..)) => {
                    if let Some(first) = &flatten_mapping {
                        return Err(DefinitionError::DuplicateFlattenMapping {
                            record: def.name.clone(),
                            first: first.clone(),
                            second: fd.name.clone(),
                        }
                        .into());
                    }
                    flatten_mapping = Some(fd.name.clone());
                    Flatten::Mapping
                }
                _ => {
                    return Err(DefinitionError::FlattenKind {
                        record: def.name.clone(),
                        field: fd.name.clone(),
                    }
                    .into());
                }
            }
        } else {
            Flatten::No
        };

        if let (Tagging::Internal { .. }, Binding::Ready(TypeDescriptor::Union(members))) =
            (&def.tagging, &binding)
        {
            for member in members {
                if definitely_not_mapping(member) {
                    return Err(DefinitionError::TaggedNonMapping {
                        record: def.name.clone(),
                        field: fd.name.clone(),
                        member: member.to_string(),
                    }
                    .into());
                }
            }
        }

        let wire_name = fd
            .rename
            .clone()
            .unwrap_or_else(|| def.rename_all.apply(&fd.name));

        fields.push(ResolvedField {
            decl_name: fd.name.clone(),
            wire_name,
            aliases: fd.aliases.clone(),
            binding,
            default: fd.default.clone(),
            skip: fd.skip,
            skip_serializing: fd.skip_serializing,
            skip_deserializing: fd.skip_deserializing,
            skip_if: fd.skip_if.clone(),
            skip_if_default: fd.skip_if_default || def.skip_if_default_all,
            flatten,
            serializer: fd.serializer.clone(),
            deserializer: fd.deserializer.clone(),
        });
    }

    Ok(ResolvedRecord {
        key: self_key,
        fields,
        tagging: def.tagging.clone(),
        transparent: def.transparent,
        unknown_fields: def.unknown_fields,
        check,
    })
}

fn validate_tagging(def: &RecordDef) -> Result<(), DefinitionError> {
    match &def.tagging {
        Tagging::Internal { tag } if tag.is_empty() => Err(DefinitionError::EmptyTagKey {
            record: def.name.clone(),
            which: "internal",
        }),
        Tagging::Adjacent { tag, content } if tag.is_empty() || content.is_empty() => {
            Err(DefinitionError::EmptyTagKey {
                record: def.name.clone(),
                which: "adjacent",
            })
        }
        _ => Ok(()),
    }
}

/// Whether a union member can be ruled out as ever serializing to a mapping
/// (for internal-tagging validation). `Any` and unbound parameters cannot
/// be ruled out at definition time.
fn definitely_not_mapping(desc: &TypeDescriptor) -> bool {
    !matches!(
        desc,
        TypeDescriptor::Record(_)
            | TypeDescriptor::SelfRef(_)
            | TypeDescriptor::Mapping(..)
            | TypeDescriptor::Any
            | TypeDescriptor::TypeParam(_)
    )
}

/// Late resolution for a deferred field binding, invoked by the generated
/// routine on first use.
pub(crate) fn resolve_deferred(
    thunk: &DeferredFn,
    record: &RecordKey,
    field: &str,
    ns: &dyn DefNamespace,
) -> Result<TypeDescriptor, DecorateError> {
    let ctx = Ctx {
        record: &record.name,
        field,
        self_key: record,
        params: &[],
        bindings: &[],
        ns,
    };
    resolve_annotation(&thunk(), &ctx)
}
