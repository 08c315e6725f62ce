//! Hand-built record definitions: check modes, callables, literals, and the
//! policies the derive macro never needs.

use typewire::{
    Annotation, CallOptions, Check, DecorateOptions, FieldDef, RecordDef, Registry, SerdeError,
    SerdeErrorKind, Tree, UnknownFields, Value,
};

fn int_def() -> RecordDef {
    RecordDef::new("Nums").field(FieldDef::new("n", Annotation::INT))
}

// -----------------------------------------------------------------------------
// Check modes

#[test]
fn strict_rejects_mismatched_primitives() {
    let registry = Registry::new();
    let key = registry.decorate(int_def()).unwrap();
    let tree = Tree::Map(vec![(Tree::key("n"), Tree::from("10"))]);
    let err = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap_err();
    assert!(matches!(err.kind(), SerdeErrorKind::TypeMismatch { .. }));
}

#[test]
fn coercion_is_a_decoration_choice() {
    let registry = Registry::new();
    let key = registry
        .decorate_with(int_def(), DecorateOptions::default().check(Check::Coerce))
        .unwrap();

    let tree = Tree::Map(vec![(Tree::key("n"), Tree::from("10"))]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(value, Value::record(key.clone(), vec![Value::Int(10)]));

    // A call-time override wins over the baked mode.
    let strict = CallOptions::default().check(Check::Strict);
    assert!(registry.from_tree(&key, &tree, &strict).is_err());
}

#[test]
fn coercion_handles_numeric_strings_and_bools() {
    let registry = Registry::new();
    let key = registry
        .decorate_with(
            RecordDef::new("Mixed")
                .field(FieldDef::new("i", Annotation::INT))
                .field(FieldDef::new("b", Annotation::BOOL))
                .field(FieldDef::new("s", Annotation::STR)),
            DecorateOptions::default().check(Check::Coerce),
        )
        .unwrap();

    let tree = Tree::Map(vec![
        (Tree::key("i"), Tree::Float(2.0)),
        (Tree::key("b"), Tree::Int(1)),
        (Tree::key("s"), Tree::Int(42)),
    ]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(
        value,
        Value::record(
            key,
            vec![Value::Int(2), Value::Bool(true), Value::from("42")]
        )
    );
}

#[test]
fn disabled_check_passes_values_through() {
    let registry = Registry::new();
    let key = registry
        .decorate_with(int_def(), DecorateOptions::default().check(Check::Disabled))
        .unwrap();

    let tree = Tree::Map(vec![(Tree::key("n"), Tree::from("zzz"))]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(value, Value::record(key, vec![Value::from("zzz")]));
}

#[test]
fn floats_accept_integral_numbers_in_every_mode() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("F").field(FieldDef::new("x", Annotation::FLOAT)))
        .unwrap();

    let tree = Tree::Map(vec![(Tree::key("x"), Tree::Int(3))]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(value, Value::record(key.clone(), vec![Value::Float(3.0)]));

    let value = Value::record(key, vec![Value::Int(3)]);
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(tree.get("x"), Some(&Tree::Float(3.0)));
}

#[test]
fn ints_never_accept_fractional_floats_strictly() {
    let registry = Registry::new();
    let key = registry.decorate(int_def()).unwrap();
    let tree = Tree::Map(vec![(Tree::key("n"), Tree::Float(1.5))]);
    assert!(registry
        .from_tree(&key, &tree, &CallOptions::default())
        .is_err());
    // Not even under coercion.
    let coerce = CallOptions::default().check(Check::Coerce);
    assert!(registry.from_tree(&key, &tree, &coerce).is_err());
}

// -----------------------------------------------------------------------------
// Literals

#[test]
fn literal_membership() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("Switch").field(FieldDef::new(
            "mode",
            Annotation::literal(["on", "off"]),
        )))
        .unwrap();

    let tree = Tree::Map(vec![(Tree::key("mode"), Tree::from("off"))]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(value, Value::record(key.clone(), vec![Value::from("off")]));

    let tree = Tree::Map(vec![(Tree::key("mode"), Tree::from("dim"))]);
    let err = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("allowed literals"), "unexpected: {err}");

    let bad = Value::record(key, vec![Value::from("dim")]);
    assert!(registry.to_tree(&bad, &CallOptions::default()).is_err());
}

// -----------------------------------------------------------------------------
// Custom callables

#[test]
fn field_callables_replace_the_generated_step() {
    let registry = Registry::new();
    let key = registry
        .decorate(
            RecordDef::new("Tagged").field(
                FieldDef::new("n", Annotation::INT)
                    .serialize_with(|v| Ok(Tree::Str(format!("#{v}"))))
                    .deserialize_with(|t| match t {
                        Tree::Str(s) => s
                            .strip_prefix('#')
                            .and_then(|rest| rest.parse::<i64>().ok())
                            .map(Value::Int)
                            .ok_or_else(|| SerdeError::custom("malformed tag")),
                        other => Err(SerdeError::custom(format!(
                            "expected a tag string, found {}",
                            other.kind_name()
                        ))),
                    }),
            ),
        )
        .unwrap();

    let value = Value::record(key.clone(), vec![Value::Int(5)]);
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(tree.get("n"), Some(&Tree::from("#5")));

    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn callable_failures_keep_their_identity() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("Cb").field(
            FieldDef::new("n", Annotation::INT).deserialize_with(|_| {
                Err(SerdeError::custom("boom"))
            }),
        ))
        .unwrap();

    let tree = Tree::Map(vec![(Tree::key("n"), Tree::Int(1))]);
    let err = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap_err();
    // No field segment is prepended on the way out of the callable.
    assert_eq!(err.to_string(), "at `Cb`: boom");
}

// -----------------------------------------------------------------------------
// Unknown-field policy

#[test]
fn reject_unknown_can_be_forced_per_call() {
    let registry = Registry::new();
    let key = registry.decorate(int_def()).unwrap();
    let tree = Tree::Map(vec![
        (Tree::key("n"), Tree::Int(1)),
        (Tree::key("extra"), Tree::Int(2)),
    ]);

    // The definition ignores unknowns by default.
    assert!(registry
        .from_tree(&key, &tree, &CallOptions::default())
        .is_ok());

    let opts = CallOptions::default().unknown_fields(UnknownFields::Reject);
    let err = registry.from_tree(&key, &tree, &opts).unwrap_err();
    assert!(err.to_string().contains("extra"), "unexpected: {err}");
}

// -----------------------------------------------------------------------------
// Record value shape

#[test]
fn record_values_carry_exactly_one_slot_per_field() {
    let registry = Registry::new();
    let key = registry
        .decorate(
            RecordDef::new("Duo")
                .field(FieldDef::new("a", Annotation::INT))
                .field(FieldDef::new("b", Annotation::INT)),
        )
        .unwrap();

    let bloated = Value::record(
        key.clone(),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)],
    );
    let err = registry
        .to_tree(&bloated, &CallOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        SerdeErrorKind::Length {
            expected: 2,
            found: 3
        }
    ));
    // Too many is not "too few": the message names the exact count.
    assert_eq!(err.to_string(), "expected exactly 2 elements, found 3");
}

// -----------------------------------------------------------------------------
// Container descriptors

#[test]
fn sets_deduplicate_preserving_order() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("S").field(FieldDef::new("xs", Annotation::set(Annotation::INT))))
        .unwrap();

    let value = Value::record(
        key.clone(),
        vec![Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(1)])],
    );
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(
        tree.get("xs"),
        Some(&Tree::Seq(vec![Tree::Int(1), Tree::Int(2)]))
    );

    let tree = Tree::Map(vec![(
        Tree::key("xs"),
        Tree::Seq(vec![Tree::Int(3), Tree::Int(3), Tree::Int(4)]),
    )]);
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(
        back,
        Value::record(key, vec![Value::Set(vec![Value::Int(3), Value::Int(4)])])
    );
}

#[test]
fn variadic_tuples_take_any_length() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("V").field(FieldDef::new(
            "t",
            Annotation::variadic_tuple(Annotation::INT),
        )))
        .unwrap();

    let tree = Tree::Map(vec![(
        Tree::key("t"),
        Tree::Seq(vec![Tree::Int(1), Tree::Int(2), Tree::Int(3)]),
    )]);
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(
        back,
        Value::record(
            key,
            vec![Value::Tuple(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3)
            ])]
        )
    );
}

#[test]
fn bytes_accept_integer_sequences() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("B").field(FieldDef::new("data", Annotation::BYTES)))
        .unwrap();

    let tree = Tree::Map(vec![(
        Tree::key("data"),
        Tree::Seq(vec![Tree::Int(0), Tree::Int(255)]),
    )]);
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, Value::record(key.clone(), vec![Value::Bytes(vec![0, 255])]));

    let tree = Tree::Map(vec![(
        Tree::key("data"),
        Tree::Seq(vec![Tree::Int(256)]),
    )]);
    assert!(registry
        .from_tree(&key, &tree, &CallOptions::default())
        .is_err());
}

#[test]
fn any_fields_pass_structure_through() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("A").field(FieldDef::new("blob", Annotation::ANY)))
        .unwrap();

    let tree = Tree::Map(vec![(
        Tree::key("blob"),
        Tree::Map(vec![(Tree::key("k"), Tree::Seq(vec![Tree::Bool(true)]))]),
    )]);
    let value = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    let round = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(round, tree);
}

// -----------------------------------------------------------------------------
// Positional style on dynamic records

#[test]
fn positional_skip_deserializing_consumes_its_slot() {
    let registry = Registry::new();
    let key = registry
        .decorate(
            RecordDef::new("Pos")
                .field(FieldDef::new("a", Annotation::INT))
                .field(
                    FieldDef::new("b", Annotation::STR)
                        .skip_deserializing()
                        .default_value("fallback"),
                )
                .field(FieldDef::new("c", Annotation::BOOL)),
        )
        .unwrap();

    let value = Value::record(
        key.clone(),
        vec![Value::Int(1), Value::from("real"), Value::Bool(true)],
    );
    let tree = registry
        .to_tuple_tree(&value, &CallOptions::default())
        .unwrap();
    assert_eq!(
        tree,
        Tree::Seq(vec![Tree::Int(1), Tree::from("real"), Tree::Bool(true)])
    );

    // The slot is present on the wire but its content is discarded.
    let back = registry
        .from_tuple_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(
        back,
        Value::record(
            key,
            vec![Value::Int(1), Value::from("fallback"), Value::Bool(true)]
        )
    );
}

#[test]
fn skip_serializing_still_deserializes() {
    let registry = Registry::new();
    let key = registry
        .decorate(
            RecordDef::new("Half")
                .field(FieldDef::new("a", Annotation::INT))
                .field(
                    FieldDef::new("b", Annotation::INT)
                        .skip_serializing()
                        .default_value(0i64),
                ),
        )
        .unwrap();

    let value = Value::record(key.clone(), vec![Value::Int(1), Value::Int(9)]);
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(tree.get("b"), None);

    let tree = Tree::Map(vec![
        (Tree::key("a"), Tree::Int(1)),
        (Tree::key("b"), Tree::Int(9)),
    ]);
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Auto registration

#[cfg(feature = "auto_register")]
mod auto {
    use typewire::{Record, Registry};

    #[derive(Record, Debug, PartialEq)]
    #[record(auto_register)]
    struct Boot {
        id: i64,
    }

    #[test]
    fn collected_registrations_decorate() {
        let registry = Registry::new();
        registry.register_collected().unwrap();
        assert!(registry.is_decorated(&<Boot as Record>::record_key()));
    }
}
