//! Self references, mutual recursion, generics, and forward references.

use typewire::{
    from_generic, to_generic, Annotation, CallOptions, FieldDef, PrimitiveKind, Record, RecordDef,
    RecordKey, Registry, Tree, TypeDescriptor, Value,
};

// -----------------------------------------------------------------------------
// Self reference

#[derive(Record, Debug, PartialEq)]
struct Node {
    value: i64,
    next: Option<Box<Node>>,
}

#[test]
fn self_referential_round_trip() {
    let chain = Node {
        value: 1,
        next: Some(Box::new(Node {
            value: 2,
            next: Some(Box::new(Node {
                value: 3,
                next: None,
            })),
        })),
    };
    let tree = to_generic(&chain).unwrap();
    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(
        json,
        r#"{"value":1,"next":{"value":2,"next":{"value":3,"next":null}}}"#
    );

    let tree: Tree = serde_json::from_str(&json).unwrap();
    let back: Node = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, chain);
}

// -----------------------------------------------------------------------------
// Mutual recursion, typed

#[derive(Record, Debug, PartialEq)]
struct Tick {
    tock: Option<Box<Tock>>,
}

#[derive(Record, Debug, PartialEq)]
struct Tock {
    tick: Option<Box<Tick>>,
}

#[test]
fn mutually_recursive_records_decorate_and_convert() {
    let value = Tick {
        tock: Some(Box::new(Tock {
            tick: Some(Box::new(Tick { tock: None })),
        })),
    };
    let tree = to_generic(&value).unwrap();
    let back: Tick = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Mutual recursion, dynamic

#[test]
fn predefined_names_resolve_each_other() {
    let registry = Registry::new();
    registry.define(
        RecordDef::new("Ping")
            .field(FieldDef::new("pong", Annotation::optional(Annotation::named("Pong")))),
    );
    registry.define(
        RecordDef::new("Pong")
            .field(FieldDef::new("ping", Annotation::optional(Annotation::named("Ping")))),
    );
    let key = registry
        .decorate(
            RecordDef::new("Ping")
                .field(FieldDef::new("pong", Annotation::optional(Annotation::named("Pong")))),
        )
        .unwrap();
    assert!(registry.is_decorated(&key));
    assert!(registry.is_decorated(&RecordKey::new("Pong")));

    let value = Value::record(
        key.clone(),
        vec![Value::record(RecordKey::new("Pong"), vec![Value::Unit])],
    );
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Generics

#[derive(Record, Debug, PartialEq)]
struct Wrap<T> {
    inner: T,
    tag: String,
}

#[test]
fn generic_instantiations_are_independent() {
    assert_eq!(<Wrap<i64> as Record>::record_key().to_string(), "Wrap[int]");
    assert_eq!(
        <Wrap<String> as Record>::record_key().to_string(),
        "Wrap[str]"
    );

    let a = Wrap {
        inner: 7i64,
        tag: "numbers".into(),
    };
    let tree = to_generic(&a).unwrap();
    let back: Wrap<i64> = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, a);

    let b = Wrap {
        inner: "seven".to_string(),
        tag: "words".into(),
    };
    let tree = to_generic(&b).unwrap();
    let back: Wrap<String> = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, b);

    // Nested instantiations of the same generic also stand alone.
    let c = Wrap {
        inner: Wrap {
            inner: 1i64,
            tag: "in".into(),
        },
        tag: "out".into(),
    };
    assert_eq!(
        <Wrap<Wrap<i64>> as Record>::record_key().to_string(),
        "Wrap[Wrap[int]]"
    );
    let tree = to_generic(&c).unwrap();
    assert_eq!(
        tree.get("inner").and_then(|t| t.get("inner")),
        Some(&Tree::Int(1))
    );
    let back: Wrap<Wrap<i64>> = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, c);
}

#[test]
fn dynamic_generic_instantiation() {
    let registry = Registry::new();
    registry.define(
        RecordDef::new("Holder")
            .type_param("T")
            .field(FieldDef::new("item", Annotation::param("T")))
            .field(FieldDef::new("count", Annotation::INT)),
    );
    let key = registry
        .instantiate(
            "Holder",
            vec![TypeDescriptor::Primitive(PrimitiveKind::Str)],
        )
        .unwrap();
    assert_eq!(key.to_string(), "Holder[str]");

    let value = Value::record(key.clone(), vec![Value::from("x"), Value::Int(2)]);
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(tree.get("item"), Some(&Tree::from("x")));

    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Forward references

#[test]
fn eager_forward_reference_requires_the_target() {
    let registry = Registry::new();
    let def =
        RecordDef::new("Eager").field(FieldDef::new("late", Annotation::named("NotYet")));
    let err = registry.decorate(def).unwrap_err();
    assert!(err.to_string().contains("NotYet"), "unexpected: {err}");
}

#[test]
fn deferred_reference_resolves_at_first_call() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("Outer").field(FieldDef::new(
            "inner",
            Annotation::deferred(|| Annotation::named("Late")),
        )))
        .unwrap();

    let late = Value::record(RecordKey::new("Late"), vec![Value::Int(1)]);
    let value = Value::record(key.clone(), vec![late]);

    // The target is still missing, so the first call fails...
    assert!(registry.to_tree(&value, &CallOptions::default()).is_err());

    // ...and once it exists, the same routine starts working.
    registry
        .decorate(RecordDef::new("Late").field(FieldDef::new("n", Annotation::INT)))
        .unwrap();
    let tree = registry.to_tree(&value, &CallOptions::default()).unwrap();
    assert_eq!(
        tree.get("inner").and_then(|t| t.get("n")),
        Some(&Tree::Int(1))
    );

    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn deferred_optional_accepts_an_absent_key() {
    let registry = Registry::new();
    let key = registry
        .decorate(RecordDef::new("Shell").field(FieldDef::new(
            "filling",
            Annotation::deferred(|| Annotation::optional(Annotation::named("Filling"))),
        )))
        .unwrap();
    registry
        .decorate(RecordDef::new("Filling").field(FieldDef::new("n", Annotation::INT)))
        .unwrap();

    let none = Value::record(key.clone(), vec![Value::Unit]);

    // An explicit null and a missing key mean the same thing for an
    // optional field, even when its optionality was hidden behind a thunk
    // at decoration time.
    let explicit = Tree::Map(vec![(Tree::from("filling"), Tree::Unit)]);
    let back = registry
        .from_tree(&key, &explicit, &CallOptions::default())
        .unwrap();
    assert_eq!(back, none);

    let absent = Tree::Map(vec![]);
    let back = registry
        .from_tree(&key, &absent, &CallOptions::default())
        .unwrap();
    assert_eq!(back, none);

    // And a present record value still round-trips through the thunk.
    let some = Value::record(
        key.clone(),
        vec![Value::record(RecordKey::new("Filling"), vec![Value::Int(4)])],
    );
    let tree = registry.to_tree(&some, &CallOptions::default()).unwrap();
    let back = registry
        .from_tree(&key, &tree, &CallOptions::default())
        .unwrap();
    assert_eq!(back, some);
}
