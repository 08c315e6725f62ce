//! End-to-end conversions through the derive macro and the generic tree.

use std::collections::BTreeMap;

use typewire::{from_generic, from_tuple, to_generic, to_tuple, CallOptions, Record, Tree, UnknownFields};

#[derive(Record, Debug, PartialEq)]
struct Pri {
    i: i64,
    f: f64,
    s: String,
    b: bool,
}

fn pri() -> Pri {
    Pri {
        i: 10,
        f: 100.0,
        s: "foo".into(),
        b: true,
    }
}

#[test]
fn primitives_round_trip() {
    let tree = to_generic(&pri()).unwrap();
    assert_eq!(tree.get("i"), Some(&Tree::Int(10)));
    assert_eq!(tree.get("f"), Some(&Tree::Float(100.0)));

    let back: Pri = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, pri());
}

#[test]
fn json_end_to_end() {
    let json = serde_json::to_string(&to_generic(&pri()).unwrap()).unwrap();
    assert_eq!(json, r#"{"i":10,"f":100.0,"s":"foo","b":true}"#);

    let tree: Tree = serde_json::from_str(&json).unwrap();
    let back: Pri = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, pri());
}

#[test]
fn ron_end_to_end() {
    let text = ron::to_string(&to_generic(&pri()).unwrap()).unwrap();
    let tree: Tree = ron::from_str(&text).unwrap();
    let back: Pri = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, pri());
}

// -----------------------------------------------------------------------------
// Containers

#[derive(Record, Debug, PartialEq)]
struct Bag {
    items: Vec<i64>,
    names: BTreeMap<String, i64>,
    pair: (i64, String),
    maybe: Option<f64>,
}

#[test]
fn containers_round_trip() {
    let bag = Bag {
        items: vec![1, 2, 3],
        names: BTreeMap::from([("a".into(), 1), ("b".into(), 2)]),
        pair: (7, "x".into()),
        maybe: None,
    };
    let tree = to_generic(&bag).unwrap();
    assert_eq!(tree.get("maybe"), Some(&Tree::Unit));

    let back: Bag = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, bag);
}

#[test]
fn absent_optional_reads_as_none() {
    let tree = Tree::Map(vec![
        (Tree::key("items"), Tree::Seq(vec![])),
        (Tree::key("names"), Tree::Map(vec![])),
        (
            Tree::key("pair"),
            Tree::Seq(vec![Tree::Int(1), Tree::from("y")]),
        ),
    ]);
    let back: Bag = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back.maybe, None);
}

#[test]
fn fixed_tuple_arity() {
    // Too short is an error, extra elements are ignored.
    let short = Tree::Map(vec![
        (Tree::key("items"), Tree::Seq(vec![])),
        (Tree::key("names"), Tree::Map(vec![])),
        (Tree::key("pair"), Tree::Seq(vec![Tree::Int(1)])),
    ]);
    let err = from_generic::<Bag>(&short, &CallOptions::default()).unwrap_err();
    assert!(err.to_string().contains("at least 2"));

    let long = Tree::Map(vec![
        (Tree::key("items"), Tree::Seq(vec![])),
        (Tree::key("names"), Tree::Map(vec![])),
        (
            Tree::key("pair"),
            Tree::Seq(vec![Tree::Int(1), Tree::from("y"), Tree::Int(9)]),
        ),
    ]);
    let back: Bag = from_generic(&long, &CallOptions::default()).unwrap();
    assert_eq!(back.pair, (1, "y".into()));
}

// -----------------------------------------------------------------------------
// Renaming

#[derive(Record, Debug, PartialEq)]
#[record(rename_all = "camelCase")]
struct Renamed {
    int_field: i64,
    #[record(rename = "s", alias = "str_field")]
    other: String,
}

#[test]
fn rename_all_and_aliases() {
    let value = Renamed {
        int_field: 1,
        other: "x".into(),
    };
    let tree = to_generic(&value).unwrap();
    assert_eq!(tree.get("intField"), Some(&Tree::Int(1)));
    assert_eq!(tree.get("s"), Some(&Tree::from("x")));

    // The alias is accepted on input.
    let aliased = Tree::Map(vec![
        (Tree::key("intField"), Tree::Int(1)),
        (Tree::key("str_field"), Tree::from("x")),
    ]);
    let back: Renamed = from_generic(&aliased, &CallOptions::default()).unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Defaults and skips

fn default_c() -> String {
    "c".into()
}

#[derive(Record, Debug, PartialEq)]
struct WithDefault {
    a: i64,
    #[record(default)]
    b: i64,
    #[record(default = "default_c")]
    c: String,
}

#[test]
fn defaults_fill_missing_fields() {
    let tree = Tree::Map(vec![(Tree::key("a"), Tree::Int(1))]);
    let back: WithDefault = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(
        back,
        WithDefault {
            a: 1,
            b: 0,
            c: "c".into()
        }
    );
}

#[test]
fn missing_required_field_is_an_error() {
    let tree = Tree::Map(vec![(Tree::key("b"), Tree::Int(1))]);
    let err = from_generic::<WithDefault>(&tree, &CallOptions::default()).unwrap_err();
    assert!(err.to_string().contains("missing required field `a`"));
}

#[derive(Record, Debug, PartialEq)]
struct SkipDefault {
    a: i64,
    #[record(default, skip_if_default)]
    b: i64,
}

#[test]
fn skip_if_default_omits_only_default_values() {
    let tree = to_generic(&SkipDefault { a: 1, b: 0 }).unwrap();
    assert_eq!(tree.get("b"), None);

    let tree = to_generic(&SkipDefault { a: 1, b: 5 }).unwrap();
    assert_eq!(tree.get("b"), Some(&Tree::Int(5)));
}

#[derive(Record, Debug, PartialEq)]
struct Hidden {
    shown: i64,
    #[record(skip, default)]
    secret: i64,
}

#[test]
fn skipped_fields_never_touch_the_wire() {
    let tree = to_generic(&Hidden { shown: 1, secret: 42 }).unwrap();
    assert_eq!(tree.get("secret"), None);

    let back: Hidden = from_generic(
        &Tree::Map(vec![
            (Tree::key("shown"), Tree::Int(1)),
            (Tree::key("secret"), Tree::Int(99)),
        ]),
        &CallOptions::default(),
    )
    .unwrap();
    assert_eq!(back.secret, 0);
}

// -----------------------------------------------------------------------------
// Unknown fields

#[derive(Record, Debug, PartialEq)]
#[record(deny_unknown_fields)]
struct NoExtras {
    a: i64,
}

#[test]
fn unknown_fields_rejected_and_overridable() {
    let tree = Tree::Map(vec![
        (Tree::key("a"), Tree::Int(1)),
        (Tree::key("x"), Tree::Int(2)),
    ]);
    let err = from_generic::<NoExtras>(&tree, &CallOptions::default()).unwrap_err();
    assert!(err.to_string().contains("unknown field `x`"));

    let opts = CallOptions::default().unknown_fields(UnknownFields::Ignore);
    let back: NoExtras = from_generic(&tree, &opts).unwrap();
    assert_eq!(back, NoExtras { a: 1 });
}

// -----------------------------------------------------------------------------
// Transparent

#[derive(Record, Debug, PartialEq)]
#[record(transparent)]
struct Meters {
    value: f64,
}

#[test]
fn transparent_records_are_bare_values() {
    let tree = to_generic(&Meters { value: 1.5 }).unwrap();
    assert_eq!(tree, Tree::Float(1.5));

    // Integral wire numbers are valid floats.
    let back: Meters = from_generic(&Tree::Int(3), &CallOptions::default()).unwrap();
    assert_eq!(back, Meters { value: 3.0 });
}

// -----------------------------------------------------------------------------
// Flatten

#[derive(Record, Debug, PartialEq)]
struct Position {
    x: i64,
    y: i64,
}

#[derive(Record, Debug, PartialEq)]
struct Labeled {
    name: String,
    #[record(flatten)]
    pos: Position,
}

#[test]
fn flattened_record_round_trip() {
    let value = Labeled {
        name: "origin".into(),
        pos: Position { x: 1, y: 2 },
    };
    let tree = to_generic(&value).unwrap();
    assert_eq!(tree.get("x"), Some(&Tree::Int(1)));
    assert_eq!(tree.get("pos"), None);

    let back: Labeled = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, value);
}

#[derive(Record, Debug, PartialEq)]
struct Extensible {
    known: i64,
    #[record(flatten)]
    rest: BTreeMap<String, i64>,
}

#[test]
fn flatten_mapping_captures_unclaimed_keys() {
    let value = Extensible {
        known: 1,
        rest: BTreeMap::from([("p".into(), 2), ("q".into(), 3)]),
    };
    let tree = to_generic(&value).unwrap();
    assert_eq!(tree.get("p"), Some(&Tree::Int(2)));

    let back: Extensible = from_generic(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, value);
}

// -----------------------------------------------------------------------------
// Positional style

#[test]
fn tuple_style_round_trip() {
    let tree = to_tuple(&pri()).unwrap();
    assert_eq!(
        tree,
        Tree::Seq(vec![
            Tree::Int(10),
            Tree::Float(100.0),
            Tree::from("foo"),
            Tree::Bool(true),
        ])
    );
    let back: Pri = from_tuple(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, pri());
}

#[test]
fn tuple_style_expands_flattened_records() {
    let value = Labeled {
        name: "origin".into(),
        pos: Position { x: 1, y: 2 },
    };
    let tree = to_tuple(&value).unwrap();
    assert_eq!(
        tree,
        Tree::Seq(vec![Tree::from("origin"), Tree::Int(1), Tree::Int(2)])
    );
    let back: Labeled = from_tuple(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn tuple_style_omits_statically_skipped_fields() {
    let tree = to_tuple(&Hidden { shown: 7, secret: 9 }).unwrap();
    assert_eq!(tree, Tree::Seq(vec![Tree::Int(7)]));
    let back: Hidden = from_tuple(&tree, &CallOptions::default()).unwrap();
    assert_eq!(back, Hidden { shown: 7, secret: 0 });
}

// -----------------------------------------------------------------------------
// Error paths

#[derive(Record, Debug, PartialEq)]
struct DeepInner {
    xs: Vec<i64>,
}

#[derive(Record, Debug, PartialEq)]
struct DeepOuter {
    inner: DeepInner,
}

#[test]
fn errors_carry_the_full_path() {
    let tree = Tree::Map(vec![(
        Tree::key("inner"),
        Tree::Map(vec![(
            Tree::key("xs"),
            Tree::Seq(vec![Tree::Int(1), Tree::from("nope")]),
        )]),
    )]);
    let err = from_generic::<DeepOuter>(&tree, &CallOptions::default()).unwrap_err();
    assert!(
        err.to_string().contains("DeepOuter.inner.xs[1]"),
        "unexpected error: {err}"
    );
}
