//! Serde data-model bridge for [`Tree`].
//!
//! This is the entire seam between the engine and the wire-format codecs:
//! a codec that speaks the serde data model (serde_json, ron, a msgpack or
//! YAML crate, ...) can encode any `Tree` and decode bytes/text back into
//! one. The engine itself never touches raw bytes.

use core::fmt;

use serde_core::de::{self, MapAccess, SeqAccess, Visitor};
use serde_core::ser::{SerializeMap, SerializeSeq};
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tree::Tree;

// -----------------------------------------------------------------------------
// Serialize

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tree::Unit => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Int(i) => serializer.serialize_i64(*i),
            Tree::Float(x) => serializer.serialize_f64(*x),
            Tree::Str(s) => serializer.serialize_str(s),
            Tree::Bytes(b) => serializer.serialize_bytes(b),
            Tree::Seq(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            Tree::Map(entries) => {
                let mut state = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    state.serialize_entry(k, v)?;
                }
                state.end()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Deserialize

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = Tree;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a primitive tree value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Tree, E> {
        Ok(Tree::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Tree, E> {
        Ok(Tree::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Tree, E> {
        i64::try_from(v)
            .map(Tree::Int)
            .map_err(|_| E::custom(format!("integer {v} does not fit the tree number range")))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Tree, E> {
        Ok(Tree::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Tree, E> {
        Ok(Tree::Str(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Tree, E> {
        Ok(Tree::Str(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Tree, E> {
        Ok(Tree::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Tree, E> {
        Ok(Tree::Bytes(v))
    }

    fn visit_none<E>(self) -> Result<Tree, E> {
        Ok(Tree::Unit)
    }

    fn visit_unit<E>(self) -> Result<Tree, E> {
        Ok(Tree::Unit)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Tree, D::Error> {
        Tree::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tree, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Tree>()? {
            items.push(item);
        }
        Ok(Tree::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tree, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<Tree, Tree>()? {
            entries.push(entry);
        }
        Ok(Tree::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Tree, D::Error> {
        deserializer.deserialize_any(TreeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::Tree;

    #[test]
    fn json_round_trip() {
        let tree = Tree::Map(vec![
            (Tree::key("i"), Tree::Int(10)),
            (Tree::key("s"), Tree::from("foo")),
            (Tree::key("f"), Tree::Float(100.0)),
            (Tree::key("b"), Tree::Bool(true)),
            (Tree::key("xs"), Tree::Seq(vec![Tree::Int(1), Tree::Int(2)])),
            (Tree::key("none"), Tree::Unit),
        ]);

        let text = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            text,
            r#"{"i":10,"s":"foo","f":100.0,"b":true,"xs":[1,2],"none":null}"#
        );

        let back: Tree = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn ron_round_trip() {
        let tree = Tree::Map(vec![(Tree::key("value"), Tree::Int(123))]);
        let text = ron::to_string(&tree).unwrap();
        let back: Tree = ron::from_str(&text).unwrap();
        assert_eq!(back, tree);
    }
}
