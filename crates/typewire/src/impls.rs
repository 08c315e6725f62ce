//! [`Describe`] / [`ToValue`] / [`FromValue`] implementations for
//! primitives and the std containers.
//!
//! Container implementations compose and forward dependency decoration to
//! their element types, so a field of type `Vec<Option<Inner>>` pulls
//! `Inner` into the registry when its record is decorated.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::annotation::Annotation;
use crate::api::{Describe, FromValue, ToValue};
use crate::error::{DecorateError, SerdeError, SerdeErrorKind};
use crate::registry::Registry;
use crate::value::Value;

fn mismatch(expected: &'static str, found: &Value) -> SerdeError {
    SerdeErrorKind::TypeMismatch {
        expected,
        found: found.kind_name().to_owned(),
    }
    .into()
}

// -----------------------------------------------------------------------------
// Unit

impl Describe for () {
    fn annotation() -> Annotation {
        Annotation::UNIT
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Unit
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        match value {
            Value::Unit => Ok(()),
            other => Err(mismatch("none", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Integers

macro_rules! impl_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn annotation() -> Annotation {
                    Annotation::INT
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, SerdeError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                            SerdeErrorKind::Coerce {
                                expected: stringify!($ty),
                                found: i.to_string(),
                            }
                            .into()
                        }),
                        other => Err(mismatch("int", &other)),
                    }
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, u8, u16, u32);

// -----------------------------------------------------------------------------
// Floats

macro_rules! impl_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn annotation() -> Annotation {
                    Annotation::FLOAT
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Float(f64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, SerdeError> {
                    match value {
                        Value::Float(x) => Ok(x as $ty),
                        Value::Int(i) => Ok(i as $ty),
                        other => Err(mismatch("float", &other)),
                    }
                }
            }
        )*
    };
}

impl_float!(f32, f64);

// -----------------------------------------------------------------------------
// Bool and strings

impl Describe for bool {
    fn annotation() -> Annotation {
        Annotation::BOOL
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl Describe for String {
    fn annotation() -> Annotation {
        Annotation::STR
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Option and Box

impl<T: Describe> Describe for Option<T> {
    fn annotation() -> Annotation {
        Annotation::optional(T::annotation())
    }

    fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
        T::ensure_decorated(registry)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Unit,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        match value {
            Value::Unit => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Describe> Describe for Box<T> {
    fn annotation() -> Annotation {
        T::annotation()
    }

    fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
        T::ensure_decorated(registry)
    }
}

impl<T: ToValue> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        T::from_value(value).map(Box::new)
    }
}

// -----------------------------------------------------------------------------
// Sequences

impl<T: Describe> Describe for Vec<T> {
    fn annotation() -> Annotation {
        Annotation::list(T::annotation())
    }

    fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
        T::ensure_decorated(registry)
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, SerdeError> {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch("list", &other)),
        }
    }
}

macro_rules! impl_set {
    ($name:ident, $($bound:path),*) => {
        impl<T: Describe $(+ $bound)*> Describe for $name<T> {
            fn annotation() -> Annotation {
                Annotation::set(T::annotation())
            }

            fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
                T::ensure_decorated(registry)
            }
        }

        impl<T: ToValue $(+ $bound)*> ToValue for $name<T> {
            fn to_value(&self) -> Value {
                Value::Set(self.iter().map(ToValue::to_value).collect())
            }
        }

        impl<T: FromValue $(+ $bound)*> FromValue for $name<T> {
            fn from_value(value: Value) -> Result<Self, SerdeError> {
                match value {
                    Value::Set(items) | Value::List(items) => {
                        items.into_iter().map(T::from_value).collect()
                    }
                    other => Err(mismatch("set", &other)),
                }
            }
        }
    };
}

impl_set!(HashSet, std::cmp::Eq, std::hash::Hash);
impl_set!(BTreeSet, std::cmp::Ord);

// -----------------------------------------------------------------------------
// Mappings

macro_rules! impl_map {
    ($name:ident, $($bound:path),*) => {
        impl<K: Describe $(+ $bound)*, V: Describe> Describe for $name<K, V> {
            fn annotation() -> Annotation {
                Annotation::map(K::annotation(), V::annotation())
            }

            fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
                K::ensure_decorated(registry)?;
                V::ensure_decorated(registry)
            }
        }

        impl<K: ToValue $(+ $bound)*, V: ToValue> ToValue for $name<K, V> {
            fn to_value(&self) -> Value {
                Value::Map(
                    self.iter()
                        .map(|(k, v)| (k.to_value(), v.to_value()))
                        .collect(),
                )
            }
        }

        impl<K: FromValue $(+ $bound)*, V: FromValue> FromValue for $name<K, V> {
            fn from_value(value: Value) -> Result<Self, SerdeError> {
                match value {
                    Value::Map(entries) => entries
                        .into_iter()
                        .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                        .collect(),
                    other => Err(mismatch("map", &other)),
                }
            }
        }
    };
}

impl_map!(HashMap, std::cmp::Eq, std::hash::Hash);
impl_map!(BTreeMap, std::cmp::Ord);

// -----------------------------------------------------------------------------
// Tuples

macro_rules! impl_tuple {
    ($(($($ty:ident : $idx:tt),+))*) => {
        $(
            impl<$($ty: Describe),+> Describe for ($($ty,)+) {
                fn annotation() -> Annotation {
                    Annotation::tuple(vec![$($ty::annotation()),+])
                }

                fn ensure_decorated(registry: &Registry) -> Result<(), DecorateError> {
                    $($ty::ensure_decorated(registry)?;)+
                    Ok(())
                }
            }

            impl<$($ty: ToValue),+> ToValue for ($($ty,)+) {
                fn to_value(&self) -> Value {
                    Value::Tuple(vec![$(self.$idx.to_value()),+])
                }
            }

            impl<$($ty: FromValue),+> FromValue for ($($ty,)+) {
                fn from_value(value: Value) -> Result<Self, SerdeError> {
                    let Value::Tuple(items) = value else {
                        return Err(mismatch("tuple", &value));
                    };
                    let expected = 0 $(+ { let _ = $idx; 1 })+;
                    if items.len() != expected {
                        return Err(SerdeErrorKind::Length {
                            expected,
                            found: items.len(),
                        }
                        .into());
                    }
                    let mut items = items.into_iter();
                    Ok(($(
                        {
                            let _ = $idx;
                            // Length verified above.
                            match items.next() {
                                Some(item) => $ty::from_value(item)?,
                                None => return Err(SerdeErrorKind::Length {
                                    expected,
                                    found: 0,
                                }
                                .into()),
                            }
                        },
                    )+))
                }
            }
        )*
    };
}

impl_tuple! {
    (A: 0)
    (A: 0, B: 1)
    (A: 0, B: 1, C: 2)
    (A: 0, B: 1, C: 2, D: 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PrimitiveKind, TypeDescriptor};

    #[test]
    fn container_annotations_compose() {
        let shape = <Vec<Option<i64>> as Describe>::shape();
        assert_eq!(
            shape,
            TypeDescriptor::List(Box::new(TypeDescriptor::Optional(Box::new(
                TypeDescriptor::Primitive(PrimitiveKind::Int)
            ))))
        );
    }

    #[test]
    fn int_narrowing_is_checked() {
        assert_eq!(u8::from_value(Value::Int(200)).unwrap(), 200u8);
        assert!(u8::from_value(Value::Int(300)).is_err());
        assert!(i64::from_value(Value::Str("10".into())).is_err());
    }

    #[test]
    fn tuple_round_trip() {
        let v = (1i64, "x".to_string()).to_value();
        assert_eq!(
            v,
            Value::Tuple(vec![Value::Int(1), Value::Str("x".into())])
        );
        let back: (i64, String) = FromValue::from_value(v).unwrap();
        assert_eq!(back, (1, "x".to_string()));
    }

    #[test]
    fn option_is_unit_backed() {
        assert_eq!(None::<i64>.to_value(), Value::Unit);
        assert_eq!(Option::<i64>::from_value(Value::Int(3)).unwrap(), Some(3));
        assert_eq!(Option::<i64>::from_value(Value::Unit).unwrap(), None);
    }
}
