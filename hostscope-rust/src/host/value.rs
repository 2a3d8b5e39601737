//! Type-erased host values and their typed recovery

use super::ObjectRef;
use crate::{Error, Result};
use std::fmt;

/// A value crossing the host boundary
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Any integral type
    Int(i64),
    /// Any floating point type
    Float(f64),
    /// String
    Str(String),
    /// Reference to a host object
    Object(ObjectRef),
    /// Host list or array
    List(Vec<Value>),
}

impl Value {
    /// Kind name used in cast errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    /// Whether this is the null reference
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => f.write_str(s),
            Self::Object(o) => write!(f, "{}", o),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Recover a concrete type from a [`Value`]
pub trait FromValue: Sized {
    /// Name reported when the cast fails
    const TYPE_NAME: &'static str;

    /// Convert, failing with [`Error::InvalidCast`] on a kind mismatch
    fn from_value(value: Value) -> Result<Self>;
}

/// Erase a concrete type into a [`Value`]
pub trait IntoValue {
    /// Convert into the host representation
    fn into_value(self) -> Value;
}

fn invalid_cast<T: FromValue>(value: &Value) -> Error {
    Error::InvalidCast {
        expected: T::TYPE_NAME,
        actual: value.kind(),
    }
}

macro_rules! impl_value_conversions {
    ($ty:ty, $name:literal, $variant:ident) => {
        impl FromValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(invalid_cast::<Self>(&other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_value_conversions!(bool, "bool", Bool);
impl_value_conversions!(i64, "int", Int);
impl_value_conversions!(f64, "float", Float);
impl_value_conversions!(String, "string", Str);
impl_value_conversions!(ObjectRef, "object", Object);

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "int32";

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| invalid_cast::<Self>(&Value::Int(i))),
            other => Err(invalid_cast::<Self>(&other)),
        }
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const TYPE_NAME: &'static str = "list";

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(invalid_cast::<Self>(&other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for () {
    const TYPE_NAME: &'static str = "void";

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(invalid_cast::<Self>(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_recovery() {
        assert_eq!(i64::from_value(Value::Int(5)).unwrap(), 5);
        assert_eq!(String::from_value(Value::Str("x".into())).unwrap(), "x");
        assert!(bool::from_value(Value::Bool(true)).unwrap());
    }

    #[test]
    fn test_kind_mismatch_is_invalid_cast() {
        let err = String::from_value(Value::Int(3)).unwrap_err();
        match err {
            Error::InvalidCast { expected, actual } => {
                assert_eq!(expected, "string");
                assert_eq!(actual, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_narrowing_overflow_is_invalid_cast() {
        assert_eq!(i32::from_value(Value::Int(-7)).unwrap(), -7);
        assert!(matches!(
            i32::from_value(Value::Int(i64::MAX)),
            Err(Error::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_null_maps_to_none() {
        assert_eq!(Option::<ObjectRef>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<ObjectRef>::from_value(Value::Object(ObjectRef(9))).unwrap(),
            Some(ObjectRef(9))
        );
        assert!(ObjectRef::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_list_recovery_fails_on_any_bad_element() {
        let list = Value::List(vec![Value::Object(ObjectRef(1)), Value::Null]);
        assert_eq!(
            Vec::<Option<ObjectRef>>::from_value(list.clone()).unwrap(),
            vec![Some(ObjectRef(1)), None]
        );
        assert!(Vec::<ObjectRef>::from_value(list).is_err());
    }

    #[test]
    fn test_display() {
        let list = Value::List(vec![Value::Int(1), Value::Str("a".into()), Value::Null]);
        assert_eq!(list.to_string(), "[1, a, <null>]");
        assert_eq!(Value::Object(ObjectRef(0x2A)).to_string(), "#2A");
    }
}
