//! Operand values
//!
//! Shared value representation for condition operands.
//! - Null, Bool, Int, Float: immediate values, identical when equal
//! - Str, List: reference-counted, identical only when sharing an allocation
//! - Type: first-class type object, identical when it is the same type
//! - Object: user payload behind the [`Instance`] trait; its hooks may raise

use crate::types::{self, TypeRef};
use std::fmt;
use std::sync::Arc;

/// An error raised by a test body or by a hook evaluated on its behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct RaisedError {
    kind: TypeRef,
    message: String,
}

impl RaisedError {
    pub fn new(kind: &TypeRef, message: impl Into<String>) -> Self {
        Self {
            kind: kind.clone(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(types::type_error(), message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(types::value_error(), message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(types::runtime_error(), message)
    }

    pub fn kind(&self) -> &TypeRef {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error is of `kind` or one of its subtypes.
    pub fn is_kind(&self, kind: &TypeRef) -> bool {
        self.kind.is_subtype_of(kind)
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RaisedError {}

/// Behaviour of a user-defined object operand.
pub trait Instance: fmt::Debug + Send + Sync {
    /// The object's class.
    fn class(&self) -> TypeRef;

    fn truthy(&self) -> Result<bool, RaisedError> {
        Ok(true)
    }

    /// Equality against another operand. Identity is checked before this
    /// hook is consulted.
    fn eq_value(&self, _other: &Value) -> Result<bool, RaisedError> {
        Ok(false)
    }
}

/// Condition operand
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    Type(TypeRef),
    Object(Arc<dyn Instance>),
}

impl Value {
    pub fn object(instance: impl Instance + 'static) -> Self {
        Value::Object(Arc::new(instance))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn type_of(&self) -> TypeRef {
        match self {
            Value::Null => types::none().clone(),
            Value::Bool(_) => types::bool().clone(),
            Value::Int(_) => types::int().clone(),
            Value::Float(_) => types::float().clone(),
            Value::Str(_) => types::str().clone(),
            Value::List(_) => types::list().clone(),
            Value::Type(_) => types::type_().clone(),
            Value::Object(obj) => obj.class(),
        }
    }

    /// The type object held by this value, if it is one.
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn truthy(&self) -> Result<bool, RaisedError> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Float(n) => Ok(*n != 0.0),
            Value::Str(s) => Ok(!s.is_empty()),
            Value::List(items) => Ok(!items.is_empty()),
            Value::Type(_) => Ok(true),
            Value::Object(obj) => obj.truthy(),
        }
    }

    /// Same object, not merely equal.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }

    /// Equality that may raise when an object hook does.
    ///
    /// Booleans compare numerically with ints and floats.
    pub fn try_eq(&self, other: &Value) -> Result<bool, RaisedError> {
        if self.is_identical(other) {
            return Ok(true);
        }
        match (self, other) {
            (Value::Object(obj), _) => obj.eq_value(other),
            (_, Value::Object(obj)) => obj.eq_value(self),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (left, right) in a.iter().zip(b.iter()) {
                    if !left.try_eq(right)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(a.num_eq(b)),
                _ => Ok(false),
            },
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }
}

/// Numeric view of an operand; ints never round through `f64`.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn num_eq(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Int(n), Number::Float(f)) | (Number::Float(f), Number::Int(n)) => {
                f.is_finite() && f.fract() == 0.0 && f as i128 == i128::from(n)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Type(ty) => write!(f, "<type {}>", ty),
            Value::Object(obj) => write!(f, "<{} object>", obj.class()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<TypeRef> for Value {
    fn from(value: TypeRef) -> Self {
        Value::Type(value)
    }
}

impl From<&TypeRef> for Value {
    fn from(value: &TypeRef) -> Self {
        Value::Type(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(Arc::new(value))
    }
}
