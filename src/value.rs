//! Dynamic values that make up a configuration object graph.
//!
//! Every configuration record is viewed through [`Value`] while it is walked
//! or serialized. Typed structs convert to and from it through [`Field`].

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::SchemaError;
use crate::record::RecordValue;

/// A single node in a configuration object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(Utf8PathBuf),
    /// Numeric array, kept whole by every walk.
    Array(NumArray),
    /// Unit-bearing quantity, kept whole by every walk.
    #[cfg(feature = "units")]
    Quantity(Quantity),
    Seq(Vec<Value>),
    /// Ordered key/value pairs with unique keys.
    Map(Vec<(Value, Value)>),
    Record(RecordValue),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Path(_) => "path",
            Value::Array(_) => "array",
            #[cfg(feature = "units")]
            Value::Quantity(_) => "quantity",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Record(_) => "record",
        }
    }

    /// Values which look like sequences but must never be iterated element
    /// by element.
    pub fn is_opaque_leaf(&self) -> bool {
        match self {
            Value::Str(_) | Value::Array(_) => true,
            #[cfg(feature = "units")]
            Value::Quantity(_) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Utf8Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Look up a key in a mapping or a field in a record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(record) => record.get(key),
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Utf8PathBuf> for Value {
    fn from(value: Utf8PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Flat storage for a [`NumArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum NumData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl NumData {
    pub fn len(&self) -> usize {
        match self {
            NumData::Int(v) => v.len(),
            NumData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An n-dimensional numeric array stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NumArray {
    shape: Vec<usize>,
    data: NumData,
}

impl NumArray {
    pub fn new(shape: Vec<usize>, data: NumData) -> Result<Self, SchemaError> {
        let len = data.len();
        if shape.iter().product::<usize>() != len {
            return Err(SchemaError::Shape { shape, len });
        }
        Ok(Self { shape, data })
    }

    pub fn from_ints(data: Vec<i64>) -> Self {
        Self {
            shape: vec![data.len()],
            data: NumData::Int(data),
        }
    }

    pub fn from_floats(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data: NumData::Float(data),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &NumData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_float(&self) -> bool {
        matches!(self.data, NumData::Float(_))
    }

    /// Build an array out of nested sequences of numbers, as produced when
    /// loading a configuration file. Any float promotes the whole array.
    pub fn from_nested(value: &Value) -> Result<Self, SchemaError> {
        let mut shape = Vec::new();
        let mut cursor = value;
        while let Value::Seq(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }

        let mut ints = Vec::new();
        let mut floats = Vec::new();
        let mut any_float = false;
        flatten(value, &shape, &mut ints, &mut floats, &mut any_float)?;

        let data = if any_float {
            NumData::Float(floats)
        } else {
            NumData::Int(ints)
        };
        NumArray::new(shape, data)
    }
}

fn flatten(
    value: &Value,
    shape: &[usize],
    ints: &mut Vec<i64>,
    floats: &mut Vec<f64>,
    any_float: &mut bool,
) -> Result<(), SchemaError> {
    match (value, shape.split_first()) {
        (Value::Seq(items), Some((&len, rest))) if items.len() == len => {
            for item in items {
                flatten(item, rest, ints, floats, any_float)?;
            }
            Ok(())
        }
        (Value::Int(i), None) => {
            ints.push(*i);
            floats.push(*i as f64);
            Ok(())
        }
        (Value::Float(f), None) => {
            *any_float = true;
            floats.push(*f);
            Ok(())
        }
        (other, _) => Err(SchemaError::mismatch("a rectangular numeric array", other)),
    }
}

/// Magnitude of a [`Quantity`].
#[cfg(feature = "units")]
#[derive(Debug, Clone, PartialEq)]
pub enum Magnitude {
    Scalar(f64),
    Array(NumArray),
}

/// A magnitude paired with a unit string, e.g. `[3.0, "kg"]`.
#[cfg(feature = "units")]
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub magnitude: Magnitude,
    pub unit: String,
}

#[cfg(feature = "units")]
impl Quantity {
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Self {
            magnitude: Magnitude::Scalar(magnitude),
            unit: unit.into(),
        }
    }

    pub fn array(magnitude: NumArray, unit: impl Into<String>) -> Self {
        Self {
            magnitude: Magnitude::Array(magnitude),
            unit: unit.into(),
        }
    }
}

/// Conversion between a typed value and its [`Value`] form.
pub trait Field: Sized {
    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, SchemaError>;
}

impl Field for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        Ok(value)
    }
}

impl Field for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(SchemaError::mismatch("bool", &other)),
        }
    }
}

macro_rules! impl_field_int {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }

                fn from_value(value: Value) -> Result<Self, SchemaError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| SchemaError::mismatch(stringify!($ty), &Value::Int(i))),
                        other => Err(SchemaError::mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

impl_field_int!(i64, i32, u32);

macro_rules! impl_field_float {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                fn to_value(&self) -> Value {
                    Value::Float(*self as f64)
                }

                fn from_value(value: Value) -> Result<Self, SchemaError> {
                    match value {
                        Value::Float(f) => Ok(f as $ty),
                        Value::Int(i) => Ok(i as $ty),
                        other => Err(SchemaError::mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

impl_field_float!(f64, f32);

impl Field for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(SchemaError::mismatch("string", &other)),
        }
    }
}

impl Field for Utf8PathBuf {
    fn to_value(&self) -> Value {
        Value::Path(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Str(s) => Ok(Utf8PathBuf::from(s)),
            other => Err(SchemaError::mismatch("path", &other)),
        }
    }
}

impl Field for NumArray {
    fn to_value(&self) -> Value {
        Value::Array(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Array(array) => Ok(array),
            other @ Value::Seq(_) => NumArray::from_nested(&other),
            other => Err(SchemaError::mismatch("array", &other)),
        }
    }
}

#[cfg(feature = "units")]
impl Field for Quantity {
    fn to_value(&self) -> Value {
        Value::Quantity(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Quantity(q) => Ok(q),
            Value::Seq(mut items) if items.len() == 2 => {
                let unit = String::from_value(items.pop().unwrap_or(Value::Null))?;
                let magnitude = match items.pop().unwrap_or(Value::Null) {
                    Value::Int(i) => Magnitude::Scalar(i as f64),
                    Value::Float(f) => Magnitude::Scalar(f),
                    other => Magnitude::Array(NumArray::from_value(other)?),
                };
                Ok(Quantity { magnitude, unit })
            }
            other => Err(SchemaError::mismatch("quantity", &other)),
        }
    }
}

impl<T: Field> Field for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Seq(self.iter().map(Field::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|e| e.in_field(format!("[{i}]"))))
                .collect(),
            other => Err(SchemaError::mismatch("sequence", &other)),
        }
    }
}

impl<T: Field> Field for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<K: Field + Ord, V: Field> Field for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(SchemaError::mismatch("mapping", &other)),
        }
    }
}

impl<A: Field, B: Field> Field for (A, B) {
    fn to_value(&self) -> Value {
        Value::Seq(vec![self.0.to_value(), self.1.to_value()])
    }

    fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Seq(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                let a = A::from_value(items.next().unwrap_or(Value::Null))?;
                let b = B::from_value(items.next().unwrap_or(Value::Null))?;
                Ok((a, b))
            }
            other => Err(SchemaError::mismatch("pair", &other)),
        }
    }
}
