//! Converting configuration values to and from text.

use std::fs;

use camino::Utf8Path;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{NbflowError, SerializeError};
use crate::value::{Field, NumData, Value};

/// Text serialization of configuration values.
pub trait Converter {
    /// Serialize a value. With `sort_keys` every mapping and record is
    /// written with its keys in order, which makes the output stable.
    fn dumps(&self, value: &Value, sort_keys: bool) -> Result<String, SerializeError>;

    /// Parse text into a value. Paths come back as strings and arrays as
    /// nested sequences; structure them with [`Field::from_value`].
    fn loads(&self, text: &str) -> Result<Value, SerializeError>;
}

/// YAML through `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlConverter;

impl Converter for YamlConverter {
    fn dumps(&self, value: &Value, sort_keys: bool) -> Result<String, SerializeError> {
        Ok(serde_yaml::to_string(&Ser { value, sort_keys })?)
    }

    fn loads(&self, text: &str) -> Result<Value, SerializeError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(from_yaml(yaml))
    }
}

/// JSON through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter {
    pub pretty: bool,
}

impl Converter for JsonConverter {
    fn dumps(&self, value: &Value, sort_keys: bool) -> Result<String, SerializeError> {
        let ser = Ser { value, sort_keys };
        let text = match self.pretty {
            true => serde_json::to_string_pretty(&ser)?,
            false => serde_json::to_string(&ser)?,
        };
        Ok(text)
    }

    fn loads(&self, text: &str) -> Result<Value, SerializeError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(from_json(json))
    }
}

/// Serialize any typed value.
pub fn dumps<T: Field>(
    converter: &dyn Converter,
    value: &T,
    sort_keys: bool,
) -> Result<String, SerializeError> {
    converter.dumps(&value.to_value(), sort_keys)
}

/// Parse and structure text into `T`.
pub fn structure<T: Field>(converter: &dyn Converter, text: &str) -> Result<T, NbflowError> {
    let value = converter.loads(text)?;
    Ok(T::from_value(value)?)
}

/// Read a configuration file and structure it into `T`.
pub fn load_config_from_file<T: Field>(
    path: &Utf8Path,
    converter: &dyn Converter,
) -> Result<T, NbflowError> {
    let text = fs::read_to_string(path)?;
    structure(converter, &text)
}

/// Borrowed view of a [`Value`] that implements [`Serialize`].
#[derive(Clone, Copy)]
pub struct Ser<'a> {
    pub value: &'a Value,
    pub sort_keys: bool,
}

impl<'a> Ser<'a> {
    fn child(&self, value: &'a Value) -> Ser<'a> {
        Ser {
            value,
            sort_keys: self.sort_keys,
        }
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Path(p) => p.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

impl Serialize for Ser<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => s.serialize_unit(),
            Value::Bool(b) => s.serialize_bool(*b),
            Value::Int(i) => s.serialize_i64(*i),
            Value::Float(f) => s.serialize_f64(*f),
            Value::Str(text) => s.serialize_str(text),
            Value::Path(path) => s.serialize_str(path.as_str()),
            Value::Array(array) => ArrayView {
                shape: array.shape(),
                data: array.data(),
                offset: 0,
            }
            .serialize(s),
            #[cfg(feature = "units")]
            Value::Quantity(q) => {
                use serde::ser::SerializeTuple;

                let mut tuple = s.serialize_tuple(2)?;
                match &q.magnitude {
                    crate::value::Magnitude::Scalar(m) => tuple.serialize_element(m)?,
                    crate::value::Magnitude::Array(array) => tuple.serialize_element(&ArrayView {
                        shape: array.shape(),
                        data: array.data(),
                        offset: 0,
                    })?,
                }
                tuple.serialize_element(&q.unit)?;
                tuple.end()
            }
            Value::Seq(items) => s.collect_seq(items.iter().map(|item| self.child(item))),
            Value::Map(pairs) => {
                let mut entries: Vec<_> = pairs.iter().collect();
                if self.sort_keys {
                    entries.sort_by_key(|(k, _)| key_text(k));
                }
                let mut map = s.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(&self.child(k), &self.child(v))?;
                }
                map.end()
            }
            Value::Record(record) => {
                let mut entries: Vec<_> = record.fields.iter().collect();
                if self.sort_keys {
                    entries.sort_by(|a, b| a.0.cmp(&b.0));
                }
                let mut map = s.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, &self.child(v))?;
                }
                map.end()
            }
        }
    }
}

struct ArrayView<'a> {
    shape: &'a [usize],
    data: &'a NumData,
    offset: usize,
}

impl Serialize for ArrayView<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.shape.split_first() {
            None => match self.data {
                NumData::Int(v) => match v.get(self.offset) {
                    Some(i) => s.serialize_i64(*i),
                    None => Err(S::Error::custom("array index out of bounds")),
                },
                NumData::Float(v) => match v.get(self.offset) {
                    Some(f) => s.serialize_f64(*f),
                    None => Err(S::Error::custom("array index out of bounds")),
                },
            },
            Some((&len, rest)) => {
                let stride: usize = rest.iter().product();
                let mut seq = s.serialize_seq(Some(len))?;
                for i in 0..len {
                    seq.serialize_element(&ArrayView {
                        shape: rest,
                        data: self.data,
                        offset: self.offset + i * stride,
                    })?;
                }
                seq.end()
            }
        }
    }
}

fn from_yaml(yaml: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;

    match yaml {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Y::String(s) => Value::Str(s),
        Y::Sequence(items) => Value::Seq(items.into_iter().map(from_yaml).collect()),
        Y::Mapping(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (from_yaml(k), from_yaml(v)))
                .collect(),
        ),
        Y::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn from_json(json: serde_json::Value) -> Value {
    use serde_json::Value as J;

    match json {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        J::String(s) => Value::Str(s),
        J::Array(items) => Value::Seq(items.into_iter().map(from_json).collect()),
        J::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (Value::Str(k), from_json(v)))
                .collect(),
        ),
    }
}
