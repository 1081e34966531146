use crate::error::SchemaError;
use crate::value::{Field, Value};

/// Type-erased view of a configuration record: its type name plus its
/// fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub name: String,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }
}

/// A record whose fields can be listed and which can be rebuilt from a
/// name to value mapping. The hydration walk is written against this.
///
/// Implement it by hand or declare the struct with [`config_record!`].
///
/// [`config_record!`]: crate::config_record
pub trait Record: Sized {
    /// Type name, used in error messages.
    const NAME: &'static str;

    /// Every field in declaration order.
    fn fields(&self) -> Vec<(&'static str, Value)>;

    /// Rebuild the record. Every declared field must be taken from `fields`
    /// and the leftovers rejected with [`Fields::finish`].
    fn reconstruct(fields: Fields) -> Result<Self, SchemaError>;

    fn field(&self, name: &str) -> Result<Value, SchemaError> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
            .ok_or_else(|| SchemaError::MissingField {
                record: Self::NAME.to_owned(),
                field: name.to_owned(),
            })
    }

    fn to_record_value(&self) -> RecordValue {
        RecordValue::new(
            Self::NAME,
            self.fields()
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        )
    }

    fn from_record_value(record: RecordValue) -> Result<Self, SchemaError> {
        Self::reconstruct(Fields::new(Self::NAME, record.fields))
    }
}

/// Field values handed to [`Record::reconstruct`].
#[derive(Debug)]
pub struct Fields {
    record: &'static str,
    values: Vec<(String, Value)>,
}

impl Fields {
    pub fn new(record: &'static str, values: Vec<(String, Value)>) -> Self {
        Self { record, values }
    }

    /// Remove a field and convert it. A missing field is treated as null, so
    /// `Option` fields may be omitted.
    pub fn take<T: Field>(&mut self, name: &str) -> Result<T, SchemaError> {
        let position = self.values.iter().position(|(field, _)| field == name);
        match position {
            Some(i) => {
                let (_, value) = self.values.remove(i);
                T::from_value(value).map_err(|e| e.in_field(name))
            }
            None => T::from_value(Value::Null).map_err(|_| SchemaError::MissingField {
                record: self.record.to_owned(),
                field: name.to_owned(),
            }),
        }
    }

    /// Fail if any field was not taken.
    pub fn finish(self) -> Result<(), SchemaError> {
        match self.values.into_iter().next() {
            Some((field, _)) => Err(SchemaError::UnknownField {
                record: self.record.to_owned(),
                field,
            }),
            None => Ok(()),
        }
    }
}

/// Structure a record out of a [`Value`]. Records loaded from a file arrive
/// as mappings with string keys.
pub fn record_from_value<R: Record>(value: Value) -> Result<R, SchemaError> {
    match value {
        Value::Record(record) => R::from_record_value(record),
        Value::Map(pairs) => {
            let fields = pairs
                .into_iter()
                .map(|(key, value)| match key {
                    Value::Str(name) => Ok((name, value)),
                    other => Err(SchemaError::mismatch("string key", &other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            R::reconstruct(Fields::new(R::NAME, fields))
        }
        other => Err(SchemaError::mismatch("record", &other)),
    }
}

/// Declare a configuration record.
///
/// Generates the struct exactly as written plus [`Record`] and [`Field`]
/// implementations, so the record can be hydrated, serialized and nested
/// inside other records.
///
/// ```rust
/// use camino::Utf8PathBuf;
///
/// nbflow::config_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct PlotConfig {
///         pub step_config_id: String,
///         pub colour: String,
///         pub file_plot: Utf8PathBuf,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            const NAME: &'static str = stringify!($name);

            fn fields(&self) -> ::std::vec::Vec<(&'static str, $crate::Value)> {
                vec![
                    $( (stringify!($field), $crate::Field::to_value(&self.$field)), )*
                ]
            }

            #[allow(unused_mut)]
            fn reconstruct(
                mut fields: $crate::Fields,
            ) -> ::std::result::Result<Self, $crate::SchemaError> {
                let record = $name {
                    $( $field: fields.take(stringify!($field))?, )*
                };
                fields.finish()?;
                Ok(record)
            }
        }

        impl $crate::Field for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record($crate::Record::to_record_value(self))
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::SchemaError> {
                $crate::record_from_value(value)
            }
        }
    };
}
