//! Turning the relative paths written in a configuration file into absolute
//! paths anchored at a run's output directory.

use std::collections::HashSet;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::SchemaError;
use crate::record::{Record, RecordValue};
use crate::value::Value;

/// Prefix every path inside `config` with `prefix`.
///
/// The record keeps its type, its fields, and the size of every container.
/// Only path leaves change. This is not idempotent: hydrating the result
/// again prefixes every path a second time, so a bundle must be hydrated
/// exactly once.
pub fn insert_path_prefix<R: Record>(config: &R, prefix: &Utf8Path) -> Result<R, SchemaError> {
    tracing::debug!("Hydrating {} with prefix {}", R::NAME, prefix);
    let hydrated = R::from_record_value(hydrate_record(config.to_record_value(), prefix)?)?;
    tracing::debug!("Hydrated {}", R::NAME);
    Ok(hydrated)
}

/// Hydrate every field of a type-erased record.
///
/// Fails if two keys of a mapping end up as the same path, which happens
/// when a mapping holds both `a` and `/a`.
pub fn hydrate_record(record: RecordValue, prefix: &Utf8Path) -> Result<RecordValue, SchemaError> {
    let fields = record
        .fields
        .into_iter()
        .map(|(name, value)| match hydrate_field(value, prefix) {
            Ok(value) => Ok((name, value)),
            Err(e) => Err(e.in_field(name)),
        })
        .collect::<Result<_, _>>()?;

    Ok(RecordValue {
        name: record.name,
        fields,
    })
}

fn hydrate_field(value: Value, prefix: &Utf8Path) -> Result<Value, SchemaError> {
    match value {
        Value::Map(pairs) => {
            let mut seen = HashSet::new();
            let mut hydrated = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                let k = update_value(k, prefix)?;
                if let Value::Path(path) = &k
                    && !seen.insert(path.clone())
                {
                    return Err(SchemaError::KeyCollision { key: path.clone() });
                }
                hydrated.push((k, update_value(v, prefix)?));
            }
            Ok(Value::Map(hydrated))
        }
        Value::Seq(items) => Ok(Value::Seq(
            items
                .into_iter()
                .map(|item| update_value(item, prefix))
                .collect::<Result<_, _>>()?,
        )),
        other => update_value(other, prefix),
    }
}

/// Hydrate a single value: records are walked, paths are prefixed, anything
/// else is returned as is.
pub fn update_value(value: Value, prefix: &Utf8Path) -> Result<Value, SchemaError> {
    Ok(match value {
        Value::Record(record) => Value::Record(hydrate_record(record, prefix)?),
        Value::Path(path) => Value::Path(prefix_path(&path, prefix)),
        other => other,
    })
}

/// `prefix / path`, always. An absolute `path` loses its root first.
pub fn prefix_path(path: &Utf8Path, prefix: &Utf8Path) -> Utf8PathBuf {
    let mut out = prefix.to_path_buf();
    for component in path.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir => {}
            other => out.push(other.as_str()),
        }
    }
    out
}

/// Every path leaf in `config` which already sits beneath `prefix`.
///
/// A non-empty result means the record has most likely been hydrated before.
pub fn hydrated_paths_under<R: Record>(config: &R, prefix: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut found = Vec::new();
    for (_, value) in config.fields() {
        collect_paths_under(&value, prefix, &mut found);
    }
    found
}

fn collect_paths_under(value: &Value, prefix: &Utf8Path, found: &mut Vec<Utf8PathBuf>) {
    match value {
        Value::Path(path) if path.starts_with(prefix) => found.push(path.clone()),
        Value::Seq(items) => {
            for item in items {
                collect_paths_under(item, prefix, found);
            }
        }
        Value::Map(pairs) => {
            for (k, v) in pairs {
                collect_paths_under(k, prefix, found);
                collect_paths_under(v, prefix, found);
            }
        }
        Value::Record(record) => {
            for (_, v) in &record.fields {
                collect_paths_under(v, prefix, found);
            }
        }
        _ => {}
    }
}
