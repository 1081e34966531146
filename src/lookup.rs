//! Finding a single step configuration by its `step_config_id`.

use crate::error::{NbflowError, NotFoundError, SchemaError};
use crate::record::Record;
use crate::value::{Field, Value};

/// Name of the field every step configuration must carry.
pub const STEP_CONFIG_ID: &str = "step_config_id";

fn step_config_id_of(index: usize, item: &Value) -> Result<String, SchemaError> {
    match item.get(STEP_CONFIG_ID) {
        Some(Value::Str(id)) => Ok(id.clone()),
        Some(other) => Err(SchemaError::mismatch("string", other).in_field(STEP_CONFIG_ID)),
        None => Err(SchemaError::MissingStepConfigId {
            item: format!("element {index} ({})", item.kind()),
        }),
    }
}

fn ids_of(items: &[Value]) -> Result<Vec<String>, SchemaError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| step_config_id_of(i, item))
        .collect()
}

/// Every `step_config_id`, in order.
pub fn get_step_config_ids<T: Field>(step_configs: &[T]) -> Result<Vec<String>, SchemaError> {
    let values: Vec<Value> = step_configs.iter().map(Field::to_value).collect();
    ids_of(&values)
}

/// Every `step_config_id` stored under the field `step` of `config`.
pub fn get_step_config_ids_for<R: Record>(config: &R, step: &str) -> Result<Vec<String>, SchemaError> {
    match config.field(step)? {
        Value::Seq(items) => ids_of(&items).map_err(|e| e.in_field(step)),
        other => Err(SchemaError::mismatch("sequence", &other).in_field(step)),
    }
}

/// Get the configuration for the variant `step_config_id` of `step`.
///
/// The first match wins. Fails with [`NotFoundError`] listing every
/// available id when nothing matches.
pub fn get_config_for_step_id<R, S>(
    config: &R,
    step: &str,
    step_config_id: &str,
) -> Result<S, NbflowError>
where
    R: Record,
    S: Field,
{
    let items = match config.field(step)? {
        Value::Seq(items) => items,
        other => return Err(SchemaError::mismatch("sequence", &other).in_field(step).into()),
    };

    let available = ids_of(&items).map_err(|e| e.in_field(step))?;

    match available.iter().position(|id| id == step_config_id) {
        Some(i) => {
            let item = items.into_iter().nth(i).unwrap_or(Value::Null);
            Ok(S::from_value(item).map_err(|e| e.in_field(step))?)
        }
        None => Err(NotFoundError {
            step: step.to_owned(),
            step_config_id: step_config_id.to_owned(),
            available,
        }
        .into()),
    }
}
