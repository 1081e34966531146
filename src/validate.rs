//! Checks run while a configuration or bundle is being built.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{NbflowError, ValidationError};
use crate::lookup::get_step_config_ids;
use crate::value::Field;

pub fn assert_path_exists(path: &Utf8Path) -> Result<(), ValidationError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ValidationError::PathMissing(path.to_owned()))
    }
}

pub fn assert_path_is_absolute(path: &Utf8Path) -> Result<(), ValidationError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(ValidationError::NotAbsolute(path.to_owned()))
    }
}

fn absolute(path: &Utf8Path) -> Utf8PathBuf {
    if let Ok(path) = path.canonicalize_utf8() {
        return path;
    }
    std::path::absolute(path)
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| path.to_owned())
}

/// `path` must sit beneath `root`. Both are compared as absolute paths.
pub fn assert_path_is_subdirectory_of(
    field: &str,
    path: &Utf8Path,
    root: &Utf8Path,
) -> Result<(), ValidationError> {
    if absolute(path).starts_with(absolute(root)) {
        Ok(())
    } else {
        Err(ValidationError::NotSubdirectory {
            field: field.to_owned(),
            path: path.to_owned(),
            root: root.to_owned(),
        })
    }
}

/// Every id must appear once. The error names each duplicated id once, in
/// the order its second occurrence was seen.
pub fn assert_step_config_ids_are_unique<S: AsRef<str>>(ids: &[S]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();

    for id in ids {
        let id = id.as_ref();
        if !seen.insert(id) && !duplicates.iter().any(|d| d == id) {
            duplicates.push(id.to_owned());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::DuplicateIds(duplicates))
    }
}

/// [`assert_step_config_ids_are_unique`] over a list of step configurations.
pub fn assert_step_configs_are_unique<T: Field>(
    field: &str,
    step_configs: &[T],
) -> Result<(), NbflowError> {
    let ids = get_step_config_ids(step_configs)?;
    assert_step_config_ids_are_unique(&ids).map_err(|e| e.in_field(field))?;
    Ok(())
}
