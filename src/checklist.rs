//! Checksum manifests for output bundles, in the `b3sum` format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;

use crate::error::NbflowError;
use crate::hash::Hash32;

/// Predicate deciding whether a file is left out of a checklist.
pub type Exclusion<'a> = &'a dyn Fn(&Utf8Path) -> bool;

pub const CHECKLIST_FILE: &str = "checklist.chk";

pub fn get_file_digest(path: &Utf8Path) -> Result<Hash32, NbflowError> {
    Ok(Hash32::hash_file(path)?)
}

/// Digest every file not matched by any of `exclusions`.
pub fn create_digest_map<I>(
    files: I,
    exclusions: &[Exclusion],
) -> Result<BTreeMap<Utf8PathBuf, Hash32>, NbflowError>
where
    I: IntoIterator<Item = Utf8PathBuf>,
{
    let mut map = BTreeMap::new();

    for file in files {
        if exclusions.iter().any(|exclude| exclude(&file)) {
            tracing::debug!("Excluding {} from checklist", file);
            continue;
        }
        let digest = get_file_digest(&file)?;
        map.insert(file, digest);
    }

    Ok(map)
}

fn files_under(directory: &Utf8Path) -> Result<Vec<Utf8PathBuf>, NbflowError> {
    let pattern = format!("{}/**/*", Pattern::escape(directory.as_str()));
    let mut files = Vec::new();

    for entry in glob::glob(&pattern)? {
        let path = Utf8PathBuf::try_from(entry?)?;
        if path.is_file() {
            files.push(path);
        }
    }

    Ok(files)
}

/// Write a checklist of every file beneath `directory`, one line per file
/// with its digest and its path relative to `directory`, sorted by path.
///
/// The checklist defaults to `directory/checklist.chk` and never lists
/// itself.
pub fn generate_directory_checklist(
    directory: &Utf8Path,
    checklist_file: Option<&Utf8Path>,
    exclusions: &[Exclusion],
) -> Result<Utf8PathBuf, NbflowError> {
    if !directory.is_dir() {
        return Err(NbflowError::NotADirectory(directory.to_owned()));
    }

    let checklist_file = match checklist_file {
        Some(path) => path.to_owned(),
        None => directory.join(CHECKLIST_FILE),
    };

    let is_checklist = |path: &Utf8Path| path == checklist_file.as_path();
    let mut all: Vec<Exclusion> = vec![&is_checklist];
    all.extend_from_slice(exclusions);

    let digests = create_digest_map(files_under(directory)?, &all)?;

    let mut buffer = String::new();
    for (path, digest) in &digests {
        let relative = path.strip_prefix(directory).unwrap_or(path);
        writeln!(buffer, "{}  {}", digest, relative).ok();
    }

    if let Some(parent) = checklist_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&checklist_file, buffer)?;
    tracing::info!("Wrote checklist of {} files to {}", digests.len(), checklist_file);

    Ok(checklist_file)
}
