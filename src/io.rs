use std::fmt::Display;
use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use console::Style;
use glob::Pattern;

use crate::error::NbflowError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

pub(crate) fn create_parent(path: &Utf8Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, NbflowError> {
    Ok(patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<Result<_, _>>()?)
}

/// Recursively copy `src` into `dst`, skipping every entry whose file name
/// matches one of `ignore`. Existing files in `dst` are overwritten.
pub(crate) fn copy_rec(
    src: &Utf8Path,
    dst: &Utf8Path,
    ignore: &[Pattern],
) -> Result<usize, NbflowError> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in src.read_dir_utf8()? {
        let entry = entry?;
        if ignore.iter().any(|p| p.matches(entry.file_name())) {
            continue;
        }

        let target: Utf8PathBuf = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_rec(entry.path(), &target, ignore)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}
