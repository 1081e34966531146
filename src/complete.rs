use std::fs;

use camino::Utf8Path;

use crate::error::NbflowError;
use crate::io::create_parent;
use crate::settings::timestamp;

/// Write a marker file recording that a run finished. Defaults to the
/// current timestamp as contents.
pub fn write_complete_file(path: &Utf8Path, contents: Option<&str>) -> Result<(), NbflowError> {
    let contents = match contents {
        Some(contents) => contents.to_owned(),
        None => timestamp(),
    };

    create_parent(path)?;
    fs::write(path, contents)?;
    tracing::info!("Wrote completion marker {}", path);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_write_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap().join("complete.txt");

        write_complete_file(&out, Some("Some interesting information")).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "Some interesting information");
    }

    #[test]
    fn test_write_complete_file_default() {
        let dir = tempfile::tempdir().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap().join("complete.txt");

        write_complete_file(&out, None).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        chrono::NaiveDateTime::parse_from_str(&text, "%Y%m%d%H%M%S").unwrap();
    }
}
