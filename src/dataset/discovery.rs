use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{DatasetError, FILE_COLUMN};
use crate::table::csv::read_csv;
use crate::table::{Column, Table, concat};

/// Sorted `*.csv` paths under `root`.
///
/// With `recursive` set, subdirectories are walked too. An empty result is a
/// [`DatasetError::NoFilesFound`] error.
pub fn discover_csv_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, DatasetError> {
    let mut found = Vec::new();
    collect_csv_files(root, recursive, &mut found)?;
    if found.is_empty() {
        return Err(DatasetError::NoFilesFound {
            root: root.to_path_buf(),
        });
    }
    found.sort();
    debug!("Discovered {} CSV files under {}", found.len(), root.display());
    Ok(found)
}

fn collect_csv_files(
    dir: &Path,
    recursive: bool,
    found: &mut Vec<PathBuf>,
) -> Result<(), DatasetError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DatasetError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if recursive {
                collect_csv_files(&path, recursive, found)?;
            }
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Stem of a recording file, used as its identifier.
pub(crate) fn recording_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Read every file, tag rows with their file stem, and concatenate once.
pub fn read_recordings(paths: &[PathBuf]) -> Result<Table, DatasetError> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let table = read_csv(path)?;
        let rows = table.num_rows();
        let tagged = table.with_column(Column::constant_text(
            FILE_COLUMN,
            &recording_id(path),
            rows,
        ))?;
        tables.push(tagged);
    }
    let combined = concat(&tables)?;
    info!(
        "Read {} recordings with {} rows",
        paths.len(),
        combined.num_rows()
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::tempdir;

    #[test]
    fn empty_directory_reports_no_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let err = discover_csv_files(dir.path(), false).unwrap_err();
        assert!(matches!(err, DatasetError::NoFilesFound { root } if root == dir.path()));
    }

    #[test]
    fn recursive_discovery_walks_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.csv"), "Time\n0\n").unwrap();
        std::fs::write(dir.path().join("nested").join("a.csv"), "Time\n0\n").unwrap();

        let flat = discover_csv_files(dir.path(), false).unwrap();
        assert_eq!(flat.len(), 1);
        let deep = discover_csv_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn recordings_are_tagged_with_file_stem() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("rec1.csv"), "Time,AccV\n0,0.5\n1,0.25\n").unwrap();
        std::fs::write(dir.path().join("rec2.csv"), "Time,AccV\n0,1.5\n").unwrap();
        let paths = discover_csv_files(dir.path(), false).unwrap();
        let table = read_recordings(&paths).unwrap();
        assert_eq!(table.shape(), (3, 3));
        let file = table.require(FILE_COLUMN).unwrap();
        assert_eq!(file.value(0), Value::Text("rec1"));
        assert_eq!(file.value(2), Value::Text("rec2"));
    }
}
