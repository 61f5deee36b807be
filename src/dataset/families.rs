use std::path::Path;

use tracing::info;

use super::{DatasetError, FILE_COLUMN, METADATA_ID_COLUMN, discover_csv_files, read_recordings};
use crate::optimize::reduce_memory_usage;
use crate::table::csv::read_csv;
use crate::table::{Table, Value, inner_join};

const TASK_COLUMN: &str = "Task";
const VALID_COLUMN: &str = "Valid";

/// The two recording protocols shipped with the competition data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFamily {
    /// Home recordings; rows carry `Valid` and `Task` annotations.
    Defog,
    /// Lab recordings; files may sit in nested directories.
    Tdcsfog,
}

impl DatasetFamily {
    pub fn name(self) -> &'static str {
        match self {
            DatasetFamily::Defog => "defog",
            DatasetFamily::Tdcsfog => "tdcsfog",
        }
    }

    fn recursive_discovery(self) -> bool {
        matches!(self, DatasetFamily::Tdcsfog)
    }

    fn dropped_columns(self) -> &'static [&'static str] {
        match self {
            DatasetFamily::Defog => &[FILE_COLUMN, VALID_COLUMN, TASK_COLUMN],
            DatasetFamily::Tdcsfog => &[FILE_COLUMN],
        }
    }
}

/// Load the defog training family.
pub fn load_defog(root: &Path, metadata_path: &Path) -> Result<Table, DatasetError> {
    load_family(DatasetFamily::Defog, root, metadata_path)
}

/// Load the tdcsfog training family.
pub fn load_tdcsfog(root: &Path, metadata_path: &Path) -> Result<Table, DatasetError> {
    load_family(DatasetFamily::Tdcsfog, root, metadata_path)
}

/// Discover, read, and optimize a family's recordings, then merge metadata.
///
/// Defog rows are restricted to annotated task windows (`Task == 1`) with
/// valid labels (`Valid == 1`) before merging.
pub fn load_family(
    family: DatasetFamily,
    root: &Path,
    metadata_path: &Path,
) -> Result<Table, DatasetError> {
    let paths = discover_csv_files(root, family.recursive_discovery())?;
    let recordings = read_recordings(&paths)?;
    let (mut recordings, _) = reduce_memory_usage(&recordings);

    if family == DatasetFamily::Defog {
        let task = recordings.require(TASK_COLUMN)?;
        let valid = recordings.require(VALID_COLUMN)?;
        let mask: Vec<bool> = task
            .data()
            .values()
            .zip(valid.data().values())
            .map(|(task, valid)| equals_one(task) && equals_one(valid))
            .collect();
        recordings = recordings.filter(&mask)?;
        let (rows, columns) = recordings.shape();
        info!("the shape of {} dataset is ({rows}, {columns})", family.name());
    }

    let metadata = read_csv(metadata_path)?;
    let merged = inner_join(&metadata, &recordings, METADATA_ID_COLUMN, FILE_COLUMN)?;
    let merged = merged.drop_columns(family.dropped_columns())?;
    info!(
        "Merged {} recordings with metadata: {} rows, {} columns",
        family.name(),
        merged.num_rows(),
        merged.num_columns()
    );
    Ok(merged)
}

/// Truthy annotation check that survives categorical encoding of booleans.
fn equals_one(value: Value<'_>) -> bool {
    match value {
        Value::Int(v) => v == 1,
        Value::Float(v) => v == 1.0,
        Value::Bool(v) => v,
        Value::Text(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        Value::Null | Value::Timestamp(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defog_filters_and_merges_metadata() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("defog");
        std::fs::create_dir(&train).unwrap();
        std::fs::write(
            train.join("abc.csv"),
            "Time,AccV,AccML,AccAP,StartHesitation,Turn,Walking,Valid,Task\n\
             0,0.1,0.2,0.3,0,0,0,True,True\n\
             1,0.1,0.2,0.3,0,1,0,False,True\n\
             2,0.1,0.2,0.3,0,1,0,True,False\n\
             3,0.1,0.2,0.3,0,0,1,True,True\n",
        )
        .unwrap();
        let metadata = dir.path().join("defog_metadata.csv");
        std::fs::write(&metadata, "Id,Subject,Visit\nabc,s1,2\nzzz,s2,1\n").unwrap();

        let table = load_defog(&train, &metadata).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert!(table.column(FILE_COLUMN).is_none());
        assert!(table.column(VALID_COLUMN).is_none());
        assert!(table.column(TASK_COLUMN).is_none());
        assert_eq!(table.require("Subject").unwrap().value(0), Value::Text("s1"));
        assert_eq!(table.require("Time").unwrap().value(1), Value::Int(3));
    }

    #[test]
    fn tdcsfog_reads_nested_files() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("tdcsfog");
        std::fs::create_dir_all(train.join("nested")).unwrap();
        let header = "Time,AccV,AccML,AccAP,StartHesitation,Turn,Walking\n";
        std::fs::write(train.join("r1.csv"), format!("{header}0,1.0,2.0,3.0,1,0,0\n")).unwrap();
        std::fs::write(
            train.join("nested").join("r2.csv"),
            format!("{header}0,1.0,2.0,3.0,0,0,1\n1,1.0,2.0,3.0,0,0,0\n"),
        )
        .unwrap();
        let metadata = dir.path().join("tdcsfog_metadata.csv");
        std::fs::write(&metadata, "Id,Medication\nr1,on\nr2,off\n").unwrap();

        let table = load_tdcsfog(&train, &metadata).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert!(table.column(FILE_COLUMN).is_none());
        assert_eq!(table.require("Id").unwrap().value(2), Value::Text("r2"));
    }

    #[test]
    fn missing_recordings_are_fatal() {
        let dir = tempdir().unwrap();
        let metadata = dir.path().join("meta.csv");
        std::fs::write(&metadata, "Id\nx\n").unwrap();
        let train = dir.path().join("tdcsfog");
        std::fs::create_dir(&train).unwrap();
        let err = load_tdcsfog(&train, &metadata).unwrap_err();
        assert!(matches!(err, DatasetError::NoFilesFound { .. }));
    }

    #[test]
    fn truthy_annotations() {
        assert!(equals_one(Value::Int(1)));
        assert!(equals_one(Value::Text("True")));
        assert!(equals_one(Value::Bool(true)));
        assert!(!equals_one(Value::Text("False")));
        assert!(!equals_one(Value::Null));
    }
}
