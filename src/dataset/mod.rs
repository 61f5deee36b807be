//! Sensor recording datasets: discovery, family loaders, and event labels.

mod discovery;
pub mod events;
mod families;

use std::path::PathBuf;

use thiserror::Error;

use crate::table::TableError;
use crate::table::csv::CsvError;

pub use discovery::{discover_csv_files, read_recordings};
pub use events::{EVENT_CLASSES, LabelEncoder, feature_matrix, label_events};
pub use families::{DatasetFamily, load_defog, load_family, load_tdcsfog};

/// Name of the column holding each row's source file stem.
pub const FILE_COLUMN: &str = "file";
/// Metadata join key.
pub const METADATA_ID_COLUMN: &str = "Id";
/// Accelerometer channels used as model features.
pub const FEATURE_COLUMNS: [&str; 3] = ["AccV", "AccML", "AccAP"];
/// Binary indicator columns for the three FOG event types.
pub const INDICATOR_COLUMNS: [&str; 3] = ["StartHesitation", "Turn", "Walking"];

#[derive(Debug, Error)]
pub enum DatasetError {
    /// File discovery returned nothing for a root directory.
    #[error("No CSV files found in {root}")]
    NoFilesFound { root: PathBuf },
    #[error("Failed to list {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Table(#[from] TableError),
    /// An event label outside the fitted class set.
    #[error("Unknown class label: {0}")]
    UnknownLabel(String),
}
