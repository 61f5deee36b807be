//! Pipeline configuration stored as TOML.
//!
//! Every field has a default matching the competition's Kaggle layout, so a
//! missing config file or a partial one is fine. Relative data paths resolve
//! against `data.root`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::ml::gbdt::TrainOptions;

/// File name of the pipeline config inside the application directory.
pub const CONFIG_FILE_NAME: &str = "gaitfog.toml";
/// Input root of the competition data on Kaggle.
pub const KAGGLE_DATA_ROOT: &str = "/kaggle/input/tlvmc-parkinsons-freezing-gait-prediction";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved.
    #[error("Config directory unavailable: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    /// A value is outside its accepted range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataPaths,
    pub training: TrainingSettings,
    pub output: OutputSettings,
}

/// Where the training recordings, metadata, and test recordings live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub root: PathBuf,
    pub defog_dir: PathBuf,
    pub defog_metadata: PathBuf,
    pub tdcsfog_dir: PathBuf,
    pub tdcsfog_metadata: PathBuf,
    /// Test recordings, predicted and written in this order.
    pub test_files: Vec<PathBuf>,
    /// Optional sample submission whose header the output must match.
    pub sample_submission: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from(KAGGLE_DATA_ROOT),
            defog_dir: PathBuf::from("train/defog"),
            defog_metadata: PathBuf::from("defog_metadata.csv"),
            tdcsfog_dir: PathBuf::from("train/tdcsfog"),
            tdcsfog_metadata: PathBuf::from("tdcsfog_metadata.csv"),
            test_files: vec![
                PathBuf::from("test/tdcsfog/003f117e14.csv"),
                PathBuf::from("test/defog/02ab235146.csv"),
            ],
            sample_submission: Some(PathBuf::from("sample_submission.csv")),
        }
    }
}

impl DataPaths {
    /// Resolve `path` against the data root unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Classifier and split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub rounds: usize,
    pub learning_rate: f32,
    pub bins: usize,
    /// Deepest split path allowed in each tree.
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Share of labelled rows held out for evaluation.
    pub test_fraction: f64,
    pub split_seed: String,
    /// Add the tdcsfog recordings to the training rows.
    pub include_tdcsfog: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        let options = TrainOptions::default();
        Self {
            rounds: options.rounds,
            learning_rate: options.learning_rate,
            bins: options.bins,
            max_depth: options.max_depth,
            min_samples_leaf: options.min_samples_leaf,
            test_fraction: 0.2,
            split_seed: "gaitfog-split-v1".to_string(),
            include_tdcsfog: false,
        }
    }
}

impl TrainingSettings {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            rounds: self.rounds,
            learning_rate: self.learning_rate,
            bins: self.bins,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub submission: PathBuf,
    /// Save the trained model as JSON when set.
    pub model: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            submission: PathBuf::from("submission.csv"),
            model: None,
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path, or from the application directory.
    ///
    /// An explicit path must exist. The default location falls back to
    /// defaults when no file is present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if !(0.0..1.0).contains(&training.test_fraction) {
            return Err(ConfigError::Invalid {
                field: "training.test_fraction",
                reason: format!("{} is outside [0, 1)", training.test_fraction),
            });
        }
        if training.rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "training.rounds",
                reason: "must be at least 1".to_string(),
            });
        }
        if training.bins < 2 {
            return Err(ConfigError::Invalid {
                field: "training.bins",
                reason: format!("{} is below 2", training.bins),
            });
        }
        if training.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "training.max_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if training.min_samples_leaf == 0 {
            return Err(ConfigError::Invalid {
                field: "training.min_samples_leaf",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(training.learning_rate.is_finite() && training.learning_rate > 0.0) {
            return Err(ConfigError::Invalid {
                field: "training.learning_rate",
                reason: format!("{} is not a positive number", training.learning_rate),
            });
        }
        Ok(())
    }
}

/// Default config file location inside the application directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[data]\nroot = \"/data/fog\"\n\n[training]\nrounds = 25\ninclude_tdcsfog = true\n",
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.data.root, PathBuf::from("/data/fog"));
        assert_eq!(config.data.defog_dir, PathBuf::from("train/defog"));
        assert_eq!(config.training.rounds, 25);
        assert!(config.training.include_tdcsfog);
        assert_eq!(config.training.learning_rate, 0.03);
        assert_eq!(config.training.max_depth, 7);
        assert_eq!(config.output.submission, PathBuf::from("submission.csv"));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let paths = DataPaths::default();
        assert_eq!(
            paths.resolve(Path::new("train/defog")),
            PathBuf::from(KAGGLE_DATA_ROOT).join("train/defog")
        );
        assert_eq!(paths.resolve(Path::new("/tmp/x.csv")), PathBuf::from("/tmp/x.csv"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = PipelineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_and_out_of_range_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[training]\nrounds = \"many\"\n").unwrap();
        assert!(matches!(
            PipelineConfig::load(Some(&path)),
            Err(ConfigError::ParseToml { .. })
        ));

        std::fs::write(&path, "[training]\ntest_fraction = 1.5\n").unwrap();
        assert!(matches!(
            PipelineConfig::load(Some(&path)),
            Err(ConfigError::Invalid { field: "training.test_fraction", .. })
        ));

        std::fs::write(&path, "[training]\nmax_depth = 0\n").unwrap();
        assert!(matches!(
            PipelineConfig::load(Some(&path)),
            Err(ConfigError::Invalid { field: "training.max_depth", .. })
        ));
    }

    #[test]
    fn serialized_defaults_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let defaults = PipelineConfig::default();
        std::fs::write(&path, defaults.to_toml().unwrap()).unwrap();
        assert_eq!(PipelineConfig::load_from(&path).unwrap(), defaults);
    }
}
