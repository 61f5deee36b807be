//! Full pipeline runs over a miniature competition data tree.

mod support {
    pub mod fog_tree;
}

use std::path::Path;

use gaitfog::config::PipelineConfig;
use gaitfog::dataset::DatasetError;
use gaitfog::ml::gbdt::GbdtModel;
use gaitfog::pipeline::{PipelineError, run};
use gaitfog::table::csv::read_csv;
use gaitfog::table::Value;
use support::fog_tree::{DEFOG_TEST_ROWS, TDCSFOG_TEST_ROWS, write_fog_tree};
use tempfile::tempdir;

fn small_config(root: &Path, out_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data.root = root.to_path_buf();
    config.training.rounds = 20;
    config.training.learning_rate = 0.3;
    config.training.bins = 8;
    config.training.max_depth = 3;
    config.training.min_samples_leaf = 5;
    config.output.submission = out_dir.join("submission.csv");
    config
}

#[test]
fn writes_submission_for_both_test_files() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_fog_tree(data.path());
    let mut config = small_config(data.path(), out.path());
    config.output.model = Some(out.path().join("models/model.json"));

    let outcome = run(&config).unwrap();
    assert_eq!(outcome.defog_shape.0, 86);
    assert_eq!(outcome.tdcsfog_shape.0, 55);
    assert_eq!(outcome.submission_rows, TDCSFOG_TEST_ROWS + DEFOG_TEST_ROWS);
    assert!(outcome.evaluation.rows > 0);
    assert!((0.0..=1.0).contains(&outcome.evaluation.macro_precision));

    let submission = read_csv(&outcome.submission_path).unwrap();
    assert_eq!(
        submission.column_names(),
        vec!["Id", "StartHesitation", "Turn", "Walking"]
    );
    assert_eq!(submission.num_rows(), TDCSFOG_TEST_ROWS + DEFOG_TEST_ROWS);
    let ids = submission.require("Id").unwrap();
    assert_eq!(ids.value(0), Value::Text("003f117e14_0"));
    assert_eq!(ids.value(TDCSFOG_TEST_ROWS), Value::Text("02ab235146_0"));
    for row in 0..submission.num_rows() {
        let set: i64 = ["StartHesitation", "Turn", "Walking"]
            .iter()
            .map(|name| submission.require(name).unwrap().value(row).as_i64().unwrap())
            .inspect(|value| assert!(*value == 0 || *value == 1))
            .sum();
        assert!(set <= 1);
    }

    let model = GbdtModel::load_json(&out.path().join("models/model.json")).unwrap();
    assert_eq!(model.classes, vec!["Normal", "StartHesitation", "Turn", "Walking"]);
    assert_eq!(model.feature_names, vec!["AccV", "AccML", "AccAP"]);
    assert_eq!(model.max_depth, 3);
    assert!(model.trees.iter().flatten().all(|tree| tree.depth() <= 3));
}

#[test]
fn tdcsfog_rows_can_join_training() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_fog_tree(data.path());
    let mut config = small_config(data.path(), out.path());

    let defog_only = run(&config).unwrap();
    config.training.include_tdcsfog = true;
    let combined = run(&config).unwrap();
    assert_eq!(
        combined.train_rows + combined.evaluation.rows,
        defog_only.train_rows + defog_only.evaluation.rows + 55
    );
}

#[test]
fn empty_training_directory_is_fatal() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_fog_tree(data.path());
    std::fs::remove_dir_all(data.path().join("train/defog")).unwrap();
    std::fs::create_dir_all(data.path().join("train/defog")).unwrap();

    let err = run(&small_config(data.path(), out.path())).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Dataset(DatasetError::NoFilesFound { .. })
    ));
    assert!(!out.path().join("submission.csv").exists());
}

#[test]
fn missing_sample_submission_only_skips_the_header_check() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_fog_tree(data.path());
    std::fs::remove_file(data.path().join("sample_submission.csv")).unwrap();

    let outcome = run(&small_config(data.path(), out.path())).unwrap();
    assert!(outcome.submission_path.is_file());
}
