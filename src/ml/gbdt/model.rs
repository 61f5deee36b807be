use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ModelError;
use super::tree::RegressionTree;

/// Version written into new model files.
pub const MODEL_VERSION: i64 = 2;

/// Gradient-boosted tree model for multi-class classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Model format version.
    pub model_version: i64,
    /// Ordered feature column names expected by this model.
    pub feature_names: Vec<String>,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Learning rate applied to each tree prediction.
    pub learning_rate: f32,
    /// Depth limit the trees were grown under.
    pub max_depth: usize,
    /// Initial raw logits before boosting rounds.
    pub init_raw: Vec<f32>,
    /// Shape: `[n_rounds][n_classes]`.
    pub trees: Vec<Vec<RegressionTree>>,
}

impl GbdtModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes.len() < 2 {
            return Err(ModelError::Invalid(
                "Model must contain at least 2 classes".to_string(),
            ));
        }
        if self.init_raw.len() != self.classes.len() {
            return Err(ModelError::Invalid(
                "init_raw length must match classes length".to_string(),
            ));
        }
        for (round_idx, round) in self.trees.iter().enumerate() {
            if round.len() != self.classes.len() {
                return Err(ModelError::Invalid(format!(
                    "Round {round_idx} has {} trees but expected {}",
                    round.len(),
                    self.classes.len()
                )));
            }
            for tree in round {
                tree.check(self.feature_names.len()).map_err(|reason| {
                    ModelError::Invalid(format!("Round {round_idx}: {reason}"))
                })?;
                if tree.depth() > self.max_depth {
                    return Err(ModelError::Invalid(format!(
                        "Round {round_idx} has a tree of depth {} above max_depth {}",
                        tree.depth(),
                        self.max_depth
                    )));
                }
            }
        }
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|source| ModelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model as pretty JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let io_err = |source: std::io::Error| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| ModelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, bytes).map_err(io_err)
    }

    /// Raw per-class logits for one feature row.
    pub fn predict_raw(&self, features: &[f32]) -> Vec<f32> {
        let mut raw = self.init_raw.clone();
        for round in &self.trees {
            for (class_idx, tree) in round.iter().enumerate() {
                raw[class_idx] += self.learning_rate * tree.predict(features);
            }
        }
        raw
    }

    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        softmax(&self.predict_raw(features))
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_raw(features))
    }
}

/// Numerically stable softmax over a set of logits.
pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = raw.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return vec![1.0 / raw.len() as f32; raw.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties resolve to the first.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best { (idx, v) } else { (best_idx, best) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::gbdt::TreeNode;
    use tempfile::tempdir;

    fn split(left: f32, right: f32) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    fn two_class_model() -> GbdtModel {
        GbdtModel {
            model_version: MODEL_VERSION,
            feature_names: vec!["AccV".into(), "AccML".into()],
            classes: vec!["Normal".into(), "Turn".into()],
            learning_rate: 1.0,
            max_depth: 1,
            init_raw: vec![0.0, 0.0],
            trees: vec![vec![split(1.0, -1.0), split(-1.0, 1.0)]],
        }
    }

    #[test]
    fn model_predicts_argmax() {
        let model = two_class_model();
        assert_eq!(model.predict_class_index(&[0.0, 0.0]), 0);
        assert_eq!(model.predict_class_index(&[1.0, 0.0]), 1);
        let proba = model.predict_proba(&[1.0, 0.0]);
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }

    #[test]
    fn validate_rejects_bad_trees() {
        let mut model = two_class_model();
        model.trees[0][1].nodes[0] = TreeNode::Split {
            feature_index: 5,
            threshold: 0.0,
            left: 1,
            right: 2,
        };
        assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));

        let mut shallow = two_class_model();
        shallow.max_depth = 0;
        assert!(matches!(shallow.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("fog.json");
        let model = two_class_model();
        model.save_json(&path).unwrap();
        assert_eq!(GbdtModel::load_json(&path).unwrap(), model);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"split\""));
    }
}
