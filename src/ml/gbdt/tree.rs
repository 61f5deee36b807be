use serde::{Deserialize, Serialize};

/// One node of a regression tree. Children always sit after their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature_index: u16,
        /// Rows with `feature <= threshold` (or a missing reading) go left.
        threshold: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        value: f32,
    },
}

/// Binary regression tree stored as a flat node list with the root first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn leaf(value: f32) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Walk from the root to a leaf. Missing features read as 0.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    idx = if goes_left(value, *threshold) {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => break,
            }
        }
        0.0
    }

    /// Longest root-to-leaf path, counted in splits.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut deepest = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let here = depths[idx];
            deepest = deepest.max(here);
            if let TreeNode::Split { left, right, .. } = node {
                for child in [*left as usize, *right as usize] {
                    if let Some(slot) = depths.get_mut(child) {
                        *slot = here + 1;
                    }
                }
            }
        }
        deepest
    }

    /// Check the node layout against a feature count.
    pub(super) fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            let TreeNode::Split {
                feature_index,
                left,
                right,
                ..
            } = node
            else {
                continue;
            };
            if *feature_index as usize >= n_features {
                return Err(format!(
                    "node {idx} splits on feature {feature_index} of {n_features}"
                ));
            }
            for child in [*left as usize, *right as usize] {
                if child <= idx || child >= self.nodes.len() {
                    return Err(format!("node {idx} points at invalid child {child}"));
                }
            }
        }
        Ok(())
    }
}

/// Routing rule shared by training and prediction.
pub(super) fn goes_left(value: f32, threshold: f32) -> bool {
    value.is_nan() || value <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x0 <= 0.5 ? (x1 <= 0.5 ? 1 : 2) : 3
    fn two_level_tree() -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 4,
                },
                TreeNode::Split {
                    feature_index: 1,
                    threshold: 0.5,
                    left: 2,
                    right: 3,
                },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
                TreeNode::Leaf { value: 3.0 },
            ],
        }
    }

    #[test]
    fn predict_walks_to_the_matching_leaf() {
        let tree = two_level_tree();
        assert_eq!(tree.predict(&[0.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[0.5, 0.9]), 2.0);
        assert_eq!(tree.predict(&[0.6, 0.0]), 3.0);
        assert_eq!(tree.predict(&[f32::NAN, f32::NAN]), 1.0);
        assert_eq!(tree.depth(), 2);
        assert_eq!(RegressionTree::leaf(0.25).depth(), 0);
    }

    #[test]
    fn check_rejects_backward_children_and_unknown_features() {
        let tree = two_level_tree();
        assert!(tree.check(2).is_ok());
        assert!(tree.check(1).is_err());

        let mut looped = two_level_tree();
        looped.nodes[1] = TreeNode::Split {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 3,
        };
        assert!(looped.check(2).is_err());
        assert_eq!(looped.predict(&[0.0, 0.0]), 0.0);
    }
}
