use tracing::debug;

use super::TrainError;
use super::model::{GbdtModel, MODEL_VERSION, softmax};
use super::tree::{RegressionTree, TreeNode, goes_left};

/// Splits must reduce the squared error by more than this.
const MIN_GAIN: f64 = 1e-12;

/// Training hyperparameters for tree boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of boosting rounds.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
    /// Maximum number of splits on any root-to-leaf path.
    pub max_depth: usize,
    /// Fewest training rows a leaf may hold.
    pub min_samples_leaf: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 1000,
            learning_rate: 0.03,
            bins: 32,
            max_depth: 7,
            min_samples_leaf: 20,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Ordered feature column names; their count is the row width.
    pub feature_names: Vec<String>,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Train a multi-class model by softmax gradient boosting.
///
/// Each round fits one regression tree per class to that class's residuals
/// (`target - probability`). Split search runs on equal-width feature bins;
/// rows are routed by their raw values so training and prediction agree.
pub fn train_gbdt(dataset: &TrainDataset, options: &TrainOptions) -> Result<GbdtModel, TrainError> {
    if dataset.x.len() != dataset.y.len() {
        return Err(TrainError::LengthMismatch {
            x: dataset.x.len(),
            y: dataset.y.len(),
        });
    }
    if dataset.x.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err(TrainError::TooFewClasses(n_classes));
    }

    let bins = FeatureBins::fit(&dataset.x, dataset.feature_names.len(), options.bins);
    let init_raw: Vec<f32> = class_priors(&dataset.y, n_classes)
        .into_iter()
        .map(|p| p.max(1e-6).ln())
        .collect();
    let mut raw = vec![init_raw.clone(); dataset.x.len()];
    let all_rows: Vec<usize> = (0..dataset.x.len()).collect();

    let mut rounds_out: Vec<Vec<RegressionTree>> = Vec::with_capacity(options.rounds);
    for round in 0..options.rounds {
        let residuals = compute_residuals(&dataset.y, &raw, n_classes);
        let mut trees = Vec::with_capacity(n_classes);
        for (class_idx, class_residuals) in residuals.iter().enumerate() {
            let grower = TreeGrower {
                bins: &bins,
                x: &dataset.x,
                residuals: class_residuals,
                max_depth: options.max_depth,
                min_leaf: options.min_samples_leaf.max(1),
                nodes: Vec::new(),
            };
            let tree = grower.grow(all_rows.clone());
            for (row, logits) in dataset.x.iter().zip(raw.iter_mut()) {
                logits[class_idx] += options.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }
        rounds_out.push(trees);
        if (round + 1) % 100 == 0 {
            debug!("Boosting round {}/{}", round + 1, options.rounds);
        }
    }

    Ok(GbdtModel {
        model_version: MODEL_VERSION,
        feature_names: dataset.feature_names.clone(),
        classes: dataset.classes.clone(),
        learning_rate: options.learning_rate,
        max_depth: options.max_depth,
        init_raw,
        trees: rounds_out,
    })
}

fn class_priors(y: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];
    for &label in y.iter().filter(|&&label| label < n_classes) {
        counts[label] += 1;
    }
    let total = y.len().max(1) as f32;
    counts.into_iter().map(|c| c as f32 / total).collect()
}

/// Per-class residuals, shape `[n_classes][n_rows]`.
fn compute_residuals(y: &[usize], raw: &[Vec<f32>], n_classes: usize) -> Vec<Vec<f32>> {
    let mut residuals = vec![vec![0.0f32; y.len()]; n_classes];
    for (row, (&label, logits)) in y.iter().zip(raw).enumerate() {
        for (class_idx, p) in softmax(logits).into_iter().enumerate() {
            let target = if label == class_idx { 1.0 } else { 0.0 };
            residuals[class_idx][row] = target - p;
        }
    }
    residuals
}

/// Equal-width bin codes per row and feature. NaN lands in bin 0, the side
/// missing readings are routed to.
struct FeatureBins {
    mins: Vec<f32>,
    maxs: Vec<f32>,
    count: usize,
    codes: Vec<Vec<u8>>,
}

impl FeatureBins {
    fn fit(x: &[Vec<f32>], n_features: usize, bins: usize) -> Self {
        let mut mins = vec![f32::INFINITY; n_features];
        let mut maxs = vec![f32::NEG_INFINITY; n_features];
        for row in x {
            for (j, &v) in row.iter().take(n_features).enumerate() {
                if v.is_finite() {
                    mins[j] = mins[j].min(v);
                    maxs[j] = maxs[j].max(v);
                }
            }
        }
        for (min, max) in mins.iter_mut().zip(maxs.iter_mut()) {
            if !min.is_finite() || !max.is_finite() {
                *min = 0.0;
                *max = 0.0;
            }
            if *min == *max {
                *max = *min + 1.0;
            }
        }
        let mut bins = Self {
            mins,
            maxs,
            count: bins.clamp(2, 256),
            codes: Vec::with_capacity(x.len()),
        };
        let codes: Vec<Vec<u8>> = x
            .iter()
            .map(|row| {
                (0..n_features)
                    .map(|j| bins.code(j, row.get(j).copied().unwrap_or(0.0)))
                    .collect()
            })
            .collect();
        bins.codes = codes;
        bins
    }

    fn n_features(&self) -> usize {
        self.mins.len()
    }

    fn code(&self, feature: usize, value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        let (min, max) = (self.mins[feature], self.maxs[feature]);
        let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
        ((t * self.count as f32) as usize).min(self.count - 1) as u8
    }

    /// Upper edge of `bin`, used as the split threshold.
    fn threshold(&self, feature: usize, bin: usize) -> f32 {
        let (min, max) = (self.mins[feature], self.maxs[feature]);
        min + ((bin + 1) as f32 / self.count as f32) * (max - min)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature: usize,
    bin: usize,
}

/// Grows one tree depth-first; node indices follow creation order.
struct TreeGrower<'a> {
    bins: &'a FeatureBins,
    x: &'a [Vec<f32>],
    residuals: &'a [f32],
    max_depth: usize,
    min_leaf: usize,
    nodes: Vec<TreeNode>,
}

impl TreeGrower<'_> {
    fn grow(mut self, rows: Vec<usize>) -> RegressionTree {
        self.grow_node(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow_node(&mut self, rows: Vec<usize>, depth: usize) -> u32 {
        let idx = self.nodes.len();
        let sum: f64 = rows.iter().map(|&row| self.residuals[row] as f64).sum();
        let value = (sum / rows.len().max(1) as f64) as f32;
        self.nodes.push(TreeNode::Leaf { value });
        if depth >= self.max_depth || rows.len() < 2 * self.min_leaf {
            return idx as u32;
        }
        let Some(best) = self.best_split(&rows, sum) else {
            return idx as u32;
        };

        let threshold = self.bins.threshold(best.feature, best.bin);
        let x = self.x;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&row| {
            goes_left(x[row].get(best.feature).copied().unwrap_or(0.0), threshold)
        });
        if left_rows.len() < self.min_leaf || right_rows.len() < self.min_leaf {
            return idx as u32;
        }
        let left = self.grow_node(left_rows, depth + 1);
        let right = self.grow_node(right_rows, depth + 1);
        self.nodes[idx] = TreeNode::Split {
            feature_index: best.feature as u16,
            threshold,
            left,
            right,
        };
        idx as u32
    }

    /// Histogram search for the split with the largest squared-error
    /// reduction. Ties keep the earlier feature and bin.
    fn best_split(&self, rows: &[usize], total_sum: f64) -> Option<SplitCandidate> {
        let n = rows.len();
        let parent_score = total_sum * total_sum / n as f64;
        let mut counts = vec![0usize; self.bins.count];
        let mut sums = vec![0f64; self.bins.count];
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.bins.n_features() {
            counts.fill(0);
            sums.fill(0.0);
            for &row in rows {
                let bin = self.bins.codes[row][feature] as usize;
                counts[bin] += 1;
                sums[bin] += self.residuals[row] as f64;
            }

            let (mut left_n, mut left_sum) = (0usize, 0f64);
            for bin in 0..self.bins.count - 1 {
                left_n += counts[bin];
                left_sum += sums[bin];
                let right_n = n - left_n;
                if left_n < self.min_leaf || right_n < self.min_leaf {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let gain = left_sum * left_sum / left_n as f64
                    + right_sum * right_sum / right_n as f64
                    - parent_score;
                if gain > MIN_GAIN && best.is_none_or(|current| gain > current.gain) {
                    best = Some(SplitCandidate { gain, feature, bin });
                }
            }
        }
        best
    }
}
