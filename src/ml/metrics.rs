//! Evaluation metrics for classification models.

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one prediction; out-of-range indices are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }
}

#[derive(Debug, Clone)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// Unweighted mean of per-class precision over the classes that occur.
///
/// A class counts when it appears as a truth or a prediction. Classes that
/// occur but are never predicted contribute zero, and label imbalance is not
/// taken into account.
pub fn macro_precision(cm: &ConfusionMatrix) -> f32 {
    let stats = precision_recall_by_class(cm);
    let present: Vec<f32> = stats
        .iter()
        .enumerate()
        .filter(|(class_idx, s)| {
            s.support > 0 || (0..cm.n_classes).any(|truth| cm.get(truth, *class_idx) > 0)
        })
        .map(|(_, s)| s.precision)
        .collect();
    if present.is_empty() {
        return 0.0;
    }
    present.iter().sum::<f32>() / present.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(pairs: &[(usize, usize)], k: usize) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(k);
        for &(truth, predicted) in pairs {
            cm.add(truth, predicted);
        }
        cm
    }

    #[test]
    fn per_class_precision_and_recall() {
        let cm = matrix(&[(0, 0), (0, 1), (1, 1), (1, 1)], 2);
        let stats = precision_recall_by_class(&cm);
        assert!((stats[0].precision - 1.0).abs() < 1e-6);
        assert!((stats[0].recall - 0.5).abs() < 1e-6);
        assert!((stats[1].precision - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(stats[1].support, 2);
        assert!((accuracy(&cm) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn macro_precision_averages_occurring_classes() {
        let cm = matrix(&[(0, 0), (0, 1), (1, 1), (1, 1)], 3);
        let expected = (1.0 + 2.0 / 3.0) / 2.0;
        assert!((macro_precision(&cm) - expected).abs() < 1e-6);

        let never_predicted = matrix(&[(0, 0), (2, 0)], 3);
        let expected = (0.5 + 0.0) / 2.0;
        assert!((macro_precision(&never_predicted) - expected).abs() < 1e-6);
        assert_eq!(macro_precision(&ConfusionMatrix::new(0)), 0.0);
    }

    #[test]
    fn out_of_range_labels_are_ignored() {
        let cm = matrix(&[(0, 4), (7, 0)], 2);
        assert_eq!(cm.counts.iter().sum::<u32>(), 0);
    }
}
