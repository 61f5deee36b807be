//! Deterministic stratified train/test split.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Test fraction must be within [0, 1), got {0}")]
    InvalidFraction(f64),
}

/// Row indices assigned to each side of a split, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows per class by a keyed hash of `seed|class|row`.
///
/// The same seed and labels always give the same split. Each class sends
/// `round(n * test_fraction)` rows to the test side, but a class with a single
/// row stays entirely in training.
pub fn train_test_split(
    labels: &[usize],
    seed: &str,
    test_fraction: f64,
) -> Result<SplitIndices, SplitError> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    let mut by_class: BTreeMap<usize, Vec<(u128, usize)>> = BTreeMap::new();
    for (row, &class) in labels.iter().enumerate() {
        let hash = blake3::hash(format!("{seed}|{class}|{row}").as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash.as_bytes()[0..16]);
        by_class
            .entry(class)
            .or_default()
            .push((u128::from_le_bytes(key), row));
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_class, mut entries) in by_class {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let n = entries.len();
        let test_n = if n == 1 {
            0
        } else {
            (((n as f64) * test_fraction).round() as usize).min(n - 1)
        };
        for (idx, (_, row)) in entries.into_iter().enumerate() {
            if idx < test_n {
                test.push(row);
            } else {
                train.push(row);
            }
        }
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_and_stratified() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let a = train_test_split(&labels, "fog-v1", 0.2).unwrap();
        let b = train_test_split(&labels, "fog-v1", 0.2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 20);
        assert_eq!(a.train.len() + a.test.len(), 100);
        assert_eq!(a.test.iter().filter(|&&row| labels[row] == 1).count(), 4);

        let c = train_test_split(&labels, "other-seed", 0.2).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn singleton_classes_stay_in_training() {
        let split = train_test_split(&[0, 0, 0, 0, 1], "s", 0.5).unwrap();
        assert!(split.train.contains(&4));
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        assert!(train_test_split(&[0, 1], "s", 1.0).is_err());
        assert!(train_test_split(&[0, 1], "s", -0.1).is_err());
    }
}
