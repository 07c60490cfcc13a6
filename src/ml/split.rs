//! Stratified train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices for each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so every class keeps its share in both partitions.
///
/// Each class holds out `round(n * test_fraction)` rows. Classes are visited
/// in index order and shuffled with a single seeded RNG, so the result is
/// reproducible. Fails when any class would end up absent from a side.
pub fn stratified_split(
    labels: &[usize],
    n_classes: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, String> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(format!("test fraction must be in (0, 1), got {test_fraction}"));
    }
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        let bucket = by_class
            .get_mut(label)
            .ok_or_else(|| format!("label {label} out of range for {n_classes} classes"))?;
        bucket.push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class_idx, mut rows) in by_class.into_iter().enumerate() {
        let n_test = (rows.len() as f64 * test_fraction).round() as usize;
        if n_test == 0 || n_test >= rows.len() {
            return Err(format!(
                "class {class_idx} has {} rows; too few to stratify",
                rows.len()
            ));
        }
        rows.shuffle(&mut rng);
        let held = rows.split_off(rows.len() - n_test);
        train.extend(rows);
        test.extend(held);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(per_class: &[usize]) -> Vec<usize> {
        per_class
            .iter()
            .enumerate()
            .flat_map(|(class, &n)| std::iter::repeat_n(class, n))
            .collect()
    }

    #[test]
    fn keeps_class_proportions() {
        let y = labels(&[10, 20, 5]);
        let split = stratified_split(&y, 3, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 2 + 4 + 1);
        assert_eq!(split.train.len() + split.test.len(), y.len());
        for class in 0..3 {
            assert!(split.test.iter().any(|&i| y[i] == class));
            assert!(split.train.iter().any(|&i| y[i] == class));
        }
    }

    #[test]
    fn same_seed_same_split() {
        let y = labels(&[12, 12]);
        let a = stratified_split(&y, 2, 0.25, 7).unwrap();
        let b = stratified_split(&y, 2, 0.25, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_class_cannot_be_stratified() {
        let y = labels(&[10, 1]);
        assert!(stratified_split(&y, 2, 0.2, 42).is_err());
    }

    #[test]
    fn rejects_bad_fraction_and_labels() {
        assert!(stratified_split(&[0, 1], 2, 0.0, 1).is_err());
        assert!(stratified_split(&[0, 3], 2, 0.5, 1).is_err());
    }
}
