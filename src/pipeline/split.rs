//! Seeded stratified train/test split

use crate::error::DataError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so each class keeps its share in both partitions.
///
/// Each class contributes `round(test_size * class_count)` rows to the test
/// partition (at least one, and never all of them). The same labels, ratio
/// and seed always give the same split.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<SplitIndices, DataError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DataError::Insufficient(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();

        if members.len() < 2 {
            return Err(DataError::Insufficient(format!(
                "class {} has {} row(s); stratified split needs at least 2",
                class,
                members.len()
            )));
        }

        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize).clamp(1, members.len() - 1);

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}
