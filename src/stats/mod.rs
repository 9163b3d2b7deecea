pub mod describe;
pub mod rank;

pub use describe::{describe, histogram, Bin, Summary};
pub use rank::{rank_groups, GroupStatistics, RankOutcome, RankQuery, Ranking, SortKey, SortOrder};

use crate::error::Result;
use crate::record::Dataset;

/// Every record's value of `field`, in dataset order.
pub fn column(dataset: &Dataset, field: &str) -> Result<Vec<f64>> {
    dataset
        .iter()
        .enumerate()
        .map(|(i, r)| r.require_f64(i, field))
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear interpolation between the closest ranks of an ascending slice.
/// `q = 0.5` gives the median: the middle value, or the mean of the two
/// middle values for even lengths.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn median(sorted: &[f64]) -> f64 {
    quantile(sorted, 0.5)
}

pub(crate) fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}
