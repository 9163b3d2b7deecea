use serde::Serialize;

use super::{column, mean, quantile, sorted};
use crate::error::Result;
use crate::record::Dataset;

/// Dataset-wide descriptive statistics of one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl Summary {
    /// `(label, value)` rows in the conventional describe order.
    pub fn rows(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("count", Some(self.count as f64)),
            ("mean", Some(self.mean)),
            ("std", self.std),
            ("min", Some(self.min)),
            ("25%", Some(self.q25)),
            ("50%", Some(self.q50)),
            ("75%", Some(self.q75)),
            ("max", Some(self.max)),
        ]
    }
}

/// Unfiltered summary of `field` over every record. `None` for an empty dataset.
pub fn describe(dataset: &Dataset, field: &str) -> Result<Option<Summary>> {
    let values = sorted(column(dataset, field)?);
    let n = values.len();
    if n == 0 {
        return Ok(None);
    }

    let avg = mean(&values);
    let std = (n > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Ok(Some(Summary {
        count: n,
        mean: avg,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        q50: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[n - 1],
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of `field`. Bins are half-open except the last,
/// which also takes the maximum. A constant column spans value ± 0.5.
pub fn histogram(dataset: &Dataset, field: &str, bins: usize) -> Result<Vec<Bin>> {
    let values = column(dataset, field)?;
    if values.is_empty() || bins == 0 {
        return Ok(Vec::new());
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    Ok(out)
}
