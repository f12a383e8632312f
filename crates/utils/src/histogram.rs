// crate modules
use crate::error::{Error, Result};
use crate::slice_ext::SliceExt;

// external crates
use serde::Serialize;

/// Counts of values binned between fixed edges
///
/// Bins follow [find_bin_exclusive()](SliceExt::find_bin_exclusive), so each
/// bin is `low <= value < high` except the last, which also takes values on the
/// upper edge. Anything outside the edges lands in the explicit `underflow` or
/// `overflow` counts rather than being dropped.
///
/// ```rust
/// # use slftools_utils::Histogram;
/// let mut histogram = Histogram::uniform(0.0, 10.0, 10).unwrap();
/// histogram.extend([0.5, 9.9, 12.0, -1.0]);
///
/// assert_eq!(histogram.counts[0], 1);
/// assert_eq!(histogram.counts[9], 1);
/// assert_eq!(histogram.overflow, 1);
/// assert_eq!(histogram.underflow, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin edges, strictly increasing
    pub edges: Vec<f64>,
    /// Number of values in each bin
    pub counts: Vec<usize>,
    /// Values below the first edge
    pub underflow: usize,
    /// Values above the last edge
    pub overflow: usize,
}

impl Histogram {
    /// New empty histogram from explicit edges
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::BelowMinimumSliceLength {
                length: edges.len(),
                minimum_required: 2,
            });
        }

        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::UnorderedBinEdges);
        }

        Ok(Self {
            counts: vec![0; edges.len() - 1],
            edges,
            underflow: 0,
            overflow: 0,
        })
    }

    /// New empty histogram of `n_bins` equal bins between `lower` and `upper`
    pub fn uniform(lower: f64, upper: f64, n_bins: usize) -> Result<Self> {
        let width = (upper - lower) / n_bins as f64;
        let edges = (0..=n_bins).map(|i| lower + width * i as f64).collect();
        Self::new(edges)
    }

    /// Add a single value, non-finite values are ignored
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        match self.edges.find_bin_exclusive(value) {
            Ok(bin) => self.counts[bin] += 1,
            Err(_) if value < self.edges[0] => self.underflow += 1,
            Err(_) => self.overflow += 1,
        }
    }

    /// Total number of values recorded, including under/overflow
    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.underflow + self.overflow
    }
}

impl Extend<f64> for Histogram {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}
