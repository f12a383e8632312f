use crate::error::{Error, Result};

/// Extends functionality for slices of float arrays
pub trait SliceExt<T> {
    /// Find the minimum value in float arrays
    ///
    /// Only provides the minimum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use slftools_utils::SliceExt;
    /// # use slftools_utils::Error;
    /// assert_eq!([1.1, 0.5, 2.2].try_min(), Ok(0.5));
    /// assert_eq!([1.1, f64::NAN, 2.2].try_min(), Err(Error::SliceContainsUndefinedValues));
    /// assert_eq!(Vec::<f64>::new().try_min(), Err(Error::SliceContainsNoValues));
    /// ```
    ///
    /// The float primitives do not implement `Ord` due to `NaN` being
    /// incomparable, so this uses `total_cmp` once the values are known to be
    /// finite.
    fn try_min(&self) -> Result<T>;

    /// Find the maximum value in float arrays
    ///
    /// Same rules as [try_min()](SliceExt::try_min).
    ///
    /// ```rust
    /// # use slftools_utils::SliceExt;
    /// assert_eq!([1.1, 0.5, 2.2].try_max(), Ok(2.2));
    /// ```
    fn try_max(&self) -> Result<T>;

    /// Minimum and maximum of the finite values only
    ///
    /// Result fields routinely contain non-finite markers for dry or missing
    /// nodes, so unlike [try_min()](SliceExt::try_min) these are skipped
    /// rather than treated as an error.
    ///
    /// ```rust
    /// # use slftools_utils::SliceExt;
    /// assert_eq!([1.0, f64::NAN, -2.0].finite_range(), Ok((-2.0, 1.0)));
    /// assert!([f64::NAN].finite_range().is_err());
    /// ```
    fn finite_range(&self) -> Result<(T, T)>;

    /// Find index bin containing 'value', where bins are low <= value < high
    ///
    /// A value on a bin edge returns the bin above. Values equal to the highest
    /// bound are considered part of the last bin.
    ///
    /// ```rust
    /// # use slftools_utils::SliceExt;
    /// let bounds = vec![0.0, 0.1, 1.0, 20.0];
    ///
    /// assert_eq!(bounds.find_bin_exclusive(0.0 ), Ok(0));
    /// assert_eq!(bounds.find_bin_exclusive(0.5 ), Ok(1));
    /// assert_eq!(bounds.find_bin_exclusive(1.0 ), Ok(2));
    /// assert_eq!(bounds.find_bin_exclusive(20.0), Ok(2));
    ///
    /// // Values outside the bin bounds are an error case
    /// assert!(bounds.find_bin_exclusive(-1.0).is_err());
    /// assert!(bounds.find_bin_exclusive(21.0).is_err());
    /// ```
    fn find_bin_exclusive(&self, value: T) -> Result<usize>;
}

impl SliceExt<f64> for [f64] {
    fn try_min(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        self.iter()
            .min_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::SliceContainsNoValues)
    }

    fn try_max(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        self.iter()
            .max_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::SliceContainsNoValues)
    }

    fn finite_range(&self) -> Result<(f64, f64)> {
        self.iter()
            .filter(|v| v.is_finite())
            .fold(None, |range, &v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
            .ok_or(Error::SliceContainsNoValues)
    }

    fn find_bin_exclusive(&self, value: f64) -> Result<usize> {
        // make sure there are bin edges to check against
        let (lower_bound, upper_bound) = match (self.first(), self.last()) {
            (Some(lo), Some(hi)) if self.len() >= 2 => (*lo, *hi),
            _ => {
                return Err(Error::BelowMinimumSliceLength {
                    length: self.len(),
                    minimum_required: 2,
                })
            }
        };

        // is the value relevant?
        if value < lower_bound || value > upper_bound {
            return Err(Error::ValueOutsideOfBounds {
                value,
                lower_bound,
                upper_bound,
            });
        }

        // special case for being on the upper edge
        if value == upper_bound {
            return Ok(self.len() - 2);
        }

        // the first upper edge strictly above the value closes the bin
        Ok(self[1..].partition_point(|high| *high <= value))
    }
}
