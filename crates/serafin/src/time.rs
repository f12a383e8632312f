//! Building the list of time stamps

// standard library
use std::io::{Read, Seek, SeekFrom};

// crate modules
use crate::block::read_block_exact;
use crate::error::{Error, Result};
use crate::layout::Layout;

// external crates
use kdam::{Bar, BarBuilder, BarExt};
use log::{debug, warn};

/// Either a time step index or a time value
///
/// Time values must match a time stamp exactly, there is no nearest
/// neighbour lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSelector {
    /// Position of the record in the file
    Index(usize),
    /// Time stamp of the record
    Value(f64),
}

impl From<usize> for TimeSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<f64> for TimeSelector {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

/// Read the timestamp of record `t` with a direct seek
pub(crate) fn read_time_at<R: Read + Seek>(reader: &mut R, layout: &Layout, t: usize) -> Result<f64> {
    reader.seek(SeekFrom::Start(layout.record_offset(t)))?;
    let bytes = read_block_exact(reader, &layout.encoding, layout.real() as usize)?;
    Ok(layout.encoding.float(&bytes))
}

/// Read every timestamp, one seek per record
pub(crate) fn scan_times<R: Read + Seek>(
    reader: &mut R,
    layout: &Layout,
    count: usize,
    progress: bool,
) -> Result<Vec<f64>> {
    debug!("Scanning {count} time stamps");
    let mut progress_bar = init_progress_bar(count, progress)?;

    let mut times = Vec::with_capacity(count);
    for t in 0..count {
        times.push(read_time_at(reader, layout, t)?);
        if progress {
            progress_bar.update(1)?;
        }
    }

    Ok(times)
}

/// Read the first three timestamps and assume a constant step after that
///
/// The remainder is `t1 + k * (t2 - t1)`. Nothing checks the assumption, files
/// with irregular steps get the wrong values here and need a full scan.
pub(crate) fn extrapolate_times<R: Read + Seek>(
    reader: &mut R,
    layout: &Layout,
    count: usize,
) -> Result<Vec<f64>> {
    if count < 3 {
        return (0..count).map(|t| read_time_at(reader, layout, t)).collect();
    }

    let t0 = read_time_at(reader, layout, 0)?;
    let t1 = read_time_at(reader, layout, 1)?;
    let t2 = read_time_at(reader, layout, 2)?;
    let step = t2 - t1;

    if count > 3 {
        debug!("Extrapolating {} time stamps with a step of {step}", count - 3);
    }
    if (t1 - t0 - step).abs() > f64::EPSILON * step.abs().max(1.0) * 16.0 {
        warn!("First time step ({}) differs from the second ({step})", t1 - t0);
    }

    Ok(std::iter::once(t0)
        .chain((1..count).map(|k| t1 + (k - 1) as f64 * step))
        .collect())
}

/// Exact match of a time value in the index
pub(crate) fn position_of(times: &[f64], value: f64) -> Result<usize> {
    times
        .iter()
        .position(|t| *t == value)
        .ok_or(Error::TimeValueNotFound(value))
}

/// Initialise the progress bar, if wanted
pub(crate) fn init_progress_bar(total: usize, enabled: bool) -> Result<Bar> {
    BarBuilder::default()
        .total(total)
        .unit(" steps")
        .disable(!enabled)
        .bar_format("{count}/{total} steps [{rate} steps/s]   ")
        .build()
        .map_err(Error::ProgressBar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_time_match() {
        let times = [0.0, 0.5, 1.0];
        assert_eq!(position_of(&times, 0.5).unwrap(), 1);
        assert!(matches!(
            position_of(&times, 0.75),
            Err(Error::TimeValueNotFound(v)) if v == 0.75
        ));
    }

    #[test]
    fn selector_conversions() {
        assert_eq!(TimeSelector::from(3usize), TimeSelector::Index(3));
        assert_eq!(TimeSelector::from(2.5), TimeSelector::Value(2.5));
    }
}
