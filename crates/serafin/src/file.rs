//! The open Serafin file and its read operations

// standard library
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

// crate modules
use crate::block::read_block_exact;
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::layout::Layout;
use crate::mapped::{read_record_nodes, NodeSeries};
use crate::partition::{discover_partitions, Partition};
use crate::time::{self, TimeSelector};
use crate::variables::VariableSelector;
use crate::writer::write_record;

// slftools modules
use slftools_format::f;
use slftools_utils::SliceExt;

// external crates
use kdam::BarExt;
use log::{debug, info, warn};

/// Access mode of an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Reading only
    #[default]
    Read,
    /// Reading, plus appending new time steps
    ReadWrite,
}

/// Lifecycle of a [SerafinFile]
///
/// Transitions only move forward until [close()](SerafinFile::close), after
/// which every I/O operation fails with [Error::FileClosed].
///
/// Mesh topology (adjacency, boundaries, spatial index) is not tracked here.
/// It belongs to the 2D mesh built from the header in `slftools-mesh`, which
/// computes each table on first use and keeps it for its own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Handles released
    Closed,
    /// Header parsed, time stamps not read yet
    Header,
    /// Header parsed and time stamps known
    TimeIndexed,
}

/// Options for opening Serafin files
///
/// Chained setters, finished with [open()](SerafinOptions::open).
///
/// ```rust, no_run
/// # use slftools_serafin::{Mode, SerafinOptions};
/// let slf = SerafinOptions::new()
///     .mode(Mode::ReadWrite)      // allow appending time steps
///     .variable_time_steps(true)  // read every time stamp
///     .progress(true)             // show progress of long scans
///     .open("results.slf")
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SerafinOptions {
    mode: Mode,
    read_time: bool,
    variable_time_steps: bool,
    parallel: bool,
    progress: bool,
}

impl Default for SerafinOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Read,
            read_time: true,
            variable_time_steps: false,
            parallel: false,
            progress: false,
        }
    }
}

impl SerafinOptions {
    /// Just calls Default::default()
    pub fn new() -> Self {
        Default::default()
    }

    /// Read-only (default) or read-write access
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the time index when opening (default `true`)
    ///
    /// Otherwise it is built on the first call that needs it.
    pub fn read_time(mut self, read_time: bool) -> Self {
        self.read_time = read_time;
        self
    }

    /// Read every time stamp instead of extrapolating (default `false`)
    ///
    /// Extrapolation reads three time stamps and assumes a constant step.
    /// Files with a variable time step need the full scan.
    pub fn variable_time_steps(mut self, variable: bool) -> Self {
        self.variable_time_steps = variable;
        self
    }

    /// Treat the path as the base name of a decomposed result (default `false`)
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Show progress bars for full-file scans (default `false`)
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Open the file(s) with these options
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<SerafinFile> {
        SerafinFile::open_with(path.as_ref(), self)
    }
}

/// Values of every variable at one time step
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Time step index
    pub index: usize,
    /// Time stamp
    pub time: f64,
    /// Header positions of the variables in `values`
    pub variables: Vec<usize>,
    /// Values as `[variable][node]`
    pub values: Vec<Vec<f64>>,
}

impl Frame {
    /// Values of a variable by its header position, if it was read
    pub fn get(&self, variable: usize) -> Option<&[f64]> {
        self.variables
            .iter()
            .position(|v| *v == variable)
            .map(|i| self.values[i].as_slice())
    }
}

/// An open Serafin result, possibly split into partitions
///
/// ```rust, no_run
/// # use slftools_serafin::{SerafinFile, VariableSelector};
/// let mut slf = SerafinFile::open("results.slf").unwrap();
///
/// // everything but the velocities at t = 3600 s
/// let exclude: Vec<VariableSelector> = vec!["VELOCITY U".into(), "VELOCITY V".into()];
/// let frame = slf.read(3600.0, &exclude).unwrap();
///
/// // one node through every time step
/// let history = slf.all_time_points_for_node(42).unwrap();
///
/// slf.close();
/// ```
///
/// Internal positions are shared between calls, so one instance must only be
/// used from one thread at a time.
#[derive(Debug)]
pub struct SerafinFile {
    partitions: Vec<Partition>,
    times: Option<Vec<f64>>,
    options: SerafinOptions,
    state: State,
}

// ! ------------------------------------------------------------------------
// !                          Opening and lifecycle
// ! ------------------------------------------------------------------------

impl SerafinFile {
    /// Open a single file for reading with the default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        SerafinOptions::default().open(path)
    }

    fn open_with(path: &Path, options: SerafinOptions) -> Result<Self> {
        info!("Reading {}", path.display());

        let paths = if options.parallel {
            discover_partitions(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let partitions = paths
            .iter()
            .map(|p| Partition::open(p, options.mode))
            .collect::<Result<Vec<Partition>>>()?;

        Self::check_partitions(&partitions)?;
        if partitions.len() > 1 {
            info!("Opened {} partitions", partitions.len());
        }

        let mut file = Self {
            partitions,
            times: None,
            options,
            state: State::Header,
        };

        if file.options.read_time {
            file.build_time_index()?;
        }

        Ok(file)
    }

    /// Partitions must agree on variables, time steps may be short on some
    fn check_partitions(partitions: &[Partition]) -> Result<()> {
        let Some((primary, others)) = partitions.split_first() else {
            return Ok(());
        };

        for other in others {
            if other.header.variables != primary.header.variables {
                return Err(Error::InconsistentHeader(f!(
                    "variables of {} differ from {}",
                    other.path.display(),
                    primary.path.display()
                )));
            }
            if other.time_step_count() != primary.time_step_count() {
                warn!(
                    "{} has {} time steps, {} has {}",
                    other.path.display(),
                    other.time_step_count(),
                    primary.path.display(),
                    primary.time_step_count()
                );
            }
        }
        Ok(())
    }

    /// Release every file handle
    ///
    /// Header data stays available, any further I/O fails with
    /// [Error::FileClosed].
    pub fn close(&mut self) {
        for partition in &mut self.partitions {
            partition.handle = None;
        }
        self.state = State::Closed;
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Closed => Err(Error::FileClosed),
            _ => Ok(()),
        }
    }
}

// ! ------------------------------------------------------------------------
// !                               Accessors
// ! ------------------------------------------------------------------------

impl SerafinFile {
    /// The primary (first) partition
    pub fn primary(&self) -> &Partition {
        &self.partitions[0]
    }

    /// Header of the primary partition
    pub fn header(&self) -> &Header {
        &self.primary().header
    }

    /// Record layout of the primary partition
    pub fn layout(&self) -> &Layout {
        &self.primary().layout
    }

    /// Byte order and float width
    pub fn encoding(&self) -> Encoding {
        self.layout().encoding
    }

    /// All partitions in index order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Partition by index
    pub fn partition(&self, index: usize) -> Result<&Partition> {
        self.partitions
            .get(index)
            .ok_or(Error::PartitionOutOfRange {
                index,
                count: self.partitions.len(),
            })
    }

    /// True when the result is split over several files
    pub fn is_parallel(&self) -> bool {
        self.partitions.len() > 1
    }

    /// Number of time steps in the primary partition
    pub fn time_step_count(&self) -> usize {
        self.primary().time_step_count()
    }
}

// ! ------------------------------------------------------------------------
// !                               Time index
// ! ------------------------------------------------------------------------

impl SerafinFile {
    /// Build the list of time stamps if not done already
    ///
    /// Uses a full scan or extrapolation from the first three time stamps
    /// depending on [SerafinOptions::variable_time_steps].
    pub fn build_time_index(&mut self) -> Result<&[f64]> {
        self.ensure_open()?;

        if self.times.is_none() {
            let times = {
                let partition = self.primary();
                let mut reader = BufReader::new(partition.handle()?);
                let count = partition.time_step_count();

                if self.options.variable_time_steps {
                    time::scan_times(&mut reader, &partition.layout, count, self.options.progress)?
                } else {
                    time::extrapolate_times(&mut reader, &partition.layout, count)?
                }
            };

            debug!("Time index built for {} steps", times.len());
            self.times = Some(times);
            self.state = State::TimeIndexed;
        }

        Ok(self.times.as_deref().unwrap_or_default())
    }

    /// Time stamps of every time step
    pub fn time_values(&mut self) -> Result<&[f64]> {
        self.build_time_index()
    }

    /// Index of the time step with exactly this time stamp
    pub fn find_time(&mut self, value: f64) -> Result<usize> {
        time::position_of(self.build_time_index()?, value)
    }

    /// Index of a time step from either an index or a time value
    fn resolve_time(&mut self, selector: TimeSelector) -> Result<usize> {
        let index = match selector {
            TimeSelector::Index(index) => index,
            TimeSelector::Value(value) => self.find_time(value)?,
        };
        self.primary().check_time_index(index)?;
        Ok(index)
    }
}

// ! ------------------------------------------------------------------------
// !                                Reading
// ! ------------------------------------------------------------------------

impl SerafinFile {
    /// Read all variables at one time step, minus any excluded
    ///
    /// Values come back as `[variable][node]` in header order, without any
    /// conversion.
    pub fn read<T: Into<TimeSelector>>(
        &mut self,
        time: T,
        exclude: &[VariableSelector],
    ) -> Result<Frame> {
        self.read_partition(0, time, exclude)
    }

    /// Same as [read()](SerafinFile::read) on a specific partition
    pub fn read_partition<T: Into<TimeSelector>>(
        &mut self,
        partition: usize,
        time: T,
        exclude: &[VariableSelector],
    ) -> Result<Frame> {
        self.ensure_open()?;
        let index = self.resolve_time(time.into())?;
        let partition = self.partition(partition)?;
        partition.check_time_index(index)?;

        let excluded = exclude
            .iter()
            .map(|selector| partition.header.position(selector))
            .collect::<Result<Vec<usize>>>()?;

        let layout = &partition.layout;
        let mut reader = BufReader::new(partition.handle()?);
        let time = time::read_time_at(&mut reader, layout, index)?;

        // positioned on the first variable block after the timestamp
        let mut frame = Frame {
            index,
            time,
            variables: Vec::with_capacity(layout.nvar),
            values: Vec::with_capacity(layout.nvar),
        };
        for v in 0..layout.nvar {
            if excluded.contains(&v) {
                reader.seek_relative(layout.variable_block_size() as i64)?;
                continue;
            }
            let bytes = read_block_exact(&mut reader, &layout.encoding, layout.variable_content_size())?;
            frame.variables.push(v);
            frame.values.push(layout.encoding.floats(&bytes));
        }

        Ok(frame)
    }

    /// Read a time step by walking every record from the end of the header
    ///
    /// Much slower than [read()](SerafinFile::read), which jumps straight to
    /// the record. Useful to check a file that may have a damaged layout.
    pub fn read_sequential(&mut self, index: usize) -> Result<Frame> {
        self.ensure_open()?;
        let partition = self.primary();
        partition.check_time_index(index)?;

        let layout = &partition.layout;
        let mut reader = BufReader::new(partition.handle()?);
        reader.seek(SeekFrom::Start(layout.header_size))?;

        let real = layout.real() as usize;
        for t in 0..=index {
            let time = layout.encoding.float(&read_block_exact(&mut reader, &layout.encoding, real)?);
            let mut values = Vec::with_capacity(layout.nvar);
            for _ in 0..layout.nvar {
                let bytes =
                    read_block_exact(&mut reader, &layout.encoding, layout.variable_content_size())?;
                if t == index {
                    values.push(layout.encoding.floats(&bytes));
                }
            }

            if t == index {
                return Ok(Frame {
                    index,
                    time,
                    variables: (0..layout.nvar).collect(),
                    values,
                });
            }
        }

        Err(Error::TimeIndexOutOfRange {
            index,
            count: partition.time_step_count(),
        })
    }

    /// Read a single variable at one time step
    pub fn read_variable<T: Into<TimeSelector>>(
        &mut self,
        time: T,
        variable: &VariableSelector,
    ) -> Result<Vec<f64>> {
        self.ensure_open()?;
        let index = self.resolve_time(time.into())?;
        let partition = self.primary();
        let v = partition.header.position(variable)?;

        let layout = &partition.layout;
        let mut file = partition.handle()?;
        file.seek(SeekFrom::Start(layout.variable_block_offset(index, v)))?;
        let bytes = read_block_exact(&mut file, &layout.encoding, layout.variable_content_size())?;
        Ok(layout.encoding.floats(&bytes))
    }

    /// Every variable at one node for every time step
    ///
    /// Each value is read with a direct seek to its computed offset, so the
    /// cost depends on the number of time steps and not on the mesh size.
    ///
    /// Values come back as `[variable][time step]`.
    pub fn all_time_points_for_node(&mut self, node: usize) -> Result<Vec<Vec<f64>>> {
        self.ensure_open()?;
        let partition = self.primary();
        partition.check_node(node)?;

        let layout = &partition.layout;
        let mut file = partition.handle()?;
        let count = partition.time_step_count();
        let mut buffer = vec![0u8; layout.real() as usize];

        let mut values = vec![Vec::with_capacity(count); layout.nvar];
        for t in 0..count {
            for (v, series) in values.iter_mut().enumerate() {
                file.seek(SeekFrom::Start(layout.value_offset(t, v, node)))?;
                file.read_exact(&mut buffer)?;
                series.push(layout.encoding.float(&buffer));
            }
        }

        Ok(values)
    }

    /// Every variable at a subset of nodes for one time step
    ///
    /// The record is memory-mapped and only the requested values decoded.
    /// Values come back as `[variable][node]` in request order.
    pub fn read_nodes<T: Into<TimeSelector>>(
        &mut self,
        time: T,
        nodes: &[usize],
    ) -> Result<Vec<Vec<f64>>> {
        self.ensure_open()?;
        let index = self.resolve_time(time.into())?;
        let partition = self.primary();
        for node in nodes {
            partition.check_node(*node)?;
        }

        let layout = &partition.layout;
        let (_, values) =
            read_record_nodes(partition.handle()?, layout, layout.record_offset(index), nodes)?;
        Ok(values)
    }

    /// Iterate every time step for a subset of nodes
    ///
    /// See [NodeSeries] for the item layout.
    pub fn node_series(&self, nodes: &[usize]) -> Result<NodeSeries<'_>> {
        self.ensure_open()?;
        let partition = self.primary();
        for node in nodes {
            partition.check_node(*node)?;
        }
        Ok(NodeSeries::new(partition, nodes.to_vec()))
    }

    /// Minimum and maximum of a variable over every time step
    ///
    /// Non-finite values are ignored.
    pub fn value_range(&mut self, variable: &VariableSelector) -> Result<(f64, f64)> {
        self.ensure_open()?;
        let count = self.time_step_count();
        let mut progress_bar = time::init_progress_bar(count, self.options.progress)?;

        let mut range: Option<(f64, f64)> = None;
        for t in 0..count {
            let values = self.read_variable(t, variable)?;
            if let Ok((lo, hi)) = values.finite_range() {
                range = Some(match range {
                    Some((min, max)) => (min.min(lo), max.max(hi)),
                    None => (lo, hi),
                });
            }
            if self.options.progress {
                progress_bar.update(1)?;
            }
        }

        range.ok_or_else(|| Error::NoFiniteValues(f!("{variable:?}")))
    }
}

// ! ------------------------------------------------------------------------
// !                                Writing
// ! ------------------------------------------------------------------------

impl SerafinFile {
    /// Append a time step to a single file opened with [Mode::ReadWrite]
    ///
    /// `values` must hold every variable, as `[variable][node]`. Anything after
    /// the last complete record is overwritten.
    pub fn append_frame(&mut self, time: f64, values: &[Vec<f64>]) -> Result<()> {
        self.ensure_open()?;
        if self.options.mode != Mode::ReadWrite || self.is_parallel() {
            return Err(Error::ReadOnly);
        }

        let partition = &mut self.partitions[0];
        let layout = partition.layout;
        let offset = layout.record_offset(partition.time_step_count());

        let mut writer = BufWriter::new(partition.handle()?);
        writer.seek(SeekFrom::Start(offset))?;
        write_record(&mut writer, &layout, time, values)?;
        writer.flush()?;
        drop(writer);

        partition.time_step_count += 1;
        if let Some(times) = self.times.as_mut() {
            times.push(time);
        }

        debug!("Appended time step {time} at byte {offset}");
        Ok(())
    }
}

impl std::fmt::Display for SerafinFile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "SerafinFile {{")?;
        writeln!(f, "    path: {}", self.primary().path.display())?;
        writeln!(f, "    state: {:?}", self.state)?;
        writeln!(f, "    encoding: {}", self.encoding())?;
        writeln!(f, "    partitions: {}", self.partitions.len())?;
        writeln!(f, "    time steps: {}", self.time_step_count())?;
        writeln!(f, "    record size: {} bytes", self.layout().record_size())?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lookup_by_variable() {
        let frame = Frame {
            index: 0,
            time: 0.0,
            variables: vec![0, 2],
            values: vec![vec![1.0], vec![3.0]],
        };
        assert_eq!(frame.get(2), Some([3.0].as_slice()));
        assert_eq!(frame.get(1), None);
    }

    #[test]
    fn default_options() {
        let options = SerafinOptions::new();
        assert_eq!(options.mode, Mode::Read);
        assert!(options.read_time);
        assert!(!options.variable_time_steps);
        assert!(!options.parallel);
    }
}
