//! Single result files and the partitions of a decomposed result set

// standard library
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

// crate modules
use crate::error::{Error, Result};
use crate::file::Mode;
use crate::header::{parse_header, Header};
use crate::layout::Layout;

// slftools modules
use slftools_format::f;

// external crates
use log::{debug, warn};

/// One open Serafin file
///
/// A plain result file is a single partition. Domain-decomposed results have
/// one partition per sub-domain, each with its own local mesh but the same
/// variables and time steps.
#[derive(Debug)]
pub struct Partition {
    /// Location of the file
    pub path: PathBuf,
    /// Parsed header
    pub header: Header,
    /// Record offsets derived from the header
    pub layout: Layout,
    /// Number of complete time step records
    pub(crate) time_step_count: usize,
    /// Open handle, `None` once closed
    pub(crate) handle: Option<File>,
}

impl Partition {
    /// Open the file and parse its header
    pub(crate) fn open(path: &Path, mode: Mode) -> Result<Self> {
        let file = match mode {
            Mode::Read => File::open(path)?,
            Mode::ReadWrite => OpenOptions::new().read(true).write(true).open(path)?,
        };

        let (header, encoding) = parse_header(&mut BufReader::new(&file))?;
        let layout = Layout::new(&header, encoding);
        let time_step_count = layout.time_step_count(file.metadata()?.len());

        debug!(
            "Opened {} ({encoding}, {} time steps)",
            path.display(),
            time_step_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            header,
            layout,
            time_step_count,
            handle: Some(file),
        })
    }

    /// Number of complete time step records
    pub fn time_step_count(&self) -> usize {
        self.time_step_count
    }

    /// The open handle, or an error once closed
    pub(crate) fn handle(&self) -> Result<&File> {
        self.handle.as_ref().ok_or(Error::FileClosed)
    }

    /// Make sure a node index exists in this partition
    pub(crate) fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.header.npoin {
            return Err(Error::NodeOutOfRange {
                node,
                count: self.header.npoin,
            });
        }
        Ok(())
    }

    /// Make sure a time step index exists in this partition
    pub(crate) fn check_time_index(&self, index: usize) -> Result<()> {
        if index >= self.time_step_count {
            return Err(Error::TimeIndexOutOfRange {
                index,
                count: self.time_step_count,
            });
        }
        Ok(())
    }
}

/// Name of a partition file in a decomposed result set
///
/// ```rust
/// # use slftools_serafin::partition_file_name;
/// # use std::path::Path;
/// let path = partition_file_name(Path::new("run/T2DRES"), 4, 2);
/// assert_eq!(path, Path::new("run/T2DRES-00004-00002"));
/// ```
pub fn partition_file_name(base: &Path, ncsize: usize, index: usize) -> PathBuf {
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    base.with_file_name(f!("{name}-{ncsize:05}-{index:05}"))
}

/// Find every partition file sharing the base name, ordered by index
pub(crate) fn discover_partitions(base: &Path) -> Result<Vec<PathBuf>> {
    let not_found = || Error::PartitionsNotFound(base.display().to_string());

    let stem = base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(not_found)?;
    let directory = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut found: Vec<(usize, usize, PathBuf)> = std::fs::read_dir(&directory)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let (ncsize, index) = partition_suffix(name.strip_prefix(&stem)?)?;
            Some((ncsize, index, entry.path()))
        })
        .collect();

    if found.is_empty() {
        return Err(not_found());
    }

    found.sort_by_key(|(_, index, _)| *index);

    let ncsize = found[0].0;
    if found.iter().any(|(n, _, _)| *n != ncsize) || found.len() != ncsize {
        warn!(
            "Found {} partition files for \"{}\" but names declare {ncsize}",
            found.len(),
            base.display()
        );
    }

    Ok(found.into_iter().map(|(_, _, path)| path).collect())
}

/// Parse `-NNNNN-NNNNN` into partition count and index
fn partition_suffix(suffix: &str) -> Option<(usize, usize)> {
    let rest = suffix.strip_prefix('-')?;
    let (ncsize, index) = rest.split_once('-')?;
    let is_field = |s: &str| s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit());
    if !is_field(ncsize) || !is_field(index) {
        return None;
    }
    Some((ncsize.parse().ok()?, index.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_pattern() {
        assert_eq!(partition_suffix("-00004-00003"), Some((4, 3)));
        assert_eq!(partition_suffix("-0004-00003"), None);
        assert_eq!(partition_suffix("-00004-00003.bak"), None);
        assert_eq!(partition_suffix(".slf"), None);
    }

    #[test]
    fn discovery_orders_by_index() {
        let dir = tempfile::tempdir().unwrap();
        for index in [2, 0, 1] {
            File::create(partition_file_name(&dir.path().join("RES"), 3, index)).unwrap();
        }
        File::create(dir.path().join("RES-00003-00000.txt")).unwrap();
        File::create(dir.path().join("OTHER-00003-00000")).unwrap();

        let found = discover_partitions(&dir.path().join("RES")).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["RES-00003-00000", "RES-00003-00001", "RES-00003-00002"]);
    }

    #[test]
    fn discovery_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_partitions(&dir.path().join("RES")),
            Err(Error::PartitionsNotFound(_))
        ));
    }
}
