//! Random access to node subsets through memory-mapped records
//!
//! Each call maps exactly one time step record, slices the requested values
//! out of it, and drops the map before returning. Nothing stays mapped between
//! calls.
//!
//! If the platform refuses the map, the same values are read with one seek per
//! value instead and a warning is logged. There is no retry of the map itself.

// standard library
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

// crate modules
use crate::error::Result;
use crate::layout::Layout;
use crate::partition::Partition;

// external crates
use log::{trace, warn};
use memmap2::{Mmap, MmapOptions};

/// Map the bytes of one record starting at `offset`
#[allow(unsafe_code)]
fn map_window(file: &File, offset: u64, length: usize) -> std::io::Result<Mmap> {
    // Read-only map dropped before the calling function returns. Truncation of
    // the file by another process while mapped is undefined behaviour, as it
    // is for any memory-mapped reader.
    unsafe { MmapOptions::new().offset(offset).len(length).map(file) }
}

/// Values of `nodes` for every variable of the record at `offset`
///
/// Returns `[variable][node]` in file and request order.
pub(crate) fn read_record_nodes(
    file: &File,
    layout: &Layout,
    offset: u64,
    nodes: &[usize],
) -> Result<(f64, Vec<Vec<f64>>)> {
    trace!("Reading {} nodes from record at byte {offset}", nodes.len());
    match map_window(file, offset, layout.record_size() as usize) {
        Ok(map) => Ok(slice_record(&map, layout, nodes)),
        Err(e) => {
            warn!("Memory map unavailable ({e}), falling back to direct reads");
            seek_record(file, layout, offset, nodes)
        }
    }
}

/// Pull the timestamp and requested values out of a mapped record
fn slice_record(record: &[u8], layout: &Layout, nodes: &[usize]) -> (f64, Vec<Vec<f64>>) {
    let real = layout.real() as usize;
    let decode = |position: usize| layout.encoding.float(&record[position..position + real]);

    let time = decode(layout.time_offset(0) as usize - layout.record_offset(0) as usize);
    let values = (0..layout.nvar)
        .map(|v| {
            nodes
                .iter()
                .map(|node| decode(layout.value_offset_in_record(v, *node)))
                .collect()
        })
        .collect();

    (time, values)
}

/// Same as [slice_record] using one seek per value
fn seek_record(
    mut file: &File,
    layout: &Layout,
    offset: u64,
    nodes: &[usize],
) -> Result<(f64, Vec<Vec<f64>>)> {
    let real = layout.real() as usize;
    let mut buffer = vec![0u8; real];
    let mut read_at = |position: usize| -> Result<f64> {
        file.seek(SeekFrom::Start(offset + position as u64))?;
        file.read_exact(&mut buffer)?;
        Ok(layout.encoding.float(&buffer))
    };

    let time = read_at(layout.time_offset(0) as usize - layout.record_offset(0) as usize)?;
    let mut values = Vec::with_capacity(layout.nvar);
    for v in 0..layout.nvar {
        let row = nodes
            .iter()
            .map(|node| read_at(layout.value_offset_in_record(v, *node)))
            .collect::<Result<Vec<f64>>>()?;
        values.push(row);
    }

    Ok((time, values))
}

/// Iterator over every time step for a fixed subset of nodes
///
/// The read position advances by exactly one record per step rather than
/// being recomputed from the time index, which keeps long probe extractions
/// cheap. Created by [SerafinFile::node_series()](crate::SerafinFile::node_series).
///
/// Each item is the time stamp and the values as `[variable][node]`.
#[derive(Debug)]
pub struct NodeSeries<'a> {
    partition: &'a Partition,
    nodes: Vec<usize>,
    offset: u64,
    remaining: usize,
}

impl<'a> NodeSeries<'a> {
    pub(crate) fn new(partition: &'a Partition, nodes: Vec<usize>) -> Self {
        Self {
            offset: partition.layout.record_offset(0),
            remaining: partition.time_step_count(),
            partition,
            nodes,
        }
    }
}

impl Iterator for NodeSeries<'_> {
    type Item = Result<(f64, Vec<Vec<f64>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let layout = &self.partition.layout;
        let result = self
            .partition
            .handle()
            .and_then(|file| read_record_nodes(file, layout, self.offset, &self.nodes));

        self.offset += layout.record_size();
        self.remaining -= 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for NodeSeries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{ByteOrder, Encoding, FloatWidth};
    use crate::header::Header;
    use crate::variables::Variable;
    use crate::writer::SerafinWriter;

    const STEPS: usize = 4;

    fn value(t: usize, v: usize, node: usize) -> f64 {
        (t * 100 + v * 10 + node) as f64
    }

    /// Two triangles, two variables, and [STEPS] records written to `path`
    fn write_square(path: &std::path::Path, encoding: Encoding) -> Layout {
        let header = Header::new("SQUARE", vec![Variable::new("A", ""), Variable::new("B", "")])
            .with_mesh(
                vec![0.0, 1.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0, 1.0],
                vec![1, 2, 3, 1, 3, 4],
                3,
                vec![1, 2, 3, 4],
            );

        let mut writer = SerafinWriter::create(path, &header, encoding).unwrap();
        for t in 0..STEPS {
            let values = (0..2)
                .map(|v| (0..4).map(|n| value(t, v, n)).collect())
                .collect::<Vec<Vec<f64>>>();
            writer.write_frame(t as f64 * 0.5, &values).unwrap();
        }
        let layout = *writer.layout();
        writer.finish().unwrap();
        layout
    }

    #[test]
    fn seek_fallback_matches_mapped_record() {
        let dir = tempfile::tempdir().unwrap();

        for (i, width) in [FloatWidth::Single, FloatWidth::Double].into_iter().enumerate() {
            let path = dir.path().join(format!("square_{i}.slf"));
            let layout = write_square(&path, Encoding::new(ByteOrder::Little, width));
            let file = File::open(&path).unwrap();

            for t in [0, 2, STEPS - 1] {
                let offset = layout.record_offset(t);
                let map = map_window(&file, offset, layout.record_size() as usize).unwrap();

                for nodes in [vec![0], vec![3], vec![3, 1, 0], vec![2, 2]] {
                    let mapped = slice_record(&map, &layout, &nodes);
                    let seeked = seek_record(&file, &layout, offset, &nodes).unwrap();
                    assert_eq!(mapped, seeked);

                    assert_eq!(seeked.0, t as f64 * 0.5);
                    for (v, row) in seeked.1.iter().enumerate() {
                        let expected: Vec<f64> = nodes.iter().map(|n| value(t, v, *n)).collect();
                        assert_eq!(row, &expected);
                    }
                }
            }
        }
    }

    #[test]
    fn read_past_the_last_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.slf");
        let layout = write_square(&path, Encoding::default());
        let file = File::open(&path).unwrap();

        let offset = layout.record_offset(STEPS);
        assert!(seek_record(&file, &layout, offset, &[0]).is_err());
    }
}
