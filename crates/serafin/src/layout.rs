//! Byte layout of the header and time step records
//!
//! The header is a fixed sequence of framed blocks whose sizes depend only on
//! the counts it declares, and every time step record is identical in size.
//! Any time step (or any single value) therefore sits at a computable offset:
//!
//! ```text
//! offset(t) = header + t * record
//! ```

// crate modules
use crate::block::{framed, MARKER};
use crate::date::{DATE_COUNT, FLAG_COUNT};
use crate::encoding::Encoding;
use crate::header::{Header, TITLE_LENGTH};
use crate::variables::VARIABLE_RECORD;

// external crates
use log::warn;
use serde::Serialize;

/// A named block of the file and the byte length of its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDescriptor {
    /// What the block holds
    pub name: &'static str,
    /// Content length, excluding the two markers
    pub length: usize,
}

impl BlockDescriptor {
    fn new(name: &'static str, length: usize) -> Self {
        Self { name, length }
    }

    /// Size on disk including both length markers
    pub fn framed_length(&self) -> usize {
        framed(self.length)
    }
}

/// Every block of the header in file order
pub fn header_blocks(header: &Header, encoding: &Encoding) -> Vec<BlockDescriptor> {
    let real = encoding.float_width.bytes();
    let mut blocks = vec![
        BlockDescriptor::new("title", TITLE_LENGTH),
        BlockDescriptor::new("variable counts", 2 * 4),
    ];

    blocks.extend(
        header
            .variables
            .iter()
            .map(|_| BlockDescriptor::new("variable name", VARIABLE_RECORD)),
    );

    blocks.push(BlockDescriptor::new("parameters", FLAG_COUNT * 4));
    if header.date.has_date() {
        blocks.push(BlockDescriptor::new("reference date", DATE_COUNT * 4));
    }

    blocks.extend([
        BlockDescriptor::new("mesh dimensions", 4 * 4),
        BlockDescriptor::new("connectivity", header.nelem * header.ndp * 4),
        BlockDescriptor::new("boundary table", header.npoin * 4),
        BlockDescriptor::new("x coordinates", header.npoin * real),
        BlockDescriptor::new("y coordinates", header.npoin * real),
    ]);

    blocks
}

/// Every block of a single time step record in file order
pub fn record_blocks(nvar: usize, npoin: usize, encoding: &Encoding) -> Vec<BlockDescriptor> {
    let real = encoding.float_width.bytes();
    std::iter::once(BlockDescriptor::new("time", real))
        .chain((0..nvar).map(|_| BlockDescriptor::new("variable values", npoin * real)))
        .collect()
}

/// Offsets for random access into the time step records
///
/// Constant for the lifetime of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    /// Byte order and float width
    pub encoding: Encoding,
    /// Number of variable blocks per record
    pub nvar: usize,
    /// Number of values per variable block
    pub npoin: usize,
    /// Total size of the header on disk
    pub header_size: u64,
    /// Size of every time step record on disk
    record_size: u64,
}

impl Layout {
    /// Derive the layout from the parsed header
    pub fn new(header: &Header, encoding: Encoding) -> Self {
        let header_size = header_blocks(header, &encoding)
            .iter()
            .map(|b| b.framed_length() as u64)
            .sum();

        let nvar = header.variables.len();
        let record_size = record_blocks(nvar, header.npoin, &encoding)
            .iter()
            .map(|b| b.framed_length() as u64)
            .sum();

        Self {
            encoding,
            nvar,
            npoin: header.npoin,
            header_size,
            record_size,
        }
    }

    /// Bytes per real value
    pub fn real(&self) -> u64 {
        self.encoding.float_width.bytes() as u64
    }

    /// Size of the framed timestamp block
    pub fn time_block_size(&self) -> u64 {
        framed(self.encoding.float_width.bytes()) as u64
    }

    /// Content length of one variable block
    pub fn variable_content_size(&self) -> usize {
        self.npoin * self.encoding.float_width.bytes()
    }

    /// Size of one framed variable block
    pub fn variable_block_size(&self) -> u64 {
        framed(self.variable_content_size()) as u64
    }

    /// Size of one full time step record
    pub fn record_size(&self) -> u64 {
        self.record_size
    }

    /// Offset of the opening marker of record `t`
    pub fn record_offset(&self, t: usize) -> u64 {
        self.header_size + t as u64 * self.record_size()
    }

    /// Offset of the timestamp value of record `t`
    pub fn time_offset(&self, t: usize) -> u64 {
        self.record_offset(t) + MARKER as u64
    }

    /// Offset of the opening marker of variable `v` in record `t`
    pub fn variable_block_offset(&self, t: usize, v: usize) -> u64 {
        self.record_offset(t) + self.time_block_size() + v as u64 * self.variable_block_size()
    }

    /// Offset of the value for `node` of variable `v` in record `t`
    pub fn value_offset(&self, t: usize, v: usize, node: usize) -> u64 {
        self.variable_block_offset(t, v) + MARKER as u64 + node as u64 * self.real()
    }

    /// Offset of a value relative to the start of its record
    pub fn value_offset_in_record(&self, v: usize, node: usize) -> usize {
        (self.value_offset(0, v, node) - self.record_offset(0)) as usize
    }

    /// Number of complete records in a file of `file_size` bytes
    pub fn time_step_count(&self, file_size: u64) -> usize {
        let payload = file_size.saturating_sub(self.header_size);
        let record = self.record_size();
        if payload % record != 0 {
            warn!(
                "Trailing {} bytes after the last complete record are ignored",
                payload % record
            );
        }
        (payload / record) as usize
    }
}
