//! Write operations for Serafin files

// standard library
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// crate modules
use crate::block::{write_block, write_marker};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::header::{Header, MeshDimensions, TITLE_LENGTH};
use crate::layout::{header_blocks, Layout};

// slftools modules
use slftools_format::{f, fixed_width, OptionFormat};

// external crates
use log::{debug, warn};

/// Largest number of pieces a block is split into before giving up
const MAX_CHUNKS: usize = 1024;

/// Write the complete header in file order
///
/// The header is validated first, so nothing is written for inconsistent
/// tables.
pub fn write_header<W: Write>(writer: &mut W, header: &Header, encoding: &Encoding) -> Result<()> {
    header.validate()?;

    write_block(writer, encoding, &fixed_width(&header.title, TITLE_LENGTH))?;

    let counts = [to_i32(header.nbvar, "nbvar")?, to_i32(header.nbvar2, "nbvar2")?];
    write_block(writer, encoding, &encoding.serialize(&counts)?)?;

    for variable in &header.variables {
        write_block(writer, encoding, &variable.to_record())?;
    }

    write_block(writer, encoding, &encoding.serialize(&header.date.flags)?)?;
    if header.date.has_date() {
        let date = header.date.date.unwrap_or_default();
        write_block(writer, encoding, &encoding.serialize(&date)?)?;
    }

    let dims = MeshDimensions {
        nelem: to_i32(header.nelem, "nelem")?,
        npoin: to_i32(header.npoin, "npoin")?,
        ndp: to_i32(header.ndp, "ndp")?,
        reserved: header.reserved,
    };
    write_block(writer, encoding, &encoding.serialize(&dims)?)?;

    write_encoded(writer, encoding, &header.ikle, 4, Encoding::extend_ints)?;
    write_encoded(writer, encoding, &header.ipobo, 4, Encoding::extend_ints)?;
    write_reals(writer, encoding, &header.x)?;
    write_reals(writer, encoding, &header.y)?;

    Ok(())
}

/// Write one complete time step record
///
/// `values` must hold every variable as `[variable][node]`.
pub(crate) fn write_record<W: Write>(
    writer: &mut W,
    layout: &Layout,
    time: f64,
    values: &[Vec<f64>],
) -> Result<()> {
    check_frame(layout, values)?;

    write_reals(writer, &layout.encoding, &[time])?;
    for variable in values {
        write_reals(writer, &layout.encoding, variable)?;
    }
    Ok(())
}

/// Make sure a frame matches the variable and node counts
fn check_frame(layout: &Layout, values: &[Vec<f64>]) -> Result<()> {
    if values.len() != layout.nvar {
        return Err(Error::InconsistentFrame {
            expected: layout.nvar,
            found: values.len(),
        });
    }

    match values.iter().find(|v| v.len() != layout.npoin) {
        Some(variable) => Err(Error::InconsistentFrame {
            expected: layout.npoin,
            found: variable.len(),
        }),
        None => Ok(()),
    }
}

/// Write a framed block of reals in the file precision
pub(crate) fn write_reals<W: Write>(writer: &mut W, encoding: &Encoding, values: &[f64]) -> Result<()> {
    let width = encoding.float_width.bytes();
    write_encoded(writer, encoding, values, width, Encoding::extend_floats)
}

// ! ------------------------------------------------------------------------
// !                         Chunked block encoding
// ! ------------------------------------------------------------------------

/// Write a framed block, splitting the encoding buffer if it can not be
/// allocated
///
/// See [plan_chunks()] for the splitting. Nothing is written when no buffer
/// could be reserved.
fn write_encoded<W, T>(
    writer: &mut W,
    encoding: &Encoding,
    values: &[T],
    width: usize,
    encode: fn(&Encoding, &[T], &mut Vec<u8>),
) -> Result<()>
where
    W: Write,
{
    let bytes = values.len() * width;
    let (chunks, mut buffer) = plan_chunks(values.len(), width, |buffer, size| {
        buffer.try_reserve_exact(size).is_ok()
    })
    .ok_or(Error::AllocationFailure { bytes })?;

    write_marker(writer, encoding, bytes)?;
    write_chunked(writer, encoding, values, &mut buffer, chunks, encode)?;
    if chunks > 1 {
        debug!("Wrote {bytes} bytes in {chunks} chunks");
    }
    write_marker(writer, encoding, bytes)
}

/// Number of pieces to encode `len` values in, and the buffer for one piece
///
/// `reserve` grows an empty buffer to the given number of bytes and reports
/// whether it could. The piece count starts at 1 and doubles after every
/// refusal, giving up with `None` once [MAX_CHUNKS] pieces were refused.
fn plan_chunks<F>(len: usize, width: usize, mut reserve: F) -> Option<(usize, Vec<u8>)>
where
    F: FnMut(&mut Vec<u8>, usize) -> bool,
{
    let mut chunks = 1;
    loop {
        let mut buffer = Vec::new();
        if reserve(&mut buffer, chunk_length(len, chunks) * width) {
            return Some((chunks, buffer));
        }
        if chunks >= MAX_CHUNKS {
            return None;
        }
        chunks *= 2;
        warn!(
            "Unable to allocate {} bytes, retrying in {chunks} chunks",
            len * width
        );
    }
}

/// Values per piece, the last piece may be shorter
fn chunk_length(len: usize, chunks: usize) -> usize {
    len.div_ceil(chunks).max(1)
}

/// Encode and write values through a single reused buffer
fn write_chunked<W, T>(
    writer: &mut W,
    encoding: &Encoding,
    values: &[T],
    buffer: &mut Vec<u8>,
    chunks: usize,
    encode: fn(&Encoding, &[T], &mut Vec<u8>),
) -> std::io::Result<()>
where
    W: Write,
{
    for chunk in values.chunks(chunk_length(values.len(), chunks)) {
        buffer.clear();
        encode(encoding, chunk, buffer);
        writer.write_all(buffer.as_slice())?;
    }
    Ok(())
}

fn to_i32(value: usize, name: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::InconsistentHeader(f!("{name} of {value} does not fit a 4 byte integer")))
}

// ! ------------------------------------------------------------------------
// !                             Serafin writer
// ! ------------------------------------------------------------------------

/// Writer for new Serafin files
///
/// The header goes out on creation, after which time step records are
/// appended in the order they are written. Nothing checks that time stamps
/// increase.
///
/// ```rust, no_run
/// # use slftools_serafin::{Encoding, Header, SerafinWriter, Variable};
/// let header = Header::new("FLAT BED", vec![Variable::new("WATER DEPTH", "M")]).with_mesh(
///     vec![0.0, 1.0, 0.0],
///     vec![0.0, 0.0, 1.0],
///     vec![1, 2, 3],
///     3,
///     vec![1, 2, 3],
/// );
///
/// let mut writer = SerafinWriter::create("flat.slf", &header, Encoding::default()).unwrap();
/// writer.write_frame(0.0, &[vec![1.0, 1.0, 1.0]]).unwrap();
/// writer.write_frame(60.0, &[vec![1.2, 1.1, 1.0]]).unwrap();
/// writer.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct SerafinWriter<W: Write = BufWriter<File>> {
    writer: W,
    layout: Layout,
    frames: usize,
}

impl SerafinWriter<BufWriter<File>> {
    /// Create a new file and write the header
    pub fn create<P: AsRef<Path>>(path: P, header: &Header, encoding: Encoding) -> Result<Self> {
        let writer = init_writer(path)?;
        Self::new(writer, header, encoding)
    }
}

impl<W: Write> SerafinWriter<W> {
    /// Write the header to any writer
    pub fn new(mut writer: W, header: &Header, encoding: Encoding) -> Result<Self> {
        write_header(&mut writer, header, &encoding)?;
        let layout = Layout::new(header, encoding);
        debug!("Header written, {} bytes per time step", layout.record_size());

        Ok(Self {
            writer,
            layout,
            frames: 0,
        })
    }

    /// Layout of the file being written
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of complete frames written with [write_frame()](SerafinWriter::write_frame)
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Write a time stamp block
    ///
    /// Must be followed by one [write_value()](SerafinWriter::write_value)
    /// per variable to complete the record.
    pub fn write_time(&mut self, time: f64) -> Result<()> {
        write_reals(&mut self.writer, &self.layout.encoding, &[time])
    }

    /// Write the values of a single variable at every node
    pub fn write_value(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.layout.npoin {
            return Err(Error::InconsistentFrame {
                expected: self.layout.npoin,
                found: values.len(),
            });
        }
        write_reals(&mut self.writer, &self.layout.encoding, values)
    }

    /// Write a full time step, values as `[variable][node]`
    pub fn write_frame(&mut self, time: f64, values: &[Vec<f64>]) -> Result<()> {
        write_record(&mut self.writer, &self.layout, time, values)?;
        self.frames += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

// ! ------------------------------------------------------------------------
// !                               Summaries
// ! ------------------------------------------------------------------------

/// Write the [Header] metadata to a JSON file
///
/// Mesh tables are left out, only the title, counts, variables, and date
/// block are serialised.
///
/// ```no_run
/// # use slftools_serafin::{write_json, SerafinFile};
/// let slf = SerafinFile::open("results.slf").unwrap();
/// write_json(slf.header(), "results.json").unwrap();
/// ```
pub fn write_json<P: AsRef<Path>>(header: &Header, path: P) -> Result<()> {
    let writer = init_writer(path)?;
    serde_json::to_writer_pretty(writer, header)?;
    Ok(())
}

/// Write a human readable summary of the header and block layout
///
/// ```no_run
/// # use slftools_serafin::{write_summary, SerafinFile};
/// let slf = SerafinFile::open("results.slf").unwrap();
/// write_summary(slf.header(), &slf.encoding(), "results.txt").unwrap();
/// ```
pub fn write_summary<P: AsRef<Path>>(header: &Header, encoding: &Encoding, path: P) -> Result<()> {
    let mut writer = init_writer(path)?;
    let layout = Layout::new(header, *encoding);

    writeln!(writer, "Title: {}", header.title)?;
    writeln!(writer, "Encoding: {encoding}")?;
    let date = header.date.date.map(|_| header.date.reference_date());
    writeln!(writer, "Reference date: {}", date.display())?;
    writeln!(writer, "Elements: {}", header.nelem)?;
    writeln!(writer, "Nodes: {}", header.npoin)?;
    writeln!(writer, "Nodes per element: {}", header.ndp)?;
    writeln!(writer, "Planes: {}", header.nplan())?;
    writeln!(writer, "Header size: {} bytes", layout.header_size)?;
    writeln!(writer, "Record size: {} bytes", layout.record_size())?;

    let names = header
        .variables
        .iter()
        .map(|v| f!("{v}"))
        .collect::<Vec<String>>()
        .join(", ");
    writeln!(writer, "\nVariables ({}):", header.variables.len())?;
    writeln!(writer, "{}", textwrap::fill(&names, 80))?;

    writeln!(writer, "\nHeader blocks:")?;
    for block in header_blocks(header, encoding) {
        writeln!(writer, "{:<20} {:>12} bytes", block.name, block.length)?;
    }

    Ok(())
}

/// Initialise a writer from anything that can be turned into a path
fn init_writer<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}
