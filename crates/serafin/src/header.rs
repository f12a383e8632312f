//! Header parsing and the [Header] data structure

// standard library
use std::io::{Read, Seek, SeekFrom};

// crate modules
use crate::block::{read_block_exact, read_content, read_marker, MARKER};
use crate::date::{DateBlock, DATE_COUNT, FLAG_COUNT};
use crate::encoding::{ByteOrder, Encoding, FloatWidth};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::variables::{self, Roles, Variable, VariableSelector, VARIABLE_RECORD};

// slftools modules
use slftools_format::{f, trim_field};

// external crates
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Byte length of the title block
pub(crate) const TITLE_LENGTH: usize = 80;

/// The four integers describing the mesh size
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct MeshDimensions {
    pub(crate) nelem: i32,
    pub(crate) npoin: i32,
    pub(crate) ndp: i32,
    pub(crate) reserved: i32,
}

/// Everything before the first time step record
///
/// The block sequence is fixed:
///
/// ```text
/// title (80 bytes)
/// nbvar, nbvar2
/// nbvar + nbvar2 variable records (16 name + 16 unit)
/// 10 integer parameters
/// 6 integer reference date    (only if parameter 10 is 1)
/// nelem, npoin, ndp, 1
/// connectivity                (nelem * ndp integers, 1-based)
/// boundary table              (npoin integers)
/// x coordinates               (npoin reals)
/// y coordinates               (npoin reals)
/// ```
///
/// The connectivity (`ikle`) keeps the 1-based node numbering of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    /// Title, trimmed of padding
    pub title: String,
    /// Number of ordinary variables
    pub nbvar: usize,
    /// Number of auxiliary variables following the ordinary ones
    pub nbvar2: usize,
    /// All variables in file order (`nbvar + nbvar2` of them)
    pub variables: Vec<Variable>,
    /// Parameter flags and optional reference date
    pub date: DateBlock,
    /// Number of elements
    pub nelem: usize,
    /// Number of nodes
    pub npoin: usize,
    /// Nodes per element
    pub ndp: usize,
    /// Fourth mesh dimension integer, 1 in practice
    pub reserved: i32,
    /// Element connectivity, `nelem * ndp` 1-based node numbers
    #[serde(skip)]
    pub ikle: Vec<i32>,
    /// Boundary numbering per node, 0 for interior nodes
    #[serde(skip)]
    pub ipobo: Vec<i32>,
    /// Node x coordinates
    #[serde(skip)]
    pub x: Vec<f64>,
    /// Node y coordinates
    #[serde(skip)]
    pub y: Vec<f64>,
}

/// Constructors for writing new files
impl Header {
    /// New header with no mesh
    pub fn new(title: &str, variables: Vec<Variable>) -> Self {
        Self {
            title: title.trim_end().to_string(),
            nbvar: variables.len(),
            nbvar2: 0,
            variables,
            reserved: 1,
            ..Default::default()
        }
    }

    /// Attach the mesh tables
    ///
    /// `ikle` holds 1-based node numbers, `ndp` per element.
    pub fn with_mesh(
        mut self,
        x: Vec<f64>,
        y: Vec<f64>,
        ikle: Vec<i32>,
        ndp: usize,
        ipobo: Vec<i32>,
    ) -> Self {
        self.npoin = x.len();
        self.ndp = ndp;
        self.nelem = if ndp > 0 { ikle.len() / ndp } else { 0 };
        self.x = x;
        self.y = y;
        self.ikle = ikle;
        self.ipobo = ipobo;
        self
    }

    /// Declare the number of planes of a 3D mesh
    pub fn with_planes(mut self, nplan: usize) -> Self {
        self.date.set_nplan(nplan);
        self
    }

    /// Attach a reference date
    pub fn with_reference_date(mut self, date: crate::date::ReferenceDate) -> Self {
        self.date.set_reference_date(date);
        self
    }
}

/// Queries
impl Header {
    /// Total number of variables per record
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of planes, 1 for 2D files
    pub fn nplan(&self) -> usize {
        self.date.nplan()
    }

    /// True for multi-plane (3D) results
    pub fn is_3d(&self) -> bool {
        self.date.is_3d()
    }

    /// Resolve a variable id or name to its position
    ///
    /// Names match case-insensitively on any part of the variable name.
    pub fn position(&self, selector: &VariableSelector) -> Result<usize> {
        variables::resolve(&self.variables, selector)
    }

    /// Position of the first candidate name that exists in this file
    ///
    /// Candidates are tried in order, so the preferred name goes first.
    pub fn first_of(&self, candidates: &[&str]) -> Option<usize> {
        variables::first_of(&self.variables, candidates)
    }

    /// Indices of the variables with a well-known meaning
    pub fn roles(&self) -> Roles {
        Roles::from_variables(&self.variables)
    }

    /// Nodes of element `e` as 0-based indices
    ///
    /// `None` past the last element or for a connectivity entry below 1.
    pub fn element(&self, e: usize) -> Option<Vec<usize>> {
        self.ikle
            .get(e * self.ndp..(e + 1) * self.ndp)?
            .iter()
            .map(|n| usize::try_from(*n).ok()?.checked_sub(1))
            .collect()
    }

    /// Make sure the tables agree with the declared counts
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("variables", self.variables.len(), self.nbvar + self.nbvar2),
            ("connectivity", self.ikle.len(), self.nelem * self.ndp),
            ("boundary table", self.ipobo.len(), self.npoin),
            ("x coordinates", self.x.len(), self.npoin),
            ("y coordinates", self.y.len(), self.npoin),
        ];

        for (name, found, expected) in checks {
            if found != expected {
                return Err(Error::InconsistentHeader(f!(
                    "{name} has {found} entries, expected {expected}"
                )));
            }
        }

        if let Some(node) = self
            .ikle
            .iter()
            .find(|n| **n < 1 || **n as usize > self.npoin)
        {
            return Err(Error::InconsistentHeader(f!(
                "connectivity references node {node} of {}",
                self.npoin
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Header {{")?;
        writeln!(f, "    title: \"{}\"", self.title)?;
        writeln!(
            f,
            "    mesh: {} elements, {} nodes, {} nodes per element, {} plane(s)",
            self.nelem,
            self.npoin,
            self.ndp,
            self.nplan()
        )?;
        writeln!(f, "    date: {}", self.date.reference_date())?;
        writeln!(f, "    variables: {}", self.variables.len())?;
        for (i, variable) in self.variables.iter().enumerate() {
            writeln!(f, "        [{i}] {variable}")?;
        }
        write!(f, "}}")
    }
}

// ! ------------------------------------------------------------------------
// !                               Parsing
// ! ------------------------------------------------------------------------

/// Parse the full header and detect the file encoding
///
/// The reader is left positioned at the start of the first record.
pub(crate) fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<(Header, Encoding)> {
    let (title, byte_order) = detect_byte_order(reader)?;
    debug!("Detected {byte_order:?} endian byte order");

    // width is unknown until the coordinates, nothing before depends on it
    let mut encoding = Encoding::new(byte_order, FloatWidth::Single);

    let counts: [i32; 2] = encoding.deserialize(&read_block_exact(reader, &encoding, 8)?)?;
    let nbvar = non_negative(counts[0], "nbvar")?;
    let nbvar2 = non_negative(counts[1], "nbvar2")?;

    let mut variables = Vec::with_capacity(nbvar + nbvar2);
    for _ in 0..nbvar + nbvar2 {
        let record = read_block_exact(reader, &encoding, VARIABLE_RECORD)?;
        variables.push(Variable::from_record(&record));
    }

    let flags: [i32; FLAG_COUNT] =
        encoding.deserialize(&read_block_exact(reader, &encoding, FLAG_COUNT * 4)?)?;
    let mut date = DateBlock { flags, date: None };
    if date.has_date() {
        let values: [i32; DATE_COUNT] =
            encoding.deserialize(&read_block_exact(reader, &encoding, DATE_COUNT * 4)?)?;
        date.date = Some(values);
    }

    let dims: MeshDimensions = encoding.deserialize(&read_block_exact(reader, &encoding, 16)?)?;
    let nelem = non_negative(dims.nelem, "nelem")?;
    let npoin = non_negative(dims.npoin, "npoin")?;
    let ndp = non_negative(dims.ndp, "ndp")?;

    let ikle = encoding.ints(&read_block_exact(reader, &encoding, nelem * ndp * 4)?);
    let ipobo = encoding.ints(&read_block_exact(reader, &encoding, npoin * 4)?);

    // float width from the declared length of the first real block
    let length = read_marker(reader, &encoding)?;
    encoding.float_width = FloatWidth::from_block_length(length, npoin).ok_or_else(|| {
        Error::CorruptFile(f!(
            "coordinate block of {length} bytes is neither single nor double precision for {npoin} nodes"
        ))
    })?;
    debug!("Detected {:?} precision reals", encoding.float_width);

    let x = encoding.floats(&read_content(reader, &encoding, length)?);
    let y = encoding.floats(&read_block_exact(reader, &encoding, length)?);

    let header = Header {
        title,
        nbvar,
        nbvar2,
        variables,
        date,
        nelem,
        npoin,
        ndp,
        reserved: dims.reserved,
        ikle,
        ipobo,
        x,
        y,
    };

    // connectivity must stay within the declared nodes
    header
        .validate()
        .map_err(|e| Error::CorruptFile(e.to_string()))?;

    // the stream position and the block descriptors must agree
    let layout = Layout::new(&header, encoding);
    let position = reader.stream_position()?;
    if position != layout.header_size {
        return Err(Error::CorruptFile(f!(
            "header ends at byte {position}, layout expects {}",
            layout.header_size
        )));
    }

    trace!("Header size {} bytes", layout.header_size);
    debug!("Recognised variable roles: {:?}", header.roles());
    Ok((header, encoding))
}

/// Try both byte orders on the title block
///
/// The title is always 80 bytes, so only the correct byte order gives matching
/// markers of 80 on both sides.
fn detect_byte_order<R: Read + Seek>(reader: &mut R) -> Result<(String, ByteOrder)> {
    for byte_order in [ByteOrder::Big, ByteOrder::Little] {
        reader.seek(SeekFrom::Start(0))?;
        let encoding = Encoding::new(byte_order, FloatWidth::Single);
        if let Some(title) = probe_title(reader, &encoding)? {
            return Ok((trim_field(&title), byte_order));
        }
    }

    Err(Error::CorruptFile(
        "unable to determine byte order from the title block".to_string(),
    ))
}

/// Title content if the markers agree under this encoding
fn probe_title<R: Read>(reader: &mut R, encoding: &Encoding) -> Result<Option<Vec<u8>>> {
    let mut marker = [0u8; MARKER];
    let mut title = vec![0u8; TITLE_LENGTH];

    if reader.read_exact(&mut marker).is_err() || encoding.int(marker) != TITLE_LENGTH as i32 {
        return Ok(None);
    }
    if reader.read_exact(&mut title).is_err() || reader.read_exact(&mut marker).is_err() {
        return Ok(None);
    }

    Ok((encoding.int(marker) == TITLE_LENGTH as i32).then_some(title))
}

fn non_negative(value: i32, name: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::CorruptFile(f!("negative {name} ({value})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::header_blocks;
    use crate::writer::write_header;
    use std::io::Cursor;

    fn triangle() -> Header {
        Header::new(
            "SINGLE TRIANGLE",
            vec![Variable::new("VELOCITY U", "M/S"), Variable::new("FOND", "M")],
        )
        .with_mesh(
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![1, 2, 3],
            3,
            vec![1, 2, 3],
        )
    }

    fn parse(bytes: Vec<u8>) -> Result<(Header, Encoding)> {
        parse_header(&mut Cursor::new(bytes))
    }

    #[test]
    fn detects_encoding() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            for width in [FloatWidth::Single, FloatWidth::Double] {
                let encoding = Encoding::new(order, width);
                let mut bytes = Vec::new();
                write_header(&mut bytes, &triangle(), &encoding).unwrap();

                let (header, detected) = parse(bytes).unwrap();
                assert_eq!(detected, encoding);
                assert_eq!(header, triangle());
            }
        }
    }

    #[test]
    fn reference_date_block() {
        let date = crate::date::ReferenceDate {
            year: 2019,
            month: 7,
            day: 14,
            hour: 6,
            minute: 30,
            second: 0,
        };
        let encoding = Encoding::default();
        let mut bytes = Vec::new();
        write_header(&mut bytes, &triangle().with_reference_date(date), &encoding).unwrap();

        let (header, _) = parse(bytes).unwrap();
        assert_eq!(header.date.reference_date(), date);
    }

    #[test]
    fn garbage_is_corrupt() {
        let result = parse(vec![7u8; 200]);
        assert!(matches!(result, Err(Error::CorruptFile(_))));
    }

    #[test]
    fn bad_float_block() {
        let encoding = Encoding::default();
        let mut bytes = Vec::new();
        write_header(&mut bytes, &triangle(), &encoding).unwrap();

        // x block marker sits after title, counts, names, params, dims, ikle, ipobo
        let offset = (80 + 8) + (8 + 8) + 2 * (32 + 8) + (40 + 8) + (16 + 8) + (12 + 8) + (12 + 8);
        bytes[offset..offset + 4].copy_from_slice(&10i32.to_be_bytes());

        assert!(matches!(parse(bytes), Err(Error::CorruptFile(_))));
    }

    #[test]
    fn element_nodes_are_zero_based() {
        let header = triangle();
        assert_eq!(header.element(0), Some(vec![0, 1, 2]));
        assert_eq!(header.element(1), None);
        assert!(header.validate().is_ok());

        let mut broken = triangle();
        broken.ikle[1] = 0;
        assert_eq!(broken.element(0), None);
    }

    /// Byte position of the first connectivity entry of [triangle()]
    fn first_connectivity_entry() -> usize {
        header_blocks(&triangle(), &Encoding::default())
            .iter()
            .take_while(|block| block.name != "connectivity")
            .map(|block| block.framed_length())
            .sum::<usize>()
            + MARKER
    }

    #[test]
    fn connectivity_outside_the_mesh_is_corrupt() {
        for node in [0i32, 4, -2] {
            let mut bytes = Vec::new();
            write_header(&mut bytes, &triangle(), &Encoding::default()).unwrap();

            let offset = first_connectivity_entry() + 4;
            bytes[offset..offset + 4].copy_from_slice(&node.to_be_bytes());

            assert!(
                matches!(parse(bytes), Err(Error::CorruptFile(_))),
                "node {node} accepted"
            );
        }
    }
}
