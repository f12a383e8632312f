// crate modules
use crate::vtk::FrameToVtk;

// external crates
use vtkio::model::ByteOrder;

/// Builder implementation for FrameToVtk configuration
///
/// The fields of [FrameToVtk] are left public for direct use but the module
/// also implements a builder, with any number of chained setter calls.
///
/// To get the final [FrameToVtk] from the builder, call
/// [build()](FrameToVtkBuilder::build).
///
/// ```rust, no_run
/// # use slftools_mesh::vtk::{write_vtk, FrameToVtk, VtkFormat};
/// # use slftools_serafin::SerafinFile;
/// # use vtkio::model::ByteOrder;
/// # let mut slf = SerafinFile::open("results.slf").unwrap();
/// # let frame = slf.read(0usize, &[]).unwrap();
/// let converter = FrameToVtk::builder()
///     .variables(vec![0, 2])     // first and third variables only
///     .byte_order(ByteOrder::LittleEndian)
///     .build();
///
/// let vtk = converter.convert(slf.header(), &frame).unwrap();
/// write_vtk(vtk, "./frame.vtk", VtkFormat::LegacyBinary).unwrap();
/// ```
pub struct FrameToVtkBuilder {
    /// Byte ordering as big or little endian
    byte_order: ByteOrder,
    /// Header positions of the variables to include
    variables: Vec<usize>,
}

impl FrameToVtkBuilder {
    /// Create a new instance of the builder with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the [FrameToVtk] type
    pub fn build(self) -> FrameToVtk {
        FrameToVtk {
            byte_order: self.byte_order,
            variables: self.variables,
        }
    }

    /// Set the byte ordering
    ///
    /// Only matters for the binary formats. Defaults to big endian, which every
    /// VTK reader accepts.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Header positions of the variables to include
    ///
    /// By default every variable read into the frame is included.
    pub fn variables(mut self, variables: Vec<usize>) -> Self {
        self.variables = variables;
        self
    }
}

impl Default for FrameToVtkBuilder {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::BigEndian,
            variables: Vec::new(),
        }
    }
}
