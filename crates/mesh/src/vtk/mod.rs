//! Conversion of Serafin frames to VTK formats for plotting
//!
//! A [Frame] of any 2D (triangle, quadrilateral) or 3D (prism, tetrahedron)
//! result is converted to an unstructured grid, with one point data array per
//! variable. See [FrameToVtk] for the conversion options.

// Split into subfiles for development, but anything important is re-exported
mod builder;
mod convert;

#[doc(inline)]
pub use builder::FrameToVtkBuilder;

#[doc(inline)]
pub use convert::FrameToVtk;

// standard library
use std::path::Path;

// crate modules
use crate::error::Result;

// slftools modules
use slftools_serafin::{Frame, Header};

// external crates
use vtkio::model::{ByteOrder, Vtk};

/// Output file formats supported by [write_vtk()]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VtkFormat {
    /// Legacy text format
    LegacyAscii,
    /// Legacy binary format, in the byte order of the [Vtk]
    #[default]
    LegacyBinary,
    /// XML unstructured grid (`.vtu`)
    Xml,
}

/// Convert a frame with the default options
///
/// ```rust, no_run
/// # use slftools_mesh::vtk::{frame_to_vtk, write_vtk, VtkFormat};
/// # use slftools_serafin::SerafinFile;
/// let mut slf = SerafinFile::open("results.slf").unwrap();
/// let frame = slf.read(0usize, &[]).unwrap();
///
/// let vtk = frame_to_vtk(slf.header(), &frame).unwrap();
/// write_vtk(vtk, "frame_0.vtk", VtkFormat::LegacyAscii).unwrap();
/// ```
pub fn frame_to_vtk(header: &Header, frame: &Frame) -> Result<Vtk> {
    FrameToVtk::new().convert(header, frame)
}

/// Write a [Vtk] to disk in any [VtkFormat]
///
/// XML output always gets the `.vtu` extension, which is how `vtkio` picks the
/// format.
pub fn write_vtk<P: AsRef<Path>>(vtk: Vtk, path: P, format: VtkFormat) -> Result<()> {
    let path = path.as_ref();
    match format {
        VtkFormat::LegacyAscii => vtk.export_ascii(path)?,
        VtkFormat::LegacyBinary => match vtk.byte_order {
            ByteOrder::BigEndian => vtk.export_be(path)?,
            ByteOrder::LittleEndian => vtk.export_le(path)?,
        },
        VtkFormat::Xml => vtk.export(path.with_extension("vtu"))?,
    }
    Ok(())
}
