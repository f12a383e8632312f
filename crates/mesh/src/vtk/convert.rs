// crate modules
use crate::error::{Error, Result};
use crate::mesh2d::zero_based;
use crate::probe::ELEVATION_NAMES;
use crate::vtk::FrameToVtkBuilder;

// slftools modules
use slftools_format::f;
use slftools_serafin::{Frame, Header};

// external crates
use log::{debug, warn};
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Convert Serafin frames to vtk formats for plotting
///
/// Every element of the file becomes a cell of an unstructured grid, and
/// every selected variable a point data array named after the variable.
///
/// 3D results take their node elevations from the `ELEVATION Z` (or
/// `COTE Z`) variable of the frame when it was read, and otherwise stack the
/// planes one unit apart.
///
/// The fields remain public for direct use, but for convenience and style
/// preference a builder pattern is also implemented and recommended.
///
/// ```rust
/// # use slftools_mesh::vtk::FrameToVtk;
/// # use vtkio::model::ByteOrder;
/// let converter = FrameToVtk::builder()
///     .byte_order(ByteOrder::LittleEndian)
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FrameToVtk {
    /// Byte ordering as big or little endian
    pub byte_order: ByteOrder,
    /// Header positions of the variables to include, all if empty
    pub variables: Vec<usize>,
}

impl FrameToVtk {
    /// Just calls Default::default()
    pub fn new() -> FrameToVtk {
        Default::default()
    }

    /// Start with the builder
    pub fn builder() -> FrameToVtkBuilder {
        FrameToVtkBuilder::default()
    }

    /// Convert a frame over the mesh of its header
    pub fn convert(&self, header: &Header, frame: &Frame) -> Result<Vtk> {
        let cell_type = cell_type(header)?;
        let points = self.points(header, frame)?;

        let connectivity = header
            .ikle
            .iter()
            .map(|n| zero_based(*n, header.npoin).map(|n| n as u64))
            .collect::<Result<Vec<u64>>>()?;
        let offsets = (1..=header.nelem)
            .map(|e| (e * header.ndp) as u64)
            .collect::<Vec<u64>>();

        debug!(
            "Converting {} {cell_type:?} cells at t = {}",
            header.nelem, frame.time
        );

        Ok(Vtk {
            version: Version::Auto,
            title: f!("{} t = {}", header.title, frame.time),
            byte_order: self.byte_order,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: points.into(),
                cells: Cells {
                    cell_verts: VertexNumbers::XML {
                        connectivity,
                        offsets,
                    },
                    types: vec![cell_type; header.nelem],
                },
                data: self.collect_attributes(header, frame)?,
            }),
        })
    }

    /// Flattened node coordinates
    fn points(&self, header: &Header, frame: &Frame) -> Result<Vec<f64>> {
        let z = if header.is_3d() {
            Self::elevations(header, frame)
        } else {
            vec![0.0; header.npoin]
        };

        if z.len() != header.npoin {
            return Err(Error::UnexpectedNumberOfValues {
                expected: header.npoin,
                found: z.len(),
            });
        }

        Ok((0..header.npoin)
            .flat_map(|n| [header.x[n], header.y[n], z[n]])
            .collect())
    }

    /// Node elevations from the frame, or the plane index
    fn elevations(header: &Header, frame: &Frame) -> Vec<f64> {
        if let Some(values) = header.first_of(&ELEVATION_NAMES).and_then(|v| frame.get(v)) {
            return values.to_vec();
        }

        warn!("No elevation in the frame, planes are stacked one unit apart");
        let npoin2 = header.npoin / header.nplan();
        (0..header.npoin).map(|n| (n / npoin2) as f64).collect()
    }

    /// One point data array per selected variable
    fn collect_attributes(&self, header: &Header, frame: &Frame) -> Result<Attributes> {
        let mut attributes = Attributes::new();

        for (v, values) in frame.variables.iter().zip(&frame.values) {
            if !self.variables.is_empty() && !self.variables.contains(v) {
                continue;
            }

            if values.len() != header.npoin {
                return Err(Error::UnexpectedNumberOfValues {
                    expected: header.npoin,
                    found: values.len(),
                });
            }

            let name = header
                .variables
                .get(*v)
                .map(|variable| variable.name.clone())
                .unwrap_or_else(|| f!("variable {v}"));

            attributes.point.push(Attribute::DataArray(DataArray {
                name,
                elem: ElementType::Scalars {
                    num_comp: 1,
                    lookup_table: None,
                },
                data: IOBuffer::F64(values.clone()),
            }));
        }

        Ok(attributes)
    }
}

impl Default for FrameToVtk {
    fn default() -> Self {
        FrameToVtkBuilder::default().build()
    }
}

/// VTK cell type for the element of a header
fn cell_type(header: &Header) -> Result<CellType> {
    match (header.ndp, header.is_3d()) {
        (3, false) => Ok(CellType::Triangle),
        (4, false) => Ok(CellType::Quad),
        (4, true) => Ok(CellType::Tetra),
        (6, true) => Ok(CellType::Wedge),
        (ndp, _) => Err(Error::UnsupportedElement {
            ndp,
            nplan: header.nplan(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slftools_serafin::Variable;

    fn square() -> Header {
        Header::new("SQUARE", vec![Variable::new("WATER DEPTH", "M")]).with_mesh(
            vec![0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![1, 2, 3, 1, 3, 4],
            3,
            vec![1, 2, 3, 4],
        )
    }

    fn frame() -> Frame {
        Frame {
            index: 0,
            time: 0.0,
            variables: vec![0],
            values: vec![vec![1.0, 2.0, 3.0, 4.0]],
        }
    }

    #[test]
    fn connectivity_is_zero_based() {
        let vtk = FrameToVtk::new().convert(&square(), &frame()).unwrap();
        let DataSet::UnstructuredGrid { pieces, .. } = vtk.data else {
            panic!("expected an unstructured grid");
        };
        let vtkio::model::Piece::Inline(piece) = &pieces[0] else {
            panic!("expected an inline piece");
        };

        let VertexNumbers::XML {
            connectivity,
            offsets,
        } = &piece.cells.cell_verts
        else {
            panic!("expected XML vertex numbers");
        };
        assert_eq!(connectivity, &vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(offsets, &vec![3, 6]);
    }

    #[test]
    fn connectivity_outside_the_mesh_is_rejected() {
        for node in [-1, 0, 5] {
            let mut header = square();
            header.ikle[4] = node;

            let result = FrameToVtk::new().convert(&header, &frame());
            assert!(
                matches!(result, Err(Error::DegenerateTriangulation(_))),
                "node {node} accepted"
            );
        }
    }
}
