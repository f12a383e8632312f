//! Two dimensional projection of a Serafin mesh and its cached topology

// standard library
use std::cell::OnceCell;
use std::collections::HashMap;

// crate modules
use crate::boundary::{find_boundaries, Boundaries};
use crate::error::{Error, Result};
use crate::locate::Locator;
use crate::quality::MeshStatistics;

// slftools modules
use slftools_format::f;
use slftools_serafin::{Header, SerafinFile};

// external crates
use itertools::Itertools;
use log::{debug, trace};
use nalgebra::{DMatrix, Point2};

/// Undirected edge as a sorted pair of node indices
pub type Edge = (usize, usize);

/// Sorted pair for any two nodes
pub fn edge(a: usize, b: usize) -> Edge {
    (a.min(b), a.max(b))
}

/// The triangular mesh of a single plane
///
/// For a 3D file with `P` planes the first `npoin / P` nodes are the bottom
/// plane, and the first `nelem / (P - 1)` prisms have their bottom triangle in
/// the first three columns. Node indices are 0-based here, unlike the
/// connectivity table of the file.
///
/// Topology is derived on first use and cached:
///
/// | Method                                       | Cached                      |
/// | -------------------------------------------- | --------------------------- |
/// | [node_area()](Mesh2D::node_area)             | area per node               |
/// | [neighbors()](Mesh2D::neighbors)             | adjacent nodes per node     |
/// | [edge_to_elements()](Mesh2D::edge_to_elements) | triangles sharing an edge |
/// | [boundaries()](Mesh2D::boundaries)           | outer rings and islands     |
/// | [locate()](Mesh2D::locate)                   | spatial index               |
///
/// ```rust, no_run
/// # use slftools_mesh::Mesh2D;
/// # use slftools_serafin::SerafinFile;
/// let slf = SerafinFile::open("results.slf").unwrap();
/// let mesh = Mesh2D::from_file(&slf).unwrap();
///
/// let area: f64 = mesh.node_area().iter().sum();
/// let elements = mesh.locate(&[[10.0, 20.0], [1.0e6, 1.0e6]]);
/// ```
#[derive(Debug, Default)]
pub struct Mesh2D {
    /// Node x coordinates
    pub x: Vec<f64>,
    /// Node y coordinates
    pub y: Vec<f64>,
    /// Triangles as 0-based node indices
    pub triangles: Vec<[usize; 3]>,
    /// Boundary table of the plane, 0 for interior nodes
    pub ipobo: Vec<i32>,
    /// Number of planes in the source file
    pub nplan: usize,
    node_area: OnceCell<Vec<f64>>,
    incidence: OnceCell<Vec<Vec<usize>>>,
    neighbors: OnceCell<Vec<Vec<usize>>>,
    edges: OnceCell<HashMap<Edge, Vec<usize>>>,
    boundaries: OnceCell<Boundaries>,
    locator: OnceCell<Locator>,
}

// ! ------------------------------------------------------------------------
// !                              Construction
// ! ------------------------------------------------------------------------

impl Mesh2D {
    /// New single plane mesh from coordinates and 0-based triangles
    pub fn new(x: Vec<f64>, y: Vec<f64>, triangles: Vec<[usize; 3]>, ipobo: Vec<i32>) -> Self {
        Self {
            x,
            y,
            triangles,
            ipobo,
            nplan: 1,
            ..Default::default()
        }
    }

    /// 2D mesh of the primary partition of an open file
    pub fn from_file(file: &SerafinFile) -> Result<Self> {
        Self::from_header(file.header())
    }

    /// Project the mesh of a header onto its bottom plane
    pub fn from_header(header: &Header) -> Result<Self> {
        let nplan = header.nplan();
        let (npoin, nelem) = plane_counts(header, nplan)?;

        let ndp = header.ndp;
        let triangles = (0..nelem)
            .map(|e| {
                let row = &header.ikle[e * ndp..e * ndp + 3];
                Ok([
                    zero_based(row[0], npoin)?,
                    zero_based(row[1], npoin)?,
                    zero_based(row[2], npoin)?,
                ])
            })
            .collect::<Result<Vec<[usize; 3]>>>()?;

        debug!("2D mesh of {npoin} nodes and {nelem} triangles from {nplan} plane(s)");

        Ok(Self {
            x: header.x[..npoin].to_vec(),
            y: header.y[..npoin].to_vec(),
            triangles,
            ipobo: header.ipobo[..npoin].to_vec(),
            nplan,
            ..Default::default()
        })
    }
}

/// Nodes and elements per plane
fn plane_counts(header: &Header, nplan: usize) -> Result<(usize, usize)> {
    match (header.ndp, nplan) {
        (3, 1) => Ok((header.npoin, header.nelem)),
        (6, p) if p > 1 => {
            if header.npoin % p != 0 {
                return Err(Error::InvalidPlaneCount {
                    what: "nodes",
                    count: header.npoin,
                    nplan: p,
                });
            }
            if header.nelem % (p - 1) != 0 {
                return Err(Error::InvalidPlaneCount {
                    what: "elements",
                    count: header.nelem,
                    nplan: p,
                });
            }
            Ok((header.npoin / p, header.nelem / (p - 1)))
        }
        (ndp, nplan) => Err(Error::UnsupportedElement { ndp, nplan }),
    }
}

/// Convert a 1-based connectivity entry, which must be one of `npoin` nodes
pub(crate) fn zero_based(node: i32, npoin: usize) -> Result<usize> {
    match usize::try_from(node) {
        Ok(n) if n >= 1 && n <= npoin => Ok(n - 1),
        _ => Err(Error::DegenerateTriangulation(f!(
            "connectivity entry {node} is not one of the {npoin} nodes"
        ))),
    }
}

// ! ------------------------------------------------------------------------
// !                               Geometry
// ! ------------------------------------------------------------------------

impl Mesh2D {
    /// Number of nodes
    pub fn npoin(&self) -> usize {
        self.x.len()
    }

    /// Number of triangles
    pub fn nelem(&self) -> usize {
        self.triangles.len()
    }

    /// Coordinates of a node
    pub fn point(&self, node: usize) -> Point2<f64> {
        Point2::new(self.x[node], self.y[node])
    }

    /// Corner coordinates of a triangle
    pub fn vertices(&self, element: usize) -> [Point2<f64>; 3] {
        self.triangles[element].map(|n| self.point(n))
    }

    /// Signed area of a triangle, positive when counter-clockwise
    pub fn signed_area(&self, element: usize) -> f64 {
        let [a, b, c] = self.vertices(element);
        0.5 * (b - a).perp(&(c - a))
    }

    /// Area of a triangle
    pub fn triangle_area(&self, element: usize) -> f64 {
        self.signed_area(element).abs()
    }

    /// Sum of all triangle areas
    pub fn total_area(&self) -> f64 {
        (0..self.nelem()).map(|e| self.triangle_area(e)).sum()
    }

    /// Area attributed to each node
    ///
    /// Each triangle is split into three quadrilaterals through its centroid
    /// and edge midpoints, and each corner takes the quadrilateral touching it.
    /// The areas sum to the mesh area.
    pub fn node_area(&self) -> &[f64] {
        self.node_area.get_or_init(|| {
            let mut area = vec![0.0; self.npoin()];
            for (e, triangle) in self.triangles.iter().enumerate() {
                let corners = self.vertices(e);
                let centroid = Point2::from((corners[0].coords + corners[1].coords + corners[2].coords) / 3.0);

                for i in 0..3 {
                    let corner = corners[i];
                    let next = nalgebra::center(&corner, &corners[(i + 1) % 3]);
                    let previous = nalgebra::center(&corner, &corners[(i + 2) % 3]);
                    area[triangle[i]] += shoelace(&[corner, next, centroid, previous]).abs();
                }
            }
            trace!("Node areas computed for {} nodes", self.npoin());
            area
        })
    }
}

/// Signed area of a simple polygon
pub(crate) fn shoelace(points: &[Point2<f64>]) -> f64 {
    0.5 * points
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
}

// ! ------------------------------------------------------------------------
// !                               Topology
// ! ------------------------------------------------------------------------

impl Mesh2D {
    /// Triangles referencing each node
    pub fn incidence(&self) -> &[Vec<usize>] {
        self.incidence.get_or_init(|| {
            let mut incidence = vec![Vec::new(); self.npoin()];
            for (e, triangle) in self.triangles.iter().enumerate() {
                for node in triangle {
                    incidence[*node].push(e);
                }
            }
            incidence
        })
    }

    /// Sorted adjacent nodes of each node, excluding itself
    pub fn neighbors(&self) -> &[Vec<usize>] {
        self.neighbors.get_or_init(|| {
            self.incidence()
                .iter()
                .enumerate()
                .map(|(node, elements)| {
                    elements
                        .iter()
                        .flat_map(|e| self.triangles[*e])
                        .filter(|n| *n != node)
                        .sorted_unstable()
                        .dedup()
                        .collect()
                })
                .collect()
        })
    }

    /// Neighbours as a rectangular table padded with -1
    ///
    /// One row per node, as wide as the largest neighbour set.
    pub fn neighbor_table(&self) -> DMatrix<i64> {
        let neighbors = self.neighbors();
        let width = neighbors.iter().map(Vec::len).max().unwrap_or(0);

        let mut table = DMatrix::from_element(self.npoin(), width, -1);
        for (node, adjacent) in neighbors.iter().enumerate() {
            for (column, n) in adjacent.iter().enumerate() {
                table[(node, column)] = *n as i64;
            }
        }
        table
    }

    /// Triangles sharing each undirected edge
    ///
    /// Interior edges have two triangles, boundary edges one.
    pub fn edge_to_elements(&self) -> &HashMap<Edge, Vec<usize>> {
        self.edges.get_or_init(|| {
            let mut edges: HashMap<Edge, Vec<usize>> = HashMap::new();
            for (e, [a, b, c]) in self.triangles.iter().enumerate() {
                for (p, q) in [(a, b), (b, c), (c, a)] {
                    edges.entry(edge(*p, *q)).or_default().push(e);
                }
            }
            edges
        })
    }

    /// Edges with a single triangle, sorted
    pub fn boundary_edges(&self) -> Vec<Edge> {
        self.edge_to_elements()
            .iter()
            .filter(|(_, elements)| elements.len() == 1)
            .map(|(edge, _)| *edge)
            .sorted_unstable()
            .collect()
    }

    /// Closed boundary rings split into outer boundaries and islands
    pub fn boundaries(&self) -> &Boundaries {
        self.boundaries.get_or_init(|| find_boundaries(self))
    }

    /// Edge lengths, angles, and areas
    pub fn statistics(&self) -> Result<MeshStatistics> {
        MeshStatistics::from_mesh(self)
    }

    /// Triangle containing each point, `None` outside the mesh
    ///
    /// Points on a shared edge or node may be reported in any of the touching
    /// triangles.
    pub fn locate(&self, points: &[[f64; 2]]) -> Vec<Option<usize>> {
        let locator = self.locator.get_or_init(|| Locator::new(self));
        points.iter().map(|p| locator.locate(self, *p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit square split along the diagonal
    fn square() -> Mesh2D {
        Mesh2D::new(
            vec![0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![[0, 1, 2], [0, 2, 3]],
            vec![1, 2, 3, 4],
        )
    }

    #[test]
    fn areas() {
        let mesh = square();
        assert_eq!(mesh.signed_area(0), 0.5);
        assert_eq!(mesh.total_area(), 1.0);

        let area = mesh.node_area();
        assert!((area.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // diagonal nodes touch both triangles
        assert!((area[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((area[1] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn adjacency() {
        let mesh = square();
        assert_eq!(mesh.neighbors()[0], vec![1, 2, 3]);
        assert_eq!(mesh.neighbors()[1], vec![0, 2]);

        let table = mesh.neighbor_table();
        assert_eq!(table.shape(), (4, 3));
        assert_eq!(table[(1, 2)], -1);
        assert_eq!(table[(2, 0)], 0);
    }

    #[test]
    fn edges() {
        let mesh = square();
        let edges = mesh.edge_to_elements();
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[&(0, 2)], vec![0, 1]);
        assert_eq!(mesh.boundary_edges(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn shoelace_orientation() {
        let ccw = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.0, 2.0)];
        assert_eq!(shoelace(&ccw), 2.0);
        let cw = [ccw[0], ccw[2], ccw[1]];
        assert_eq!(shoelace(&cw), -2.0);
    }
}
